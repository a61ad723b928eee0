//! Natural-key entity resolution
//!
//! Maps customer, supplier and item names to ids, creating records on first
//! sight. Creation is attempted first and a uniqueness conflict on the name
//! falls back to a lookup, so resolving the same name again (in this run or
//! a later one) always yields the same id.

use std::collections::HashMap;

use shared::{validate_name, CustomerInput, EntityKind, ItemInput, SupplierInput};

use crate::error::{AppError, AppResult};
use crate::store::StoreTx;

/// Per-run resolver with a name to id cache for each entity kind
#[derive(Debug, Default)]
pub struct EntityResolver {
    customers: HashMap<String, i64>,
    suppliers: HashMap<String, i64>,
    items: HashMap<String, i64>,
}

impl EntityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn cache(&self, kind: EntityKind) -> &HashMap<String, i64> {
        match kind {
            EntityKind::Customer => &self.customers,
            EntityKind::Supplier => &self.suppliers,
            EntityKind::Item => &self.items,
        }
    }

    fn cache_mut(&mut self, kind: EntityKind) -> &mut HashMap<String, i64> {
        match kind {
            EntityKind::Customer => &mut self.customers,
            EntityKind::Supplier => &mut self.suppliers,
            EntityKind::Item => &mut self.items,
        }
    }

    /// Id resolved earlier in this run
    pub fn id_of(&self, kind: EntityKind, name: &str) -> AppResult<i64> {
        let name = name.trim();
        self.cache(kind)
            .get(name)
            .copied()
            .ok_or_else(|| AppError::ForeignKeyMissing {
                kind,
                name: name.to_string(),
            })
    }

    /// Number of names resolved so far for `kind`
    pub fn resolved(&self, kind: EntityKind) -> usize {
        self.cache(kind).len()
    }

    /// Forget every id of `kind`, e.g. after its transaction was lost
    pub fn forget(&mut self, kind: EntityKind) {
        self.cache_mut(kind).clear();
    }

    /// Resolve a customer or supplier name to an id
    pub async fn resolve<T: StoreTx>(
        &mut self,
        tx: &mut T,
        kind: EntityKind,
        name: &str,
    ) -> AppResult<i64> {
        if kind == EntityKind::Item {
            return self.resolve_item(tx, name, None).await;
        }

        let name = checked_name(kind, name)?;
        if let Some(&id) = self.cache(kind).get(&name) {
            return Ok(id);
        }

        let created = match kind {
            EntityKind::Customer => tx.insert_customer(&CustomerInput::named(&name)).await,
            _ => tx.insert_supplier(&SupplierInput::named(&name)).await,
        };
        let id = match created {
            Ok(id) => {
                tracing::debug!(%kind, %name, id, "Created");
                id
            }
            Err(AppError::DuplicateEntry(field)) if field == "name" => {
                lookup(tx, kind, &name).await?
            }
            Err(e) => return Err(resolution_error(kind, &name, e)),
        };

        self.cache_mut(kind).insert(name, id);
        Ok(id)
    }

    /// Resolve an item name, creating it with `code` when new.
    ///
    /// A code already taken by another item does not fail the item: it is
    /// created again without a code.
    pub async fn resolve_item<T: StoreTx>(
        &mut self,
        tx: &mut T,
        name: &str,
        code: Option<&str>,
    ) -> AppResult<i64> {
        let kind = EntityKind::Item;
        let name = checked_name(kind, name)?;
        if let Some(&id) = self.items.get(&name) {
            return Ok(id);
        }

        let mut input = ItemInput::named(&name);
        input.code = code.map(str::trim).filter(|c| !c.is_empty()).map(String::from);

        let id = loop {
            match tx.insert_item(&input).await {
                Ok(id) => {
                    tracing::debug!(%kind, %name, id, code = ?input.code, "Created");
                    break id;
                }
                Err(AppError::DuplicateEntry(field)) if field == "name" => {
                    break lookup(tx, kind, &name).await?;
                }
                Err(AppError::DuplicateEntry(field)) if field == "code" && input.code.is_some() => {
                    tracing::warn!(%name, code = ?input.code, "Item code taken, creating without code");
                    input.code = None;
                }
                Err(e) => return Err(resolution_error(kind, &name, e)),
            }
        };

        self.items.insert(name, id);
        Ok(id)
    }
}

fn checked_name(kind: EntityKind, name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    validate_name(trimmed).map_err(|reason| AppError::EntityResolution {
        kind,
        name: trimmed.to_string(),
        reason: reason.to_string(),
    })?;
    Ok(trimmed.to_string())
}

fn resolution_error(kind: EntityKind, name: &str, source: AppError) -> AppError {
    AppError::EntityResolution {
        kind,
        name: name.to_string(),
        reason: source.to_string(),
    }
}

async fn lookup<T: StoreTx>(tx: &mut T, kind: EntityKind, name: &str) -> AppResult<i64> {
    let found = match kind {
        EntityKind::Customer => tx.find_customer_by_name(name).await?.map(|c| c.id),
        EntityKind::Supplier => tx.find_supplier_by_name(name).await?.map(|s| s.id),
        EntityKind::Item => tx.find_item_by_name(name).await?.map(|i| i.id),
    };
    let id = found.ok_or_else(|| {
        resolution_error(
            kind,
            name,
            AppError::Internal("name conflict reported but no record found".to_string()),
        )
    })?;
    tracing::debug!(%kind, %name, id, "Matched existing");
    Ok(id)
}
