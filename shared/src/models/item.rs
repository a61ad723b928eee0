//! Item (product) models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Won;

/// Category given to items created without one (electronic parts)
pub const DEFAULT_ITEM_CATEGORY: &str = "전자부품";

/// Unit given to items created without one (pieces)
pub const DEFAULT_ITEM_UNIT: &str = "개";

/// A sellable item, identified by its unique name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    /// Optional unique item code (e.g., "ITEM-001")
    pub code: Option<String>,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub standard_price: Won,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating or replacing an item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemInput {
    pub code: Option<String>,
    pub name: String,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub standard_price: Option<Won>,
    pub description: Option<String>,
}

impl ItemInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn category_or_default(&self) -> &str {
        self.category.as_deref().unwrap_or(DEFAULT_ITEM_CATEGORY)
    }

    pub fn unit_or_default(&self) -> &str {
        self.unit.as_deref().unwrap_or(DEFAULT_ITEM_UNIT)
    }
}
