//! Dashboard reporting

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{round_rate, Sale, SaleFilter, SalesSummary};

use crate::error::{AppError, AppResult};
use crate::store::{Store, StoreTx};

/// Period selector for the dashboard; both absent means all time
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StatsQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl StatsQuery {
    /// Inclusive date range covered by the query
    pub fn range(&self) -> AppResult<(Option<NaiveDate>, Option<NaiveDate>)> {
        let invalid = || AppError::validation("month", "Month must be between 1 and 12");
        match (self.year, self.month) {
            (None, None) => Ok((None, None)),
            (None, Some(_)) => Err(AppError::validation("year", "Month requires a year")),
            (Some(year), None) => {
                let start = NaiveDate::from_ymd_opt(year, 1, 1)
                    .ok_or_else(|| AppError::validation("year", "Invalid year"))?;
                let end = NaiveDate::from_ymd_opt(year, 12, 31)
                    .ok_or_else(|| AppError::validation("year", "Invalid year"))?;
                Ok((Some(start), Some(end)))
            }
            (Some(year), Some(month)) => {
                let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
                let next = if month == 12 {
                    NaiveDate::from_ymd_opt(year + 1, 1, 1)
                } else {
                    NaiveDate::from_ymd_opt(year, month + 1, 1)
                }
                .ok_or_else(invalid)?;
                Ok((Some(start), next.pred_opt()))
            }
        }
    }
}

#[derive(Clone)]
pub struct ReportingService<S> {
    store: S,
}

impl<S: Store> ReportingService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn sales_summary(&self, query: StatsQuery) -> AppResult<SalesSummary> {
        let (start_date, end_date) = query.range()?;
        let filter = SaleFilter {
            start_date,
            end_date,
            limit: u32::MAX,
            ..SaleFilter::default()
        };

        let mut tx = self.store.begin().await?;
        let sales = tx.list_sales(&filter).await?;
        tx.commit().await?;

        Ok(summarize(&sales))
    }
}

/// Totals, average margin and distinct counterparts of a set of sales
pub fn summarize(sales: &[Sale]) -> SalesSummary {
    if sales.is_empty() {
        return SalesSummary::default();
    }

    let customers: HashSet<i64> = sales.iter().map(|s| s.customer_id).collect();
    let items: HashSet<i64> = sales.iter().map(|s| s.item_id).collect();
    let margin_sum: Decimal = sales.iter().map(|s| s.margin_rate).sum();

    SalesSummary {
        total_transactions: sales.len() as i64,
        total_sales: sales.iter().map(|s| s.total_amount).sum(),
        total_profit: sales.iter().map(|s| s.profit_amount).sum(),
        avg_margin_rate: round_rate(margin_sum / Decimal::from(sales.len() as i64)),
        total_customers: customers.len() as i64,
        total_items: items.len() as i64,
    }
}
