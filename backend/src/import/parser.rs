//! Spreadsheet row parser
//!
//! Turns raw sheet rows into typed sale and purchase records plus the
//! distinct customers, suppliers and items they mention. Column offsets of
//! each layout live in its row view ([`LedgerRow`], [`QuoteRow`]).

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shared::{
    expected_margin, margin_rate, profit, unit_price_from_supply, DatePolicy, PurchaseFigures,
    RejectedRow, SaleFigures, SheetLayout, Won,
};

use super::cell::{Cell, EMPTY};
use super::date::parse_date;

/// Item name used when a row leaves it blank
pub const DEFAULT_ITEM_NAME: &str = "품목명없음";

/// Parser settings
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    pub layout: SheetLayout,
    pub date_policy: DatePolicy,
    /// Date used for unparseable date cells under the lenient policy
    pub today: NaiveDate,
}

struct LayoutSpec {
    header_scan_rows: usize,
    markers: &'static [&'static str],
    fallback_start: usize,
    min_width: usize,
}

const SALES_LEDGER: LayoutSpec = LayoutSpec {
    header_scan_rows: 4,
    markers: &["거래처", "품목"],
    fallback_start: 4,
    min_width: 3,
};

const SALES_AND_PURCHASES: LayoutSpec = LayoutSpec {
    header_scan_rows: 10,
    markers: &["거래처", "고객", "품목", "수량", "금액", "매출"],
    fallback_start: 6,
    min_width: 17,
};

impl LayoutSpec {
    fn of(layout: SheetLayout) -> &'static LayoutSpec {
        match layout {
            SheetLayout::SalesLedger => &SALES_LEDGER,
            SheetLayout::SalesAndPurchases => &SALES_AND_PURCHASES,
        }
    }

    /// Index of the first data row: after the first header-looking row, or
    /// the layout's fixed offset when none is found
    fn data_start(&self, rows: &[Vec<Cell>]) -> usize {
        rows.iter()
            .take(self.header_scan_rows)
            .position(|row| {
                if row.len() <= 5 {
                    return false;
                }
                let joined: String = row.iter().filter_map(Cell::display).collect();
                self.markers.iter().any(|m| joined.contains(m))
            })
            .map_or(self.fallback_start, |i| i + 1)
    }
}

/// A sale read from a sheet row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSale {
    /// One-based row number in the sheet
    pub raw_row_index: usize,
    pub customer_name: String,
    pub item_name: String,
    pub item_code: Option<String>,
    pub sale_date: NaiveDate,
    pub figures: SaleFigures,
}

/// A purchase read from a sheet row; imported purchases are already received
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPurchase {
    pub raw_row_index: usize,
    pub supplier_name: String,
    pub item_name: String,
    pub item_code: Option<String>,
    pub purchase_date: NaiveDate,
    pub figures: PurchaseFigures,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedItem {
    pub name: String,
    pub code: Option<String>,
}

/// Everything read from one sheet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSheet {
    pub layout: Option<SheetLayout>,
    pub sales: Vec<ParsedSale>,
    pub purchases: Vec<ParsedPurchase>,
    /// Distinct names in first-seen order
    pub customers: Vec<String>,
    pub suppliers: Vec<String>,
    pub items: Vec<ParsedItem>,
    pub rejected_rows: Vec<RejectedRow>,
}

/// Parse raw rows according to the layout in `options`
pub fn parse_sheet(rows: &[Vec<Cell>], options: &ParserOptions) -> ParsedSheet {
    let spec = LayoutSpec::of(options.layout);
    let start = spec.data_start(rows);
    tracing::debug!(layout = %options.layout, data_start = start + 1, "Parsing sheet");

    let mut builder = SheetBuilder::new(*options);
    for (index, row) in rows.iter().enumerate().skip(start) {
        if row.len() < spec.min_width {
            continue;
        }
        match options.layout {
            SheetLayout::SalesLedger => builder.ledger_row(index + 1, LedgerRow(row)),
            SheetLayout::SalesAndPurchases => builder.quote_row(index + 1, QuoteRow(row)),
        }
    }

    let sheet = builder.finish();
    tracing::info!(
        sales = sheet.sales.len(),
        purchases = sheet.purchases.len(),
        customers = sheet.customers.len(),
        suppliers = sheet.suppliers.len(),
        items = sheet.items.len(),
        rejected = sheet.rejected_rows.len(),
        "Sheet parsed"
    );
    sheet
}

/// Subtotal and grand-total rows (소계, 합계) name their group with 계
fn is_total_row(key: &str) -> bool {
    key.contains('계')
}

// ============================================================================
// Row views
// ============================================================================

/// Row of the sales ledger layout
struct LedgerRow<'a>(&'a [Cell]);

impl<'a> LedgerRow<'a> {
    fn cell(&self, i: usize) -> &'a Cell {
        self.0.get(i).unwrap_or(&EMPTY)
    }

    /// Customer name; the cell must hold text
    fn customer(&self) -> Option<&'a str> {
        self.cell(1).as_text()
    }

    fn date(&self) -> &'a Cell {
        self.cell(2)
    }

    fn item_name(&self) -> String {
        self.cell(3)
            .display()
            .unwrap_or_else(|| DEFAULT_ITEM_NAME.to_string())
    }

    fn quantity(&self) -> i64 {
        self.cell(4).int_or(1)
    }

    fn supply(&self) -> Won {
        self.cell(5).int_or(0)
    }

    fn vat(&self) -> Won {
        self.cell(6).int_or(0)
    }

    fn total(&self) -> Won {
        self.cell(7).int_or(self.supply().saturating_add(self.vat()))
    }

    /// Unit purchase price (원화단가)
    fn purchase_price(&self) -> Won {
        self.cell(9).int_or(0)
    }
}

/// Row of the quotation layout: sale on the left, purchase on the right
struct QuoteRow<'a>(&'a [Cell]);

impl<'a> QuoteRow<'a> {
    fn cell(&self, i: usize) -> &'a Cell {
        self.0.get(i).unwrap_or(&EMPTY)
    }

    fn sale_date(&self) -> &'a Cell {
        self.cell(0)
    }

    fn customer(&self) -> Option<String> {
        self.cell(1).display()
    }

    fn item_code(&self) -> Option<String> {
        self.cell(2).display()
    }

    fn item_name(&self) -> String {
        self.cell(3)
            .display()
            .unwrap_or_else(|| DEFAULT_ITEM_NAME.to_string())
    }

    fn sale_quantity(&self) -> i64 {
        self.cell(4).int_or(1)
    }

    fn sale_supply(&self) -> Won {
        self.cell(5).int_or(0)
    }

    fn sale_vat(&self) -> Won {
        self.cell(6).int_or(0)
    }

    fn sale_total(&self) -> Won {
        self.cell(7)
            .int_or(self.sale_supply().saturating_add(self.sale_vat()))
    }

    fn purchase_date(&self) -> &'a Cell {
        self.cell(9)
    }

    fn supplier(&self) -> Option<String> {
        self.cell(10).display()
    }

    fn purchase_quantity(&self) -> i64 {
        self.cell(13).int_or(1)
    }

    /// Total purchase supply amount of the row, not a unit price
    fn purchase_supply(&self) -> Won {
        self.cell(14).int_or(0)
    }

    fn purchase_vat(&self) -> Won {
        self.cell(15).int_or(0)
    }

    fn purchase_total(&self) -> Won {
        self.cell(16).int_or(0)
    }
}

// ============================================================================
// Builder
// ============================================================================

#[derive(Default)]
struct FirstSeen {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl FirstSeen {
    fn add(&mut self, name: &str) {
        if self.seen.insert(name.to_string()) {
            self.names.push(name.to_string());
        }
    }
}

struct SheetBuilder {
    options: ParserOptions,
    sheet: ParsedSheet,
    customers: FirstSeen,
    suppliers: FirstSeen,
    item_index: HashMap<String, usize>,
}

impl SheetBuilder {
    fn new(options: ParserOptions) -> Self {
        Self {
            options,
            sheet: ParsedSheet {
                layout: Some(options.layout),
                ..ParsedSheet::default()
            },
            customers: FirstSeen::default(),
            suppliers: FirstSeen::default(),
            item_index: HashMap::new(),
        }
    }

    /// Parse a date cell under the configured policy
    fn date(&mut self, row: usize, column: &str, cell: &Cell) -> Option<NaiveDate> {
        if let Some(date) = parse_date(cell) {
            return Some(date);
        }
        match self.options.date_policy {
            DatePolicy::FallbackToToday => {
                tracing::warn!(row, column, value = ?cell, "Unparseable date, using today");
                Some(self.options.today)
            }
            DatePolicy::Reject => {
                tracing::warn!(row, column, value = ?cell, "Unparseable date, row rejected");
                self.sheet.rejected_rows.push(RejectedRow {
                    row,
                    reason: format!("unparseable {}: {:?}", column, cell),
                });
                None
            }
        }
    }

    /// Register an item; returns the code it is known by
    fn item(&mut self, name: &str, code: Option<String>) -> Option<String> {
        if let Some(&i) = self.item_index.get(name) {
            return self.sheet.items[i].code.clone();
        }
        self.item_index.insert(name.to_string(), self.sheet.items.len());
        self.sheet.items.push(ParsedItem {
            name: name.to_string(),
            code: code.clone(),
        });
        code
    }

    fn ledger_row(&mut self, row: usize, view: LedgerRow<'_>) {
        let Some(customer) = view.customer() else {
            return;
        };
        if is_total_row(customer) {
            return;
        }

        let quantity = view.quantity();
        let supply = view.supply();
        let vat = view.vat();
        let total = view.total();
        if total <= 0 {
            return;
        }
        let Some(sale_date) = self.date(row, "sale date", view.date()) else {
            return;
        };

        let item_name = view.item_name();
        let generated = format!("ITEM-{:03}", self.sheet.items.len() + 1);
        let item_code = self.item(&item_name, Some(generated));
        self.customers.add(customer);

        let purchase_price = view.purchase_price();
        let profit_amount = profit(total, purchase_price, quantity);
        self.sheet.sales.push(ParsedSale {
            raw_row_index: row,
            customer_name: customer.to_string(),
            item_name,
            item_code,
            sale_date,
            figures: SaleFigures {
                quantity,
                unit_price: unit_price_from_supply(supply, quantity),
                supply_price: supply,
                vat_amount: vat,
                total_amount: total,
                purchase_price,
                profit_amount,
                margin_rate: margin_rate(profit_amount, total),
            },
        });
    }

    fn quote_row(&mut self, row: usize, view: QuoteRow<'_>) {
        let (Some(customer), Some(supplier)) = (view.customer(), view.supplier()) else {
            return;
        };
        if is_total_row(&customer) {
            return;
        }

        let quantity = view.sale_quantity();
        let supply = view.sale_supply();
        let vat = view.sale_vat();
        let total = view.sale_total();
        if total <= 0 {
            return;
        }

        let Some(sale_date) = self.date(row, "sale date", view.sale_date()) else {
            return;
        };
        let Some(purchase_date) = self.date(row, "purchase date", view.purchase_date()) else {
            return;
        };

        let purchase_quantity = view.purchase_quantity();
        let purchase_supply = view.purchase_supply();
        let purchase_total = view.purchase_total();
        let unit_cost = unit_price_from_supply(purchase_supply, purchase_quantity);
        let unit_price = unit_price_from_supply(supply, quantity);
        let profit_amount = total.saturating_sub(purchase_total);

        let item_name = view.item_name();
        let row_code = view
            .item_code()
            .unwrap_or_else(|| format!("ITEM-{}", row - 1));
        self.item(&item_name, Some(row_code.clone()));
        self.customers.add(&customer);
        self.suppliers.add(&supplier);

        self.sheet.sales.push(ParsedSale {
            raw_row_index: row,
            customer_name: customer,
            item_name: item_name.clone(),
            item_code: Some(row_code.clone()),
            sale_date,
            figures: SaleFigures {
                quantity,
                unit_price,
                supply_price: supply,
                vat_amount: vat,
                total_amount: total,
                purchase_price: unit_cost,
                profit_amount,
                margin_rate: margin_rate(profit_amount, total),
            },
        });

        self.sheet.purchases.push(ParsedPurchase {
            raw_row_index: row,
            supplier_name: supplier,
            item_name,
            item_code: Some(row_code),
            purchase_date,
            figures: PurchaseFigures {
                quantity: purchase_quantity,
                unit_cost,
                supply_amount: purchase_supply,
                vat_amount: view.purchase_vat(),
                total_amount: purchase_total,
                expected_sale_price: unit_price,
                expected_margin: expected_margin(unit_price, unit_cost),
            },
        });
    }

    fn finish(mut self) -> ParsedSheet {
        self.sheet.customers = self.customers.names;
        self.sheet.suppliers = self.suppliers.names;
        self.sheet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: Vec<Cell>) -> Vec<Cell> {
        cells
    }

    #[test]
    fn test_header_detection_falls_back_to_offset() {
        let rows = vec![vec![Cell::text("매출장")], vec![], vec![], vec![], vec![]];
        assert_eq!(SALES_LEDGER.data_start(&rows), 4);
    }

    #[test]
    fn test_header_detection_needs_wide_row() {
        let narrow = row(vec![Cell::text("거래처"), Cell::text("품목")]);
        let wide = row((0..6).map(|i| Cell::text(format!("거래처{}", i))).collect());
        let rows = vec![narrow, wide];
        assert_eq!(SALES_LEDGER.data_start(&rows), 2);
    }

    #[test]
    fn test_total_row_filter() {
        assert!(is_total_row("합계"));
        assert!(is_total_row("소계"));
        assert!(!is_total_row("대한전자"));
    }
}
