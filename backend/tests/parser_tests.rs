//! Spreadsheet parser tests
//!
//! Tests for reading historical sheets including:
//! - Property 5: Excel serial dates
//! - Property 6: Total rows are excluded
//! - Property 8: Repeated names collapse to one entity

use chrono::NaiveDate;
use erp_backend::import::{
    excel_serial_to_date, parse_date, parse_sheet, Cell, ParserOptions, DEFAULT_ITEM_NAME,
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{DatePolicy, SheetLayout};
use std::str::FromStr;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn options(layout: SheetLayout) -> ParserOptions {
    ParserOptions {
        layout,
        date_policy: DatePolicy::FallbackToToday,
        today: today(),
    }
}

fn ledger_header() -> Vec<Cell> {
    ["No", "거래처", "일자", "품목", "수량", "공급가액", "부가세", "합계금액", "비고", "원화단가"]
        .into_iter()
        .map(Cell::from)
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn ledger_row(
    customer: Cell,
    date: Cell,
    item: Cell,
    quantity: i64,
    supply: i64,
    vat: i64,
    total: i64,
    cost: i64,
) -> Vec<Cell> {
    vec![
        Cell::from(1i64),
        customer,
        date,
        item,
        Cell::from(quantity),
        Cell::from(supply),
        Cell::from(vat),
        Cell::from(total),
        Cell::Empty,
        Cell::from(cost),
    ]
}

/// Sheet with a title, a blank row and the header on the third row
fn ledger_sheet(data: Vec<Vec<Cell>>) -> Vec<Vec<Cell>> {
    let mut rows = vec![vec![Cell::from("매출 장부")], vec![], ledger_header()];
    rows.extend(data);
    rows
}

fn quote_header() -> Vec<Cell> {
    let mut row: Vec<Cell> = [
        "매출일", "고객", "품목코드", "품목", "수량", "공급가", "부가세", "매출금액", "",
        "매입일", "거래처", "", "", "수량", "공급가", "부가세", "매입금액",
    ]
    .into_iter()
    .map(Cell::from)
    .collect();
    row.truncate(17);
    row
}

fn quote_row(customer: &str, code: Cell, item: &str, supplier: &str) -> Vec<Cell> {
    vec![
        Cell::from("2024-03-05"),
        Cell::from(customer),
        code,
        Cell::from(item),
        Cell::from(2i64),
        Cell::from(20_000i64),
        Cell::from(2_000i64),
        Cell::from(22_000i64),
        Cell::Empty,
        Cell::from("2024.03.01"),
        Cell::from(supplier),
        Cell::Empty,
        Cell::Empty,
        Cell::from(2i64),
        Cell::from(14_000i64),
        Cell::from(1_400i64),
        Cell::from(15_400i64),
    ]
}

// ============================================================================
// Date Parsing
// ============================================================================

#[cfg(test)]
mod date_tests {
    use super::*;

    /// Property 5: Serial 45323 is 2024-02-01 and serial 1 is 1900-01-01
    #[test]
    fn test_excel_serials() {
        assert_eq!(
            excel_serial_to_date(45323.0),
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );
        assert_eq!(excel_serial_to_date(1.0), NaiveDate::from_ymd_opt(1900, 1, 1));
        assert_eq!(excel_serial_to_date(61.0), NaiveDate::from_ymd_opt(1900, 3, 1));
        assert_eq!(excel_serial_to_date(0.0), None);
    }

    #[test]
    fn test_time_of_day_discarded() {
        assert_eq!(
            excel_serial_to_date(45323.75),
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );
    }

    #[test]
    fn test_all_date_forms_agree() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 1);
        let cells = [
            Cell::Date(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()),
            Cell::from("2024-02-01"),
            Cell::from("2024/2/1"),
            Cell::from("2024.02.01"),
            Cell::from("2024-02-01 13:45:00"),
            Cell::from("2024년 2월 1일"),
            Cell::from("2024년2월1일"),
            Cell::Number(45323.0),
        ];
        for cell in &cells {
            assert_eq!(parse_date(cell), expected, "cell {:?}", cell);
        }
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(parse_date(&Cell::Empty), None);
        assert_eq!(parse_date(&Cell::from("내일")), None);
        assert_eq!(parse_date(&Cell::from("2024-13-01")), None);
    }
}

// ============================================================================
// Sales Ledger Layout
// ============================================================================

#[cfg(test)]
mod ledger_tests {
    use super::*;

    /// Property 8: Two ACME/Widget rows give one customer, one item and two sales
    #[test]
    fn test_repeated_names_collapse() {
        let rows = ledger_sheet(vec![
            ledger_row("ACME".into(), "2024-02-01".into(), "Widget".into(), 2, 2000, 200, 2200, 0),
            ledger_row("ACME".into(), "2024-02-02".into(), "Widget".into(), 3, 3000, 300, 3300, 0),
        ]);

        let sheet = parse_sheet(&rows, &options(SheetLayout::SalesLedger));

        assert_eq!(sheet.customers, vec!["ACME".to_string()]);
        assert_eq!(sheet.items.len(), 1);
        assert_eq!(sheet.items[0].code.as_deref(), Some("ITEM-001"));
        let totals: Vec<i64> = sheet.sales.iter().map(|s| s.figures.total_amount).collect();
        assert_eq!(totals, vec![2200, 3300]);
        assert!(sheet.purchases.is_empty());
    }

    #[test]
    fn test_row_numbers_are_one_based() {
        let rows = ledger_sheet(vec![ledger_row(
            "ACME".into(),
            "2024-02-01".into(),
            "Widget".into(),
            1,
            1000,
            100,
            1100,
            0,
        )]);

        let sheet = parse_sheet(&rows, &options(SheetLayout::SalesLedger));
        // Title, blank, header, then the data row
        assert_eq!(sheet.sales[0].raw_row_index, 4);
    }

    /// Property 6: A row whose customer contains 합계 counts nowhere
    #[test]
    fn test_total_rows_excluded() {
        let rows = ledger_sheet(vec![
            ledger_row("ACME".into(), "2024-02-01".into(), "Widget".into(), 1, 1000, 100, 1100, 0),
            ledger_row("합계".into(), Cell::Empty, Cell::Empty, 1, 1000, 100, 1100, 0),
            ledger_row("2월 소계".into(), Cell::Empty, Cell::Empty, 1, 1000, 100, 1100, 0),
        ]);

        let sheet = parse_sheet(&rows, &options(SheetLayout::SalesLedger));

        assert_eq!(sheet.sales.len(), 1);
        assert_eq!(sheet.customers, vec!["ACME".to_string()]);
        assert!(sheet.rejected_rows.is_empty());
    }

    #[test]
    fn test_invalid_rows_skipped() {
        let rows = ledger_sheet(vec![
            // Customer is not text
            ledger_row(Cell::from(42i64), "2024-02-01".into(), "Widget".into(), 1, 1000, 100, 1100, 0),
            // Too short
            vec![Cell::from(1i64), Cell::from("ACME")],
            // Nothing to sell
            ledger_row("ACME".into(), "2024-02-01".into(), "Widget".into(), 1, 0, 0, 0, 0),
        ]);

        let sheet = parse_sheet(&rows, &options(SheetLayout::SalesLedger));
        assert!(sheet.sales.is_empty());
        assert!(sheet.customers.is_empty());
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        // Quantity 0, total missing, no item name
        let rows = ledger_sheet(vec![ledger_row(
            "ACME".into(),
            "2024-02-01".into(),
            Cell::Empty,
            0,
            1000,
            100,
            0,
            600,
        )]);

        let sheet = parse_sheet(&rows, &options(SheetLayout::SalesLedger));
        let sale = &sheet.sales[0];

        assert_eq!(sale.item_name, DEFAULT_ITEM_NAME);
        assert_eq!(sale.figures.quantity, 1);
        assert_eq!(sale.figures.total_amount, 1100);
        assert_eq!(sale.figures.unit_price, 1000);
        assert_eq!(sale.figures.profit_amount, 500);
        assert_eq!(sale.figures.margin_rate, dec("45.5"));
    }

    #[test]
    fn test_text_amounts_with_separators() {
        let mut row = ledger_row("ACME".into(), "2024-02-01".into(), "Widget".into(), 1, 0, 0, 0, 0);
        row[5] = Cell::from("1,000");
        row[6] = Cell::from("100원");
        let rows = ledger_sheet(vec![row]);

        let sheet = parse_sheet(&rows, &options(SheetLayout::SalesLedger));
        assert_eq!(sheet.sales[0].figures.supply_price, 1000);
        assert_eq!(sheet.sales[0].figures.total_amount, 1100);
    }

    #[test]
    fn test_unparseable_date_falls_back_to_today() {
        let rows = ledger_sheet(vec![ledger_row(
            "ACME".into(),
            "언젠가".into(),
            "Widget".into(),
            1,
            1000,
            100,
            1100,
            0,
        )]);

        let sheet = parse_sheet(&rows, &options(SheetLayout::SalesLedger));
        assert_eq!(sheet.sales[0].sale_date, today());
    }

    #[test]
    fn test_unparseable_date_rejected_under_strict_policy() {
        let rows = ledger_sheet(vec![
            ledger_row("ACME".into(), "언젠가".into(), "Widget".into(), 1, 1000, 100, 1100, 0),
            ledger_row("Beta".into(), "2024-02-01".into(), "Gadget".into(), 1, 1000, 100, 1100, 0),
        ]);
        let strict = ParserOptions {
            date_policy: DatePolicy::Reject,
            ..options(SheetLayout::SalesLedger)
        };

        let sheet = parse_sheet(&rows, &strict);

        assert_eq!(sheet.sales.len(), 1);
        assert_eq!(sheet.customers, vec!["Beta".to_string()]);
        assert_eq!(sheet.rejected_rows.len(), 1);
        assert_eq!(sheet.rejected_rows[0].row, 4);
    }

    #[test]
    fn test_fallback_data_start_without_header() {
        let mut rows: Vec<Vec<Cell>> = vec![vec![]; 4];
        rows.push(ledger_row("ACME".into(), "2024-02-01".into(), "Widget".into(), 1, 1000, 100, 1100, 0));

        let sheet = parse_sheet(&rows, &options(SheetLayout::SalesLedger));
        assert_eq!(sheet.sales.len(), 1);
        assert_eq!(sheet.sales[0].raw_row_index, 5);
    }

    #[test]
    fn test_generated_item_codes_follow_first_seen_order() {
        let rows = ledger_sheet(vec![
            ledger_row("ACME".into(), "2024-02-01".into(), "Widget".into(), 1, 1000, 100, 1100, 0),
            ledger_row("ACME".into(), "2024-02-01".into(), "Gadget".into(), 1, 1000, 100, 1100, 0),
            ledger_row("Beta".into(), "2024-02-01".into(), "Widget".into(), 1, 1000, 100, 1100, 0),
        ]);

        let sheet = parse_sheet(&rows, &options(SheetLayout::SalesLedger));
        let codes: Vec<_> = sheet.items.iter().map(|i| i.code.clone().unwrap()).collect();
        assert_eq!(codes, vec!["ITEM-001", "ITEM-002"]);
        assert_eq!(sheet.sales[2].item_code.as_deref(), Some("ITEM-001"));
    }
}

// ============================================================================
// Sales and Purchases Layout
// ============================================================================

#[cfg(test)]
mod quote_tests {
    use super::*;

    #[test]
    fn test_row_splits_into_sale_and_purchase() {
        let rows = vec![
            quote_header(),
            quote_row("ACME", Cell::from("W-1"), "Widget", "PartsCo"),
        ];

        let sheet = parse_sheet(&rows, &options(SheetLayout::SalesAndPurchases));

        assert_eq!(sheet.sales.len(), 1);
        assert_eq!(sheet.purchases.len(), 1);
        assert_eq!(sheet.customers, vec!["ACME".to_string()]);
        assert_eq!(sheet.suppliers, vec!["PartsCo".to_string()]);

        let sale = &sheet.sales[0];
        assert_eq!(sale.sale_date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(sale.figures.unit_price, 10_000);
        assert_eq!(sale.figures.purchase_price, 7_000);
        assert_eq!(sale.figures.profit_amount, 6_600);
        assert_eq!(sale.figures.margin_rate, dec("30"));

        let purchase = &sheet.purchases[0];
        assert_eq!(purchase.purchase_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(purchase.figures.unit_cost, 7_000);
        assert_eq!(purchase.figures.total_amount, 15_400);
        assert_eq!(purchase.figures.expected_sale_price, 10_000);
        assert_eq!(purchase.figures.expected_margin, dec("30"));
        assert_eq!(purchase.item_code.as_deref(), Some("W-1"));
    }

    #[test]
    fn test_missing_code_uses_row_based_code() {
        let rows = vec![quote_header(), quote_row("ACME", Cell::Empty, "Widget", "PartsCo")];

        let sheet = parse_sheet(&rows, &options(SheetLayout::SalesAndPurchases));
        // Second sheet row, zero-based index 1
        assert_eq!(sheet.items[0].code.as_deref(), Some("ITEM-1"));
    }

    #[test]
    fn test_row_without_supplier_skipped() {
        let rows = vec![quote_header(), quote_row("ACME", Cell::Empty, "Widget", " ")];

        let sheet = parse_sheet(&rows, &options(SheetLayout::SalesAndPurchases));
        assert!(sheet.sales.is_empty());
        assert!(sheet.purchases.is_empty());
    }

    #[test]
    fn test_short_rows_skipped() {
        let mut short = quote_row("ACME", Cell::Empty, "Widget", "PartsCo");
        short.truncate(16);
        let rows = vec![quote_header(), short];

        let sheet = parse_sheet(&rows, &options(SheetLayout::SalesAndPurchases));
        assert!(sheet.sales.is_empty());
    }

    #[test]
    fn test_first_code_wins_for_item() {
        let rows = vec![
            quote_header(),
            quote_row("ACME", Cell::from("W-1"), "Widget", "PartsCo"),
            quote_row("Beta", Cell::from("W-2"), "Widget", "PartsCo"),
        ];

        let sheet = parse_sheet(&rows, &options(SheetLayout::SalesAndPurchases));
        assert_eq!(sheet.items.len(), 1);
        assert_eq!(sheet.items[0].code.as_deref(), Some("W-1"));
        assert_eq!(sheet.suppliers.len(), 1);
        assert_eq!(sheet.customers.len(), 2);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn name_strategy() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["ACME", "Beta", "Gamma", "Delta"]).prop_map(String::from)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property 5: Every serial from 61 on maps to consecutive days
        #[test]
        fn prop_excel_serials_consecutive(serial in 61u32..2_958_465) {
            let day = excel_serial_to_date(f64::from(serial)).unwrap();
            let next = excel_serial_to_date(f64::from(serial + 1)).unwrap();
            prop_assert_eq!(next - day, chrono::Duration::days(1));
        }

        /// Property 8: Entity lists are distinct, one sale per valid row
        #[test]
        fn prop_entities_distinct(names in prop::collection::vec(name_strategy(), 1..30)) {
            let data: Vec<Vec<Cell>> = names
                .iter()
                .map(|n| {
                    ledger_row(
                        Cell::from(n.as_str()),
                        "2024-02-01".into(),
                        Cell::from(n.as_str()),
                        1,
                        1000,
                        100,
                        1100,
                        0,
                    )
                })
                .collect();

            let sheet = parse_sheet(&ledger_sheet(data), &options(SheetLayout::SalesLedger));

            let mut distinct = names.clone();
            distinct.sort();
            distinct.dedup();
            prop_assert_eq!(sheet.sales.len(), names.len());
            prop_assert_eq!(sheet.customers.len(), distinct.len());
            prop_assert_eq!(sheet.items.len(), distinct.len());
            prop_assert_eq!(&sheet.customers[0], &names[0]);
        }
    }
}
