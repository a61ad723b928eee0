//! Spreadsheet import: raw cells to reconciled records

pub mod cell;
pub mod date;
pub mod orchestrator;
pub mod parser;
pub mod resolver;
pub mod source;

pub use cell::Cell;
pub use date::{excel_serial_to_date, parse_date};
pub use orchestrator::{ImportOptions, Importer, DEFAULT_BATCH_SIZE};
pub use parser::{
    parse_sheet, ParsedItem, ParsedPurchase, ParsedSale, ParsedSheet, ParserOptions,
    DEFAULT_ITEM_NAME,
};
pub use resolver::EntityResolver;
pub use source::{CsvSheet, SheetSource, Workbook};
