//! Business logic services for the ERP

pub mod customer;
pub mod inventory;
pub mod item;
pub mod purchase;
pub mod reporting;
pub mod sale;
pub mod supplier;

pub use customer::CustomerService;
pub use inventory::InventoryService;
pub use item::ItemService;
pub use purchase::PurchaseService;
pub use reporting::{ReportingService, StatsQuery};
pub use sale::SaleService;
pub use supplier::SupplierService;
