//! Domain models for the ERP

mod customer;
mod import;
mod inventory;
mod item;
mod purchase;
mod sale;

pub use customer::*;
pub use import::*;
pub use inventory::*;
pub use item::*;
pub use purchase::*;
pub use sale::*;
