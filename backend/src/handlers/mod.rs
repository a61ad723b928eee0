//! HTTP request handlers

pub mod health;
pub mod import;
pub mod items;
pub mod partners;
pub mod transactions;

pub use health::*;
pub use import::*;
pub use items::*;
pub use partners::*;
pub use transactions::*;
