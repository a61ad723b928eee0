//! Shared types and money math for the small-business ERP
//!
//! This crate contains the domain models and the derived-amount
//! calculations used by the backend and by the front end (via WASM).

pub mod models;
pub mod money;
pub mod types;
pub mod validation;

pub use models::*;
pub use money::*;
pub use types::*;
pub use validation::*;
