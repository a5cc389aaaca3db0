//! rachunek-core: Shared infrastructure for the rachunek invoicing crates.
pub mod config;
pub mod error;
pub mod observability;

pub use serde;
pub use tracing;
