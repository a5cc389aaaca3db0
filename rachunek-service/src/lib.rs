//! rachunek-service: core of a simplified-invoice system for a sole
//! proprietor. Issues sequentially numbered invoices, enforces the
//! statutory monthly revenue limit, persists invoices in SQLite, and
//! renders each as a text document.
//!
//! The desktop UI is an external collaborator; [`services::InvoiceManager`]
//! is the narrow interface it calls.

pub mod models;
pub mod services;

pub use rachunek_core::config::Config;
pub use rachunek_core::error::AppError;
pub use services::InvoiceManager;
