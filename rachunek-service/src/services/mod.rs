//! Service layer: persistence, policy and orchestration.

pub mod auth;
pub mod database;
pub mod ledger;
pub mod lifecycle;
pub mod render;
pub mod validation;
pub mod words;

pub use auth::{AdminToken, AuthService, Password};
pub use database::Database;
pub use ledger::{Ledger, LimitVerdict, MonthStatus, MonthSummary};
pub use lifecycle::{InvoiceManager, IssuedInvoice};
pub use render::{DocumentData, DocumentRenderer, TextRenderer};
pub use validation::Validator;
