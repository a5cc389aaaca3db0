//! Domain models for rachunek-service.

mod counter;
mod invoice;
mod money;
mod party;
mod report;

pub use counter::NumberingCounter;
pub use invoice::{
    invoice_number, Invoice, InvoiceDraft, InvoiceState, InvoiceSummary, NewInvoice,
};
pub use money::{from_grosze, to_grosze};
pub use party::Party;
pub use report::{MonthlySummary, OverallStats, TopBuyer, YearlySummary};

pub(crate) use invoice::{InvoiceRow, SummaryRow};
pub(crate) use report::month_name;
