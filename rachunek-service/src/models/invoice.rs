use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::money::from_grosze;
use super::party::Party;

/// Lifecycle state of a persisted invoice. A hard-deleted row no longer
/// exists, so only these two states are ever observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceState {
    Active,
    Deleted,
}

/// An issued invoice. Immutable once issued except for soft-delete
/// metadata and the artifact path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    /// Unique number in the `seq/MM/YYYY` format.
    pub number: String,
    pub issue_date: NaiveDate,
    pub service_date: NaiveDate,
    pub seller: Party,
    pub buyer: Party,
    pub service_description: String,
    pub unit_price: Decimal,
    pub amount_due: Decimal,
    pub amount_in_words: String,
    pub artifact_path: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub deleted_utc: Option<DateTime<Utc>>,
    pub delete_reason: Option<String>,
    pub deleted_by: Option<String>,
}

impl Invoice {
    pub fn state(&self) -> InvoiceState {
        if self.deleted_utc.is_some() {
            InvoiceState::Deleted
        } else {
            InvoiceState::Active
        }
    }
}

/// Raw create input as supplied by the caller (UI form fields). Dates and
/// amounts are strings until normalization; absent sections stay `None` so
/// the validator can report a single "section required" message instead of
/// cascading field errors.
#[derive(Debug, Clone, Default)]
pub struct InvoiceDraft {
    pub seller: Option<Party>,
    pub buyer: Option<Party>,
    pub service_date: Option<String>,
    pub service_description: Option<String>,
    pub unit_price: Option<String>,
}

/// A finalized invoice record ready for rendering and insertion: numbered
/// and stamped, but not yet persisted (no row id).
#[derive(Debug, Clone)]
pub struct NewInvoice {
    pub number: String,
    pub issue_date: NaiveDate,
    pub service_date: NaiveDate,
    pub seller: Party,
    pub buyer: Party,
    pub service_description: String,
    pub unit_price: Decimal,
    pub amount_due: Decimal,
    pub amount_in_words: String,
}

/// List/search projection of an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub id: i64,
    pub number: String,
    pub issue_date: NaiveDate,
    pub buyer_name: String,
    pub amount_due: Decimal,
    pub artifact_path: Option<String>,
}

/// Compose the fixed `seq/MM/YYYY` invoice number.
pub fn invoice_number(sequence: i64, month: u32, year: i32) -> String {
    format!("{}/{:02}/{:04}", sequence, month, year)
}

/// Flat row as stored in the `invoices` table; amounts in grosze.
#[derive(Debug, FromRow)]
pub(crate) struct InvoiceRow {
    pub id: i64,
    pub number: String,
    pub issue_date: NaiveDate,
    pub service_date: NaiveDate,
    pub seller_first_name: String,
    pub seller_last_name: String,
    pub seller_street: String,
    pub seller_house_number: String,
    pub seller_postal_code: String,
    pub seller_city: String,
    pub buyer_first_name: String,
    pub buyer_last_name: String,
    pub buyer_street: String,
    pub buyer_house_number: String,
    pub buyer_postal_code: String,
    pub buyer_city: String,
    pub service_description: String,
    pub unit_price_grosze: i64,
    pub amount_due_grosze: i64,
    pub amount_in_words: String,
    pub artifact_path: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub deleted_utc: Option<DateTime<Utc>>,
    pub delete_reason: Option<String>,
    pub deleted_by: Option<String>,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Invoice {
            id: row.id,
            number: row.number,
            issue_date: row.issue_date,
            service_date: row.service_date,
            seller: Party {
                first_name: row.seller_first_name,
                last_name: row.seller_last_name,
                street: row.seller_street,
                house_number: row.seller_house_number,
                postal_code: row.seller_postal_code,
                city: row.seller_city,
            },
            buyer: Party {
                first_name: row.buyer_first_name,
                last_name: row.buyer_last_name,
                street: row.buyer_street,
                house_number: row.buyer_house_number,
                postal_code: row.buyer_postal_code,
                city: row.buyer_city,
            },
            service_description: row.service_description,
            unit_price: from_grosze(row.unit_price_grosze),
            amount_due: from_grosze(row.amount_due_grosze),
            amount_in_words: row.amount_in_words,
            artifact_path: row.artifact_path,
            created_utc: row.created_utc,
            deleted_utc: row.deleted_utc,
            delete_reason: row.delete_reason,
            deleted_by: row.deleted_by,
        }
    }
}

/// Row shape for list/search queries.
#[derive(Debug, FromRow)]
pub(crate) struct SummaryRow {
    pub id: i64,
    pub number: String,
    pub issue_date: NaiveDate,
    pub buyer_first_name: String,
    pub buyer_last_name: String,
    pub amount_due_grosze: i64,
    pub artifact_path: Option<String>,
}

impl From<SummaryRow> for InvoiceSummary {
    fn from(row: SummaryRow) -> Self {
        InvoiceSummary {
            id: row.id,
            number: row.number,
            issue_date: row.issue_date,
            buyer_name: format!("{} {}", row.buyer_first_name, row.buyer_last_name),
            amount_due: from_grosze(row.amount_due_grosze),
            artifact_path: row.artifact_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_format_pads_month_and_year() {
        assert_eq!(invoice_number(1, 8, 2025), "1/08/2025");
        assert_eq!(invoice_number(12, 11, 2025), "12/11/2025");
    }
}
