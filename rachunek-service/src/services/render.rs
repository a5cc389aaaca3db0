//! Invoice document rendering.
//!
//! Documents are plain-text artifacts written next to the database. The
//! renderer sits behind a trait so a richer format can slot in without
//! touching the issuing path.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rachunek_core::error::AppError;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::models::{Invoice, NewInvoice, Party};

const LINE_WIDTH: usize = 64;

/// Everything a renderer needs, independent of whether the invoice has
/// been persisted yet.
#[derive(Debug, Clone)]
pub struct DocumentData {
    pub number: String,
    pub issue_date: NaiveDate,
    pub service_date: NaiveDate,
    pub seller: Party,
    pub buyer: Party,
    pub service_description: String,
    pub amount_due: Decimal,
    pub amount_in_words: String,
}

impl From<&NewInvoice> for DocumentData {
    fn from(invoice: &NewInvoice) -> Self {
        DocumentData {
            number: invoice.number.clone(),
            issue_date: invoice.issue_date,
            service_date: invoice.service_date,
            seller: invoice.seller.clone(),
            buyer: invoice.buyer.clone(),
            service_description: invoice.service_description.clone(),
            amount_due: invoice.amount_due,
            amount_in_words: invoice.amount_in_words.clone(),
        }
    }
}

impl From<&Invoice> for DocumentData {
    fn from(invoice: &Invoice) -> Self {
        DocumentData {
            number: invoice.number.clone(),
            issue_date: invoice.issue_date,
            service_date: invoice.service_date,
            seller: invoice.seller.clone(),
            buyer: invoice.buyer.clone(),
            service_description: invoice.service_description.clone(),
            amount_due: invoice.amount_due,
            amount_in_words: invoice.amount_in_words.clone(),
        }
    }
}

pub trait DocumentRenderer: Send + Sync {
    /// Render the document into `output_dir` and return the written path.
    fn render(&self, document: &DocumentData, output_dir: &Path) -> Result<PathBuf, AppError>;
}

/// Renders a fixed-width text document, one file per invoice.
#[derive(Debug, Clone, Default)]
pub struct TextRenderer;

impl TextRenderer {
    pub fn new() -> Self {
        Self
    }

    fn compose(document: &DocumentData) -> String {
        let rule = "=".repeat(LINE_WIDTH);
        let thin_rule = "-".repeat(LINE_WIDTH);
        let title = format!("RACHUNEK nr {}", document.number);
        let width = LINE_WIDTH;

        let mut out = String::new();
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&format!("{title:^width$}\n"));
        out.push_str(&rule);
        out.push_str("\n\n");
        out.push_str(&format!(
            "Data wystawienia: {}\n",
            document.issue_date.format("%Y-%m-%d")
        ));
        out.push_str(&format!(
            "Data wykonania usługi: {}\n\n",
            document.service_date.format("%Y-%m-%d")
        ));

        out.push_str("SPRZEDAWCA:\n");
        push_party(&mut out, &document.seller);
        out.push_str("\nNABYWCA:\n");
        push_party(&mut out, &document.buyer);

        out.push('\n');
        out.push_str(&thin_rule);
        out.push('\n');
        out.push_str(&format!("Nazwa usługi: {}\n", document.service_description));
        out.push_str(&thin_rule);
        out.push_str("\n\n");
        out.push_str(&format!("DO ZAPŁATY: {:.2} PLN\n", document.amount_due));
        out.push_str(&format!("Słownie: {}\n", document.amount_in_words));
        out
    }
}

impl DocumentRenderer for TextRenderer {
    #[instrument(skip_all, fields(number = %document.number))]
    fn render(&self, document: &DocumentData, output_dir: &Path) -> Result<PathBuf, AppError> {
        std::fs::create_dir_all(output_dir)
            .map_err(|err| AppError::RenderError(anyhow::Error::new(err)))?;

        let file_name = format!("rachunek_{}.txt", document.number.replace('/', "_"));
        let path = output_dir.join(file_name);
        let contents = Self::compose(document);

        // Temp-and-rename so a crash never leaves a half-written document.
        let tmp = path.with_extension("txt.tmp");
        std::fs::write(&tmp, contents.as_bytes())
            .map_err(|err| AppError::RenderError(anyhow::Error::new(err)))?;
        std::fs::rename(&tmp, &path)
            .map_err(|err| AppError::RenderError(anyhow::Error::new(err)))?;

        info!(path = %path.display(), "Invoice document written");
        Ok(path)
    }
}

fn push_party(out: &mut String, party: &Party) {
    out.push_str(&format!("  {}\n", party.full_name()));
    out.push_str(&format!("  {} {}\n", party.street, party.house_number));
    out.push_str(&format!("  {} {}\n", party.postal_code, party.city));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample_document() -> DocumentData {
        DocumentData {
            number: "1/08/2025".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2025, 8, 20).unwrap(),
            service_date: NaiveDate::from_ymd_opt(2025, 8, 14).unwrap(),
            seller: Party {
                first_name: "Jan".to_string(),
                last_name: "Kowalski".to_string(),
                street: "Polna".to_string(),
                house_number: "12a/3".to_string(),
                postal_code: "00-950".to_string(),
                city: "Warszawa".to_string(),
            },
            buyer: Party {
                first_name: "Anna".to_string(),
                last_name: "Nowak".to_string(),
                street: "Długa".to_string(),
                house_number: "7".to_string(),
                postal_code: "30-001".to_string(),
                city: "Kraków".to_string(),
            },
            service_description: "Korepetycje z matematyki".to_string(),
            amount_due: dec!(150.00),
            amount_in_words: "sto pięćdziesiąt złotych 00/100".to_string(),
        }
    }

    #[test]
    fn document_contains_all_mandatory_sections() {
        let text = TextRenderer::compose(&sample_document());
        assert!(text.contains("RACHUNEK nr 1/08/2025"));
        assert!(text.contains("Data wystawienia: 2025-08-20"));
        assert!(text.contains("Data wykonania usługi: 2025-08-14"));
        assert!(text.contains("Jan Kowalski"));
        assert!(text.contains("Anna Nowak"));
        assert!(text.contains("DO ZAPŁATY: 150.00 PLN"));
        assert!(text.contains("Słownie: sto pięćdziesiąt złotych 00/100"));
    }

    #[test]
    fn file_name_replaces_slashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = TextRenderer::new()
            .render(&sample_document(), dir.path())
            .unwrap();
        assert!(path.ends_with("rachunek_1_08_2025.txt"));
        assert!(path.exists());
        assert!(!dir.path().join("rachunek_1_08_2025.txt.tmp").exists());
    }

    #[test]
    fn rendering_twice_overwrites_the_document() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = TextRenderer::new();
        let document = sample_document();
        let first = renderer.render(&document, dir.path()).unwrap();
        let second = renderer.render(&document, dir.path()).unwrap();
        assert_eq!(first, second);
    }
}
