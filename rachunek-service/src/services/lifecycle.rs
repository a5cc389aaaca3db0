//! Invoice lifecycle orchestration: the issuing path and the
//! admin-gated destructive operations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use rachunek_core::config::Config;
use rachunek_core::error::AppError;
use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::models::{
    Invoice, InvoiceDraft, InvoiceSummary, MonthlySummary, NewInvoice, NumberingCounter,
    OverallStats, Party, TopBuyer, YearlySummary,
};
use crate::services::auth::{AdminToken, AuthService, Password};
use crate::services::database::Database;
use crate::services::ledger::{Ledger, LimitVerdict, MonthSummary};
use crate::services::render::{DocumentData, DocumentRenderer, TextRenderer};
use crate::services::validation::Validator;
use crate::services::words;

/// Actor recorded on soft deletes. There is only one authenticated role.
const ADMIN_ACTOR: &str = "admin";

/// Successful issue result. `limit_warning` carries the remaining
/// monthly headroom when the issue crossed the warning threshold;
/// advisory only, the invoice is persisted either way.
#[derive(Debug, Clone)]
pub struct IssuedInvoice {
    pub invoice: Invoice,
    pub limit_warning: Option<Decimal>,
}

/// The application facade. Owns every service and exposes the operations
/// a frontend needs, nothing more.
#[derive(Clone)]
pub struct InvoiceManager {
    db: Database,
    ledger: Ledger,
    validator: Validator,
    auth: AuthService,
    renderer: Arc<dyn DocumentRenderer>,
    output_dir: PathBuf,
}

impl InvoiceManager {
    /// Connect to the database, run migrations and assemble the services.
    /// Documents are written into `output_dir`.
    pub async fn new(config: &Config, output_dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let db = Database::connect(&config.database_url).await?;
        Ok(Self::assemble(db, config, output_dir, Arc::new(TextRenderer::new())))
    }

    /// Assemble over an existing database, with a custom renderer.
    pub fn with_renderer(
        db: Database,
        config: &Config,
        output_dir: impl Into<PathBuf>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self::assemble(db, config, output_dir, renderer)
    }

    fn assemble(
        db: Database,
        config: &Config,
        output_dir: impl Into<PathBuf>,
        renderer: Arc<dyn DocumentRenderer>,
    ) -> Self {
        Self {
            ledger: Ledger::new(db.clone(), config.limits.clone()),
            validator: Validator::new(config.validation.clone()),
            auth: AuthService::new(db.clone()),
            db,
            renderer,
            output_dir: output_dir.into(),
        }
    }

    // ----- issuing ---------------------------------------------------------

    /// Issue an invoice dated today.
    pub async fn create_invoice(&self, draft: &InvoiceDraft) -> Result<IssuedInvoice, AppError> {
        self.create_invoice_dated(draft, Utc::now().date_naive())
            .await
    }

    /// Issue an invoice with an explicit issue date.
    ///
    /// Validation, the limit check, number allocation, document rendering
    /// and the insert all happen before the transaction commits, so a
    /// failure at any step leaves no gap in the numbering and no row.
    #[instrument(skip(self, draft))]
    pub async fn create_invoice_dated(
        &self,
        draft: &InvoiceDraft,
        issue_date: NaiveDate,
    ) -> Result<IssuedInvoice, AppError> {
        let validated = self.validator.validate_draft(draft)?;
        let amount_due = validated.unit_price.round_dp(2);

        // The limit and the number are both keyed by the service month.
        let verdict = self
            .ledger
            .enforce_candidate(
                validated.service_date.month(),
                validated.service_date.year(),
                amount_due,
            )
            .await?;
        let limit_warning = match verdict {
            LimitVerdict::NearLimit { remaining } => Some(remaining),
            _ => None,
        };

        let mut tx = self.db.begin().await?;
        let number = self
            .ledger
            .next_number_in_tx(&mut tx, validated.service_date)
            .await?;

        let invoice = NewInvoice {
            number,
            issue_date,
            service_date: validated.service_date,
            seller: validated.seller.clone(),
            buyer: validated.buyer,
            service_description: validated.service_description,
            unit_price: validated.unit_price.round_dp(2),
            amount_due,
            amount_in_words: words::amount_in_words(amount_due),
        };

        // Render inside the transaction: a render failure rolls the
        // allocated number back.
        let artifact = self
            .renderer
            .render(&DocumentData::from(&invoice), &self.output_dir)?;
        let artifact_str = artifact.to_string_lossy().into_owned();

        let id = self
            .db
            .insert_invoice(&mut tx, &invoice, Some(&artifact_str))
            .await?;
        // Seller defaults ride the same transaction as the invoice row.
        self.db
            .save_seller_defaults_in_tx(&mut tx, &validated.seller)
            .await?;
        tx.commit().await?;

        info!(id, number = %invoice.number, "Invoice issued");
        Ok(IssuedInvoice {
            invoice: self.db.find(id).await?,
            limit_warning,
        })
    }

    /// Dry-run the limit check for an amount in the month of `date`.
    pub async fn check_limit(
        &self,
        date: NaiveDate,
        amount: Decimal,
    ) -> Result<LimitVerdict, AppError> {
        self.ledger
            .check_candidate(date.month(), date.year(), amount)
            .await
    }

    /// The number the next invoice for the month of `service_date` would
    /// receive.
    pub async fn peek_next_number(&self, service_date: NaiveDate) -> Result<String, AppError> {
        self.ledger.peek_next_number(service_date).await
    }

    /// Re-render the document for an existing active invoice and update
    /// its artifact path.
    #[instrument(skip(self))]
    pub async fn regenerate_document(&self, id: i64) -> Result<PathBuf, AppError> {
        let invoice = self.db.find(id).await?;
        if invoice.deleted_utc.is_some() {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "invoice {id} is deleted"
            )));
        }
        let path = self
            .renderer
            .render(&DocumentData::from(&invoice), &self.output_dir)?;
        self.db
            .set_artifact_path(id, &path.to_string_lossy())
            .await?;
        Ok(path)
    }

    // ----- authentication --------------------------------------------------

    pub async fn authenticate(&self, password: &Password) -> Result<AdminToken, AppError> {
        self.auth.authenticate(password).await
    }

    pub async fn change_admin_password(
        &self,
        current: &Password,
        new: &Password,
    ) -> Result<(), AppError> {
        self.auth.change_password(current, new).await
    }

    // ----- admin-gated lifecycle -------------------------------------------

    pub async fn soft_delete(
        &self,
        _token: &AdminToken,
        id: i64,
        reason: &str,
    ) -> Result<(), AppError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::ValidationError(vec![
                "delete reason is required".to_string(),
            ]));
        }
        self.db.soft_delete(id, reason, ADMIN_ACTOR).await
    }

    pub async fn restore(&self, _token: &AdminToken, id: i64) -> Result<(), AppError> {
        self.db.restore(id).await
    }

    pub async fn hard_delete(&self, _token: &AdminToken, id: i64) -> Result<(), AppError> {
        self.db.hard_delete(id).await
    }

    /// Numbering counters for the admin panel.
    pub async fn numbering_counters(
        &self,
        _token: &AdminToken,
    ) -> Result<Vec<NumberingCounter>, AppError> {
        self.db.list_counters().await
    }

    /// Drop all numbering counters. Issued invoice numbers are kept, so
    /// the next issue in an affected month can collide with an existing
    /// number; meant for a new accounting year.
    pub async fn reset_counters(&self, _token: &AdminToken) -> Result<u64, AppError> {
        self.db.reset_counters().await
    }

    // ----- reads -----------------------------------------------------------

    pub async fn invoice(&self, id: i64) -> Result<Invoice, AppError> {
        self.db.find(id).await
    }

    pub async fn invoice_by_number(&self, number: &str) -> Result<Invoice, AppError> {
        self.db.find_by_number(number).await
    }

    pub async fn list_invoices(&self) -> Result<Vec<InvoiceSummary>, AppError> {
        self.db.list_active().await
    }

    pub async fn deleted_invoices(&self) -> Result<Vec<Invoice>, AppError> {
        self.db.list_deleted().await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<InvoiceSummary>, AppError> {
        self.db.search(query).await
    }

    pub async fn invoices_for_month(
        &self,
        month: u32,
        year: i32,
    ) -> Result<Vec<InvoiceSummary>, AppError> {
        self.db.list_for_month(month, year).await
    }

    pub async fn month_summary(&self, month: u32, year: i32) -> Result<MonthSummary, AppError> {
        self.ledger.month_summary(month, year).await
    }

    pub async fn monthly_report(&self, year: i32) -> Result<Vec<MonthlySummary>, AppError> {
        self.db.monthly_report(year).await
    }

    pub async fn yearly_report(&self) -> Result<Vec<YearlySummary>, AppError> {
        self.db.yearly_report().await
    }

    pub async fn top_buyers(&self, limit: u32) -> Result<Vec<TopBuyer>, AppError> {
        self.db.top_buyers(limit).await
    }

    pub async fn overall_stats(&self) -> Result<OverallStats, AppError> {
        self.db.overall_stats().await
    }

    pub async fn export_csv(&self, path: &Path) -> Result<usize, AppError> {
        self.db.export_csv(path).await
    }

    // ----- seller defaults -------------------------------------------------

    pub async fn seller_defaults(&self) -> Result<Option<Party>, AppError> {
        self.db.load_seller_defaults().await
    }

    /// Save seller details outside the issuing path, e.g. from a
    /// settings form.
    pub async fn save_seller_defaults(&self, seller: &Party) -> Result<(), AppError> {
        self.db.save_seller_defaults(&seller.trimmed()).await
    }
}
