//! SQLite repository. All SQL lives here; policy (numbering, limits,
//! authorization) sits in the services that call it.

use std::path::Path;
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use rachunek_core::error::AppError;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::{info, instrument};

use crate::models::{
    from_grosze, month_name, to_grosze, Invoice, InvoiceRow, InvoiceSummary, MonthlySummary,
    NewInvoice, NumberingCounter, OverallStats, Party, SummaryRow, TopBuyer, YearlySummary,
};

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if missing) the database at `database_url` and run
    /// pending migrations.
    #[instrument(skip_all, fields(database_url = %database_url))]
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database connected and migrated");
        Ok(Self { pool })
    }

    /// Wrap an existing pool. Migrations are the caller's concern.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        Ok(self.pool.begin().await?)
    }

    // ----- numbering -------------------------------------------------------

    /// Allocate the next sequence number for (month, year), creating the
    /// counter on first use. Must run inside the same transaction as the
    /// invoice insert so a failed insert never burns a number.
    pub async fn allocate_number(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        month: u32,
        year: i32,
    ) -> Result<i64, AppError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO numbering_counters (month, year, last_number)
            VALUES (?, ?, 1)
            ON CONFLICT (month, year)
            DO UPDATE SET last_number = last_number + 1
            RETURNING last_number
            "#,
        )
        .bind(month)
        .bind(year)
        .fetch_one(&mut **tx)
        .await?;
        Ok(row.0)
    }

    /// The number the next invoice for (month, year) would receive,
    /// without reserving it.
    pub async fn peek_next_number(&self, month: u32, year: i32) -> Result<i64, AppError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT last_number FROM numbering_counters WHERE month = ? AND year = ?",
        )
        .bind(month)
        .bind(year)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map_or(1, |(last,)| last + 1))
    }

    /// All numbering counters, oldest period first.
    pub async fn list_counters(&self) -> Result<Vec<NumberingCounter>, AppError> {
        let counters: Vec<NumberingCounter> = sqlx::query_as(
            "SELECT month, year, last_number FROM numbering_counters ORDER BY year, month",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(counters)
    }

    /// Drop every numbering counter. Issued invoices are untouched, so a
    /// reset can make the next issue collide with an existing number.
    #[instrument(skip(self))]
    pub async fn reset_counters(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM numbering_counters")
            .execute(&self.pool)
            .await?;
        info!(counters = result.rows_affected(), "Numbering counters reset");
        Ok(result.rows_affected())
    }

    // ----- invoices --------------------------------------------------------

    /// Insert a finalized invoice inside `tx`; returns the new row id.
    pub async fn insert_invoice(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        invoice: &NewInvoice,
        artifact_path: Option<&str>,
    ) -> Result<i64, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO invoices (
                number, issue_date, service_date,
                seller_first_name, seller_last_name, seller_street,
                seller_house_number, seller_postal_code, seller_city,
                buyer_first_name, buyer_last_name, buyer_street,
                buyer_house_number, buyer_postal_code, buyer_city,
                service_description, unit_price_grosze, amount_due_grosze,
                amount_in_words, artifact_path, created_utc
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invoice.number)
        .bind(invoice.issue_date)
        .bind(invoice.service_date)
        .bind(&invoice.seller.first_name)
        .bind(&invoice.seller.last_name)
        .bind(&invoice.seller.street)
        .bind(&invoice.seller.house_number)
        .bind(&invoice.seller.postal_code)
        .bind(&invoice.seller.city)
        .bind(&invoice.buyer.first_name)
        .bind(&invoice.buyer.last_name)
        .bind(&invoice.buyer.street)
        .bind(&invoice.buyer.house_number)
        .bind(&invoice.buyer.postal_code)
        .bind(&invoice.buyer.city)
        .bind(&invoice.service_description)
        .bind(to_grosze(invoice.unit_price)?)
        .bind(to_grosze(invoice.amount_due)?)
        .bind(&invoice.amount_in_words)
        .bind(artifact_path)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn find(&self, id: i64) -> Result<Invoice, AppError> {
        let row: InvoiceRow = sqlx::query_as("SELECT * FROM invoices WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    pub async fn find_by_number(&self, number: &str) -> Result<Invoice, AppError> {
        let row: InvoiceRow = sqlx::query_as("SELECT * FROM invoices WHERE number = ?")
            .bind(number)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    /// Active invoices, newest first.
    pub async fn list_active(&self) -> Result<Vec<InvoiceSummary>, AppError> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT id, number, issue_date, buyer_first_name, buyer_last_name,
                   amount_due_grosze, artifact_path
            FROM invoices
            WHERE deleted_utc IS NULL
            ORDER BY issue_date DESC, id DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Soft-deleted invoices, most recently deleted first. Full records,
    /// so the delete metadata is available.
    pub async fn list_deleted(&self) -> Result<Vec<Invoice>, AppError> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(
            "SELECT * FROM invoices WHERE deleted_utc IS NOT NULL ORDER BY deleted_utc DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Case-insensitive substring search over invoice number, buyer name
    /// and issue date, active invoices only.
    pub async fn search(&self, query: &str) -> Result<Vec<InvoiceSummary>, AppError> {
        let pattern = format!("%{}%", query.trim());
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT id, number, issue_date, buyer_first_name, buyer_last_name,
                   amount_due_grosze, artifact_path
            FROM invoices
            WHERE deleted_utc IS NULL
              AND (number LIKE ?
                   OR (buyer_first_name || ' ' || buyer_last_name) LIKE ?
                   OR issue_date LIKE ?)
            ORDER BY issue_date DESC, id DESC
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Active invoices issued in the given month, oldest first.
    pub async fn list_for_month(
        &self,
        month: u32,
        year: i32,
    ) -> Result<Vec<InvoiceSummary>, AppError> {
        let (start, end) = month_bounds(month, year)?;
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT id, number, issue_date, buyer_first_name, buyer_last_name,
                   amount_due_grosze, artifact_path
            FROM invoices
            WHERE deleted_utc IS NULL AND issue_date >= ? AND issue_date < ?
            ORDER BY issue_date ASC, id ASC
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Sum of active invoice amounts issued in the given month.
    pub async fn monthly_total(&self, month: u32, year: i32) -> Result<Decimal, AppError> {
        let (start, end) = month_bounds(month, year)?;
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(amount_due_grosze), 0)
            FROM invoices
            WHERE deleted_utc IS NULL AND issue_date >= ? AND issue_date < ?
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;
        Ok(from_grosze(row.0))
    }

    // ----- lifecycle -------------------------------------------------------

    /// Mark an active invoice deleted, recording when, why and by whom.
    #[instrument(skip(self, reason))]
    pub async fn soft_delete(
        &self,
        id: i64,
        reason: &str,
        actor: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET deleted_utc = ?, delete_reason = ?, deleted_by = ?
            WHERE id = ? AND deleted_utc IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(reason)
        .bind(actor)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "no active invoice with id {id}"
            )));
        }
        info!(id, "Invoice soft-deleted");
        Ok(())
    }

    /// Clear the soft-delete mark. The invoice keeps its number; its
    /// amount counts toward the monthly total again.
    #[instrument(skip(self))]
    pub async fn restore(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET deleted_utc = NULL, delete_reason = NULL, deleted_by = NULL
            WHERE id = ? AND deleted_utc IS NOT NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "no deleted invoice with id {id}"
            )));
        }
        info!(id, "Invoice restored");
        Ok(())
    }

    /// Permanently remove a soft-deleted invoice. Active invoices must be
    /// soft-deleted first.
    #[instrument(skip(self))]
    pub async fn hard_delete(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = ? AND deleted_utc IS NOT NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "no deleted invoice with id {id}"
            )));
        }
        info!(id, "Invoice permanently deleted");
        Ok(())
    }

    pub async fn set_artifact_path(&self, id: i64, path: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE invoices SET artifact_path = ? WHERE id = ?")
            .bind(path)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "no invoice with id {id}"
            )));
        }
        Ok(())
    }

    // ----- seller defaults -------------------------------------------------

    /// Save the seller details to prefill future drafts. Append-only; the
    /// newest row wins.
    pub async fn save_seller_defaults(&self, seller: &Party) -> Result<(), AppError> {
        insert_seller_defaults(&self.pool, seller).await?;
        Ok(())
    }

    /// [`save_seller_defaults`](Self::save_seller_defaults) inside the
    /// caller's transaction, for the issuing path.
    pub async fn save_seller_defaults_in_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        seller: &Party,
    ) -> Result<(), AppError> {
        insert_seller_defaults(&mut **tx, seller).await?;
        Ok(())
    }

    pub async fn load_seller_defaults(&self) -> Result<Option<Party>, AppError> {
        let row: Option<Party> = sqlx::query_as(
            r#"
            SELECT first_name, last_name, street, house_number, postal_code, city
            FROM seller_defaults
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    // ----- admin credential ------------------------------------------------

    pub async fn admin_password_hash(&self) -> Result<Option<String>, AppError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM admin_credentials WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(hash,)| hash))
    }

    pub async fn set_admin_password_hash(&self, hash: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO admin_credentials (id, password_hash, updated_utc)
            VALUES (1, ?, ?)
            ON CONFLICT (id) DO UPDATE SET password_hash = excluded.password_hash,
                                          updated_utc = excluded.updated_utc
            "#,
        )
        .bind(hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ----- reports ---------------------------------------------------------

    /// Per-month aggregates for a year, months with invoices only.
    pub async fn monthly_report(&self, year: i32) -> Result<Vec<MonthlySummary>, AppError> {
        let rows: Vec<MonthAggregateRow> = sqlx::query_as(
            r#"
            SELECT CAST(strftime('%m', issue_date) AS INTEGER) AS month,
                   COUNT(*) AS invoice_count,
                   SUM(amount_due_grosze) AS total_grosze,
                   MIN(amount_due_grosze) AS min_grosze,
                   MAX(amount_due_grosze) AS max_grosze
            FROM invoices
            WHERE deleted_utc IS NULL AND strftime('%Y', issue_date) = ?
            GROUP BY month
            ORDER BY month
            "#,
        )
        .bind(format!("{year:04}"))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| MonthlySummary {
                month: row.month as u32,
                month_name: month_name(row.month as u32),
                year,
                invoice_count: row.invoice_count,
                total: from_grosze(row.total_grosze),
                mean: mean_grosze(row.total_grosze, row.invoice_count),
                min: from_grosze(row.min_grosze),
                max: from_grosze(row.max_grosze),
            })
            .collect())
    }

    /// Per-year aggregates across all recorded invoices.
    pub async fn yearly_report(&self) -> Result<Vec<YearlySummary>, AppError> {
        let rows: Vec<YearAggregateRow> = sqlx::query_as(
            r#"
            SELECT CAST(strftime('%Y', issue_date) AS INTEGER) AS year,
                   COUNT(*) AS invoice_count,
                   SUM(amount_due_grosze) AS total_grosze,
                   MIN(amount_due_grosze) AS min_grosze,
                   MAX(amount_due_grosze) AS max_grosze
            FROM invoices
            WHERE deleted_utc IS NULL
            GROUP BY year
            ORDER BY year
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| YearlySummary {
                year: row.year as i32,
                invoice_count: row.invoice_count,
                total: from_grosze(row.total_grosze),
                mean: mean_grosze(row.total_grosze, row.invoice_count),
                min: from_grosze(row.min_grosze),
                max: from_grosze(row.max_grosze),
            })
            .collect())
    }

    /// Buyers ranked by total billed amount; ties break by most recent
    /// issue date.
    pub async fn top_buyers(&self, limit: u32) -> Result<Vec<TopBuyer>, AppError> {
        let rows: Vec<BuyerAggregateRow> = sqlx::query_as(
            r#"
            SELECT buyer_first_name || ' ' || buyer_last_name AS buyer_name,
                   COUNT(*) AS invoice_count,
                   SUM(amount_due_grosze) AS total_grosze,
                   MAX(issue_date) AS last_issue_date
            FROM invoices
            WHERE deleted_utc IS NULL
            GROUP BY buyer_name
            ORDER BY total_grosze DESC, last_issue_date DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| TopBuyer {
                buyer_name: row.buyer_name,
                invoice_count: row.invoice_count,
                total: from_grosze(row.total_grosze),
                mean: mean_grosze(row.total_grosze, row.invoice_count),
                last_issue_date: row.last_issue_date,
            })
            .collect())
    }

    pub async fn overall_stats(&self) -> Result<OverallStats, AppError> {
        let row: OverallRow = sqlx::query_as(
            r#"
            SELECT COUNT(*) AS invoice_count,
                   COALESCE(SUM(amount_due_grosze), 0) AS total_grosze,
                   COUNT(DISTINCT buyer_first_name || ' ' || buyer_last_name)
                       AS distinct_buyers,
                   MIN(issue_date) AS first_issue_date,
                   MAX(issue_date) AS last_issue_date
            FROM invoices
            WHERE deleted_utc IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(OverallStats {
            invoice_count: row.invoice_count,
            total: from_grosze(row.total_grosze),
            mean: mean_grosze(row.total_grosze, row.invoice_count),
            distinct_buyers: row.distinct_buyers,
            first_issue_date: row.first_issue_date,
            last_issue_date: row.last_issue_date,
        })
    }

    /// Export active invoices as CSV, oldest first. Written to a temporary
    /// sibling file and renamed into place, so re-running replaces the file
    /// atomically.
    #[instrument(skip(self))]
    pub async fn export_csv(&self, path: &Path) -> Result<usize, AppError> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"
            SELECT id, number, issue_date, buyer_first_name, buyer_last_name,
                   amount_due_grosze, artifact_path
            FROM invoices
            WHERE deleted_utc IS NULL
            ORDER BY issue_date ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut contents =
            String::from("Numer rachunku,Data wystawienia,Nabywca,Kwota (PLN)\n");
        for row in &rows {
            let summary_name = format!("{} {}", row.buyer_first_name, row.buyer_last_name);
            contents.push_str(&format!(
                "{},{},{},{:.2}\n",
                csv_field(&row.number),
                row.issue_date.format("%Y-%m-%d"),
                csv_field(&summary_name),
                from_grosze(row.amount_due_grosze)
            ));
        }

        let tmp = path.with_extension("csv.tmp");
        std::fs::write(&tmp, contents.as_bytes())
            .map_err(|err| AppError::ExportError(anyhow::Error::new(err)))?;
        std::fs::rename(&tmp, path)
            .map_err(|err| AppError::ExportError(anyhow::Error::new(err)))?;
        info!(invoices = rows.len(), path = %path.display(), "CSV exported");
        Ok(rows.len())
    }
}

async fn insert_seller_defaults<'e, E>(executor: E, seller: &Party) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO seller_defaults (
            first_name, last_name, street, house_number, postal_code,
            city, created_utc
        )
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&seller.first_name)
    .bind(&seller.last_name)
    .bind(&seller.street)
    .bind(&seller.house_number)
    .bind(&seller.postal_code)
    .bind(&seller.city)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

/// First day of the month and first day of the following month. Date
/// columns hold ISO text, so half-open range comparisons are exact.
fn month_bounds(month: u32, year: i32) -> Result<(NaiveDate, NaiveDate), AppError> {
    let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        AppError::ValidationError(vec![format!("invalid month {month:02}/{year:04}")])
    })?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| {
        AppError::ValidationError(vec![format!("invalid month {month:02}/{year:04}")])
    })?;
    Ok((start, end))
}

fn mean_grosze(total_grosze: i64, count: i64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    (from_grosze(total_grosze) / Decimal::from(count)).round_dp(2)
}

/// Quote a CSV field when it contains a delimiter, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[derive(Debug, FromRow)]
struct MonthAggregateRow {
    month: i64,
    invoice_count: i64,
    total_grosze: i64,
    min_grosze: i64,
    max_grosze: i64,
}

#[derive(Debug, FromRow)]
struct YearAggregateRow {
    year: i64,
    invoice_count: i64,
    total_grosze: i64,
    min_grosze: i64,
    max_grosze: i64,
}

#[derive(Debug, FromRow)]
struct BuyerAggregateRow {
    buyer_name: String,
    invoice_count: i64,
    total_grosze: i64,
    last_issue_date: NaiveDate,
}

#[derive(Debug, FromRow)]
struct OverallRow {
    invoice_count: i64,
    total_grosze: i64,
    distinct_buyers: i64,
    first_issue_date: Option<NaiveDate>,
    last_issue_date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn month_bounds_are_half_open() {
        let (start, end) = month_bounds(8, 2025).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2025, 8, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 9, 1).unwrap());
    }

    #[test]
    fn december_rolls_into_january() {
        let (_, end) = month_bounds(12, 2025).unwrap();
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }

    #[test]
    fn month_thirteen_is_rejected() {
        assert!(month_bounds(13, 2025).is_err());
    }

    #[test]
    fn csv_fields_with_commas_are_quoted() {
        assert_eq!(csv_field("Kowalski, Jan"), "\"Kowalski, Jan\"");
        assert_eq!(csv_field("Jan Kowalski"), "Jan Kowalski");
    }

    #[test]
    fn mean_rounds_to_grosze() {
        assert_eq!(mean_grosze(10000, 3), dec!(33.33));
        assert_eq!(mean_grosze(0, 0), Decimal::ZERO);
    }
}
