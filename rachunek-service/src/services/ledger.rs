//! Numbering and monthly revenue limit policy.
//!
//! The limit applies per calendar month. A candidate invoice that would
//! push the month's total over the statutory cap is rejected before
//! anything is persisted.

use chrono::{Datelike, NaiveDate};
use rachunek_core::config::LimitSettings;
use rachunek_core::error::AppError;
use rust_decimal::Decimal;
use sqlx::{Sqlite, Transaction};
use tracing::{instrument, warn};

use crate::models::invoice_number;
use crate::services::database::Database;

/// Outcome of checking a candidate amount against the monthly limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitVerdict {
    /// Comfortably under the cap.
    Within { remaining: Decimal },
    /// Under the cap but past the warning threshold.
    NearLimit { remaining: Decimal },
    /// Would exceed the cap; issuing is refused.
    Exceeded {
        current_total: Decimal,
        candidate: Decimal,
        limit: Decimal,
        overage: Decimal,
    },
}

/// Dashboard bucket for a month's revenue utilization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthStatus {
    Safe,
    Normal,
    Warning,
    Exceeded,
}

/// Month-level view: totals, remaining headroom and the status bucket.
#[derive(Debug, Clone)]
pub struct MonthSummary {
    pub month: u32,
    pub year: i32,
    pub invoice_count: usize,
    pub total: Decimal,
    pub limit: Decimal,
    /// Headroom left under the cap; negative when exceeded.
    pub remaining: Decimal,
    /// total / limit, rounded to four decimal places.
    pub utilization: Decimal,
    pub status: MonthStatus,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    db: Database,
    limits: LimitSettings,
}

impl Ledger {
    pub fn new(db: Database, limits: LimitSettings) -> Self {
        Self { db, limits }
    }

    pub fn limit_for_year(&self, year: i32) -> Decimal {
        self.limits.limit_for_year(year)
    }

    /// Allocate and format the next invoice number for the month of
    /// `service_date`, inside the caller's transaction.
    pub async fn next_number_in_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        service_date: NaiveDate,
    ) -> Result<String, AppError> {
        let sequence = self
            .db
            .allocate_number(tx, service_date.month(), service_date.year())
            .await?;
        Ok(invoice_number(
            sequence,
            service_date.month(),
            service_date.year(),
        ))
    }

    /// The number the next invoice for the month of `service_date` would
    /// receive, without reserving it.
    pub async fn peek_next_number(&self, service_date: NaiveDate) -> Result<String, AppError> {
        let sequence = self
            .db
            .peek_next_number(service_date.month(), service_date.year())
            .await?;
        Ok(invoice_number(
            sequence,
            service_date.month(),
            service_date.year(),
        ))
    }

    pub async fn monthly_total(&self, month: u32, year: i32) -> Result<Decimal, AppError> {
        self.db.monthly_total(month, year).await
    }

    /// Check whether a candidate amount fits under the month's cap.
    #[instrument(skip(self))]
    pub async fn check_candidate(
        &self,
        month: u32,
        year: i32,
        candidate: Decimal,
    ) -> Result<LimitVerdict, AppError> {
        let total = self.db.monthly_total(month, year).await?;
        let verdict = verdict(&self.limits, total, candidate, year);
        if let LimitVerdict::NearLimit { remaining } = &verdict {
            warn!(%month, %year, %remaining, "Monthly limit warning threshold crossed");
        }
        Ok(verdict)
    }

    /// [`check_candidate`](Self::check_candidate) that turns an exceeded
    /// verdict into an error. With enforcement disabled the exceeded case
    /// passes through as a warning verdict.
    pub async fn enforce_candidate(
        &self,
        month: u32,
        year: i32,
        candidate: Decimal,
    ) -> Result<LimitVerdict, AppError> {
        let verdict = self.check_candidate(month, year, candidate).await?;
        match verdict {
            LimitVerdict::Exceeded {
                current_total,
                candidate,
                limit,
                overage,
            } if self.limits.enforce_monthly_limit => Err(AppError::LimitExceededError {
                current_total,
                candidate,
                limit,
                overage,
            }),
            other => Ok(other),
        }
    }

    /// Full month-level view for the dashboard.
    pub async fn month_summary(&self, month: u32, year: i32) -> Result<MonthSummary, AppError> {
        let total = self.db.monthly_total(month, year).await?;
        let invoices = self.db.list_for_month(month, year).await?;
        let limit = self.limits.limit_for_year(year);
        let utilization = if limit.is_zero() {
            Decimal::ZERO
        } else {
            (total / limit).round_dp(4)
        };
        Ok(MonthSummary {
            month,
            year,
            invoice_count: invoices.len(),
            total,
            limit,
            remaining: limit - total,
            utilization,
            status: bucket(&self.limits, total, year),
        })
    }
}

/// Verdict over an already-known monthly total. Pure; the async ledger
/// methods delegate here after fetching the total.
pub fn verdict(
    limits: &LimitSettings,
    total: Decimal,
    candidate: Decimal,
    year: i32,
) -> LimitVerdict {
    let candidate = candidate.round_dp(2);
    let limit = limits.limit_for_year(year);
    let projected = total + candidate;
    if projected > limit {
        LimitVerdict::Exceeded {
            current_total: total,
            candidate,
            limit,
            overage: (projected - limit).round_dp(2),
        }
    } else if projected > limit * limits.warning_threshold {
        LimitVerdict::NearLimit {
            remaining: (limit - projected).round_dp(2),
        }
    } else {
        LimitVerdict::Within {
            remaining: (limit - projected).round_dp(2),
        }
    }
}

/// Status bucket for an already-known monthly total.
pub fn bucket(limits: &LimitSettings, total: Decimal, year: i32) -> MonthStatus {
    let limit = limits.limit_for_year(year);
    if total > limit {
        MonthStatus::Exceeded
    } else if total > limit * limits.warning_threshold {
        MonthStatus::Warning
    } else if total > limit * limits.normal_threshold {
        MonthStatus::Normal
    } else {
        MonthStatus::Safe
    }
}
