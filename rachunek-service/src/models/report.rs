use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-month aggregate for a single year: count, sum, mean, min, max.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub month: u32,
    pub month_name: &'static str,
    pub year: i32,
    pub invoice_count: i64,
    pub total: Decimal,
    pub mean: Decimal,
    pub min: Decimal,
    pub max: Decimal,
}

/// Per-year aggregate across all recorded years.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlySummary {
    pub year: i32,
    pub invoice_count: i64,
    pub total: Decimal,
    pub mean: Decimal,
    pub min: Decimal,
    pub max: Decimal,
}

/// A buyer ranked by total billed amount. Ties break by the most recent
/// issue date, descending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopBuyer {
    pub buyer_name: String,
    pub invoice_count: i64,
    pub total: Decimal,
    pub mean: Decimal,
    pub last_issue_date: NaiveDate,
}

/// Whole-repository statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallStats {
    pub invoice_count: i64,
    pub total: Decimal,
    pub mean: Decimal,
    pub distinct_buyers: i64,
    pub first_issue_date: Option<NaiveDate>,
    pub last_issue_date: Option<NaiveDate>,
}

/// Polish month name for report display, 1-based.
pub(crate) fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "Styczeń",
        "Luty",
        "Marzec",
        "Kwiecień",
        "Maj",
        "Czerwiec",
        "Lipiec",
        "Sierpień",
        "Wrzesień",
        "Październik",
        "Listopad",
        "Grudzień",
    ];
    NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("")
}
