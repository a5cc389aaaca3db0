use sqlx::FromRow;

/// Per-(month, year) last-issued sequence number. One row per period,
/// created lazily on the first invoice of that period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct NumberingCounter {
    pub month: u32,
    pub year: i32,
    pub last_number: i64,
}
