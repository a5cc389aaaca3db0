use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Field-level validation failures. Violations are data, not control
    /// flow: every message is collected before this is returned.
    #[error("Validation failed: {}", .0.join("; "))]
    ValidationError(Vec<String>),

    #[error(
        "Monthly revenue limit exceeded: current total {current_total} PLN, \
         new invoice {candidate} PLN, limit {limit} PLN, over by {overage} PLN"
    )]
    LimitExceededError {
        current_total: Decimal,
        candidate: Decimal,
        limit: Decimal,
        overage: Decimal,
    },

    #[error("Not found: {0}")]
    NotFound(anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(anyhow::Error),

    #[error("Database error: {0}")]
    DatabaseError(anyhow::Error),

    #[error("Render error: {0}")]
    RenderError(anyhow::Error),

    #[error("Export error: {0}")]
    ExportError(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    /// Violation messages for a validation error, empty otherwise.
    pub fn violations(&self) -> &[String] {
        match self {
            AppError::ValidationError(messages) => messages,
            _ => &[],
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound(anyhow::Error::new(err)),
            _ => AppError::DatabaseError(anyhow::Error::new(err)),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::DatabaseError(anyhow::Error::new(err))
    }
}
