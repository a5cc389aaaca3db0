use crate::error::AppError;
use config::{Config as Cfg, File};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration, loaded from an optional `configuration` file
/// and `APP__`-prefixed environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub limits: LimitSettings,
    #[serde(default)]
    pub validation: ValidationSettings,
}

/// Monthly revenue limit settings mandated by Polish tax rules for
/// unregistered business activity.
#[derive(Debug, Deserialize, Clone)]
pub struct LimitSettings {
    /// Statutory monthly cap for 2025.
    #[serde(default = "default_monthly_limit")]
    pub monthly_limit_2025: Decimal,
    /// Fallback cap for years without a configured value.
    #[serde(default = "default_monthly_limit")]
    pub default_monthly_limit: Decimal,
    /// Fraction of the cap at which issuing starts to warn.
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: Decimal,
    /// Fraction of the cap separating the OK and NORMAL dashboard buckets.
    #[serde(default = "default_normal_threshold")]
    pub normal_threshold: Decimal,
    /// Master toggle for the limit check.
    #[serde(default = "default_true")]
    pub enforce_monthly_limit: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ValidationSettings {
    /// Whether postal codes must match the NN-NNN format.
    #[serde(default = "default_true")]
    pub validate_postal_code: bool,
    #[serde(default = "default_min_description_length")]
    pub min_description_length: usize,
    #[serde(default = "default_max_description_length")]
    pub max_description_length: usize,
    /// Upper bound for a single invoice amount, inclusive.
    #[serde(default = "default_max_unit_price")]
    pub max_unit_price: Decimal,
}

fn default_database_url() -> String {
    "sqlite://rachunki.db".to_string()
}

fn default_monthly_limit() -> Decimal {
    // 3499.50 PLN
    Decimal::new(3499_50, 2)
}

fn default_warning_threshold() -> Decimal {
    Decimal::new(8, 1)
}

fn default_normal_threshold() -> Decimal {
    Decimal::new(5, 1)
}

fn default_true() -> bool {
    true
}

fn default_min_description_length() -> usize {
    3
}

fn default_max_description_length() -> usize {
    500
}

fn default_max_unit_price() -> Decimal {
    Decimal::new(999999_99, 2)
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            monthly_limit_2025: default_monthly_limit(),
            default_monthly_limit: default_monthly_limit(),
            warning_threshold: default_warning_threshold(),
            normal_threshold: default_normal_threshold(),
            enforce_monthly_limit: true,
        }
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            validate_postal_code: true,
            min_description_length: default_min_description_length(),
            max_description_length: default_max_description_length(),
            max_unit_price: default_max_unit_price(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            limits: LimitSettings::default(),
            validation: ValidationSettings::default(),
        }
    }
}

impl LimitSettings {
    /// Statutory monthly cap for a given year.
    pub fn limit_for_year(&self, year: i32) -> Decimal {
        if year == 2025 {
            self.monthly_limit_2025
        } else {
            self.default_monthly_limit
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
