use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A seller or buyer on an invoice. All six fields are mandatory and
/// independently validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Party {
    pub first_name: String,
    pub last_name: String,
    pub street: String,
    pub house_number: String,
    pub postal_code: String,
    pub city: String,
}

impl Party {
    /// Display name used in lists, search and reports.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Copy with surrounding whitespace stripped from every field.
    pub fn trimmed(&self) -> Party {
        Party {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            street: self.street.trim().to_string(),
            house_number: self.house_number.trim().to_string(),
            postal_code: self.postal_code.trim().to_string(),
            city: self.city.trim().to_string(),
        }
    }
}
