//! Input validation and normalization for invoice drafts.
//!
//! Violations are collected into a single list so the caller can surface
//! every problem at once instead of one per round trip.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use rachunek_core::config::ValidationSettings;
use rachunek_core::error::AppError;
use regex::Regex;
use rust_decimal::Decimal;

use crate::models::{InvoiceDraft, Party};

static NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-ZąćęłńóśźżĄĆĘŁŃÓŚŹŻ\s-]+$").expect("name regex")
});

static POSTAL_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}-\d{3}$").expect("postal code regex"));

static HOUSE_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9a-zA-Z/\s-]+$").expect("house number regex"));

/// A draft that passed validation: all fields present, trimmed and
/// normalized into their domain types.
#[derive(Debug, Clone)]
pub struct ValidatedDraft {
    pub seller: Party,
    pub buyer: Party,
    pub service_date: NaiveDate,
    pub service_description: String,
    pub unit_price: Decimal,
}

/// Stateless draft validator configured from [`ValidationSettings`].
#[derive(Debug, Clone)]
pub struct Validator {
    settings: ValidationSettings,
}

impl Validator {
    pub fn new(settings: ValidationSettings) -> Self {
        Self { settings }
    }

    /// Validate a draft, returning the normalized form or every violation
    /// found, as [`AppError::ValidationError`].
    pub fn validate_draft(&self, draft: &InvoiceDraft) -> Result<ValidatedDraft, AppError> {
        let mut violations = Vec::new();

        let seller = match &draft.seller {
            Some(party) => {
                let party = party.trimmed();
                self.check_party("seller", &party, &mut violations);
                Some(party)
            }
            None => {
                violations.push("seller details are required".to_string());
                None
            }
        };

        let buyer = match &draft.buyer {
            Some(party) => {
                let party = party.trimmed();
                self.check_party("buyer", &party, &mut violations);
                Some(party)
            }
            None => {
                violations.push("buyer details are required".to_string());
                None
            }
        };

        let service_date = match draft.service_date.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => match parse_date(raw) {
                Ok(date) => Some(date),
                Err(message) => {
                    violations.push(message);
                    None
                }
            },
            _ => {
                violations.push("service date is required".to_string());
                None
            }
        };

        let service_description = match draft.service_description.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let length = raw.chars().count();
                if length < self.settings.min_description_length {
                    violations.push(format!(
                        "service description must have at least {} characters",
                        self.settings.min_description_length
                    ));
                    None
                } else if length > self.settings.max_description_length {
                    violations.push(format!(
                        "service description must have at most {} characters",
                        self.settings.max_description_length
                    ));
                    None
                } else {
                    Some(raw.to_string())
                }
            }
            _ => {
                violations.push("service description is required".to_string());
                None
            }
        };

        let unit_price = match draft.unit_price.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => match self.parse_amount(raw) {
                Ok(amount) => Some(amount),
                Err(message) => {
                    violations.push(message);
                    None
                }
            },
            _ => {
                violations.push("unit price is required".to_string());
                None
            }
        };

        if !violations.is_empty() {
            return Err(AppError::ValidationError(violations));
        }

        // All Nones produced a violation above, so the unwraps cannot fire.
        match (seller, buyer, service_date, service_description, unit_price) {
            (Some(seller), Some(buyer), Some(service_date), Some(service_description), Some(unit_price)) => {
                Ok(ValidatedDraft {
                    seller,
                    buyer,
                    service_date,
                    service_description,
                    unit_price,
                })
            }
            _ => Err(AppError::ValidationError(vec![
                "draft is incomplete".to_string(),
            ])),
        }
    }

    fn check_party(&self, role: &str, party: &Party, violations: &mut Vec<String>) {
        check_name(role, "first name", &party.first_name, violations);
        check_name(role, "last name", &party.last_name, violations);
        check_name(role, "city", &party.city, violations);

        if party.street.chars().count() < 2 {
            violations.push(format!("{role} street must have at least 2 characters"));
        }

        if party.house_number.is_empty() {
            violations.push(format!("{role} house number is required"));
        } else if !HOUSE_NUMBER_RE.is_match(&party.house_number) {
            violations.push(format!(
                "{role} house number contains invalid characters"
            ));
        }

        if self.settings.validate_postal_code && !POSTAL_CODE_RE.is_match(&party.postal_code) {
            violations.push(format!(
                "{role} postal code must match the NN-NNN format"
            ));
        }
    }

    /// Parse a user-entered amount. Accepts a comma as the decimal
    /// separator and embedded spaces as digit grouping; rejects
    /// non-positive values, more than two decimal places, and values
    /// above the configured maximum.
    pub fn parse_amount(&self, raw: &str) -> Result<Decimal, String> {
        let normalized = raw.trim().replace(' ', "").replace(',', ".");
        let amount: Decimal = normalized
            .parse()
            .map_err(|_| format!("amount '{raw}' is not a valid number"))?;

        if amount <= Decimal::ZERO {
            return Err("amount must be greater than zero".to_string());
        }
        if amount.normalize().scale() > 2 {
            return Err("amount must have at most two decimal places".to_string());
        }
        if amount > self.settings.max_unit_price {
            return Err(format!(
                "amount must not exceed {} PLN",
                self.settings.max_unit_price
            ));
        }
        Ok(amount)
    }
}

fn check_name(role: &str, field: &str, value: &str, violations: &mut Vec<String>) {
    if value.is_empty() {
        violations.push(format!("{role} {field} is required"));
    } else if !NAME_RE.is_match(value) {
        violations.push(format!("{role} {field} contains invalid characters"));
    }
}

/// Parse a date in ISO (`YYYY-MM-DD`), `DD.MM.YYYY` or `DD/MM/YYYY` form.
pub fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];
    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Ok(date);
        }
    }
    Err(format!("date '{raw}' is not in a recognized format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn validator() -> Validator {
        Validator::new(ValidationSettings::default())
    }

    fn sample_party() -> Party {
        Party {
            first_name: "Jan".to_string(),
            last_name: "Kowalski".to_string(),
            street: "Polna".to_string(),
            house_number: "12a/3".to_string(),
            postal_code: "00-950".to_string(),
            city: "Warszawa".to_string(),
        }
    }

    fn sample_draft() -> InvoiceDraft {
        InvoiceDraft {
            seller: Some(sample_party()),
            buyer: Some(sample_party()),
            service_date: Some("2025-08-14".to_string()),
            service_description: Some("Korepetycje z matematyki".to_string()),
            unit_price: Some("150,00".to_string()),
        }
    }

    #[test]
    fn valid_draft_normalizes_fields() {
        let validated = validator().validate_draft(&sample_draft()).unwrap();
        assert_eq!(validated.unit_price, dec!(150.00));
        assert_eq!(
            validated.service_date,
            NaiveDate::from_ymd_opt(2025, 8, 14).unwrap()
        );
    }

    #[test]
    fn comma_decimal_separator_is_accepted() {
        assert_eq!(validator().parse_amount("99,50").unwrap(), dec!(99.50));
        assert_eq!(validator().parse_amount("1 000,50").unwrap(), dec!(1000.50));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(validator().parse_amount("0").is_err());
        assert!(validator().parse_amount("-5.00").is_err());
    }

    #[test]
    fn more_than_two_decimal_places_is_rejected() {
        assert!(validator().parse_amount("10.123").is_err());
    }

    #[test]
    fn amount_above_maximum_is_rejected() {
        assert!(validator().parse_amount("1000000.00").is_err());
        assert!(validator().parse_amount("999999.99").is_ok());
    }

    #[test]
    fn all_date_formats_parse_to_the_same_day() {
        let expected = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        assert_eq!(parse_date("2025-03-07").unwrap(), expected);
        assert_eq!(parse_date("07.03.2025").unwrap(), expected);
        assert_eq!(parse_date("07/03/2025").unwrap(), expected);
        assert!(parse_date("7 marca 2025").is_err());
    }

    #[test]
    fn polish_diacritics_pass_name_validation() {
        let mut party = sample_party();
        party.first_name = "Łukasz".to_string();
        party.last_name = "Żółć-Świątek".to_string();
        let mut draft = sample_draft();
        draft.buyer = Some(party);
        assert!(validator().validate_draft(&draft).is_ok());
    }

    #[test]
    fn digits_in_names_are_rejected() {
        let mut party = sample_party();
        party.first_name = "Jan2".to_string();
        let mut draft = sample_draft();
        draft.seller = Some(party);
        let err = validator().validate_draft(&draft).unwrap_err();
        assert!(err
            .violations()
            .iter()
            .any(|v| v.contains("seller first name")));
    }

    #[test]
    fn bad_postal_code_is_rejected_unless_disabled() {
        let mut party = sample_party();
        party.postal_code = "00950".to_string();
        let mut draft = sample_draft();
        draft.buyer = Some(party.clone());
        assert!(validator().validate_draft(&draft).is_err());

        let relaxed = Validator::new(ValidationSettings {
            validate_postal_code: false,
            ..ValidationSettings::default()
        });
        assert!(relaxed.validate_draft(&draft).is_ok());
    }

    #[test]
    fn missing_sections_report_one_violation_each() {
        let draft = InvoiceDraft::default();
        let err = validator().validate_draft(&draft).unwrap_err();
        let violations = err.violations();
        assert_eq!(violations.len(), 5);
        assert!(violations.iter().any(|v| v.contains("seller details")));
        assert!(violations.iter().any(|v| v.contains("buyer details")));
    }

    #[test]
    fn description_length_bounds_are_enforced() {
        let mut draft = sample_draft();
        draft.service_description = Some("ab".to_string());
        assert!(validator().validate_draft(&draft).is_err());

        draft.service_description = Some("x".repeat(501));
        assert!(validator().validate_draft(&draft).is_err());
    }
}
