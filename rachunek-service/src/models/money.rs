//! Conversions between domain `Decimal` amounts and the integer grosze
//! representation stored in SQLite. Integer storage keeps SQL aggregation
//! exact; everything above the row layer works in `Decimal`.

use rachunek_core::error::AppError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const GROSZE_PER_ZLOTY: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// Convert a monetary amount to grosze for storage.
///
/// The amount is rounded to 2 decimal places first, so callers never store
/// sub-grosz residue.
pub fn to_grosze(amount: Decimal) -> Result<i64, AppError> {
    (amount.round_dp(2) * GROSZE_PER_ZLOTY)
        .to_i64()
        .ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Amount {} cannot be represented in grosze",
                amount
            ))
        })
}

/// Convert stored grosze back into a 2-decimal amount.
pub fn from_grosze(grosze: i64) -> Decimal {
    Decimal::new(grosze, 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn round_trips_two_decimal_amounts() {
        assert_eq!(to_grosze(dec!(100.50)).unwrap(), 10050);
        assert_eq!(from_grosze(10050), dec!(100.50));
    }

    #[test]
    fn rounds_sub_grosz_residue_at_the_boundary() {
        assert_eq!(to_grosze(dec!(0.005)).unwrap(), 0);
        assert_eq!(to_grosze(dec!(0.015)).unwrap(), 2);
    }
}
