use crate::error::{PaymentError, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

/// Remaining amounts at or below this value (major units) do not allow any further action.
pub const ELIGIBILITY_THRESHOLD: Decimal = dec!(0.1);

/// Converts a major-unit amount into the gateway's integer minor units.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.round().to_i64())
        .ok_or_else(|| PaymentError::ValidationError(format!("Amount {amount} is out of range")))
}

pub fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, 2).normalize()
}

/// Currency-precise equality: both sides rounded to two decimal places.
pub fn eq_to_cents(a: Decimal, b: Decimal) -> bool {
    a.round_dp(2) == b.round_dp(2)
}
