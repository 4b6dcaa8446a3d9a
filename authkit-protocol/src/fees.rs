//! Fee and discount arithmetic.
//!
//! Pure computation only; the debits themselves happen in the manager once
//! every check has passed. All multiplication truncates toward zero so a
//! discount is never rounded in the payer's favor, and none of the math
//! touches `f64` beyond the oracle's own price representation, which is
//! converted to `Decimal` at the boundary.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use authkit_lib::{AuthError, Result};

/// Native raw units charged per credit raw unit: `floor(1 / price)`.
///
/// Fails with [`AuthError::InvalidPrice`] when the floored result is not
/// positive — a price above `1.0`, zero, negative, or non-finite all land
/// there.
pub fn unit_price(price: f64) -> Result<i64> {
    if !price.is_finite() {
        return Err(AuthError::InvalidPrice);
    }
    let price = Decimal::from_f64(price).ok_or(AuthError::InvalidPrice)?;
    if price <= Decimal::ZERO {
        return Err(AuthError::InvalidPrice);
    }
    let per_unit = (Decimal::ONE / price).floor();
    match per_unit.to_i64() {
        Some(per_unit) if per_unit > 0 => Ok(per_unit),
        _ => Err(AuthError::InvalidPrice),
    }
}

/// Decode a discount attribute value.
///
/// `None` (never set, unset, or issuer-invalidated) defaults to `1.0` — no
/// discount. A present value must be exactly the 8-byte little-endian
/// encoding of a finite `f64` in `[0, 1]`; anything else is an
/// [`AuthError::AttributeValueError`]. A discount of `0` is a full
/// discount, not an error.
pub fn parse_discount(value: Option<&[u8]>) -> Result<Decimal> {
    let bytes = match value {
        None => return Ok(Decimal::ONE),
        Some(bytes) => bytes,
    };
    let bytes: [u8; 8] = bytes
        .try_into()
        .map_err(|_| AuthError::AttributeValueError)?;
    let discount = f64::from_le_bytes(bytes);
    if !discount.is_finite() || !(0.0..=1.0).contains(&discount) {
        return Err(AuthError::AttributeValueError);
    }
    Decimal::from_f64(discount).ok_or(AuthError::AttributeValueError)
}

/// Discounted charge in native raw units:
/// `floor(credit_raw * unit_price * discount)`.
pub fn discounted_charge(credit_raw: i64, unit_price: i64, discount: Decimal) -> i64 {
    let charge = Decimal::from(credit_raw) * Decimal::from(unit_price) * discount;
    charge.floor().to_i64().unwrap_or(i64::MAX)
}

/// Proportional reward in native raw units:
/// `floor(credit_raw * native_balance_raw / credit_supply_raw)`.
///
/// Ties protocol-held native reserves to outstanding credit supply,
/// paying reserves out proportionally as credits are consumed. Zero when
/// no credit is outstanding.
pub fn proportional_reward(credit_raw: i64, native_balance_raw: i64, credit_supply_raw: i64) -> i64 {
    if credit_supply_raw <= 0 {
        return 0;
    }
    let reward =
        i128::from(credit_raw) * i128::from(native_balance_raw) / i128::from(credit_supply_raw);
    i64::try_from(reward).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_unit_price_reference_vector() {
        // 1 / 0.003210 = 311.526..., floored
        assert_eq!(unit_price(0.003210).unwrap(), 311);
    }

    #[test]
    fn test_unit_price_rejects_degenerate_prices() {
        assert_eq!(unit_price(0.0).unwrap_err(), AuthError::InvalidPrice);
        assert_eq!(unit_price(-0.5).unwrap_err(), AuthError::InvalidPrice);
        assert_eq!(unit_price(f64::NAN).unwrap_err(), AuthError::InvalidPrice);
        assert_eq!(
            unit_price(f64::INFINITY).unwrap_err(),
            AuthError::InvalidPrice
        );
        // floor(1 / 2.0) == 0
        assert_eq!(unit_price(2.0).unwrap_err(), AuthError::InvalidPrice);
    }

    #[test]
    fn test_unit_price_boundary() {
        assert_eq!(unit_price(1.0).unwrap(), 1);
        assert_eq!(unit_price(0.5).unwrap(), 2);
    }

    #[test]
    fn test_parse_discount_defaults_when_absent() {
        assert_eq!(parse_discount(None).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_parse_discount_reads_le_f64() {
        let bytes = 0.87f64.to_le_bytes();
        assert_eq!(parse_discount(Some(&bytes)).unwrap(), dec!(0.87));

        let zero = 0.0f64.to_le_bytes();
        assert_eq!(parse_discount(Some(&zero)).unwrap(), Decimal::ZERO);

        let one = 1.0f64.to_le_bytes();
        assert_eq!(parse_discount(Some(&one)).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_parse_discount_rejects_out_of_range() {
        let high = 1.5f64.to_le_bytes();
        assert_eq!(
            parse_discount(Some(&high)).unwrap_err(),
            AuthError::AttributeValueError
        );
        let negative = (-0.1f64).to_le_bytes();
        assert_eq!(
            parse_discount(Some(&negative)).unwrap_err(),
            AuthError::AttributeValueError
        );
        let nan = f64::NAN.to_le_bytes();
        assert_eq!(
            parse_discount(Some(&nan)).unwrap_err(),
            AuthError::AttributeValueError
        );
    }

    #[test]
    fn test_parse_discount_rejects_wrong_length() {
        assert_eq!(
            parse_discount(Some(b"short")).unwrap_err(),
            AuthError::AttributeValueError
        );
        assert_eq!(
            parse_discount(Some(&[0u8; 9])).unwrap_err(),
            AuthError::AttributeValueError
        );
    }

    #[test]
    fn test_discounted_charge_floors_toward_zero() {
        // 1.0000 credit * 311 native/credit, no discount
        assert_eq!(discounted_charge(1_0000, 311, Decimal::ONE), 3_110_000);
        // 0.87 discount: 3_110_000 * 0.87 = 2_705_700 exactly
        assert_eq!(discounted_charge(1_0000, 311, dec!(0.87)), 2_705_700);
        // a fractional product truncates
        assert_eq!(discounted_charge(3, 1, dec!(0.5)), 1);
        // full discount charges nothing but is still a valid charge
        assert_eq!(discounted_charge(1_0000, 311, Decimal::ZERO), 0);
    }

    #[test]
    fn test_discount_monotonicity() {
        let full = discounted_charge(1_0000, 311, Decimal::ONE);
        let half = discounted_charge(1_0000, 311, dec!(0.5));
        assert!(half <= full);
    }

    #[test]
    fn test_proportional_reward() {
        // all reserves flow out when fee equals supply
        assert_eq!(proportional_reward(1_0000, 3_110_000, 1_0000), 3_110_000);
        // half the supply consumed pays half the reserves
        assert_eq!(proportional_reward(1_0000, 3_110_000, 2_0000), 1_555_000);
        // truncation toward zero
        assert_eq!(proportional_reward(1, 1, 3), 0);
        // no outstanding credit pays nothing
        assert_eq!(proportional_reward(1_0000, 3_110_000, 0), 0);
    }
}
