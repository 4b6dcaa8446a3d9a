//! Property-based tests for the digest builder and fee arithmetic.
//!
//! These use proptest to verify invariants across a wide range of inputs.

#[cfg(test)]
mod digest_properties {
    use authkit_lib::Digest;
    use proptest::prelude::*;

    proptest! {
        /// The same field list always hashes to the same digest.
        #[test]
        fn digest_is_deterministic(fields in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 0..32), 1..6)
        ) {
            let first = Digest::of_fields(&fields);
            let second = Digest::of_fields(&fields);
            prop_assert_eq!(first, second);
        }

        /// Swapping two unequal fields changes the digest: the joined byte
        /// streams have equal length, so position-wise equality would force
        /// the fields themselves to be equal.
        #[test]
        fn digest_is_order_sensitive(
            a in proptest::collection::vec(any::<u8>(), 0..32),
            b in proptest::collection::vec(any::<u8>(), 0..32),
        ) {
            prop_assume!(a != b);
            let forward = Digest::of_fields([a.as_slice(), b.as_slice()]);
            let swapped = Digest::of_fields([b.as_slice(), a.as_slice()]);
            prop_assert_ne!(forward, swapped);
        }

        /// The delimited join never collides with the plain concatenation
        /// of the same two fields.
        #[test]
        fn delimiter_is_always_present(
            a in proptest::collection::vec(any::<u8>(), 1..32),
            b in proptest::collection::vec(any::<u8>(), 1..32),
        ) {
            let joined = Digest::of_fields([a.as_slice(), b.as_slice()]);
            let concatenated = {
                let mut bytes = a.clone();
                bytes.extend_from_slice(&b);
                Digest::of_bytes(&bytes)
            };
            prop_assert_ne!(joined, concatenated);
        }
    }
}

#[cfg(test)]
mod fee_properties {
    use authkit_protocol::fees;
    use proptest::prelude::*;
    use rust_decimal::prelude::FromPrimitive;
    use rust_decimal::Decimal;

    proptest! {
        /// A larger discount multiplier never charges less.
        #[test]
        fn charge_is_monotone_in_discount(
            raw in 1i64..10_000_000,
            unit in 1i64..100_000,
            d1 in 0.0f64..=1.0,
            d2 in 0.0f64..=1.0,
        ) {
            let (low, high) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
            let low = Decimal::from_f64(low).unwrap();
            let high = Decimal::from_f64(high).unwrap();
            prop_assert!(
                fees::discounted_charge(raw, unit, low)
                    <= fees::discounted_charge(raw, unit, high)
            );
        }

        /// A discounted charge never exceeds the undiscounted charge.
        #[test]
        fn discount_never_increases_charge(
            raw in 1i64..10_000_000,
            unit in 1i64..100_000,
            discount in 0.0f64..=1.0,
        ) {
            let discount = Decimal::from_f64(discount).unwrap();
            prop_assert!(
                fees::discounted_charge(raw, unit, discount)
                    <= fees::discounted_charge(raw, unit, Decimal::ONE)
            );
        }

        /// The per-credit price is positive and antitone in the oracle
        /// price: a cheaper pair quote buys more native units per credit.
        #[test]
        fn unit_price_is_antitone(p1 in 0.0001f64..=1.0, p2 in 0.0001f64..=1.0) {
            let (low, high) = if p1 <= p2 { (p1, p2) } else { (p2, p1) };
            let at_low = fees::unit_price(low).unwrap();
            let at_high = fees::unit_price(high).unwrap();
            prop_assert!(at_low >= at_high);
            prop_assert!(at_high >= 1);
        }

        /// The reward never exceeds the reserve while the consumed fee is
        /// at most the outstanding supply.
        #[test]
        fn reward_is_bounded_by_reserve(
            fee in 1i64..1_000_000,
            reserve in 0i64..1_000_000_000,
            extra_supply in 0i64..1_000_000,
        ) {
            let supply = fee + extra_supply;
            prop_assert!(fees::proportional_reward(fee, reserve, supply) <= reserve);
        }
    }
}

#[cfg(test)]
mod amount_properties {
    use authkit_lib::{Asset, Symbol};
    use proptest::prelude::*;

    proptest! {
        /// The canonical string form round-trips exactly.
        #[test]
        fn asset_string_round_trip(raw in -100_000_000_000i64..100_000_000_000) {
            let original = Asset::new(raw, Symbol::new("CORE", 4));
            let parsed: Asset = original.to_string().parse().unwrap();
            prop_assert_eq!(parsed, original);
        }

        /// Addition and subtraction invert each other within range.
        #[test]
        fn add_sub_round_trip(a in 0i64..1_000_000_000, b in 0i64..1_000_000_000) {
            let core = Symbol::new("CORE", 4);
            let first = Asset::new(a, core.clone());
            let second = Asset::new(b, core);
            let sum = first.checked_add(&second).unwrap();
            let back = sum.checked_sub(&second).unwrap();
            prop_assert_eq!(back, first);
        }
    }
}
