//! Per-action canonical digests.
//!
//! One field list per action kind, each joined and hashed by
//! [`Digest::of_fields`]. Clients sign exactly these digests: the protocol
//! never transmits a digest, it recomputes one from the action's own
//! arguments, so field order and count are frozen contract. The payer
//! field is the literal payer argument of the call — an empty string when
//! the caller omitted it, not the defaulted payer.

use authkit_lib::{AccountName, ApplicationKey, Asset, Digest, RelayedAction};

/// Digest signed when registering a key under the owner's native
/// authority: `(account, new key, payer)`.
pub fn registration_digest(
    account: &AccountName,
    key: &ApplicationKey,
    payer: Option<&AccountName>,
) -> Digest {
    let payer = payer.map(AccountName::as_str).unwrap_or("");
    Digest::of_fields([
        account.as_str().as_bytes(),
        key.point_bytes().as_slice(),
        payer.as_bytes(),
    ])
}

/// Digest co-signed by the new key and an existing key when registering
/// or rotating: `(account, new key, existing key, payer)`.
pub fn co_registration_digest(
    account: &AccountName,
    new_key: &ApplicationKey,
    existing_key: &ApplicationKey,
    payer: Option<&AccountName>,
) -> Digest {
    let payer = payer.map(AccountName::as_str).unwrap_or("");
    Digest::of_fields([
        account.as_str().as_bytes(),
        new_key.point_bytes().as_slice(),
        existing_key.point_bytes().as_slice(),
        payer.as_bytes(),
    ])
}

/// Digest signed by the authorizing key when revoking another key:
/// `(account, key to revoke, authorizing key)`.
pub fn revocation_digest(
    account: &AccountName,
    revoke_key: &ApplicationKey,
    signer_key: &ApplicationKey,
) -> Digest {
    Digest::of_fields([
        account.as_str().as_bytes(),
        revoke_key.point_bytes().as_slice(),
        signer_key.point_bytes().as_slice(),
    ])
}

/// Digest signed when relaying an arbitrary action:
/// `(account, action, timestamp, authorizing key)`. Doubles as the
/// replay-protection fingerprint.
pub fn relay_digest(
    account: &AccountName,
    action: &RelayedAction,
    action_timestamp: i64,
    key: &ApplicationKey,
) -> Digest {
    let action_bytes = action.canonical_bytes();
    let timestamp = action_timestamp.to_string();
    Digest::of_fields([
        account.as_str().as_bytes(),
        action_bytes.as_slice(),
        timestamp.as_bytes(),
        key.point_bytes().as_slice(),
    ])
}

/// Digest signed for an authorized transfer:
/// `(from, to, quantity, memo, authorizing key)` with the quantity in its
/// canonical decimal string form.
pub fn transfer_digest(
    from: &AccountName,
    to: &AccountName,
    quantity: &Asset,
    memo: &str,
    key: &ApplicationKey,
) -> Digest {
    let quantity = quantity.to_string();
    Digest::of_fields([
        from.as_str().as_bytes(),
        to.as_str().as_bytes(),
        quantity.as_bytes(),
        memo.as_bytes(),
        key.point_bytes().as_slice(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use authkit_lib::test_utils::TestKeypair;
    use authkit_lib::{Permission, Symbol};

    #[test]
    fn test_omitted_payer_hashes_empty_field() {
        let alice: AccountName = "alice".into();
        let key = TestKeypair::generate_secp256k1().public_key();

        let omitted = registration_digest(&alice, &key, None);
        let named = registration_digest(&alice, &key, Some(&"bob".into()));
        assert_ne!(omitted, named);

        // the omitted payer is an empty trailing field, still delimited
        let mut manual = Vec::new();
        manual.extend_from_slice(b"alice*");
        manual.extend_from_slice(key.point_bytes());
        manual.extend_from_slice(b"*");
        assert_eq!(omitted, Digest::of_bytes(&manual));
    }

    #[test]
    fn test_transfer_digest_uses_canonical_quantity_string() {
        let key = TestKeypair::generate_secp256k1().public_key();
        let quantity = Asset::new(3_110_000, Symbol::new("CORE", 4));

        let digest = transfer_digest(&"alice".into(), &"bob".into(), &quantity, "rent", &key);

        let mut manual = Vec::new();
        manual.extend_from_slice(b"alice*bob*311.0000 CORE*rent*");
        manual.extend_from_slice(key.point_bytes());
        assert_eq!(digest, Digest::of_bytes(&manual));
    }

    #[test]
    fn test_relay_digest_binds_every_argument() {
        let alice: AccountName = "alice".into();
        let key = TestKeypair::generate_secp256k1().public_key();
        let action = RelayedAction::new(
            "app",
            "noop",
            vec![1, 2, 3],
            vec![Permission::new("alice", "active")],
        );

        let base = relay_digest(&alice, &action, 500, &key);
        assert_ne!(base, relay_digest(&"bob".into(), &action, 500, &key));
        assert_ne!(base, relay_digest(&alice, &action, 501, &key));

        let mut tampered = action.clone();
        tampered.data.push(4);
        assert_ne!(base, relay_digest(&alice, &tampered, 500, &key));

        let other_key = TestKeypair::generate_secp256k1().public_key();
        assert_ne!(base, relay_digest(&alice, &action, 500, &other_key));
    }
}
