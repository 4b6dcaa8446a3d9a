//! Relayed ledger actions.
//!
//! A relayed action is an opaque instruction the protocol forwards to the
//! host ledger once its application-key signature checks out. The payload
//! is not interpreted here; only its canonical byte form matters, because
//! that form is what the signer hashed.

use serde::{Deserialize, Serialize};

use crate::AccountName;

/// A single authorization entry on a relayed action.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Account whose authority the action claims.
    pub actor: AccountName,
    /// Named permission level of that account.
    pub permission: String,
}

impl Permission {
    /// Create a new permission entry.
    pub fn new(actor: impl Into<AccountName>, permission: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            permission: permission.into(),
        }
    }
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.actor, self.permission)
    }
}

/// An arbitrary ledger action submitted for signed relay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayedAction {
    /// Target contract account.
    pub contract: AccountName,
    /// Action name on that contract.
    pub name: String,
    /// Opaque serialized action arguments.
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    /// Authorization the dispatched action will carry.
    pub authorization: Vec<Permission>,
}

impl RelayedAction {
    /// Create a new relayed action.
    pub fn new(
        contract: impl Into<AccountName>,
        name: impl Into<String>,
        data: Vec<u8>,
        authorization: Vec<Permission>,
    ) -> Self {
        Self {
            contract: contract.into(),
            name: name.into(),
            data,
            authorization,
        }
    }

    /// Canonical byte form used as a single digest field.
    ///
    /// Rendered as `contract * name * hex(data) * actor@perm,actor@perm`.
    /// Clients must reproduce these bytes exactly when signing; the digest
    /// is recomputed from the action's own arguments, never transmitted.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let authorization = self
            .authorization
            .iter()
            .map(Permission::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let rendered = format!(
            "{}*{}*{}*{}",
            self.contract,
            self.name,
            hex::encode(&self.data),
            authorization
        );
        rendered.into_bytes()
    }
}
