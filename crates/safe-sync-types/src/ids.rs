//! Address and hash newtypes.
//!
//! All identifiers are hex strings as the remote coordination service reports
//! them. Newtypes keep the settlement-layer and application-layer hash spaces
//! from mixing: an [`EthereumTxHash`] identifies a transaction on the ledger,
//! a [`SafeTxHash`] identifies a multisig proposal in the off-chain service,
//! and the two are never interchangeable.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! hex_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

hex_id!(
    /// An account address (the Safe itself, an owner, or a recipient).
    Address
);
hex_id!(
    /// Settlement-layer transaction hash, assigned once the ledger includes
    /// the transaction.
    EthereumTxHash
);
hex_id!(
    /// Application-layer hash of a multisig proposal, assigned by the
    /// off-chain coordination service before settlement.
    SafeTxHash
);
hex_id!(
    /// Bundler-level hash of a submitted operation bundle.
    UserOperationHash
);
hex_id!(
    /// Application-layer hash of an operation bundle pending confirmation.
    SafeOperationHash
);

/// Chain identifier of the settlement layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_newtypes_do_not_compare_across_spaces() {
        let eth = EthereumTxHash::from("0xabc");
        let safe = SafeTxHash::from("0xabc");
        // Same underlying text, distinct types; only string views compare.
        assert_eq!(eth.as_str(), safe.as_str());
    }

    #[test]
    fn empty_detection() {
        assert!(SafeTxHash::from("").is_empty());
        assert!(!SafeTxHash::from("0x1").is_empty());
    }

    #[test]
    fn serde_is_transparent() {
        let addr = Address::from("0x5afe");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x5afe\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
