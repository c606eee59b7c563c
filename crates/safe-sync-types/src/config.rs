//! Connection configuration.
//!
//! [`SafeConfig`] is a plain value object: two configurations are equal iff
//! they are equal field by field. Value equality (never pointer identity) is
//! what drives cache-key stability and execution-handle reconstruction, so
//! every field keeps derived `PartialEq`/`Eq`/`Hash`.

use serde::{Deserialize, Serialize};

use crate::ids::{Address, ChainId};

/// Connection configuration for a Safe account.
///
/// Carries everything needed to construct an execution handle: the chain,
/// the transport endpoint, the coordination-service endpoint, an optional
/// signer, and either an existing Safe address or the options to predict one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SafeConfig {
    /// Settlement-layer chain.
    pub chain_id: ChainId,
    /// RPC transport endpoint.
    pub transport: String,
    /// Off-chain coordination-service endpoint.
    pub provider: String,
    /// Signer credentials; absent for read-only connections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<SignerCredentials>,
    /// The Safe this connection targets.
    pub target: ConnectionTarget,
    /// When present, handles are extended with operation-bundle support.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_bundle_options: Option<OperationBundleOptions>,
}

impl SafeConfig {
    /// Return a copy with the given signer attached.
    pub fn with_signer(&self, signer: SignerCredentials) -> Self {
        Self {
            signer: Some(signer),
            ..self.clone()
        }
    }

    /// Return a copy with the signer removed.
    pub fn without_signer(&self) -> Self {
        Self {
            signer: None,
            ..self.clone()
        }
    }

    /// Whether handles derived from this config carry operation-bundle
    /// capabilities. Decided here, once, never probed per call.
    pub fn supports_operation_bundles(&self) -> bool {
        self.operation_bundle_options.is_some()
    }
}

/// Signer credentials as an opaque key reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignerCredentials(pub String);

impl SignerCredentials {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

/// Either an already-deployed Safe or the construction options for a
/// counterfactual one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionTarget {
    /// Connect to an existing Safe by address.
    Existing { safe_address: Address },
    /// Predict a Safe from its deployment parameters.
    Predicted {
        owners: Vec<Address>,
        threshold: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        salt_nonce: Option<String>,
    },
}

/// Options enabling operation-bundle (gas-abstracted batch) support.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationBundleOptions {
    /// Bundler endpoint.
    pub bundler_url: String,
    /// Optional paymaster endpoint for sponsored execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SafeConfig {
        SafeConfig {
            chain_id: ChainId(1),
            transport: "https://rpc.example".into(),
            provider: "https://svc.example".into(),
            signer: None,
            target: ConnectionTarget::Existing {
                safe_address: Address::from("0x5afe"),
            },
            operation_bundle_options: None,
        }
    }

    #[test]
    fn equality_is_structural() {
        let a = config();
        let b = config();
        assert_eq!(a, b);

        let mut c = config();
        c.transport = "https://other.example".into();
        assert_ne!(a, c);
    }

    #[test]
    fn signer_round_trip() {
        let base = config();
        let signed = base.with_signer(SignerCredentials::new("0xkey"));
        assert_ne!(base, signed);
        assert_eq!(base, signed.without_signer());
    }

    #[test]
    fn bundle_support_follows_options() {
        let mut cfg = config();
        assert!(!cfg.supports_operation_bundles());
        cfg.operation_bundle_options = Some(OperationBundleOptions {
            bundler_url: "https://bundler.example".into(),
            paymaster_url: None,
        });
        assert!(cfg.supports_operation_bundles());
    }
}
