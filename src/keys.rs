//! Cache key registry.
//!
//! Every logical fact maps to a composite key of its kind, the active
//! configuration, and any extra parameters (a transaction hash, a balance
//! address). Keys derive `Eq`/`Hash` structurally, so two value-equal
//! configurations yield keys the cache treats as identical regardless of
//! where the config values were allocated.

use std::fmt;

use safe_sync_types::SafeConfig;
use serde::{Deserialize, Serialize};

/// The logical facts this engine keeps synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FactKind {
    /// Aggregate of the five account sub-facts below.
    SafeInfo,
    Address,
    Nonce,
    Threshold,
    IsDeployed,
    Owners,
    Balance,
    PendingTransactions,
    Transactions,
    /// Single transaction looked up by application-layer hash.
    Transaction,
    SafeOperations,
    PendingSafeOperations,
}

impl fmt::Display for FactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SafeInfo => "safe_info",
            Self::Address => "address",
            Self::Nonce => "nonce",
            Self::Threshold => "threshold",
            Self::IsDeployed => "is_deployed",
            Self::Owners => "owners",
            Self::Balance => "balance",
            Self::PendingTransactions => "pending_transactions",
            Self::Transactions => "transactions",
            Self::Transaction => "transaction",
            Self::SafeOperations => "safe_operations",
            Self::PendingSafeOperations => "pending_safe_operations",
        };
        f.write_str(name)
    }
}

/// Composite cache key: `[fact, config, extra...]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub fact: FactKind,
    pub config: SafeConfig,
    pub extra: Vec<String>,
}

impl CacheKey {
    pub fn of(fact: FactKind, config: &SafeConfig) -> Self {
        Self {
            fact,
            config: config.clone(),
            extra: Vec::new(),
        }
    }

    pub fn with_extra(fact: FactKind, config: &SafeConfig, extra: Vec<String>) -> Self {
        Self {
            fact,
            config: config.clone(),
            extra,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.fact, self.config.chain_id)?;
        for extra in &self.extra {
            write!(f, ":{extra}")?;
        }
        Ok(())
    }
}

/// Key of a write operation: the operation kind plus the active config.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MutationKey {
    pub kind: WriteKind,
    pub config: SafeConfig,
}

impl MutationKey {
    pub fn of(kind: WriteKind, config: &SafeConfig) -> Self {
        Self {
            kind,
            config: config.clone(),
        }
    }
}

/// The write operations the engine coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteKind {
    SendTransaction,
    ConfirmTransaction,
    SendOperationBundle,
    ConfirmOperationBundle,
    AddOwner,
    RemoveOwner,
    SwapOwner,
    ChangeThreshold,
}

#[cfg(test)]
mod tests {
    use super::*;
    use safe_sync_types::{Address, ChainId, ConnectionTarget};

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
    fn value_equal_configs_yield_equal_keys() {
        // Two separately allocated but structurally identical configs.
        let a = CacheKey::of(FactKind::Nonce, &config());
        let b = CacheKey::of(FactKind::Nonce, &config());
        assert_eq!(a, b);

        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let hash = |key: &CacheKey| {
            let mut hasher = DefaultHasher::new();
            key.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn differing_config_or_extra_changes_the_key() {
        let base = CacheKey::of(FactKind::Nonce, &config());

        let mut other_config = config();
        other_config.chain_id = ChainId(5);
        assert_ne!(base, CacheKey::of(FactKind::Nonce, &other_config));

        assert_ne!(base, CacheKey::of(FactKind::Threshold, &config()));
        assert_ne!(
            CacheKey::with_extra(FactKind::Transaction, &config(), vec!["0x1".into()]),
            CacheKey::with_extra(FactKind::Transaction, &config(), vec!["0x2".into()]),
        );
    }

    #[test]
    fn extra_params_are_order_preserving() {
        let a = CacheKey::with_extra(FactKind::Balance, &config(), vec!["a".into(), "b".into()]);
        let b = CacheKey::with_extra(FactKind::Balance, &config(), vec!["b".into(), "a".into()]);
        assert_ne!(a, b);
    }
}
