//! Result shape produced by write operations.
//!
//! The hash fields present on a [`WriteResult`] are the sole input to the
//! invalidation router: a settlement hash means the ledger already saw the
//! transaction, an application hash alone means the proposal is still
//! collecting confirmations, and the operation-bundle fields carry the same
//! distinction for gas-abstracted bundles.

use serde::{Deserialize, Serialize};

use crate::ids::{Address, EthereumTxHash, SafeOperationHash, SafeTxHash, UserOperationHash};

/// Outcome of a send/confirm write against the Safe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    /// The Safe the write acted on.
    pub safe_address: Address,
    pub status: WriteStatus,
    /// Plain multisig transaction hashes, when the write produced any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transactions: Option<TransactionHashes>,
    /// Operation-bundle hashes, when the write produced any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operations: Option<OperationHashes>,
}

impl WriteResult {
    /// A result for an executed transaction, carrying its settlement hash.
    pub fn executed(safe_address: Address, hash: EthereumTxHash) -> Self {
        Self {
            safe_address,
            status: WriteStatus::Executed,
            transactions: Some(TransactionHashes {
                ethereum_tx_hash: Some(hash),
                safe_tx_hash: None,
            }),
            operations: None,
        }
    }

    /// A result for a proposal still awaiting signatures.
    pub fn pending_signatures(safe_address: Address, hash: SafeTxHash) -> Self {
        Self {
            safe_address,
            status: WriteStatus::PendingSignatures,
            transactions: Some(TransactionHashes {
                ethereum_tx_hash: None,
                safe_tx_hash: Some(hash),
            }),
            operations: None,
        }
    }
}

/// Coarse status discriminant the service attaches to write results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteStatus {
    Executed,
    PendingSignatures,
    OperationSubmitted,
    OperationPendingSignatures,
}

/// Hashes of a plain multisig transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHashes {
    /// Settlement-layer hash, present once the ledger included the
    /// transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethereum_tx_hash: Option<EthereumTxHash>,
    /// Application-layer hash of the proposal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_tx_hash: Option<SafeTxHash>,
}

/// Hashes of an operation bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationHashes {
    /// Bundler-level hash, present once the bundler accepted the bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_operation_hash: Option<UserOperationHash>,
    /// Application-layer hash of the pending bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_operation_hash: Option<SafeOperationHash>,
}
