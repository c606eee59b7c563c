//! Transaction records as the coordination service reports them.

use serde::{Deserialize, Serialize};

use crate::ids::{Address, EthereumTxHash, SafeOperationHash, SafeTxHash, UserOperationHash};

/// A transaction to be proposed or executed through the Safe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionInput {
    pub to: Address,
    /// Value in wei, decimal string.
    pub value: String,
    /// Calldata, hex string.
    pub data: String,
}

impl TransactionInput {
    pub fn new(to: Address, value: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            to,
            value: value.into(),
            data: data.into(),
        }
    }
}

/// Detail record for a single multisig transaction, keyed by its
/// application-layer hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDetails {
    pub safe_tx_hash: SafeTxHash,
    /// Settlement hash, present once executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<EthereumTxHash>,
    pub is_executed: bool,
    /// Confirmations collected so far.
    #[serde(default)]
    pub confirmations: usize,
    /// Confirmations required for execution.
    #[serde(default)]
    pub confirmations_required: usize,
}

/// An entry in the full transaction list for an account.
///
/// The service reports three wire shapes, discriminated by `tx_type`. The
/// settlement hash lives under a different field name per variant:
/// `transaction_hash` for module and multisig entries, `tx_hash` for plain
/// settlement-layer entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tx_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionListEntry {
    ModuleTransaction {
        transaction_hash: EthereumTxHash,
        module: Address,
    },
    MultisigTransaction {
        safe_tx_hash: SafeTxHash,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        transaction_hash: Option<EthereumTxHash>,
        is_executed: bool,
    },
    EthereumTransaction {
        tx_hash: EthereumTxHash,
        from: Address,
    },
}

impl TransactionListEntry {
    /// The settlement hash of this entry, if it has one.
    pub fn settlement_hash(&self) -> Option<&EthereumTxHash> {
        match self {
            Self::ModuleTransaction {
                transaction_hash, ..
            } => Some(transaction_hash),
            Self::MultisigTransaction {
                transaction_hash, ..
            } => transaction_hash.as_ref(),
            Self::EthereumTransaction { tx_hash, .. } => Some(tx_hash),
        }
    }
}

/// An operation bundle tracked by the coordination service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeOperation {
    pub safe_operation_hash: SafeOperationHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_operation_hash: Option<UserOperationHash>,
    pub is_executed: bool,
}

/// Parameters for adding an owner, optionally changing the threshold with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddOwnerParams {
    pub owner: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<usize>,
}

/// Parameters for removing an owner, optionally changing the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveOwnerParams {
    pub owner: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<usize>,
}

/// Parameters for replacing one owner with another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOwnerParams {
    pub old_owner: Address,
    pub new_owner: Address,
}
