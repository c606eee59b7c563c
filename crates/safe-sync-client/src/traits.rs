//! Client traits over the remote transaction-coordination service.
//!
//! These are the only operations the engine consumes. Any rejection from the
//! remote side surfaces as an opaque `anyhow::Error`; the engine interprets
//! nothing beyond the hash fields on [`WriteResult`].

use anyhow::Result;
use safe_sync_types::{
    AddOwnerParams, Address, EthereumTxHash, RemoveOwnerParams, SafeOperation, SafeOperationHash,
    SafeTxHash, SwapOwnerParams, TransactionDetails, TransactionInput, TransactionListEntry,
    WriteResult,
};

/// Read operations available on any handle.
#[async_trait::async_trait]
pub trait ReadClient: Send + Sync {
    async fn get_address(&self) -> Result<Address>;

    async fn get_nonce(&self) -> Result<u64>;

    async fn get_threshold(&self) -> Result<usize>;

    async fn is_deployed(&self) -> Result<bool>;

    async fn get_owners(&self) -> Result<Vec<Address>>;

    /// Balance of the given address in wei.
    async fn get_balance(&self, address: &Address) -> Result<u128>;

    /// Look up a multisig transaction by its application-layer hash.
    /// Returns `None` when the service has not indexed it yet.
    async fn get_transaction(&self, safe_tx_hash: &SafeTxHash)
        -> Result<Option<TransactionDetails>>;

    /// Full transaction history for an account, all variants mixed.
    async fn get_all_transactions(&self, address: &Address) -> Result<Vec<TransactionListEntry>>;

    async fn get_pending_transactions(&self) -> Result<Vec<TransactionDetails>>;

    /// Block until the ledger settles the given transaction. This is the
    /// chain client's own primitive; the engine does not poll around it.
    async fn wait_for_settlement(&self, hash: &EthereumTxHash) -> Result<()>;
}

/// Read operations that exist only on bundle-extended handles.
#[async_trait::async_trait]
pub trait OperationReadClient: Send + Sync {
    async fn get_safe_operation(&self, hash: &SafeOperationHash) -> Result<Option<SafeOperation>>;

    async fn get_safe_operations(&self, address: &Address) -> Result<Vec<SafeOperation>>;

    async fn get_pending_safe_operations(&self, address: &Address) -> Result<Vec<SafeOperation>>;
}

/// Write operations; every writer can also read.
#[async_trait::async_trait]
pub trait WriteClient: ReadClient {
    /// Propose or execute a batch of transactions, depending on threshold.
    async fn send(&self, transactions: Vec<TransactionInput>) -> Result<WriteResult>;

    /// Add a confirmation to a pending proposal, executing it when the
    /// threshold is reached.
    async fn confirm(&self, safe_tx_hash: &SafeTxHash) -> Result<WriteResult>;

    async fn create_add_owner_transaction(
        &self,
        params: AddOwnerParams,
    ) -> Result<TransactionInput>;

    async fn create_remove_owner_transaction(
        &self,
        params: RemoveOwnerParams,
    ) -> Result<TransactionInput>;

    async fn create_swap_owner_transaction(
        &self,
        params: SwapOwnerParams,
    ) -> Result<TransactionInput>;

    async fn create_change_threshold_transaction(
        &self,
        threshold: usize,
    ) -> Result<TransactionInput>;
}

/// Bundle write operations on bundle-extended signer handles.
#[async_trait::async_trait]
pub trait OperationWriteClient: OperationReadClient {
    async fn send_operation_bundle(
        &self,
        transactions: Vec<TransactionInput>,
    ) -> Result<WriteResult>;

    async fn confirm_operation_bundle(&self, hash: &SafeOperationHash) -> Result<WriteResult>;
}
