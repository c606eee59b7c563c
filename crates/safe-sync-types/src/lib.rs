//! Shared types for the safe-sync workspace.
//!
//! This crate provides the foundational value types used across the workspace,
//! breaking circular dependency chains:
//!
//! - [`config`] - the connection configuration and its building blocks
//! - [`ids`] - address and hash newtypes
//! - [`transaction`] - transaction inputs, list entries and detail records
//! - [`write_result`] - the result shape produced by write operations

pub mod config;
pub mod ids;
pub mod transaction;
pub mod write_result;

// Re-export commonly used types at crate root
pub use config::{ConnectionTarget, OperationBundleOptions, SafeConfig, SignerCredentials};
pub use ids::{Address, ChainId, EthereumTxHash, SafeOperationHash, SafeTxHash, UserOperationHash};
pub use transaction::{
    AddOwnerParams, RemoveOwnerParams, SafeOperation, SwapOwnerParams, TransactionDetails,
    TransactionInput, TransactionListEntry,
};
pub use write_result::{OperationHashes, TransactionHashes, WriteResult, WriteStatus};
