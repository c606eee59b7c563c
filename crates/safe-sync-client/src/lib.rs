//! Execution-handle seam for the safe-sync workspace.
//!
//! The engine never talks to the remote coordination service directly; it
//! goes through the client traits in [`traits`], held behind the tagged
//! handle variants in [`handle`]. The [`testing`] module provides a scripted
//! in-memory client used by the unit and integration suites.

pub mod handle;
pub mod testing;
pub mod traits;

pub use handle::{HandleFactory, PublicHandle, SignerHandle};
pub use traits::{OperationReadClient, OperationWriteClient, ReadClient, WriteClient};
