//! Tagged execution handles.
//!
//! Whether a handle supports operation bundles is decided once, at
//! construction, from the configuration. The capability is a variant of the
//! handle type rather than an optional method probed per call, so a missing
//! capability fails with one well-known error at the seam.

use std::sync::Arc;

use anyhow::{bail, Result};
use safe_sync_types::SafeConfig;

use crate::traits::{OperationReadClient, OperationWriteClient, ReadClient, WriteClient};

/// Read-capable execution handle derived from a configuration.
#[derive(Clone)]
pub enum PublicHandle {
    Basic(Arc<dyn ReadClient>),
    WithOperationBundles {
        reader: Arc<dyn ReadClient>,
        operations: Arc<dyn OperationReadClient>,
    },
}

impl PublicHandle {
    pub fn reader(&self) -> &Arc<dyn ReadClient> {
        match self {
            Self::Basic(reader) => reader,
            Self::WithOperationBundles { reader, .. } => reader,
        }
    }

    pub fn operations(&self) -> Result<&Arc<dyn OperationReadClient>> {
        match self {
            Self::Basic(_) => bail!("operation bundle support is not configured"),
            Self::WithOperationBundles { operations, .. } => Ok(operations),
        }
    }

    pub fn supports_operation_bundles(&self) -> bool {
        matches!(self, Self::WithOperationBundles { .. })
    }
}

/// Write-capable execution handle; exists only when the configuration
/// carries a signer.
#[derive(Clone)]
pub enum SignerHandle {
    Basic(Arc<dyn WriteClient>),
    WithOperationBundles {
        writer: Arc<dyn WriteClient>,
        operations: Arc<dyn OperationWriteClient>,
    },
}

impl SignerHandle {
    pub fn writer(&self) -> &Arc<dyn WriteClient> {
        match self {
            Self::Basic(writer) => writer,
            Self::WithOperationBundles { writer, .. } => writer,
        }
    }

    pub fn operations(&self) -> Result<&Arc<dyn OperationWriteClient>> {
        match self {
            Self::Basic(_) => bail!("operation bundle support is not configured"),
            Self::WithOperationBundles { operations, .. } => Ok(operations),
        }
    }

    pub fn supports_operation_bundles(&self) -> bool {
        matches!(self, Self::WithOperationBundles { .. })
    }
}

/// Builds execution handles from a configuration.
///
/// Construction is async: real factories resolve the Safe deployment state
/// and service endpoints before the handle is usable. The factory must pick
/// the handle variant from `config.supports_operation_bundles()`.
#[async_trait::async_trait]
pub trait HandleFactory: Send + Sync {
    async fn build_public(&self, config: &SafeConfig) -> Result<PublicHandle>;

    /// Build a signer handle. Callers must only invoke this when
    /// `config.signer` is present; factories may assume it is.
    async fn build_signer(&self, config: &SafeConfig) -> Result<SignerHandle>;
}
