//! Unified entry point.
//!
//! [`SafeSync`] ties the cache context, the connection resolver, and the
//! handle memo together behind one object with an explicit lifecycle:
//! construct it at application start, pass it by reference, drop it at
//! shutdown. From it, derive [`SafeQueries`] for reads and [`SafeWrites`]
//! for writes against the resolved configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use safe_sync_client::HandleFactory;
use safe_sync_types::{SafeConfig, SignerCredentials};

use crate::cache::CacheContext;
use crate::composite::{fetch_account_info, AccountInfo};
use crate::mutation::SafeWrites;
use crate::poller::DEFAULT_POLL_INTERVAL;
use crate::query::SafeQueries;
use crate::resolver::{ConnectionResolver, HandleCache};
use crate::state::ReadState;

/// The state-synchronization engine.
pub struct SafeSync {
    ctx: Arc<CacheContext>,
    resolver: ConnectionResolver,
    handles: HandleCache,
    poll_interval: Duration,
}

impl SafeSync {
    pub fn new(factory: Arc<dyn HandleFactory>) -> Self {
        Self {
            ctx: CacheContext::new(),
            resolver: ConnectionResolver::new(),
            handles: HandleCache::new(factory),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_ambient(factory: Arc<dyn HandleFactory>, config: SafeConfig) -> Self {
        Self {
            ctx: CacheContext::new(),
            resolver: ConnectionResolver::with_ambient(config),
            handles: HandleCache::new(factory),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the indexing-poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn cache(&self) -> &Arc<CacheContext> {
        &self.ctx
    }

    pub fn resolver(&self) -> &ConnectionResolver {
        &self.resolver
    }

    /// Attach a signer to the ambient configuration; the next write
    /// derivation rebuilds the signer handle exactly once.
    pub fn connect(&self, signer: SignerCredentials) -> Result<()> {
        self.resolver.connect(signer)
    }

    /// Detach the ambient signer.
    pub fn disconnect(&self) -> Result<()> {
        self.resolver.disconnect()
    }

    /// Derive per-fact queries for the resolved configuration. A handle
    /// that cannot be built (yet) leaves the queries in the retryable
    /// "not initialized" error state rather than failing the derivation.
    pub async fn queries(&self, explicit: Option<SafeConfig>) -> Result<SafeQueries> {
        let (config, _setter) = self.resolver.resolve(explicit)?;
        let handle = self.handles.public_handle(&config).await.ok();
        Ok(SafeQueries::new(Arc::clone(&self.ctx), config, handle))
    }

    /// Derive write operations for the resolved configuration. Without
    /// signer credentials the writes exist but reject with
    /// "Signer client is not available".
    pub async fn writes(&self, explicit: Option<SafeConfig>) -> Result<SafeWrites> {
        let (config, _setter) = self.resolver.resolve(explicit)?;
        let signer = self
            .handles
            .signer_handle(&config)
            .await
            .ok()
            .and_then(|handle| handle);
        Ok(
            SafeWrites::new(Arc::clone(&self.ctx), config, signer)
                .with_poll_interval(self.poll_interval),
        )
    }

    /// Resolve the account-info aggregate in one call.
    pub async fn account_info(&self, explicit: Option<SafeConfig>) -> Result<ReadState<AccountInfo>> {
        let queries = self.queries(explicit).await?;
        Ok(fetch_account_info(&queries).await)
    }
}
