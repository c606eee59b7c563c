//! Query composer.
//!
//! [`FactQuery`] binds one logical fact (cache key + fetch function) into a
//! subscribed, revalidating read. A fetch reuses the cached value while it is
//! fresh, otherwise runs the fetch function and records the outcome. The
//! registered refetcher lets the cache context refresh the fact in the
//! background whenever it gets invalidated.
//!
//! [`SafeQueries`] derives one `FactQuery` per logical fact from the active
//! configuration and the public execution handle. An absent handle is a
//! retryable condition: every read surfaces it as the error state with the
//! message `"public client not initialized"`, and resolves normally once a
//! handle-bearing `SafeQueries` is built.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use safe_sync_client::PublicHandle;
use safe_sync_types::{Address, SafeConfig, SafeOperation, SafeOperationHash, SafeTxHash,
    TransactionDetails, TransactionListEntry};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::trace;

use crate::cache::{CacheContext, EntrySnapshot, Refetcher};
use crate::keys::{CacheKey, FactKind};
use crate::state::{now_millis, QueryMeta, QueryStatus, ReadState};

/// Stored fetch function of a fact.
pub type FetchFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// A single logical fact as a revalidating read.
pub struct FactQuery<T> {
    ctx: Arc<CacheContext>,
    key: CacheKey,
    fetch: FetchFn<T>,
}

impl<T> FactQuery<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Bind a fetch function to a cache key and subscribe for
    /// invalidation-driven refetches.
    pub fn new(ctx: Arc<CacheContext>, key: CacheKey, fetch: FetchFn<T>) -> Self {
        let refetcher = make_refetcher(&ctx, &key, &fetch);
        ctx.subscribe(&key, refetcher);
        Self { ctx, key, fetch }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Current state without fetching.
    pub fn state(&self) -> ReadState<T> {
        match self.ctx.snapshot(&self.key) {
            Some(snap) => state_from(snap),
            None => ReadState::pending(),
        }
    }

    /// Resolve the read: reuse the cached value while fresh, otherwise run
    /// the fetch function and record its outcome.
    pub async fn fetch(&self) -> ReadState<T> {
        if let Some(snap) = self.ctx.snapshot(&self.key) {
            if snap.status == QueryStatus::Success && !snap.is_stale {
                trace!(key = %self.key, "fresh cache hit");
                return state_from(snap);
            }
        }

        run_fetch(&self.ctx, &self.key, &self.fetch).await;
        self.state()
    }
}

impl<T> Drop for FactQuery<T> {
    fn drop(&mut self) {
        self.ctx.unsubscribe(&self.key);
    }
}

/// Run the fetch function once and record the outcome into the context.
async fn run_fetch<T: Serialize>(ctx: &Arc<CacheContext>, key: &CacheKey, fetch: &FetchFn<T>) {
    match (fetch)().await {
        Ok(value) => match serde_json::to_value(&value) {
            Ok(json) => ctx.record_success(key, json, now_millis()),
            Err(err) => ctx.record_failure(
                key,
                Arc::new(anyhow!(err).context("failed to encode cached value")),
                now_millis(),
            ),
        },
        Err(err) => ctx.record_failure(key, Arc::new(err), now_millis()),
    }
}

fn make_refetcher<T>(ctx: &Arc<CacheContext>, key: &CacheKey, fetch: &FetchFn<T>) -> Refetcher
where
    T: Serialize + Send + 'static,
{
    let ctx = Arc::clone(ctx);
    let key = key.clone();
    let fetch = Arc::clone(fetch);
    Arc::new(move || {
        let ctx = Arc::clone(&ctx);
        let key = key.clone();
        let fetch = Arc::clone(&fetch);
        Box::pin(async move {
            run_fetch(&ctx, &key, &fetch).await;
        })
    })
}

/// Convert a cache snapshot into a typed read state.
fn state_from<T: DeserializeOwned>(snap: EntrySnapshot) -> ReadState<T> {
    let data = snap
        .data
        .as_ref()
        .and_then(|value| serde_json::from_value(value.clone()).ok());
    let meta = match snap.status {
        QueryStatus::Success => {
            let mut meta = QueryMeta::success(snap.data_updated_at);
            meta.is_stale = snap.is_stale;
            meta.failure_count = snap.failure_count;
            meta.error_update_count = snap.error_update_count;
            meta.error_updated_at = snap.error_updated_at;
            meta
        }
        QueryStatus::Error => {
            let error = snap
                .error
                .clone()
                .unwrap_or_else(|| Arc::new(anyhow!("unknown error")));
            let mut meta = QueryMeta::failure(error, snap.error_updated_at);
            meta.is_stale = snap.is_stale;
            meta.failure_count = snap.failure_count;
            meta.error_update_count = snap.error_update_count;
            meta.data_updated_at = snap.data_updated_at;
            meta
        }
        QueryStatus::Pending => QueryMeta::pending(),
    };
    ReadState { data, meta }
}

/// Per-fact queries over the active configuration and public handle.
pub struct SafeQueries {
    ctx: Arc<CacheContext>,
    config: SafeConfig,
    handle: Option<PublicHandle>,
}

impl SafeQueries {
    pub fn new(ctx: Arc<CacheContext>, config: SafeConfig, handle: Option<PublicHandle>) -> Self {
        Self {
            ctx,
            config,
            handle,
        }
    }

    pub fn config(&self) -> &SafeConfig {
        &self.config
    }

    pub fn handle(&self) -> Option<&PublicHandle> {
        self.handle.as_ref()
    }

    fn query<T>(
        &self,
        key: CacheKey,
        op: impl Fn(PublicHandle) -> BoxFuture<'static, Result<T>> + Send + Sync + 'static,
    ) -> FactQuery<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let handle = self.handle.clone();
        let fetch: FetchFn<T> = Arc::new(move || match handle.clone() {
            Some(handle) => op(handle),
            None => Box::pin(async { Err(anyhow!("public client not initialized")) }),
        });
        FactQuery::new(Arc::clone(&self.ctx), key, fetch)
    }

    pub fn address(&self) -> FactQuery<Address> {
        self.query(CacheKey::of(FactKind::Address, &self.config), |handle| {
            Box::pin(async move { handle.reader().get_address().await })
        })
    }

    pub fn nonce(&self) -> FactQuery<u64> {
        self.query(CacheKey::of(FactKind::Nonce, &self.config), |handle| {
            Box::pin(async move { handle.reader().get_nonce().await })
        })
    }

    pub fn threshold(&self) -> FactQuery<usize> {
        self.query(CacheKey::of(FactKind::Threshold, &self.config), |handle| {
            Box::pin(async move { handle.reader().get_threshold().await })
        })
    }

    pub fn is_deployed(&self) -> FactQuery<bool> {
        self.query(CacheKey::of(FactKind::IsDeployed, &self.config), |handle| {
            Box::pin(async move { handle.reader().is_deployed().await })
        })
    }

    pub fn owners(&self) -> FactQuery<Vec<Address>> {
        self.query(CacheKey::of(FactKind::Owners, &self.config), |handle| {
            Box::pin(async move { handle.reader().get_owners().await })
        })
    }

    /// Balance of the given address, keyed per address.
    pub fn balance(&self, address: &Address) -> FactQuery<u128> {
        let target = address.clone();
        self.query(
            CacheKey::with_extra(FactKind::Balance, &self.config, vec![address.to_string()]),
            move |handle| {
                let target = target.clone();
                Box::pin(async move { handle.reader().get_balance(&target).await })
            },
        )
    }

    pub fn pending_transactions(&self) -> FactQuery<Vec<TransactionDetails>> {
        self.query(
            CacheKey::of(FactKind::PendingTransactions, &self.config),
            |handle| Box::pin(async move { handle.reader().get_pending_transactions().await }),
        )
    }

    /// Full transaction history of the connected Safe. The account address
    /// is resolved through the handle, so the fact works for counterfactual
    /// targets once they deploy.
    pub fn transactions(&self) -> FactQuery<Vec<TransactionListEntry>> {
        self.query(
            CacheKey::of(FactKind::Transactions, &self.config),
            |handle| {
                Box::pin(async move {
                    let reader = Arc::clone(handle.reader());
                    let address = reader.get_address().await?;
                    reader.get_all_transactions(&address).await
                })
            },
        )
    }

    /// A single transaction by application-layer hash.
    pub fn transaction(&self, safe_tx_hash: &SafeTxHash) -> FactQuery<Option<TransactionDetails>> {
        let hash = safe_tx_hash.clone();
        self.query(
            CacheKey::with_extra(
                FactKind::Transaction,
                &self.config,
                vec![safe_tx_hash.to_string()],
            ),
            move |handle| {
                let hash = hash.clone();
                Box::pin(async move { handle.reader().get_transaction(&hash).await })
            },
        )
    }

    pub fn safe_operations(&self) -> FactQuery<Vec<SafeOperation>> {
        self.query(
            CacheKey::of(FactKind::SafeOperations, &self.config),
            |handle| {
                Box::pin(async move {
                    let reader = Arc::clone(handle.reader());
                    let operations = Arc::clone(handle.operations()?);
                    let address = reader.get_address().await?;
                    operations.get_safe_operations(&address).await
                })
            },
        )
    }

    /// A single operation bundle by its application-layer hash. Shares the
    /// operations fact, so fact-level invalidation covers it.
    pub fn safe_operation(&self, hash: &SafeOperationHash) -> FactQuery<Option<SafeOperation>> {
        let target = hash.clone();
        self.query(
            CacheKey::with_extra(
                FactKind::SafeOperations,
                &self.config,
                vec![hash.to_string()],
            ),
            move |handle| {
                let target = target.clone();
                Box::pin(async move {
                    let operations = Arc::clone(handle.operations()?);
                    operations.get_safe_operation(&target).await
                })
            },
        )
    }

    pub fn pending_safe_operations(&self) -> FactQuery<Vec<SafeOperation>> {
        self.query(
            CacheKey::of(FactKind::PendingSafeOperations, &self.config),
            |handle| {
                Box::pin(async move {
                    let reader = Arc::clone(handle.reader());
                    let operations = Arc::clone(handle.operations()?);
                    let address = reader.get_address().await?;
                    operations.get_pending_safe_operations(&address).await
                })
            },
        )
    }
}
