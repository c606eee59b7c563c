//! Indexing poller.
//!
//! After a write is accepted, the remote service takes time to make it
//! observable. [`poll`] is the generic primitive: re-invoke a fetch until a
//! condition releases it. The wait is deliberately unbounded - bounding it
//! is the caller's call (`tokio::time::timeout` around the returned future);
//! no default timeout is imposed here. Dropping the future cancels the loop
//! at its next await point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use safe_sync_client::ReadClient;
use safe_sync_types::{Address, EthereumTxHash, SafeTxHash};
use tracing::trace;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Re-invoke `fetch` every `interval` while `keep_waiting` holds for its
/// result; return the first result it releases. The first fetch runs
/// immediately. Fetch errors propagate and end the wait.
pub async fn poll<T, F, Fut, C>(mut fetch: F, mut keep_waiting: C, interval: Duration) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
    C: FnMut(&T) -> bool,
{
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let value = fetch().await?;
        if !keep_waiting(&value) {
            trace!(attempts, "poll condition satisfied");
            return Ok(value);
        }
        trace!(attempts, "poll condition not met, waiting");
        tokio::time::sleep(interval).await;
    }
}

/// Which hashes a visibility wait can anchor on.
#[derive(Debug, Clone, Default)]
pub struct VisibilityTarget {
    pub ethereum_tx_hash: Option<EthereumTxHash>,
    pub safe_tx_hash: Option<SafeTxHash>,
}

/// Block until the ledger settles the transaction. Fails fast on an empty
/// hash or an absent handle; otherwise a single delegated wait on the chain
/// client, not a poll loop.
pub async fn wait_for_settlement(
    reader: Option<&Arc<dyn ReadClient>>,
    hash: &EthereumTxHash,
) -> Result<()> {
    if hash.is_empty() {
        bail!("`ethereum_tx_hash` parameter must not be empty");
    }
    let reader = reader.ok_or_else(|| anyhow!("public client not initialized"))?;
    reader.wait_for_settlement(hash).await
}

/// Block until the coordination service reports the write as visible.
///
/// With an application-layer hash, polls the transaction lookup until it is
/// both present and executed. With only a settlement hash, polls the full
/// transaction list of `safe_address` until some entry's settlement-hash
/// field matches; a not-yet-indexed account ("not found") counts as an empty
/// list rather than a failure.
pub async fn wait_for_application_visibility(
    reader: Option<&Arc<dyn ReadClient>>,
    safe_address: Option<&Address>,
    target: &VisibilityTarget,
    interval: Duration,
) -> Result<()> {
    let reader = reader.ok_or_else(|| anyhow!("public client not initialized"))?;

    if let Some(hash) = &target.safe_tx_hash {
        poll(
            || reader.get_transaction(hash),
            |details| !matches!(details, Some(tx) if tx.is_executed),
            interval,
        )
        .await?;
        return Ok(());
    }

    if let Some(hash) = &target.ethereum_tx_hash {
        let address = safe_address.ok_or_else(|| anyhow!("Safe address is not available"))?;
        poll(
            || async {
                match reader.get_all_transactions(address).await {
                    Ok(list) => Ok(list),
                    Err(err) if err.to_string().to_lowercase().contains("not found") => {
                        Ok(Vec::new())
                    }
                    Err(err) => Err(err),
                }
            },
            |list| {
                !list
                    .iter()
                    .any(|entry| entry.settlement_hash() == Some(hash))
            },
            interval,
        )
        .await?;
        return Ok(());
    }

    bail!("either `ethereum_tx_hash` or `safe_tx_hash` must be provided")
}
