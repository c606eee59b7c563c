//! Invalidation router.
//!
//! Decides which cached facts go stale after a completed write, based only
//! on the shape of the write's result. The aggregate `SafeInfo` fact expands
//! recursively into its five constituent sub-facts; each invalidation is
//! independent, so ordering matters only for observability.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use safe_sync_client::ReadClient;
use safe_sync_types::{SafeConfig, WriteResult};
use tracing::debug;

use crate::cache::CacheContext;
use crate::composite::ACCOUNT_INFO_FACTS;
use crate::keys::{CacheKey, FactKind};
use crate::poller::{wait_for_application_visibility, wait_for_settlement, VisibilityTarget};

/// Expand aggregate facts into their constituents, recursively, preserving
/// declaration order. Today only `SafeInfo` expands.
pub fn expand(facts: &[FactKind]) -> Vec<FactKind> {
    let mut expanded = Vec::new();
    for &fact in facts {
        expanded.push(fact);
        if fact == FactKind::SafeInfo {
            expanded.extend(expand(&ACCOUNT_INFO_FACTS));
        }
    }
    expanded
}

/// Mark every named fact (after expansion) stale for the given config.
pub fn invalidate_facts(ctx: &CacheContext, config: &SafeConfig, facts: &[FactKind]) {
    for fact in expand(facts) {
        ctx.invalidate(&CacheKey::of(fact, config));
    }
}

/// Post-write coordination: wait for the write to become observable, then
/// mark the affected facts stale. The result's hash fields are the sole
/// input to the decision. Write failures never reach this function.
pub async fn route_after_write(
    ctx: &CacheContext,
    config: &SafeConfig,
    reader: Option<&Arc<dyn ReadClient>>,
    result: &WriteResult,
    poll_interval: Duration,
) -> Result<()> {
    if let Some(hashes) = &result.transactions {
        if let Some(settlement) = &hashes.ethereum_tx_hash {
            debug!(hash = %settlement, "write settled on-chain, waiting for indexing");
            wait_for_settlement(reader, settlement).await?;
            invalidate_facts(
                ctx,
                config,
                &[FactKind::PendingTransactions, FactKind::SafeInfo],
            );

            let target = VisibilityTarget {
                ethereum_tx_hash: Some(settlement.clone()),
                safe_tx_hash: hashes.safe_tx_hash.clone(),
            };
            wait_for_application_visibility(
                reader,
                Some(&result.safe_address),
                &target,
                poll_interval,
            )
            .await?;
            invalidate_facts(ctx, config, &[FactKind::Transactions]);
        } else if hashes.safe_tx_hash.is_some() {
            // Proposal only; nothing settled yet.
            invalidate_facts(ctx, config, &[FactKind::PendingTransactions]);
        }
    }

    if let Some(hashes) = &result.operations {
        if hashes.user_operation_hash.is_some() {
            invalidate_facts(ctx, config, &[FactKind::SafeOperations, FactKind::SafeInfo]);
        } else if hashes.safe_operation_hash.is_some() {
            invalidate_facts(ctx, config, &[FactKind::PendingSafeOperations]);
        }
    }

    Ok(())
}
