//! Composite-read merger.
//!
//! Combines N independent fact reads into one logical read. The metadata
//! algebra reduces field by field over a fixed, canonical sub-read order:
//!
//! - boolean activity flags: OR; completion flags (`is_success`,
//!   `is_fetched`, `is_fetched_after_mount`): AND
//! - timestamps: max; counters: sum
//! - `error` / `failure_reason`: first non-null wins
//! - `status`: first pending-or-error encountered overrides success
//! - `fetch_status`: first paused-or-fetching encountered overrides idle
//!
//! The OR/AND/max/sum reductions are order-independent; the first-match
//! fields are not, which is why the aggregate's schema declaration order
//! ([`ACCOUNT_INFO_FACTS`]) is fixed and shared with the tests.
//!
//! Composite `data` is always the partial record of whatever resolved so
//! far; it is never withheld until full resolution, so consumers can render
//! progressively.

use safe_sync_types::Address;
use serde::{Deserialize, Serialize};

use crate::keys::FactKind;
use crate::query::SafeQueries;
use crate::state::{FetchStatus, QueryMeta, QueryStatus, ReadState};

/// Canonical sub-read order of the account-info aggregate.
pub const ACCOUNT_INFO_FACTS: [FactKind; 5] = [
    FactKind::Address,
    FactKind::Nonce,
    FactKind::Threshold,
    FactKind::IsDeployed,
    FactKind::Owners,
];

/// Identity element of the merge: what a composite of zero reads reports.
fn merge_identity() -> QueryMeta {
    QueryMeta {
        status: QueryStatus::Success,
        fetch_status: FetchStatus::Idle,
        error: None,
        failure_reason: None,
        is_error: false,
        is_pending: false,
        is_loading: false,
        is_loading_error: false,
        is_refetch_error: false,
        is_fetching: false,
        is_paused: false,
        is_refetching: false,
        is_stale: false,
        is_initial_loading: false,
        is_placeholder_data: false,
        is_success: true,
        is_fetched: true,
        is_fetched_after_mount: true,
        data_updated_at: 0,
        error_updated_at: 0,
        failure_count: 0,
        error_update_count: 0,
    }
}

/// Reduce sub-read metadata pairwise, left to right.
pub fn merge_meta(metas: &[&QueryMeta]) -> QueryMeta {
    let mut acc = merge_identity();
    for meta in metas {
        if acc.error.is_none() {
            acc.error = meta.error.clone();
        }
        if acc.failure_reason.is_none() {
            acc.failure_reason = meta.failure_reason.clone();
        }

        acc.is_error |= meta.is_error;
        acc.is_pending |= meta.is_pending;
        acc.is_loading |= meta.is_loading;
        acc.is_loading_error |= meta.is_loading_error;
        acc.is_refetch_error |= meta.is_refetch_error;
        acc.is_fetching |= meta.is_fetching;
        acc.is_paused |= meta.is_paused;
        acc.is_refetching |= meta.is_refetching;
        acc.is_stale |= meta.is_stale;
        acc.is_initial_loading |= meta.is_initial_loading;
        acc.is_placeholder_data |= meta.is_placeholder_data;

        acc.is_success &= meta.is_success;
        acc.is_fetched &= meta.is_fetched;
        acc.is_fetched_after_mount &= meta.is_fetched_after_mount;

        if acc.status == QueryStatus::Success
            && matches!(meta.status, QueryStatus::Pending | QueryStatus::Error)
        {
            acc.status = meta.status;
        }
        if acc.fetch_status == FetchStatus::Idle
            && matches!(meta.fetch_status, FetchStatus::Paused | FetchStatus::Fetching)
        {
            acc.fetch_status = meta.fetch_status;
        }

        acc.data_updated_at = acc.data_updated_at.max(meta.data_updated_at);
        acc.error_updated_at = acc.error_updated_at.max(meta.error_updated_at);
        acc.failure_count += meta.failure_count;
        acc.error_update_count += meta.error_update_count;
    }
    acc
}

/// The account-info aggregate: the partial record of its five sub-facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub address: Option<Address>,
    pub nonce: Option<u64>,
    pub threshold: Option<usize>,
    pub is_deployed: Option<bool>,
    pub owners: Option<Vec<Address>>,
}

/// Merge the five account sub-reads, in canonical order, into one read.
pub fn merge_account_info(
    address: ReadState<Address>,
    nonce: ReadState<u64>,
    threshold: ReadState<usize>,
    is_deployed: ReadState<bool>,
    owners: ReadState<Vec<Address>>,
) -> ReadState<AccountInfo> {
    let meta = merge_meta(&[
        &address.meta,
        &nonce.meta,
        &threshold.meta,
        &is_deployed.meta,
        &owners.meta,
    ]);
    ReadState {
        data: Some(AccountInfo {
            address: address.data,
            nonce: nonce.data,
            threshold: threshold.data,
            is_deployed: is_deployed.data,
            owners: owners.data,
        }),
        meta,
    }
}

/// Fan the account-info aggregate out into its five sub-reads, resolve them
/// in parallel, and recombine.
pub async fn fetch_account_info(queries: &SafeQueries) -> ReadState<AccountInfo> {
    let address = queries.address();
    let nonce = queries.nonce();
    let threshold = queries.threshold();
    let is_deployed = queries.is_deployed();
    let owners = queries.owners();

    let (address, nonce, threshold, is_deployed, owners) = tokio::join!(
        address.fetch(),
        nonce.fetch(),
        threshold.fetch(),
        is_deployed.fetch(),
        owners.fetch(),
    );
    merge_account_info(address, nonce, threshold, is_deployed, owners)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SharedError;
    use anyhow::anyhow;
    use std::sync::Arc;

    fn err(msg: &str) -> SharedError {
        Arc::new(anyhow!(msg.to_string()))
    }

    #[test]
    fn all_success_is_success() {
        let merged = merge_meta(&[&QueryMeta::success(10), &QueryMeta::success(20)]);
        assert_eq!(merged.status, QueryStatus::Success);
        assert!(merged.is_success && merged.is_fetched);
        assert_eq!(merged.data_updated_at, 20);
    }

    #[test]
    fn one_pending_makes_the_composite_pending_with_partial_data() {
        // Sub-reads: [success, success, pending, success, success].
        let merged = merge_account_info(
            ReadState::success(Address::from("0x5afe"), 10),
            ReadState::success(4u64, 11),
            ReadState::pending(),
            ReadState::success(true, 12),
            ReadState::success(vec![Address::from("0xa")], 13),
        );

        assert_eq!(merged.meta.status, QueryStatus::Pending);
        assert!(!merged.meta.is_success);
        assert!(merged.meta.is_pending && merged.meta.is_loading);

        let data = merged.data.unwrap();
        assert_eq!(data.address, Some(Address::from("0x5afe")));
        assert_eq!(data.nonce, Some(4));
        assert_eq!(data.threshold, None);
        assert_eq!(data.is_deployed, Some(true));
        assert_eq!(data.owners, Some(vec![Address::from("0xa")]));
    }

    #[test]
    fn error_precedence_and_counter_sums() {
        // Sub-reads: [error, success, success, error, success].
        let merged = merge_account_info(
            ReadState::failure(err("first failure"), 50),
            ReadState::success(4u64, 11),
            ReadState::success(2usize, 12),
            ReadState::failure(err("second failure"), 60),
            ReadState::success(vec![], 13),
        );

        assert_eq!(merged.meta.status, QueryStatus::Error);
        // First non-null error wins, left to right.
        assert_eq!(format!("{}", merged.meta.error.unwrap()), "first failure");
        assert_eq!(
            format!("{}", merged.meta.failure_reason.unwrap()),
            "first failure"
        );
        // Counters sum across sub-reads.
        assert_eq!(merged.meta.error_update_count, 2);
        assert_eq!(merged.meta.failure_count, 2);
        // Timestamps are maxima.
        assert_eq!(merged.meta.error_updated_at, 60);
        assert_eq!(merged.meta.data_updated_at, 13);

        // Exactly the two failed fields are unresolved.
        let data = merged.data.unwrap();
        assert_eq!(data.address, None);
        assert_eq!(data.is_deployed, None);
        assert!(data.nonce.is_some() && data.threshold.is_some() && data.owners.is_some());
    }

    #[test]
    fn pending_beats_later_error_in_first_match_order() {
        let pending = QueryMeta::pending();
        let failed = QueryMeta::failure(err("late"), 5);
        let merged = merge_meta(&[&pending, &failed]);
        // The first pending-or-error encountered fixes the status.
        assert_eq!(merged.status, QueryStatus::Pending);
        // Error metadata still ORs/sums in.
        assert!(merged.is_error);
        assert_eq!(merged.error_update_count, 1);
    }

    #[test]
    fn fetch_status_propagates_first_active_value() {
        let mut paused = QueryMeta::success(1);
        paused.fetch_status = FetchStatus::Paused;
        let mut fetching = QueryMeta::success(2);
        fetching.fetch_status = FetchStatus::Fetching;
        let idle = QueryMeta::success(3);

        assert_eq!(
            merge_meta(&[&idle, &paused, &fetching]).fetch_status,
            FetchStatus::Paused
        );
        assert_eq!(
            merge_meta(&[&idle, &fetching, &paused]).fetch_status,
            FetchStatus::Fetching
        );
        assert_eq!(merge_meta(&[&idle, &idle]).fetch_status, FetchStatus::Idle);
    }

    #[test]
    fn commutative_reductions_are_order_independent() {
        let a = QueryMeta::success(10);
        let b = QueryMeta::failure(err("x"), 30);
        let mut c = QueryMeta::success(20);
        c.is_stale = true;

        let forward = merge_meta(&[&a, &b, &c]);
        let backward = merge_meta(&[&c, &b, &a]);

        assert_eq!(forward.failure_count, backward.failure_count);
        assert_eq!(forward.data_updated_at, backward.data_updated_at);
        assert_eq!(forward.error_updated_at, backward.error_updated_at);
        assert_eq!(forward.is_stale, backward.is_stale);
        assert_eq!(forward.is_success, backward.is_success);
        assert_eq!(forward.is_error, backward.is_error);
    }
}
