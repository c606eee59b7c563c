//! Read-state model.
//!
//! [`QueryMeta`] mirrors the metadata a revalidating cache attaches to a
//! subscribed read: status flags, timestamps, and failure counters. The
//! composite merger reduces these field by field, so the flags are stored
//! explicitly rather than derived on demand.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Shared, cloneable error as stored in read and mutation state.
pub type SharedError = Arc<anyhow::Error>;

/// Overall status of a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Pending,
    Error,
    Success,
}

/// Whether a fetch is currently in flight for a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Fetching,
    Paused,
    Idle,
}

/// Metadata of a single read.
#[derive(Debug, Clone)]
pub struct QueryMeta {
    pub status: QueryStatus,
    pub fetch_status: FetchStatus,
    pub error: Option<SharedError>,
    pub failure_reason: Option<SharedError>,
    pub is_error: bool,
    pub is_pending: bool,
    pub is_loading: bool,
    pub is_loading_error: bool,
    pub is_refetch_error: bool,
    pub is_fetching: bool,
    pub is_paused: bool,
    pub is_refetching: bool,
    pub is_stale: bool,
    pub is_initial_loading: bool,
    pub is_placeholder_data: bool,
    pub is_success: bool,
    pub is_fetched: bool,
    pub is_fetched_after_mount: bool,
    /// Unix millis of the last successful data update; 0 if never.
    pub data_updated_at: i64,
    /// Unix millis of the last error; 0 if never.
    pub error_updated_at: i64,
    pub failure_count: u32,
    pub error_update_count: u32,
}

impl QueryMeta {
    /// A read that has not resolved yet.
    pub fn pending() -> Self {
        Self {
            status: QueryStatus::Pending,
            fetch_status: FetchStatus::Fetching,
            error: None,
            failure_reason: None,
            is_error: false,
            is_pending: true,
            is_loading: true,
            is_loading_error: false,
            is_refetch_error: false,
            is_fetching: true,
            is_paused: false,
            is_refetching: false,
            is_stale: false,
            is_initial_loading: true,
            is_placeholder_data: false,
            is_success: false,
            is_fetched: false,
            is_fetched_after_mount: false,
            data_updated_at: 0,
            error_updated_at: 0,
            failure_count: 0,
            error_update_count: 0,
        }
    }

    /// A read that resolved successfully at `at` (unix millis).
    pub fn success(at: i64) -> Self {
        Self {
            status: QueryStatus::Success,
            fetch_status: FetchStatus::Idle,
            is_pending: false,
            is_loading: false,
            is_fetching: false,
            is_initial_loading: false,
            is_success: true,
            is_fetched: true,
            is_fetched_after_mount: true,
            data_updated_at: at,
            ..Self::pending()
        }
    }

    /// A read whose initial fetch failed at `at` (unix millis).
    pub fn failure(error: SharedError, at: i64) -> Self {
        Self {
            status: QueryStatus::Error,
            fetch_status: FetchStatus::Idle,
            error: Some(Arc::clone(&error)),
            failure_reason: Some(error),
            is_error: true,
            is_pending: false,
            is_loading: false,
            is_loading_error: true,
            is_fetching: false,
            is_initial_loading: false,
            is_fetched: true,
            is_fetched_after_mount: true,
            error_updated_at: at,
            failure_count: 1,
            error_update_count: 1,
            ..Self::pending()
        }
    }
}

/// A read's data and metadata, as exposed to consumers.
#[derive(Debug, Clone)]
pub struct ReadState<T> {
    pub data: Option<T>,
    pub meta: QueryMeta,
}

impl<T> ReadState<T> {
    pub fn pending() -> Self {
        Self {
            data: None,
            meta: QueryMeta::pending(),
        }
    }

    pub fn success(data: T, at: i64) -> Self {
        Self {
            data: Some(data),
            meta: QueryMeta::success(at),
        }
    }

    pub fn failure(error: SharedError, at: i64) -> Self {
        Self {
            data: None,
            meta: QueryMeta::failure(error, at),
        }
    }

    pub fn is_success(&self) -> bool {
        self.meta.is_success
    }

    pub fn is_error(&self) -> bool {
        self.meta.is_error
    }
}

/// Current unix-epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
