//! Client-side state synchronization for Safe-style multi-party wallets.
//!
//! Keeps derived, asynchronously fetched account facts consistent with the
//! remote coordination service, and coordinates writes so reads observe them
//! exactly once:
//!
//! - **Key derivation**: stable composite cache keys from the connection
//!   configuration ([`keys`])
//! - **Composite reads**: fan a logical read out into parallel sub-reads and
//!   recombine their states under fixed merge rules ([`composite`])
//! - **Invalidation topology**: decide, from a write result's shape, which
//!   cached facts go stale ([`invalidate`])
//! - **Indexing polling**: wait until a submitted write is observably
//!   visible ([`poller`])
//!
//! Storage, staleness timers, and transport belong to external
//! collaborators; see [`cache`] for the seam and [`engine::SafeSync`] for
//! the unified entry point.

#![allow(clippy::type_complexity)]

pub mod cache;
pub mod composite;
pub mod engine;
pub mod invalidate;
pub mod keys;
pub mod mutation;
pub mod poller;
pub mod query;
pub mod resolver;
pub mod state;

// Re-export main types
pub use cache::CacheContext;
pub use composite::{fetch_account_info, merge_account_info, merge_meta, AccountInfo};
pub use engine::SafeSync;
pub use invalidate::{expand, invalidate_facts, route_after_write};
pub use keys::{CacheKey, FactKind, MutationKey, WriteKind};
pub use mutation::{Mutation, MutationState, MutationStatus, SafeWrites};
pub use poller::{
    poll, wait_for_application_visibility, wait_for_settlement, VisibilityTarget,
    DEFAULT_POLL_INTERVAL,
};
pub use query::{FactQuery, SafeQueries};
pub use resolver::{ConfigSetter, ConnectionResolver, HandleCache};
pub use state::{FetchStatus, QueryMeta, QueryStatus, ReadState, SharedError};
