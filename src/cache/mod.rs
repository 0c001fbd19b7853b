//! Vitrine cache system.
//!
//! Time-based freshness with on-demand invalidation:
//!
//! - **Freshness**: entries are `Fresh` for the first half of their
//!   revalidation window, `Aging` for the second half, then `Stale`.
//! - **Tag index**: entries carry tags; invalidating a tag or a path marks
//!   entries for regeneration on next access.
//! - **Fetch wrapper**: reads regenerate missing, stale or invalidated entries
//!   synchronously and serve everything else from a bounded LRU store.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! content_limit = 256
//! default_revalidate_seconds = 60
//! ```

mod config;
mod error;
mod fetch;
mod freshness;
mod keys;
mod lock;
mod registry;
mod store;

pub use config::CacheConfig;
pub use error::{CacheError, FetchError};
pub use fetch::{
    CachedContent, CachedFetcher, ContentSource, FetchOptions, Regeneration, RevalidationCache,
    effective_window,
};
pub use freshness::{EntryState, FreshnessTier, age_seconds, classify, classify_age};
pub use keys::{CacheTag, EntryId, RevalidateWindow};
pub use registry::{CacheEntry, TagIndex};
pub use store::ContentStore;
