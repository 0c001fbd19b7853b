//! Lazy, pull-based regeneration.
//!
//! Every read goes through [`RevalidationCache::get_or_regenerate`]: entries
//! that are missing, stale, invalidated, or whose payload was evicted are
//! regenerated synchronously by the caller; fresh and aging entries are served
//! from the content store. No lock is held while regenerating, so concurrent
//! readers of the same stale entry may each regenerate it.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use metrics::{counter, histogram};
use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tracing::debug;

use vitrine_api_types::{CacheEntryStatus, CacheStatusResponse};

use super::config::CacheConfig;
use super::error::FetchError;
use super::freshness::{self, EntryState};
use super::keys::{CacheTag, EntryId, RevalidateWindow};
use super::registry::{CacheEntry, TagIndex};
use super::store::ContentStore;

/// Revalidation window and tags attached to a cached read.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub revalidate: RevalidateWindow,
    pub tags: Vec<CacheTag>,
    /// Skip the cached payload and regenerate unconditionally.
    pub refresh: bool,
}

impl FetchOptions {
    pub fn new(revalidate: RevalidateWindow) -> Self {
        Self {
            revalidate,
            tags: Vec::new(),
            refresh: false,
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CacheTag>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn refreshing(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }
}

/// Why a read had to regenerate its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Regeneration {
    Missing,
    Stale,
    Invalidated,
    Evicted,
    Refresh,
}

impl Regeneration {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Stale => "stale",
            Self::Invalidated => "invalidated",
            Self::Evicted => "evicted",
            Self::Refresh => "refresh",
        }
    }

    /// On-demand invalidations cascade to the data the entry was built from.
    pub fn cascades(self) -> bool {
        matches!(self, Self::Invalidated | Self::Refresh)
    }
}

/// Payload returned by a cached read, with the entry metadata it was served
/// under.
#[derive(Debug, Clone)]
pub struct CachedContent {
    pub body: Bytes,
    pub entry: CacheEntry,
    pub from_cache: bool,
}

impl CachedContent {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_slice(&self.body).map_err(|source| FetchError::Decode {
            key: self.entry.id.to_string(),
            source,
        })
    }
}

pub struct RevalidationCache {
    index: Arc<TagIndex>,
    store: ContentStore,
}

impl RevalidationCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            index: Arc::new(TagIndex::new()),
            store: ContentStore::new(config),
        }
    }

    /// Shared handle to the tag index, for the revalidation gateway.
    pub fn index(&self) -> Arc<TagIndex> {
        Arc::clone(&self.index)
    }

    pub async fn get_or_regenerate<F, Fut, E>(
        &self,
        key: &EntryId,
        options: &FetchOptions,
        regenerate: F,
    ) -> Result<CachedContent, E>
    where
        F: FnOnce(Regeneration) -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
    {
        self.get_or_regenerate_at(key, options, OffsetDateTime::now_utc(), regenerate)
            .await
    }

    /// Serve `key` as of `now`, regenerating it when needed.
    ///
    /// Freshness is judged against the caller's window. A regenerated entry is
    /// registered under the union of its previous tags and the caller's tags,
    /// so resources shared by several pages stay reachable from every tag.
    /// An invalidation that lands while regenerating stays pending. A failed
    /// regeneration leaves the previous entry untouched.
    pub async fn get_or_regenerate_at<F, Fut, E>(
        &self,
        key: &EntryId,
        options: &FetchOptions,
        now: OffsetDateTime,
        regenerate: F,
    ) -> Result<CachedContent, E>
    where
        F: FnOnce(Regeneration) -> Fut,
        Fut: Future<Output = Result<Bytes, E>>,
    {
        let previous = self.index.get(key.as_str());
        let observed_generation = previous.as_ref().map_or(0, |entry| entry.generation);

        let reason = match &previous {
            _ if options.refresh => Regeneration::Refresh,
            None => Regeneration::Missing,
            Some(entry) if entry.invalidated => Regeneration::Invalidated,
            Some(entry) => {
                let tier = freshness::classify_age(entry.age_seconds(now), options.revalidate);
                if EntryState::from(tier).needs_regeneration() {
                    Regeneration::Stale
                } else if let Some(body) = self.store.get(key) {
                    counter!("vitrine_cache_hit_total").increment(1);
                    return Ok(CachedContent {
                        body,
                        entry: entry.clone(),
                        from_cache: true,
                    });
                } else {
                    Regeneration::Evicted
                }
            }
        };

        counter!("vitrine_cache_miss_total", "reason" => reason.as_str()).increment(1);
        debug!(entry = %key, reason = reason.as_str(), "regenerating cache entry");

        let started = Instant::now();
        let body = regenerate(reason).await?;
        histogram!("vitrine_cache_regenerate_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        counter!("vitrine_cache_regenerate_total").increment(1);

        let entry = CacheEntry::new(
            key.clone(),
            options.tags.iter().cloned(),
            options.revalidate,
            now,
        );
        self.store.put(key.clone(), body.clone());
        let entry = self.index.register_if_unchanged(entry, observed_generation);

        Ok(CachedContent {
            body,
            entry,
            from_cache: false,
        })
    }

    /// Every tracked entry with its state as of `now`.
    pub fn status_at(&self, now: OffsetDateTime) -> CacheStatusResponse {
        let entries = self
            .index
            .snapshot()
            .into_iter()
            .map(|entry| CacheEntryStatus {
                stored: self.store.contains(&entry.id),
                id: entry.id.to_string(),
                tags: entry.tags.iter().map(|tag| tag.to_string()).collect(),
                revalidate: entry.window.as_secs(),
                last_updated: entry.last_updated,
                age_seconds: entry.age_seconds(now),
                state: entry.state_at(now).into(),
            })
            .collect();

        CacheStatusResponse {
            generated_at: now,
            entries,
        }
    }
}

/// Retrieves the raw bytes behind a resource key.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn retrieve(&self, key: &EntryId) -> Result<Bytes, FetchError>;
}

/// Outbound content requests annotated with a revalidation window and tags.
#[derive(Clone)]
pub struct CachedFetcher {
    cache: Arc<RevalidationCache>,
    source: Arc<dyn ContentSource>,
}

impl CachedFetcher {
    pub fn new(cache: Arc<RevalidationCache>, source: Arc<dyn ContentSource>) -> Self {
        Self { cache, source }
    }

    pub fn cache(&self) -> &Arc<RevalidationCache> {
        &self.cache
    }

    pub async fn fetch(
        &self,
        key: &str,
        options: &FetchOptions,
    ) -> Result<CachedContent, FetchError> {
        self.fetch_at(key, options, OffsetDateTime::now_utc()).await
    }

    pub async fn fetch_at(
        &self,
        key: &str,
        options: &FetchOptions,
        now: OffsetDateTime,
    ) -> Result<CachedContent, FetchError> {
        let id = EntryId::from(key);
        let source = Arc::clone(&self.source);
        let target = id.clone();
        self.cache
            .get_or_regenerate_at(&id, options, now, |_| async move {
                source.retrieve(&target).await
            })
            .await
    }
}

/// Lowest window wins: a page is only as fresh as its most volatile input.
pub fn effective_window<I>(windows: I) -> Option<RevalidateWindow>
where
    I: IntoIterator<Item = RevalidateWindow>,
{
    windows.into_iter().min()
}
