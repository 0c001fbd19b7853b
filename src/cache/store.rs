//! Bounded payload store.
//!
//! Holds the serialized body of every cached entry, keyed by entry id. Entry
//! metadata lives in the tag index; a payload evicted here is regenerated on
//! next access even if its metadata is still fresh.

use std::sync::RwLock;

use bytes::Bytes;
use lru::LruCache;
use metrics::counter;

use super::config::CacheConfig;
use super::keys::EntryId;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub struct ContentStore {
    payloads: RwLock<LruCache<EntryId, Bytes>>,
}

impl ContentStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            payloads: RwLock::new(LruCache::new(config.content_limit_non_zero())),
        }
    }

    /// Payload for `id`, promoting it in the LRU order.
    pub fn get(&self, id: &EntryId) -> Option<Bytes> {
        rw_write(&self.payloads, SOURCE, "get").get(id).cloned()
    }

    /// Whether a payload is held for `id`, without touching LRU order.
    pub fn contains(&self, id: &EntryId) -> bool {
        rw_read(&self.payloads, SOURCE, "contains").contains(id)
    }

    /// Store a payload. Returns the id of the entry evicted to make room, if
    /// any.
    pub fn put(&self, id: EntryId, body: Bytes) -> Option<EntryId> {
        let displaced = rw_write(&self.payloads, SOURCE, "put").push(id.clone(), body);
        match displaced {
            Some((evicted, _)) if evicted != id => {
                counter!("vitrine_cache_evict_total").increment(1);
                Some(evicted)
            }
            _ => None,
        }
    }

    pub fn remove(&self, id: &EntryId) -> Option<Bytes> {
        rw_write(&self.payloads, SOURCE, "remove").pop(id)
    }

    pub fn len(&self) -> usize {
        rw_read(&self.payloads, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
