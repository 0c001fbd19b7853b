//! Tag index.
//!
//! Tracks every cache entry with its tags and freshness metadata, and the
//! reverse mapping from tag to entry identifiers so a tag invalidation can
//! find every affected entry without a scan.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::RwLock;

use time::OffsetDateTime;
use tracing::debug;

use super::error::CacheError;
use super::freshness::{self, EntryState, FreshnessTier};
use super::keys::{CacheTag, EntryId, RevalidateWindow};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

/// Metadata for one cached entry. The payload itself lives in the content
/// store.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub id: EntryId,
    pub tags: BTreeSet<CacheTag>,
    pub last_updated: OffsetDateTime,
    pub window: RevalidateWindow,
    pub invalidated: bool,
    /// Bumped by every invalidation. Lets a regeneration detect that the
    /// entry was invalidated while it was running.
    pub generation: u64,
}

impl CacheEntry {
    /// Entry regenerated at `last_updated`. Empty tags are dropped.
    pub fn new<I, T>(
        id: impl Into<EntryId>,
        tags: I,
        window: RevalidateWindow,
        last_updated: OffsetDateTime,
    ) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<CacheTag>,
    {
        Self {
            id: id.into(),
            tags: tags
                .into_iter()
                .map(Into::into)
                .filter(|tag: &CacheTag| !tag.is_empty())
                .collect(),
            last_updated,
            window,
            invalidated: false,
            generation: 0,
        }
    }

    pub fn age_seconds(&self, now: OffsetDateTime) -> f64 {
        freshness::age_seconds(self.last_updated, now).max(0.0)
    }

    pub fn tier_at(&self, now: OffsetDateTime) -> FreshnessTier {
        freshness::classify_age(self.age_seconds(now), self.window)
    }

    fn mark_invalidated(&mut self) {
        self.invalidated = true;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Invalidation overrides the time-based tier until the next regeneration.
    pub fn state_at(&self, now: OffsetDateTime) -> EntryState {
        if self.invalidated {
            EntryState::Invalidated
        } else {
            self.tier_at(now).into()
        }
    }
}

/// Tag to entries mapping plus per-entry state.
///
/// Lock order is `entries` then `tag_to_entries`; every method that takes both
/// follows it.
pub struct TagIndex {
    entries: RwLock<HashMap<EntryId, CacheEntry>>,
    tag_to_entries: RwLock<HashMap<CacheTag, HashSet<EntryId>>>,
}

impl TagIndex {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            tag_to_entries: RwLock::new(HashMap::new()),
        }
    }

    /// Register an entry under each of its tags and return what was stored.
    ///
    /// Tags are additive: an entry keeps every tag it was ever registered
    /// under. Re-registering refreshes the window and timestamp and clears any
    /// pending invalidation.
    pub fn register(&self, entry: CacheEntry) -> CacheEntry {
        self.upsert(entry, None)
    }

    /// Like [`TagIndex::register`], but an invalidation that landed after
    /// `observed_generation` was read stays pending, so the next read
    /// regenerates again.
    pub fn register_if_unchanged(
        &self,
        entry: CacheEntry,
        observed_generation: u64,
    ) -> CacheEntry {
        self.upsert(entry, Some(observed_generation))
    }

    fn upsert(&self, mut entry: CacheEntry, observed_generation: Option<u64>) -> CacheEntry {
        let mut entries = rw_write(&self.entries, SOURCE, "register.entries");
        let mut tags = rw_write(&self.tag_to_entries, SOURCE, "register.tags");

        if let Some(previous) = entries.get(&entry.id) {
            entry.tags.extend(previous.tags.iter().cloned());
            entry.generation = previous.generation;
            entry.invalidated =
                observed_generation.is_some_and(|seen| seen != previous.generation);
        }

        for tag in &entry.tags {
            tags.entry(tag.clone()).or_default().insert(entry.id.clone());
        }

        if entry.invalidated {
            debug!(
                target_module = SOURCE,
                entry = %entry.id,
                "entry invalidated during regeneration; invalidation kept pending"
            );
        }
        debug!(
            target_module = SOURCE,
            entry = %entry.id,
            tags = entry.tags.len(),
            window = entry.window.as_secs(),
            "registered cache entry"
        );
        entries.insert(entry.id.clone(), entry.clone());
        entry
    }

    /// Mark every entry under `tag` for regeneration. Unknown tags affect
    /// nothing.
    pub fn invalidate_by_tag(&self, tag: &str) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_by_tag.entries");
        let tags = rw_read(&self.tag_to_entries, SOURCE, "invalidate_by_tag.tags");

        let Some(ids) = tags.get(tag) else {
            return 0;
        };

        let mut affected = 0;
        for id in ids {
            if let Some(entry) = entries.get_mut(id) {
                entry.mark_invalidated();
                affected += 1;
            }
        }
        affected
    }

    /// Mark the single entry identified by `path` for regeneration.
    pub fn invalidate_by_path(&self, path: &str) -> Result<(), CacheError> {
        let mut entries = rw_write(&self.entries, SOURCE, "invalidate_by_path");
        let entry = entries
            .get_mut(path)
            .ok_or_else(|| CacheError::not_found(path))?;
        entry.mark_invalidated();
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<CacheEntry> {
        rw_read(&self.entries, SOURCE, "get").get(id).cloned()
    }

    pub fn state(&self, id: &str, now: OffsetDateTime) -> Option<EntryState> {
        rw_read(&self.entries, SOURCE, "state")
            .get(id)
            .map(|entry| entry.state_at(now))
    }

    /// All entries, ordered by identifier.
    pub fn snapshot(&self) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> = rw_read(&self.entries, SOURCE, "snapshot")
            .values()
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    pub fn entries_for_tag(&self, tag: &str) -> HashSet<EntryId> {
        rw_read(&self.tag_to_entries, SOURCE, "entries_for_tag")
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }

    pub fn tags_for_entry(&self, id: &str) -> BTreeSet<CacheTag> {
        rw_read(&self.entries, SOURCE, "tags_for_entry")
            .get(id)
            .map(|entry| entry.tags.clone())
            .unwrap_or_default()
    }

    pub fn entry_count(&self) -> usize {
        rw_read(&self.entries, SOURCE, "entry_count").len()
    }

    pub fn tag_count(&self) -> usize {
        rw_read(&self.tag_to_entries, SOURCE, "tag_count").len()
    }
}

impl Default for TagIndex {
    fn default() -> Self {
        Self::new()
    }
}
