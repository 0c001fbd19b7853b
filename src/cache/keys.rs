//! Cache key definitions.
//!
//! `EntryId` names a cache entry (a page path or an upstream resource key),
//! `CacheTag` labels entries for batch invalidation, and `RevalidateWindow`
//! carries the non-zero revalidation interval.

use std::borrow::Borrow;
use std::fmt;
use std::num::NonZeroU64;

use serde::Serialize;

use super::error::CacheError;

/// Identifies a cache entry: a page path (`/apps`) or a resource key
/// (`/api/apps?featured=true`). Compared by exact string match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for EntryId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque, case-sensitive label attached to cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CacheTag(String);

impl CacheTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for CacheTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CacheTag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Borrow<str> for CacheTag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Revalidation interval in whole seconds. Always greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RevalidateWindow(NonZeroU64);

impl RevalidateWindow {
    /// Build a window from seconds, rejecting zero.
    pub fn from_secs(secs: u64) -> Result<Self, CacheError> {
        NonZeroU64::new(secs).map(Self).ok_or_else(|| {
            CacheError::invalid_configuration("revalidation window must be greater than zero")
        })
    }

    /// Compile-time constructor for fixed page windows.
    pub const fn from_secs_const(secs: u64) -> Self {
        match NonZeroU64::new(secs) {
            Some(value) => Self(value),
            None => panic!("revalidation window must be greater than zero"),
        }
    }

    pub const fn from_non_zero(secs: NonZeroU64) -> Self {
        Self(secs)
    }

    pub const fn as_secs(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for RevalidateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}
