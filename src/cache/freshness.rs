//! Freshness classification.
//!
//! An entry younger than half its revalidation window is `Fresh`, younger than
//! the full window is `Aging`, and anything older is `Stale`. The half-window
//! boundary itself belongs to `Aging`.

use serde::Serialize;
use time::OffsetDateTime;

use super::error::CacheError;
use super::keys::RevalidateWindow;

const AGING_FRACTION: f64 = 0.5;

/// Time-based freshness tier of a cached item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessTier {
    Fresh,
    Aging,
    Stale,
}

/// Per-entry state: a freshness tier, or `Invalidated` after an on-demand
/// invalidation until the entry is regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryState {
    Fresh,
    Aging,
    Stale,
    Invalidated,
}

impl EntryState {
    /// Stale and invalidated entries are regenerated on next access.
    pub fn needs_regeneration(self) -> bool {
        matches!(self, Self::Stale | Self::Invalidated)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Aging => "aging",
            Self::Stale => "stale",
            Self::Invalidated => "invalidated",
        }
    }
}

impl From<FreshnessTier> for EntryState {
    fn from(tier: FreshnessTier) -> Self {
        match tier {
            FreshnessTier::Fresh => Self::Fresh,
            FreshnessTier::Aging => Self::Aging,
            FreshnessTier::Stale => Self::Stale,
        }
    }
}

impl From<EntryState> for vitrine_api_types::CacheState {
    fn from(state: EntryState) -> Self {
        match state {
            EntryState::Fresh => Self::Fresh,
            EntryState::Aging => Self::Aging,
            EntryState::Stale => Self::Stale,
            EntryState::Invalidated => Self::Invalidated,
        }
    }
}

/// Classify an age against a revalidation window, both in seconds.
///
/// Rejects windows that are zero, negative, or not finite. Negative ages
/// (clock skew between writer and reader) count as zero.
pub fn classify(age_secs: f64, window_secs: f64) -> Result<FreshnessTier, CacheError> {
    if !window_secs.is_finite() || window_secs <= 0.0 {
        return Err(CacheError::invalid_configuration(format!(
            "revalidation window must be a positive number of seconds, got {window_secs}"
        )));
    }
    if age_secs.is_nan() {
        return Err(CacheError::invalid_configuration("age must be a number"));
    }

    Ok(tier_for(age_secs.max(0.0), window_secs))
}

/// Classify an age against an already validated window.
pub fn classify_age(age_secs: f64, window: RevalidateWindow) -> FreshnessTier {
    let age = if age_secs.is_nan() {
        0.0
    } else {
        age_secs.max(0.0)
    };
    tier_for(age, window.as_secs() as f64)
}

/// Seconds elapsed between `last_updated` and `now`.
pub fn age_seconds(last_updated: OffsetDateTime, now: OffsetDateTime) -> f64 {
    (now - last_updated).as_seconds_f64()
}

fn tier_for(age: f64, window: f64) -> FreshnessTier {
    if age < window * AGING_FRACTION {
        FreshnessTier::Fresh
    } else if age < window {
        FreshnessTier::Aging
    } else {
        FreshnessTier::Stale
    }
}
