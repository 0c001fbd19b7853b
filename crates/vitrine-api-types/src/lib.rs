//! Wire types shared by the Vitrine server and `vitrine_cli`.
//!
//! Content shapes (`App`, `Stats`) mirror the upstream content API and keep its
//! camelCase field names. Everything Vitrine emits itself uses snake_case.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A showcased application as served by the upstream content API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub slug: String,
    pub name: String,
    /// Markdown body.
    pub description: String,
    pub logo: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub chains: Vec<String>,
    pub website: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default)]
    pub is_featured: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Directory-wide aggregate counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_apps: u64,
    pub total_chains: u64,
    pub total_categories: u64,
    pub last_updated: String,
}

/// Body accepted by `POST /invalidate-by-path`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidatePathRequest {
    pub path: String,
    pub secret: String,
}

/// Body accepted by `POST /invalidate-by-tag`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidateTagRequest {
    pub tag: String,
    pub secret: String,
}

/// Successful invalidation response. Exactly one of `path` or `tag` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevalidationResponse {
    pub revalidated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub message: String,
    /// Number of cache entries marked for regeneration.
    pub affected: usize,
}

/// Error payload returned by every JSON endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Freshness of a cache entry as reported over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheState {
    Fresh,
    Aging,
    Stale,
    Invalidated,
}

/// One row of `GET /_cache`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntryStatus {
    pub id: String,
    pub tags: Vec<String>,
    pub revalidate: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    pub age_seconds: f64,
    pub state: CacheState,
    /// False when the payload was evicted from the bounded store.
    pub stored: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatusResponse {
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub entries: Vec<CacheEntryStatus>,
}

/// Cache metadata attached to every composed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageCacheInfo {
    pub path: String,
    /// Effective window: the lowest window across the page's fetches.
    pub revalidate: u64,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
    pub state: CacheState,
    pub from_cache: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: T,
    pub cache: PageCacheInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomePage {
    pub featured: Vec<App>,
    pub recent: Vec<App>,
    pub stats: Stats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppsPage {
    pub apps: Vec<App>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppDetailPage {
    pub app: App,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturedPage {
    pub apps: Vec<App>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsPage {
    pub stats: Stats,
    pub categories: Vec<CategoryCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub cached_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_uses_upstream_camel_case() {
        let json = r#"{
            "slug": "uniswap",
            "name": "Uniswap",
            "description": "Swap tokens",
            "logo": "https://example.com/uni.png",
            "tags": ["DeFi", "DEX"],
            "chains": ["ethereum"],
            "website": "https://uniswap.org",
            "isFeatured": true,
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-02-01T00:00:00Z"
        }"#;

        let app: App = serde_json::from_str(json).expect("app should parse");
        assert!(app.is_featured);
        assert_eq!(app.tags, vec!["DeFi", "DEX"]);
        assert!(app.twitter.is_none());

        let out = serde_json::to_value(&app).expect("app should serialize");
        assert_eq!(out["isFeatured"], true);
        assert!(out.get("twitter").is_none());
    }

    #[test]
    fn revalidation_response_omits_unused_target() {
        let response = RevalidationResponse {
            revalidated: true,
            path: None,
            tag: Some("featured".to_string()),
            timestamp: time::macros::datetime!(2024-05-01 12:00 UTC),
            message: "Successfully revalidated tag: featured".to_string(),
            affected: 2,
        };

        let out = serde_json::to_value(&response).expect("response should serialize");
        assert_eq!(out["tag"], "featured");
        assert!(out.get("path").is_none());
        assert_eq!(out["timestamp"], "2024-05-01T12:00:00Z");
    }

    #[test]
    fn cache_state_is_snake_case() {
        let value = serde_json::to_value(CacheState::Invalidated).expect("serialize");
        assert_eq!(value, "invalidated");
    }
}
