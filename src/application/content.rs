//! Typed reads against the upstream content API, each routed through the
//! revalidating fetch wrapper.

use serde::Deserialize;

use vitrine_api_types::{App, Stats};

use crate::cache::{CachedFetcher, FetchError, FetchOptions};

const APPS_KEY: &str = "/api/apps";
const FEATURED_KEY: &str = "/api/apps?featured=true";
const STATS_KEY: &str = "/api/stats";

#[derive(Debug, Deserialize)]
struct AppsEnvelope {
    #[serde(default)]
    apps: Vec<App>,
}

#[derive(Debug, Deserialize)]
struct AppEnvelope {
    #[serde(default)]
    app: Option<App>,
}

#[derive(Debug, Deserialize)]
struct StatsEnvelope {
    stats: Stats,
}

#[derive(Clone)]
pub struct ShowcaseContent {
    fetcher: CachedFetcher,
}

impl ShowcaseContent {
    pub fn new(fetcher: CachedFetcher) -> Self {
        Self { fetcher }
    }

    pub async fn all_apps(&self, options: &FetchOptions) -> Result<Vec<App>, FetchError> {
        let envelope: AppsEnvelope = self.fetcher.fetch(APPS_KEY, options).await?.json()?;
        Ok(envelope.apps)
    }

    /// `None` when the slug is malformed or the API has no such app.
    pub async fn app_by_slug(
        &self,
        slug: &str,
        options: &FetchOptions,
    ) -> Result<Option<App>, FetchError> {
        if !is_valid_slug(slug) {
            return Ok(None);
        }

        let key = format!("{APPS_KEY}/{slug}");
        match self.fetcher.fetch(&key, options).await {
            Ok(content) => {
                let envelope: AppEnvelope = content.json()?;
                Ok(envelope.app)
            }
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn featured_apps(&self, options: &FetchOptions) -> Result<Vec<App>, FetchError> {
        let envelope: AppsEnvelope = self.fetcher.fetch(FEATURED_KEY, options).await?.json()?;
        Ok(envelope.apps)
    }

    pub async fn stats(&self, options: &FetchOptions) -> Result<Stats, FetchError> {
        let envelope: StatsEnvelope = self.fetcher.fetch(STATS_KEY, options).await?.json()?;
        Ok(envelope.stats)
    }
}

/// Slugs become part of the upstream URL path and of a cache tag.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}
