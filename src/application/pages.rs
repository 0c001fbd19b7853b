//! Page composition.
//!
//! Each page is cached under its own path, tagged with every tag of the
//! fetches it is built from, and revalidated on the lowest of their windows.
//! An on-demand invalidation of a page also refreshes the data behind it.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use time::OffsetDateTime;

use vitrine_api_types::{
    App, AppDetailPage, AppsPage, CategoryCount, FeaturedPage, HomePage, Page, PageCacheInfo,
    StatsPage,
};

use crate::cache::{
    CachedContent, EntryId, FetchError, FetchOptions, RevalidateWindow, RevalidationCache,
    effective_window,
};

use super::content::{ShowcaseContent, is_valid_slug};

const FEATURED_WINDOW: RevalidateWindow = RevalidateWindow::from_secs_const(60);
const RECENT_WINDOW: RevalidateWindow = RevalidateWindow::from_secs_const(30);
const LISTING_WINDOW: RevalidateWindow = RevalidateWindow::from_secs_const(60);
const DETAIL_WINDOW: RevalidateWindow = RevalidateWindow::from_secs_const(60);
const STATS_WINDOW: RevalidateWindow = RevalidateWindow::from_secs_const(3600);

const HOME_FEATURED_LIMIT: usize = 3;
const HOME_RECENT_LIMIT: usize = 6;

/// Categories counted on the stats page, in display order for ties.
pub const CATEGORIES: [&str; 12] = [
    "DeFi",
    "NFT",
    "Gaming",
    "DEX",
    "Lending",
    "Bridge",
    "Wallet",
    "Analytics",
    "Infrastructure",
    "DAO",
    "Social",
    "Marketplace",
];

#[derive(Clone)]
pub struct PageComposer {
    content: ShowcaseContent,
    cache: Arc<RevalidationCache>,
    default_window: RevalidateWindow,
}

impl PageComposer {
    pub fn new(
        content: ShowcaseContent,
        cache: Arc<RevalidationCache>,
        default_window: RevalidateWindow,
    ) -> Self {
        Self {
            content,
            cache,
            default_window,
        }
    }

    /// `/`: featured (60s), recent (30s) and stats (3600s); revalidates every 30s.
    pub async fn home(&self) -> Result<Page<HomePage>, FetchError> {
        let fetches = vec![
            FetchOptions::new(FEATURED_WINDOW).with_tags(["featured"]),
            FetchOptions::new(RECENT_WINDOW).with_tags(["recent", "all-apps"]),
            FetchOptions::new(STATS_WINDOW).with_tags(["stats"]),
        ];
        let content = &self.content;

        self.cached_page("/", fetches, |fetches| async move {
            let (featured, recent, stats) = tokio::try_join!(
                content.featured_apps(&fetches[0]),
                content.all_apps(&fetches[1]),
                content.stats(&fetches[2]),
            )?;

            Ok(HomePage {
                featured: featured.into_iter().take(HOME_FEATURED_LIMIT).collect(),
                recent: recent.into_iter().take(HOME_RECENT_LIMIT).collect(),
                stats,
            })
        })
        .await
    }

    pub async fn apps(&self) -> Result<Page<AppsPage>, FetchError> {
        let fetches = vec![FetchOptions::new(LISTING_WINDOW).with_tags(["apps-list", "all-apps"])];
        let content = &self.content;

        self.cached_page("/apps", fetches, |fetches| async move {
            let apps = content.all_apps(&fetches[0]).await?;
            Ok(AppsPage {
                total: apps.len(),
                apps,
            })
        })
        .await
    }

    /// `None` when the content API has no app under `slug`. Missing apps are
    /// not cached, so a newly published app shows up on the next request.
    pub async fn app_detail(&self, slug: &str) -> Result<Option<Page<AppDetailPage>>, FetchError> {
        if !is_valid_slug(slug) {
            return Ok(None);
        }

        let path = format!("/apps/{slug}");
        let fetches = vec![FetchOptions::new(DETAIL_WINDOW).with_tags(["app-detail", slug])];
        let content = &self.content;

        let page = self
            .cached_page(&path, fetches, |fetches| async move {
                match content.app_by_slug(slug, &fetches[0]).await? {
                    Some(app) => Ok(AppDetailPage { app }),
                    None => Err(FetchError::NotFound(slug.to_string())),
                }
            })
            .await;

        match page {
            Ok(page) => Ok(Some(page)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn featured(&self) -> Result<Page<FeaturedPage>, FetchError> {
        let fetches = vec![FetchOptions::new(FEATURED_WINDOW).with_tags(["featured-apps"])];
        let content = &self.content;

        self.cached_page("/featured", fetches, |fetches| async move {
            let apps = content.featured_apps(&fetches[0]).await?;
            Ok(FeaturedPage { apps })
        })
        .await
    }

    pub async fn stats(&self) -> Result<Page<StatsPage>, FetchError> {
        let fetches = vec![
            FetchOptions::new(STATS_WINDOW).with_tags(["stats"]),
            FetchOptions::new(STATS_WINDOW).with_tags(["stats-apps"]),
        ];
        let content = &self.content;

        self.cached_page("/stats", fetches, |fetches| async move {
            let (stats, apps) = tokio::try_join!(
                content.stats(&fetches[0]),
                content.all_apps(&fetches[1]),
            )?;
            Ok(StatsPage {
                stats,
                categories: category_distribution(&apps),
            })
        })
        .await
    }

    async fn cached_page<T, F, Fut>(
        &self,
        path: &str,
        fetches: Vec<FetchOptions>,
        build: F,
    ) -> Result<Page<T>, FetchError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Vec<FetchOptions>) -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let window = effective_window(fetches.iter().map(|fetch| fetch.revalidate))
            .unwrap_or(self.default_window);
        let options = FetchOptions::new(window)
            .with_tags(fetches.iter().flat_map(|fetch| fetch.tags.iter().cloned()));
        let id = EntryId::from(path);

        let content = self
            .cache
            .get_or_regenerate(&id, &options, |reason| async move {
                let cascade = reason.cascades();
                let fetches = fetches
                    .into_iter()
                    .map(|fetch| fetch.refreshing(cascade))
                    .collect();
                let data = build(fetches).await?;
                serde_json::to_vec(&data)
                    .map(Bytes::from)
                    .map_err(|source| FetchError::Encode {
                        key: path.to_string(),
                        source,
                    })
            })
            .await?;

        Ok(Page {
            data: content.json()?,
            cache: cache_info(&content, OffsetDateTime::now_utc()),
        })
    }
}

fn cache_info(content: &CachedContent, now: OffsetDateTime) -> PageCacheInfo {
    PageCacheInfo {
        path: content.entry.id.to_string(),
        revalidate: content.entry.window.as_secs(),
        tags: content.entry.tags.iter().map(|tag| tag.to_string()).collect(),
        last_updated: content.entry.last_updated,
        state: content.entry.state_at(now).into(),
        from_cache: content.from_cache,
    }
}

/// Apps per category, most populated first; empty categories are left out.
pub fn category_distribution(apps: &[App]) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = CATEGORIES
        .iter()
        .map(|category| CategoryCount {
            category: (*category).to_string(),
            count: apps
                .iter()
                .filter(|app| app.tags.iter().any(|tag| tag == category))
                .count(),
        })
        .filter(|entry| entry.count > 0)
        .collect();
    // stable sort keeps CATEGORIES order among equal counts
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}
