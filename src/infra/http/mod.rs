//! HTTP surface: rendered pages, cache introspection and the on-demand
//! revalidation endpoints.

mod middleware;
mod public;
mod revalidate;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::application::{
    content::ShowcaseContent, pages::PageComposer, revalidation::RevalidationGateway,
};
use crate::cache::{CachedFetcher, ContentSource, RevalidateWindow, RevalidationCache};

pub use middleware::{REQUEST_ID_HEADER, RequestContext};

#[derive(Clone)]
pub struct HttpState {
    pub gateway: Arc<RevalidationGateway>,
    pub pages: Arc<PageComposer>,
    pub cache: Arc<RevalidationCache>,
    pub revalidation_secret: Option<Arc<str>>,
    pub started_at: Instant,
}

impl HttpState {
    /// Wire the page composer and the gateway around one shared cache.
    pub fn new(
        cache: Arc<RevalidationCache>,
        source: Arc<dyn ContentSource>,
        default_window: RevalidateWindow,
        revalidation_secret: Option<Arc<str>>,
    ) -> Self {
        let fetcher = CachedFetcher::new(cache.clone(), source);
        let pages = PageComposer::new(ShowcaseContent::new(fetcher), cache.clone(), default_window);
        let gateway = RevalidationGateway::new(cache.index());

        Self {
            gateway: Arc::new(gateway),
            pages: Arc::new(pages),
            cache,
            revalidation_secret,
            started_at: Instant::now(),
        }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(public::home))
        .route("/apps", get(public::apps))
        .route("/apps/{slug}", get(public::app_detail))
        .route("/featured", get(public::featured))
        .route("/stats", get(public::stats))
        .route("/_cache", get(public::cache_status))
        .route("/_health", get(public::health))
        .route("/invalidate-by-path", post(revalidate::invalidate_by_path))
        .route("/invalidate-by-tag", post(revalidate::invalidate_by_tag))
        .fallback(public::fallback)
        .with_state(state)
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
}
