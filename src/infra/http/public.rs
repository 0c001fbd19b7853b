use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use time::OffsetDateTime;

use vitrine_api_types::{CacheStatusResponse, HealthResponse, Page};

use crate::application::error::HttpError;

use super::HttpState;

const SOURCE: &str = "infra::http::public";

pub(super) async fn home(State(state): State<HttpState>) -> Result<Response, HttpError> {
    let page = state.pages.home().await?;
    Ok(page_response(page))
}

pub(super) async fn apps(State(state): State<HttpState>) -> Result<Response, HttpError> {
    let page = state.pages.apps().await?;
    Ok(page_response(page))
}

pub(super) async fn app_detail(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
) -> Result<Response, HttpError> {
    match state.pages.app_detail(&slug).await? {
        Some(page) => Ok(page_response(page)),
        None => Err(HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "not_found",
            "App not found",
            format!("no app with slug `{slug}`"),
        )),
    }
}

pub(super) async fn featured(State(state): State<HttpState>) -> Result<Response, HttpError> {
    let page = state.pages.featured().await?;
    Ok(page_response(page))
}

pub(super) async fn stats(State(state): State<HttpState>) -> Result<Response, HttpError> {
    let page = state.pages.stats().await?;
    Ok(page_response(page))
}

pub(super) async fn cache_status(State(state): State<HttpState>) -> Json<CacheStatusResponse> {
    Json(state.cache.status_at(OffsetDateTime::now_utc()))
}

pub(super) async fn health(State(state): State<HttpState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        cached_entries: state.cache.index().entry_count(),
    })
}

pub(super) async fn fallback() -> HttpError {
    HttpError::new(
        SOURCE,
        StatusCode::NOT_FOUND,
        "not_found",
        "Not found",
        "no route matched",
    )
}

/// Serialise a page and advertise its effective window to shared caches.
fn page_response<T: Serialize>(page: Page<T>) -> Response {
    let cache_control = format!(
        "public, s-maxage={}, stale-while-revalidate",
        page.cache.revalidate
    );
    let mut response = Json(page).into_response();
    if let Ok(value) = HeaderValue::from_str(&cache_control) {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    response
}
