//! Upstream content API client.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use crate::cache::{ContentSource, EntryId, FetchError};
use crate::config::ContentApiSettings;

const SOURCE: &str = "infra::content_api";

/// Resolves resource keys such as `/api/apps?featured=true` against the
/// configured base URL.
#[derive(Clone, Debug)]
pub struct HttpContentSource {
    client: Client,
    base: Url,
}

impl HttpContentSource {
    pub fn new(settings: &ContentApiSettings) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()?;
        Ok(Self {
            client,
            base: settings.base_url.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("vitrine/", env!("CARGO_PKG_VERSION"))
    }

    /// Keys are appended to the base path, so a base of `http://host/v1/`
    /// maps `/api/apps` to `http://host/v1/api/apps`.
    pub fn url(&self, key: &str) -> Result<Url, FetchError> {
        let base = self.base.as_str().trim_end_matches('/');
        let key = key.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{key}"))?)
    }
}

#[async_trait]
impl ContentSource for HttpContentSource {
    async fn retrieve(&self, key: &EntryId) -> Result<Bytes, FetchError> {
        let url = self.url(key.as_str())?;
        debug!(target_module = SOURCE, url = %url, "requesting upstream content");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Upstream {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn source(base: &str) -> HttpContentSource {
        HttpContentSource::new(&ContentApiSettings {
            base_url: Url::parse(base).expect("base url"),
            timeout: Duration::from_secs(5),
        })
        .expect("client")
    }

    #[test]
    fn keys_join_the_base_path() {
        let source = source("http://content.local/v1/");
        assert_eq!(
            source.url("/api/apps?featured=true").expect("url").as_str(),
            "http://content.local/v1/api/apps?featured=true"
        );
    }

    #[test]
    fn base_without_trailing_slash_keeps_its_path() {
        let source = source("http://content.local/v1");
        assert_eq!(
            source.url("/api/stats").expect("url").as_str(),
            "http://content.local/v1/api/stats"
        );
    }
}
