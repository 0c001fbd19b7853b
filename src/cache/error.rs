use thiserror::Error;

/// Failures raised by the freshness model and the tag index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("invalid cache configuration: {0}")]
    InvalidConfiguration(String),
    #[error("no cache entry for `{0}`")]
    NotFound(String),
}

impl CacheError {
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }
}

/// Failures raised while retrieving or decoding cached content.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("resource `{0}` not found upstream")]
    NotFound(String),
    #[error("upstream returned status {status} for `{key}`")]
    Upstream { key: String, status: u16 },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid content url: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to decode `{key}`: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
