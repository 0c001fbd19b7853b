//! Cache configuration.
//!
//! Sized from the `[cache]` section of `config/default.toml`.

use std::num::NonZeroUsize;

use serde::Deserialize;

use super::error::CacheError;
use super::keys::RevalidateWindow;

const DEFAULT_CONTENT_LIMIT: usize = 256;
const DEFAULT_REVALIDATE_SECONDS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum payloads held in the content store.
    pub content_limit: usize,
    /// Window applied to fetches that do not name their own.
    pub default_revalidate_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            content_limit: DEFAULT_CONTENT_LIMIT,
            default_revalidate_seconds: DEFAULT_REVALIDATE_SECONDS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            content_limit: settings.content_limit,
            default_revalidate_seconds: settings.default_revalidate.as_secs(),
        }
    }
}

impl CacheConfig {
    /// Returns the content limit as NonZeroUsize, clamping to 1 if zero.
    pub fn content_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.content_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn default_window(&self) -> Result<RevalidateWindow, CacheError> {
        RevalidateWindow::from_secs(self.default_revalidate_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.content_limit, 256);
        assert_eq!(config.default_revalidate_seconds, 60);
        assert_eq!(config.default_window().map(|w| w.as_secs()), Ok(60));
    }

    #[test]
    fn non_zero_clamps_to_min() {
        let config = CacheConfig {
            content_limit: 0,
            ..Default::default()
        };
        assert_eq!(config.content_limit_non_zero().get(), 1);
    }

    #[test]
    fn zero_default_window_is_rejected() {
        let config = CacheConfig {
            default_revalidate_seconds: 0,
            ..Default::default()
        };
        assert!(config.default_window().is_err());
    }
}
