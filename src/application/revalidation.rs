//! On-demand revalidation.
//!
//! The gateway checks the shared secret and then marks entries in the tag
//! index. It never regenerates anything itself; the next read does.

use std::sync::Arc;

use metrics::counter;
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use vitrine_api_types::RevalidationResponse;

use crate::cache::{CacheError, TagIndex};

const SOURCE: &str = "application::revalidation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationKind {
    Path,
    Tag,
}

impl InvalidationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Tag => "tag",
        }
    }

    /// Message returned when the target value is missing.
    fn missing_message(self) -> &'static str {
        match self {
            Self::Path => "Path is required",
            Self::Tag => "Tag is required",
        }
    }
}

/// One invalidation call, built per HTTP request and discarded afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct InvalidationRequest {
    pub kind: InvalidationKind,
    pub value: String,
    pub secret: String,
}

impl InvalidationRequest {
    pub fn path(path: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            kind: InvalidationKind::Path,
            value: path.into(),
            secret: secret.into(),
        }
    }

    pub fn tag(tag: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            kind: InvalidationKind::Tag,
            value: tag.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for InvalidationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvalidationRequest")
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationOutcome {
    /// Applied to the index. A tag may still have matched nothing.
    Revalidated,
    /// The path had no cache entry; it will be generated on first access.
    NotCached,
}

impl InvalidationOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Revalidated => "revalidated",
            Self::NotCached => "not_cached",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationReceipt {
    pub kind: InvalidationKind,
    pub value: String,
    pub timestamp: OffsetDateTime,
    pub affected: usize,
    pub outcome: InvalidationOutcome,
}

impl InvalidationReceipt {
    pub fn message(&self) -> String {
        match (self.kind, self.outcome) {
            (InvalidationKind::Path, InvalidationOutcome::NotCached) => format!(
                "No cached entry for {}; it will be generated on first access",
                self.value
            ),
            (InvalidationKind::Path, _) => format!("Successfully revalidated {}", self.value),
            (InvalidationKind::Tag, _) => {
                format!("Successfully revalidated tag: {}", self.value)
            }
        }
    }

    pub fn into_response(self) -> RevalidationResponse {
        let message = self.message();
        let (path, tag) = match self.kind {
            InvalidationKind::Path => (Some(self.value), None),
            InvalidationKind::Tag => (None, Some(self.value)),
        };
        RevalidationResponse {
            revalidated: true,
            path,
            tag,
            timestamp: self.timestamp,
            message,
            affected: self.affected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RevalidationError {
    #[error("Revalidation secret not configured")]
    Unconfigured,
    #[error("Invalid secret")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error("Error revalidating: {0}")]
    Unknown(String),
}

impl RevalidationError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::Unauthorized => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::Unknown(_) => "unknown",
        }
    }
}

pub struct RevalidationGateway {
    index: Arc<TagIndex>,
}

impl RevalidationGateway {
    pub fn new(index: Arc<TagIndex>) -> Self {
        Self { index }
    }

    /// Reject the call unless a secret is configured and matches. Exposed on
    /// its own so transports can authenticate before parsing a body.
    pub fn authorize(
        &self,
        presented: &str,
        configured_secret: Option<&str>,
    ) -> Result<(), RevalidationError> {
        let configured = configured_secret
            .filter(|secret| !secret.is_empty())
            .ok_or(RevalidationError::Unconfigured)?;

        if bool::from(presented.as_bytes().ct_eq(configured.as_bytes())) {
            Ok(())
        } else {
            Err(RevalidationError::Unauthorized)
        }
    }

    pub fn handle(
        &self,
        request: &InvalidationRequest,
        configured_secret: Option<&str>,
    ) -> Result<InvalidationReceipt, RevalidationError> {
        self.handle_at(request, configured_secret, OffsetDateTime::now_utc())
    }

    /// Checks run in a fixed order: configured secret, then the presented
    /// secret, then the target value.
    pub fn handle_at(
        &self,
        request: &InvalidationRequest,
        configured_secret: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<InvalidationReceipt, RevalidationError> {
        let result = self.apply(request, configured_secret, now);

        let outcome = match &result {
            Ok(receipt) => receipt.outcome.as_str(),
            Err(err) => err.code(),
        };
        counter!(
            "vitrine_revalidation_total",
            "kind" => request.kind.as_str(),
            "outcome" => outcome
        )
        .increment(1);

        result
    }

    fn apply(
        &self,
        request: &InvalidationRequest,
        configured_secret: Option<&str>,
        now: OffsetDateTime,
    ) -> Result<InvalidationReceipt, RevalidationError> {
        self.authorize(&request.secret, configured_secret)?;

        if request.value.is_empty() {
            return Err(RevalidationError::bad_request(
                request.kind.missing_message(),
            ));
        }

        let (affected, outcome) = match request.kind {
            InvalidationKind::Tag => (
                self.index.invalidate_by_tag(&request.value),
                InvalidationOutcome::Revalidated,
            ),
            InvalidationKind::Path => match self.index.invalidate_by_path(&request.value) {
                Ok(()) => (1, InvalidationOutcome::Revalidated),
                Err(CacheError::NotFound(path)) => {
                    warn!(
                        target_module = SOURCE,
                        path = %path,
                        "Invalidated path has no cache entry"
                    );
                    (0, InvalidationOutcome::NotCached)
                }
                Err(err) => return Err(RevalidationError::Unknown(err.to_string())),
            },
        };

        info!(
            target_module = SOURCE,
            kind = request.kind.as_str(),
            value = %request.value,
            affected,
            outcome = outcome.as_str(),
            "Cache entries marked for regeneration"
        );

        Ok(InvalidationReceipt {
            kind: request.kind,
            value: request.value.clone(),
            timestamp: now,
            affected,
            outcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::cache::{CacheEntry, EntryState, RevalidateWindow};

    const NOW: OffsetDateTime = datetime!(2024-05-01 12:00 UTC);
    const SECRET: Option<&str> = Some("s3cret");

    fn gateway() -> (RevalidationGateway, Arc<TagIndex>) {
        let index = Arc::new(TagIndex::new());
        let window = RevalidateWindow::from_secs_const(60);
        index.register(CacheEntry::new("/", ["featured", "all-apps"], window, NOW));
        index.register(CacheEntry::new("/apps", ["all-apps"], window, NOW));
        (RevalidationGateway::new(Arc::clone(&index)), index)
    }

    #[test]
    fn missing_secret_is_unconfigured_regardless_of_request() {
        let (gateway, _) = gateway();
        let requests = [
            InvalidationRequest::path("/", "s3cret"),
            InvalidationRequest::tag("", ""),
            InvalidationRequest::tag("featured", "wrong"),
        ];
        for request in &requests {
            assert_eq!(
                gateway.handle_at(request, None, NOW),
                Err(RevalidationError::Unconfigured)
            );
            assert_eq!(
                gateway.handle_at(request, Some(""), NOW),
                Err(RevalidationError::Unconfigured)
            );
        }
    }

    #[test]
    fn wrong_secret_is_unauthorized_before_value_check() {
        let (gateway, index) = gateway();
        let request = InvalidationRequest::path("", "nope");

        assert_eq!(
            gateway.handle_at(&request, SECRET, NOW),
            Err(RevalidationError::Unauthorized)
        );
        assert_eq!(index.state("/", NOW), Some(EntryState::Fresh));
    }

    #[test]
    fn secret_comparison_is_exact() {
        let (gateway, _) = gateway();
        for presented in ["S3CRET", "s3cret ", "s3cre", ""] {
            let request = InvalidationRequest::tag("featured", presented);
            assert_eq!(
                gateway.handle_at(&request, SECRET, NOW),
                Err(RevalidationError::Unauthorized),
                "{presented:?}"
            );
        }
    }

    #[test]
    fn empty_value_is_bad_request() {
        let (gateway, _) = gateway();

        let err = gateway
            .handle_at(&InvalidationRequest::path("", "s3cret"), SECRET, NOW)
            .expect_err("empty path");
        assert_eq!(err, RevalidationError::BadRequest("Path is required".into()));

        let err = gateway
            .handle_at(&InvalidationRequest::tag("", "s3cret"), SECRET, NOW)
            .expect_err("empty tag");
        assert_eq!(err, RevalidationError::BadRequest("Tag is required".into()));
    }

    #[test]
    fn tag_request_marks_tagged_entries() {
        let (gateway, index) = gateway();
        let receipt = gateway
            .handle_at(&InvalidationRequest::tag("all-apps", "s3cret"), SECRET, NOW)
            .expect("valid request");

        assert_eq!(receipt.affected, 2);
        assert_eq!(receipt.outcome, InvalidationOutcome::Revalidated);
        assert_eq!(receipt.message(), "Successfully revalidated tag: all-apps");
        assert_eq!(index.state("/apps", NOW), Some(EntryState::Invalidated));
    }

    #[test]
    fn unknown_tag_succeeds_with_zero_affected() {
        let (gateway, _) = gateway();
        let receipt = gateway
            .handle_at(&InvalidationRequest::tag("nothing", "s3cret"), SECRET, NOW)
            .expect("unknown tag is not an error");
        assert_eq!(receipt.affected, 0);
    }

    #[test]
    fn path_request_marks_single_entry() {
        let (gateway, index) = gateway();
        let receipt = gateway
            .handle_at(&InvalidationRequest::path("/apps", "s3cret"), SECRET, NOW)
            .expect("valid request");

        assert_eq!(receipt.affected, 1);
        assert_eq!(receipt.message(), "Successfully revalidated /apps");
        assert_eq!(index.state("/apps", NOW), Some(EntryState::Invalidated));
        assert_eq!(index.state("/", NOW), Some(EntryState::Fresh));
    }

    #[test]
    fn unknown_path_is_reported_not_fatal() {
        let (gateway, _) = gateway();
        let receipt = gateway
            .handle_at(&InvalidationRequest::path("/apps/new", "s3cret"), SECRET, NOW)
            .expect("unknown path is reported");

        assert_eq!(receipt.outcome, InvalidationOutcome::NotCached);
        assert_eq!(receipt.affected, 0);
        assert!(receipt.message().contains("/apps/new"));
    }

    #[test]
    fn receipt_maps_to_wire_response() {
        let (gateway, _) = gateway();
        let response = gateway
            .handle_at(&InvalidationRequest::path("/", "s3cret"), SECRET, NOW)
            .expect("valid request")
            .into_response();

        assert!(response.revalidated);
        assert_eq!(response.path.as_deref(), Some("/"));
        assert!(response.tag.is_none());
        assert_eq!(response.timestamp, NOW);
    }

    #[test]
    fn request_debug_hides_secret() {
        let rendered = format!("{:?}", InvalidationRequest::tag("featured", "s3cret"));
        assert!(!rendered.contains("s3cret"));
    }
}
