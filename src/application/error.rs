use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use vitrine_api_types::ErrorBody;

use crate::{cache::FetchError, infra::error::InfraError};

use super::revalidation::RevalidationError;

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// JSON error response. The public message and code go to the client; the
/// report stays server-side for the response logger.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: String,
    code: &'static str,
    detail: Option<String>,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        code: &'static str,
        public_message: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message: public_message.into(),
            code,
            detail: None,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        code: &'static str,
        public_message: impl Into<String>,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message: public_message.into(),
            code,
            detail: None,
            report,
        }
    }

    /// Expose `detail` to the client in the `error` field.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: self.public_message,
            code: self.code.to_string(),
            error: self.detail,
        };
        let mut response = (self.status, Json(body)).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<RevalidationError> for HttpError {
    fn from(error: RevalidationError) -> Self {
        const SOURCE: &str = "application::error::revalidation_error_to_http";
        let code = error.code();
        match error {
            RevalidationError::Unconfigured => HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                "Revalidation secret not configured",
                "no revalidation secret is configured",
            ),
            RevalidationError::Unauthorized => HttpError::new(
                SOURCE,
                StatusCode::UNAUTHORIZED,
                code,
                "Invalid secret",
                "presented secret did not match",
            ),
            RevalidationError::BadRequest(message) => HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                code,
                message.clone(),
                message,
            ),
            RevalidationError::Unknown(message) => HttpError::new(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                code,
                "Error revalidating",
                message.clone(),
            )
            .with_detail(message),
        }
    }
}

impl From<FetchError> for HttpError {
    fn from(error: FetchError) -> Self {
        const SOURCE: &str = "application::error::fetch_error_to_http";
        match &error {
            FetchError::NotFound(_) => HttpError::from_error(
                SOURCE,
                StatusCode::NOT_FOUND,
                "not_found",
                "Resource not found",
                &error,
            ),
            FetchError::Upstream { .. } | FetchError::Http(_) | FetchError::Decode { .. } => {
                HttpError::from_error(
                    SOURCE,
                    StatusCode::BAD_GATEWAY,
                    "upstream",
                    "Content service unavailable",
                    &error,
                )
            }
            FetchError::Url(_) | FetchError::Encode { .. } => HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
                "Internal server error",
                &error,
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::LoadError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn revalidation_errors_map_to_status_codes() {
        let cases = [
            (RevalidationError::Unconfigured, StatusCode::INTERNAL_SERVER_ERROR),
            (RevalidationError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                RevalidationError::bad_request("Tag is required"),
                StatusCode::BAD_REQUEST,
            ),
            (
                RevalidationError::Unknown("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            let response = HttpError::from(error).into_response();
            assert_eq!(response.status(), status);
            assert!(response.extensions().get::<ErrorReport>().is_some());
        }
    }

    #[tokio::test]
    async fn unknown_error_exposes_detail() {
        let response = HttpError::from(RevalidationError::Unknown("boom".into())).into_response();
        let body = body_json(response).await;
        assert_eq!(body["message"], "Error revalidating");
        assert_eq!(body["code"], "unknown");
        assert_eq!(body["error"], "boom");
    }

    #[tokio::test]
    async fn bad_request_message_is_public() {
        let response =
            HttpError::from(RevalidationError::bad_request("Path is required")).into_response();
        let body = body_json(response).await;
        assert_eq!(body["message"], "Path is required");
        assert!(body.get("error").is_none());
    }

    #[test]
    fn upstream_failures_are_bad_gateway() {
        let error = FetchError::Upstream {
            key: "/api/apps".into(),
            status: 503,
        };
        assert_eq!(HttpError::from(error).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            HttpError::from(FetchError::NotFound("/api/apps/x".into())).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn report_collects_error_chain() {
        let source = serde_json::from_str::<serde_json::Value>("nope").expect_err("invalid");
        let error = FetchError::Decode {
            key: "/api/stats".into(),
            source,
        };
        let report = ErrorReport::from_error("test", StatusCode::BAD_GATEWAY, &error);
        assert_eq!(report.messages.len(), 2);
        assert!(report.messages[0].contains("/api/stats"));
    }
}
