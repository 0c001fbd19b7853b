//! `POST /invalidate-by-path` and `POST /invalidate-by-tag`.

use axum::{Json, extract::State};
use bytes::Bytes;
use serde_json::{Map, Value};

use vitrine_api_types::RevalidationResponse;

use crate::application::{
    error::HttpError,
    revalidation::{InvalidationKind, InvalidationRequest, RevalidationError},
};

use super::HttpState;

type JsonObject = Map<String, Value>;

pub(super) async fn invalidate_by_path(
    State(state): State<HttpState>,
    body: Bytes,
) -> Result<Json<RevalidationResponse>, HttpError> {
    handle_invalidation(&state, InvalidationKind::Path, &body)
}

pub(super) async fn invalidate_by_tag(
    State(state): State<HttpState>,
    body: Bytes,
) -> Result<Json<RevalidationResponse>, HttpError> {
    handle_invalidation(&state, InvalidationKind::Tag, &body)
}

fn handle_invalidation(
    state: &HttpState,
    kind: InvalidationKind,
    body: &[u8],
) -> Result<Json<RevalidationResponse>, HttpError> {
    let configured = state.revalidation_secret.as_deref();

    // Without a configured secret nothing in the body matters.
    if configured.is_none_or(str::is_empty) {
        return Err(RevalidationError::Unconfigured.into());
    }

    let body = parse_body(body)?;

    // Non-string values read as empty: a bad secret is then unauthorized and
    // a bad target is a bad request.
    let request = InvalidationRequest {
        kind,
        value: string_field(&body, kind.as_str()),
        secret: string_field(&body, "secret"),
    };

    let receipt = state.gateway.handle(&request, configured)?;
    Ok(Json(receipt.into_response()))
}

// The content type is not checked; any body that parses as a JSON object is
// accepted.
fn parse_body(body: &[u8]) -> Result<JsonObject, RevalidationError> {
    serde_json::from_slice(body).map_err(|err| RevalidationError::Unknown(err.to_string()))
}

fn string_field(body: &JsonObject, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_string_fields_read_as_empty() {
        let body: JsonObject = serde_json::from_str(r#"{"path": 42, "secret": null}"#)
            .expect("object");
        assert_eq!(string_field(&body, "path"), "");
        assert_eq!(string_field(&body, "secret"), "");
        assert_eq!(string_field(&body, "missing"), "");
    }

    #[test]
    fn bodies_that_are_not_json_objects_are_unknown_errors() {
        let bodies: [&[u8]; 4] = [b"not json", b"", b"[1, 2]", b"\"tag\""];
        for body in bodies {
            let err = parse_body(body).expect_err("not an object");
            assert!(matches!(err, RevalidationError::Unknown(ref detail) if !detail.is_empty()));
        }
        let body = parse_body(br#"{"tag": "all-apps"}"#).expect("object");
        assert_eq!(string_field(&body, "tag"), "all-apps");
    }

    #[test]
    fn string_fields_are_not_trimmed() {
        let body: JsonObject = serde_json::from_str(r#"{"tag": " featured "}"#).expect("object");
        assert_eq!(string_field(&body, "tag"), " featured ");
    }
}
