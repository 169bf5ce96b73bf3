//! The error filter: turns failures reaching the HTTP boundary into the
//! response envelope.
//!
//! [`AppError`](crate::error::AppError) attaches an [`ErrorPayload`] to its
//! response; the [`error_filter`] middleware resolves the payload's message
//! keys in the request language and rewrites the body. Error responses that
//! carry no payload (unknown routes, timeouts, framework rejections, panics)
//! are mapped by status code alone.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use keystone_core::messages::{MessageService, STRUCTURE_ERROR_KEY};
use keystone_core::validation::{FieldError, RequestViolation};
use serde_json::{Map, Value};

use crate::language::request_language;
use crate::response::{with_envelope, Envelope};

/// Validation entries carried by a structured payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorEntries {
    /// Raw violations, translated by the filter.
    Violations(Vec<RequestViolation>),
    /// Entries whose messages are already resolved.
    Resolved(Vec<FieldError>),
}

/// A structured error payload: `{statusCode?, message, errors?, data?}`.
///
/// `message` is a message key. `status_code` overrides the envelope's
/// `statusCode` (not the HTTP status) when set.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredError {
    pub status_code: Option<u16>,
    pub message: String,
    pub errors: Option<ErrorEntries>,
    pub data: Option<Value>,
}

/// What a failed handler hands to the error filter.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorPayload {
    /// A bare message key.
    Message(String),
    Structured(StructuredError),
    /// A payload of no recognizable shape.
    Malformed(Value),
}

impl ErrorPayload {
    pub fn message(key: impl Into<String>) -> Self {
        ErrorPayload::Message(key.into())
    }

    /// Classify an untyped payload by shape.
    ///
    /// Strings are message keys. Objects need a string `message`; their
    /// `errors`, if present, must be an array of either resolved
    /// `{field, message}` entries or raw `{field, constraint|messageKey}`
    /// violations. Anything else is malformed.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(key) => ErrorPayload::Message(key),
            Value::Object(map) => match StructuredError::from_map(&map) {
                Some(structured) => ErrorPayload::Structured(structured),
                None => ErrorPayload::Malformed(Value::Object(map)),
            },
            other => ErrorPayload::Malformed(other),
        }
    }

    /// Untranslated envelope, used as the body before the filter runs.
    fn raw_envelope(&self, status: StatusCode) -> Envelope {
        match self {
            ErrorPayload::Message(key) => Envelope::message(status.as_u16(), key.clone()),
            ErrorPayload::Structured(s) => Envelope {
                status_code: s.status_code.unwrap_or(status.as_u16()),
                errors: s.errors.as_ref().map(|entries| match entries {
                    ErrorEntries::Violations(violations) => violations
                        .iter()
                        .map(|v| FieldError {
                            field: v.field.clone(),
                            message: v.message_key.clone(),
                        })
                        .collect(),
                    ErrorEntries::Resolved(resolved) => resolved.clone(),
                }),
                data: s.data.clone(),
                ..Envelope::message(status.as_u16(), s.message.clone())
            },
            ErrorPayload::Malformed(_) => Envelope::message(500, STRUCTURE_ERROR_KEY.to_string()),
        }
    }
}

impl StructuredError {
    fn from_map(map: &Map<String, Value>) -> Option<Self> {
        let message = map.get("message")?.as_str()?.to_string();
        let status_code = match map.get("statusCode") {
            None | Some(Value::Null) => None,
            Some(code) => Some(u16::try_from(code.as_u64()?).ok()?),
        };
        let errors = match map.get("errors") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(parse_entries(items)?),
            Some(_) => return None,
        };
        Some(Self {
            status_code,
            message,
            errors,
            data: map.get("data").filter(|d| !d.is_null()).cloned(),
        })
    }
}

fn parse_entries(items: &[Value]) -> Option<ErrorEntries> {
    let resolved: Option<Vec<FieldError>> = items
        .iter()
        .map(|item| serde_json::from_value::<FieldError>(item.clone()).ok())
        .collect();
    if let Some(resolved) = resolved {
        return Some(ErrorEntries::Resolved(resolved));
    }

    let violations: Option<Vec<RequestViolation>> = items
        .iter()
        .map(|item| {
            let field = item.get("field")?.as_str()?;
            let violation = match (item.get("constraint"), item.get("messageKey")) {
                (Some(constraint), key) => {
                    let v = RequestViolation::new(field, constraint.as_str()?);
                    match key {
                        Some(key) => v.with_message_key(key.as_str()?),
                        None => v,
                    }
                }
                (None, Some(key)) => {
                    RequestViolation::new(field, "custom").with_message_key(key.as_str()?)
                }
                (None, None) => return None,
            };
            Some(violation)
        })
        .collect();
    violations.map(ErrorEntries::Violations)
}

/// Build an error response carrying `payload` for the filter.
///
/// The body is the untranslated envelope so the response stays meaningful
/// even where no filter is installed.
pub fn error_response(status: StatusCode, payload: ErrorPayload) -> Response {
    let mut response = (status, Json(payload.raw_envelope(status))).into_response();
    response.extensions_mut().insert(payload);
    response
}

/// Message key for an error status that carries no payload.
pub fn status_message_key(status: StatusCode) -> &'static str {
    match status {
        StatusCode::UNAUTHORIZED => "http.clientError.unauthorized",
        StatusCode::FORBIDDEN => "http.clientError.forbidden",
        StatusCode::NOT_FOUND => "http.clientError.notFound",
        StatusCode::METHOD_NOT_ALLOWED => "http.clientError.methodNotAllowed",
        StatusCode::REQUEST_TIMEOUT => "http.clientError.requestTimeout",
        StatusCode::CONFLICT => "http.clientError.conflict",
        StatusCode::PAYLOAD_TOO_LARGE => "http.clientError.payloadTooLarge",
        StatusCode::UNSUPPORTED_MEDIA_TYPE => "http.clientError.unsupportedMediaType",
        StatusCode::UNPROCESSABLE_ENTITY => "http.clientError.unprocessableEntity",
        StatusCode::TOO_MANY_REQUESTS => "http.clientError.tooManyRequests",
        StatusCode::SERVICE_UNAVAILABLE => "http.serverError.serviceUnavailable",
        s if s.is_server_error() => "http.serverError.internalServerError",
        _ => "http.clientError.badRequest",
    }
}

/// Formats error payloads into envelopes in the request language.
#[derive(Clone)]
pub struct ErrorFilter {
    messages: Arc<MessageService>,
}

impl ErrorFilter {
    pub fn new(messages: Arc<MessageService>) -> Self {
        Self { messages }
    }

    /// Envelope for `payload`, plus the HTTP status to send it with.
    pub fn catch(
        &self,
        status: StatusCode,
        payload: &ErrorPayload,
        language: Option<&str>,
    ) -> (StatusCode, Envelope) {
        let translate = |key: &str| self.messages.get_in(key, language);

        match payload {
            ErrorPayload::Message(key) => {
                (status, Envelope::message(status.as_u16(), translate(key)))
            }
            ErrorPayload::Structured(structured) => {
                let errors = structured.errors.as_ref().map(|entries| match entries {
                    ErrorEntries::Violations(violations) => {
                        self.messages.request_errors_message(violations, language)
                    }
                    ErrorEntries::Resolved(resolved) => resolved.clone(),
                });
                let envelope = Envelope {
                    status_code: structured.status_code.unwrap_or(status.as_u16()),
                    errors,
                    data: structured.data.clone(),
                    ..Envelope::message(status.as_u16(), translate(&structured.message))
                };
                (status, envelope)
            }
            ErrorPayload::Malformed(value) => {
                tracing::warn!(%status, payload = %value, "Malformed error payload");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                (status, Envelope::message(status.as_u16(), translate(STRUCTURE_ERROR_KEY)))
            }
        }
    }

    /// Envelope for an error response that carries no payload.
    pub fn catch_status(&self, status: StatusCode, language: Option<&str>) -> Envelope {
        Envelope::message(
            status.as_u16(),
            self.messages.get_in(status_message_key(status), language),
        )
    }
}

/// Middleware applying [`ErrorFilter`] to every error response.
pub async fn error_filter(
    State(filter): State<ErrorFilter>,
    request: Request,
    next: Next,
) -> Response {
    let language = request_language(&filter.messages, request.headers());
    let response = next.run(request).await;
    let status = response.status();

    if let Some(payload) = response.extensions().get::<ErrorPayload>().cloned() {
        let (status, envelope) = filter.catch(status, &payload, Some(&language));
        return with_envelope(response, status, &envelope);
    }

    if status.is_client_error() || status.is_server_error() {
        tracing::debug!(%status, "Error response without payload");
        let envelope = filter.catch_status(status, Some(&language));
        return with_envelope(response, status, &envelope);
    }

    response
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn filter() -> ErrorFilter {
        ErrorFilter::new(Arc::new(MessageService::new("en")))
    }

    fn messages() -> MessageService {
        MessageService::new("en")
    }

    #[test]
    fn bare_key_becomes_status_and_message() {
        let payload = ErrorPayload::from_value(json!("http.clientError.notFound"));
        let (status, envelope) = filter().catch(StatusCode::NOT_FOUND, &payload, None);

        assert_eq!(status, StatusCode::NOT_FOUND);
        let body = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            body,
            json!({
                "statusCode": 404,
                "message": messages().get("http.clientError.notFound"),
            })
        );
    }

    #[test]
    fn structured_payload_translates_violations() {
        let payload = ErrorPayload::Structured(StructuredError {
            status_code: Some(422),
            message: "http.clientError.unprocessableEntity".into(),
            errors: Some(ErrorEntries::Violations(vec![RequestViolation::new(
                "name",
                "isNotEmpty",
            )])),
            data: None,
        });
        let (_, envelope) = filter().catch(StatusCode::UNPROCESSABLE_ENTITY, &payload, None);

        let errors = envelope.errors.expect("errors are kept");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "name");
        assert_eq!(
            errors[0].message,
            messages().translate(
                "request.isNotEmpty",
                None,
                &[("field".to_string(), json!("name"))].into_iter().collect()
            )
        );
        assert_eq!(envelope.data, None);
    }

    #[test]
    fn structured_payload_passes_data_and_resolved_errors() {
        let payload = ErrorPayload::from_value(json!({
            "statusCode": 5001,
            "message": "role.error.inUse",
            "errors": [{ "field": "id", "message": "already resolved" }],
            "data": { "users": 3 },
        }));
        let (status, envelope) = filter().catch(StatusCode::CONFLICT, &payload, Some("id"));

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(envelope.status_code, 5001);
        assert_eq!(envelope.message, messages().get_in("role.error.inUse", Some("id")));
        assert_eq!(envelope.errors.unwrap()[0].message, "already resolved");
        assert_eq!(envelope.data, Some(json!({ "users": 3 })));
    }

    #[test]
    fn malformed_payloads_fall_back_to_structure_error() {
        for value in [json!(42), json!(["a"]), json!({ "statusCode": 400 }), json!(null)] {
            let payload = ErrorPayload::from_value(value);
            assert!(matches!(payload, ErrorPayload::Malformed(_)));

            let (status, envelope) = filter().catch(StatusCode::BAD_REQUEST, &payload, None);
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(envelope.status_code, 500);
            assert_eq!(envelope.message, messages().get(STRUCTURE_ERROR_KEY));
            assert!(envelope.errors.is_none() && envelope.data.is_none());
        }
    }

    #[test]
    fn raw_violation_entries_are_recognized() {
        let payload = ErrorPayload::from_value(json!({
            "message": "http.clientError.unprocessableEntity",
            "errors": [{ "field": "email", "constraint": "isEmail" }],
        }));
        match payload {
            ErrorPayload::Structured(StructuredError {
                errors: Some(ErrorEntries::Violations(v)),
                ..
            }) => assert_eq!(v[0].message_key, "request.isEmail"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn statuses_without_payload_map_to_http_keys() {
        assert_eq!(status_message_key(StatusCode::NOT_FOUND), "http.clientError.notFound");
        assert_eq!(
            status_message_key(StatusCode::REQUEST_TIMEOUT),
            "http.clientError.requestTimeout"
        );
        assert_eq!(
            status_message_key(StatusCode::BAD_GATEWAY),
            "http.serverError.internalServerError"
        );
        assert_eq!(status_message_key(StatusCode::IM_A_TEAPOT), "http.clientError.badRequest");

        let envelope = filter().catch_status(StatusCode::METHOD_NOT_ALLOWED, None);
        assert_eq!(envelope.status_code, 405);
        assert!(!envelope.message.is_empty());
    }
}
