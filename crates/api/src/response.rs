//! The success response envelope and the per-route formatter that wraps
//! handler output in it.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::MethodRouter;
use axum::Json;
use keystone_core::messages::{MessageService, STRUCTURE_ERROR_KEY};
use keystone_core::validation::FieldError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::filter::{error_response, ErrorPayload};
use crate::language::request_language;
use crate::state::AppState;

/// Pagination keys recognized in handler output.
const PAGINATION_KEYS: [&str; 4] = ["totalData", "totalPage", "currentPage", "perPage"];

/// Every API response body, success or error.
///
/// Absent optional fields are omitted. On success `data` is always present,
/// `null` when the handler returned nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub status_code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_data: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

impl Envelope {
    pub fn message(status_code: u16, message: String) -> Self {
        Self {
            status_code,
            message,
            errors: None,
            data: None,
            total_data: None,
            total_page: None,
            current_page: None,
            per_page: None,
        }
    }
}

/// Per-route formatting settings.
#[derive(Debug, Clone)]
pub struct ResponseConfig {
    pub message_key: String,
    /// Overrides the handler's status when set.
    pub status: Option<StatusCode>,
}

impl ResponseConfig {
    pub fn new(message_key: impl Into<String>) -> Self {
        Self {
            message_key: message_key.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }
}

/// Wraps successful handler output in an [`Envelope`].
#[derive(Clone)]
pub struct ResponseFormatter {
    messages: Arc<MessageService>,
    config: Arc<ResponseConfig>,
}

impl ResponseFormatter {
    pub fn new(messages: Arc<MessageService>, config: ResponseConfig) -> Self {
        Self {
            messages,
            config: Arc::new(config),
        }
    }

    /// Build the envelope for `output`.
    ///
    /// An object carrying any pagination key is a paginated result: each
    /// pagination key present is lifted into the envelope and `data` becomes
    /// the object's `data` (or what is left of the object when it has none).
    /// Anything else becomes `data` unchanged.
    pub fn format(
        &self,
        status: StatusCode,
        output: Value,
        language: Option<&str>,
    ) -> (StatusCode, Envelope) {
        let status = self.config.status.unwrap_or(status);
        let mut envelope = Envelope::message(
            status.as_u16(),
            self.messages.get_in(&self.config.message_key, language),
        );

        match output {
            Value::Object(mut map) if is_paginated(&map) => {
                envelope.total_data = take_count(&mut map, "totalData");
                envelope.total_page = take_count(&mut map, "totalPage");
                envelope.current_page = take_count(&mut map, "currentPage");
                envelope.per_page = take_count(&mut map, "perPage");
                envelope.data = Some(match map.remove("data") {
                    Some(data) => data,
                    None if map.is_empty() => Value::Null,
                    None => Value::Object(map),
                });
            }
            other => envelope.data = Some(other),
        }

        (status, envelope)
    }

    /// Attach this formatter to a route.
    pub fn apply(self, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
        route.route_layer(middleware::from_fn_with_state(self, format_response))
    }
}

fn is_paginated(map: &Map<String, Value>) -> bool {
    PAGINATION_KEYS.iter().any(|key| map.contains_key(*key))
}

/// Remove `key` as an integer count. Integral floats and numeric strings are
/// accepted; any other value is put back and left out of the envelope.
fn take_count(map: &mut Map<String, Value>, key: &str) -> Option<i64> {
    let value = map.remove(key)?;
    let count = match &value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    if count.is_none() {
        tracing::warn!(key, %value, "Pagination field is not an integer");
        map.insert(key.to_string(), value);
    }
    count
}

/// Middleware body of [`ResponseFormatter::apply`].
///
/// Error responses pass through untouched for the error filter.
pub async fn format_response(
    State(formatter): State<ResponseFormatter>,
    request: Request,
    next: Next,
) -> Response {
    let language = request_language(&formatter.messages, request.headers());
    let response = next.run(request).await;

    let status = response.status();
    if !status.is_success() || response.extensions().get::<ErrorPayload>().is_some() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let output = match to_bytes(body, usize::MAX).await {
        Ok(bytes) if bytes.is_empty() => Value::Null,
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(error = %e, "Handler output is not JSON");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorPayload::message(STRUCTURE_ERROR_KEY),
                );
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "Failed to read handler output");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorPayload::message("http.serverError.internalServerError"),
            );
        }
    };

    let (status, envelope) = formatter.format(status, output, Some(&language));
    with_envelope(Response::from_parts(parts, Body::empty()), status, &envelope)
}

/// Replace `response`'s body with `envelope`, keeping its other headers.
pub(crate) fn with_envelope(
    response: Response,
    status: StatusCode,
    envelope: &Envelope,
) -> Response {
    let mut rebuilt = (status, Json(envelope)).into_response();
    let headers = rebuilt.headers_mut();
    for (name, value) in response.headers() {
        if name != CONTENT_TYPE && name != CONTENT_LENGTH {
            headers.append(name.clone(), value.clone());
        }
    }
    rebuilt
}
