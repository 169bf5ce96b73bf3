//! Extractors that run the validation pipe on request input.

use std::collections::HashMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use keystone_core::validation::{validation_pipe, RequestSchema, Validator};
use serde_json::{Map, Value};

use crate::error::AppError;

/// Message key for request bodies that are not valid JSON.
pub const INVALID_JSON_KEY: &str = "request.error.invalidJson";

/// A JSON body validated against `T::schema()`.
///
/// Rejects with 422 and every violation found, or 400 when the body is not
/// JSON at all.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: RequestSchema + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(payload) = Json::<Value>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        let request = validation_pipe::<T>().transform(payload)?;
        Ok(Self(request))
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            AppError::Status(StatusCode::UNSUPPORTED_MEDIA_TYPE)
        }
        JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_) => {
            AppError::BadRequest(INVALID_JSON_KEY.into())
        }
        other => AppError::Status(other.status()),
    }
}

/// A query string validated against `T::schema()`.
///
/// Every parameter arrives as a string; the schema coerces it.
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: RequestSchema + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map_err(|_| AppError::Status(StatusCode::BAD_REQUEST))?;
        let payload: Map<String, Value> = params
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        let request = validation_pipe::<T>().transform(Value::Object(payload))?;
        Ok(Self(request))
    }
}
