use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keystone_core::error::CoreError;

use crate::filter::{error_response, ErrorEntries, ErrorPayload, StructuredError};

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Every variant resolves to a message key; [`IntoResponse`] attaches an
/// [`ErrorPayload`] that the error filter translates into the envelope.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `keystone_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A malformed request, carrying a message key.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A bare status, described by its generic HTTP message.
    #[error("HTTP {0}")]
    Status(StatusCode),

    /// An internal error; the detail is logged, never sent.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_KEY: &str = "http.serverError.internalServerError";
const CONFLICT_KEY: &str = "http.clientError.conflict";

impl AppError {
    /// HTTP status and payload for this error.
    pub fn classify(&self) -> (StatusCode, ErrorPayload) {
        match self {
            // --- CoreError variants ---
            AppError::Core(core) => {
                let status = match core {
                    CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                    CoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    CoreError::Conflict(_) => StatusCode::CONFLICT,
                    CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                    CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
                    CoreError::Internal(msg) => {
                        tracing::error!(error = %msg, "Internal core error");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                let payload = match core {
                    CoreError::Validation(violations) => ErrorPayload::Structured(StructuredError {
                        status_code: None,
                        message: core.message_key(),
                        errors: Some(ErrorEntries::Violations(violations.clone())),
                        data: None,
                    }),
                    other => ErrorPayload::Message(other.message_key()),
                };
                (status, payload)
            }

            // --- Database errors ---
            AppError::Database(err) => {
                let (status, key) = classify_sqlx_error(err);
                (status, ErrorPayload::message(key))
            }

            // --- HTTP-specific errors ---
            AppError::BadRequest(key) => {
                (StatusCode::BAD_REQUEST, ErrorPayload::message(key.clone()))
            }
            AppError::Status(status) => (
                *status,
                ErrorPayload::message(crate::filter::status_message_key(*status)),
            ),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorPayload::message(INTERNAL_KEY))
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, payload) = self.classify();
        error_response(status, payload)
    }
}

/// Classify a sqlx error into an HTTP status and message key.
///
/// - `RowNotFound` maps to 404.
/// - Unique violations map to 409, keyed by constraint name.
/// - Foreign key violations map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str) {
    match err {
        sqlx::Error::RowNotFound => (StatusCode::NOT_FOUND, "http.clientError.notFound"),
        sqlx::Error::Database(db_err) => match db_err.code().as_deref() {
            // PostgreSQL unique constraint violation
            Some("23505") => (
                StatusCode::CONFLICT,
                unique_violation_key(db_err.constraint().unwrap_or_default()),
            ),
            // PostgreSQL foreign key violation
            Some("23503") => {
                tracing::warn!(error = %db_err, "Foreign key violation");
                (StatusCode::CONFLICT, CONFLICT_KEY)
            }
            _ => {
                tracing::error!(error = %db_err, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_KEY)
            }
        },
        other => {
            tracing::error!(error = %other, "Database error");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_KEY)
        }
    }
}

/// Message key for a unique constraint, by the names the migrations use.
fn unique_violation_key(constraint: &str) -> &'static str {
    match constraint {
        "uq_users_email" => "user.error.emailExist",
        "uq_users_mobile_number" => "user.error.mobileNumberExist",
        "uq_roles_name" => "role.error.exist",
        "uq_permissions_code" => "permission.error.exist",
        _ => CONFLICT_KEY,
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use keystone_core::validation::RequestViolation;

    use super::*;

    #[test]
    fn not_found_maps_to_entity_key() {
        let err = AppError::Core(CoreError::NotFound {
            entity: "permission",
            id: 3,
        });
        let (status, payload) = err.classify();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(payload, ErrorPayload::message("permission.error.notFound"));
    }

    #[test]
    fn validation_keeps_violations() {
        let err = AppError::Core(CoreError::Validation(vec![RequestViolation::new(
            "email", "isEmail",
        )]));
        let (status, payload) = err.classify();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_matches!(payload, ErrorPayload::Structured(s) => {
            assert_eq!(s.message, "http.clientError.unprocessableEntity");
            assert_matches!(s.errors, Some(ErrorEntries::Violations(v)) if v[0].field == "email");
        });
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = AppError::InternalError("disk on fire".into());
        let (status, payload) = err.classify();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(payload, ErrorPayload::message(INTERNAL_KEY));
    }

    #[test]
    fn row_not_found_is_404() {
        let (status, payload) = AppError::Database(sqlx::Error::RowNotFound).classify();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(payload, ErrorPayload::message("http.clientError.notFound"));
    }

    #[test]
    fn unique_constraints_have_specific_keys() {
        assert_eq!(unique_violation_key("uq_users_email"), "user.error.emailExist");
        assert_eq!(unique_violation_key("uq_roles_name"), "role.error.exist");
        assert_eq!(unique_violation_key("uq_something_else"), CONFLICT_KEY);
    }

    #[test]
    fn response_carries_payload_extension() {
        let response = AppError::BadRequest("request.error.invalidJson".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.extensions().get::<ErrorPayload>(),
            Some(&ErrorPayload::message("request.error.invalidJson"))
        );
    }
}
