use crate::types::DbId;
use crate::validation::RequestViolation;

/// Domain-level failures.
///
/// String payloads are message keys (e.g. `"user.error.emailExist"`), resolved
/// into user-facing text only at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// `entity` is the message namespace of the missing record (`"user"`, `"role"`, ...).
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed with {} violation(s)", .0.len())]
    Validation(Vec<RequestViolation>),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a validation failure on a single field.
    pub fn violation(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        CoreError::Validation(vec![RequestViolation::new(field, constraint)])
    }

    /// The message key describing this error.
    pub fn message_key(&self) -> String {
        match self {
            CoreError::NotFound { entity, .. } => format!("{entity}.error.notFound"),
            CoreError::Validation(_) => "http.clientError.unprocessableEntity".to_string(),
            CoreError::Conflict(key) | CoreError::Unauthorized(key) | CoreError::Forbidden(key) => {
                key.clone()
            }
            CoreError::Internal(_) => "http.serverError.internalServerError".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn not_found_key_uses_entity_namespace() {
        let err = CoreError::NotFound {
            entity: "role",
            id: 7,
        };
        assert_eq!(err.message_key(), "role.error.notFound");
        assert_eq!(err.to_string(), "Entity not found: role with id 7");
    }

    #[test]
    fn internal_key_hides_detail() {
        let err = CoreError::Internal("connection reset by peer".into());
        assert_eq!(err.message_key(), "http.serverError.internalServerError");
    }

    #[test]
    fn single_violation_shorthand() {
        let err = CoreError::violation("sort", "isSort");
        assert_matches!(&err, CoreError::Validation(v) if v.len() == 1 && v[0].field == "sort");
        assert_eq!(err.message_key(), "http.clientError.unprocessableEntity");
    }
}
