//! Reusable field rules shared by request schemas.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::schema::FieldSpec;

pub const PASSWORD_MIN_LENGTH: usize = 8;
pub const PASSWORD_MAX_LENGTH: usize = 64;
pub const NAME_MAX_LENGTH: usize = 50;

/// Dotted lowercase words, e.g. `user.read`.
pub static PERMISSION_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9]*(\.[a-z][a-z0-9]*)+$").expect("valid regex"));

/// Optional leading `+`, then 8 to 15 digits.
pub static MOBILE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]{8,15}$").expect("valid regex"));

/// At least one letter and one digit.
pub fn is_strong_password(value: &Value) -> bool {
    value.as_str().is_some_and(|s| {
        s.chars().any(|c| c.is_alphabetic()) && s.chars().any(|c| c.is_ascii_digit())
    })
}

/// A password field: secret, length-bounded, letter plus digit.
pub fn password(name: &'static str) -> FieldSpec {
    FieldSpec::string(name)
        .required()
        .secret()
        .min_length(PASSWORD_MIN_LENGTH)
        .max_length(PASSWORD_MAX_LENGTH)
        .check("isStrongPassword", is_strong_password)
}

/// A trimmed, lowercased, validated email field.
pub fn email(name: &'static str) -> FieldSpec {
    FieldSpec::string(name)
        .trim()
        .lowercase()
        .max_length(100)
        .email()
}

pub fn mobile_number(name: &'static str) -> FieldSpec {
    FieldSpec::string(name)
        .trim()
        .pattern(&MOBILE_NUMBER_RE, "isMobileNumber")
}

/// A trimmed person name.
pub fn person_name(name: &'static str) -> FieldSpec {
    FieldSpec::string(name)
        .trim()
        .min_length(1)
        .max_length(NAME_MAX_LENGTH)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::validation::Schema;

    #[test]
    fn strong_password_needs_letter_and_digit() {
        assert!(is_strong_password(&json!("abcdef12")));
        assert!(!is_strong_password(&json!("abcdefgh")));
        assert!(!is_strong_password(&json!("12345678")));
        assert!(!is_strong_password(&json!(12345678)));
    }

    #[test]
    fn password_field_reports_every_failure() {
        let schema = Schema::new().field(password("password"));
        let errors = schema.evaluate(&json!({ "password": "abc" })).unwrap_err();
        let constraints: Vec<_> = errors.iter().map(|v| v.constraint.as_str()).collect();
        assert_eq!(constraints, vec!["minLength", "isStrongPassword"]);
        assert!(errors.iter().all(|v| v.value.is_none()));
    }

    #[test]
    fn permission_codes() {
        assert!(PERMISSION_CODE_RE.is_match("user.read"));
        assert!(PERMISSION_CODE_RE.is_match("report.export.csv"));
        assert!(!PERMISSION_CODE_RE.is_match("User.Read"));
        assert!(!PERMISSION_CODE_RE.is_match("user"));
        assert!(!PERMISSION_CODE_RE.is_match("user..read"));
    }

    #[test]
    fn mobile_numbers() {
        assert!(MOBILE_NUMBER_RE.is_match("+6281234567890"));
        assert!(MOBILE_NUMBER_RE.is_match("08123456789"));
        assert!(!MOBILE_NUMBER_RE.is_match("12-34"));
    }

    #[test]
    fn email_is_normalized() {
        let schema = Schema::new().field(email("email").required());
        let out = schema.evaluate(&json!({ "email": "  Jane@Example.COM " })).unwrap();
        assert_eq!(out["email"], json!("jane@example.com"));
    }
}
