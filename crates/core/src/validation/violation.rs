//! Raw and translated validation violations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single untranslated constraint violation.
///
/// `message_key` defaults to `request.<constraint>`; `params` feed the
/// `{placeholder}` interpolation of the translated message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestViolation {
    pub field: String,
    pub constraint: String,
    pub message_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Value>,
}

impl RequestViolation {
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        let constraint = constraint.into();
        Self {
            field: field.into(),
            message_key: format!("request.{constraint}"),
            constraint,
            value: None,
            params: BTreeMap::new(),
        }
    }

    /// Replace the default `request.<constraint>` message key.
    pub fn with_message_key(mut self, key: impl Into<String>) -> Self {
        self.message_key = key.into();
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// A translated validation error as sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}
