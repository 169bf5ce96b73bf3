//! Message catalogue: dotted message keys to localized strings.
//!
//! Tables are nested JSON objects, one per language, embedded from
//! `crates/core/locales/`. Lookup walks the dotted key through the nested
//! objects (`"http.clientError.notFound"` → `http` → `clientError` → `notFound`).
//! Resolution never fails: an unknown key falls back to the default language,
//! then to [`DEFAULT_MESSAGE_KEY`], then to the key itself (or a fixed
//! placeholder for a blank key).

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::validation::{FieldError, RequestViolation};

/// Generic message used when a key cannot be resolved.
pub const DEFAULT_MESSAGE_KEY: &str = "response.default";
/// Message for error payloads that have no recognizable shape.
pub const STRUCTURE_ERROR_KEY: &str = "response.error.structure";
/// Last-resort text for a blank key when no table resolves anything.
pub const PLACEHOLDER_MESSAGE: &str = "Message unavailable";

/// Built-in locale tables as `(language, json)`.
const BUILTIN_LOCALES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en.json")),
    ("id", include_str!("../locales/id.json")),
];

/// Matches `{placeholder}` tokens in message templates.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// Values interpolated into `{placeholder}` tokens.
pub type Properties = BTreeMap<String, Value>;

/// Resolves message keys against per-language tables.
#[derive(Debug, Clone)]
pub struct MessageService {
    default_language: String,
    tables: HashMap<String, Value>,
}

impl MessageService {
    /// Service over the built-in locale tables.
    pub fn new(default_language: impl Into<String>) -> Self {
        Self::from_tables(default_language, builtin_tables())
    }

    /// Service over caller-supplied tables (keyed by language code).
    pub fn from_tables(
        default_language: impl Into<String>,
        tables: HashMap<String, Value>,
    ) -> Self {
        let default_language = default_language.into().to_lowercase();
        if !tables.contains_key(&default_language) {
            tracing::warn!(language = %default_language, "Default language has no message table");
        }
        Self {
            default_language,
            tables,
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Supported language codes, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    pub fn supports(&self, language: &str) -> bool {
        self.tables.contains_key(language)
    }

    /// Pick the first supported language from a header value such as
    /// `"id-ID,id;q=0.9,en;q=0.8"` or `"en"`. Falls back to the default.
    pub fn negotiate(&self, requested: Option<&str>) -> String {
        requested
            .into_iter()
            .flat_map(|header| header.split(','))
            .filter_map(|tag| {
                let tag = tag.split(';').next()?.trim();
                let primary = tag.split(['-', '_']).next()?.trim().to_lowercase();
                (!primary.is_empty()).then_some(primary)
            })
            .find(|language| self.supports(language))
            .unwrap_or_else(|| self.default_language.clone())
    }

    /// Raw lookup in one language. `None` when missing, not a string, or empty.
    pub fn lookup(&self, key: &str, language: &str) -> Option<&str> {
        let mut node = self.tables.get(language)?;
        for segment in key.split('.') {
            node = node.get(segment)?;
        }
        node.as_str().filter(|s| !s.is_empty())
    }

    /// Resolve `key` in the default language.
    pub fn get(&self, key: &str) -> String {
        self.translate(key, None, &Properties::new())
    }

    /// Resolve `key` in `language` (or the default).
    pub fn get_in(&self, key: &str, language: Option<&str>) -> String {
        self.translate(key, language, &Properties::new())
    }

    /// Resolve `key` and interpolate `properties`. Always non-empty.
    pub fn translate(&self, key: &str, language: Option<&str>, properties: &Properties) -> String {
        let language = language.unwrap_or(self.default_language.as_str());
        let template = self
            .lookup(key, language)
            .or_else(|| self.lookup(key, &self.default_language))
            .or_else(|| {
                tracing::debug!(key, language, "Unresolved message key");
                self.lookup(DEFAULT_MESSAGE_KEY, language)
            })
            .or_else(|| self.lookup(DEFAULT_MESSAGE_KEY, &self.default_language))
            .unwrap_or(if key.trim().is_empty() { PLACEHOLDER_MESSAGE } else { key });

        let message = interpolate(template, properties);
        if message.trim().is_empty() {
            PLACEHOLDER_MESSAGE.to_string()
        } else {
            message
        }
    }

    /// Translate raw violations into `{field, message}` entries, keeping
    /// their order and field association.
    pub fn request_errors_message(
        &self,
        violations: &[RequestViolation],
        language: Option<&str>,
    ) -> Vec<FieldError> {
        violations
            .iter()
            .map(|violation| {
                let mut properties = violation.params.clone();
                properties.insert("field".into(), Value::String(violation.field.clone()));
                if let Some(value) = &violation.value {
                    properties.insert("value".into(), value.clone());
                }
                FieldError {
                    field: violation.field.clone(),
                    message: self.translate(&violation.message_key, language, &properties),
                }
            })
            .collect()
    }
}

fn builtin_tables() -> HashMap<String, Value> {
    BUILTIN_LOCALES
        .iter()
        .filter_map(|(language, source)| match serde_json::from_str::<Value>(source) {
            Ok(table) => Some((language.to_string(), table)),
            Err(e) => {
                tracing::error!(language, error = %e, "Skipping unparseable locale table");
                None
            }
        })
        .collect()
}

/// Replace `{name}` tokens with property values; unknown tokens are kept.
fn interpolate(template: &str, properties: &Properties) -> String {
    if properties.is_empty() {
        return template.to_string();
    }
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| match properties.get(&caps[1]) {
            Some(value) => display_value(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display_value).collect::<Vec<_>>().join(", "),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn service() -> MessageService {
        MessageService::new("en")
    }

    #[test]
    fn builtin_tables_load() {
        assert_eq!(service().languages(), vec!["en", "id"]);
    }

    #[test]
    fn resolves_dotted_key() {
        let messages = service();
        assert_eq!(
            messages.get("http.clientError.unprocessableEntity"),
            messages
                .lookup("http.clientError.unprocessableEntity", "en")
                .unwrap()
        );
    }

    #[test]
    fn unknown_key_falls_back_to_default_message() {
        let messages = service();
        let fallback = messages.get(DEFAULT_MESSAGE_KEY);
        assert_eq!(messages.get("no.such.key"), fallback);
        assert_eq!(messages.get(""), fallback);
        assert_eq!(messages.get("http"), fallback, "non-leaf keys do not resolve");
    }

    #[test]
    fn lookup_is_total_even_without_tables() {
        let messages = MessageService::from_tables("en", HashMap::new());
        assert_eq!(messages.get("anything"), "anything");
        assert_eq!(messages.get(" "), PLACEHOLDER_MESSAGE);
    }

    #[test]
    fn empty_entries_fall_back() {
        let tables = HashMap::from([(
            "en".to_string(),
            json!({ "user": { "list": "" }, "response": { "default": "Done" } }),
        )]);
        let messages = MessageService::from_tables("en", tables);
        assert_eq!(messages.lookup("user.list", "en"), None);
        assert_eq!(messages.get("user.list"), "Done");
    }

    #[test]
    fn missing_translation_falls_back_to_default_language() {
        let tables = HashMap::from([
            ("en".to_string(), json!({ "user": { "get": "Got user" } })),
            ("id".to_string(), json!({})),
        ]);
        let messages = MessageService::from_tables("en", tables);
        assert_eq!(messages.get_in("user.get", Some("id")), "Got user");
    }

    #[test]
    fn negotiates_language_from_header() {
        let messages = service();
        assert_eq!(messages.negotiate(Some("id-ID,id;q=0.9,en;q=0.8")), "id");
        assert_eq!(messages.negotiate(Some("fr-FR, en;q=0.5")), "en");
        assert_eq!(messages.negotiate(Some("fr")), "en");
        assert_eq!(messages.negotiate(None), "en");
    }

    #[test]
    fn interpolates_properties() {
        let tables = HashMap::from([(
            "en".to_string(),
            json!({ "request": { "minLength": "{field} needs {min}+ chars, {other}" } }),
        )]);
        let messages = MessageService::from_tables("en", tables);
        let props = Properties::from([
            ("field".to_string(), json!("name")),
            ("min".to_string(), json!(3)),
        ]);
        assert_eq!(
            messages.translate("request.minLength", None, &props),
            "name needs 3+ chars, {other}"
        );
    }

    #[test]
    fn request_errors_keep_order_and_fields() {
        let messages = service();
        let violations = vec![
            RequestViolation::new("name", "isNotEmpty"),
            RequestViolation::new("email", "isEmail").with_value(json!("nope")),
            RequestViolation::new("lang", "isIn").with_param("values", json!(["en", "id"])),
        ];
        let errors = messages.request_errors_message(&violations, None);
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "lang"]);
        assert!(errors[0].message.contains("name"));
        assert!(errors[2].message.contains("en, id"));
        assert!(errors.iter().all(|e| !e.message.is_empty()));
    }
}
