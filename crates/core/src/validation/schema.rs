//! Schema descriptors and the pure-logic evaluator behind the validation pipe.
//!
//! A [`Schema`] lists the fields a request accepts, in declaration order.
//! Evaluation coerces the payload into the declared types, applies string
//! transforms, then checks every rule of every field and every cross-field
//! rule, collecting all violations instead of stopping at the first one.

use regex::Regex;
use serde_json::{Map, Value};
use validator::ValidateEmail;

use super::violation::RequestViolation;

/// Placeholder written over secret values in trace output.
const REDACTED: &str = "***";

/// The JSON type a field must have after coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    IntegerArray,
    StringArray,
}

impl FieldKind {
    /// Constraint reported when a value does not have this type.
    fn type_constraint(self) -> &'static str {
        match self {
            FieldKind::String => "isString",
            FieldKind::Integer => "isInt",
            FieldKind::Number => "isNumber",
            FieldKind::Boolean => "isBoolean",
            FieldKind::Object => "isObject",
            FieldKind::Array | FieldKind::IntegerArray | FieldKind::StringArray => "isArray",
        }
    }
}

/// Normalization applied to string values (and string array elements)
/// before rules run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Trim,
    Lowercase,
}

/// A value-level constraint on a single field.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Minimum character count for strings, item count for arrays.
    MinLength(usize),
    /// Maximum character count for strings, item count for arrays.
    MaxLength(usize),
    Min(f64),
    Max(f64),
    /// Allowed values; for arrays every element must be allowed.
    OneOf(Vec<Value>),
    Email,
    Pattern {
        regex: &'static Regex,
        constraint: &'static str,
    },
    Check {
        constraint: &'static str,
        check: fn(&Value) -> bool,
    },
}

/// One field of a [`Schema`].
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<Value>,
    pub transforms: Vec<Transform>,
    pub rules: Vec<Rule>,
    /// Masked in trace output and never echoed back in violations.
    pub secret: bool,
}

impl FieldSpec {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            transforms: Vec::new(),
            rules: Vec::new(),
            secret: false,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn number(name: &'static str) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn integer_array(name: &'static str) -> Self {
        Self::new(name, FieldKind::IntegerArray)
    }

    pub fn string_array(name: &'static str) -> Self {
        Self::new(name, FieldKind::StringArray)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value inserted when an optional field is absent.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn secret(mut self) -> Self {
        self.secret = true;
        self
    }

    pub fn trim(mut self) -> Self {
        self.transforms.push(Transform::Trim);
        self
    }

    pub fn lowercase(mut self) -> Self {
        self.transforms.push(Transform::Lowercase);
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn min_length(self, min: usize) -> Self {
        self.rule(Rule::MinLength(min))
    }

    pub fn max_length(self, max: usize) -> Self {
        self.rule(Rule::MaxLength(max))
    }

    pub fn min(self, min: f64) -> Self {
        self.rule(Rule::Min(min))
    }

    pub fn max(self, max: f64) -> Self {
        self.rule(Rule::Max(max))
    }

    pub fn one_of<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.rule(Rule::OneOf(values.into_iter().map(Into::into).collect()))
    }

    pub fn email(self) -> Self {
        self.rule(Rule::Email)
    }

    pub fn pattern(self, regex: &'static Regex, constraint: &'static str) -> Self {
        self.rule(Rule::Pattern { regex, constraint })
    }

    pub fn check(self, constraint: &'static str, check: fn(&Value) -> bool) -> Self {
        self.rule(Rule::Check { constraint, check })
    }
}

/// A rule spanning several fields, checked against the coerced object.
///
/// Skipped when `field` already has a violation.
#[derive(Debug, Clone)]
pub struct CrossFieldRule {
    pub field: &'static str,
    pub constraint: &'static str,
    pub check: fn(&Map<String, Value>) -> bool,
}

/// Description of a request payload.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    cross_field: Vec<CrossFieldRule>,
    coerce_strings: bool,
}

impl Schema {
    /// Schema for JSON bodies: values must already have their declared types.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema for query strings: numeric and boolean fields accept their
    /// string forms, and empty optional strings count as absent.
    pub fn query() -> Self {
        Self {
            coerce_strings: true,
            ..Self::default()
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn cross_field(
        mut self,
        field: &'static str,
        constraint: &'static str,
        check: fn(&Map<String, Value>) -> bool,
    ) -> Self {
        self.cross_field.push(CrossFieldRule {
            field,
            constraint,
            check,
        });
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Coerce and check `payload`.
    ///
    /// Returns the coerced object (declared fields only, defaults filled in)
    /// or every violation found, in field declaration order.
    pub fn evaluate(&self, payload: &Value) -> Result<Map<String, Value>, Vec<RequestViolation>> {
        let empty = Map::new();
        let input = match payload {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(vec![RequestViolation::new("payload", "isObject")]),
        };

        let mut output = Map::new();
        let mut violations = Vec::new();

        for spec in &self.fields {
            match self.evaluate_field(spec, input.get(spec.name)) {
                Ok(Some(value)) => {
                    output.insert(spec.name.to_string(), value);
                }
                Ok(None) => {}
                Err(mut found) => violations.append(&mut found),
            }
        }

        for rule in &self.cross_field {
            if violations.iter().any(|v| v.field == rule.field) {
                continue;
            }
            if !(rule.check)(&output) {
                violations.push(RequestViolation::new(rule.field, rule.constraint));
            }
        }

        if violations.is_empty() {
            Ok(output)
        } else {
            Err(violations)
        }
    }

    /// Copy of `payload` with secret fields masked, for trace output.
    pub fn redact(&self, payload: &Value) -> Value {
        let mut redacted = payload.clone();
        if let Value::Object(map) = &mut redacted {
            for spec in self.fields.iter().filter(|s| s.secret) {
                if let Some(value) = map.get_mut(spec.name) {
                    *value = Value::String(REDACTED.to_string());
                }
            }
        }
        redacted
    }

    fn evaluate_field(
        &self,
        spec: &FieldSpec,
        raw: Option<&Value>,
    ) -> Result<Option<Value>, Vec<RequestViolation>> {
        let raw = match raw {
            None | Some(Value::Null) => return missing(spec),
            Some(v) => v,
        };

        let mut value = coerce(spec.kind, raw, self.coerce_strings).map_err(|constraint| {
            vec![violation_for(spec, constraint, Some(raw))]
        })?;
        apply_transforms(&spec.transforms, &mut value);

        if matches!(&value, Value::String(s) if s.is_empty()) {
            if spec.required {
                return Err(vec![violation_for(spec, "isNotEmpty", None)]);
            }
            if self.coerce_strings {
                return missing(spec);
            }
        }

        let violations: Vec<_> = spec
            .rules
            .iter()
            .filter_map(|rule| check_rule(spec, rule, &value))
            .collect();

        if violations.is_empty() {
            Ok(Some(value))
        } else {
            Err(violations)
        }
    }
}

fn missing(spec: &FieldSpec) -> Result<Option<Value>, Vec<RequestViolation>> {
    if spec.required {
        Err(vec![violation_for(spec, "isNotEmpty", None)])
    } else {
        Ok(spec.default.clone())
    }
}

fn violation_for(spec: &FieldSpec, constraint: &str, value: Option<&Value>) -> RequestViolation {
    let violation = RequestViolation::new(spec.name, constraint);
    match value {
        Some(v) if !spec.secret => violation.with_value(v.clone()),
        _ => violation,
    }
}

fn coerce(kind: FieldKind, value: &Value, coerce_strings: bool) -> Result<Value, &'static str> {
    let coerced = match kind {
        FieldKind::String => value.is_string().then(|| value.clone()),
        FieldKind::Integer => coerce_integer(value, coerce_strings),
        FieldKind::Number => coerce_number(value, coerce_strings),
        FieldKind::Boolean => coerce_boolean(value, coerce_strings),
        FieldKind::Object => value.is_object().then(|| value.clone()),
        FieldKind::Array => value.is_array().then(|| value.clone()),
        FieldKind::IntegerArray => {
            let items = value.as_array().ok_or("isArray")?;
            let coerced: Option<Vec<Value>> = items
                .iter()
                .map(|item| coerce_integer(item, coerce_strings))
                .collect();
            return coerced.map(Value::Array).ok_or("eachInt");
        }
        FieldKind::StringArray => {
            let items = value.as_array().ok_or("isArray")?;
            if !items.iter().all(Value::is_string) {
                return Err("eachString");
            }
            Some(value.clone())
        }
    };
    coerced.ok_or(kind.type_constraint())
}

fn coerce_integer(value: &Value, coerce_strings: bool) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() => Some(value.clone()),
        Value::Number(n) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Value::from(f as i64)),
        Value::String(s) if coerce_strings => s.trim().parse::<i64>().ok().map(Value::from),
        _ => None,
    }
}

fn coerce_number(value: &Value, coerce_strings: bool) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) if coerce_strings => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        _ => None,
    }
}

fn coerce_boolean(value: &Value, coerce_strings: bool) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::String(s) if coerce_strings => match s.trim() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn apply_transforms(transforms: &[Transform], value: &mut Value) {
    let apply = |s: &mut String| {
        for transform in transforms {
            *s = match transform {
                Transform::Trim => s.trim().to_string(),
                Transform::Lowercase => s.to_lowercase(),
            };
        }
    };
    match value {
        Value::String(s) => apply(s),
        Value::Array(items) => {
            for item in items {
                if let Value::String(s) = item {
                    apply(s);
                }
            }
        }
        _ => {}
    }
}

fn check_rule(spec: &FieldSpec, rule: &Rule, value: &Value) -> Option<RequestViolation> {
    let failed = |constraint: &str| Some(violation_for(spec, constraint, Some(value)));

    match rule {
        Rule::MinLength(min) => match length_of(value) {
            Some((len, is_array)) if len < *min => {
                failed(if is_array { "arrayMinSize" } else { "minLength" })
                    .map(|v| v.with_param("min", *min))
            }
            _ => None,
        },
        Rule::MaxLength(max) => match length_of(value) {
            Some((len, is_array)) if len > *max => {
                failed(if is_array { "arrayMaxSize" } else { "maxLength" })
                    .map(|v| v.with_param("max", *max))
            }
            _ => None,
        },
        Rule::Min(min) => match value.as_f64() {
            Some(n) if n < *min => failed("min").map(|v| v.with_param("min", number_value(*min))),
            _ => None,
        },
        Rule::Max(max) => match value.as_f64() {
            Some(n) if n > *max => failed("max").map(|v| v.with_param("max", number_value(*max))),
            _ => None,
        },
        Rule::OneOf(allowed) => {
            let ok = match value {
                Value::Array(items) => items.iter().all(|item| allowed.contains(item)),
                other => allowed.contains(other),
            };
            if ok {
                None
            } else {
                failed("isIn").map(|v| v.with_param("values", Value::Array(allowed.clone())))
            }
        }
        Rule::Email => match value.as_str() {
            Some(s) if !s.validate_email() => failed("isEmail"),
            _ => None,
        },
        Rule::Pattern { regex, constraint } => match value.as_str() {
            Some(s) if !regex.is_match(s) => failed(*constraint),
            _ => None,
        },
        Rule::Check { constraint, check } => {
            if check(value) {
                None
            } else {
                failed(*constraint)
            }
        }
    }
}

/// `(length, is_array)` for strings (in characters) and arrays.
fn length_of(value: &Value) -> Option<(usize, bool)> {
    match value {
        Value::String(s) => Some((s.chars().count(), false)),
        Value::Array(items) => Some((items.len(), true)),
        _ => None,
    }
}

/// Render whole floats as integers so `{min}` reads `1`, not `1.0`.
fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use serde_json::json;

    use super::*;

    static CODE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[a-z]+(\.[a-z]+)*$").expect("valid regex"));

    fn constraints(violations: &[RequestViolation]) -> Vec<(&str, &str)> {
        violations
            .iter()
            .map(|v| (v.field.as_str(), v.constraint.as_str()))
            .collect()
    }

    #[test]
    fn empty_payload_reports_required_field() {
        let schema = Schema::new().field(FieldSpec::string("name").required());
        let errors = schema.evaluate(&json!({})).unwrap_err();
        assert_eq!(constraints(&errors), vec![("name", "isNotEmpty")]);
        assert_eq!(errors[0].message_key, "request.isNotEmpty");
    }

    #[test]
    fn collects_every_violation_in_declaration_order() {
        let schema = Schema::new()
            .field(FieldSpec::string("email").required().email())
            .field(FieldSpec::string("name").required().min_length(3).max_length(2))
            .field(FieldSpec::integer("age").min(18.0));
        let errors = schema
            .evaluate(&json!({ "email": "nope", "name": "ab", "age": "x" }))
            .unwrap_err();
        assert_eq!(
            constraints(&errors),
            vec![
                ("email", "isEmail"),
                ("name", "minLength"),
                ("age", "isInt"),
            ]
        );
        assert_eq!(errors[1].params["min"], json!(3));
    }

    #[test]
    fn whitespace_only_required_string_is_empty_after_trim() {
        let schema = Schema::new().field(FieldSpec::string("name").required().trim());
        let errors = schema.evaluate(&json!({ "name": "   " })).unwrap_err();
        assert_eq!(constraints(&errors), vec![("name", "isNotEmpty")]);
    }

    #[test]
    fn transforms_normalize_before_rules() {
        let schema = Schema::new().field(
            FieldSpec::string("name")
                .required()
                .trim()
                .lowercase()
                .pattern(&CODE_RE, "isCode"),
        );
        let out = schema.evaluate(&json!({ "name": "  User.Read " })).unwrap();
        assert_eq!(out["name"], json!("user.read"));
    }

    #[test]
    fn query_schema_coerces_strings() {
        let schema = Schema::query()
            .field(FieldSpec::integer("page").default_value(1))
            .field(FieldSpec::boolean("active"))
            .field(FieldSpec::number("ratio"))
            .field(FieldSpec::string("search"));
        let out = schema
            .evaluate(&json!({ "page": "3", "active": "false", "ratio": "0.5", "search": "" }))
            .unwrap();
        assert_eq!(out["page"], json!(3));
        assert_eq!(out["active"], json!(false));
        assert_eq!(out["ratio"], json!(0.5));
        assert!(!out.contains_key("search"), "empty optional query string is absent");
    }

    #[test]
    fn body_schema_does_not_coerce_strings() {
        let schema = Schema::new().field(FieldSpec::integer("page"));
        let errors = schema.evaluate(&json!({ "page": "3" })).unwrap_err();
        assert_eq!(constraints(&errors), vec![("page", "isInt")]);
    }

    #[test]
    fn defaults_fill_absent_optional_fields() {
        let schema = Schema::query().field(FieldSpec::integer("perPage").default_value(10));
        let out = schema.evaluate(&Value::Null).unwrap();
        assert_eq!(out["perPage"], json!(10));
    }

    #[test]
    fn unknown_fields_are_stripped() {
        let schema = Schema::new().field(FieldSpec::string("name"));
        let out = schema
            .evaluate(&json!({ "name": "a", "isAdmin": true }))
            .unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn non_object_payload_is_rejected() {
        let schema = Schema::new().field(FieldSpec::string("name"));
        let errors = schema.evaluate(&json!([1, 2])).unwrap_err();
        assert_eq!(constraints(&errors), vec![("payload", "isObject")]);
    }

    #[test]
    fn integer_array_elements_are_checked() {
        let schema = Schema::new().field(FieldSpec::integer_array("permissions").required());
        let errors = schema
            .evaluate(&json!({ "permissions": [1, "two"] }))
            .unwrap_err();
        assert_eq!(constraints(&errors), vec![("permissions", "eachInt")]);

        let out = schema.evaluate(&json!({ "permissions": [1, 2.0] })).unwrap();
        assert_eq!(out["permissions"], json!([1, 2]));
    }

    #[test]
    fn integers_beyond_i64_are_type_violations() {
        let schema = Schema::new()
            .field(FieldSpec::integer("roleId").required())
            .field(FieldSpec::integer_array("permissionIds"));
        let errors = schema
            .evaluate(&json!({
                "roleId": 18446744073709551615u64,
                "permissionIds": [1, 9223372036854775808u64],
            }))
            .unwrap_err();
        assert_eq!(
            constraints(&errors),
            vec![("roleId", "isInt"), ("permissionIds", "eachInt")]
        );

        let out = schema.evaluate(&json!({ "roleId": i64::MAX })).unwrap();
        assert_eq!(out["roleId"], json!(i64::MAX));
    }

    #[test]
    fn one_of_reports_allowed_values() {
        let schema = Schema::new().field(FieldSpec::string("lang").one_of(["en", "id"]));
        let errors = schema.evaluate(&json!({ "lang": "fr" })).unwrap_err();
        assert_eq!(constraints(&errors), vec![("lang", "isIn")]);
        assert_eq!(errors[0].params["values"], json!(["en", "id"]));
    }

    #[test]
    fn cross_field_rule_runs_on_coerced_output() {
        let schema = Schema::new()
            .field(FieldSpec::string("oldPassword").required())
            .field(FieldSpec::string("newPassword").required())
            .cross_field("newPassword", "notSameAs", |m| {
                m.get("oldPassword") != m.get("newPassword")
            });
        let errors = schema
            .evaluate(&json!({ "oldPassword": "abc123", "newPassword": "abc123" }))
            .unwrap_err();
        assert_eq!(constraints(&errors), vec![("newPassword", "notSameAs")]);
    }

    #[test]
    fn cross_field_rule_skipped_when_field_already_failed() {
        let schema = Schema::new()
            .field(FieldSpec::string("newPassword").required())
            .cross_field("newPassword", "notSameAs", |_| false);
        let errors = schema.evaluate(&json!({})).unwrap_err();
        assert_eq!(constraints(&errors), vec![("newPassword", "isNotEmpty")]);
    }

    #[test]
    fn secret_values_are_not_echoed() {
        let schema = Schema::new().field(FieldSpec::string("password").secret().min_length(8));
        let errors = schema.evaluate(&json!({ "password": "short" })).unwrap_err();
        assert!(errors[0].value.is_none());

        let redacted = schema.redact(&json!({ "password": "hunter2", "email": "a@b.c" }));
        assert_eq!(redacted["password"], json!("***"));
        assert_eq!(redacted["email"], json!("a@b.c"));
    }
}
