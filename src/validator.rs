//! Value and parameter validation against schemas.

use std::collections::HashMap;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::endpoint::Parameter;
use crate::error::{ErrorKind, ValidationError};
use crate::registry::SchemaRegistry;
use crate::types::{
    coerce_to_text, enum_contains, ArrayRules, Bound, FieldPath, NumericRules, ObjectRules,
    RuntimeType, Schema, SchemaKind, StringRules,
};

/// Validate a value against a schema, collecting every error.
///
/// Never fails: an unresolved reference means there is nothing to check, and
/// a malformed `pattern` in the schema is logged and skipped. A top-level type
/// mismatch produces exactly one error and no nested checks.
pub fn validate(
    value: &Value,
    schema: &Schema,
    path: &FieldPath,
    registry: &SchemaRegistry,
) -> Vec<ValidationError> {
    let mut walk = Walk {
        registry,
        patterns: PatternCache::default(),
        errors: Vec::new(),
    };
    walk.value(value, schema, path);
    walk.errors
}

/// Parse `text` as JSON and validate it.
///
/// Malformed text yields a single `json` error at the root.
pub fn validate_json_text(
    text: &str,
    schema: &Schema,
    registry: &SchemaRegistry,
) -> Vec<ValidationError> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => validate(&value, schema, &FieldPath::root(), registry),
        Err(e) => vec![ValidationError::new(
            FieldPath::root(),
            ErrorKind::Json,
            format!("Invalid JSON: {}", e),
        )],
    }
}

/// Check whether a value's runtime type is acceptable for a schema's kind.
///
/// Returns the mismatch as `(declared, actual)` when it is not.
pub fn type_mismatch(value: &Value, kind: &SchemaKind) -> Option<(&'static str, RuntimeType)> {
    let actual = RuntimeType::of(value);
    if kind.accepts(actual) {
        None
    } else {
        Some((kind.name(), actual))
    }
}

/// State for one validation traversal.
struct Walk<'r> {
    registry: &'r SchemaRegistry,
    patterns: PatternCache,
    errors: Vec<ValidationError>,
}

impl Walk<'_> {
    fn value(&mut self, value: &Value, schema: &Schema, path: &FieldPath) {
        if let Some(reference) = &schema.reference {
            match self.registry.resolve(reference) {
                Some(resolved) => self.value(value, resolved, path),
                None => {
                    tracing::debug!(reference = %reference, "unresolved reference, skipping checks")
                }
            }
            return;
        }

        if value.is_null() {
            return;
        }

        if let Some((declared, actual)) = type_mismatch(value, &schema.kind) {
            self.errors.push(ValidationError::new(
                path.clone(),
                ErrorKind::Type,
                format!("Expected {}, got {}", declared, actual),
            ));
            return;
        }

        match &schema.kind {
            SchemaKind::String(rules) => {
                if let Value::String(s) = value {
                    self.string(s, rules, path);
                }
                check_enum(value, schema, path, &mut self.errors);
            }
            SchemaKind::Number(rules) | SchemaKind::Integer(rules) => {
                if let Some(x) = value.as_f64() {
                    check_numeric(x, rules, path, &mut self.errors);
                }
                check_enum(value, schema, path, &mut self.errors);
            }
            SchemaKind::Array(rules) => {
                if let Value::Array(items) = value {
                    self.array(items, rules, path);
                }
            }
            SchemaKind::Object(rules) => {
                if let Value::Object(map) = value {
                    self.object(map, rules, path);
                }
            }
            SchemaKind::Boolean | SchemaKind::Unspecified => {}
        }
    }

    fn string(&mut self, s: &str, rules: &StringRules, path: &FieldPath) {
        if let Some(pattern) = &rules.pattern {
            if let Some(false) = self.patterns.matches(pattern, s) {
                self.errors.push(ValidationError::new(
                    path.clone(),
                    ErrorKind::Pattern,
                    format!("Value does not match pattern {}", pattern),
                ));
            }
        }

        let len = s.chars().count();
        if let Some(min) = rules.min_length {
            if len < min {
                self.errors.push(ValidationError::new(
                    path.clone(),
                    ErrorKind::Min,
                    format!("Must be at least {} characters", min),
                ));
            }
        }
        if let Some(max) = rules.max_length {
            if len > max {
                self.errors.push(ValidationError::new(
                    path.clone(),
                    ErrorKind::Max,
                    format!("Must be at most {} characters", max),
                ));
            }
        }
    }

    fn array(&mut self, items: &[Value], rules: &ArrayRules, path: &FieldPath) {
        if let Some(min) = rules.min_items {
            if items.len() < min {
                self.errors.push(ValidationError::new(
                    path.clone(),
                    ErrorKind::Min,
                    format!("Must contain at least {} items", min),
                ));
            }
        }
        if let Some(max) = rules.max_items {
            if items.len() > max {
                self.errors.push(ValidationError::new(
                    path.clone(),
                    ErrorKind::Max,
                    format!("Must contain at most {} items", max),
                ));
            }
        }

        if let Some(item_schema) = &rules.items {
            for (i, item) in items.iter().enumerate() {
                self.value(item, item_schema, &path.index(i));
            }
        }
    }

    fn object(&mut self, map: &Map<String, Value>, rules: &ObjectRules, path: &FieldPath) {
        for name in &rules.required {
            if !map.contains_key(name) {
                self.errors.push(ValidationError::new(
                    path.key(name.as_str()),
                    ErrorKind::Required,
                    format!("{} is required", name),
                ));
            }
        }

        for (name, prop_schema) in &rules.properties {
            if let Some(prop_value) = map.get(name) {
                self.value(prop_value, prop_schema, &path.key(name.as_str()));
            }
        }
    }
}

fn check_numeric(
    x: f64,
    rules: &NumericRules,
    path: &FieldPath,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(min) = rules.minimum {
        if !min.admits_from_below(x) {
            errors.push(ValidationError::new(
                path.clone(),
                ErrorKind::Min,
                format!("Must be {} {}", lower_relation(&min), format_bound(min.value)),
            ));
        }
    }
    if let Some(max) = rules.maximum {
        if !max.admits_from_above(x) {
            errors.push(ValidationError::new(
                path.clone(),
                ErrorKind::Max,
                format!("Must be {} {}", upper_relation(&max), format_bound(max.value)),
            ));
        }
    }
}

fn check_enum(
    value: &Value,
    schema: &Schema,
    path: &FieldPath,
    errors: &mut Vec<ValidationError>,
) {
    if let Some(allowed) = &schema.enumeration {
        if !enum_contains(allowed, value) {
            errors.push(ValidationError::new(
                path.clone(),
                ErrorKind::Enum,
                format!("Must be one of: {}", list_allowed(allowed)),
            ));
        }
    }
}

fn lower_relation(bound: &Bound) -> &'static str {
    if bound.exclusive {
        "greater than"
    } else {
        "at least"
    }
}

fn upper_relation(bound: &Bound) -> &'static str {
    if bound.exclusive {
        "less than"
    } else {
        "at most"
    }
}

/// Patterns compiled during one traversal, keyed by source text.
///
/// A malformed pattern is cached as `None`, so it is logged once and then
/// skipped for every later value.
#[derive(Default)]
struct PatternCache(HashMap<String, Option<Regex>>);

impl PatternCache {
    /// Test a value against a pattern; `None` when the pattern is malformed.
    fn matches(&mut self, pattern: &str, value: &str) -> Option<bool> {
        if !self.0.contains_key(pattern) {
            let compiled = match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(pattern, error = %e, "ignoring invalid pattern in schema");
                    None
                }
            };
            self.0.insert(pattern.to_string(), compiled);
        }
        self.0
            .get(pattern)
            .and_then(Option::as_ref)
            .map(|re| re.is_match(value))
    }
}

fn list_allowed(allowed: &[Value]) -> String {
    allowed
        .iter()
        .map(coerce_to_text)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_bound(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// Outcome of [`validate_parameter`]: valid, or the first failure found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterCheck {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl ParameterCheck {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
            kind: None,
        }
    }

    pub fn invalid(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
            kind: Some(kind),
        }
    }
}

/// Validate a single parameter value, stopping at the first failure.
///
/// Absent, `null`, `""` and `[]` all count as empty. Checks run in order:
/// type, enum, pattern, length, numeric bounds. Array values check each
/// element against the `items` schema.
pub fn validate_parameter(parameter: &Parameter, value: Option<&Value>) -> ParameterCheck {
    let value = match value {
        Some(v) if !is_empty_value(v) => v,
        _ if parameter.required => {
            return ParameterCheck::invalid(
                ErrorKind::Required,
                format!("{} is required", parameter.name),
            );
        }
        _ => return ParameterCheck::valid(),
    };

    let mut patterns = PatternCache::default();
    match check_scalar(&parameter.name, value, &parameter.schema, &mut patterns) {
        Some(failure) => failure,
        None => {
            if let (Value::Array(items), Some(item_schema)) = (value, parameter.schema.items()) {
                for item in items {
                    let check = check_scalar(&parameter.name, item, item_schema, &mut patterns);
                    if let Some(failure) = check {
                        return failure;
                    }
                }
            }
            ParameterCheck::valid()
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn check_scalar(
    name: &str,
    value: &Value,
    schema: &Schema,
    patterns: &mut PatternCache,
) -> Option<ParameterCheck> {
    if type_mismatch(value, &schema.kind).is_some() {
        return Some(ParameterCheck::invalid(
            ErrorKind::Type,
            format!("{} must be of type {}", name, schema.kind.name()),
        ));
    }

    if let Some(allowed) = &schema.enumeration {
        if !enum_contains(allowed, value) {
            return Some(ParameterCheck::invalid(
                ErrorKind::Enum,
                format!("{} must be one of: {}", name, list_allowed(allowed)),
            ));
        }
    }

    match (&schema.kind, value) {
        (SchemaKind::String(rules), Value::String(s)) => {
            if let Some(pattern) = &rules.pattern {
                if let Some(false) = patterns.matches(pattern, s) {
                    return Some(ParameterCheck::invalid(
                        ErrorKind::Pattern,
                        format!("{} does not match pattern {}", name, pattern),
                    ));
                }
            }
            let len = s.chars().count();
            if let Some(min) = rules.min_length.filter(|&min| len < min) {
                return Some(ParameterCheck::invalid(
                    ErrorKind::Min,
                    format!("{} must be at least {} characters", name, min),
                ));
            }
            if let Some(max) = rules.max_length.filter(|&max| len > max) {
                return Some(ParameterCheck::invalid(
                    ErrorKind::Max,
                    format!("{} must be at most {} characters", name, max),
                ));
            }
        }
        (SchemaKind::Number(rules) | SchemaKind::Integer(rules), Value::Number(n)) => {
            let x = n.as_f64()?;
            if let Some(min) = rules.minimum.filter(|min| !min.admits_from_below(x)) {
                return Some(ParameterCheck::invalid(
                    ErrorKind::Min,
                    format!(
                        "{} must be {} {}",
                        name,
                        lower_relation(&min),
                        format_bound(min.value)
                    ),
                ));
            }
            if let Some(max) = rules.maximum.filter(|max| !max.admits_from_above(x)) {
                return Some(ParameterCheck::invalid(
                    ErrorKind::Max,
                    format!(
                        "{} must be {} {}",
                        name,
                        upper_relation(&max),
                        format_bound(max.value)
                    ),
                ));
            }
        }
        _ => {}
    }

    None
}
