//! Example value synthesis.
//!
//! Produces a representative instance of a schema, preferring author-provided
//! values (`example`, `enum`, `default`) over generated ones. Recursion through
//! arrays, objects and references is truncated at a depth limit so that
//! self-referencing schemas still terminate.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

use crate::registry::SchemaRegistry;
use crate::types::{
    ArrayRules, NumericRules, ObjectRules, Schema, SchemaKind, StringRules, DEFAULT_MAX_DEPTH,
};

/// Placeholder used for strings with no format, enum or default.
const STRING_PLACEHOLDER: &str = "string";

/// Optional properties included beyond the required ones.
const MAX_OPTIONAL_PROPERTIES: usize = 2;

/// Upper limit on synthesized array length, whatever `minItems` asks for.
const MAX_SYNTHESIZED_ITEMS: usize = 3;

/// Options for example synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Depth at which arrays and objects are truncated to empty values.
    pub max_depth: usize,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SynthesisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Synthesize an example with default options.
///
/// Returns `None` only when the schema is an unresolved reference.
pub fn synthesize(schema: &Schema, registry: &SchemaRegistry) -> Option<Value> {
    synthesize_with(schema, registry, &SynthesisOptions::default())
}

/// Synthesize an example with explicit options.
pub fn synthesize_with(
    schema: &Schema,
    registry: &SchemaRegistry,
    options: &SynthesisOptions,
) -> Option<Value> {
    synthesize_at(schema, registry, 0, options.max_depth)
}

/// Synthesize starting from an explicit depth.
///
/// Selection order, first match wins: `example`, reference, string format,
/// first `enum` member, `default`, then a kind-specific fallback.
pub fn synthesize_at(
    schema: &Schema,
    registry: &SchemaRegistry,
    depth: usize,
    max_depth: usize,
) -> Option<Value> {
    if let Some(example) = &schema.example {
        return Some(example.clone());
    }

    if let Some(reference) = &schema.reference {
        let Some(resolved) = registry.resolve(reference) else {
            tracing::debug!(reference = %reference, "unresolved reference, no example");
            return None;
        };
        return synthesize_at(resolved, registry, depth + 1, max_depth);
    }

    if let SchemaKind::String(rules) = &schema.kind {
        if let Some(value) = rules.format.as_deref().and_then(format_example) {
            return Some(Value::String(value));
        }
    }

    if let Some(first) = schema.enumeration.as_ref().and_then(|e| e.first()) {
        return Some(first.clone());
    }

    if let Some(default) = &schema.default {
        return Some(default.clone());
    }

    let value = match &schema.kind {
        SchemaKind::String(rules) => Value::String(placeholder_string(rules)),
        SchemaKind::Number(rules) => Value::Number(number_in(rules)),
        SchemaKind::Integer(rules) => Value::from(integer_in(rules)),
        SchemaKind::Boolean => Value::Bool(false),
        SchemaKind::Array(rules) => array_example(rules, registry, depth, max_depth),
        SchemaKind::Object(rules) => object_example(rules, registry, depth, max_depth),
        SchemaKind::Unspecified => Value::Object(Map::new()),
    };
    Some(value)
}

/// Canned values for recognized string formats.
fn format_example(format: &str) -> Option<String> {
    let value = match format {
        "email" => "user@example.com".to_string(),
        "date" => Utc::now().format("%Y-%m-%d").to_string(),
        "date-time" => Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "uri" | "url" => "https://example.com".to_string(),
        "uuid" => "3fa85f64-5717-4562-b3fc-2c963f66afa6".to_string(),
        "hostname" => "example.com".to_string(),
        "ipv4" => "192.0.2.1".to_string(),
        "ipv6" => "2001:db8::1".to_string(),
        "byte" | "base64" => "ZXhhbXBsZQ==".to_string(),
        "password" => "********".to_string(),
        _ => return None,
    };
    Some(value)
}

fn placeholder_string(rules: &StringRules) -> String {
    let mut value = STRING_PLACEHOLDER.to_string();
    if let Some(min) = rules.min_length {
        while value.chars().count() < min {
            value.push('x');
        }
    }
    if let Some(max) = rules.max_length {
        value = value.chars().take(max).collect();
    }
    value
}

fn integer_in(rules: &NumericRules) -> i64 {
    match (rules.minimum, rules.maximum) {
        (Some(min), _) => {
            let floor = min.value.ceil() as i64;
            if min.admits_from_below(floor as f64) {
                floor
            } else {
                floor + 1
            }
        }
        (None, Some(max)) if !max.admits_from_above(0.0) => {
            let ceiling = max.value.floor() as i64;
            if max.admits_from_above(ceiling as f64) {
                ceiling
            } else {
                ceiling - 1
            }
        }
        _ => 0,
    }
}

fn number_in(rules: &NumericRules) -> Number {
    let value = match (rules.minimum, rules.maximum) {
        (Some(min), Some(max)) if min.exclusive => (min.value + max.value) / 2.0,
        (Some(min), _) if min.exclusive => min.value + 1.0,
        (Some(min), _) => min.value,
        (None, Some(max)) if !max.admits_from_above(0.0) => {
            if max.exclusive {
                max.value - 1.0
            } else {
                max.value
            }
        }
        _ => 0.0,
    };

    if value.fract() == 0.0 && value.abs() < 9.0e15 {
        Number::from(value as i64)
    } else {
        Number::from_f64(value).unwrap_or_else(|| Number::from(0))
    }
}

fn array_example(
    rules: &ArrayRules,
    registry: &SchemaRegistry,
    depth: usize,
    max_depth: usize,
) -> Value {
    if depth >= max_depth || rules.max_items == Some(0) {
        return Value::Array(Vec::new());
    }

    let item = match &rules.items {
        Some(items) => synthesize_at(items, registry, depth + 1, max_depth),
        None => Some(Value::String(STRING_PLACEHOLDER.to_string())),
    };

    match item {
        Some(item) => {
            let count = rules.min_items.unwrap_or(1).clamp(1, MAX_SYNTHESIZED_ITEMS);
            Value::Array(vec![item; count])
        }
        None => Value::Array(Vec::new()),
    }
}

fn object_example(
    rules: &ObjectRules,
    registry: &SchemaRegistry,
    depth: usize,
    max_depth: usize,
) -> Value {
    let mut result = Map::new();
    if depth >= max_depth {
        return Value::Object(result);
    }

    let mut optional_taken = 0;
    for (name, prop_schema) in &rules.properties {
        if !rules.is_required(name) {
            if optional_taken >= MAX_OPTIONAL_PROPERTIES {
                continue;
            }
            optional_taken += 1;
        }

        if let Some(value) = synthesize_at(prop_schema, registry, depth + 1, max_depth) {
            result.insert(name.clone(), value);
        }
    }

    Value::Object(result)
}
