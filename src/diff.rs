//! Response shape comparison.
//!
//! Walks a schema's declared properties alongside an observed value and
//! classifies each field as matching, missing or extra. Extra fields do not
//! invalidate a response: additive API evolution is expected.

use serde::Serialize;
use serde_json::Value;

use crate::registry::SchemaRegistry;
use crate::types::{FieldPath, RuntimeType, Schema, SchemaKind};
use crate::validator::type_mismatch;

/// A field reported by [`diff`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffField {
    pub path: FieldPath,
    /// Type declared by the schema, when the field is declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
    /// Runtime type of the observed value, when the field is present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_type: Option<RuntimeType>,
}

/// A type mismatch between declared and observed values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiffError {
    pub field: FieldPath,
    pub expected: String,
    pub actual: RuntimeType,
    pub message: String,
}

/// Result of comparing an observed value against a schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDiff {
    /// True iff there are no missing fields and no errors.
    pub valid: bool,
    pub matching_fields: Vec<DiffField>,
    pub extra_fields: Vec<DiffField>,
    pub missing_fields: Vec<DiffField>,
    pub errors: Vec<DiffError>,
}

/// Compare an observed value against a schema.
///
/// Recurses into nested objects and into the first element of arrays.
/// Unresolved references contribute nothing.
pub fn diff(observed: &Value, schema: &Schema, registry: &SchemaRegistry) -> ResponseDiff {
    let mut result = ResponseDiff::default();
    let root = FieldPath::root();

    match resolve(schema, registry) {
        Some(schema) => match type_mismatch(observed, &schema.kind) {
            Some((declared, actual)) => result.errors.push(mismatch(&root, declared, actual)),
            None => walk(observed, schema, &root, registry, &mut result),
        },
        None => tracing::debug!("unresolved root reference, nothing to diff"),
    }

    result.valid = result.missing_fields.is_empty() && result.errors.is_empty();
    result
}

/// Follow references until a concrete schema is reached.
fn resolve<'a>(schema: &'a Schema, registry: &'a SchemaRegistry) -> Option<&'a Schema> {
    match &schema.reference {
        Some(reference) => registry.resolve(reference).and_then(|resolved| {
            if resolved.reference.is_some() {
                resolve(resolved, registry)
            } else {
                Some(resolved)
            }
        }),
        None => Some(schema),
    }
}

fn walk(
    observed: &Value,
    schema: &Schema,
    path: &FieldPath,
    registry: &SchemaRegistry,
    result: &mut ResponseDiff,
) {
    match (&schema.kind, observed) {
        (SchemaKind::Object(rules), Value::Object(map)) => {
            for (name, prop_schema) in &rules.properties {
                let prop_path = path.key(name.as_str());
                let prop_schema = resolve(prop_schema, registry);

                match map.get(name) {
                    Some(value) => {
                        // Unresolved: nothing to check, so the field matches.
                        let Some(prop_schema) = prop_schema else {
                            result.matching_fields.push(DiffField {
                                path: prop_path,
                                declared_type: None,
                                observed_type: Some(RuntimeType::of(value)),
                            });
                            continue;
                        };
                        match type_mismatch(value, &prop_schema.kind) {
                            Some((declared, actual)) => {
                                result.errors.push(mismatch(&prop_path, declared, actual));
                            }
                            None => {
                                result.matching_fields.push(DiffField {
                                    path: prop_path.clone(),
                                    declared_type: Some(prop_schema.kind.name().to_string()),
                                    observed_type: Some(RuntimeType::of(value)),
                                });
                                walk(value, prop_schema, &prop_path, registry, result);
                            }
                        }
                    }
                    None if rules.is_required(name) => {
                        result.missing_fields.push(DiffField {
                            path: prop_path,
                            declared_type: prop_schema.map(|s| s.kind.name().to_string()),
                            observed_type: None,
                        });
                    }
                    None => {}
                }
            }

            for (key, value) in map {
                if rules.property(key).is_none() {
                    result.extra_fields.push(DiffField {
                        path: path.key(key.as_str()),
                        declared_type: None,
                        observed_type: Some(RuntimeType::of(value)),
                    });
                }
            }
        }
        (SchemaKind::Array(rules), Value::Array(items)) => {
            let (Some(first), Some(item_schema)) = (items.first(), rules.items.as_deref()) else {
                return;
            };
            let item_path = path.index(0);
            let Some(item_schema) = resolve(item_schema, registry) else {
                return;
            };
            match type_mismatch(first, &item_schema.kind) {
                Some((declared, actual)) => {
                    result.errors.push(mismatch(&item_path, declared, actual));
                }
                None => walk(first, item_schema, &item_path, registry, result),
            }
        }
        _ => {}
    }
}

fn mismatch(path: &FieldPath, declared: &str, actual: RuntimeType) -> DiffError {
    DiffError {
        field: path.clone(),
        expected: declared.to_string(),
        actual,
        message: format!("Expected {}, got {}", declared, actual),
    }
}
