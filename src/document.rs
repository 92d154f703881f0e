//! Parsing OpenAPI documents into schemas and endpoints.
//!
//! Supports OpenAPI 3.x (`components.schemas`, `requestBody`) and Swagger 2.0
//! (`definitions`, `in: body` parameters). Parsing is lenient: keywords the
//! engine does not interpret are ignored, and malformed values are dropped
//! rather than rejected.

use serde_json::{Map, Value};

use crate::endpoint::{
    Endpoint, Method, Parameter, ParameterLocation, RequestBody, ResponseSpec,
};
use crate::error::LoadError;
use crate::registry::SchemaRegistry;
use crate::types::{
    ArrayRules, Bound, NumericRules, ObjectRules, Schema, SchemaKind, StringRules,
};

/// Content type assumed for Swagger 2.0 body parameters.
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// A parsed OpenAPI document: its named schemas and its operations.
#[derive(Debug, Clone, Default)]
pub struct SpecDocument {
    pub title: Option<String>,
    pub version: Option<String>,
    /// First server URL (`servers[0].url`, or `host` + `basePath` for 2.0).
    pub base_url: Option<String>,
    pub registry: SchemaRegistry,
    pub endpoints: Vec<Endpoint>,
}

impl SpecDocument {
    /// Build a document from its JSON representation.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidDocument` if the root is not an object or it
    /// declares neither `openapi` nor `swagger`.
    pub fn from_value(doc: &Value) -> Result<Self, LoadError> {
        let root = doc.as_object().ok_or_else(|| LoadError::InvalidDocument {
            message: "document root must be an object".to_string(),
        })?;

        if !root.contains_key("openapi") && !root.contains_key("swagger") {
            return Err(LoadError::InvalidDocument {
                message: "missing openapi or swagger version field".to_string(),
            });
        }

        let registry = parse_registry(doc);
        let endpoints = parse_endpoints(doc);
        tracing::debug!(
            schemas = registry.len(),
            endpoints = endpoints.len(),
            "parsed document"
        );

        Ok(Self {
            title: doc
                .pointer("/info/title")
                .and_then(Value::as_str)
                .map(String::from),
            version: doc
                .pointer("/info/version")
                .and_then(Value::as_str)
                .map(String::from),
            base_url: base_url(doc),
            registry,
            endpoints,
        })
    }

    /// Find an endpoint by method and path template.
    pub fn endpoint(&self, method: Method, path: &str) -> Option<&Endpoint> {
        self.endpoints
            .iter()
            .find(|e| e.method == method && e.path == path)
    }

    /// Find an endpoint by `operationId`.
    pub fn operation(&self, operation_id: &str) -> Option<&Endpoint> {
        self.endpoints
            .iter()
            .find(|e| e.operation_id.as_deref() == Some(operation_id))
    }

    /// Look up a named schema, accepting bare names or references.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::UnknownSchema` when nothing resolves.
    pub fn schema(&self, name: &str) -> Result<&Schema, LoadError> {
        self.registry
            .resolve(name)
            .ok_or_else(|| LoadError::UnknownSchema {
                name: name.to_string(),
            })
    }
}

fn parse_registry(doc: &Value) -> SchemaRegistry {
    let defs = doc
        .pointer("/components/schemas")
        .or_else(|| doc.get("definitions"))
        .and_then(Value::as_object);

    defs.map(|defs| {
        defs.iter()
            .map(|(name, def)| (name.clone(), Schema::from_value(def)))
            .collect()
    })
    .unwrap_or_default()
}

fn base_url(doc: &Value) -> Option<String> {
    if let Some(url) = doc.pointer("/servers/0/url").and_then(Value::as_str) {
        return Some(url.trim_end_matches('/').to_string());
    }

    let host = doc.get("host").and_then(Value::as_str)?;
    let scheme = doc
        .pointer("/schemes/0")
        .and_then(Value::as_str)
        .unwrap_or("https");
    let base_path = doc.get("basePath").and_then(Value::as_str).unwrap_or("");
    Some(format!("{}://{}{}", scheme, host, base_path.trim_end_matches('/')))
}

fn parse_endpoints(doc: &Value) -> Vec<Endpoint> {
    let Some(paths) = doc.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut endpoints = Vec::new();
    for (path, item) in paths {
        let Some(item) = item.as_object() else {
            continue;
        };
        let shared = item.get("parameters");

        for method in Method::ALL {
            let Some(op) = item.get(&method.path_item_key()).and_then(Value::as_object) else {
                continue;
            };
            endpoints.push(parse_operation(doc, path, method, shared, op));
        }
    }
    endpoints
}

fn parse_operation(
    doc: &Value,
    path: &str,
    method: Method,
    shared: Option<&Value>,
    op: &Map<String, Value>,
) -> Endpoint {
    let mut endpoint = Endpoint::new(method, path);
    endpoint.operation_id = op
        .get("operationId")
        .and_then(Value::as_str)
        .map(String::from);
    endpoint.summary = op.get("summary").and_then(Value::as_str).map(String::from);

    // Operation-level parameters override path-level ones on (name, in).
    let mut raw_params: Vec<&Value> = Vec::new();
    for source in [shared, op.get("parameters")].into_iter().flatten() {
        for param in source.as_array().into_iter().flatten() {
            let param = deref_component(doc, param);
            let key = param_key(param);
            raw_params.retain(|existing| param_key(existing) != key);
            raw_params.push(param);
        }
    }

    let consumes = op
        .get("consumes")
        .or_else(|| doc.get("consumes"))
        .and_then(|c| c.pointer("/0"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    for param in raw_params {
        match param.get("in").and_then(Value::as_str) {
            Some("body") => {
                endpoint.request_body = Some(RequestBody {
                    required: param.get("required").and_then(Value::as_bool).unwrap_or(false),
                    content: vec![(
                        consumes.to_string(),
                        param.get("schema").map(Schema::from_value).unwrap_or_default(),
                    )],
                });
            }
            _ => {
                if let Some(parameter) = parse_parameter(param) {
                    endpoint.parameters.push(parameter);
                }
            }
        }
    }

    if let Some(body) = op.get("requestBody") {
        let body = deref_component(doc, body);
        endpoint.request_body = Some(RequestBody {
            required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
            content: parse_content(body.get("content")),
        });
    }

    if let Some(responses) = op.get("responses").and_then(Value::as_object) {
        for (status, response) in responses {
            let response = deref_component(doc, response);
            let mut content = parse_content(response.get("content"));
            // Swagger 2.0 puts the schema directly on the response.
            if content.is_empty() {
                if let Some(schema) = response.get("schema") {
                    content.push((DEFAULT_CONTENT_TYPE.to_string(), Schema::from_value(schema)));
                }
            }
            endpoint.responses.push(ResponseSpec {
                status: status.clone(),
                description: response
                    .get("description")
                    .and_then(Value::as_str)
                    .map(String::from),
                content,
            });
        }
    }

    endpoint
}

fn param_key(param: &Value) -> (Option<&str>, Option<&str>) {
    (
        param.get("name").and_then(Value::as_str),
        param.get("in").and_then(Value::as_str),
    )
}

/// Follow a `$ref` to a reusable component (parameter, request body, response).
///
/// Unresolvable references are returned unchanged.
fn deref_component<'a>(doc: &'a Value, value: &'a Value) -> &'a Value {
    match value.get("$ref").and_then(Value::as_str) {
        Some(reference) if reference.starts_with("#/") => {
            let pointer = &reference[1..];
            doc.pointer(pointer).unwrap_or(value)
        }
        _ => value,
    }
}

fn parse_parameter(param: &Value) -> Option<Parameter> {
    let name = param.get("name").and_then(Value::as_str)?;
    let location = ParameterLocation::parse(param.get("in").and_then(Value::as_str)?)?;

    // OpenAPI 3 nests the schema; Swagger 2.0 declares the type inline.
    let schema = match param.get("schema") {
        Some(schema) => Schema::from_value(schema),
        None => Schema::from_value(param),
    };

    let required = location == ParameterLocation::Path
        || param.get("required").and_then(Value::as_bool).unwrap_or(false);

    Some(Parameter::new(name, location, schema).required(required))
}

fn parse_content(content: Option<&Value>) -> Vec<(String, Schema)> {
    let Some(content) = content.and_then(Value::as_object) else {
        return Vec::new();
    };
    content
        .iter()
        .map(|(content_type, media)| {
            let schema = media.get("schema").map(Schema::from_value).unwrap_or_default();
            (content_type.clone(), schema)
        })
        .collect()
}

impl Schema {
    /// Parse a Schema Object.
    ///
    /// Without `type`, the kind is inferred as `object` when `properties` is
    /// present and `array` when `items` is present. A type array (OpenAPI 3.1)
    /// uses its first non-null member.
    pub fn from_value(value: &Value) -> Schema {
        let Some(map) = value.as_object() else {
            return Schema::default();
        };

        if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
            return Schema::reference(reference);
        }

        let type_name = match map.get("type") {
            Some(Value::String(t)) => Some(t.as_str()),
            Some(Value::Array(types)) => types
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "null"),
            _ => None,
        }
        .or_else(|| {
            if map.contains_key("properties") || map.contains_key("required") {
                Some("object")
            } else if map.contains_key("items") {
                Some("array")
            } else {
                None
            }
        });

        let kind = match type_name {
            Some("string") => SchemaKind::String(StringRules {
                format: str_field(map, "format"),
                pattern: str_field(map, "pattern"),
                min_length: usize_field(map, "minLength"),
                max_length: usize_field(map, "maxLength"),
            }),
            Some("number") => SchemaKind::Number(parse_numeric(map)),
            Some("integer") => SchemaKind::Integer(parse_numeric(map)),
            Some("boolean") => SchemaKind::Boolean,
            Some("array") => SchemaKind::Array(ArrayRules {
                items: map.get("items").map(|i| Box::new(Schema::from_value(i))),
                min_items: usize_field(map, "minItems"),
                max_items: usize_field(map, "maxItems"),
            }),
            Some("object") => SchemaKind::Object(ObjectRules {
                properties: map
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| {
                        props
                            .iter()
                            .map(|(name, prop)| (name.clone(), Schema::from_value(prop)))
                            .collect()
                    })
                    .unwrap_or_default(),
                required: map
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|names| {
                        names
                            .iter()
                            .filter_map(|n| n.as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default(),
            }),
            _ => SchemaKind::Unspecified,
        };

        Schema {
            kind,
            enumeration: map.get("enum").and_then(Value::as_array).cloned(),
            default: map.get("default").cloned(),
            example: map
                .get("example")
                .cloned()
                .or_else(|| map.get("examples").and_then(|e| e.get(0)).cloned()),
            reference: None,
            description: str_field(map, "description"),
        }
    }
}

fn parse_numeric(map: &Map<String, Value>) -> NumericRules {
    NumericRules {
        minimum: parse_bound(map, "minimum", "exclusiveMinimum", Side::Lower),
        maximum: parse_bound(map, "maximum", "exclusiveMaximum", Side::Upper),
    }
}

#[derive(Clone, Copy)]
enum Side {
    Lower,
    Upper,
}

/// Combine the 3.0 boolean form and the 3.1 numeric form of exclusive bounds.
///
/// A plain bound next to a numeric exclusive one keeps whichever is
/// stricter; on equal values the exclusive bound wins.
fn parse_bound(
    map: &Map<String, Value>,
    key: &str,
    exclusive_key: &str,
    side: Side,
) -> Option<Bound> {
    let inclusive = map.get(key).and_then(Value::as_f64);
    match map.get(exclusive_key) {
        Some(Value::Bool(true)) => inclusive.map(Bound::exclusive),
        Some(Value::Number(n)) => match (inclusive, n.as_f64()) {
            (Some(inclusive), Some(exclusive)) => {
                let inclusive_is_stricter = match side {
                    Side::Lower => inclusive > exclusive,
                    Side::Upper => inclusive < exclusive,
                };
                if inclusive_is_stricter {
                    Some(Bound::inclusive(inclusive))
                } else {
                    Some(Bound::exclusive(exclusive))
                }
            }
            (inclusive, exclusive) => exclusive
                .map(Bound::exclusive)
                .or_else(|| inclusive.map(Bound::inclusive)),
        },
        _ => inclusive.map(Bound::inclusive),
    }
}

fn str_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(String::from)
}

fn usize_field(map: &Map<String, Value>, key: &str) -> Option<usize> {
    map.get(key)
        .and_then(Value::as_u64)
        .and_then(|n| usize::try_from(n).ok())
}
