//! Endpoint, parameter and authentication descriptors.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Schema, SchemaKind};

/// Where a parameter travels in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Path,
    Header,
    Cookie,
}

impl ParameterLocation {
    /// Parse the OpenAPI `in` value. `body` and `formData` are not parameters here.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "query" => Some(ParameterLocation::Query),
            "path" => Some(ParameterLocation::Path),
            "header" => Some(ParameterLocation::Header),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }
}

/// A single operation parameter. Scalar or homogeneous-array valued.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub schema: Schema,
}

impl Parameter {
    pub fn new(name: impl Into<String>, location: ParameterLocation, schema: Schema) -> Self {
        Self {
            name: name.into(),
            location,
            // Path parameters are always required in OpenAPI.
            required: location == ParameterLocation::Path,
            schema,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Convert raw text (from a form field or command line) into a typed value.
    ///
    /// Text that does not parse as the declared kind is kept as a string so
    /// that validation reports the type mismatch. Arrays split on commas.
    pub fn coerce(&self, raw: &str) -> Value {
        coerce_text(&self.schema, raw)
    }
}

fn coerce_text(schema: &Schema, raw: &str) -> Value {
    match &schema.kind {
        SchemaKind::Integer(_) => raw
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        SchemaKind::Number(_) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        SchemaKind::Boolean => match raw.trim() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        SchemaKind::Array(rules) => {
            if raw.is_empty() {
                return Value::Array(Vec::new());
            }
            let items = rules.items.as_deref();
            Value::Array(
                raw.split(',')
                    .map(|part| match items {
                        Some(item_schema) => coerce_text(item_schema, part.trim()),
                        None => Value::String(part.trim().to_string()),
                    })
                    .collect(),
            )
        }
        _ => Value::String(raw.to_string()),
    }
}

/// HTTP method of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl Method {
    /// Methods in the order OpenAPI path items list them.
    pub const ALL: [Method; 8] = [
        Method::Get,
        Method::Put,
        Method::Post,
        Method::Delete,
        Method::Options,
        Method::Head,
        Method::Patch,
        Method::Trace,
    ];

    /// Case-insensitive parse.
    pub fn parse(s: &str) -> Option<Self> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
            Method::Trace => "TRACE",
        }
    }

    /// Key used for this method in an OpenAPI path item.
    pub fn path_item_key(&self) -> String {
        self.as_str().to_ascii_lowercase()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body declaration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestBody {
    pub required: bool,
    /// Content type to schema, in declaration order.
    pub content: Vec<(String, Schema)>,
}

impl RequestBody {
    /// Schema for a content type, falling back to the first declared one.
    pub fn schema_for(&self, content_type: Option<&str>) -> Option<&Schema> {
        lookup_content(&self.content, content_type)
    }
}

/// A declared response for one status code (or `default`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResponseSpec {
    pub status: String,
    pub description: Option<String>,
    pub content: Vec<(String, Schema)>,
}

impl ResponseSpec {
    pub fn schema_for(&self, content_type: Option<&str>) -> Option<&Schema> {
        lookup_content(&self.content, content_type)
    }
}

fn lookup_content<'a>(
    content: &'a [(String, Schema)],
    content_type: Option<&str>,
) -> Option<&'a Schema> {
    if let Some(wanted) = content_type {
        if let Some((_, schema)) = content.iter().find(|(ct, _)| ct == wanted) {
            return Some(schema);
        }
    }
    content.first().map(|(_, schema)| schema)
}

/// One operation of the document: a path template and method.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    /// Path template with `{name}` placeholders.
    pub path: String,
    pub method: Method,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<RequestBody>,
    pub responses: Vec<ResponseSpec>,
}

impl Endpoint {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            operation_id: None,
            summary: None,
            parameters: Vec::new(),
            request_body: None,
            responses: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Response declaration for an exact status, falling back to `2XX`-style
    /// ranges and then `default`.
    pub fn response(&self, status: &str) -> Option<&ResponseSpec> {
        let range = status
            .chars()
            .next()
            .map(|c| format!("{}XX", c))
            .unwrap_or_default();
        self.responses
            .iter()
            .find(|r| r.status == status)
            .or_else(|| {
                self.responses
                    .iter()
                    .find(|r| r.status.eq_ignore_ascii_case(&range))
            })
            .or_else(|| self.responses.iter().find(|r| r.status == "default"))
    }

    /// The first declared 2xx response, or `default`.
    pub fn success_response(&self) -> Option<&ResponseSpec> {
        self.responses
            .iter()
            .find(|r| r.status.starts_with('2'))
            .or_else(|| self.responses.iter().find(|r| r.status == "default"))
    }
}

/// Extract `{name}` placeholders from a path template.
pub fn path_placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                names.push(&after[..end]);
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}

/// Where an API key is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Header,
    Query,
}

/// Authentication applied when assembling a request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AuthConfig {
    #[default]
    None,
    ApiKey {
        location: ApiKeyLocation,
        name: String,
        value: String,
    },
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: String,
    },
    #[serde(rename = "oauth2")]
    OAuth2 {
        token: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn path_parameters_default_to_required() {
        let param = Parameter::new("id", ParameterLocation::Path, Schema::integer());
        assert!(param.required);
        let param = Parameter::new("limit", ParameterLocation::Query, Schema::integer());
        assert!(!param.required);
    }

    #[test]
    fn coerce_by_declared_kind() {
        let param = Parameter::new("limit", ParameterLocation::Query, Schema::integer());
        assert_eq!(param.coerce("10"), json!(10));
        assert_eq!(param.coerce("ten"), json!("ten"));

        let param = Parameter::new("flag", ParameterLocation::Query, Schema::boolean());
        assert_eq!(param.coerce("true"), json!(true));

        let param = Parameter::new("name", ParameterLocation::Query, Schema::string());
        assert_eq!(param.coerce("123"), json!("123"));
    }

    #[test]
    fn coerce_array_splits_on_commas() {
        let param = Parameter::new(
            "ids",
            ParameterLocation::Query,
            Schema::array(Schema::integer()),
        );
        assert_eq!(param.coerce("1, 2,3"), json!([1, 2, 3]));
        assert_eq!(param.coerce(""), json!([]));
    }

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!(Method::parse("get"), Some(Method::Get));
        assert_eq!(Method::parse("PATCH"), Some(Method::Patch));
        assert_eq!(Method::parse("fetch"), None);
        assert_eq!(Method::Delete.path_item_key(), "delete");
    }

    #[test]
    fn placeholders_in_order() {
        assert_eq!(
            path_placeholders("/owners/{ownerId}/pets/{petId}"),
            vec!["ownerId", "petId"]
        );
        assert!(path_placeholders("/pets").is_empty());
    }

    #[test]
    fn response_lookup_falls_back() {
        let mut endpoint = Endpoint::new(Method::Get, "/pets");
        endpoint.responses = vec![
            ResponseSpec {
                status: "2XX".into(),
                ..ResponseSpec::default()
            },
            ResponseSpec {
                status: "default".into(),
                ..ResponseSpec::default()
            },
        ];
        assert_eq!(endpoint.response("201").unwrap().status, "2XX");
        assert_eq!(endpoint.response("404").unwrap().status, "default");
        assert_eq!(endpoint.success_response().unwrap().status, "2XX");
    }

    #[test]
    fn auth_config_serde_tags() {
        let auth: AuthConfig = serde_json::from_value(json!({
            "type": "apiKey",
            "location": "query",
            "name": "api_key",
            "value": "secret"
        }))
        .unwrap();
        assert_eq!(
            auth,
            AuthConfig::ApiKey {
                location: ApiKeyLocation::Query,
                name: "api_key".into(),
                value: "secret".into(),
            }
        );

        let auth: AuthConfig =
            serde_json::from_value(json!({"type": "oauth2", "token": "t"})).unwrap();
        assert_eq!(auth, AuthConfig::OAuth2 { token: "t".into() });
    }
}
