//! Request assembly from endpoint descriptors.
//!
//! Builds the url, headers and body of an outgoing call. Nothing here sends
//! the request or validates inputs; callers run the validators first.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::endpoint::{ApiKeyLocation, AuthConfig, Endpoint, Method, ParameterLocation};
use crate::types::coerce_to_text;

/// Characters left unescaped in path segments, matching `encodeURIComponent`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Ordered header map. Names compare case-insensitively; inserting an
/// existing name replaces its value in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl Serialize for Headers {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

/// A fully resolved request, ready for a transport to send.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: Method,
    pub headers: Headers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Assemble a request from an endpoint and the caller's inputs.
///
/// `values` maps parameter names to values; missing, `null`, `""` and `[]`
/// values are skipped. Array values repeat query pairs per element.
pub fn assemble(
    endpoint: &Endpoint,
    base_url: &str,
    values: &Map<String, Value>,
    body: Option<&str>,
    content_type: &str,
    auth: &AuthConfig,
) -> RequestDescriptor {
    let mut path = endpoint.path.clone();
    let mut query: Vec<(String, String)> = Vec::new();
    let mut headers = Headers::new();
    let mut cookies: Vec<String> = Vec::new();

    for parameter in &endpoint.parameters {
        let Some(value) = values.get(&parameter.name).filter(|v| !is_blank(v)) else {
            continue;
        };

        match parameter.location {
            ParameterLocation::Path => {
                let token = format!("{{{}}}", parameter.name);
                let encoded = utf8_percent_encode(&scalar_text(value), COMPONENT).to_string();
                path = path.replace(&token, &encoded);
            }
            ParameterLocation::Query => match value {
                Value::Array(items) => {
                    for item in items {
                        query.push((parameter.name.clone(), coerce_to_text(item)));
                    }
                }
                other => query.push((parameter.name.clone(), coerce_to_text(other))),
            },
            ParameterLocation::Header => {
                headers.insert(parameter.name.as_str(), scalar_text(value));
            }
            ParameterLocation::Cookie => {
                cookies.push(format!("{}={}", parameter.name, scalar_text(value)));
            }
        }
    }

    if !cookies.is_empty() {
        headers.insert("Cookie", cookies.join("; "));
    }

    if body.is_some() {
        headers.insert("Content-Type", content_type);
    }

    match auth {
        AuthConfig::None => {}
        AuthConfig::ApiKey {
            location: ApiKeyLocation::Header,
            name,
            value,
        } => headers.insert(name.as_str(), value.as_str()),
        AuthConfig::ApiKey {
            location: ApiKeyLocation::Query,
            name,
            value,
        } => query.push((name.clone(), value.clone())),
        AuthConfig::Bearer { token } | AuthConfig::OAuth2 { token } => {
            headers.insert("Authorization", format!("Bearer {}", token));
        }
        AuthConfig::Basic { username, password } => {
            let credentials = BASE64.encode(format!("{}:{}", username, password));
            headers.insert("Authorization", format!("Basic {}", credentials));
        }
    }

    let mut url = format!("{}{}", base_url.trim_end_matches('/'), path);
    if !query.is_empty() {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(query.iter())
            .finish();
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&encoded);
    }

    RequestDescriptor {
        url,
        method: endpoint.method,
        headers,
        body: body.map(String::from),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Text for a single-valued slot; arrays join with commas (OpenAPI `simple` style).
fn scalar_text(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(coerce_to_text)
            .collect::<Vec<_>>()
            .join(","),
        other => coerce_to_text(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Parameter;
    use crate::types::Schema;
    use serde_json::json;

    fn values(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn pets_endpoint() -> Endpoint {
        Endpoint::new(Method::Get, "/pets/{id}")
            .with_parameter(Parameter::new("id", ParameterLocation::Path, Schema::integer()))
            .with_parameter(Parameter::new("limit", ParameterLocation::Query, Schema::integer()))
    }

    #[test]
    fn bearer_request() {
        let request = assemble(
            &pets_endpoint(),
            "https://api.example.com",
            &values(json!({ "id": 42, "limit": 10 })),
            None,
            "application/json",
            &AuthConfig::Bearer { token: "abc".into() },
        );
        assert_eq!(request.url, "https://api.example.com/pets/42?limit=10");
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.headers.get("Authorization"), Some("Bearer abc"));
        assert_eq!(request.body, None);
        assert!(request.headers.get("Content-Type").is_none());
    }

    #[test]
    fn path_values_are_percent_encoded() {
        let request = assemble(
            &pets_endpoint(),
            "https://api.example.com/",
            &values(json!({ "id": "a b/c" })),
            None,
            "application/json",
            &AuthConfig::None,
        );
        assert_eq!(request.url, "https://api.example.com/pets/a%20b%2Fc");
    }

    #[test]
    fn array_query_values_repeat_in_order() {
        let endpoint = Endpoint::new(Method::Get, "/pets").with_parameter(Parameter::new(
            "tag",
            ParameterLocation::Query,
            Schema::array(Schema::string()),
        ));
        let request = assemble(
            &endpoint,
            "https://api.example.com",
            &values(json!({ "tag": ["dog", "cat", "big dog"] })),
            None,
            "application/json",
            &AuthConfig::None,
        );
        assert_eq!(
            request.url,
            "https://api.example.com/pets?tag=dog&tag=cat&tag=big+dog"
        );
    }

    #[test]
    fn empty_values_are_skipped() {
        let request = assemble(
            &pets_endpoint(),
            "https://api.example.com",
            &values(json!({ "id": 1, "limit": "" })),
            None,
            "application/json",
            &AuthConfig::None,
        );
        assert_eq!(request.url, "https://api.example.com/pets/1");
    }

    #[test]
    fn header_parameters_and_body() {
        let endpoint = Endpoint::new(Method::Post, "/pets")
            .with_parameter(Parameter::new(
                "X-Request-Id",
                ParameterLocation::Header,
                Schema::string(),
            ))
            .with_parameter(Parameter::new(
                "content-type",
                ParameterLocation::Header,
                Schema::string(),
            ));
        let request = assemble(
            &endpoint,
            "https://api.example.com",
            &values(json!({ "X-Request-Id": "r-1", "content-type": "text/plain" })),
            Some(r#"{"name":"Rex"}"#),
            "application/json",
            &AuthConfig::None,
        );
        assert_eq!(request.headers.get("x-request-id"), Some("r-1"));
        // The body's content type overwrites the header parameter in place.
        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.headers.get("Content-Type"), Some("application/json"));
        assert_eq!(request.body.as_deref(), Some(r#"{"name":"Rex"}"#));
    }

    #[test]
    fn cookie_parameters_fold_into_one_header() {
        let endpoint = Endpoint::new(Method::Get, "/session")
            .with_parameter(Parameter::new("a", ParameterLocation::Cookie, Schema::string()))
            .with_parameter(Parameter::new("b", ParameterLocation::Cookie, Schema::integer()));
        let request = assemble(
            &endpoint,
            "https://api.example.com",
            &values(json!({ "a": "x", "b": 2 })),
            None,
            "application/json",
            &AuthConfig::None,
        );
        assert_eq!(request.headers.get("Cookie"), Some("a=x; b=2"));
    }

    #[test]
    fn api_key_in_header_or_query() {
        let header = AuthConfig::ApiKey {
            location: ApiKeyLocation::Header,
            name: "X-API-Key".into(),
            value: "secret".into(),
        };
        let request = assemble(
            &pets_endpoint(),
            "https://api.example.com",
            &values(json!({ "id": 1 })),
            None,
            "application/json",
            &header,
        );
        assert_eq!(request.headers.get("X-API-Key"), Some("secret"));

        let query = AuthConfig::ApiKey {
            location: ApiKeyLocation::Query,
            name: "api_key".into(),
            value: "secret".into(),
        };
        let request = assemble(
            &pets_endpoint(),
            "https://api.example.com",
            &values(json!({ "id": 1, "limit": 5 })),
            None,
            "application/json",
            &query,
        );
        assert_eq!(
            request.url,
            "https://api.example.com/pets/1?limit=5&api_key=secret"
        );
        assert!(request.headers.is_empty());
    }

    #[test]
    fn basic_and_oauth2() {
        let request = assemble(
            &pets_endpoint(),
            "https://api.example.com",
            &values(json!({ "id": 1 })),
            None,
            "application/json",
            &AuthConfig::Basic {
                username: "user".into(),
                password: "pass".into(),
            },
        );
        assert_eq!(request.headers.get("Authorization"), Some("Basic dXNlcjpwYXNz"));

        let request = assemble(
            &pets_endpoint(),
            "https://api.example.com",
            &values(json!({ "id": 1 })),
            None,
            "application/json",
            &AuthConfig::OAuth2 { token: "t0k".into() },
        );
        assert_eq!(request.headers.get("Authorization"), Some("Bearer t0k"));
    }

    #[test]
    fn descriptor_serializes_headers_as_map() {
        let request = assemble(
            &pets_endpoint(),
            "https://api.example.com",
            &values(json!({ "id": 1 })),
            None,
            "application/json",
            &AuthConfig::Bearer { token: "abc".into() },
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["method"], "GET");
        assert_eq!(value["headers"]["Authorization"], "Bearer abc");
        assert!(value.get("body").is_none());
    }
}
