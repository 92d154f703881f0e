//! Document loading from various sources.
//!
//! Handles loading OpenAPI documents from files, strings, and HTTP URLs, in
//! JSON or YAML.

use std::path::Path;

use serde_json::Value;

use crate::document::SpecDocument;
use crate::error::LoadError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// or `LoadError::InvalidJson`/`InvalidYaml` if it can't be parsed.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(path = %path.display(), bytes = content.len(), "loaded document");
    load_document_str(&content)
}

/// Load a document from a JSON or YAML string.
///
/// Text starting with `{` or `[` is parsed as JSON; anything else as YAML.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` or `LoadError::InvalidYaml`.
pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
    } else {
        serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml { source })
    }
}

/// Load a document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails, or a parse error
/// if the body isn't valid JSON or YAML.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Value, LoadError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    // Check for HTTP errors before parsing
    let response = response
        .error_for_status()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let body = response.text().map_err(|source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    })?;

    tracing::debug!(url, bytes = body.len(), "fetched document");
    load_document_str(&body)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a document from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
pub fn load_document_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

/// Load and parse a document from a file path or URL.
pub fn load_spec(source: &str) -> Result<SpecDocument, LoadError> {
    let doc = load_document_auto(source)?;
    SpecDocument::from_value(&doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn load_document_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"openapi": "3.0.0", "paths": {{}}}}"#).unwrap();

        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc["openapi"], "3.0.0");
    }

    #[test]
    fn load_document_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "openapi: 3.0.0\ninfo:\n  title: Pets\npaths: {{}}").unwrap();

        let doc = load_document(file.path()).unwrap();
        assert_eq!(doc["info"]["title"], "Pets");
    }

    #[test]
    fn load_document_file_not_found() {
        let result = load_document(Path::new("/nonexistent/openapi.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_document_invalid_json() {
        let result = load_document_str("{ not valid json");
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_document_invalid_yaml() {
        let result = load_document_str("key: [unclosed");
        assert!(matches!(result, Err(LoadError::InvalidYaml { .. })));
    }

    #[test]
    fn yaml_keeps_property_order() {
        let doc = load_document_str("properties:\n  z: {}\n  a: {}\n").unwrap();
        let keys: Vec<_> = doc["properties"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/openapi.json"));
        assert!(is_url("http://example.com/openapi.yaml"));
        assert!(!is_url("/path/to/openapi.json"));
        assert!(!is_url("openapi.json"));
    }

    #[test]
    fn load_spec_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"openapi": "3.0.0", "paths": {{}},
                "components": {{"schemas": {{"Pet": {{"type": "object"}}}}}}}}"#
        )
        .unwrap();

        let spec = load_spec(file.path().to_str().unwrap()).unwrap();
        assert!(spec.schema("Pet").is_ok());
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;

        #[test]
        fn load_document_url_yaml() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("GET", "/openapi.yaml")
                .with_status(200)
                .with_header("content-type", "application/yaml")
                .with_body("openapi: 3.1.0\npaths: {}\n")
                .create();

            let doc = load_document_url(&format!("{}/openapi.yaml", server.url())).unwrap();
            assert_eq!(doc["openapi"], "3.1.0");
            mock.assert();
        }

        #[test]
        fn load_document_url_404() {
            let mut server = mockito::Server::new();
            server.mock("GET", "/missing.json").with_status(404).create();

            let result = load_document_auto(&format!("{}/missing.json", server.url()));
            assert!(matches!(result, Err(LoadError::NetworkError { .. })));
            assert_eq!(result.unwrap_err().exit_code(), 3);
        }
    }
}
