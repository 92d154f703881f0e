//! Error types for document loading and value validation.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::types::FieldPath;

/// Errors while loading an OpenAPI document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid document: {message}")]
    InvalidDocument { message: String },

    #[error("schema not found: {name}")]
    UnknownSchema { name: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Category of a [`ValidationError`].
///
/// Used by callers to group or style messages; carries no behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// A mandatory value is absent.
    Required,
    /// The runtime type disagrees with the declared kind.
    Type,
    Pattern,
    Min,
    Max,
    Enum,
    /// Serialized input could not be parsed.
    Json,
}

/// Single validation error with path context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// Location of the offending value (`user.tags[2]`).
    pub path: FieldPath,
    /// Human-readable error message.
    pub message: String,
    pub kind: ErrorKind,
}

impl ValidationError {
    pub fn new(path: FieldPath, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            kind,
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_root() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("openapi.json"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = LoadError::InvalidDocument {
            message: "missing paths".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = LoadError::UnknownSchema { name: "Pet".into() };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn validation_error_display() {
        let err = ValidationError::new(
            FieldPath::root().key("buyer").key("email"),
            ErrorKind::Type,
            "Expected string, got number",
        );
        assert_eq!(err.to_string(), "buyer.email: Expected string, got number");
    }

    #[test]
    fn root_validation_error_display_omits_path() {
        let err = ValidationError::new(FieldPath::root(), ErrorKind::Json, "Invalid JSON");
        assert_eq!(err.to_string(), "Invalid JSON");
    }

    #[test]
    fn validation_error_serializes_kind_lowercase() {
        let err = ValidationError::new(
            FieldPath::root().key("name"),
            ErrorKind::Required,
            "name is required",
        );
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "required");
        assert_eq!(value["path"], "name");
    }
}
