//! OpenAPI Schema Engine
//!
//! Interprets OpenAPI Schema Objects: validates values and parameters,
//! synthesizes example instances, diffs observed responses against their
//! declared shape, and assembles request descriptors from endpoints.
//!
//! The engine routines are pure functions over a [`Schema`] and the
//! [`SchemaRegistry`] of the document it came from. Loading and linting live
//! alongside them but are the only parts that touch the filesystem or network.
//!
//! # Example
//!
//! ```
//! use oas_engine::{diff, synthesize, validate, FieldPath, Schema, SchemaRegistry};
//! use serde_json::json;
//!
//! let pet = Schema::from_value(&json!({
//!     "type": "object",
//!     "required": ["id", "email"],
//!     "properties": {
//!         "id": { "type": "integer" },
//!         "email": { "type": "string", "format": "email" }
//!     }
//! }));
//! let registry = SchemaRegistry::new();
//!
//! let example = synthesize(&pet, &registry).unwrap();
//! assert_eq!(example, json!({ "id": 0, "email": "user@example.com" }));
//! assert!(validate(&example, &pet, &FieldPath::root(), &registry).is_empty());
//!
//! let errors = validate(&json!({ "id": 1 }), &pet, &FieldPath::root(), &registry);
//! assert_eq!(errors[0].to_string(), "email: email is required");
//!
//! let result = diff(&json!({ "id": 1, "email": "a@b.c", "x": 1 }), &pet, &registry);
//! assert!(result.valid);
//! assert_eq!(result.extra_fields.len(), 1);
//! ```
//!
//! # Selection Order for Examples
//!
//! | Source | Notes |
//! |--------|-------|
//! | `example` | Returned verbatim |
//! | `$ref` | Resolved one level deeper; `None` if unknown |
//! | string `format` | Canned value (`email`, `date`, `uuid`, ...) |
//! | `enum` | First member |
//! | `default` | Returned verbatim |
//! | kind | `"string"`, `0`, `false`, one-element array, object |

mod diff;
mod document;
mod endpoint;
mod error;
mod example;
mod linter;
mod loader;
mod registry;
mod request;
mod types;
mod validator;

pub use diff::{diff, DiffError, DiffField, ResponseDiff};
pub use document::SpecDocument;
pub use endpoint::{
    path_placeholders, ApiKeyLocation, AuthConfig, Endpoint, Method, Parameter,
    ParameterLocation, RequestBody, ResponseSpec,
};
pub use error::{ErrorKind, LoadError, ValidationError};
pub use example::{synthesize, synthesize_at, synthesize_with, SynthesisOptions};
pub use linter::{
    lint, lint_document, lint_file, Diagnostic, FileResult, FileStatus, LintResult, Severity,
};
pub use loader::{is_url, load_document, load_document_auto, load_document_str, load_spec};
pub use registry::{reference_name, SchemaRegistry, REFERENCE_PREFIXES};
pub use request::{assemble, Headers, RequestDescriptor};
pub use types::{
    coerce_to_text, enum_contains, json_type_name, ArrayRules, Bound, FieldPath, NumericRules,
    ObjectRules, RuntimeType, Schema, SchemaKind, StringRules, DEFAULT_MAX_DEPTH,
};
pub use validator::{
    type_mismatch, validate, validate_json_text, validate_parameter, ParameterCheck,
};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
