//! Named schema lookup.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::types::Schema;

/// Reference prefixes understood by [`SchemaRegistry::resolve`].
pub const REFERENCE_PREFIXES: &[&str] = &["#/components/schemas/", "#/definitions/"];

/// Alias chains (`A -> B -> C`) longer than this are treated as unresolved.
const MAX_ALIAS_HOPS: usize = 32;

/// Read-only map from schema name to [`Schema`] for one loaded document.
///
/// Names keep the order in which they were inserted.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entries: Vec<(String, Schema)>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named schema.
    pub fn insert(&mut self, name: impl Into<String>, schema: Schema) {
        let name = name.into();
        match self.index.get(&name) {
            Some(&i) => self.entries[i].1 = schema,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, schema));
            }
        }
    }

    /// Look up a schema by its bare name.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    /// Resolve a symbolic reference to its named schema.
    ///
    /// Accepts `#/components/schemas/Name`, `#/definitions/Name` or a bare
    /// `Name`. Named schemas that are themselves pure references are followed.
    /// Returns `None` when the name is unknown or the alias chain does not end.
    pub fn resolve(&self, reference: &str) -> Option<&Schema> {
        let mut schema = self.get(&reference_name(reference))?;
        for _ in 0..MAX_ALIAS_HOPS {
            match schema.reference.as_deref() {
                Some(next) if is_pure_reference(schema) => {
                    schema = self.get(&reference_name(next))?;
                }
                _ => return Some(schema),
            }
        }
        tracing::debug!(reference, "reference alias chain did not terminate");
        None
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Schema names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.entries.iter().map(|(name, schema)| (name.as_str(), schema))
    }
}

impl FromIterator<(String, Schema)> for SchemaRegistry {
    fn from_iter<I: IntoIterator<Item = (String, Schema)>>(iter: I) -> Self {
        let mut registry = SchemaRegistry::new();
        for (name, schema) in iter {
            registry.insert(name, schema);
        }
        registry
    }
}

/// Extract the schema name from a reference, decoding JSON Pointer escapes.
pub fn reference_name(reference: &str) -> Cow<'_, str> {
    let name = REFERENCE_PREFIXES
        .iter()
        .find_map(|prefix| reference.strip_prefix(prefix))
        .unwrap_or(reference);

    if name.contains('~') {
        // ~1 = /, ~0 = ~
        Cow::Owned(name.replace("~1", "/").replace("~0", "~"))
    } else {
        Cow::Borrowed(name)
    }
}

fn is_pure_reference(schema: &Schema) -> bool {
    matches!(schema.kind, crate::types::SchemaKind::Unspecified)
        && schema.example.is_none()
        && schema.enumeration.is_none()
        && schema.default.is_none()
}
