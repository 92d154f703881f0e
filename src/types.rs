//! Core types for OpenAPI schema interpretation.

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

/// Default recursion limit for example synthesis.
pub const DEFAULT_MAX_DEPTH: usize = 10;

/// Runtime classification of a JSON value.
///
/// `Integer` is a refinement of `Number`: a number with no fractional part
/// classifies as `Integer`, and is still acceptable where a `number` is declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    Null,
    Array,
    Object,
    Integer,
    Number,
    Boolean,
    String,
}

impl RuntimeType {
    /// Classify a JSON value.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => RuntimeType::Null,
            Value::Bool(_) => RuntimeType::Boolean,
            Value::Number(n) if is_integral(n) => RuntimeType::Integer,
            Value::Number(_) => RuntimeType::Number,
            Value::String(_) => RuntimeType::String,
            Value::Array(_) => RuntimeType::Array,
            Value::Object(_) => RuntimeType::Object,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeType::Null => "null",
            RuntimeType::Array => "array",
            RuntimeType::Object => "object",
            RuntimeType::Integer => "integer",
            RuntimeType::Number => "number",
            RuntimeType::Boolean => "boolean",
            RuntimeType::String => "string",
        }
    }
}

impl fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_integral(n: &Number) -> bool {
    if n.is_i64() || n.is_u64() {
        return true;
    }
    n.as_f64()
        .map(|f| f.is_finite() && f.fract() == 0.0)
        .unwrap_or(false)
}

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    RuntimeType::of(value).as_str()
}

/// Render a value the way enum membership compares it.
///
/// Strings render as their contents, everything else as compact JSON, so the
/// string `"1"` and the number `1` compare equal.
pub fn coerce_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Whether `value` is a member of `allowed` under string coercion.
pub fn enum_contains(allowed: &[Value], value: &Value) -> bool {
    let needle = coerce_to_text(value);
    allowed.iter().any(|candidate| coerce_to_text(candidate) == needle)
}

/// A numeric bound, inclusive unless `exclusive` is set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub value: f64,
    pub exclusive: bool,
}

impl Bound {
    pub fn inclusive(value: f64) -> Self {
        Self {
            value,
            exclusive: false,
        }
    }

    pub fn exclusive(value: f64) -> Self {
        Self {
            value,
            exclusive: true,
        }
    }

    /// Whether `x` satisfies this bound used as a minimum.
    pub fn admits_from_below(&self, x: f64) -> bool {
        if self.exclusive {
            x > self.value
        } else {
            x >= self.value
        }
    }

    /// Whether `x` satisfies this bound used as a maximum.
    pub fn admits_from_above(&self, x: f64) -> bool {
        if self.exclusive {
            x < self.value
        } else {
            x <= self.value
        }
    }
}

/// Constraints that only apply to `string` schemas.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StringRules {
    /// Format hint (`email`, `date`, `date-time`, `uri`, ...).
    pub format: Option<String>,
    /// Regular expression the value must match (unanchored search).
    pub pattern: Option<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

/// Constraints that apply to `number` and `integer` schemas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NumericRules {
    pub minimum: Option<Bound>,
    pub maximum: Option<Bound>,
}

/// Constraints and children of an `array` schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArrayRules {
    pub items: Option<Box<Schema>>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
}

/// Children of an `object` schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectRules {
    /// Declared properties in declaration order.
    pub properties: Vec<(String, Schema)>,
    /// Names that must be present. Not checked against `properties`.
    pub required: Vec<String>,
}

impl ObjectRules {
    /// Look up a declared property by name.
    pub fn property(&self, name: &str) -> Option<&Schema> {
        self.properties
            .iter()
            .find(|(prop, _)| prop == name)
            .map(|(_, schema)| schema)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// Declared kind of a schema, carrying the constraints meaningful for it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SchemaKind {
    String(StringRules),
    Number(NumericRules),
    Integer(NumericRules),
    Boolean,
    Array(ArrayRules),
    Object(ObjectRules),
    /// No `type` declared: any value passes the type check.
    #[default]
    Unspecified,
}

impl SchemaKind {
    /// The OpenAPI type name of this kind.
    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::String(_) => "string",
            SchemaKind::Number(_) => "number",
            SchemaKind::Integer(_) => "integer",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Array(_) => "array",
            SchemaKind::Object(_) => "object",
            SchemaKind::Unspecified => "unspecified",
        }
    }

    /// Whether a value of runtime type `actual` is acceptable for this kind.
    ///
    /// `null` is always acceptable.
    pub fn accepts(&self, actual: RuntimeType) -> bool {
        match (self, actual) {
            (_, RuntimeType::Null) | (SchemaKind::Unspecified, _) => true,
            (SchemaKind::String(_), RuntimeType::String) => true,
            (SchemaKind::Number(_), RuntimeType::Number | RuntimeType::Integer) => true,
            (SchemaKind::Integer(_), RuntimeType::Integer) => true,
            (SchemaKind::Boolean, RuntimeType::Boolean) => true,
            (SchemaKind::Array(_), RuntimeType::Array) => true,
            (SchemaKind::Object(_), RuntimeType::Object) => true,
            _ => false,
        }
    }
}

/// An OpenAPI Schema Object, restricted to the keywords the engine interprets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    pub kind: SchemaKind,
    /// Allowed literal values, in declaration order.
    pub enumeration: Option<Vec<Value>>,
    pub default: Option<Value>,
    /// Author-provided instance, used verbatim by synthesis.
    pub example: Option<Value>,
    /// Symbolic pointer to a named schema (e.g. `#/components/schemas/Pet`).
    pub reference: Option<String>,
    pub description: Option<String>,
}

impl Schema {
    /// A schema of the given kind with no other keywords.
    pub fn of_kind(kind: SchemaKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// A schema that only points at a named schema.
    pub fn reference(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Self::default()
        }
    }

    pub fn string() -> Self {
        Self::of_kind(SchemaKind::String(StringRules::default()))
    }

    pub fn integer() -> Self {
        Self::of_kind(SchemaKind::Integer(NumericRules::default()))
    }

    pub fn number() -> Self {
        Self::of_kind(SchemaKind::Number(NumericRules::default()))
    }

    pub fn boolean() -> Self {
        Self::of_kind(SchemaKind::Boolean)
    }

    pub fn array(items: Schema) -> Self {
        Self::of_kind(SchemaKind::Array(ArrayRules {
            items: Some(Box::new(items)),
            ..ArrayRules::default()
        }))
    }

    /// Set the allowed literal values.
    pub fn with_enum(mut self, values: Vec<Value>) -> Self {
        self.enumeration = Some(values);
        self
    }

    /// The object rules if this is an object schema.
    pub fn as_object(&self) -> Option<&ObjectRules> {
        match &self.kind {
            SchemaKind::Object(rules) => Some(rules),
            _ => None,
        }
    }

    /// The items schema if this is an array schema.
    pub fn items(&self) -> Option<&Schema> {
        match &self.kind {
            SchemaKind::Array(rules) => rules.items.as_deref(),
            _ => None,
        }
    }
}

/// One step in a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a value inside a nested structure.
///
/// Renders as dotted/bracketed text: `user.tags[2]`. The root renders as `""`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Path extended with a property name.
    pub fn key(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(name.into()));
        Self(segments)
    }

    /// Path extended with an array index.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for FieldPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(|s| PathSegment::Key(s.into())).collect())
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Key(name) => write!(f, ".{}", name)?,
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
