//! Normalized, reference-free schema tree shared by every consumer.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ============================================================================
// Primitive Types
// ============================================================================

/// Scalar type tags understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Integer,
    Number,
    Boolean,
}

impl PrimitiveType {
    /// Parse a declared type tag. `float` is the flat field list spelling of `number`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "number" | "float" | "double" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Infer the type of a literal (used for enums without a declared type)
    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Bool(_) => Self::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Integer,
            Value::Number(_) => Self::Number,
            _ => Self::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Constraints
// ============================================================================

/// Declared constraints, copied from the source fragment without interpretation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub exclusive_minimum: bool,
    #[serde(default)]
    pub exclusive_maximum: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(default)]
    pub unique_items: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default)]
    pub nullable: bool,
}

impl Constraints {
    /// Read every recognized constraint key from a raw fragment.
    ///
    /// `exclusiveMinimum`/`exclusiveMaximum` accept both the OpenAPI 3.0 boolean form and
    /// the JSON Schema numeric form (where the number is the bound itself).
    pub fn from_fragment(fragment: &Value) -> Self {
        let mut constraints = Self {
            minimum: fragment.get("minimum").and_then(Value::as_f64),
            maximum: fragment.get("maximum").and_then(Value::as_f64),
            min_length: fragment.get("minLength").and_then(Value::as_u64),
            max_length: fragment.get("maxLength").and_then(Value::as_u64),
            pattern: fragment.get("pattern").and_then(Value::as_str).map(String::from),
            multiple_of: fragment
                .get("multipleOf")
                .and_then(Value::as_f64)
                .filter(|m| *m > 0.0),
            min_items: fragment.get("minItems").and_then(Value::as_u64),
            max_items: fragment.get("maxItems").and_then(Value::as_u64),
            unique_items: fragment
                .get("uniqueItems")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            enum_values: fragment
                .get("enum")
                .and_then(Value::as_array)
                .filter(|values| !values.is_empty())
                .cloned(),
            format: fragment.get("format").and_then(Value::as_str).map(String::from),
            nullable: fragment
                .get("nullable")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            ..Default::default()
        };

        match fragment.get("exclusiveMinimum") {
            Some(Value::Bool(flag)) => constraints.exclusive_minimum = *flag,
            Some(Value::Number(bound)) => {
                constraints.minimum = bound.as_f64();
                constraints.exclusive_minimum = true;
            }
            _ => {}
        }
        match fragment.get("exclusiveMaximum") {
            Some(Value::Bool(flag)) => constraints.exclusive_maximum = *flag,
            Some(Value::Number(bound)) => {
                constraints.maximum = bound.as_f64();
                constraints.exclusive_maximum = true;
            }
            _ => {}
        }

        constraints
    }
}

// ============================================================================
// Schema Node
// ============================================================================

/// Shape of a resolved node. There is deliberately no reference variant:
/// references only exist in raw fragments and are gone once the walker is done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SchemaKind {
    Primitive {
        #[serde(rename = "type")]
        primitive: PrimitiveType,
    },
    Object {
        properties: IndexMap<String, SchemaNode>,
    },
    Array {
        /// `None` when the item schema cannot be determined
        items: Option<Box<SchemaNode>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaNode {
    #[serde(flatten)]
    pub kind: SchemaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Catalog entry this node was resolved from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default)]
    pub constraints: Constraints,
    #[serde(default)]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Set on placeholders produced by the cycle or depth guard
    #[serde(default)]
    pub truncated: bool,
}

impl SchemaNode {
    pub fn primitive(primitive: PrimitiveType) -> Self {
        Self::with_kind(SchemaKind::Primitive { primitive })
    }

    pub fn object(name: impl Into<String>, properties: IndexMap<String, SchemaNode>) -> Self {
        let mut node = Self::with_kind(SchemaKind::Object { properties });
        node.name = Some(name.into());
        node
    }

    pub fn array(items: Option<SchemaNode>) -> Self {
        Self::with_kind(SchemaKind::Array {
            items: items.map(Box::new),
        })
    }

    /// Terminal empty object standing in for a schema that was not expanded
    pub fn placeholder(name: impl Into<String>) -> Self {
        let mut node = Self::object(name, IndexMap::new());
        node.truncated = true;
        node
    }

    fn with_kind(kind: SchemaKind) -> Self {
        Self {
            kind,
            name: None,
            reference: None,
            constraints: Constraints::default(),
            required: false,
            description: None,
            truncated: false,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self.kind, SchemaKind::Object { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, SchemaKind::Array { .. })
    }

    pub fn properties(&self) -> Option<&IndexMap<String, SchemaNode>> {
        match &self.kind {
            SchemaKind::Object { properties } => Some(properties),
            _ => None,
        }
    }

    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties().and_then(|props| props.get(name))
    }

    pub fn items(&self) -> Option<&SchemaNode> {
        match &self.kind {
            SchemaKind::Array { items } => items.as_deref(),
            _ => None,
        }
    }

    /// Short type name for logs and labels
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            SchemaKind::Primitive { primitive } => primitive.as_str(),
            SchemaKind::Object { .. } => "object",
            SchemaKind::Array { .. } => "array",
        }
    }
}
