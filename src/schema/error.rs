//! Schema engine error types

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Errors raised while walking or synthesizing from a schema.
///
/// Under the default [`FallbackPolicy`](super::FallbackPolicy) only
/// `UnknownSchemaReference` ever reaches the caller; the rest are logged and
/// replaced by their fallback.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A `$ref` points at a name the catalog does not contain
    #[error("Unknown schema reference: '{reference}'")]
    UnknownSchemaReference { reference: String },

    /// A reference was re-entered while still being resolved
    #[error("Cycle detected while resolving '{name}'")]
    CycleDetected { name: String },

    /// Recursion went past the configured maximum depth
    #[error("Maximum schema depth {max_depth} exceeded at '{path}'")]
    DepthExceeded { path: String, max_depth: usize },

    /// A type tag the engine does not understand
    #[error("Unsupported type '{type_tag}' at '{path}'")]
    UnsupportedType { path: String, type_tag: String },

    /// A pattern that could not be compiled or satisfied
    #[error("Cannot generate a value for pattern '{pattern}': {reason}")]
    PatternGenerationFailure { pattern: String, reason: String },
}

/// Errors raised while loading schema documents from disk
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Failed to read document {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),
}

// ============================================================================
// Validation Failures
// ============================================================================

/// What kind of rule a value broke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldErrorKind {
    Missing,
    TypeMismatch,
    OutOfBounds,
    Length,
    MultipleOf,
    Enum,
    UnexpectedField,
}

/// One offending field in a payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Dotted path with array indices, e.g. `items[0].id`. Empty for the root.
    pub path: String,
    pub kind: FieldErrorKind,
    /// Human-readable description of the broken constraint
    pub expected: String,
    /// The offending value (`null` for missing fields)
    pub actual: Value,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() { "<root>" } else { &self.path };
        write!(f, "{}: expected {}, got {}", path, self.expected, self.actual)
    }
}

/// Every field error found in one payload
#[derive(Debug, Clone, PartialEq, Serialize, Error)]
#[error("Validation failed with {} error(s): {}", errors.len(), summary(errors))]
pub struct ValidationFailure {
    pub errors: Vec<FieldError>,
}

impl ValidationFailure {
    /// First error reported for `path`, if any
    pub fn at(&self, path: &str) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.path == path)
    }
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
