//! Schema resolution and synthesis engine
//!
//! One walker turns a raw schema fragment (flat field list or OpenAPI-style
//! document) into a reference-free [`SchemaNode`] tree. Three consumers work on
//! that tree:
//!
//! - [`ValidationModel`] checks inbound payloads (receiver)
//! - [`Synthesizer`] produces constraint-respecting example payloads (sender)
//! - [`flatten`] produces documentation tables (translator)

pub mod catalog;
pub mod document;
pub mod error;
pub mod fields;
pub mod flatten;
pub mod formats;
pub mod node;
pub mod pattern;
pub mod policy;
pub mod synthesis;
pub mod validation;
pub mod walker;

pub use catalog::{reference_name, Catalog};
pub use document::{load_document, operations, Operation};
pub use error::{DocumentError, EngineError, FieldError, FieldErrorKind, ValidationFailure};
pub use fields::{FieldDescriptor, FieldList};
pub use flatten::{flatten, flatten_node, flatten_with_policy, FieldRow, Table, TableSet};
pub use node::{Constraints, PrimitiveType, SchemaKind, SchemaNode};
pub use policy::{Fallback, FallbackPolicy};
pub use synthesis::{synthesize, Synthesizer};
pub use validation::{validate, ExtraFields, ValidationModel};
pub use walker::{resolve, SchemaWalker, DEFAULT_ROOT_NAME};
