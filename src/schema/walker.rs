//! Reference resolution and schema walking
//!
//! Resolves a raw schema fragment (JSON/YAML value, possibly containing `$ref`
//! pointers) into a [`SchemaNode`] tree. References are looked up in a
//! [`Catalog`]; re-entering a reference that is still being resolved on the
//! current branch trips the cycle guard instead of recursing forever.

use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashSet;

use super::catalog::{reference_name, Catalog};
use super::error::EngineError;
use super::node::{Constraints, PrimitiveType, SchemaNode};
use super::policy::{Fallback, FallbackPolicy};

/// Name given to the top-level node when the caller has none
pub const DEFAULT_ROOT_NAME: &str = "Root";

// ============================================================================
// Walk Context
// ============================================================================

/// Per-walk mutable state. Created for each top-level call and dropped on return,
/// so concurrent walks over one catalog never share it.
#[derive(Default)]
struct WalkContext {
    /// References currently being resolved on the active branch
    visited: HashSet<String>,
    /// Property path of the node being walked (for diagnostics)
    path: Vec<String>,
}

impl WalkContext {
    /// Returns false when `name` is already being resolved (cycle)
    fn enter_ref(&mut self, name: &str) -> bool {
        self.visited.insert(name.to_string())
    }

    fn exit_ref(&mut self, name: &str) {
        self.visited.remove(name);
    }

    fn path(&self) -> String {
        if self.path.is_empty() {
            "<root>".to_string()
        } else {
            self.path.join(".")
        }
    }
}

// ============================================================================
// Walker
// ============================================================================

/// Resolves fragments against one catalog under one fallback policy
pub struct SchemaWalker<'a> {
    catalog: &'a Catalog,
    policy: FallbackPolicy,
}

impl<'a> SchemaWalker<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self::with_policy(catalog, FallbackPolicy::default())
    }

    pub fn with_policy(catalog: &'a Catalog, policy: FallbackPolicy) -> Self {
        Self { catalog, policy }
    }

    pub fn policy(&self) -> &FallbackPolicy {
        &self.policy
    }

    /// Resolve a top-level fragment. `root_name` names the root node when it is an
    /// inline object; a root `$ref` keeps the referenced schema's name.
    pub fn resolve(&self, fragment: &Value, root_name: &str) -> Result<SchemaNode, EngineError> {
        let mut ctx = WalkContext::default();
        self.walk(fragment, &mut ctx, 0, root_name)
    }

    fn walk(
        &self,
        fragment: &Value,
        ctx: &mut WalkContext,
        depth: usize,
        name_hint: &str,
    ) -> Result<SchemaNode, EngineError> {
        if depth > self.policy.max_depth {
            return match self.policy.on_cycle {
                Fallback::Degrade => {
                    tracing::warn!(
                        path = %ctx.path(),
                        max_depth = self.policy.max_depth,
                        "Schema depth limit reached, truncating"
                    );
                    Ok(SchemaNode::placeholder(name_hint))
                }
                Fallback::Fail => Err(EngineError::DepthExceeded {
                    path: ctx.path(),
                    max_depth: self.policy.max_depth,
                }),
            };
        }

        if let Some(pointer) = fragment.get("$ref").and_then(Value::as_str) {
            let mut node = self.resolve_ref(pointer, ctx, depth)?;
            // Sibling keys next to `$ref` refine the referenced schema
            if let Some(description) = fragment.get("description").and_then(Value::as_str) {
                node.description = Some(description.to_string());
            }
            if fragment.get("nullable").and_then(Value::as_bool) == Some(true) {
                node.constraints.nullable = true;
            }
            return Ok(node);
        }

        self.walk_fragment(fragment, ctx, depth, name_hint)
    }

    fn resolve_ref(
        &self,
        pointer: &str,
        ctx: &mut WalkContext,
        depth: usize,
    ) -> Result<SchemaNode, EngineError> {
        let name = reference_name(pointer);

        let target = self
            .catalog
            .get(&name)
            .ok_or_else(|| EngineError::UnknownSchemaReference {
                reference: pointer.to_string(),
            })?;

        if !ctx.enter_ref(&name) {
            return match self.policy.on_cycle {
                Fallback::Degrade => {
                    tracing::debug!(reference = %name, path = %ctx.path(), "Cycle guard hit");
                    let mut node = SchemaNode::placeholder(name.clone());
                    node.reference = Some(name);
                    Ok(node)
                }
                Fallback::Fail => Err(EngineError::CycleDetected { name }),
            };
        }

        let result = self.walk(target, ctx, depth + 1, &name);
        ctx.exit_ref(&name);

        let mut node = result?;
        if node.reference.is_none() {
            node.reference = Some(name.clone());
        }
        if node.is_object() && !node.truncated {
            node.name = Some(name);
        }
        Ok(node)
    }

    fn walk_fragment(
        &self,
        fragment: &Value,
        ctx: &mut WalkContext,
        depth: usize,
        name_hint: &str,
    ) -> Result<SchemaNode, EngineError> {
        let constraints = Constraints::from_fragment(fragment);
        let (type_tag, null_in_type) = declared_type(fragment);

        let mut node = if let Some(values) = &constraints.enum_values {
            let primitive = type_tag
                .and_then(PrimitiveType::from_tag)
                .unwrap_or_else(|| PrimitiveType::of_value(&values[0]));
            SchemaNode::primitive(primitive)
        } else {
            match type_tag {
                Some("object") => self.walk_object(fragment, ctx, depth, name_hint)?,
                Some("array") => self.walk_array(fragment, ctx, depth, name_hint)?,
                Some(tag) => match PrimitiveType::from_tag(tag) {
                    Some(primitive) => SchemaNode::primitive(primitive),
                    None => self.unknown_type(tag, ctx)?,
                },
                None if fragment.get("properties").is_some() => {
                    self.walk_object(fragment, ctx, depth, name_hint)?
                }
                None if fragment.get("items").is_some() => {
                    self.walk_array(fragment, ctx, depth, name_hint)?
                }
                None => SchemaNode::primitive(PrimitiveType::String),
            }
        };

        node.constraints = constraints;
        node.constraints.nullable |= null_in_type;
        node.description = fragment
            .get("description")
            .and_then(Value::as_str)
            .map(String::from);
        Ok(node)
    }

    fn walk_object(
        &self,
        fragment: &Value,
        ctx: &mut WalkContext,
        depth: usize,
        name: &str,
    ) -> Result<SchemaNode, EngineError> {
        let required: HashSet<&str> = fragment
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut properties = IndexMap::new();
        if let Some(props) = fragment.get("properties").and_then(Value::as_object) {
            for (prop_name, prop_schema) in props {
                ctx.path.push(prop_name.clone());
                let child = self.walk(prop_schema, ctx, depth + 1, prop_name);
                ctx.path.pop();

                let mut child = child?;
                child.required = required.contains(prop_name.as_str());
                properties.insert(prop_name.clone(), child);
            }
        }

        Ok(SchemaNode::object(name, properties))
    }

    fn walk_array(
        &self,
        fragment: &Value,
        ctx: &mut WalkContext,
        depth: usize,
        name: &str,
    ) -> Result<SchemaNode, EngineError> {
        let items = match fragment.get("items") {
            Some(items) if items.is_object() => {
                ctx.path.push("[]".to_string());
                let resolved = self.walk(items, ctx, depth + 1, name);
                ctx.path.pop();
                Some(resolved?)
            }
            _ => None,
        };
        Ok(SchemaNode::array(items))
    }

    fn unknown_type(&self, tag: &str, ctx: &WalkContext) -> Result<SchemaNode, EngineError> {
        match self.policy.on_unknown_type {
            Fallback::Degrade => {
                tracing::warn!(
                    type_tag = tag,
                    path = %ctx.path(),
                    "Unknown type, treating as string"
                );
                Ok(SchemaNode::primitive(PrimitiveType::String))
            }
            Fallback::Fail => Err(EngineError::UnsupportedType {
                path: ctx.path(),
                type_tag: tag.to_string(),
            }),
        }
    }
}

/// Declared `type` tag plus whether `null` was listed alongside it
/// (JSON Schema `type: ["string", "null"]`).
fn declared_type(fragment: &Value) -> (Option<&str>, bool) {
    match fragment.get("type") {
        Some(Value::String(tag)) if tag == "null" => (Some("string"), true),
        Some(Value::String(tag)) => (Some(tag.as_str()), false),
        Some(Value::Array(tags)) => {
            let nullable = tags.iter().any(|t| t.as_str() == Some("null"));
            let tag = tags
                .iter()
                .filter_map(Value::as_str)
                .find(|t| *t != "null");
            (tag.or(nullable.then_some("string")), nullable)
        }
        _ => (None, false),
    }
}

/// Resolve `fragment` against `catalog` with the default policy
pub fn resolve(fragment: &Value, catalog: &Catalog) -> Result<SchemaNode, EngineError> {
    SchemaWalker::new(catalog).resolve(fragment, DEFAULT_ROOT_NAME)
}

// ============================================================================
// Tests
// ============================================================================
