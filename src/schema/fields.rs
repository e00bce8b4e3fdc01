//! Flat field list documents
//!
//! The flat format lists every field once, with nesting expressed through a
//! `parentProperty` pointer naming the parent field:
//!
//! ```json
//! [
//!   { "name": "order", "dataType": "object", "required": true },
//!   { "name": "qty", "dataType": "integer", "parentProperty": "order", "minValue": 1 }
//! ]
//! ```
//!
//! Arrays of objects use a single synthetic wrapper child of type `object`
//! whose own children describe the item.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::error::EngineError;
use super::node::{PrimitiveType, SchemaNode};
use super::policy::{Fallback, FallbackPolicy};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_property: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Element type for arrays declared without children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            parent_property: None,
            required: false,
            min_value: None,
            max_value: None,
            description: None,
            item_type: None,
        }
    }

    pub fn under(mut self, parent: impl Into<String>) -> Self {
        self.parent_property = Some(parent.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }
}

/// A whole flat document, grouped by parent for tree building
pub struct FieldList<'a> {
    children: IndexMap<Option<&'a str>, Vec<&'a FieldDescriptor>>,
    policy: FallbackPolicy,
}

impl<'a> FieldList<'a> {
    pub fn new(fields: &'a [FieldDescriptor]) -> Self {
        Self::with_policy(fields, FallbackPolicy::default())
    }

    pub fn with_policy(fields: &'a [FieldDescriptor], policy: FallbackPolicy) -> Self {
        let mut children: IndexMap<Option<&str>, Vec<&FieldDescriptor>> = IndexMap::new();
        for field in fields {
            children
                .entry(field.parent_property.as_deref())
                .or_default()
                .push(field);
        }
        Self { children, policy }
    }

    /// Build the object node rooted at the fields without a parent
    pub fn to_node(&self, root_name: &str) -> Result<SchemaNode, EngineError> {
        let mut visited = HashSet::new();
        self.build_object(root_name, None, &mut visited, 0)
    }

    fn children_of(&self, parent: Option<&'a str>) -> &[&'a FieldDescriptor] {
        self.children
            .get(&parent)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    fn build_object(
        &self,
        model_name: &str,
        parent: Option<&'a str>,
        visited: &mut HashSet<&'a str>,
        depth: usize,
    ) -> Result<SchemaNode, EngineError> {
        if depth > self.policy.max_depth {
            return match self.policy.on_cycle {
                Fallback::Degrade => Ok(SchemaNode::placeholder(model_name)),
                Fallback::Fail => Err(EngineError::DepthExceeded {
                    path: parent.unwrap_or("<root>").to_string(),
                    max_depth: self.policy.max_depth,
                }),
            };
        }

        if let Some(parent) = parent {
            if !visited.insert(parent) {
                return match self.policy.on_cycle {
                    Fallback::Degrade => {
                        tracing::warn!(field = parent, "Field is its own ancestor, truncating");
                        Ok(SchemaNode::placeholder(model_name))
                    }
                    Fallback::Fail => Err(EngineError::CycleDetected {
                        name: parent.to_string(),
                    }),
                };
            }
        }

        let mut properties = IndexMap::new();
        for &field in self.children_of(parent) {
            let node = self.build_field(field, visited, depth)?;
            properties.insert(field.name.clone(), node);
        }

        if let Some(parent) = parent {
            visited.remove(parent);
        }
        Ok(SchemaNode::object(model_name, properties))
    }

    fn build_field(
        &self,
        field: &'a FieldDescriptor,
        visited: &mut HashSet<&'a str>,
        depth: usize,
    ) -> Result<SchemaNode, EngineError> {
        let mut node = match field.data_type.as_str() {
            "object" => {
                let name = field.name.as_str();
                self.build_object(&capitalize(name), Some(name), visited, depth + 1)?
            }
            "array" => self.build_array(field, visited, depth)?,
            tag => {
                let primitive = match PrimitiveType::from_tag(tag) {
                    Some(primitive) => primitive,
                    None => self.unknown_type(field)?,
                };
                let mut node = SchemaNode::primitive(primitive);
                if matches!(primitive, PrimitiveType::Integer | PrimitiveType::Number) {
                    node.constraints.minimum = field.min_value;
                    node.constraints.maximum = field.max_value;
                }
                node
            }
        };

        node.required = field.required;
        node.description = field.description.clone();
        Ok(node)
    }

    /// Exactly one `object` child means "array of that object"; no children means
    /// "array of `itemType`"; anything else stays an untyped array.
    fn build_array(
        &self,
        field: &'a FieldDescriptor,
        visited: &mut HashSet<&'a str>,
        depth: usize,
    ) -> Result<SchemaNode, EngineError> {
        let children = self.children_of(Some(field.name.as_str()));

        let items = match children {
            [wrapper] if wrapper.data_type == "object" => {
                let wrapper: &'a FieldDescriptor = *wrapper;
                let item_name = format!("{}Item", capitalize(&field.name));
                Some(self.build_object(
                    &item_name,
                    Some(wrapper.name.as_str()),
                    visited,
                    depth + 1,
                )?)
            }
            [] => {
                let tag = field.item_type.as_deref().unwrap_or("string");
                let primitive = PrimitiveType::from_tag(tag).unwrap_or(PrimitiveType::String);
                Some(SchemaNode::primitive(primitive))
            }
            _ => {
                tracing::debug!(
                    field = %field.name,
                    children = children.len(),
                    "Array children are not a single object wrapper, leaving items untyped"
                );
                None
            }
        };

        Ok(SchemaNode::array(items))
    }

    fn unknown_type(&self, field: &FieldDescriptor) -> Result<PrimitiveType, EngineError> {
        match self.policy.on_unknown_type {
            Fallback::Degrade => {
                tracing::warn!(
                    field = %field.name,
                    data_type = %field.data_type,
                    "Unrecognized dataType, treating as string"
                );
                Ok(PrimitiveType::String)
            }
            Fallback::Fail => Err(EngineError::UnsupportedType {
                path: field.name.clone(),
                type_tag: field.data_type.clone(),
            }),
        }
    }
}

/// `items` -> `Items`
fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
