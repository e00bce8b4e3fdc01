//! Flatten a schema into one documentation table per named object

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use super::catalog::Catalog;
use super::error::EngineError;
use super::node::{SchemaKind, SchemaNode};
use super::policy::FallbackPolicy;
use super::walker::SchemaWalker;

/// One row of a documentation table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRow {
    /// `string`, `string/email`, `array[Item]`, `Item`, ...
    pub type_label: String,
    pub description: String,
    pub required: bool,
}

pub type Table = IndexMap<String, FieldRow>;

/// Tables keyed by name, base table first, then in discovery order
pub type TableSet = IndexMap<String, Table>;

/// Resolve `fragment` against `catalog` and flatten it under `base_name`.
///
/// A missing body (`null` or `{}`) yields an empty table set.
pub fn flatten(
    fragment: &Value,
    catalog: &Catalog,
    base_name: &str,
) -> Result<TableSet, EngineError> {
    flatten_with_policy(fragment, catalog, base_name, FallbackPolicy::default())
}

pub fn flatten_with_policy(
    fragment: &Value,
    catalog: &Catalog,
    base_name: &str,
    policy: FallbackPolicy,
) -> Result<TableSet, EngineError> {
    let absent = match fragment {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if absent {
        return Ok(TableSet::new());
    }

    let node = SchemaWalker::with_policy(catalog, policy).resolve(fragment, base_name)?;
    Ok(flatten_node(&node, base_name))
}

/// Flatten an already resolved node
pub fn flatten_node(node: &SchemaNode, base_name: &str) -> TableSet {
    let mut flattener = Flattener::default();
    flattener.base(node, base_name);
    flattener.tables
}

#[derive(Default)]
struct Flattener {
    tables: TableSet,
    /// origin key -> table name, for memoization
    by_origin: HashMap<String, String>,
    /// table name -> origin key, for collision detection
    owners: HashMap<String, String>,
    /// origin key -> table name reserved by a guard placeholder, filled by
    /// the first full expansion of the same origin
    pending: HashMap<String, String>,
}

impl Flattener {
    fn base(&mut self, node: &SchemaNode, base_name: &str) {
        self.claim(base_name, "base".to_string());
        if let Some(reference) = &node.reference {
            self.by_origin.insert(ref_origin(reference), base_name.to_string());
        }

        match &node.kind {
            SchemaKind::Object { properties } => {
                let rows = self.rows(properties, base_name);
                self.tables.insert(base_name.to_string(), rows);
            }
            // A top-level array or primitive leaves the base table empty;
            // item tables still follow it
            _ => {
                self.label(node, base_name, "");
            }
        }
    }

    fn rows(&mut self, properties: &IndexMap<String, SchemaNode>, table: &str) -> Table {
        properties
            .iter()
            .map(|(field, child)| {
                let row = FieldRow {
                    type_label: self.label(child, table, field),
                    description: child.description.clone().unwrap_or_default(),
                    required: child.required,
                };
                (field.clone(), row)
            })
            .collect()
    }

    fn label(&mut self, node: &SchemaNode, table: &str, field: &str) -> String {
        match &node.kind {
            SchemaKind::Primitive { primitive } => match &node.constraints.format {
                Some(format) => format!("{}/{}", primitive, format),
                None => primitive.to_string(),
            },
            SchemaKind::Array { items: None } => "array[unknown]".to_string(),
            SchemaKind::Array { items: Some(item) } => {
                format!("array[{}]", self.label(item, table, field))
            }
            SchemaKind::Object { properties } => self.register(node, properties, table, field),
        }
    }

    /// Table name for an object node, flattening it on first sight
    fn register(
        &mut self,
        node: &SchemaNode,
        properties: &IndexMap<String, SchemaNode>,
        parent: &str,
        field: &str,
    ) -> String {
        let origin = match &node.reference {
            Some(reference) => ref_origin(reference),
            None => format!("inline:{}.{}", parent, field),
        };
        if let Some(existing) = self.by_origin.get(&origin) {
            return existing.clone();
        }
        if let Some(reserved) = self.pending.get(&origin).cloned() {
            if !node.truncated {
                self.pending.remove(&origin);
                self.fill(&reserved, origin, properties);
            }
            return reserved;
        }

        let candidate = node
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| field.to_string());
        let name = if self.owners.contains_key(&candidate) {
            self.unique_name(format!("{}.{}", parent, field))
        } else {
            candidate
        };

        if node.truncated {
            self.tables.insert(name.clone(), Table::new());
            self.owners.insert(name.clone(), origin.clone());
            self.pending.insert(origin, name.clone());
            return name;
        }

        self.fill(&name, origin, properties);
        name
    }

    fn fill(&mut self, name: &str, origin: String, properties: &IndexMap<String, SchemaNode>) {
        self.claim(name, origin);
        let rows = self.rows(properties, name);
        self.tables.insert(name.to_string(), rows);
    }

    /// Reserve `name` and its slot in discovery order before recursing, so parents
    /// precede their children and re-entrant lookups hit the memo
    fn claim(&mut self, name: &str, origin: String) {
        self.tables.insert(name.to_string(), Table::new());
        self.owners.insert(name.to_string(), origin.clone());
        self.by_origin.insert(origin, name.to_string());
    }

    fn unique_name(&self, qualified: String) -> String {
        if !self.owners.contains_key(&qualified) {
            return qualified;
        }
        (2..)
            .map(|n| format!("{}#{}", qualified, n))
            .find(|candidate| !self.owners.contains_key(candidate))
            .unwrap_or(qualified)
    }
}

fn ref_origin(reference: &str) -> String {
    format!("ref:{}", reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog(schemas: Value) -> Catalog {
        Catalog::from_document(&json!({ "components": { "schemas": schemas } }))
    }

    #[test]
    fn test_array_of_refs_yields_two_tables() {
        let catalog = catalog(json!({
            "Item": {
                "type": "object",
                "required": ["id"],
                "properties": {
                    "id": { "type": "string", "format": "uuid", "description": "Item id" }
                }
            }
        }));
        let body = json!({
            "type": "object",
            "properties": {
                "items": {
                    "type": "array", "minItems": 2, "maxItems": 2,
                    "items": { "$ref": "#/components/schemas/Item" }
                }
            }
        });

        let tables = flatten(&body, &catalog, "JSON Message Body").unwrap();
        assert_eq!(tables.keys().collect::<Vec<_>>(), vec!["JSON Message Body", "Item"]);
        assert_eq!(tables["JSON Message Body"]["items"].type_label, "array[Item]");

        let id = &tables["Item"]["id"];
        assert_eq!(id.type_label, "string/uuid");
        assert_eq!(id.description, "Item id");
        assert!(id.required);
    }

    #[test]
    fn test_root_ref_takes_base_name() {
        let catalog = catalog(json!({
            "Order": {
                "type": "object",
                "properties": { "customer": { "$ref": "#/components/schemas/Customer" } }
            },
            "Customer": {
                "type": "object",
                "properties": { "name": { "type": "string" } }
            }
        }));
        let body = json!({ "$ref": "#/components/schemas/Order" });

        let tables = flatten(&body, &catalog, "Response").unwrap();
        assert_eq!(tables.keys().collect::<Vec<_>>(), vec!["Response", "Customer"]);
        assert!(!tables.contains_key("Order"));
        assert_eq!(tables["Response"]["customer"].type_label, "Customer");
    }

    #[test]
    fn test_shared_ref_is_memoized() {
        let catalog = catalog(json!({
            "Address": { "type": "object", "properties": { "city": { "type": "string" } } }
        }));
        let body = json!({
            "type": "object",
            "properties": {
                "billing": { "$ref": "#/components/schemas/Address" },
                "shipping": { "$ref": "#/components/schemas/Address" }
            }
        });
        let tables = flatten(&body, &catalog, "JSON Message Body").unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables["JSON Message Body"]["shipping"].type_label, "Address");
    }

    #[test]
    fn test_inline_name_collision_is_qualified() {
        let body = json!({
            "type": "object",
            "properties": {
                "buyer": {
                    "type": "object",
                    "properties": {
                        "address": {
                            "type": "object",
                            "properties": { "street": { "type": "string" } }
                        }
                    }
                },
                "seller": {
                    "type": "object",
                    "properties": {
                        "address": {
                            "type": "object",
                            "properties": { "zip": { "type": "string" } }
                        }
                    }
                }
            }
        });
        let tables = flatten(&body, &Catalog::new(), "JSON Message Body").unwrap();
        assert_eq!(
            tables.keys().collect::<Vec<_>>(),
            vec!["JSON Message Body", "buyer", "address", "seller", "seller.address"]
        );
        assert_eq!(tables["seller"]["address"].type_label, "seller.address");
        assert!(tables["seller.address"].contains_key("zip"));
    }

    #[test]
    fn test_recursive_schema_terminates() {
        let catalog = catalog(json!({
            "Node": {
                "type": "object",
                "properties": {
                    "value": { "type": "integer" },
                    "children": {
                        "type": "array",
                        "items": { "$ref": "#/components/schemas/Node" }
                    }
                }
            }
        }));
        let body = json!({
            "type": "object",
            "properties": { "root": { "$ref": "#/components/schemas/Node" } }
        });
        let tables = flatten(&body, &catalog, "JSON Message Body").unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables["Node"]["children"].type_label, "array[Node]");
    }

    #[test]
    fn test_depth_cut_reference_is_filled_by_later_expansion() {
        let catalog = catalog(json!({
            "Address": { "type": "object", "properties": { "city": { "type": "string" } } }
        }));
        let body = json!({
            "type": "object",
            "properties": {
                "deep": { "type": "object", "properties": {
                    "inner": { "type": "object", "properties": {
                        "address": { "$ref": "#/components/schemas/Address" }
                    } }
                } },
                "home": { "$ref": "#/components/schemas/Address" }
            }
        });
        let policy = FallbackPolicy {
            max_depth: 3,
            ..FallbackPolicy::default()
        };

        let tables = flatten_with_policy(&body, &catalog, "JSON Message Body", policy).unwrap();
        assert_eq!(
            tables.keys().collect::<Vec<_>>(),
            vec!["JSON Message Body", "deep", "inner", "Address"]
        );
        assert_eq!(tables["inner"]["address"].type_label, "Address");
        assert_eq!(tables["JSON Message Body"]["home"].type_label, "Address");
        assert!(tables["Address"].contains_key("city"));
    }

    #[test]
    fn test_untyped_array_and_absent_body() {
        let body = json!({
            "type": "object",
            "properties": { "tags": { "type": "array" } }
        });
        let tables = flatten(&body, &Catalog::new(), "JSON Message Body").unwrap();
        assert_eq!(tables["JSON Message Body"]["tags"].type_label, "array[unknown]");

        assert!(flatten(&json!({}), &Catalog::new(), "Response").unwrap().is_empty());
        assert!(flatten(&Value::Null, &Catalog::new(), "Response").unwrap().is_empty());
    }

    #[test]
    fn test_top_level_array_keeps_empty_base_first() {
        let catalog = catalog(json!({
            "Item": { "type": "object", "properties": { "id": { "type": "string" } } }
        }));
        let body = json!({ "type": "array", "items": { "$ref": "#/components/schemas/Item" } });
        let tables = flatten(&body, &catalog, "Response").unwrap();
        assert_eq!(tables.keys().collect::<Vec<_>>(), vec!["Response", "Item"]);
        assert!(tables["Response"].is_empty());
    }
}
