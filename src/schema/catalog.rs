//! Named component schemas that `$ref` pointers resolve against

use indexmap::IndexMap;
use serde_json::Value;

/// Immutable lookup table of reusable schema fragments.
///
/// Built once per loaded document and shared read-only (usually behind an `Arc`)
/// by every walk over that document.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    schemas: IndexMap<String, Value>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect schemas from `components.schemas`, `definitions` and `$defs`.
    /// Later sections win on name clashes.
    pub fn from_document(document: &Value) -> Self {
        let mut schemas = IndexMap::new();

        let sections = [
            document.pointer("/definitions"),
            document.pointer("/$defs"),
            document.pointer("/components/schemas"),
        ];
        for section in sections.into_iter().flatten() {
            if let Some(entries) = section.as_object() {
                for (name, schema) in entries {
                    schemas.insert(name.clone(), schema.clone());
                }
            }
        }

        Self { schemas }
    }

    pub fn with_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.schemas.insert(name.into(), schema);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Extract the catalog name from a reference pointer.
///
/// `#/components/schemas/Item`, `#/definitions/Item` and `#/$defs/Item` all yield
/// `Item`. JSON pointer escapes (`~1`, `~0`) are decoded.
pub fn reference_name(pointer: &str) -> String {
    let last = pointer.rsplit('/').next().unwrap_or(pointer);
    last.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalog_from_openapi_document() {
        let doc = json!({
            "openapi": "3.0.0",
            "components": {
                "schemas": {
                    "Item": { "type": "object" },
                    "Order": { "type": "object" }
                }
            }
        });
        let catalog = Catalog::from_document(&doc);
        assert_eq!(catalog.len(), 2);
        assert!(catalog.contains("Item"));
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["Item", "Order"]);
    }

    #[test]
    fn test_catalog_from_json_schema_definitions() {
        let doc = json!({
            "definitions": { "A": { "type": "string" } },
            "$defs": { "B": { "type": "integer" } }
        });
        let catalog = Catalog::from_document(&doc);
        assert!(catalog.contains("A"));
        assert!(catalog.contains("B"));
    }

    #[test]
    fn test_reference_name() {
        assert_eq!(reference_name("#/components/schemas/Item"), "Item");
        assert_eq!(reference_name("#/$defs/Node"), "Node");
        assert_eq!(reference_name("#/definitions/a~1b"), "a/b");
        assert_eq!(reference_name("Plain"), "Plain");
    }
}
