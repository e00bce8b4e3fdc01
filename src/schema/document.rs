//! Schema document loading and OpenAPI operation lookup

use serde_json::Value;
use std::path::Path;

use super::error::DocumentError;

const HTTP_METHODS: &[&str] = &["get", "post", "put", "patch", "delete", "head", "options"];

/// Read a JSON or YAML document, chosen by file extension
pub fn load_document(path: impl AsRef<Path>) -> Result<Value, DocumentError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: display.clone(),
        source,
    })?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|source| DocumentError::Json {
            path: display,
            source,
        }),
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|source| DocumentError::Yaml {
                path: display,
                source,
            })
        }
        other => Err(DocumentError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

/// One path + method entry of an OpenAPI document
#[derive(Debug, Clone, Copy)]
pub struct Operation<'a> {
    pub path: &'a str,
    /// Lowercase, as written in the document
    pub method: &'a str,
    pub details: &'a Value,
}

impl<'a> Operation<'a> {
    fn text(&self, key: &str) -> Option<&'a str> {
        self.details.get(key).and_then(Value::as_str)
    }

    pub fn operation_id(&self) -> Option<&'a str> {
        self.text("operationId")
    }

    pub fn summary(&self) -> Option<&'a str> {
        self.text("summary")
    }

    pub fn description(&self) -> Option<&'a str> {
        self.text("description")
    }

    /// `operationId`, or `METHOD /path` when absent
    pub fn title(&self) -> String {
        match self.operation_id() {
            Some(id) => id.to_string(),
            None => format!("{} {}", self.method.to_uppercase(), self.path),
        }
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("get")
    }

    /// `requestBody.content.application/json.schema`
    pub fn request_schema(&self) -> Option<&'a Value> {
        self.details
            .get("requestBody")
            .and_then(json_content_schema)
    }

    /// `responses.<status>.content.application/json.schema`
    pub fn response_schema(&self, status: &str) -> Option<&'a Value> {
        self.details
            .get("responses")
            .and_then(|responses| responses.get(status))
            .and_then(json_content_schema)
    }
}

fn json_content_schema(section: &Value) -> Option<&Value> {
    section
        .get("content")
        .and_then(|content| content.get("application/json"))
        .and_then(|media| media.get("schema"))
}

/// Every operation in declaration order. Path-level keys that are not HTTP
/// methods (`parameters`, `summary`, ...) are skipped.
pub fn operations(document: &Value) -> Vec<Operation<'_>> {
    let Some(paths) = document.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };

    paths
        .iter()
        .flat_map(|(path, item)| {
            item.as_object()
                .into_iter()
                .flat_map(|methods| methods.iter())
                .filter(|(method, _)| HTTP_METHODS.contains(&method.to_ascii_lowercase().as_str()))
                .map(move |(method, details)| Operation {
                    path: path.as_str(),
                    method: method.as_str(),
                    details,
                })
        })
        .collect()
}
