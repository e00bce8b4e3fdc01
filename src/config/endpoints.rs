//! Turn endpoint configuration into resolved [`Endpoint`]s

use anyhow::Context;
use serde_json::Value;
use std::path::Path;

use crate::config::{EndpointConfig, Settings};
use crate::domain::{Endpoint, HttpMethod};
use crate::schema::{
    load_document, operations, Catalog, FallbackPolicy, FieldList, SchemaWalker,
};

/// Model name given to request bodies, matching the receiver's historical naming
pub const REQUEST_MODEL: &str = "RequestModel";

/// Build one endpoint from its flat field list
pub fn build_endpoint(
    config: &EndpointConfig,
    policy: &FallbackPolicy,
) -> anyhow::Result<Endpoint> {
    let method: HttpMethod = config.method.parse()?;
    let body = if method.has_body() {
        let node = FieldList::with_policy(&config.body_fields, policy.clone())
            .to_node(REQUEST_MODEL)
            .with_context(|| format!("Failed to build body for {} {}", method, config.url))?;
        Some(node)
    } else {
        None
    };

    Ok(Endpoint {
        url: config.url.clone(),
        method,
        description: config.description.clone(),
        body,
    })
}

/// One endpoint per supported path + method of an OpenAPI document.
/// Request bodies are resolved against the document's own component schemas.
pub fn openapi_endpoints(
    document: &Value,
    policy: &FallbackPolicy,
) -> anyhow::Result<Vec<Endpoint>> {
    let catalog = Catalog::from_document(document);
    let walker = SchemaWalker::with_policy(&catalog, policy.clone());

    let mut endpoints = Vec::new();
    for operation in operations(document) {
        let method: HttpMethod = match operation.method.parse() {
            Ok(method) => method,
            Err(e) => {
                tracing::debug!(path = operation.path, "Skipping operation: {}", e);
                continue;
            }
        };

        let body = match operation.request_schema() {
            Some(schema) if method.has_body() => Some(
                walker.resolve(schema, REQUEST_MODEL).with_context(|| {
                    format!("Failed to resolve body for {} {}", method, operation.path)
                })?,
            ),
            _ => None,
        };

        endpoints.push(Endpoint {
            url: operation.path.to_string(),
            method,
            description: operation
                .summary()
                .or_else(|| operation.description())
                .map(String::from),
            body,
        });
    }

    Ok(endpoints)
}

fn load_openapi(settings: &Settings, path: &Path) -> anyhow::Result<Vec<Endpoint>> {
    let path = settings.resolve_path(path);
    let document = load_document(&path)?;
    openapi_endpoints(&document, &settings.engine)
        .with_context(|| format!("Invalid OpenAPI document {}", path.display()))
}

/// Receiver routes: endpoint files first, then the optional OpenAPI document
pub fn receiver_endpoints(settings: &Settings) -> anyhow::Result<Vec<Endpoint>> {
    let mut endpoints = settings
        .receiver_endpoints
        .iter()
        .map(|config| build_endpoint(config, &settings.engine))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if let Some(path) = &settings.receiver.openapi {
        endpoints.extend(load_openapi(settings, path)?);
    }
    Ok(endpoints)
}

/// Sender endpoints, indexed as listed: endpoint files first, then the OpenAPI document
pub fn sender_endpoints(settings: &Settings) -> anyhow::Result<Vec<Endpoint>> {
    let mut endpoints = settings
        .sender_endpoints
        .iter()
        .map(|config| build_endpoint(config, &settings.engine))
        .collect::<anyhow::Result<Vec<_>>>()?;

    if let Some(path) = &settings.sender.openapi {
        endpoints.extend(load_openapi(settings, path)?);
    }
    Ok(endpoints)
}
