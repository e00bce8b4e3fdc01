use axum::{
    body::Bytes,
    http::StatusCode,
    routing::{MethodFilter, MethodRouter},
    Json, Router,
};
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::adapters::metrics_handler::MetricsCollector;
use crate::domain::{Endpoint, HttpMethod};
use crate::schema::{ExtraFields, ValidationModel};

/// One registered receiver route and the model its payloads are checked against
pub struct ReceiverRoute {
    endpoint: Endpoint,
    model: Option<ValidationModel>,
    metrics: Arc<MetricsCollector>,
}

impl ReceiverRoute {
    pub fn new(
        endpoint: Endpoint,
        extra_fields: ExtraFields,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        let model = endpoint
            .body
            .as_ref()
            .map(|body| ValidationModel::from_node(body).with_extra_fields(extra_fields));
        Self {
            endpoint,
            model,
            metrics,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub async fn handle(&self, body: Bytes) -> (StatusCode, Json<Value>) {
        let route = self.endpoint.route();
        let (status, reply) = self.evaluate(&route, &body);
        self.metrics
            .requests_total
            .with_label_values(&[
                self.endpoint.method.as_str(),
                self.endpoint.url.as_str(),
                status.as_str(),
            ])
            .inc();
        (status, Json(reply))
    }

    fn evaluate(&self, route: &str, body: &[u8]) -> (StatusCode, Value) {
        let Some(model) = &self.model else {
            return (StatusCode::OK, json!({ "message": "Valid" }));
        };

        let payload: Value = if body.iter().all(u8::is_ascii_whitespace) {
            Value::Null
        } else {
            match serde_json::from_slice(body) {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::debug!(route, "Rejected malformed JSON: {}", e);
                    self.record(route, "malformed");
                    return (
                        StatusCode::BAD_REQUEST,
                        json!({ "message": "Invalid JSON", "detail": e.to_string() }),
                    );
                }
            }
        };

        match model.validate(&payload) {
            Ok(data) => {
                tracing::debug!(route, "Payload valid");
                self.record(route, "valid");
                (StatusCode::OK, json!({ "message": "Valid", "data": data }))
            }
            Err(failure) => {
                tracing::debug!(route, "Payload invalid: {}", failure);
                self.record(route, "invalid");
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    json!({ "message": "Invalid", "errors": failure.errors }),
                )
            }
        }
    }

    fn record(&self, route: &str, outcome: &str) {
        self.metrics
            .validations_total
            .with_label_values(&[route, outcome])
            .inc();
    }
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Patch => MethodFilter::PATCH,
        HttpMethod::Delete => MethodFilter::DELETE,
    }
}

/// `/orders/{id}` (OpenAPI templating) to `/orders/:p2` (axum capture).
///
/// Captures are named by segment position, so templates that differ only in
/// parameter names (`{id}` vs `{orderId}`) share one route.
pub fn axum_path(url: &str) -> String {
    url.split('/')
        .enumerate()
        .map(|(position, segment)| {
            if segment.starts_with('{') && segment.ends_with('}') {
                format!(":p{}", position)
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Paths claimed by receiver endpoints, in their registered form
pub fn claimed_paths(endpoints: &[Endpoint]) -> HashSet<String> {
    endpoints
        .iter()
        .map(|endpoint| axum_path(&endpoint.url))
        .collect()
}

/// Register every endpoint with its declared method. Endpoints sharing a path
/// share one method router; a repeated method + path keeps the first entry.
pub fn receiver_router(
    endpoints: Vec<Endpoint>,
    extra_fields: ExtraFields,
    metrics: Arc<MetricsCollector>,
) -> Router {
    let mut seen = HashSet::new();
    let mut grouped: IndexMap<String, Vec<Arc<ReceiverRoute>>> = IndexMap::new();

    for endpoint in endpoints {
        if !seen.insert(endpoint.route()) {
            tracing::warn!("Duplicate route {}, keeping the first definition", endpoint.route());
            continue;
        }
        let path = axum_path(&endpoint.url);
        let route = ReceiverRoute::new(endpoint, extra_fields, metrics.clone());
        grouped.entry(path).or_default().push(Arc::new(route));
    }

    let mut router: Router = Router::new();
    for (path, routes) in grouped {
        let mut method_router: MethodRouter = MethodRouter::new();
        for route in routes {
            tracing::info!("Registered receiver route {}", route.endpoint().route());
            let filter = method_filter(route.endpoint().method);
            method_router = method_router.on(filter, move |body: Bytes| {
                let route = route.clone();
                async move { route.handle(body).await }
            });
        }
        router = router.route(&path, method_router);
    }
    router
}
