//! Sender service: synthesizes request bodies for configured endpoints and
//! dispatches them to a target receiver.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::adapters::metrics_handler::MetricsCollector;
use crate::config::endpoints::sender_endpoints;
use crate::config::{ConfigSource, Settings};
use crate::domain::{DispatchOutcome, DispatchPort, Endpoint, Target};
use crate::schema::{EngineError, Synthesizer};

#[derive(Debug, Error)]
pub enum SenderError {
    #[error("Endpoint not found")]
    EndpointNotFound(usize),

    #[error("Body synthesis failed: {0}")]
    Synthesis(#[from] EngineError),
}

impl SenderError {
    fn status(&self) -> StatusCode {
        match self {
            Self::EndpointNotFound(_) => StatusCode::NOT_FOUND,
            Self::Synthesis(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_reply(self) -> (StatusCode, Json<Value>) {
        (self.status(), Json(json!({ "detail": self.to_string() })))
    }
}

/// Settings plus the endpoints resolved from them. Replaced as a whole on reload.
#[derive(Debug)]
pub struct SenderRuntime {
    pub settings: Settings,
    pub endpoints: Vec<Endpoint>,
}

impl SenderRuntime {
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let endpoints = sender_endpoints(&settings)?;
        Ok(Self {
            settings,
            endpoints,
        })
    }

    pub fn load(source: &ConfigSource) -> anyhow::Result<Self> {
        Self::from_settings(source.load()?)
    }

    pub fn endpoint(&self, index: usize) -> Result<&Endpoint, SenderError> {
        self.endpoints
            .get(index)
            .ok_or(SenderError::EndpointNotFound(index))
    }

    pub fn target(&self) -> Target {
        Target {
            host: self.settings.sender.target_host.clone(),
            port: self.settings.sender.target_port,
        }
    }

    /// What `/config` reports: the target plus every endpoint by index
    pub fn summary(&self) -> Value {
        let endpoints: Vec<Value> = self
            .endpoints
            .iter()
            .enumerate()
            .map(|(index, endpoint)| {
                json!({
                    "index": index,
                    "url": endpoint.url,
                    "method": endpoint.method,
                    "description": endpoint.description,
                })
            })
            .collect();

        json!({
            "target_host": self.settings.sender.target_host,
            "target_port": self.settings.sender.target_port,
            "timeout_seconds": self.settings.sender.timeout_seconds,
            "endpoints": endpoints,
        })
    }
}

/// Body of `POST /send_request`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendRequest {
    pub endpoint_index: usize,
    /// Sent as-is when given, synthesized otherwise
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Clone)]
pub struct SenderState {
    runtime: Arc<RwLock<Arc<SenderRuntime>>>,
    source: Option<ConfigSource>,
    dispatcher: Arc<dyn DispatchPort>,
    metrics: Arc<MetricsCollector>,
}

impl SenderState {
    pub fn new(
        runtime: SenderRuntime,
        source: Option<ConfigSource>,
        dispatcher: Arc<dyn DispatchPort>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            runtime: Arc::new(RwLock::new(Arc::new(runtime))),
            source,
            dispatcher,
            metrics,
        }
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub async fn snapshot(&self) -> Arc<SenderRuntime> {
        self.runtime.read().await.clone()
    }

    /// Rebuild the runtime from disk and swap it in. Without a config source
    /// the current runtime is kept.
    pub async fn reload(&self) -> anyhow::Result<Arc<SenderRuntime>> {
        let Some(source) = &self.source else {
            return Ok(self.snapshot().await);
        };

        let runtime = Arc::new(SenderRuntime::load(source)?);
        *self.runtime.write().await = runtime.clone();
        tracing::info!(
            "Sender configuration reloaded ({} endpoints)",
            runtime.endpoints.len()
        );
        Ok(runtime)
    }

    /// Example body for one endpoint. GET and schema-less endpoints get `{}`.
    pub async fn generate_body(&self, index: usize) -> Result<Value, SenderError> {
        let runtime = self.snapshot().await;
        let endpoint = runtime.endpoint(index)?;
        Ok(self
            .synthesize(&runtime, endpoint)?
            .unwrap_or_else(|| json!({})))
    }

    pub async fn send(&self, request: SendRequest) -> Result<DispatchOutcome, SenderError> {
        let runtime = self.snapshot().await;
        let endpoint = runtime.endpoint(request.endpoint_index)?;

        let body = match request.body {
            Some(body) => Some(body),
            None => self.synthesize(&runtime, endpoint)?,
        };

        let mut target = runtime.target();
        if let Some(host) = request.host {
            target.host = host;
        }
        if let Some(port) = request.port {
            target.port = port;
        }

        let route = endpoint.route();
        let timer = self
            .metrics
            .dispatch_duration
            .with_label_values(&[route.as_str()])
            .start_timer();
        let outcome = self.dispatcher.dispatch(&target, endpoint, body.as_ref()).await;
        timer.observe_duration();

        let status = match &outcome {
            DispatchOutcome::Response { status_code, .. } => status_code.to_string(),
            DispatchOutcome::Error { .. } => "error".to_string(),
        };
        self.metrics
            .dispatches_total
            .with_label_values(&[route.as_str(), status.as_str()])
            .inc();

        Ok(outcome)
    }

    fn synthesize(
        &self,
        runtime: &SenderRuntime,
        endpoint: &Endpoint,
    ) -> Result<Option<Value>, SenderError> {
        let Some(schema) = endpoint.body.as_ref().filter(|_| endpoint.method.has_body()) else {
            return Ok(None);
        };

        let body = Synthesizer::new()
            .with_policy(runtime.settings.engine.clone())
            .synthesize(schema)?;
        self.metrics
            .bodies_synthesized
            .with_label_values(&[endpoint.route().as_str()])
            .inc();
        Ok(Some(body))
    }
}

pub async fn generate_body(
    State(state): State<SenderState>,
    Path(endpoint_index): Path<usize>,
) -> (StatusCode, Json<Value>) {
    match state.generate_body(endpoint_index).await {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => e.into_reply(),
    }
}

pub async fn send_request(
    State(state): State<SenderState>,
    Json(request): Json<SendRequest>,
) -> (StatusCode, Json<Value>) {
    match state.send(request).await {
        Ok(outcome) => (StatusCode::OK, Json(json!({ "response": outcome }))),
        Err(e) => e.into_reply(),
    }
}

/// Shared by `POST /reload_config` and `GET /config`
pub async fn reload_config(State(state): State<SenderState>) -> (StatusCode, Json<Value>) {
    match state.reload().await {
        Ok(runtime) => (
            StatusCode::OK,
            Json(json!({
                "message": "Config reloaded",
                "config": runtime.summary(),
            })),
        ),
        Err(e) => {
            tracing::error!("Failed to reload sender configuration: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": format!("{:#}", e) })),
            )
        }
    }
}
