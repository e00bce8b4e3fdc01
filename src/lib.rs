//! # Hermes - schema-driven interface test harness
//!
//! Hermes reads endpoint schemas (flat field lists or OpenAPI documents) and
//! drives three tools from one resolution engine:
//!
//! - **Receiver**: mock HTTP service validating inbound payloads against each route's schema
//! - **Sender**: synthesizes constraint-respecting payloads and dispatches them to a target
//! - **Translator**: renders two OpenAPI documents into a Markdown interface description
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hermes::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::new()?;
//!     let app = hermes::create_receiver_app(&settings)?;
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Schema**: reference resolution, validation, synthesis and flattening
//! - **Domain**: endpoints, targets and the dispatch port
//! - **Adapters**: HTTP handlers, the `reqwest` dispatcher, the document compiler
//! - **Config**: settings, endpoint files, validation and live reload

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod schema;

use crate::adapters::health_handler::HealthHandler;
use crate::adapters::metrics_handler::{MetricsCollector, MetricsHandler};
use crate::adapters::receiver_handler::{claimed_paths, receiver_router};
use crate::adapters::sender_handler::{self, SenderState};
use crate::config::endpoints::receiver_endpoints;
use crate::config::Settings;
use axum::{
    routing::{get, post, MethodRouter},
    Router,
};
use std::collections::HashSet;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Health and metrics routes. A path in `claimed` belongs to a configured
/// endpoint and is left to it.
fn ops_router(
    health_handler: Arc<HealthHandler>,
    metrics_handler: Arc<MetricsHandler>,
    claimed: &HashSet<String>,
) -> Router {
    let routes: [(&str, MethodRouter); 3] = [
        ("/health", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.health().await }
            }
        })),
        ("/health/live", get({
            let handler = health_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.live().await }
            }
        })),
        ("/metrics", get({
            let handler = metrics_handler.clone();
            move || {
                let h = handler.clone();
                async move { h.metrics().await }
            }
        })),
    ];

    routes
        .into_iter()
        .fold(Router::new(), |router, (path, method_router)| {
            if claimed.contains(path) {
                tracing::warn!("{} is served by a configured endpoint", path);
                router
            } else {
                router.route(path, method_router)
            }
        })
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Creates the receiver application: one validated route per configured
/// endpoint plus health and metrics.
pub fn create_receiver_app(settings: &Settings) -> anyhow::Result<Router> {
    let endpoints = receiver_endpoints(settings)?;
    let collector = Arc::new(MetricsCollector::new()?);
    let health_handler = Arc::new(HealthHandler::new("receiver", endpoints.len()));
    let metrics_handler = Arc::new(MetricsHandler::new(collector.clone()));

    tracing::info!(
        "{} {} serving {} endpoints",
        settings.receiver.title,
        settings.receiver.version,
        endpoints.len()
    );

    let claimed = claimed_paths(&endpoints);
    let app = receiver_router(endpoints, settings.receiver.extra_fields, collector)
        .merge(ops_router(health_handler, metrics_handler, &claimed))
        .layer(cors());
    Ok(app)
}

/// Sender API routes, without health, metrics or CORS
pub fn sender_router(state: SenderState) -> Router {
    Router::new()
        .route(
            "/generate_body/:endpoint_index",
            get(sender_handler::generate_body),
        )
        .route("/send_request", post(sender_handler::send_request))
        .route("/reload_config", post(sender_handler::reload_config))
        .route("/config", get(sender_handler::reload_config))
        .with_state(state)
}

/// Creates the sender application around an already loaded state
pub async fn create_sender_app(state: SenderState) -> Router {
    let endpoints = state.snapshot().await.endpoints.len();
    let health_handler = Arc::new(HealthHandler::new("sender", endpoints));
    let metrics_handler = Arc::new(MetricsHandler::new(state.metrics()));

    sender_router(state)
        .merge(ops_router(health_handler, metrics_handler, &HashSet::new()))
        .layer(cors())
}
