use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub endpoints: usize,
}

/// Health endpoints shared by the receiver and sender services
pub struct HealthHandler {
    service: String,
    endpoints: usize,
    start_time: std::time::Instant,
}

impl HealthHandler {
    pub fn new(service: impl Into<String>, endpoints: usize) -> Self {
        Self {
            service: service.into(),
            endpoints,
            start_time: std::time::Instant::now(),
        }
    }

    /// Returns 200 while the server is running
    pub async fn health(&self) -> impl IntoResponse {
        let status = HealthStatus {
            status: "healthy".to_string(),
            service: self.service.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            endpoints: self.endpoints,
        };

        (StatusCode::OK, Json(status))
    }

    pub async fn live(&self) -> impl IntoResponse {
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "alive",
                "message": "Server is alive"
            })),
        )
    }
}
