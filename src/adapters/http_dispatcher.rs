use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Method};
use serde_json::Value;
use std::time::Duration;

use crate::domain::{DispatchOutcome, DispatchPort, Endpoint, HttpMethod, Target};

/// Sends endpoint requests over HTTP with `reqwest`
pub struct HttpDispatcher {
    client: Client,
}

impl HttpDispatcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

fn to_reqwest(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

#[async_trait]
impl DispatchPort for HttpDispatcher {
    async fn dispatch(
        &self,
        target: &Target,
        endpoint: &Endpoint,
        body: Option<&Value>,
    ) -> DispatchOutcome {
        let url = target.url_for(&endpoint.url);
        let mut request = self.client.request(to_reqwest(endpoint.method), &url);
        if endpoint.method.has_body() {
            if let Some(body) = body {
                request = request.json(body);
            }
        }

        tracing::info!("Dispatching {} {}", endpoint.method, url);

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Dispatch to {} failed: {}", url, e);
                return DispatchOutcome::Error {
                    error: e.to_string(),
                };
            }
        };

        let status_code = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);

        let json = if is_json {
            match response.json::<Value>().await {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("Response from {} is not valid JSON: {}", url, e);
                    None
                }
            }
        } else {
            None
        };

        DispatchOutcome::Response { status_code, json }
    }
}
