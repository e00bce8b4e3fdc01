use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::schema::SchemaNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

#[derive(Debug, Error, PartialEq)]
#[error("Unsupported HTTP method: {0}")]
pub struct UnsupportedMethod(pub String);

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// GET endpoints never carry a payload
    pub fn has_body(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl FromStr for HttpMethod {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _ => Err(UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved endpoint, ready for validation or synthesis
#[derive(Debug, Clone, Serialize)]
pub struct Endpoint {
    pub url: String,
    pub method: HttpMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Request body schema; `None` for GET
    #[serde(skip)]
    pub body: Option<SchemaNode>,
}

impl Endpoint {
    pub fn route(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// Where the sender dispatches to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn url_for(&self, path: &str) -> String {
        format!("http://{}:{}{}", self.host, self.port, path)
    }
}

/// Result of one dispatch as reported back to sender clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DispatchOutcome {
    Response {
        status_code: u16,
        /// Parsed body when the target answered with `application/json`
        json: Option<Value>,
    },
    Error {
        error: String,
    },
}

#[async_trait]
pub trait DispatchPort: Send + Sync {
    async fn dispatch(
        &self,
        target: &Target,
        endpoint: &Endpoint,
        body: Option<&Value>,
    ) -> DispatchOutcome;
}
