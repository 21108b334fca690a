//! Tool Client - HTTP client for invoking operations on a tool host
//!
//! Every operation is served at `POST {base_url}/tools/{operation}` and
//! answers with a [`ToolResponse`] envelope. The client owns connection
//! reuse and a per-call timeout. It never retries: a failed call surfaces
//! immediately and retry policy is left to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

pub mod types;
pub use types::*;

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Connection settings for a [`ToolClient`].
#[derive(Debug, Clone)]
pub struct ToolClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ToolClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ToolClientConfig {
    /// `TOOL_HOST_URL` and `TOOL_CALL_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("TOOL_HOST_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let timeout_secs = std::env::var("TOOL_CALL_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Anything that can carry a [`ToolRequest`] to a host.
///
/// Steps depend on this trait rather than on [`ToolClient`] so tests can
/// substitute an in-process fake.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, request: ToolRequest) -> Result<serde_json::Value, ToolFailure>;
}

/// Invoke a typed operation and decode its payload.
pub async fn call<T: ToolCall>(
    invoker: &(dyn ToolInvoker + '_),
    args: &T::Args,
) -> Result<T::Payload, ToolFailure> {
    let request = ToolRequest::new::<T>(args)?;
    let payload = invoker.invoke(request).await?;
    serde_json::from_value(payload).map_err(|e| {
        ToolFailure::transport(format!(
            "malformed {} payload: {}",
            T::OPERATION,
            e
        ))
    })
}

/// Client for a remote tool host
#[derive(Clone)]
pub struct ToolClient {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl ToolClient {
    pub fn new(config: &ToolClientConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            timeout: config.timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the host is reachable
    pub async fn is_running(&self) -> bool {
        self.health_check().await.is_ok()
    }

    /// Health check
    pub async fn health_check(&self) -> Result<HealthResponse, ToolFailure> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        resp.json()
            .await
            .map_err(|e| ToolFailure::transport(e.to_string()))
    }

    /// List the operations the host has registered
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolFailure> {
        let url = format!("{}/tools", self.base_url);
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        resp.json()
            .await
            .map_err(|e| ToolFailure::transport(e.to_string()))
    }

    /// Invoke an operation by its wire name.
    ///
    /// Names the host does not know come back as [`ToolFailureKind::NotFound`].
    pub async fn invoke_named(
        &self,
        operation: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolFailure> {
        let url = format!("{}/tools/{}", self.base_url, operation);
        debug!("[TOOL_CLIENT] POST {}", url);

        let resp = self
            .client
            .post(&url)
            .timeout(self.timeout)
            .json(&arguments)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.classify(e))?;

        let envelope: ToolResponse = serde_json::from_slice(&body).map_err(|e| {
            ToolFailure::transport(format!(
                "unexpected response from tool host (HTTP {}): {}",
                status, e
            ))
        })?;

        envelope.into_result().inspect_err(|failure| {
            warn!("[TOOL_CLIENT] {} failed: {}", operation, failure);
        })
    }

    fn classify(&self, e: reqwest::Error) -> ToolFailure {
        if e.is_timeout() {
            ToolFailure::timeout(format!(
                "no response from {} within {:?}",
                self.base_url, self.timeout
            ))
        } else {
            ToolFailure::transport(format!(
                "tool host not reachable at {}: {}",
                self.base_url, e
            ))
        }
    }
}

#[async_trait]
impl ToolInvoker for ToolClient {
    async fn invoke(&self, request: ToolRequest) -> Result<serde_json::Value, ToolFailure> {
        self.invoke_named(request.operation.as_str(), request.arguments)
            .await
    }
}
