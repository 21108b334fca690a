//! OpenAI-compatible chat completions.

use std::time::Duration;

use reqwest::Client;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::ServiceError;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4.1";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Present only when `OPENAI_API_KEY` is set. `OPENAI_BASE_URL` points
    /// at a compatible server, `OPENAI_MODEL` overrides the model.
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let mut config = Self::new(api_key);
        if let Ok(base) = std::env::var("OPENAI_BASE_URL") {
            config.endpoint = format!("{}/chat/completions", base.trim_end_matches('/'));
        }
        if let Ok(model) = std::env::var("OPENAI_MODEL") {
            config.model = model;
        }
        Some(config)
    }
}

/// Thin chat client. Callers own the prompts.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        tracing::info!("[LLM] Using model {} at {}", config.model, config.endpoint);
        Self {
            client: Client::new(),
            config,
        }
    }

    /// One system + user exchange. Returns the assistant's text.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        json_mode: bool,
    ) -> Result<String, ServiceError> {
        let mut body = json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
        });
        if json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Api {
                provider: "openai",
                status: status.as_u16(),
                body,
            });
        }

        let value: serde_json::Value = response.json().await?;
        value["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ServiceError::InvalidResponse("completion has no content".to_string()))
    }

    /// Ask for a JSON object matching `T`'s schema and decode it.
    pub async fn complete_json<T>(&self, instructions: &str, user: &str) -> Result<T, ServiceError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let schema = serde_json::to_string(&schemars::schema_for!(T))?;
        let system = format!(
            "{}\n\nRespond with a single JSON object that validates against this JSON schema:\n{}",
            instructions, schema
        );
        let text = self.complete(&system, user, true).await?;
        Ok(serde_json::from_str(strip_code_fence(&text))?)
    }
}

/// Some compatible servers wrap JSON answers in a markdown fence.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}
