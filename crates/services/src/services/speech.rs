//! ElevenLabs speech and LLM scripts for podcast generation.

use std::time::Duration;

use async_trait::async_trait;
use notebook::{
    models::{Conversation, Speaker},
    ConversationWriter, NotebookError, SpeechSynthesizer,
};
use reqwest::Client;
use serde_json::json;

use super::llm::LlmClient;

const ELEVENLABS_API: &str = "https://api.elevenlabs.io/v1";
const SPEAKER1_VOICE: &str = "nPczCjzI2devNBz1zQrb";
const SPEAKER2_VOICE: &str = "Xb7hH8MSUJpSbSDYk0k2";
const SPEECH_MODEL: &str = "eleven_turbo_v2_5";
const OUTPUT_FORMAT: &str = "mp3_22050_32";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub api_key: String,
    pub base_url: String,
    pub speaker1_voice: String,
    pub speaker2_voice: String,
    pub model: String,
    pub output_format: String,
    /// Per-turn request timeout.
    pub timeout: Duration,
}

impl SpeechConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: ELEVENLABS_API.to_string(),
            speaker1_voice: SPEAKER1_VOICE.to_string(),
            speaker2_voice: SPEAKER2_VOICE.to_string(),
            model: SPEECH_MODEL.to_string(),
            output_format: OUTPUT_FORMAT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Present only when `ELEVENLABS_API_KEY` is set. `ELEVENLABS_TIMEOUT_SECS`
    /// overrides the per-turn timeout.
    pub fn from_env() -> Option<Self> {
        let config = std::env::var("ELEVENLABS_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(Self::new)?;
        match std::env::var("ELEVENLABS_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            Some(secs) => Some(config.with_timeout(Duration::from_secs(secs))),
            None => Some(config),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn voice_for(&self, speaker: Speaker) -> &str {
        match speaker {
            Speaker::Speaker1 => &self.speaker1_voice,
            Speaker::Speaker2 => &self.speaker2_voice,
        }
    }

    pub fn endpoint_for(&self, speaker: Speaker) -> String {
        format!(
            "{}/text-to-speech/{}?output_format={}",
            self.base_url.trim_end_matches('/'),
            self.voice_for(speaker),
            self.output_format
        )
    }
}

#[derive(Clone)]
pub struct ElevenLabsSynthesizer {
    client: Client,
    config: SpeechConfig,
}

impl ElevenLabsSynthesizer {
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, speaker: Speaker, text: &str) -> notebook::Result<Vec<u8>> {
        let response = self
            .client
            .post(self.config.endpoint_for(speaker))
            .header("xi-api-key", &self.config.api_key)
            .timeout(self.config.timeout)
            .json(&json!({ "text": text, "model_id": self.config.model }))
            .send()
            .await
            .map_err(|e| NotebookError::Speech(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotebookError::Speech(format!(
                "elevenlabs returned {}: {}",
                status, body
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| NotebookError::Speech(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

pub struct LlmConversationWriter {
    llm: LlmClient,
}

impl LlmConversationWriter {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ConversationWriter for LlmConversationWriter {
    async fn write_conversation(&self, prompt: &str) -> notebook::Result<Conversation> {
        self.llm
            .complete_json::<Conversation>(
                "You write podcast scripts. speaker1 opens and the speakers alternate.",
                prompt,
            )
            .await
            .map_err(|e| NotebookError::Conversation(e.to_string()))
    }
}
