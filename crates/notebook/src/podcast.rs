//! Two-speaker audio conversations generated from a transcript.

use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tokio::io::AsyncWriteExt;
use tracing::info;
use utils::ephemeral::{EphemeralFile, OwnedArtifact};
use uuid::Uuid;

use crate::{
    models::{Conversation, Speaker},
    Result,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PodcastStyle {
    #[default]
    Conversational,
    Interview,
    Debate,
    Educational,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PodcastTone {
    #[default]
    Friendly,
    Professional,
    Casual,
    Energetic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TargetAudience {
    #[default]
    General,
    Technical,
    Business,
    Expert,
    Beginner,
}

impl TargetAudience {
    pub fn instructions(&self) -> &'static str {
        match self {
            TargetAudience::Technical => {
                "Use technical terminology appropriately and dive deep into technical details."
            }
            TargetAudience::Beginner => {
                "Explain concepts clearly and avoid jargon. Define technical terms when used."
            }
            TargetAudience::Expert => {
                "Assume advanced knowledge and discuss nuanced aspects and implications."
            }
            TargetAudience::Business => {
                "Focus on practical applications, ROI, and strategic implications."
            }
            TargetAudience::General => {
                "Balance accessibility with depth, explaining key concepts clearly."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodcastConfig {
    #[serde(default)]
    pub style: PodcastStyle,
    #[serde(default)]
    pub tone: PodcastTone,
    #[serde(default)]
    pub focus_topics: Vec<String>,
    #[serde(default)]
    pub target_audience: TargetAudience,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    #[serde(default = "default_speaker1_role")]
    pub speaker1_role: String,
    #[serde(default = "default_speaker2_role")]
    pub speaker2_role: String,
}

fn default_speaker1_role() -> String {
    "host".to_string()
}

fn default_speaker2_role() -> String {
    "guest".to_string()
}

impl Default for PodcastConfig {
    fn default() -> Self {
        Self {
            style: PodcastStyle::default(),
            tone: PodcastTone::default(),
            focus_topics: Vec::new(),
            target_audience: TargetAudience::default(),
            custom_prompt: None,
            speaker1_role: default_speaker1_role(),
            speaker2_role: default_speaker2_role(),
        }
    }
}

impl PodcastConfig {
    pub fn build_prompt(&self, transcript: &str) -> String {
        let mut prompt = format!(
            "Create a {style} podcast conversation with two speakers from this transcript.\n\n\
             CONVERSATION STYLE: {style}\n\
             TONE: {tone}\n\
             TARGET AUDIENCE: {audience}\n\n\
             SPEAKER ROLES:\n\
             - Speaker 1: {s1}\n\
             - Speaker 2: {s2}\n",
            style = self.style,
            tone = self.tone,
            audience = self.target_audience,
            s1 = self.speaker1_role,
            s2 = self.speaker2_role,
        );

        if !self.focus_topics.is_empty() {
            prompt.push_str("\nFOCUS TOPICS: Make sure to discuss these topics in detail:\n");
            for topic in &self.focus_topics {
                prompt.push_str(&format!("- {}\n", topic));
            }
        }

        prompt.push_str(&format!(
            "\nAUDIENCE APPROACH: {}\n",
            self.target_audience.instructions()
        ));

        if let Some(custom) = self.custom_prompt.as_deref().filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!("\nADDITIONAL INSTRUCTIONS: {}\n", custom));
        }

        prompt.push_str(&format!("\nSOURCE MATERIAL:\n'''\n{}\n'''\n", transcript));
        prompt.push_str(
            "\nIMPORTANT: Create an engaging, natural conversation that flows well between the two speakers.\n\
             The conversation should feel authentic and provide value to the target audience.\n",
        );
        prompt
    }
}

/// Produces a conversation script from a prompt (typically an LLM).
#[async_trait]
pub trait ConversationWriter: Send + Sync {
    async fn write_conversation(&self, prompt: &str) -> Result<Conversation>;
}

/// Turns one line of dialogue into MP3 bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, speaker: Speaker, text: &str) -> Result<Vec<u8>>;
}

pub struct PodcastGenerator {
    writer: Arc<dyn ConversationWriter>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    scratch_dir: PathBuf,
    artifact_dir: PathBuf,
}

impl PodcastGenerator {
    pub fn new(
        writer: Arc<dyn ConversationWriter>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        artifact_dir: PathBuf,
    ) -> Self {
        Self {
            writer,
            synthesizer,
            scratch_dir: std::env::temp_dir(),
            artifact_dir,
        }
    }

    pub fn with_scratch_dir(mut self, scratch_dir: PathBuf) -> Self {
        self.scratch_dir = scratch_dir;
        self
    }

    pub async fn script(&self, transcript: &str, config: &PodcastConfig) -> Result<Conversation> {
        let prompt = config.build_prompt(transcript);
        let conversation = self.writer.write_conversation(&prompt).await?;
        conversation.validate()?;
        Ok(conversation)
    }

    /// Synthesize every turn into a scratch file, then join them into
    /// `conversation_<uuid>.mp3`. Scratch files never outlive this call.
    pub async fn render_audio(&self, conversation: &Conversation) -> Result<OwnedArtifact> {
        let mut turns = Vec::with_capacity(conversation.conversation.len());
        for (i, turn) in conversation.conversation.iter().enumerate() {
            let audio = self
                .synthesizer
                .synthesize(turn.speaker, &turn.content)
                .await?;
            let file = EphemeralFile::create_in(&self.scratch_dir, "turn-", ".mp3")?;
            file.write(&audio).await?;
            info!(
                "[PODCAST] Synthesized turn {}/{} ({} bytes)",
                i + 1,
                conversation.conversation.len(),
                audio.len()
            );
            turns.push(file);
        }

        let output_path = self
            .artifact_dir
            .join(format!("conversation_{}.mp3", Uuid::new_v4()));
        let output = EphemeralFile::adopt(&output_path);
        // MP3 frames are self-delimiting, so same-format segments join by concatenation.
        let mut out = tokio::fs::File::create(&output_path).await?;
        for turn in &turns {
            let bytes = tokio::fs::read(turn.path()).await?;
            out.write_all(&bytes).await?;
        }
        out.flush().await?;
        drop(out);

        for turn in turns {
            turn.release().await;
        }
        info!("[PODCAST] Wrote {}", output_path.display());
        Ok(output.into_artifact())
    }

    pub async fn create_conversation(
        &self,
        transcript: &str,
        config: &PodcastConfig,
    ) -> Result<OwnedArtifact> {
        let conversation = self.script(transcript, config).await?;
        self.render_audio(&conversation).await
    }
}
