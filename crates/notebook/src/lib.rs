//! # Notebook
//!
//! Orchestration core of the notebook assistant: the event model, the step
//! scheduler that turns a document into a notebook and concept graph, the
//! blocking bridge for synchronous callers, and podcast generation.

pub mod bridge;
pub mod documents;
pub mod events;
pub mod models;
pub mod podcast;
pub mod query;
pub mod workflow;

pub use bridge::{Bridge, BridgeError};
pub use events::{
    EventKind, ExtractionResult, FileInput, GraphCreation, NotebookOutput, WorkflowEvent,
};
pub use models::{ClaimVerification, Conversation, MindMap, Notebook};
pub use podcast::{ConversationWriter, PodcastConfig, PodcastGenerator, SpeechSynthesizer};
pub use query::{answer_question, QueryError};
pub use workflow::{
    RetryPolicy, Run, RunError, RunFailure, RunProgress, RunState, WorkflowConfig,
    WorkflowEngine,
};

#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("speech synthesis failed: {0}")]
    Speech(String),
    #[error("conversation generation failed: {0}")]
    Conversation(String),
    #[error("storage error: {0}")]
    Storage(#[from] db::DocumentError),
    #[error("a step accepting {0} is already registered")]
    DuplicateStep(EventKind),
}

pub type Result<T> = std::result::Result<T, NotebookError>;
