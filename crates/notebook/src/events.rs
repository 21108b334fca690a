//! Events flowing between workflow steps.
//!
//! Each event carries exactly what the next step needs. Steps never see an
//! earlier event except through fields the previous step forwarded.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utils::ephemeral::OwnedArtifact;

use crate::models::Notebook;

/// Initial event, one per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInput {
    pub path: PathBuf,
}

/// Remote extraction succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub structured_payload: serde_json::Value,
    pub raw_text: String,
}

/// Everything needed to build the concept graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphCreation {
    pub summary: String,
    pub highlights: Vec<String>,
    pub questions: Vec<String>,
    pub answers: Vec<String>,
    /// Markdown rendering of the notebook.
    pub content: String,
}

impl From<Notebook> for GraphCreation {
    fn from(notebook: Notebook) -> Self {
        let content = notebook.to_markdown();
        Self {
            summary: notebook.summary,
            highlights: notebook.highlights,
            questions: notebook.questions,
            answers: notebook.answers,
            content,
        }
    }
}

/// Terminal event. The graph artifact belongs to whoever receives this.
#[derive(Debug)]
pub struct NotebookOutput {
    pub graph_artifact: OwnedArtifact,
    pub content: String,
    pub summary: String,
    pub highlights: Vec<String>,
    pub questions: Vec<String>,
    pub answers: Vec<String>,
}

impl NotebookOutput {
    pub fn questions_and_answers(&self) -> Vec<(String, String)> {
        self.questions
            .iter()
            .cloned()
            .zip(self.answers.iter().cloned())
            .collect()
    }
}

#[derive(Debug)]
pub enum WorkflowEvent {
    FileInput(FileInput),
    Extraction(ExtractionResult),
    GraphCreation(GraphCreation),
    Output(NotebookOutput),
}

/// Discriminant used to route an event to the step that accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    FileInput,
    #[strum(serialize = "ExtractionResult")]
    Extraction,
    GraphCreation,
    Output,
}

impl WorkflowEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WorkflowEvent::FileInput(_) => EventKind::FileInput,
            WorkflowEvent::Extraction(_) => EventKind::Extraction,
            WorkflowEvent::GraphCreation(_) => EventKind::GraphCreation,
            WorkflowEvent::Output(_) => EventKind::Output,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowEvent::Output(_))
    }
}
