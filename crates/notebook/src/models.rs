//! Structured shapes produced by the capability providers.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{NotebookError, Result};

pub const MIN_HIGHLIGHTS: usize = 3;

/// Knowledge extracted from one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Notebook {
    /// Short summary of the document.
    pub summary: String,
    /// Key sentences worth remembering.
    pub highlights: Vec<String>,
    /// Questions a reader might ask, paired index-wise with `answers`.
    pub questions: Vec<String>,
    pub answers: Vec<String>,
}

impl Notebook {
    /// Full check applied by extraction providers.
    pub fn validate(&self) -> Result<()> {
        self.validate_shape()?;
        if self.highlights.len() < MIN_HIGHLIGHTS {
            return Err(NotebookError::Validation(format!(
                "expected at least {} highlights, got {}",
                MIN_HIGHLIGHTS,
                self.highlights.len()
            )));
        }
        Ok(())
    }

    /// What the pipeline needs to build a graph: a summary and paired
    /// questions and answers. The highlight count is the provider's concern.
    pub fn validate_shape(&self) -> Result<()> {
        if self.summary.trim().is_empty() {
            return Err(NotebookError::Validation("summary is empty".to_string()));
        }
        if self.questions.len() != self.answers.len() {
            return Err(NotebookError::Validation(format!(
                "{} questions but {} answers",
                self.questions.len(),
                self.answers.len()
            )));
        }
        Ok(())
    }

    /// Decode an extraction payload and check its shape.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self> {
        let notebook: Notebook = serde_json::from_value(payload.clone())?;
        notebook.validate_shape()?;
        Ok(notebook)
    }

    pub fn faq_markdown(&self) -> String {
        self.questions
            .iter()
            .zip(&self.answers)
            .map(|(q, a)| format!("### {}\n\n{}", q, a))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn highlights_markdown(&self) -> String {
        self.highlights
            .iter()
            .map(|h| format!("- {}", h))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_markdown(&self) -> String {
        format!(
            "## Summary\n\n{}\n\n## Highlights\n\n{}\n\n## FAQ\n\n{}",
            self.summary,
            self.highlights_markdown(),
            self.faq_markdown()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MindMapNode {
    pub id: String,
    /// Concise label, no more than a few words.
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MindMapEdge {
    pub from_id: String,
    pub to_id: String,
}

/// Directed concept graph rendered from a summary and its highlights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MindMap {
    pub nodes: Vec<MindMapNode>,
    pub edges: Vec<MindMapEdge>,
}

impl MindMap {
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(NotebookError::Validation("mind map has no nodes".to_string()));
        }
        let mut ids = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id.as_str()) {
                return Err(NotebookError::Validation(format!(
                    "duplicate node id '{}'",
                    node.id
                )));
            }
        }
        for edge in &self.edges {
            for endpoint in [&edge.from_id, &edge.to_id] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(NotebookError::Validation(format!(
                        "edge references non-existing node '{}'",
                        endpoint
                    )));
                }
            }
        }
        Ok(())
    }
}

pub const CLAIM_FALSE_CITATION: &str = "The claim was deemed false.";
pub const MAX_CITATIONS: usize = 3;

/// Verdict on a claim against a set of sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClaimVerification {
    pub claim_is_true: bool,
    /// One to three supporting passages, empty when the claim is unsupported.
    #[serde(default)]
    pub supporting_citations: Option<Vec<String>>,
}

impl ClaimVerification {
    /// Apply the citation rules: false claims carry a fixed citation, true
    /// claims keep at most three non-empty citations.
    pub fn normalized(mut self) -> Self {
        if !self.claim_is_true {
            if self.supporting_citations.is_some() {
                self.supporting_citations = Some(vec![CLAIM_FALSE_CITATION.to_string()]);
            }
            return self;
        }
        self.supporting_citations = self.supporting_citations.and_then(|citations| {
            let kept: Vec<String> = citations
                .into_iter()
                .filter(|c| !c.trim().is_empty())
                .take(MAX_CITATIONS)
                .collect();
            (!kept.is_empty()).then_some(kept)
        });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Speaker1,
    Speaker2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub content: String,
}

pub const MIN_TURNS: usize = 3;
pub const MAX_TURNS: usize = 50;

/// Two-speaker script. Starts with speaker1 and alternates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Conversation {
    pub conversation: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn validate(&self) -> Result<()> {
        let turns = self.conversation.len();
        if !(MIN_TURNS..=MAX_TURNS).contains(&turns) {
            return Err(NotebookError::Validation(format!(
                "conversation must have between {} and {} turns, got {}",
                MIN_TURNS, MAX_TURNS, turns
            )));
        }
        for (i, turn) in self.conversation.iter().enumerate() {
            let expected = if i % 2 == 0 {
                Speaker::Speaker1
            } else {
                Speaker::Speaker2
            };
            if turn.speaker != expected {
                return Err(NotebookError::Validation(
                    "conversation must start with speaker1 and alternate between speaker1 and speaker2"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }
}
