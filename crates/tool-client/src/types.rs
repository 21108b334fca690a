//! Request and response types shared by the tool host and its clients

use schemars::JsonSchema;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

pub const PROCESSING_FAILED_MESSAGE: &str = "Sorry, your file could not be processed.";
pub const GRAPH_CREATION_FAILED_MESSAGE: &str = "Sorry, mind map creation failed.";
pub const NO_ANSWER_MESSAGE: &str = "Sorry, I was unable to find an answer to your question.";

/// The closed set of operations a tool host can serve.
///
/// The kebab-case name doubles as the endpoint path segment.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Operation {
    ProcessDocument,
    BuildConceptGraph,
    AnswerQuery,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    pub fn description(&self) -> &'static str {
        match self {
            Operation::ProcessDocument => {
                "Process a file and produce a summary, highlights and question/answer pairs."
            }
            Operation::BuildConceptGraph => {
                "Render a concept graph from a summary and its highlights."
            }
            Operation::AnswerQuery => "Answer a question against the processed documents.",
        }
    }
}

/// Failure kinds of the tool protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ToolFailureKind {
    NotFound,
    InvalidArguments,
    RemoteExecutionError,
    Timeout,
    TransportError,
}

impl ToolFailureKind {
    /// Failures worth another attempt: the request may never have reached a handler.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ToolFailureKind::Timeout | ToolFailureKind::TransportError
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ToolFailure {
    pub kind: ToolFailureKind,
    pub message: String,
}

impl ToolFailure {
    pub fn new(kind: ToolFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolFailureKind::NotFound, message)
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ToolFailureKind::InvalidArguments, message)
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ToolFailureKind::RemoteExecutionError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ToolFailureKind::Timeout, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ToolFailureKind::TransportError, message)
    }
}

/// A named operation plus its JSON arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub operation: Operation,
    pub arguments: serde_json::Value,
}

impl ToolRequest {
    pub fn new<T: ToolCall>(args: &T::Args) -> Result<Self, ToolFailure> {
        let arguments = serde_json::to_value(args)
            .map_err(|e| ToolFailure::invalid_arguments(e.to_string()))?;
        Ok(Self {
            operation: T::OPERATION,
            arguments,
        })
    }
}

/// Response envelope returned by every tool endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolResponse {
    Success { payload: serde_json::Value },
    Failure { kind: ToolFailureKind, message: String },
}

impl ToolResponse {
    pub fn success(payload: serde_json::Value) -> Self {
        ToolResponse::Success { payload }
    }

    pub fn into_result(self) -> Result<serde_json::Value, ToolFailure> {
        match self {
            ToolResponse::Success { payload } => Ok(payload),
            ToolResponse::Failure { kind, message } => Err(ToolFailure { kind, message }),
        }
    }
}

impl From<ToolFailure> for ToolResponse {
    fn from(failure: ToolFailure) -> Self {
        ToolResponse::Failure {
            kind: failure.kind,
            message: failure.message,
        }
    }
}

/// Static description of one operation: its argument and payload types.
pub trait ToolCall {
    const OPERATION: Operation;
    type Args: Serialize + DeserializeOwned + JsonSchema + Send + Sync + 'static;
    type Payload: Serialize + DeserializeOwned + Send + 'static;
}

// ─── process-document ─────────────────────────────────────────────────────

pub struct ProcessDocument;

impl ToolCall for ProcessDocument {
    const OPERATION: Operation = Operation::ProcessDocument;
    type Args = ProcessDocumentArgs;
    type Payload = ProcessDocumentPayload;
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ProcessDocumentArgs {
    /// Path of the document on the host's filesystem.
    pub file_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProcessDocumentPayload {
    Processed {
        structured_payload: serde_json::Value,
        raw_text: String,
    },
    Unprocessable {
        message: String,
    },
}

impl ProcessDocumentPayload {
    pub fn unprocessable() -> Self {
        ProcessDocumentPayload::Unprocessable {
            message: PROCESSING_FAILED_MESSAGE.to_string(),
        }
    }
}

// ─── build-concept-graph ──────────────────────────────────────────────────

pub struct BuildConceptGraph;

impl ToolCall for BuildConceptGraph {
    const OPERATION: Operation = Operation::BuildConceptGraph;
    type Args = BuildConceptGraphArgs;
    type Payload = ConceptGraphPayload;
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BuildConceptGraphArgs {
    pub summary: String,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConceptGraphPayload {
    Rendered { artifact_path: String },
    Failed { message: String },
}

impl ConceptGraphPayload {
    pub fn failed() -> Self {
        ConceptGraphPayload::Failed {
            message: GRAPH_CREATION_FAILED_MESSAGE.to_string(),
        }
    }
}

// ─── answer-query ─────────────────────────────────────────────────────────

pub struct AnswerQuery;

impl ToolCall for AnswerQuery {
    const OPERATION: Operation = Operation::AnswerQuery;
    type Args = AnswerQueryArgs;
    type Payload = AnswerPayload;
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AnswerQueryArgs {
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnswerPayload {
    Answered { answer: String },
    NoAnswer { message: String },
}

impl AnswerPayload {
    pub fn no_answer() -> Self {
        AnswerPayload::NoAnswer {
            message: NO_ANSWER_MESSAGE.to_string(),
        }
    }
}

// ─── host metadata ────────────────────────────────────────────────────────

/// Health check response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// One entry of `GET /tools`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolDescriptor {
    pub name: Operation,
    pub description: String,
    pub input_schema: serde_json::Value,
}
