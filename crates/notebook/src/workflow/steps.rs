//! The three pipeline steps and the context they run in.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use tool_client::{
    BuildConceptGraph, BuildConceptGraphArgs, ConceptGraphPayload, ProcessDocument,
    ProcessDocumentArgs, ProcessDocumentPayload, ToolCall, ToolFailure, ToolInvoker,
};
use tracing::warn;
use utils::ephemeral::OwnedArtifact;
use uuid::Uuid;

use super::{
    progress::{ProgressBroadcaster, RunProgress},
    types::{RetryPolicy, RunFailure},
};
use crate::{
    events::{EventKind, ExtractionResult, GraphCreation, NotebookOutput, WorkflowEvent},
    models::Notebook,
};

/// Collaborators injected into every step of one run.
pub struct StepContext {
    pub run_id: Uuid,
    tools: Arc<dyn ToolInvoker>,
    retry: RetryPolicy,
    progress: ProgressBroadcaster,
}

impl StepContext {
    pub fn new(
        run_id: Uuid,
        tools: Arc<dyn ToolInvoker>,
        retry: RetryPolicy,
        progress: ProgressBroadcaster,
    ) -> Self {
        Self {
            run_id,
            tools,
            retry,
            progress,
        }
    }

    /// Invoke a tool, retrying transient failures only if the policy allows it.
    pub async fn call<T: ToolCall>(
        &self,
        step: &'static str,
        args: &T::Args,
    ) -> Result<T::Payload, RunFailure> {
        let attempt = || async { tool_client::call::<T>(self.tools.as_ref(), args).await };

        let result = if self.retry.is_enabled() {
            attempt
                .retry(
                    ExponentialBuilder::default()
                        .with_min_delay(self.retry.min_delay)
                        .with_max_delay(self.retry.max_delay)
                        .with_max_times(self.retry.max_retries)
                        .with_jitter(),
                )
                .when(|e: &ToolFailure| e.kind.is_transient())
                .notify(|err: &ToolFailure, dur: Duration| {
                    warn!(
                        "[WORKFLOW] Run {}: {} call failed, retrying after {:.2}s: {}",
                        self.run_id,
                        T::OPERATION,
                        dur.as_secs_f64(),
                        err
                    );
                    self.progress.broadcast(RunProgress::Retrying {
                        run_id: self.run_id,
                        step: step.to_string(),
                        error: err.to_string(),
                        delay_ms: dur.as_millis() as u64,
                        timestamp: Utc::now(),
                    });
                })
                .await
        } else {
            attempt().await
        };

        result.map_err(|failure| RunFailure::Tool { step, failure })
    }
}

/// One stage of the pipeline: consumes one event variant, emits another.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &'static str;

    fn accepts(&self) -> EventKind;

    fn emits(&self) -> &'static [EventKind];

    async fn run(
        &self,
        event: WorkflowEvent,
        ctx: &StepContext,
    ) -> Result<WorkflowEvent, RunFailure>;
}

/// `FileInput` → `ExtractionResult` through *process-document*.
pub struct ExtractDocument;

#[async_trait]
impl Step for ExtractDocument {
    fn name(&self) -> &'static str {
        "extract_document"
    }

    fn accepts(&self) -> EventKind {
        EventKind::FileInput
    }

    fn emits(&self) -> &'static [EventKind] {
        &[EventKind::Extraction]
    }

    async fn run(
        &self,
        event: WorkflowEvent,
        ctx: &StepContext,
    ) -> Result<WorkflowEvent, RunFailure> {
        let kind = event.kind();
        let WorkflowEvent::FileInput(input) = event else {
            return Err(RunFailure::NoStep(kind));
        };

        let args = ProcessDocumentArgs {
            file_path: input.path.to_string_lossy().into_owned(),
        };
        match ctx.call::<ProcessDocument>(self.name(), &args).await? {
            ProcessDocumentPayload::Processed {
                structured_payload,
                raw_text,
            } => Ok(WorkflowEvent::Extraction(ExtractionResult {
                structured_payload,
                raw_text,
            })),
            ProcessDocumentPayload::Unprocessable { message } => {
                Err(RunFailure::ProcessingFailed(message))
            }
        }
    }
}

/// `ExtractionResult` → `GraphCreation`. Local, no tool call.
pub struct PrepareGraph;

#[async_trait]
impl Step for PrepareGraph {
    fn name(&self) -> &'static str {
        "prepare_graph"
    }

    fn accepts(&self) -> EventKind {
        EventKind::Extraction
    }

    fn emits(&self) -> &'static [EventKind] {
        &[EventKind::GraphCreation]
    }

    async fn run(
        &self,
        event: WorkflowEvent,
        _ctx: &StepContext,
    ) -> Result<WorkflowEvent, RunFailure> {
        let kind = event.kind();
        let WorkflowEvent::Extraction(extraction) = event else {
            return Err(RunFailure::NoStep(kind));
        };

        let notebook = Notebook::from_payload(&extraction.structured_payload).map_err(|e| {
            RunFailure::ProcessingFailed(format!(
                "extraction payload is not a usable notebook: {}",
                e
            ))
        })?;
        Ok(WorkflowEvent::GraphCreation(GraphCreation::from(notebook)))
    }
}

/// `GraphCreation` → `Output` through *build-concept-graph*.
pub struct BuildGraph;

#[async_trait]
impl Step for BuildGraph {
    fn name(&self) -> &'static str {
        "build_graph"
    }

    fn accepts(&self) -> EventKind {
        EventKind::GraphCreation
    }

    fn emits(&self) -> &'static [EventKind] {
        &[EventKind::Output]
    }

    async fn run(
        &self,
        event: WorkflowEvent,
        ctx: &StepContext,
    ) -> Result<WorkflowEvent, RunFailure> {
        let kind = event.kind();
        let WorkflowEvent::GraphCreation(graph) = event else {
            return Err(RunFailure::NoStep(kind));
        };

        let args = BuildConceptGraphArgs {
            summary: graph.summary.clone(),
            highlights: graph.highlights.clone(),
        };
        let artifact = match ctx.call::<BuildConceptGraph>(self.name(), &args).await? {
            ConceptGraphPayload::Rendered { artifact_path } => OwnedArtifact::adopt(artifact_path),
            ConceptGraphPayload::Failed { message } => {
                return Err(RunFailure::GraphCreationFailed(message));
            }
        };
        if !artifact.exists() {
            return Err(RunFailure::GraphCreationFailed(format!(
                "artifact {} does not exist",
                artifact.path().display()
            )));
        }

        Ok(WorkflowEvent::Output(NotebookOutput {
            graph_artifact: artifact,
            content: graph.content,
            summary: graph.summary,
            highlights: graph.highlights,
            questions: graph.questions,
            answers: graph.answers,
        }))
    }
}

/// The standard notebook pipeline.
pub fn default_steps() -> Vec<Arc<dyn Step>> {
    vec![
        Arc::new(ExtractDocument),
        Arc::new(PrepareGraph),
        Arc::new(BuildGraph),
    ]
}
