//! Drives a run from `FileInput` to `Output` under a single deadline.

use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::Arc,
    time::Instant,
};

use chrono::Utc;
use tool_client::ToolInvoker;
use tracing::{info, warn};
use utils::ephemeral::EphemeralFile;

use super::{
    progress::{ProgressBroadcaster, RunProgress},
    steps::{default_steps, Step, StepContext},
    types::{Run, RunError, RunFailure, RunState, WorkflowConfig},
};
use crate::{
    events::{EventKind, FileInput, NotebookOutput, WorkflowEvent},
    NotebookError, Result,
};

/// Step scheduler shared by any number of concurrent runs.
///
/// Holds no per-run state: every run gets its own [`Run`] record and
/// [`StepContext`], so runs only share the read-only step table and the
/// injected tool invoker.
pub struct WorkflowEngine {
    steps: HashMap<EventKind, Arc<dyn Step>>,
    tools: Arc<dyn ToolInvoker>,
    config: WorkflowConfig,
    progress: ProgressBroadcaster,
}

impl WorkflowEngine {
    /// Engine with the standard extract → prepare → build pipeline.
    pub fn new(tools: Arc<dyn ToolInvoker>, config: WorkflowConfig) -> Self {
        let steps = default_steps()
            .into_iter()
            .map(|step| (step.accepts(), step))
            .collect();
        Self {
            steps,
            tools,
            config,
            progress: ProgressBroadcaster::new(),
        }
    }

    /// Engine with no steps registered.
    pub fn empty(tools: Arc<dyn ToolInvoker>, config: WorkflowConfig) -> Self {
        Self {
            steps: HashMap::new(),
            tools,
            config,
            progress: ProgressBroadcaster::new(),
        }
    }

    /// Register a step. Two steps may not accept the same event variant.
    pub fn with_step(mut self, step: Arc<dyn Step>) -> Result<Self> {
        let kind = step.accepts();
        if self.steps.contains_key(&kind) {
            return Err(NotebookError::DuplicateStep(kind));
        }
        self.steps.insert(kind, step);
        Ok(self)
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<RunProgress> {
        self.progress.subscribe()
    }

    /// Execute one run to a terminal state.
    pub async fn run(&self, input: FileInput) -> Run {
        let mut run = Run::new(self.config.run_timeout);
        let budget = run.timeout;
        let started = Instant::now();

        info!(
            "[WORKFLOW] Run {} started for {} (timeout {:?})",
            run.id,
            input.path.display(),
            budget
        );
        self.progress.broadcast(RunProgress::Started {
            run_id: run.id,
            timestamp: run.started_at,
        });

        let ctx = StepContext::new(
            run.id,
            self.tools.clone(),
            self.config.retry.clone(),
            self.progress.clone(),
        );
        let outcome =
            tokio::time::timeout(budget, self.drive(&mut run, WorkflowEvent::FileInput(input), &ctx))
                .await;

        run.state = match outcome {
            Ok(Ok(output)) => RunState::Succeeded(output),
            Ok(Err(reason)) => RunState::Failed(reason),
            Err(_) => {
                if let RunState::Running(kind) = &run.state {
                    warn!(
                        "[WORKFLOW] Run {} timed out after {:?} while handling {}",
                        run.id, budget, kind
                    );
                }
                RunState::TimedOut
            }
        };
        run.finished_at = Some(Utc::now());

        let detail = match &run.state {
            RunState::Failed(reason) => Some(reason.to_string()),
            _ => None,
        };
        let duration_ms = started.elapsed().as_millis() as u64;
        match &detail {
            Some(reason) => warn!(
                "[WORKFLOW] Run {} failed after {}ms: {}",
                run.id, duration_ms, reason
            ),
            None => info!(
                "[WORKFLOW] Run {} finished as {} in {}ms",
                run.id,
                run.state.label(),
                duration_ms
            ),
        }
        self.progress.broadcast(RunProgress::Finished {
            run_id: run.id,
            state: run.state.label().to_string(),
            detail,
            duration_ms,
            timestamp: Utc::now(),
        });

        run
    }

    /// Copy uploaded bytes to a scoped file, run the pipeline on it, then
    /// delete the copy whatever the outcome.
    pub async fn run_upload(&self, upload_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<Run> {
        let suffix = Path::new(file_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let upload = EphemeralFile::create_in(upload_dir, "upload-", &suffix)?;
        upload.write(bytes).await?;

        let run = self
            .run(FileInput {
                path: upload.path().to_path_buf(),
            })
            .await;
        upload.release().await;
        Ok(run)
    }

    async fn drive(
        &self,
        run: &mut Run,
        initial: WorkflowEvent,
        ctx: &StepContext,
    ) -> std::result::Result<NotebookOutput, RunFailure> {
        let mut seen = HashSet::new();
        let mut event = initial;

        loop {
            let kind = event.kind();
            if let WorkflowEvent::Output(output) = event {
                return Ok(output);
            }
            if !seen.insert(kind) {
                return Err(RunFailure::Replayed(kind));
            }
            run.state = RunState::Running(kind);

            let step = self
                .steps
                .get(&kind)
                .cloned()
                .ok_or(RunFailure::NoStep(kind))?;

            info!(
                "[WORKFLOW] Run {}: step {} ({} → {:?})",
                run.id,
                step.name(),
                kind,
                step.emits()
            );
            self.progress.broadcast(RunProgress::StepStarted {
                run_id: run.id,
                step: step.name().to_string(),
                accepts: kind,
                timestamp: Utc::now(),
            });

            let step_started = Instant::now();
            let next = step.run(event, ctx).await?;

            let emitted = next.kind();
            if !step.emits().contains(&emitted) {
                return Err(RunFailure::UnexpectedEvent {
                    step: step.name(),
                    emitted,
                });
            }

            run.completed_steps.push(step.name());
            self.progress.broadcast(RunProgress::StepCompleted {
                run_id: run.id,
                step: step.name().to_string(),
                emitted,
                duration_ms: step_started.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
            });
            event = next;
        }
    }

    /// Run and collapse the record into the caller-facing result.
    pub async fn process(
        &self,
        input: FileInput,
    ) -> std::result::Result<NotebookOutput, RunError> {
        self.run(input).await.into_result()
    }
}

impl std::fmt::Debug for WorkflowEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowEngine")
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}
