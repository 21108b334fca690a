//! Core types for run orchestration

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tool_client::{ToolFailure, ToolFailureKind};
use uuid::Uuid;

use crate::events::{EventKind, NotebookOutput};

const DEFAULT_RUN_TIMEOUT_SECS: u64 = 1200;

/// Why a run stopped short of an `Output`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunFailure {
    /// The document could not be turned into a notebook.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),
    #[error("graph creation failed: {0}")]
    GraphCreationFailed(String),
    /// A tool call failed at the protocol level.
    #[error("{step}: {failure}")]
    Tool {
        step: &'static str,
        #[source]
        failure: ToolFailure,
    },
    #[error("no step registered for {0}")]
    NoStep(EventKind),
    #[error("step {step} emitted an undeclared {emitted}")]
    UnexpectedEvent {
        step: &'static str,
        emitted: EventKind,
    },
    #[error("{0} was produced twice in one run")]
    Replayed(EventKind),
}

impl RunFailure {
    /// Protocol failure kind, when the run failed on a tool call.
    pub fn tool_failure_kind(&self) -> Option<ToolFailureKind> {
        match self {
            RunFailure::Tool { failure, .. } => Some(failure.kind),
            _ => None,
        }
    }
}

/// Run state machine. `Succeeded`, `Failed` and `TimedOut` are terminal.
#[derive(Debug)]
pub enum RunState {
    Idle,
    Running(EventKind),
    Succeeded(NotebookOutput),
    Failed(RunFailure),
    TimedOut,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded(_) | RunState::Failed(_) | RunState::TimedOut
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running(_) => "running",
            RunState::Succeeded(_) => "succeeded",
            RunState::Failed(_) => "failed",
            RunState::TimedOut => "timed_out",
        }
    }
}

/// The single failure value a run's caller sees.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Failed(#[from] RunFailure),
    #[error("run timed out after {0:?}")]
    TimedOut(Duration),
}

/// One execution of the pipeline.
#[derive(Debug)]
pub struct Run {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub timeout: Duration,
    pub state: RunState,
    /// Steps that ran to completion, in order.
    pub completed_steps: Vec<&'static str>,
}

impl Run {
    pub fn new(timeout: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            timeout,
            state: RunState::Idle,
            completed_steps: Vec::new(),
        }
    }

    pub fn into_result(self) -> Result<NotebookOutput, RunError> {
        match self.state {
            RunState::Succeeded(output) => Ok(output),
            RunState::Failed(reason) => Err(RunError::Failed(reason)),
            RunState::TimedOut => Err(RunError::TimedOut(self.timeout)),
            // the engine only hands back terminal runs
            RunState::Idle | RunState::Running(_) => Err(RunError::TimedOut(self.timeout)),
        }
    }
}

/// Bounded retry of transient tool failures. Disabled by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            min_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
        }
    }

    pub fn bounded(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Self::none()
        }
    }

    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.max_retries > 0
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub run_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            run_timeout: Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS),
            retry: RetryPolicy::none(),
        }
    }
}

impl WorkflowConfig {
    /// `NOTEBOOK_RUN_TIMEOUT_SECS` and `NOTEBOOK_TOOL_RETRIES`, falling back to defaults.
    pub fn from_env() -> Self {
        let run_timeout = std::env::var("NOTEBOOK_RUN_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_RUN_TIMEOUT_SECS));
        let max_retries = std::env::var("NOTEBOOK_TOOL_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Self {
            run_timeout,
            retry: RetryPolicy::bounded(max_retries),
        }
    }

    pub fn with_run_timeout(mut self, run_timeout: Duration) -> Self {
        self.run_timeout = run_timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
