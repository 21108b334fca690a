//! Step scheduling for notebook runs

pub mod engine;
pub mod progress;
pub mod steps;
pub mod types;

pub use engine::WorkflowEngine;
pub use progress::{ProgressBroadcaster, RunProgress};
pub use steps::{default_steps, BuildGraph, ExtractDocument, PrepareGraph, Step, StepContext};
pub use types::{RetryPolicy, Run, RunError, RunFailure, RunState, WorkflowConfig};
