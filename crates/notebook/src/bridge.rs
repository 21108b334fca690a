//! Blocking entry point for synchronous callers.
//!
//! Work is submitted to a dedicated runtime owned by the [`Bridge`] and the
//! caller blocks on a completion channel. The caller's own scheduler, if it
//! has one, is never entered, so calling from inside another runtime cannot
//! deadlock it.

use std::{future::Future, panic::AssertUnwindSafe, path::PathBuf, sync::Arc};

use futures::FutureExt;
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, error};

use crate::{
    events::{FileInput, NotebookOutput},
    workflow::{RunError, WorkflowEngine},
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// The pipeline itself failed; kind and message are preserved.
    #[error(transparent)]
    Run(#[from] RunError),
    #[error("failed to start bridge runtime: {0}")]
    Runtime(String),
    #[error("bridge worker panicked: {0}")]
    WorkerPanicked(String),
    #[error("bridge worker failed: {0}")]
    Worker(String),
}

pub struct Bridge {
    runtime: Option<Runtime>,
}

impl Bridge {
    pub fn new(worker_threads: usize) -> Result<Self, BridgeError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("notebook-bridge")
            .enable_all()
            .build()
            .map_err(|e| BridgeError::Runtime(e.to_string()))?;
        Ok(Self {
            runtime: Some(runtime),
        })
    }

    /// Run `work` on the bridge's workers and block until it completes.
    pub fn submit<F, T>(&self, work: F) -> Result<T, BridgeError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| BridgeError::Runtime("bridge is shut down".to_string()))?;

        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        runtime.spawn(async move {
            let outcome = AssertUnwindSafe(work)
                .catch_unwind()
                .await
                .map_err(|panic| panic_message(panic.as_ref()));
            // receiver only disappears if the caller itself is gone
            let _ = tx.send(outcome);
        });

        debug!("[BRIDGE] Waiting for worker");
        match rx.recv() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => {
                error!("[BRIDGE] Worker panicked: {}", message);
                Err(BridgeError::WorkerPanicked(message))
            }
            Err(_) => Err(BridgeError::Worker(
                "worker dropped the completion channel".to_string(),
            )),
        }
    }

    /// Run the notebook pipeline for `path` and block for its result.
    pub fn process_file(
        &self,
        engine: Arc<WorkflowEngine>,
        path: impl Into<PathBuf>,
    ) -> Result<NotebookOutput, BridgeError> {
        let input = FileInput { path: path.into() };
        self.submit(async move { engine.process(input).await })?
            .map_err(BridgeError::from)
    }

    /// Run the pipeline on uploaded bytes. The on-disk copy is removed before
    /// this returns.
    pub fn process_upload(
        &self,
        engine: Arc<WorkflowEngine>,
        upload_dir: PathBuf,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<NotebookOutput, BridgeError> {
        self.submit(async move {
            engine
                .run_upload(&upload_dir, &file_name, &bytes)
                .await
                .map_err(|e| BridgeError::Worker(e.to_string()))
                .and_then(|run| run.into_result().map_err(BridgeError::from))
        })?
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        // Dropping a runtime from async context panics; background shutdown never blocks.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
