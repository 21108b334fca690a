//! Run progress stream for observers (the CLI progress printer, tests).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::events::EventKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RunProgress {
    Started {
        run_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    StepStarted {
        run_id: Uuid,
        step: String,
        accepts: EventKind,
        timestamp: DateTime<Utc>,
    },
    StepCompleted {
        run_id: Uuid,
        step: String,
        emitted: EventKind,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
    Retrying {
        run_id: Uuid,
        step: String,
        error: String,
        delay_ms: u64,
        timestamp: DateTime<Utc>,
    },
    Finished {
        run_id: Uuid,
        state: String,
        detail: Option<String>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

/// Broadcasts run progress to all subscribers
#[derive(Clone)]
pub struct ProgressBroadcaster {
    sender: broadcast::Sender<RunProgress>,
}

impl Default for ProgressBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1000);
        Self { sender }
    }

    pub fn broadcast(&self, event: RunProgress) {
        // Ignore send errors (no subscribers)
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunProgress> {
        self.sender.subscribe()
    }
}
