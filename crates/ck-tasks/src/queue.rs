//! Bounded task queue
//!
//! Submission never waits: a full or closed queue rejects the task and the
//! caller decides what to tell the client.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::task::Task;

/// A submitted task with its tracking id
#[derive(Debug, Clone, Serialize)]
pub struct TaskEnvelope {
    pub id: Uuid,
    pub task: Task,
    pub submitted_at: DateTime<Utc>,
}

/// Result of `TaskQueue::submit`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted { id: Uuid },
    Rejected { reason: String },
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Sending half of the queue; cheap to clone into request state
#[derive(Debug, Clone)]
pub struct TaskQueue {
    sender: mpsc::Sender<TaskEnvelope>,
}

impl TaskQueue {
    /// Create a queue holding at most `capacity` waiting tasks.
    ///
    /// The receiver goes to a `TaskWorker`.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<TaskEnvelope>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub fn submit(&self, task: Task) -> SubmitOutcome {
        let envelope = TaskEnvelope {
            id: Uuid::new_v4(),
            task,
            submitted_at: Utc::now(),
        };
        let id = envelope.id;
        let kind = envelope.task.kind();

        match self.sender.try_send(envelope) {
            Ok(()) => {
                tracing::debug!(%id, kind, "task queued");
                SubmitOutcome::Accepted { id }
            }
            Err(TrySendError::Full(_)) => {
                tracing::warn!(kind, "task queue is full, rejecting task");
                SubmitOutcome::Rejected {
                    reason: "task queue is full".to_string(),
                }
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(kind, "task queue is closed, rejecting task");
                SubmitOutcome::Rejected {
                    reason: "task queue is closed".to_string(),
                }
            }
        }
    }

    /// Tasks waiting for the worker
    pub fn pending(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
