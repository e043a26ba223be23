//! Task worker
//!
//! Drains the queue, dispatching each task to the handler registered for its
//! kind. Failures are logged and reported, never retried.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::handlers::{ProcessDataHandler, SendEmailHandler, WriteLogHandler};
use crate::queue::TaskEnvelope;
use crate::task::{Task, TaskError, TaskResult};

/// Handler for a specific task kind
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Run the task, returning a short summary for the log
    async fn handle(&self, task: &Task) -> TaskResult<String>;
}

/// What happened to one task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskReport {
    pub id: Uuid,
    pub kind: &'static str,
    pub result: TaskResult<String>,
}

pub struct TaskWorker {
    receiver: mpsc::Receiver<TaskEnvelope>,
    handlers: HashMap<&'static str, Box<dyn TaskHandler>>,
}

impl TaskWorker {
    pub fn new(receiver: mpsc::Receiver<TaskEnvelope>) -> Self {
        Self {
            receiver,
            handlers: HashMap::new(),
        }
    }

    /// Worker with the built-in handlers. `delay` simulates slow external
    /// work for email delivery and data processing.
    pub fn with_default_handlers(receiver: mpsc::Receiver<TaskEnvelope>, delay: Duration) -> Self {
        let mut worker = Self::new(receiver);
        worker.register("send_email", SendEmailHandler::new(delay));
        worker.register("process_data", ProcessDataHandler::new(delay));
        worker.register("write_log", WriteLogHandler);
        worker
    }

    /// Register a handler for a task kind
    pub fn register<H: TaskHandler + 'static>(&mut self, kind: &'static str, handler: H) {
        self.handlers.insert(kind, Box::new(handler));
    }

    /// Run one task through its handler
    pub async fn execute(&self, envelope: TaskEnvelope) -> TaskReport {
        let kind = envelope.task.kind();
        let result = match self.handlers.get(kind) {
            Some(handler) => handler.handle(&envelope.task).await,
            None => Err(TaskError::UnknownKind(kind.to_string())),
        };

        match &result {
            Ok(summary) => tracing::info!(id = %envelope.id, kind, "{}", summary),
            Err(e) => tracing::error!(id = %envelope.id, kind, error = %e, "task failed"),
        }

        TaskReport {
            id: envelope.id,
            kind,
            result,
        }
    }

    /// Wait for the next task and run it. `None` once every sender is gone.
    pub async fn process_one(&mut self) -> Option<TaskReport> {
        let envelope = self.receiver.recv().await?;
        Some(self.execute(envelope).await)
    }

    /// Run the worker loop until shutdown is signalled or the queue closes
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Task worker started");
        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                envelope = self.receiver.recv() => match envelope {
                    Some(envelope) => {
                        self.execute(envelope).await;
                    }
                    None => break,
                },
            }
        }
        tracing::info!("Task worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::TaskQueue;
    use crate::task::DataOperation;

    fn worker(capacity: usize) -> (TaskQueue, TaskWorker) {
        let (queue, receiver) = TaskQueue::bounded(capacity);
        (queue, TaskWorker::with_default_handlers(receiver, Duration::ZERO))
    }

    #[tokio::test]
    async fn test_process_data() {
        let (queue, mut worker) = worker(4);
        queue.submit(Task::process_data(vec![1, 2, 3, 4, 5], DataOperation::Sum));

        let report = worker.process_one().await.unwrap();
        assert_eq!(report.kind, "process_data");
        assert_eq!(report.result.unwrap(), "sum of 5 values = 15");
    }

    #[tokio::test]
    async fn test_reports_in_submission_order() {
        let (queue, mut worker) = worker(8);
        queue.submit(Task::write_log("Task 1: Started"));
        queue.submit(Task::send_email("admin@example.com", "Hi", "Body"));

        let first = worker.process_one().await.unwrap();
        let second = worker.process_one().await.unwrap();
        assert_eq!(first.kind, "write_log");
        assert_eq!(second.kind, "send_email");
        assert_eq!(second.result.unwrap(), "email sent to admin@example.com with subject: Hi");
    }

    #[tokio::test]
    async fn test_unknown_kind_fails() {
        let (queue, receiver) = TaskQueue::bounded(2);
        let mut worker = TaskWorker::new(receiver);
        queue.submit(Task::write_log("nobody listens"));

        let report = worker.process_one().await.unwrap();
        assert_eq!(
            report.result,
            Err(TaskError::UnknownKind("write_log".into()))
        );
    }

    #[tokio::test]
    async fn test_process_one_ends_when_queue_dropped() {
        let (queue, mut worker) = worker(2);
        drop(queue);
        assert!(worker.process_one().await.is_none());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (queue, worker) = worker(2);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(worker.run(rx));

        assert!(queue.submit(Task::write_log("before shutdown")).is_accepted());
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker did not stop")
            .unwrap();
    }
}
