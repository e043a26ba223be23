//! Built-in task handlers

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::task::{Task, TaskError, TaskResult};
use crate::worker::TaskHandler;

fn wrong_task(expected: &str, task: &Task) -> TaskError {
    TaskError::Failed(format!("{} handler received a {} task", expected, task.kind()))
}

/// Simulates delivery through an external mail service
pub struct SendEmailHandler {
    delay: Duration,
}

impl SendEmailHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl TaskHandler for SendEmailHandler {
    async fn handle(&self, task: &Task) -> TaskResult<String> {
        let Task::SendEmail { to, subject, .. } = task else {
            return Err(wrong_task("send_email", task));
        };

        tracing::info!(to = %to, subject = %subject, "Starting email task");
        tokio::time::sleep(self.delay).await;
        Ok(format!("email sent to {} with subject: {}", to, subject))
    }
}

pub struct ProcessDataHandler {
    delay: Duration,
}

impl ProcessDataHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl TaskHandler for ProcessDataHandler {
    async fn handle(&self, task: &Task) -> TaskResult<String> {
        let Task::ProcessData { data, operation } = task else {
            return Err(wrong_task("process_data", task));
        };

        tracing::info!(
            operation = operation.as_str(),
            data_size = data.len(),
            "Starting data processing"
        );
        tokio::time::sleep(self.delay).await;

        let result = operation.apply(data);
        Ok(format!(
            "{} of {} values = {}",
            operation.as_str(),
            data.len(),
            result
        ))
    }
}

pub struct WriteLogHandler;

#[async_trait]
impl TaskHandler for WriteLogHandler {
    async fn handle(&self, task: &Task) -> TaskResult<String> {
        let Task::WriteLog { message } = task else {
            return Err(wrong_task("write_log", task));
        };

        Ok(format!("[{}] {}", Utc::now().to_rfc3339(), message))
    }
}
