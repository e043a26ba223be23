//! Task definitions

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Task errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TaskError {
    #[error("No handler registered for task kind: {0}")]
    UnknownKind(String),
    #[error("Task failed: {0}")]
    Failed(String),
}

pub type TaskResult<T> = Result<T, TaskError>;

/// Reduction applied by `Task::ProcessData`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOperation {
    #[default]
    Sum,
    Avg,
    Max,
}

impl DataOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Max => "max",
        }
    }

    /// Reduce `data`; an empty slice yields 0 for every operation
    pub fn apply(&self, data: &[i64]) -> f64 {
        if data.is_empty() {
            return 0.0;
        }
        let sum: i128 = data.iter().map(|&v| v as i128).sum();
        match self {
            Self::Sum => sum as f64,
            Self::Avg => sum as f64 / data.len() as f64,
            Self::Max => data.iter().copied().max().unwrap_or_default() as f64,
        }
    }
}

/// A unit of background work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Task {
    /// Simulated email delivery
    SendEmail {
        to: String,
        subject: String,
        body: String,
    },
    ProcessData {
        data: Vec<i64>,
        #[serde(default)]
        operation: DataOperation,
    },
    /// Timestamped log line
    WriteLog { message: String },
}

impl Task {
    /// Handler lookup key
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SendEmail { .. } => "send_email",
            Self::ProcessData { .. } => "process_data",
            Self::WriteLog { .. } => "write_log",
        }
    }

    pub fn send_email(
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self::SendEmail {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    pub fn process_data(data: Vec<i64>, operation: DataOperation) -> Self {
        Self::ProcessData { data, operation }
    }

    pub fn write_log(message: impl Into<String>) -> Self {
        Self::WriteLog {
            message: message.into(),
        }
    }
}
