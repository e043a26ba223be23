//! Background task handlers
//!
//! Each endpoint queues work and answers 202 straight away; the task worker
//! picks it up later.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use ck_tasks::{DataOperation, SubmitOutcome, Task, TaskQueue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::extractors::AppState;

const PROCESSING: &str = "processing";

#[derive(Debug, Deserialize, Validate)]
pub struct EmailRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct ProcessDataRequest {
    pub data: Vec<i64>,
    #[serde(default)]
    pub operation: DataOperation,
}

#[derive(Debug, Deserialize)]
pub struct LogParams {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct Queued {
    pub message: &'static str,
    pub status: &'static str,
    pub task_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<DataOperation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_size: Option<usize>,
}

impl Queued {
    fn new(message: &'static str, task_id: Uuid) -> Self {
        Self {
            message,
            status: PROCESSING,
            task_id,
            to: None,
            operation: None,
            data_size: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QueuedMany {
    pub message: &'static str,
    pub status: &'static str,
    pub tasks_count: usize,
    pub task_ids: Vec<Uuid>,
}

fn submit(queue: &TaskQueue, task: Task) -> ApiResult<Uuid> {
    match queue.submit(task) {
        SubmitOutcome::Accepted { id } => Ok(id),
        SubmitOutcome::Rejected { reason } => Err(ApiError::unavailable(reason)),
    }
}

/// POST /tasks/send-email
pub async fn send_email(
    State(state): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> ApiResult<(StatusCode, Json<Queued>)> {
    request.validate()?;
    let to = request.to.clone();
    let id = submit(
        &state.tasks,
        Task::send_email(request.to, request.subject, request.body),
    )?;

    Ok((
        StatusCode::ACCEPTED,
        Json(Queued {
            to: Some(to),
            ..Queued::new("Email task queued successfully", id)
        }),
    ))
}

/// POST /tasks/process-data
pub async fn process_data(
    State(state): State<AppState>,
    Json(request): Json<ProcessDataRequest>,
) -> ApiResult<(StatusCode, Json<Queued>)> {
    let data_size = request.data.len();
    let operation = request.operation;
    let id = submit(&state.tasks, Task::process_data(request.data, operation))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(Queued {
            operation: Some(operation),
            data_size: Some(data_size),
            ..Queued::new("Data processing task queued successfully", id)
        }),
    ))
}

/// POST /tasks/log?message=...
pub async fn write_log(
    State(state): State<AppState>,
    Query(params): Query<LogParams>,
) -> ApiResult<(StatusCode, Json<Queued>)> {
    let id = submit(&state.tasks, Task::write_log(params.message))?;
    Ok((
        StatusCode::ACCEPTED,
        Json(Queued::new("Log task queued successfully", id)),
    ))
}

/// POST /tasks/multiple-tasks
pub async fn multiple_tasks(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<QueuedMany>)> {
    let batch = [
        Task::write_log("Task 1: Started"),
        Task::write_log("Task 2: Started"),
        Task::send_email(
            "admin@example.com",
            "Multiple Tasks Test",
            "This is a test of multiple background tasks",
        ),
        Task::process_data(vec![1, 2, 3, 4, 5], DataOperation::Sum),
    ];

    let task_ids = batch
        .into_iter()
        .map(|task| submit(&state.tasks, task))
        .collect::<ApiResult<Vec<_>>>()?;

    Ok((
        StatusCode::ACCEPTED,
        Json(QueuedMany {
            message: "Multiple tasks queued successfully",
            status: PROCESSING,
            tasks_count: task_ids.len(),
            task_ids,
        }),
    ))
}
