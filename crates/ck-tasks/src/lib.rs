//! # ck-tasks
//!
//! Background work for crudkit: request handlers submit a `Task` to a bounded
//! `TaskQueue` and get an immediate `SubmitOutcome`; a `TaskWorker` drains the
//! queue on its own tokio task until shutdown.

pub mod handlers;
pub mod queue;
pub mod task;
pub mod worker;

pub use queue::{SubmitOutcome, TaskEnvelope, TaskQueue};
pub use task::{DataOperation, Task, TaskError, TaskResult};
pub use worker::{TaskHandler, TaskReport, TaskWorker};
