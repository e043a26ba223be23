//! Core error types for crudkit
//!
//! A single validation error kind covers every malformed request: unknown
//! fields, type mismatches, out-of-range pagination, and bad cursor tokens.

use serde::Serialize;
use thiserror::Error;

/// A malformed request, naming the offending field and why it was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The field is not on the entity's allow-list
    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::new(field, "is not a known field")
    }

    /// Human readable message, e.g. `limit must be at least 1`
    pub fn message(&self) -> String {
        format!("{} {}", self.field, self.reason)
    }
}

/// Collapse `validator` output into the first failing field.
///
/// Fields are visited in name order so the reported field is stable.
impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        match fields.first() {
            Some((field, errs)) => {
                let reason = errs
                    .first()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => format!("is invalid ({})", e.code),
                    })
                    .unwrap_or_else(|| "is invalid".to_string());
                Self::new(*field, reason)
            }
            None => Self::new("base", "is invalid"),
        }
    }
}
