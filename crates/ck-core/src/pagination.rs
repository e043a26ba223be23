//! Pagination types
//!
//! A `PageRequest` describes which slice of an ordered result set a client
//! wants; a `PageResult` carries that slice plus the total count and what the
//! client needs to ask for the next page.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Page size used when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page a client may request unless configured otherwise
pub const DEFAULT_MAX_PAGE_SIZE: i64 = 100;

/// Which slice of the result set to return
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PageRequest {
    /// Rows `[offset, offset + limit)` of the ordered set
    Offset { offset: i64, limit: i64 },
    /// Up to `limit` rows strictly after the position encoded in `cursor`.
    /// `None` starts at the beginning.
    Cursor { cursor: Option<String>, limit: i64 },
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::Offset {
            offset: 0,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn offset(offset: i64, limit: i64) -> Self {
        Self::Offset { offset, limit }
    }

    /// 1-indexed page number to offset/limit
    pub fn page(page: i64, page_size: i64) -> Self {
        Self::Offset {
            offset: page.saturating_sub(1).saturating_mul(page_size),
            limit: page_size,
        }
    }

    /// First page in cursor mode
    pub fn first(limit: i64) -> Self {
        Self::Cursor {
            cursor: None,
            limit,
        }
    }

    /// Page following the given cursor token
    pub fn after(cursor: impl Into<String>, limit: i64) -> Self {
        Self::Cursor {
            cursor: Some(cursor.into()),
            limit,
        }
    }

    pub fn limit(&self) -> i64 {
        match self {
            Self::Offset { limit, .. } | Self::Cursor { limit, .. } => *limit,
        }
    }

    /// Reject out-of-range values. Nothing is clamped.
    pub fn validate(&self, max_page_size: i64) -> Result<(), ValidationError> {
        let limit = self.limit();
        if limit < 1 {
            return Err(ValidationError::new("limit", "must be at least 1"));
        }
        if limit > max_page_size {
            return Err(ValidationError::new(
                "limit",
                format!("must not exceed {}", max_page_size),
            ));
        }
        if let Self::Offset { offset, .. } = self {
            if *offset < 0 {
                return Err(ValidationError::new("offset", "must not be negative"));
            }
        }
        Ok(())
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    /// Rows matching the filter, before pagination
    pub total: i64,
    pub limit: i64,
    /// Set in offset mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    pub next_offset: Option<i64>,
    pub next_cursor: Option<String>,
}

impl<T> PageResult<T> {
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn has_next(&self) -> bool {
        self.next_offset.is_some() || self.next_cursor.is_some()
    }

    /// 1-indexed page number (offset mode only)
    pub fn page(&self) -> Option<i64> {
        self.offset.map(|offset| offset / self.limit.max(1) + 1)
    }

    pub fn total_pages(&self) -> i64 {
        let limit = self.limit.max(1);
        (self.total + limit - 1) / limit
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            limit: self.limit,
            offset: self.offset,
            next_offset: self.next_offset,
            next_cursor: self.next_cursor,
        }
    }
}
