//! Paginator
//!
//! Runs a composed query through a `QueryExecutor` in offset or cursor mode.
//! The total always comes from a separate count over the filtered set.

use async_trait::async_trait;
use ck_core::{PageRequest, PageResult, ValidationError};
use tracing::debug;

use crate::cursor::{Cursor, CursorKey};
use crate::query::Query;
use crate::registry::FieldValue;

/// A row whose queryable fields can be read by name
pub trait Record {
    /// `None` for unknown fields and NULL values
    fn field_value(&self, field: &str) -> Option<FieldValue>;
}

/// Storage behind the paginator
#[async_trait]
pub trait QueryExecutor: Send {
    type Row: Record + Send;
    type Error: From<ValidationError> + Send;

    /// Number of rows matching the query's predicates
    async fn count(&mut self, query: &Query) -> Result<i64, Self::Error>;

    /// Rows matching the predicates and seek position, in query order,
    /// restricted to the query's window
    async fn fetch(&mut self, query: &Query) -> Result<Vec<Self::Row>, Self::Error>;
}

/// Fetch one page of `query`.
///
/// An unordered query gets the default ordering first, so every page has a
/// deterministic position. Cursor tokens are signed and verified with `key`.
pub async fn paginate<E: QueryExecutor>(
    executor: &mut E,
    query: Query,
    request: &PageRequest,
    max_page_size: i64,
    key: &CursorKey,
) -> Result<PageResult<E::Row>, E::Error> {
    request.validate(max_page_size)?;

    let query = if query.is_ordered() {
        query
    } else {
        let order = Query::default_order(query.registry());
        query.with_order(order)
    };

    let empty = query.is_empty_set();
    let total = if empty {
        0
    } else {
        executor.count(&query.count_query()).await?
    };

    match request {
        PageRequest::Offset { offset, limit } => {
            let (offset, limit) = (*offset, *limit);
            let items = if empty {
                Vec::new()
            } else {
                executor
                    .fetch(&query.clone().with_window(limit, Some(offset)))
                    .await?
            };

            let end = offset + items.len() as i64;
            let next_offset = (end < total && !items.is_empty()).then_some(end);

            debug!(
                entity = query.registry().entity,
                offset,
                limit,
                total,
                returned = items.len(),
                "offset page"
            );

            Ok(PageResult {
                items,
                total,
                limit,
                offset: Some(offset),
                next_offset,
                next_cursor: None,
            })
        }
        PageRequest::Cursor { cursor, limit } => {
            let limit = *limit;
            let mut page_query = query.clone();
            if let Some(token) = cursor {
                let position = Cursor::decode(token, key)?;
                page_query = page_query.with_seek(position.seek_keys(query.order())?);
            }

            let mut items = if empty {
                Vec::new()
            } else {
                executor.fetch(&page_query.with_window(limit + 1, None)).await?
            };

            let has_more = items.len() as i64 > limit;
            items.truncate(limit as usize);

            let next_cursor = match items.last() {
                Some(last) if has_more => {
                    Some(Cursor::from_row(query.order(), last)?.encode(key))
                }
                _ => None,
            };

            debug!(
                entity = query.registry().entity,
                limit,
                total,
                returned = items.len(),
                has_more,
                "cursor page"
            );

            Ok(PageResult {
                items,
                total,
                limit,
                offset: None,
                next_offset: None,
                next_cursor,
            })
        }
    }
}
