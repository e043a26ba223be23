//! In-memory item repository
//!
//! Same contract as `PgItemRepository`, backed by a `Vec` behind a lock.
//! Listing holds the read lock for the whole count + fetch, which gives the
//! same single-snapshot guarantee as the Postgres transaction.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use ck_core::{Entity, Id, PageResult};
use ck_queries::compose::{apply_filters, apply_sort};
use ck_queries::cursor::CursorKey;
use ck_queries::memory::MemoryExecutor;
use ck_queries::paginate::paginate;
use ck_queries::query::Query;
use tokio::sync::RwLock;
use tracing::instrument;
use validator::Validate;

use crate::items::{CreateItemDto, ItemRow, UpdateItemDto, ITEM_FIELDS};
use crate::repository::{ListRequest, Repository, RepositoryError, RepositoryResult};

pub struct MemoryItemRepository {
    rows: RwLock<Vec<ItemRow>>,
    next_id: AtomicI64,
    max_page_size: i64,
    cursor_key: CursorKey,
}

impl MemoryItemRepository {
    pub fn new(max_page_size: i64) -> Self {
        Self::with_rows(Vec::new(), max_page_size)
    }

    /// Seed with existing rows; new ids continue after the largest one
    pub fn with_rows(rows: Vec<ItemRow>, max_page_size: i64) -> Self {
        let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        Self {
            rows: RwLock::new(rows),
            next_id: AtomicI64::new(next_id),
            max_page_size,
            cursor_key: CursorKey::random(),
        }
    }

    /// Sign cursors with `key` instead of a per-instance random one
    pub fn with_cursor_key(mut self, key: CursorKey) -> Self {
        self.cursor_key = key;
        self
    }

    fn not_found(id: Id) -> RepositoryError {
        RepositoryError::not_found(ItemRow::TYPE_NAME, id)
    }
}

#[async_trait]
impl Repository<ItemRow, CreateItemDto, UpdateItemDto> for MemoryItemRepository {
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<ItemRow>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|r| r.id == id).cloned())
    }

    #[instrument(skip(self, request), fields(filters = request.filters.len(), sorts = request.sorts.len()))]
    async fn find_page(&self, request: &ListRequest) -> RepositoryResult<PageResult<ItemRow>> {
        let query = apply_filters(Query::new(&ITEM_FIELDS), &request.filters)?;
        let query = apply_sort(query, &request.sorts)?;

        let rows = self.rows.read().await;
        let mut executor = MemoryExecutor::new(rows.as_slice());
        let page = paginate(
            &mut executor,
            query,
            &request.page,
            self.max_page_size,
            &self.cursor_key,
        )
        .await?;
        Ok(page)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        Ok(self.rows.read().await.len() as i64)
    }

    #[instrument(skip(self, dto), fields(title = %dto.title))]
    async fn create(&self, dto: CreateItemDto) -> RepositoryResult<ItemRow> {
        dto.validate()?;

        let now = Utc::now();
        let row = ItemRow {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            title: dto.title,
            description: dto.description,
            is_active: dto.is_active,
            created_at: now,
            updated_at: now,
        };

        self.rows.write().await.push(row.clone());
        tracing::info!(id = row.id, "item created");
        Ok(row)
    }

    #[instrument(skip(self, dto))]
    async fn update(&self, id: Id, dto: UpdateItemDto) -> RepositoryResult<ItemRow> {
        dto.validate()?;

        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| Self::not_found(id))?;

        if let Some(title) = dto.title {
            row.title = title;
        }
        if let Some(description) = dto.description {
            row.description = Some(description);
        }
        if let Some(is_active) = dto.is_active {
            row.is_active = is_active;
        }
        row.updated_at = Utc::now();

        Ok(row.clone())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|r| r.id != id);

        if rows.len() == before {
            return Err(Self::not_found(id));
        }

        tracing::info!(id, "item deleted");
        Ok(())
    }
}
