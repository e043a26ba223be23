//! Item repository
//!
//! Database operations for items, the example entity every list feature is
//! built around.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ck_core::{Entity, Id, Identifiable, PageResult, Timestamped};
use ck_queries::compose::{apply_filters, apply_sort};
use ck_queries::cursor::CursorKey;
use ck_queries::paginate::{paginate, Record};
use ck_queries::query::Query;
use ck_queries::registry::{FieldDef, FieldRegistry, FieldValue};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use validator::Validate;

use crate::repository::{ListRequest, Repository, RepositoryError, RepositoryResult};
use crate::sql::PgSession;

/// Queryable item fields
pub static ITEM_FIELDS: FieldRegistry = FieldRegistry {
    entity: "Item",
    table: "items",
    id: FieldDef::integer("id"),
    created_at: FieldDef::timestamp("created_at"),
    fields: &[
        FieldDef::integer("id"),
        FieldDef::text("title").case_insensitive(),
        FieldDef::text("description").nullable(),
        FieldDef::boolean("is_active"),
        FieldDef::timestamp("created_at"),
        FieldDef::timestamp("updated_at"),
    ],
};

/// Item database entity
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct ItemRow {
    pub id: Id,
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for ItemRow {
    fn id(&self) -> Id {
        self.id
    }
}

impl Timestamped for ItemRow {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for ItemRow {
    const TABLE_NAME: &'static str = "items";
    const TYPE_NAME: &'static str = "Item";
}

impl Record for ItemRow {
    fn field_value(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(FieldValue::Integer(self.id)),
            "title" => Some(FieldValue::Text(self.title.clone())),
            "description" => self.description.clone().map(FieldValue::Text),
            "is_active" => Some(FieldValue::Boolean(self.is_active)),
            "created_at" => Some(FieldValue::Timestamp(self.created_at)),
            "updated_at" => Some(FieldValue::Timestamp(self.updated_at)),
            _ => None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// DTO for creating an item
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateItemDto {
    #[validate(length(min = 1, max = 255, message = "must be between 1 and 255 characters"))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl CreateItemDto {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            is_active: true,
        }
    }
}

/// DTO for updating an item; unset fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateItemDto {
    #[validate(length(min = 1, max = 255, message = "must be between 1 and 255 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

const SELECT_COLUMNS: &str = "id, title, description, is_active, created_at, updated_at";

/// Item repository implementation
pub struct PgItemRepository {
    pool: PgPool,
    max_page_size: i64,
    cursor_key: CursorKey,
}

impl PgItemRepository {
    pub fn new(pool: PgPool, max_page_size: i64, cursor_key: CursorKey) -> Self {
        Self {
            pool,
            max_page_size,
            cursor_key,
        }
    }

    /// Create the items table and its listing index if missing
    pub async fn ensure_schema(&self) -> RepositoryResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id BIGSERIAL PRIMARY KEY,
                title VARCHAR(255) NOT NULL,
                description TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_items_created_at_id ON items (created_at DESC, id ASC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Repository<ItemRow, CreateItemDto, UpdateItemDto> for PgItemRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<ItemRow>> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    #[instrument(skip(self, request), fields(filters = request.filters.len(), sorts = request.sorts.len()))]
    async fn find_page(&self, request: &ListRequest) -> RepositoryResult<PageResult<ItemRow>> {
        request.page.validate(self.max_page_size)?;
        let query = apply_filters(Query::new(&ITEM_FIELDS), &request.filters)?;
        let query = apply_sort(query, &request.sorts)?;

        // Count and page must observe the same snapshot
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let page = {
            let mut session = PgSession::<ItemRow>::new(&mut *tx);
            paginate(
                &mut session,
                query,
                &request.page,
                self.max_page_size,
                &self.cursor_key,
            )
            .await?
        };

        tx.commit().await?;
        Ok(page)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM items")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    #[instrument(skip(self, dto), fields(title = %dto.title))]
    async fn create(&self, dto: CreateItemDto) -> RepositoryResult<ItemRow> {
        dto.validate()?;

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            INSERT INTO items (title, description, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, NOW(), NOW())
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(&dto.title)
        .bind(&dto.description)
        .bind(dto.is_active)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(id = row.id, "item created");
        Ok(row)
    }

    #[instrument(skip(self, dto))]
    async fn update(&self, id: Id, dto: UpdateItemDto) -> RepositoryResult<ItemRow> {
        dto.validate()?;

        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE items SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                is_active = COALESCE($3, is_active),
                updated_at = NOW()
            WHERE id = $4
            RETURNING {SELECT_COLUMNS}
            "#
        ))
        .bind(&dto.title)
        .bind(&dto.description)
        .bind(dto.is_active)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| RepositoryError::not_found(ItemRow::TYPE_NAME, id))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::not_found(ItemRow::TYPE_NAME, id));
        }

        tracing::info!(id, "item deleted");
        Ok(())
    }
}
