//! Item API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use ck_core::{Entity, Id, PageResult};
use ck_db::{CreateItemDto, ItemRow, UpdateItemDto, ITEM_FIELDS};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, ListQuery};

/// GET /items
pub async fn list_items(
    State(state): State<AppState>,
    ListQuery(params): ListQuery,
) -> ApiResult<Json<ItemCollection>> {
    let request = params.into_request(&ITEM_FIELDS, state.config.pagination.default_page_size)?;
    let page = state.items.find_page(&request).await?;
    Ok(Json(ItemCollection::from(page)))
}

/// GET /items/:id
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Id>,
) -> ApiResult<Json<ItemRow>> {
    state
        .items
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// POST /items
pub async fn create_item(
    State(state): State<AppState>,
    Json(dto): Json<CreateItemDto>,
) -> ApiResult<impl IntoResponse> {
    let item = state.items.create(dto).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /items/:id
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Json(dto): Json<UpdateItemDto>,
) -> ApiResult<Json<ItemRow>> {
    Ok(Json(state.items.update(id, dto).await?))
}

/// DELETE /items/:id
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Id>,
) -> ApiResult<StatusCode> {
    state.items.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn not_found(id: Id) -> ApiError {
    ApiError::not_found(format!("{} with id {} not found", ItemRow::TYPE_NAME, id))
}

/// List response body
#[derive(Debug, Serialize)]
pub struct ItemCollection {
    pub items: Vec<ItemRow>,
    pub total: i64,
    pub count: usize,
    /// 1-indexed, offset mode only
    pub page: Option<i64>,
    pub page_size: i64,
    pub total_pages: i64,
    pub offset: Option<i64>,
    pub limit: i64,
    pub next_offset: Option<i64>,
    pub next_cursor: Option<String>,
}

impl From<PageResult<ItemRow>> for ItemCollection {
    fn from(page: PageResult<ItemRow>) -> Self {
        Self {
            count: page.count(),
            page: page.page(),
            total_pages: page.total_pages(),
            page_size: page.limit,
            total: page.total,
            offset: page.offset,
            limit: page.limit,
            next_offset: page.next_offset,
            next_cursor: page.next_cursor,
            items: page.items,
        }
    }
}
