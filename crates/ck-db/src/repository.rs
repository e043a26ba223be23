//! Repository traits
//!
//! Generic CRUD plus filtered, sorted, paginated listing.

use async_trait::async_trait;
use ck_core::{Id, PageRequest, PageResult, ValidationError};
use ck_queries::filters::FilterSpec;
use ck_queries::sorts::SortSpec;

/// Error type for repository operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: Id },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: Id) -> Self {
        Self::NotFound { entity, id }
    }
}

impl From<validator::ValidationErrors> for RepositoryError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.into())
    }
}

/// Result type for repository operations
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Everything a list endpoint asks of a repository
#[derive(Debug, Clone, Default)]
pub struct ListRequest {
    pub filters: FilterSpec,
    pub sorts: SortSpec,
    pub page: PageRequest,
}

impl ListRequest {
    pub fn new(filters: FilterSpec, sorts: SortSpec, page: PageRequest) -> Self {
        Self {
            filters,
            sorts,
            page,
        }
    }
}

/// Base repository trait for CRUD operations
#[async_trait]
pub trait Repository<T, CreateDto, UpdateDto>: Send + Sync {
    /// Find an entity by ID
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<T>>;

    /// Filter, sort, and paginate
    async fn find_page(&self, request: &ListRequest) -> RepositoryResult<PageResult<T>>;

    /// Count all entities
    async fn count(&self) -> RepositoryResult<i64>;

    async fn create(&self, dto: CreateDto) -> RepositoryResult<T>;

    /// Apply the fields set in `dto`; missing entity is `NotFound`
    async fn update(&self, id: Id, dto: UpdateDto) -> RepositoryResult<T>;

    /// Delete an entity by ID; missing entity is `NotFound`
    async fn delete(&self, id: Id) -> RepositoryResult<()>;
}
