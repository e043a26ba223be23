//! # ck-db
//!
//! Database layer for crudkit.
//!
//! Renders composed `ck_queries::Query` values to parameterized Postgres SQL
//! and provides the item repository in two flavours: Postgres via SQLx and an
//! in-memory store used when no database is reachable and in tests.

pub mod items;
pub mod memory;
pub mod pool;
pub mod repository;
pub mod sql;

pub use items::{CreateItemDto, ItemRow, PgItemRepository, UpdateItemDto, ITEM_FIELDS};
pub use memory::MemoryItemRepository;
pub use pool::{Database, PoolStats};
pub use repository::{ListRequest, Repository, RepositoryError, RepositoryResult};

pub use ck_queries::cursor::CursorKey;
