//! # ck-api
//!
//! REST and WebSocket handlers for crudkit.
//!
//! - `/items` - CRUD plus filtered, sorted, paginated listing
//! - `/files` - multipart upload, download, listing, deletion
//! - `/tasks` - background task submission
//! - `/ws/chat` - broadcast chat over WebSocket

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use error::{ApiError, ApiResult};
pub use extractors::{AppState, ItemStore};
pub use routes::router;
