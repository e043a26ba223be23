//! # ck-files
//!
//! Storage for uploaded files: a flat directory of user-named files with
//! collision-free naming, a size limit, and path traversal protection.

pub mod naming;
pub mod storage;

pub use storage::{
    FileInfo, LocalStorage, MemoryStorage, Storage, StorageError, StorageResult, StoredFile,
};
