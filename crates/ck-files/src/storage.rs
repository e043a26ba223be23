//! Storage Abstraction
//!
//! Provides a unified interface for uploaded file backends.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::naming::{candidate, stored_name, upload_name};

/// Upper bound on `_N` suffixes tried before giving up
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File {0} not found")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Access denied: {0}")]
    Forbidden(String),
    #[error("Invalid file name: {0:?}")]
    InvalidName(String),
    #[error("File size {size} exceeds maximum allowed size of {max} bytes")]
    TooLarge { size: usize, max: usize },
    #[error("No free name for {0}")]
    NameExhausted(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredFile {
    /// Name the file was stored under, possibly suffixed
    pub filename: String,
    pub size: usize,
    pub content_type: String,
    /// SHA256 digest
    pub digest: String,
}

/// Listing entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    pub filename: String,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Storage trait - unified interface for storage backends
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store `data` under the client's name, suffixing `_1`, `_2`, ... on collision
    async fn save(&self, name: &str, data: Bytes) -> StorageResult<StoredFile>;

    async fn read(&self, name: &str) -> StorageResult<Bytes>;

    async fn delete(&self, name: &str) -> StorageResult<()>;

    /// All stored files, ordered by name
    async fn list(&self) -> StorageResult<Vec<FileInfo>>;

    /// Largest accepted file, in bytes
    fn max_size(&self) -> usize;

    /// Get storage name for logging
    fn name(&self) -> &str;
}

fn calculate_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn guess_content_type(name: &str) -> String {
    mime_guess::from_path(name).first_or_octet_stream().to_string()
}

fn check_size(data: &[u8], max: usize) -> StorageResult<()> {
    if data.len() > max {
        return Err(StorageError::TooLarge {
            size: data.len(),
            max,
        });
    }
    Ok(())
}

/// Remove a file whose write failed, so the name is free again.
/// Returns the original write error.
async fn discard_partial(path: &Path, error: std::io::Error) -> StorageError {
    if let Err(e) = fs::remove_file(path).await {
        warn!(path = ?path, error = %e, "Failed to remove partial upload");
    }
    error.into()
}

/// Local filesystem storage
pub struct LocalStorage {
    /// Root directory for storage
    root: PathBuf,
    max_size: usize,
}

impl LocalStorage {
    pub fn new(root: impl AsRef<Path>, max_size: usize) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_size,
        }
    }

    /// Create the root directory if missing
    pub async fn ensure_root(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored name to a full path inside the root
    fn resolve_path(&self, name: &str) -> StorageResult<PathBuf> {
        Ok(self.root.join(stored_name(name)?))
    }

    /// Path to an existing regular file
    async fn existing_file(&self, name: &str) -> StorageResult<PathBuf> {
        let path = self.resolve_path(name)?;
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(StorageError::NotFound(name.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    #[instrument(skip(self, data), fields(storage = "local", size = data.len()))]
    async fn save(&self, name: &str, data: Bytes) -> StorageResult<StoredFile> {
        let name = upload_name(name)?;
        check_size(&data, self.max_size)?;
        self.ensure_root().await?;

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let filename = candidate(&name, attempt);
            let path = self.resolve_path(&filename)?;

            // create_new fails instead of overwriting a concurrent upload
            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };
            let written = match file.write_all(&data).await {
                Ok(()) => file.sync_all().await,
                Err(e) => Err(e),
            };
            drop(file);
            if let Err(e) = written {
                return Err(discard_partial(&path, e).await);
            }

            debug!(path = ?path, "File stored");

            return Ok(StoredFile {
                content_type: guess_content_type(&filename),
                digest: calculate_digest(&data),
                size: data.len(),
                filename,
            });
        }

        Err(StorageError::NameExhausted(name))
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn read(&self, name: &str) -> StorageResult<Bytes> {
        let path = self.existing_file(name).await?;
        Ok(Bytes::from(fs::read(&path).await?))
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn delete(&self, name: &str) -> StorageResult<()> {
        let path = self.existing_file(name).await?;
        fs::remove_file(&path).await?;
        debug!(path = ?path, "File deleted");
        Ok(())
    }

    async fn list(&self) -> StorageResult<Vec<FileInfo>> {
        let mut files = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            files.push(FileInfo {
                filename: entry.file_name().to_string_lossy().into_owned(),
                size: meta.len(),
                modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    fn max_size(&self) -> usize {
        self.max_size
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// In-memory storage for testing
pub struct MemoryStorage {
    files: tokio::sync::RwLock<BTreeMap<String, (Bytes, DateTime<Utc>)>>,
    max_size: usize,
}

impl MemoryStorage {
    pub fn new(max_size: usize) -> Self {
        Self {
            files: tokio::sync::RwLock::new(BTreeMap::new()),
            max_size,
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn save(&self, name: &str, data: Bytes) -> StorageResult<StoredFile> {
        let name = upload_name(name)?;
        check_size(&data, self.max_size)?;

        let mut files = self.files.write().await;
        let filename = (0..MAX_NAME_ATTEMPTS)
            .map(|attempt| candidate(&name, attempt))
            .find(|candidate| !files.contains_key(candidate))
            .ok_or_else(|| StorageError::NameExhausted(name.clone()))?;

        let stored = StoredFile {
            content_type: guess_content_type(&filename),
            digest: calculate_digest(&data),
            size: data.len(),
            filename: filename.clone(),
        };
        files.insert(filename, (data, Utc::now()));
        Ok(stored)
    }

    async fn read(&self, name: &str) -> StorageResult<Bytes> {
        let name = stored_name(name)?;
        let files = self.files.read().await;
        files
            .get(name)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn delete(&self, name: &str) -> StorageResult<()> {
        let name = stored_name(name)?;
        let mut files = self.files.write().await;
        files
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn list(&self) -> StorageResult<Vec<FileInfo>> {
        let files = self.files.read().await;
        Ok(files
            .iter()
            .map(|(filename, (data, modified))| FileInfo {
                filename: filename.clone(),
                size: data.len() as u64,
                modified_at: Some(*modified),
            })
            .collect())
    }

    fn max_size(&self) -> usize {
        self.max_size
    }

    fn name(&self) -> &str {
        "memory"
    }
}
