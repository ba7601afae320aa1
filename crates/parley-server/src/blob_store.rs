//! Storage for uploaded bytes.
//!
//! Every upload path writes through [`BlobStore`] and records only the
//! returned locator in the database. [`FsBlobStore`] is content addressed:
//! the locator is the BLAKE3 hash of the bytes, so identical uploads share
//! one file on disk.

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServerError;

/// `put(bytes) -> locator`, `get(locator) -> bytes`.
pub trait BlobStore: Send + Sync {
    fn put<'a>(&'a self, data: &'a [u8]) -> BoxFuture<'a, Result<String, ServerError>>;

    fn get<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ServerError>>;
}

/// Verify that a resolved path stays within the expected base directory.
/// Prevents path traversal attacks.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, ServerError> {
    // Canonicalize base; target may not exist yet so normalize manually
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    let mut resolved = canonical_base.clone();
    for component in target
        .strip_prefix(base)
        .or_else(|_| target.strip_prefix(&canonical_base))
        .unwrap_or(target)
        .components()
    {
        match component {
            std::path::Component::Normal(c) => resolved.push(c),
            std::path::Component::ParentDir => {
                return Err(ServerError::BadRequest(
                    "Path traversal detected".to_string(),
                ));
            }
            _ => {} // RootDir, CurDir, Prefix: skip
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(ServerError::BadRequest(
            "Path traversal detected".to_string(),
        ));
    }
    Ok(resolved)
}

/// A locator is a lowercase 64-char BLAKE3 hex digest.
fn is_locator(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    base_path: PathBuf,
}

impl FsBlobStore {
    pub async fn new(base_path: PathBuf) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::BlobStorage(format!(
                "Failed to create blob directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Blob store initialized");

        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Blobs are sharded by the first two hex digits of their locator.
    fn blob_path(&self, locator: &str) -> Result<PathBuf, ServerError> {
        if !is_locator(locator) {
            return Err(ServerError::BlobStorage(format!(
                "Invalid blob locator: {locator}"
            )));
        }
        let raw = self.base_path.join(&locator[..2]).join(locator);
        ensure_within(&self.base_path, &raw)
    }

    async fn store(&self, data: &[u8]) -> Result<String, ServerError> {
        let locator = blake3::hash(data).to_hex().to_string();
        let path = self.blob_path(&locator)?;

        if fs::try_exists(&path).await.unwrap_or(false) {
            debug!(locator = %locator, "Blob already stored");
            return Ok(locator);
        }

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await.map_err(|e| {
                ServerError::BlobStorage(format!("Failed to create shard directory: {e}"))
            })?;
        }

        // write-then-rename so readers never observe a partial blob
        let tmp = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
        fs::write(&tmp, data).await.map_err(|e| {
            ServerError::BlobStorage(format!("Failed to write blob {locator}: {e}"))
        })?;
        fs::rename(&tmp, &path).await.map_err(|e| {
            ServerError::BlobStorage(format!("Failed to commit blob {locator}: {e}"))
        })?;

        debug!(locator = %locator, size = data.len(), "Stored blob");
        Ok(locator)
    }

    async fn load(&self, locator: &str) -> Result<Vec<u8>, ServerError> {
        let path = self.blob_path(locator)?;

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ServerError::NotFound(format!(
                    "File content missing: {locator}"
                )));
            }
            Err(e) => {
                return Err(ServerError::BlobStorage(format!(
                    "Failed to read blob {locator}: {e}"
                )));
            }
        };

        debug!(locator = %locator, size = data.len(), "Retrieved blob");
        Ok(data)
    }
}

impl BlobStore for FsBlobStore {
    fn put<'a>(&'a self, data: &'a [u8]) -> BoxFuture<'a, Result<String, ServerError>> {
        self.store(data).boxed()
    }

    fn get<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ServerError>> {
        self.load(locator).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (FsBlobStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FsBlobStore::new(dir.path().join("blobs")).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (store, _dir) = test_store().await;
        let data = b"attachment-bytes";

        let locator = store.put(data).await.unwrap();
        assert_eq!(locator, blake3::hash(data).to_hex().to_string());
        assert_eq!(store.get(&locator).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_identical_content_shares_locator() {
        let (store, _dir) = test_store().await;
        let a = store.put(b"same").await.unwrap();
        let b = store.put(b"same").await.unwrap();
        let c = store.put(b"different").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let (store, _dir) = test_store().await;
        let locator = blake3::hash(b"never stored").to_hex().to_string();
        assert!(matches!(
            store.get(&locator).await,
            Err(ServerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_locator_rejected() {
        let (store, _dir) = test_store().await;
        assert!(store.get("../../etc/passwd").await.is_err());
        assert!(store.get("ABC").await.is_err());
    }

    #[test]
    fn test_ensure_within_rejects_parent_dir() {
        let base = Path::new("/srv/blobs");
        assert!(ensure_within(base, &base.join("ab").join("..").join("x")).is_err());
        assert!(ensure_within(base, &base.join("ab").join("cd")).is_ok());
    }
}
