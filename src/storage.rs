//! Blob storage for document content.
//!
//! Content is addressed by SHA-256 hash. The filesystem store uses a
//! two-level directory structure based on the hash prefix:
//! `{documents_dir}/{hash[0..2]}/{hash[0..8]}.{extension}`. Durable metadata
//! persistence lives behind the repository traits, not here.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from blob storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Compute the SHA-256 content hash of a blob.
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Construct the storage path for document content.
pub fn content_storage_path(documents_dir: &Path, content_hash: &str, extension: &str) -> PathBuf {
    documents_dir
        .join(&content_hash[..2])
        .join(format!("{}.{}", &content_hash[..8], extension))
}

/// Map MIME type to file extension.
pub fn mime_to_extension(mime: &str) -> &'static str {
    match mime {
        "application/pdf" => "pdf",
        "text/plain" => "txt",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        _ => "bin",
    }
}

/// Durable store for document binaries.
///
/// Blobs are addressed by content hash; the declared MIME type determines
/// the stored extension, so both are needed to locate a blob.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store a blob, returning its content hash.
    async fn put(&self, content: &[u8], mime_type: &str) -> Result<String, StorageError>;

    /// Fetch a blob by content hash.
    async fn get(&self, content_hash: &str, mime_type: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove a blob. Removing an absent blob is not an error.
    async fn delete(&self, content_hash: &str, mime_type: &str) -> Result<(), StorageError>;
}

/// Filesystem-backed blob store.
pub struct FsBlobStore {
    documents_dir: PathBuf,
}

impl FsBlobStore {
    pub fn new(documents_dir: impl Into<PathBuf>) -> Self {
        Self {
            documents_dir: documents_dir.into(),
        }
    }

    fn path_for(&self, content_hash: &str, mime_type: &str) -> PathBuf {
        content_storage_path(&self.documents_dir, content_hash, mime_to_extension(mime_type))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, content: &[u8], mime_type: &str) -> Result<String, StorageError> {
        let hash = content_hash(content);
        let path = self.path_for(&hash, mime_type);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        tracing::debug!("Stored blob {} at {}", &hash[..8], path.display());
        Ok(hash)
    }

    async fn get(&self, content_hash: &str, mime_type: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(content_hash, mime_type);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(content_hash.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, content_hash: &str, mime_type: &str) -> Result<(), StorageError> {
        let path = self.path_for(content_hash, mime_type);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory blob store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: tokio::sync::RwLock<std::collections::HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, content: &[u8], _mime_type: &str) -> Result<String, StorageError> {
        let hash = content_hash(content);
        self.blobs.write().await.insert(hash.clone(), content.to_vec());
        Ok(hash)
    }

    async fn get(&self, content_hash: &str, _mime_type: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .read()
            .await
            .get(content_hash)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(content_hash.to_string()))
    }

    async fn delete(&self, content_hash: &str, _mime_type: &str) -> Result<(), StorageError> {
        self.blobs.write().await.remove(content_hash);
        Ok(())
    }
}
