//! Ownership of captured photo bytes.
//!
//! The queue only carries a `source_uri`. Reading the bytes for upload and
//! releasing them once a photo is gone for good both go through [`BlobStore`].

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use tracing::debug;

use crate::db::{self, Pool};

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn read(&self, uri: &str) -> io::Result<Vec<u8>>;

    /// Release the bytes behind `uri`. Releasing twice is not an error.
    async fn release(&self, uri: &str) -> io::Result<()>;
}

/// Plain files on local disk. Uris are paths, optionally `file://` prefixed.
#[derive(Debug, Clone, Default)]
pub struct FsBlobStore;

impl FsBlobStore {
    pub fn path_of(uri: &str) -> PathBuf {
        PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn read(&self, uri: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(Self::path_of(uri)).await
    }

    async fn release(&self, uri: &str) -> io::Result<()> {
        match tokio::fs::remove_file(Self::path_of(uri)).await {
            Ok(()) => {
                debug!(uri, "released photo file");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Files staged by the capture flow; releasing also drops the staging row.
#[derive(Debug, Clone)]
pub struct StagedBlobStore {
    pool: Pool,
    files: FsBlobStore,
}

impl StagedBlobStore {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            files: FsBlobStore,
        }
    }
}

#[async_trait]
impl BlobStore for StagedBlobStore {
    async fn read(&self, uri: &str) -> io::Result<Vec<u8>> {
        self.files.read(uri).await
    }

    async fn release(&self, uri: &str) -> io::Result<()> {
        db::delete_staged_by_uri(&self.pool, uri)
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        self.files.release(uri).await
    }
}
