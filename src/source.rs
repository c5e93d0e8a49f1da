use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::db::{self, Pool};
use crate::model::Photo;

/// The only hard failure of the review core: the initial batch could not be read.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error reading capture manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed capture manifest: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("staging database error: {0}")]
    Database(#[from] anyhow::Error),
}

/// Where the one-shot initial queue comes from.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn load(&self) -> Result<Vec<Photo>, SourceError>;
}

/// JSON manifest: an ordered array of `{"id", "source_uri", "captured_at"?}`.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    path: PathBuf,
}

impl ManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CaptureSource for ManifestSource {
    async fn load(&self) -> Result<Vec<Photo>, SourceError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let photos: Vec<Photo> = serde_json::from_str(&raw)?;
        info!(path = %self.path.display(), count = photos.len(), "loaded capture manifest");
        Ok(photos)
    }
}

/// Pending photos of one capture session in the staging database.
#[derive(Debug, Clone)]
pub struct StagingSource {
    pool: Pool,
    session_id: Uuid,
}

impl StagingSource {
    pub fn new(pool: Pool, session_id: Uuid) -> Self {
        Self { pool, session_id }
    }
}

#[async_trait]
impl CaptureSource for StagingSource {
    async fn load(&self) -> Result<Vec<Photo>, SourceError> {
        let rows = db::pending_photos(&self.pool, self.session_id).await?;
        info!(session = %self.session_id, count = rows.len(), "loaded staged photos");
        Ok(rows.into_iter().map(Photo::from).collect())
    }
}

/// Fixed list, for tests and embedding.
#[async_trait]
impl CaptureSource for Vec<Photo> {
    async fn load(&self) -> Result<Vec<Photo>, SourceError> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PhotoId;
    use tempfile::tempdir;

    #[tokio::test]
    async fn manifest_keeps_order() {
        let td = tempdir().unwrap();
        let p = td.path().join("session.json");
        std::fs::write(
            &p,
            r#"[
                {"id": 3, "source_uri": "/c/3.jpg"},
                {"id": 1, "source_uri": "/c/1.jpg", "captured_at": "2026-06-01T18:30:00Z"}
            ]"#,
        )
        .unwrap();
        let photos = ManifestSource::new(&p).load().await.unwrap();
        assert_eq!(
            photos.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![PhotoId(3), PhotoId(1)]
        );
        assert!(photos[1].captured_at.is_some());
    }

    #[tokio::test]
    async fn malformed_manifest_is_an_error() {
        let td = tempdir().unwrap();
        let p = td.path().join("session.json");
        std::fs::write(&p, r#"[{"uri": "/c/3.jpg"}]"#).unwrap();
        let err = ManifestSource::new(&p).load().await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));

        let err = ManifestSource::new(td.path().join("missing.json"))
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
    }
}
