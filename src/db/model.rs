//! Staging rows. Conversion into domain types lives here; anything smarter
//! belongs to the queue or dispatcher.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::Photo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    pub id: Uuid,
    pub event: String,
    pub created_at: DateTime<Utc>,
}

/// A captured photo waiting for review. The row id doubles as the photo id,
/// which keeps ids monotonic across a session.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StagedPhoto {
    pub id: i64,
    pub source_uri: String,
    pub captured_at: DateTime<Utc>,
}

impl From<StagedPhoto> for Photo {
    fn from(row: StagedPhoto) -> Self {
        Photo {
            id: crate::model::PhotoId(row.id as u64),
            source_uri: row.source_uri,
            captured_at: Some(row.captured_at),
        }
    }
}
