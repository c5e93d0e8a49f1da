use super::model::{CaptureSession, StagedPhoto};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized)
        .await
        .with_context(|| format!("failed to open staging database {}", normalized))?;
    // WAL so the capture flow can keep staging while a review reads.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys=ON;").execute(&pool).await?;
    Ok(pool)
}

/// Expand a leading `~/` in file-backed SQLite URLs and create the parent
/// directory. In-memory and non-sqlite URLs pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }
    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };
    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    // Default to creating the file, unless the caller already chose a mode.
    let query = match query {
        Some(q) => q.to_string(),
        None => "mode=rwc".to_string(),
    };
    format!("sqlite://{}?{}", path, query)
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip(pool))]
pub async fn open_session(pool: &Pool, event: &str) -> Result<CaptureSession> {
    let id = Uuid::new_v4();
    let row = sqlx::query(
        "INSERT INTO capture_sessions (id, event) VALUES (?, ?) RETURNING created_at",
    )
    .bind(id.to_string())
    .bind(event)
    .fetch_one(pool)
    .await?;
    Ok(CaptureSession {
        id,
        event: event.to_string(),
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

#[instrument(skip(pool))]
pub async fn find_session(pool: &Pool, id: Uuid) -> Result<CaptureSession> {
    let row = sqlx::query("SELECT event, created_at FROM capture_sessions WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| anyhow!("capture session {} not found", id))?;
    Ok(CaptureSession {
        id,
        event: row.get("event"),
        created_at: row.get("created_at"),
    })
}

/// Most recently opened session for an event, if any.
#[instrument(skip(pool))]
pub async fn latest_session(pool: &Pool, event: &str) -> Result<Option<Uuid>> {
    let id: Option<String> = sqlx::query_scalar(
        "SELECT id FROM capture_sessions WHERE event = ? ORDER BY created_at DESC, rowid DESC LIMIT 1",
    )
    .bind(event)
    .fetch_optional(pool)
    .await?;
    id.map(|s| Uuid::parse_str(&s).context("corrupt capture session id"))
        .transpose()
}

#[instrument(skip(pool))]
pub async fn stage_photo(pool: &Pool, session_id: Uuid, source_uri: &str) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO staged_photos (session_id, source_uri) VALUES (?, ?) RETURNING id",
    )
    .bind(session_id.to_string())
    .bind(source_uri)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Pending photos of a session in capture order.
#[instrument(skip(pool))]
pub async fn pending_photos(pool: &Pool, session_id: Uuid) -> Result<Vec<StagedPhoto>> {
    let rows = sqlx::query_as::<_, StagedPhoto>(
        "SELECT id, source_uri, captured_at FROM staged_photos WHERE session_id = ? ORDER BY id",
    )
    .bind(session_id.to_string())
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[instrument(skip(pool))]
pub async fn count_pending(pool: &Pool, session_id: Uuid) -> Result<i64> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM staged_photos WHERE session_id = ?")
        .bind(session_id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(n)
}

/// Returns whether a row was deleted.
#[instrument(skip(pool))]
pub async fn delete_staged_by_uri(pool: &Pool, source_uri: &str) -> Result<bool> {
    let res = sqlx::query("DELETE FROM staged_photos WHERE source_uri = ?")
        .bind(source_uri)
        .execute(pool)
        .await?;
    Ok(res.rows_affected() > 0)
}
