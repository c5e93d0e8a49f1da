use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use photo_review::config;
use photo_review::db;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Stage a directory of captured photos as a new review session"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Directory holding the captured images
    #[arg(long)]
    dir: PathBuf,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "heic"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| cfg.app.database_url());
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(&args.dir)
        .await
        .with_context(|| format!("failed to read {}", args.dir.display()))?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if is_image(&path) {
            files.push(path);
        } else {
            warn!(path = %path.display(), "skipping non-image file");
        }
    }
    files.sort();

    let session = db::open_session(&pool, &cfg.app.event).await?;
    // Review releases staged files, so stage copies rather than the originals.
    let staging_dir = Path::new(&cfg.app.resolved_data_dir())
        .join("captures")
        .join(session.id.to_string());
    tokio::fs::create_dir_all(&staging_dir).await?;

    for src in &files {
        let Some(name) = src.file_name() else {
            continue;
        };
        let dst = staging_dir.join(name);
        tokio::fs::copy(src, &dst)
            .await
            .with_context(|| format!("failed to copy {}", src.display()))?;
        let id = db::stage_photo(&pool, session.id, &dst.to_string_lossy()).await?;
        info!(id, path = %dst.display(), "staged photo");
    }

    println!("{}", session.id);
    info!(session = %session.id, staged = files.len(), event = %session.event, "capture session staged");
    Ok(())
}
