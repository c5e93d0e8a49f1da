use anyhow::{bail, Result};
use async_trait::async_trait;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use uuid::Uuid;

use photo_review::blob::{BlobStore, FsBlobStore, StagedBlobStore};
use photo_review::config;
use photo_review::db;
use photo_review::dispatcher::{ActionDispatcher, DispatchEvent};
use photo_review::source::{CaptureSource, ManifestSource, StagingSource};
use photo_review::trace;
use photo_review::upload::{HttpUploader, UploadError, UploadRequest, Uploader};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Replay recorded swipe gestures against a capture session"
)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Staged capture session to review (defaults to the event's latest)
    #[arg(long, conflicts_with = "manifest")]
    session: Option<Uuid>,

    /// JSON manifest of photos instead of the staging database
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// YAML pointer trace to replay
    #[arg(long)]
    trace: PathBuf,

    /// Log uploads instead of sending them
    #[arg(long)]
    dry_run: bool,
}

/// Accepts every upload without sending it anywhere.
struct DryRunUploader;

#[async_trait]
impl Uploader for DryRunUploader {
    async fn upload(&self, request: UploadRequest) -> Result<(), UploadError> {
        info!(?request, "dry run: upload skipped");
        Ok(())
    }
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
    let recorded = trace::load_trace(&args.trace)?;

    let uploader: Arc<dyn Uploader> = if args.dry_run {
        Arc::new(DryRunUploader)
    } else {
        Arc::new(HttpUploader::from_config(&cfg.upload)?)
    };

    let (source, blobs): (Box<dyn CaptureSource>, Arc<dyn BlobStore>) = match &args.manifest {
        Some(path) => (Box::new(ManifestSource::new(path)), Arc::new(FsBlobStore)),
        None => {
            let database_url = std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| cfg.app.database_url());
            let pool = db::init_pool(&database_url).await?;
            db::run_migrations(&pool).await?;
            let session = match args.session {
                Some(id) => db::find_session(&pool, id).await?.id,
                None => match db::latest_session(&pool, &cfg.app.event).await? {
                    Some(id) => id,
                    None => bail!("no capture session staged for event {}", cfg.app.event),
                },
            };
            info!(%session, "reviewing staged session");
            (
                Box::new(StagingSource::new(pool.clone(), session)),
                Arc::new(StagedBlobStore::new(pool)),
            )
        }
    };

    let (viewport_tx, viewport_rx) = watch::channel(recorded.viewport);
    let mut dispatcher = ActionDispatcher::new(uploader, blobs, cfg.app.event.clone(), viewport_rx)
        .with_thresholds(cfg.gestures)
        .with_upload_limit(cfg.upload.max_concurrent);
    let loaded = dispatcher.load_from(source.as_ref()).await?;
    info!(loaded, "queue ready");

    for (i, gesture) in recorded.gestures.iter().enumerate() {
        let event = trace::replay(&mut dispatcher, &viewport_tx, gesture);
        for done in dispatcher.poll_completions() {
            print_event("upload", &done);
        }
        print_event(&format!("gesture {}", i + 1), &event);
        println!(
            "  queue: {:?} focus: {:?}{}",
            dispatcher.queue().ids(),
            dispatcher.queue().focus_index(),
            if dispatcher.is_uploading() { " (uploading)" } else { "" }
        );
        if dispatcher.queue().is_empty() && !dispatcher.is_uploading() {
            info!("queue empty; nothing left to review");
            break;
        }
    }

    for done in dispatcher.settle().await {
        print_event("upload", &done);
    }
    println!(
        "remaining: {:?} focus: {:?}",
        dispatcher.queue().ids(),
        dispatcher.queue().focus_index()
    );
    Ok(())
}

fn print_event(label: &str, event: &DispatchEvent) {
    match event {
        DispatchEvent::Cancelled => println!("{label}: cancelled"),
        DispatchEvent::Committed { action, photo } => match photo {
            Some(id) => println!("{label}: {} photo {}", action.as_str(), id),
            None => println!("{label}: {}", action.as_str()),
        },
        DispatchEvent::Uploaded(id) => println!("{label}: photo {} uploaded", id),
        DispatchEvent::Restored { photo, reason } => {
            println!("{label}: photo {} restored ({})", photo, reason)
        }
        DispatchEvent::RestoreSkipped(id) => {
            println!("{label}: photo {} upload failed; already queued again", id)
        }
    }
}
