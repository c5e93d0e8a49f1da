use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use photo_review::blob::BlobStore;
use photo_review::dispatcher::{ActionDispatcher, DispatchEvent};
use photo_review::model::{Navigation, Photo, PhotoId, SwipeAction, Vec2, Viewport};
use photo_review::upload::{UploadError, UploadRequest, Uploader};
use reqwest::StatusCode;
use tokio::sync::{watch, Mutex};

#[derive(Debug, Clone, Default)]
struct UploadCall {
    namespace: String,
    file_name: String,
    content_type: String,
    len: usize,
}

/// Pops scripted responses; an empty script means success.
#[derive(Clone, Default)]
struct RecordingUploader {
    responses: Arc<Mutex<VecDeque<Result<(), u16>>>>,
    calls: Arc<Mutex<Vec<UploadCall>>>,
    delay_for: Arc<Mutex<Vec<(String, Duration)>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl RecordingUploader {
    fn with_responses(responses: Vec<Result<(), u16>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Default::default()
        }
    }

    async fn delay(&self, file_name: &str, by: Duration) {
        self.delay_for.lock().await.push((file_name.to_string(), by));
    }

    async fn calls(&self) -> Vec<UploadCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl Uploader for RecordingUploader {
    async fn upload(&self, request: UploadRequest) -> Result<(), UploadError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().await.push(UploadCall {
            namespace: request.namespace.clone(),
            file_name: request.file_name.clone(),
            content_type: request.content_type.to_string(),
            len: request.bytes.len(),
        });
        let delay = self
            .delay_for
            .lock()
            .await
            .iter()
            .find(|(name, _)| *name == request.file_name)
            .map(|(_, d)| *d)
            .unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;
        let response = self.responses.lock().await.pop_front().unwrap_or(Ok(()));
        self.active.fetch_sub(1, Ordering::SeqCst);
        response.map_err(|code| UploadError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            body: "scripted".into(),
        })
    }
}

#[derive(Clone, Default)]
struct MemoryBlobs {
    released: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn read(&self, uri: &str) -> io::Result<Vec<u8>> {
        Ok(vec![0u8; uri.len()])
    }

    async fn release(&self, uri: &str) -> io::Result<()> {
        self.released.lock().await.push(uri.to_string());
        Ok(())
    }
}

fn photos(names: &[&str]) -> Vec<Photo> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Photo::new(i as u64 + 1, format!("/captures/{name}.jpg")))
        .collect()
}

fn setup(
    uploader: &RecordingUploader,
    blobs: &MemoryBlobs,
    names: &[&str],
) -> (ActionDispatcher, watch::Sender<Viewport>) {
    let (tx, rx) = watch::channel(Viewport::new(390.0, 800.0));
    let mut d = ActionDispatcher::new(
        Arc::new(uploader.clone()),
        Arc::new(blobs.clone()),
        "garden-party",
        rx,
    );
    d.load(photos(names));
    (d, tx)
}

fn swipe_up(d: &mut ActionDispatcher) -> DispatchEvent {
    d.drag_start(Vec2::new(0.0, -3.0));
    d.drag_update(Vec2::new(0.0, -120.0));
    d.drag_update(Vec2::new(0.0, -220.0));
    d.drag_end(Vec2::new(0.0, -220.0), Vec2::ZERO)
}

fn swipe_down(d: &mut ActionDispatcher) -> DispatchEvent {
    d.drag_start(Vec2::new(1.0, 4.0));
    d.drag_update(Vec2::new(10.0, 260.0));
    d.drag_end(Vec2::new(10.0, 260.0), Vec2::new(0.0, 150.0))
}

fn swipe_left(d: &mut ActionDispatcher) -> DispatchEvent {
    d.drag_start(Vec2::new(-4.0, 1.0));
    d.drag_update(Vec2::new(-150.0, 8.0));
    d.drag_end(Vec2::new(-150.0, 8.0), Vec2::ZERO)
}

#[tokio::test]
async fn keep_fail_retry_discard_navigate() {
    let uploader = RecordingUploader::with_responses(vec![Err(503), Ok(())]);
    let blobs = MemoryBlobs::default();
    let (mut d, _viewport) = setup(&uploader, &blobs, &["a", "b", "c"]);
    let a = d.queue().focused().cloned().unwrap();

    // A up, upload fails: A comes back at the front.
    swipe_up(&mut d);
    assert_eq!(d.queue().ids(), vec![PhotoId(2), PhotoId(3)]);
    let done = d.settle().await;
    assert!(matches!(
        done.as_slice(),
        [DispatchEvent::Restored { photo: PhotoId(1), reason }] if reason.contains("503")
    ));
    assert_eq!(d.queue().ids(), vec![PhotoId(1), PhotoId(2), PhotoId(3)]);
    assert_eq!(d.queue().focus_index(), Some(0));
    assert_eq!(d.queue().focused(), Some(&a));

    // A up again, upload succeeds.
    swipe_up(&mut d);
    assert_eq!(d.settle().await, vec![DispatchEvent::Uploaded(PhotoId(1))]);
    assert_eq!(d.queue().ids(), vec![PhotoId(2), PhotoId(3)]);
    assert_eq!(d.queue().focus_index(), Some(0));

    // B down.
    assert_eq!(
        swipe_down(&mut d),
        DispatchEvent::Committed {
            action: SwipeAction::Discard,
            photo: Some(PhotoId(2))
        }
    );
    d.settle().await;
    assert_eq!(d.queue().ids(), vec![PhotoId(3)]);
    assert_eq!(d.queue().focus_index(), Some(0));

    // Single card left: navigating is clamped.
    assert_eq!(
        swipe_left(&mut d),
        DispatchEvent::Committed {
            action: SwipeAction::Navigate(Navigation::Advance),
            photo: Some(PhotoId(3))
        }
    );
    assert_eq!(d.queue().focus_index(), Some(0));

    let calls = uploader.calls().await;
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.namespace == "garden-party"
        && c.file_name == "1.jpg"
        && c.content_type == "image/jpeg"
        && c.len > 0));
    assert_eq!(
        *blobs.released.lock().await,
        vec!["/captures/a.jpg".to_string(), "/captures/b.jpg".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn completions_arrive_out_of_order() {
    let uploader = RecordingUploader::default();
    uploader.delay("1.jpg", Duration::from_secs(5)).await;
    uploader.delay("2.jpg", Duration::from_millis(10)).await;
    let blobs = MemoryBlobs::default();
    let (mut d, _viewport) = setup(&uploader, &blobs, &["a", "b", "c"]);

    swipe_up(&mut d);
    swipe_up(&mut d);
    assert_eq!(d.uploads_in_flight(), 2);
    assert_eq!(d.queue().ids(), vec![PhotoId(3)]);

    assert_eq!(d.next_completion().await, Some(DispatchEvent::Uploaded(PhotoId(2))));
    assert!(d.is_uploading());
    assert_eq!(d.next_completion().await, Some(DispatchEvent::Uploaded(PhotoId(1))));
    assert!(!d.is_uploading());
}

#[tokio::test(start_paused = true)]
async fn late_failure_restores_to_front_of_current_queue() {
    let uploader = RecordingUploader::with_responses(vec![Err(500)]);
    uploader.delay("1.jpg", Duration::from_secs(2)).await;
    let blobs = MemoryBlobs::default();
    let (mut d, _viewport) = setup(&uploader, &blobs, &["a", "b", "c", "d"]);

    swipe_up(&mut d);
    swipe_down(&mut d);
    swipe_left(&mut d);
    assert_eq!(d.queue().ids(), vec![PhotoId(3), PhotoId(4)]);
    assert_eq!(d.queue().focus_index(), Some(1));

    d.settle().await;
    assert_eq!(d.queue().ids(), vec![PhotoId(1), PhotoId(3), PhotoId(4)]);
    assert_eq!(d.queue().focus_index(), Some(0));
}

#[tokio::test]
async fn upload_limit_serializes_uploads() {
    let uploader = RecordingUploader::default();
    let blobs = MemoryBlobs::default();
    let (d, _viewport) = setup(&uploader, &blobs, &["a", "b", "c"]);
    let mut d = d.with_upload_limit(Some(1));

    for _ in 0..3 {
        swipe_up(&mut d);
    }
    assert_eq!(d.uploads_in_flight(), 3);
    assert!(d.queue().is_empty());
    let done = d.settle().await;
    assert_eq!(done.len(), 3);
    assert_eq!(uploader.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unbounded_uploads_overlap() {
    let uploader = RecordingUploader::default();
    let blobs = MemoryBlobs::default();
    let (mut d, _viewport) = setup(&uploader, &blobs, &["a", "b", "c"]);

    for _ in 0..3 {
        swipe_up(&mut d);
    }
    d.settle().await;
    assert_eq!(uploader.max_active.load(Ordering::SeqCst), 3);
    assert_eq!(uploader.calls().await.len(), 3);
}

#[tokio::test]
async fn cancelled_gestures_leave_queue_untouched() {
    let uploader = RecordingUploader::default();
    let blobs = MemoryBlobs::default();
    let (mut d, _viewport) = setup(&uploader, &blobs, &["a", "b", "c", "d", "e"]);
    swipe_left(&mut d);
    swipe_left(&mut d);
    assert_eq!(d.queue().focus_index(), Some(2));

    // Short vertical drag, slow release.
    d.drag_start(Vec2::new(0.0, -2.0));
    d.drag_update(Vec2::new(0.0, -150.0));
    assert_eq!(d.drag_end(Vec2::new(0.0, -150.0), Vec2::new(0.0, -200.0)), DispatchEvent::Cancelled);

    // Horizontal drag exactly at the navigation threshold.
    d.drag_start(Vec2::new(3.0, 0.0));
    assert_eq!(d.drag_end(Vec2::new(100.0, 0.0), Vec2::new(900.0, 0.0)), DispatchEvent::Cancelled);

    assert_eq!(d.queue().len(), 5);
    assert_eq!(d.queue().focus_index(), Some(2));
    assert!(uploader.calls().await.is_empty());
    assert!(d.settle().await.is_empty());
}
