//! Action dispatcher: turns released gestures into queue mutations.
//!
//! Gesture callbacks run synchronously on the caller's task and never wait on
//! I/O. A keep removes the photo optimistically and spawns its upload; the
//! outcome comes back over a channel and is applied by the same task that
//! owns the queue (`poll_completions`, `next_completion`, `settle`). A failed
//! upload puts the photo back at the front of the queue.
//!
//! Completions are unordered: a later keep may resolve before an earlier one.

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::blob::BlobStore;
use crate::gesture::{DragFeedback, GestureEvent, GestureInterpreter, GestureThresholds};
use crate::model::{Axis, Photo, PhotoId, SwipeAction, UploadOutcome, Vec2, Viewport};
use crate::queue::PhotoQueue;
use crate::source::{CaptureSource, SourceError};
use crate::upload::{content_type_for, UploadError, UploadRequest, Uploader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Idle,
    /// Axis is `None` until the first movement decides it.
    Dragging(Option<Axis>),
    Committing(SwipeAction),
}

/// Everything the dispatcher did, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    Cancelled,
    Committed {
        action: SwipeAction,
        photo: Option<PhotoId>,
    },
    Uploaded(PhotoId),
    Restored {
        photo: PhotoId,
        reason: String,
    },
    /// A failed upload came back but its id was queued again meanwhile.
    RestoreSkipped(PhotoId),
}

/// Outcome of one spawned upload.
#[derive(Debug, Clone)]
pub struct Completion {
    pub photo: Photo,
    pub outcome: UploadOutcome,
}

pub struct ActionDispatcher {
    queue: PhotoQueue,
    gesture: GestureInterpreter,
    state: DispatchState,
    viewport: watch::Receiver<Viewport>,
    uploader: Arc<dyn Uploader>,
    blobs: Arc<dyn BlobStore>,
    namespace: String,
    upload_limit: Option<Arc<Semaphore>>,
    uploading: HashSet<PhotoId>,
    releases: Vec<JoinHandle<()>>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    events: Vec<DispatchEvent>,
}

impl ActionDispatcher {
    pub fn new(
        uploader: Arc<dyn Uploader>,
        blobs: Arc<dyn BlobStore>,
        namespace: impl Into<String>,
        viewport: watch::Receiver<Viewport>,
    ) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            queue: PhotoQueue::new(),
            gesture: GestureInterpreter::default(),
            state: DispatchState::Idle,
            viewport,
            uploader,
            blobs,
            namespace: namespace.into(),
            upload_limit: None,
            uploading: HashSet::new(),
            releases: Vec::new(),
            completions_tx,
            completions_rx,
            events: Vec::new(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: GestureThresholds) -> Self {
        self.gesture = GestureInterpreter::new(thresholds);
        self
    }

    /// Cap simultaneous uploads. `None` leaves them unbounded.
    pub fn with_upload_limit(mut self, limit: Option<usize>) -> Self {
        self.upload_limit = limit.map(|n| Arc::new(Semaphore::new(n.max(1))));
        self
    }

    /// Replace the queue with the capture session's photos.
    pub async fn load_from(&mut self, source: &dyn CaptureSource) -> Result<usize, SourceError> {
        let photos = source.load().await?;
        self.load(photos);
        Ok(self.queue.len())
    }

    pub fn load(&mut self, photos: Vec<Photo>) {
        self.gesture.cancel();
        self.state = DispatchState::Idle;
        for dropped in self.queue.load(photos) {
            self.release_unreferenced(dropped);
        }
    }

    pub fn queue(&self) -> &PhotoQueue {
        &self.queue
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn is_uploading(&self) -> bool {
        !self.uploading.is_empty()
    }

    pub fn uploads_in_flight(&self) -> usize {
        self.uploading.len()
    }

    pub fn events(&self) -> &[DispatchEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<DispatchEvent> {
        std::mem::take(&mut self.events)
    }

    /// Pointer went down on the focused card.
    pub fn pointer_down(&mut self) {
        if self.state == DispatchState::Idle && !self.queue.is_empty() {
            self.transition(DispatchState::Dragging(None));
        }
    }

    pub fn drag_start(&mut self, delta: Vec2) -> Option<Axis> {
        self.pointer_down();
        if !matches!(self.state, DispatchState::Dragging(_)) {
            return None;
        }
        let axis = self.gesture.drag_start(delta);
        self.transition(DispatchState::Dragging(axis));
        axis
    }

    pub fn drag_update(&mut self, offset: Vec2) -> Option<DragFeedback> {
        if !matches!(self.state, DispatchState::Dragging(_)) {
            return None;
        }
        let viewport = self.current_viewport();
        let feedback = self.gesture.drag_update(offset, viewport);
        if self.state == DispatchState::Dragging(None) && feedback.axis.is_some() {
            self.transition(DispatchState::Dragging(feedback.axis));
        }
        Some(feedback)
    }

    /// Release the pointer. Returns what happened; never blocks on I/O.
    pub fn drag_end(&mut self, offset: Vec2, velocity: Vec2) -> DispatchEvent {
        if !matches!(self.state, DispatchState::Dragging(_)) {
            self.gesture.cancel();
            return self.record(DispatchEvent::Cancelled);
        }
        let viewport = self.current_viewport();
        let event = self.gesture.drag_end(offset, velocity, viewport);
        let Some(action) = event.action() else {
            self.transition(DispatchState::Idle);
            return self.record(DispatchEvent::Cancelled);
        };

        self.transition(DispatchState::Committing(action));
        let outcome = self.commit(action, event);
        self.transition(DispatchState::Idle);
        self.record(outcome)
    }

    /// Abort the current gesture (pointer left the window, etc).
    pub fn cancel(&mut self) {
        self.gesture.cancel();
        self.transition(DispatchState::Idle);
    }

    fn commit(&mut self, action: SwipeAction, event: GestureEvent) -> DispatchEvent {
        match event {
            GestureEvent::CommittedNavigate(nav) => {
                let moved = self.queue.navigate(nav);
                debug!(?nav, moved, focus = ?self.queue.focus_index(), "navigated");
                DispatchEvent::Committed {
                    action,
                    photo: self.queue.focused().map(|p| p.id),
                }
            }
            GestureEvent::CommittedKeep | GestureEvent::CommittedDiscard => {
                let Some(id) = self.queue.focused().map(|p| p.id) else {
                    return DispatchEvent::Cancelled;
                };
                let Some(removed) = self.queue.remove(id) else {
                    return DispatchEvent::Cancelled;
                };
                if action == SwipeAction::Keep {
                    self.spawn_upload(removed.photo);
                } else {
                    info!(photo = %id, "discarded photo");
                    self.spawn_release(removed.photo.source_uri);
                }
                DispatchEvent::Committed {
                    action,
                    photo: Some(id),
                }
            }
            GestureEvent::Cancelled => DispatchEvent::Cancelled,
        }
    }

    fn spawn_upload(&mut self, photo: Photo) {
        let id = photo.id;
        self.uploading.insert(id);
        let uploader = Arc::clone(&self.uploader);
        let blobs = Arc::clone(&self.blobs);
        let namespace = self.namespace.clone();
        let limit = self.upload_limit.clone();
        let tx = self.completions_tx.clone();
        info!(photo = %id, in_flight = self.uploading.len(), "upload dispatched");

        let task = async move {
            let _permit = match limit {
                Some(sem) => sem.acquire_owned().await.ok(),
                None => None,
            };
            let outcome = match upload_photo(&*uploader, &*blobs, &namespace, &photo).await {
                Ok(()) => {
                    if let Err(err) = blobs.release(&photo.source_uri).await {
                        warn!(?err, uri = %photo.source_uri, "failed to release uploaded photo");
                    }
                    UploadOutcome::Success
                }
                Err(err) => UploadOutcome::Failure(err.to_string()),
            };
            // Receiver lives as long as the dispatcher; a dropped dispatcher
            // has nobody left to restore into.
            let _ = tx.send(Completion { photo, outcome });
        };
        tokio::spawn(task.instrument(info_span!("upload", photo = %id)));
    }

    fn spawn_release(&mut self, uri: String) {
        let blobs = Arc::clone(&self.blobs);
        self.releases.retain(|h| !h.is_finished());
        self.releases.push(tokio::spawn(async move {
            if let Err(err) = blobs.release(&uri).await {
                warn!(?err, %uri, "failed to release discarded photo");
            }
        }));
    }

    /// Apply every completion that has already arrived.
    pub fn poll_completions(&mut self) -> Vec<DispatchEvent> {
        let mut applied = Vec::new();
        while let Ok(c) = self.completions_rx.try_recv() {
            applied.push(self.apply(c));
        }
        applied
    }

    /// Wait for the next upload to finish and apply it. `None` when nothing
    /// is in flight.
    pub async fn next_completion(&mut self) -> Option<DispatchEvent> {
        if self.uploading.is_empty() {
            return None;
        }
        let c = self.completions_rx.recv().await?;
        Some(self.apply(c))
    }

    /// Wait until every upload and release has finished.
    pub async fn settle(&mut self) -> Vec<DispatchEvent> {
        let mut applied = Vec::new();
        while let Some(ev) = self.next_completion().await {
            applied.push(ev);
        }
        for res in join_all(self.releases.drain(..)).await {
            if let Err(err) = res {
                warn!(?err, "release task panicked");
            }
        }
        applied
    }

    fn apply(&mut self, completion: Completion) -> DispatchEvent {
        let Completion { photo, outcome } = completion;
        let id = photo.id;
        self.uploading.remove(&id);
        let event = match outcome {
            UploadOutcome::Success => {
                info!(photo = %id, "upload confirmed");
                DispatchEvent::Uploaded(id)
            }
            UploadOutcome::Failure(reason) => {
                warn!(photo = %id, %reason, "upload failed; restoring photo");
                match self.queue.restore(photo, true) {
                    Ok(()) => DispatchEvent::Restored { photo: id, reason },
                    Err(rejected) => {
                        self.release_unreferenced(rejected);
                        DispatchEvent::RestoreSkipped(id)
                    }
                }
            }
        };
        self.record(event)
    }

    /// Release a photo that left for good, unless a queued photo shares its bytes.
    fn release_unreferenced(&mut self, photo: Photo) {
        if self.queue.references(&photo.source_uri) {
            debug!(photo = %photo.id, uri = %photo.source_uri, "bytes still queued; not releasing");
            return;
        }
        self.spawn_release(photo.source_uri);
    }

    fn current_viewport(&self) -> Viewport {
        *self.viewport.borrow()
    }

    fn transition(&mut self, next: DispatchState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "dispatch state");
            self.state = next;
        }
    }

    fn record(&mut self, event: DispatchEvent) -> DispatchEvent {
        self.events.push(event.clone());
        event
    }
}

async fn upload_photo(
    uploader: &dyn Uploader,
    blobs: &dyn BlobStore,
    namespace: &str,
    photo: &Photo,
) -> Result<(), UploadError> {
    let bytes = blobs.read(&photo.source_uri).await?;
    let file_name = photo.upload_name();
    let request = UploadRequest {
        namespace: namespace.to_string(),
        content_type: content_type_for(&file_name),
        file_name,
        bytes,
    };
    uploader.upload(request).await
}
