//! Recorded pointer traces, replayed through the dispatcher by the CLI.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::watch;

use crate::dispatcher::{ActionDispatcher, DispatchEvent};
use crate::model::{Vec2, Viewport};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trace {
    #[serde(default)]
    pub viewport: Viewport,
    pub gestures: Vec<RecordedGesture>,
}

/// One pointer-down to pointer-up sequence. Offsets are cumulative from the
/// pointer-down position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecordedGesture {
    /// Viewport after a resize that happened before this gesture.
    #[serde(default)]
    pub viewport: Option<Viewport>,
    pub start: Vec2,
    #[serde(default)]
    pub moves: Vec<Vec2>,
    pub end: Vec2,
    #[serde(default)]
    pub velocity: Vec2,
}

pub fn load_trace(path: &Path) -> Result<Trace> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read trace {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("invalid trace {}", path.display()))
}

/// Feed one recorded gesture through the dispatcher.
pub fn replay(
    dispatcher: &mut ActionDispatcher,
    viewport: &watch::Sender<Viewport>,
    gesture: &RecordedGesture,
) -> DispatchEvent {
    if let Some(vp) = gesture.viewport {
        viewport.send_replace(vp);
    }
    dispatcher.pointer_down();
    dispatcher.drag_start(gesture.start);
    for offset in &gesture.moves {
        dispatcher.drag_update(*offset);
    }
    dispatcher.drag_update(gesture.end);
    dispatcher.drag_end(gesture.end, gesture.velocity)
}
