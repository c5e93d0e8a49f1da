//! Pointer gesture classification for the review stack.
//!
//! The interpreter only deals in transient offsets. It never sees the queue;
//! it turns pointer movement into an axis-locked drag and, on release, into a
//! [`GestureEvent`] that the dispatcher acts on.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Axis, Navigation, SwipeAction, Vec2, Viewport};

/// Threshold set used for both visual feedback and commit decisions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GestureThresholds {
    /// Share of the viewport height a vertical drag must cover to commit.
    #[serde(default = "default_commit_fraction")]
    pub commit_fraction: f32,
    /// Share of the viewport at which the card starts showing its affordance.
    #[serde(default = "default_activation_fraction")]
    pub activation_fraction: f32,
    /// Vertical fling speed (units/sec) that commits regardless of distance.
    #[serde(default = "default_velocity")]
    pub velocity: f32,
    /// Absolute horizontal distance needed to navigate.
    #[serde(default = "default_navigate_distance")]
    pub navigate_distance: f32,
}

fn default_commit_fraction() -> f32 {
    0.25
}

fn default_activation_fraction() -> f32 {
    0.15
}

fn default_velocity() -> f32 {
    400.0
}

fn default_navigate_distance() -> f32 {
    100.0
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            commit_fraction: default_commit_fraction(),
            activation_fraction: default_activation_fraction(),
            velocity: default_velocity(),
            navigate_distance: default_navigate_distance(),
        }
    }
}

/// Outcome of a released gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    Cancelled,
    CommittedKeep,
    CommittedDiscard,
    CommittedNavigate(Navigation),
}

impl GestureEvent {
    pub fn action(&self) -> Option<SwipeAction> {
        match self {
            GestureEvent::Cancelled => None,
            GestureEvent::CommittedKeep => Some(SwipeAction::Keep),
            GestureEvent::CommittedDiscard => Some(SwipeAction::Discard),
            GestureEvent::CommittedNavigate(nav) => Some(SwipeAction::Navigate(*nav)),
        }
    }
}

/// Per-frame drag values for whoever renders the card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragFeedback {
    pub axis: Option<Axis>,
    /// Signed offset along the locked axis. Zero while unlocked.
    pub position: f32,
    /// `|position|` relative to the viewport extent on the locked axis.
    pub fraction: f32,
    pub activated: bool,
    /// Releasing now would commit (ignoring velocity).
    pub armed: bool,
    /// Cosmetic tilt derived from the horizontal offset.
    pub rotation_deg: f32,
}

impl DragFeedback {
    fn idle() -> Self {
        Self {
            axis: None,
            position: 0.0,
            fraction: 0.0,
            activated: false,
            armed: false,
            rotation_deg: 0.0,
        }
    }
}

/// Transient state of the gesture in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GestureState {
    pub offset: Vec2,
    pub axis: Option<Axis>,
    pub in_progress: bool,
}

const MAX_TILT_DEG: f32 = 15.0;

#[derive(Debug, Clone, Default)]
pub struct GestureInterpreter {
    thresholds: GestureThresholds,
    state: GestureState,
}

impl GestureInterpreter {
    pub fn new(thresholds: GestureThresholds) -> Self {
        Self {
            thresholds,
            state: GestureState::default(),
        }
    }

    pub fn thresholds(&self) -> &GestureThresholds {
        &self.thresholds
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn axis(&self) -> Option<Axis> {
        self.state.axis
    }

    /// Begin a gesture from the first small movement and lock its axis.
    pub fn drag_start(&mut self, delta: Vec2) -> Option<Axis> {
        self.state = GestureState {
            offset: Vec2::ZERO,
            axis: None,
            in_progress: true,
        };
        self.lock_axis(delta);
        self.state.axis
    }

    /// Track the cumulative offset since the gesture started.
    pub fn drag_update(&mut self, offset: Vec2, viewport: Viewport) -> DragFeedback {
        if !self.state.in_progress || !offset.is_finite() {
            return DragFeedback::idle();
        }
        if self.state.axis.is_none() {
            self.lock_axis(offset);
        }
        self.state.offset = offset;
        self.feedback(offset, viewport)
    }

    /// Decide whether the released gesture commits. Always resets the state.
    pub fn drag_end(&mut self, offset: Vec2, velocity: Vec2, viewport: Viewport) -> GestureEvent {
        let axis = if self.state.in_progress {
            self.state.axis
        } else {
            None
        };
        self.reset();

        if !offset.is_finite() || !velocity.is_finite() {
            return GestureEvent::Cancelled;
        }
        let event = match axis {
            Some(Axis::Vertical) => self.vertical_commit(offset, velocity, viewport),
            Some(Axis::Horizontal) => self.horizontal_commit(offset),
            None => GestureEvent::Cancelled,
        };
        debug!(?axis, ?offset, ?velocity, ?event, "gesture released");
        event
    }

    /// Abort the gesture without deciding anything.
    pub fn cancel(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.state = GestureState::default();
    }

    fn lock_axis(&mut self, delta: Vec2) {
        if delta.is_finite() {
            self.state.axis = classify(delta);
        }
    }

    fn vertical_commit(&self, offset: Vec2, velocity: Vec2, viewport: Viewport) -> GestureEvent {
        let percentage = fraction_of(offset.y, viewport.height);
        let far_enough = percentage >= self.thresholds.commit_fraction;
        let fast_enough = velocity.y.abs() > self.thresholds.velocity;
        if !far_enough && !fast_enough {
            return GestureEvent::Cancelled;
        }
        // Direction follows the offset; a pure fling falls back to its velocity.
        let sign = if offset.y != 0.0 { offset.y } else { velocity.y };
        if sign < 0.0 {
            GestureEvent::CommittedKeep
        } else if sign > 0.0 {
            GestureEvent::CommittedDiscard
        } else {
            GestureEvent::Cancelled
        }
    }

    fn horizontal_commit(&self, offset: Vec2) -> GestureEvent {
        if offset.x.abs() <= self.thresholds.navigate_distance {
            return GestureEvent::Cancelled;
        }
        if offset.x < 0.0 {
            GestureEvent::CommittedNavigate(Navigation::Advance)
        } else {
            GestureEvent::CommittedNavigate(Navigation::Retreat)
        }
    }

    fn feedback(&self, offset: Vec2, viewport: Viewport) -> DragFeedback {
        let rotation_deg = if viewport.width > 0.0 {
            (offset.x / viewport.width * MAX_TILT_DEG * 2.0).clamp(-MAX_TILT_DEG, MAX_TILT_DEG)
        } else {
            0.0
        };
        let Some(axis) = self.state.axis else {
            return DragFeedback {
                rotation_deg,
                ..DragFeedback::idle()
            };
        };
        let position = match axis {
            Axis::Vertical => offset.y,
            Axis::Horizontal => offset.x,
        };
        let fraction = fraction_of(position, viewport.extent(axis));
        let armed = match axis {
            Axis::Vertical => fraction >= self.thresholds.commit_fraction,
            Axis::Horizontal => position.abs() > self.thresholds.navigate_distance,
        };
        DragFeedback {
            axis: Some(axis),
            position,
            fraction,
            activated: fraction >= self.thresholds.activation_fraction,
            armed,
            rotation_deg,
        }
    }
}

/// Horizontal only when the horizontal component strictly dominates.
fn classify(delta: Vec2) -> Option<Axis> {
    if delta.is_zero() || !delta.is_finite() {
        return None;
    }
    if delta.x.abs() > delta.y.abs() {
        Some(Axis::Horizontal)
    } else {
        Some(Axis::Vertical)
    }
}

fn fraction_of(position: f32, extent: f32) -> f32 {
    if extent > 0.0 && extent.is_finite() {
        position.abs() / extent
    } else {
        0.0
    }
}
