use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Locally unique photo identifier, assigned by the capture flow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PhotoId(pub u64);

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One captured photo that has not left the device yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Photo {
    pub id: PhotoId,
    pub source_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<DateTime<Utc>>,
}

impl Photo {
    pub fn new(id: u64, source_uri: impl Into<String>) -> Self {
        Self {
            id: PhotoId(id),
            source_uri: source_uri.into(),
            captured_at: None,
        }
    }

    /// Destination file name for the upload. Stable per photo so a retried
    /// upload overwrites instead of duplicating.
    pub fn upload_name(&self) -> String {
        let ext = Path::new(self.source_uri.trim_start_matches("file://"))
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| "jpg".to_string());
        format!("{}.{}", self.id, ext)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Extent of the viewport along `axis`.
    pub fn extent(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Vertical => self.height,
            Axis::Horizontal => self.width,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(390.0, 844.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Vertical,
    Horizontal,
}

impl Axis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Axis::Vertical => "vertical",
            Axis::Horizontal => "horizontal",
        }
    }
}

/// Stack navigation. A left swipe advances, a right swipe retreats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Navigation {
    Advance,
    Retreat,
}

impl Navigation {
    pub fn step(&self) -> isize {
        match self {
            Navigation::Advance => 1,
            Navigation::Retreat => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SwipeAction {
    Keep,
    Discard,
    Navigate(Navigation),
}

impl SwipeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeAction::Keep => "keep",
            SwipeAction::Discard => "discard",
            SwipeAction::Navigate(Navigation::Advance) => "advance",
            SwipeAction::Navigate(Navigation::Retreat) => "retreat",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadOutcome {
    Success,
    Failure(String),
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadOutcome::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_name_uses_source_extension() {
        assert_eq!(Photo::new(7, "/tmp/cap/7.PNG").upload_name(), "7.png");
        assert_eq!(Photo::new(8, "file:///tmp/cap/a.heic").upload_name(), "8.heic");
        assert_eq!(Photo::new(9, "blob:abc").upload_name(), "9.jpg");
    }

    #[test]
    fn photo_json_shape() {
        let p: Photo = serde_json::from_str(r#"{"id":3,"source_uri":"/x/3.jpg"}"#).unwrap();
        assert_eq!(p, Photo::new(3, "/x/3.jpg"));
        let back = serde_json::to_string(&p).unwrap();
        assert!(!back.contains("captured_at"));
    }
}
