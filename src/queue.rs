//! Ordered queue of pending photos plus the focused card.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::model::{Navigation, Photo, PhotoId};

/// A photo taken out of the queue, with the position it occupied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    pub index: usize,
    pub photo: Photo,
}

/// Invariant after every mutation: `focus == None` iff the queue is empty,
/// otherwise `focus < len`. Ids are unique.
#[derive(Debug, Clone, Default)]
pub struct PhotoQueue {
    photos: Vec<Photo>,
    focus: Option<usize>,
}

impl PhotoQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue wholesale and focus the first photo. Repeated ids
    /// keep their first occurrence; the dropped repeats are returned so the
    /// caller can release them.
    pub fn load(&mut self, photos: Vec<Photo>) -> Vec<Photo> {
        let mut seen = HashSet::with_capacity(photos.len());
        let mut unique = Vec::with_capacity(photos.len());
        let mut dropped = Vec::new();
        for photo in photos {
            if seen.insert(photo.id) {
                unique.push(photo);
            } else {
                warn!(id = %photo.id, uri = %photo.source_uri, "dropping duplicate photo id");
                dropped.push(photo);
            }
        }
        self.photos = unique;
        self.focus = if self.photos.is_empty() { None } else { Some(0) };
        debug!(len = self.photos.len(), dropped = dropped.len(), "queue loaded");
        dropped
    }

    pub fn remove(&mut self, id: PhotoId) -> Option<Removed> {
        let index = self.position(id)?;
        let photo = self.photos.remove(index);
        self.focus = match self.focus {
            _ if self.photos.is_empty() => None,
            Some(focus) if index <= focus => Some(focus.saturating_sub(1)),
            other => other,
        };
        self.clamp_focus();
        Some(Removed { index, photo })
    }

    /// Put a previously removed photo back. When the id is already queued
    /// the photo is handed back untouched.
    pub fn restore(&mut self, photo: Photo, at_front: bool) -> Result<(), Photo> {
        if self.contains(photo.id) {
            warn!(id = %photo.id, "restore skipped: id already queued");
            return Err(photo);
        }
        if at_front {
            self.photos.insert(0, photo);
            self.focus = Some(0);
        } else {
            self.photos.push(photo);
            self.focus = self.focus.or(Some(0));
        }
        Ok(())
    }

    /// Whether any queued photo still points at `uri`.
    pub fn references(&self, uri: &str) -> bool {
        self.photos.iter().any(|p| p.source_uri == uri)
    }

    /// Move focus by one card. Clamped at both ends; returns whether it moved.
    pub fn navigate(&mut self, nav: Navigation) -> bool {
        let Some(focus) = self.focus else {
            return false;
        };
        let last = self.photos.len() - 1;
        let next = match nav {
            Navigation::Advance => (focus + 1).min(last),
            Navigation::Retreat => focus.saturating_sub(1),
        };
        self.focus = Some(next);
        next != focus
    }

    pub fn focused(&self) -> Option<&Photo> {
        self.focus.and_then(|i| self.photos.get(i))
    }

    pub fn focus_index(&self) -> Option<usize> {
        self.focus
    }

    pub fn get(&self, id: PhotoId) -> Option<&Photo> {
        self.photos.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: PhotoId) -> bool {
        self.position(id).is_some()
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn ids(&self) -> Vec<PhotoId> {
        self.photos.iter().map(|p| p.id).collect()
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    fn position(&self, id: PhotoId) -> Option<usize> {
        self.photos.iter().position(|p| p.id == id)
    }

    fn clamp_focus(&mut self) {
        self.focus = match (self.focus, self.photos.len()) {
            (_, 0) => None,
            (Some(f), len) => Some(f.min(len - 1)),
            (None, _) => Some(0),
        };
    }
}
