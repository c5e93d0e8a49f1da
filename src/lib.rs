//! Swipe-to-triage review stack for photos captured at an event.
//!
//! Guests capture photos, then swipe each card up to keep (upload) or down to
//! discard; horizontal swipes move through the stack.

pub mod blob;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod gesture;
pub mod model;
pub mod queue;
pub mod source;
pub mod trace;
pub mod upload;
