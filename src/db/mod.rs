//! Staging database written by the capture flow and read by the review stack.
//!
//! - `model`: rows returned by repositories.
//! - `repo`: SQL-only functions.
//!
//! The repository API is re-exported at `crate::db::*`.

pub mod model;
pub mod repo;

pub use model::{CaptureSession, StagedPhoto};
pub use repo::*;
