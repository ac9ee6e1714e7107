//! # mixdeck-types
//!
//! Shared type definitions for the mixdeck mixer.
//! This crate holds the data model used by mixdeck-audio and mixdeck-core:
//! tracks, transport, effect configuration, MIDI mappings, device info,
//! the action enums, and the pure `reduce` module that applies them.

pub mod action;
pub mod reduce;
pub mod state;

pub use action::*;
pub use state::*;

/// Unique identifier for a track. Assigned once at creation and never reused
/// within a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct TrackId(u64);

impl TrackId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
