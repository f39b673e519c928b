//! Read-only player state for collaborators
//!
//! The controller is the only writer. Front-ends read snapshots without
//! going through the command channel.
//!
//! ```text
//! PlaybackController --[publish]--> SharedPlayerState <--[snapshot]-- UI
//! ```

use std::sync::Arc;

use parking_lot::RwLock;

use super::track::Track;
use crate::audio::EngineState;

/// Controller state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerStatus {
    /// No track loaded
    #[default]
    Idle,
    /// A load is in flight
    Loading,
    Paused,
    Playing,
}

impl PlayerStatus {
    pub fn is_playing(self) -> bool {
        self == Self::Playing
    }
}

impl std::fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Paused => "paused",
            Self::Playing => "playing",
        };
        f.write_str(s)
    }
}

/// Everything a front-end needs to render the player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub status: PlayerStatus,
    pub current_track: Option<Track>,
    pub queue: Vec<Track>,
    pub current_index: Option<usize>,
    pub position: f64,
    pub duration: Option<f64>,
    pub engine: Option<EngineState>,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            status: PlayerStatus::Idle,
            current_track: None,
            queue: Vec::new(),
            current_index: None,
            position: 0.0,
            duration: None,
            engine: None,
        }
    }
}

#[derive(Clone, Default)]
pub struct SharedPlayerState {
    inner: Arc<RwLock<PlayerSnapshot>>,
}

impl std::fmt::Debug for SharedPlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("SharedPlayerState")
            .field("status", &inner.status)
            .field("current_index", &inner.current_index)
            .field("position", &inner.position)
            .field("queue_len", &inner.queue.len())
            .finish()
    }
}

impl SharedPlayerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.inner.read().clone()
    }

    pub fn status(&self) -> PlayerStatus {
        self.inner.read().status
    }

    pub fn position(&self) -> f64 {
        self.inner.read().position
    }

    pub(crate) fn publish(&self, snapshot: PlayerSnapshot) {
        *self.inner.write() = snapshot;
    }

    /// Cheap update for the high-frequency position tick
    pub(crate) fn set_position(&self, seconds: f64) {
        self.inner.write().position = seconds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        let state = SharedPlayerState::new();
        assert_eq!(state.status(), PlayerStatus::Idle);
        assert_eq!(state.snapshot().current_index, None);
    }

    #[test]
    fn test_clones_share_writes() {
        let state = SharedPlayerState::new();
        let reader = state.clone();
        state.publish(PlayerSnapshot {
            status: PlayerStatus::Playing,
            ..PlayerSnapshot::default()
        });
        state.set_position(12.5);
        assert_eq!(reader.status(), PlayerStatus::Playing);
        assert_eq!(reader.position(), 12.5);
    }
}
