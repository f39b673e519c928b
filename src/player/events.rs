//! Outbound player events
//!
//! Published by the controller for front-ends and persistence. Engine-level
//! events are forwarded here after the controller has acted on them.

use super::state::PlayerStatus;
use super::track::{Track, TrackId};

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    TimeUpdated { seconds: f64 },
    /// A queued track played through to its natural end
    Ended { track_id: TrackId },
    DurationKnown { seconds: f64 },
    TrackChanged(Option<Track>),
    StatusChanged(PlayerStatus),
    QueueChanged {
        queue: Vec<Track>,
        current_index: Option<usize>,
    },
    CrossfadeStarted { remaining: f64 },
    /// A recoverable failure the user should see
    Error { message: String },
}

pub type PlayerEventSender = tokio::sync::mpsc::UnboundedSender<PlayerEvent>;
pub type PlayerEventReceiver = tokio::sync::mpsc::UnboundedReceiver<PlayerEvent>;

pub fn player_event_channel() -> (PlayerEventSender, PlayerEventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}
