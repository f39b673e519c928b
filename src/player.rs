//! Playback layer
//!
//! - `PlaybackController`: Queue and transport state machine on top of the engine
//! - `Queue`: Duplicate-free play queue with identity-tracked pointer
//! - `PlayerHandle` / `PlayerService`: Command channel to the player thread
//! - `SharedPlayerState`: Snapshots for front-ends

mod controller;
pub mod events;
mod handle;
mod queue;
mod service;
mod state;
mod track;

pub use controller::{PlaybackController, RESTART_THRESHOLD_SECS};
pub use events::{PlayerEvent, PlayerEventReceiver, PlayerEventSender, player_event_channel};
pub use handle::{
    PlayerCommand, PlayerCommandReceiver, PlayerCommandSender, PlayerHandle, player_command_channel,
};
pub use queue::{Queue, Removal};
pub use service::{PlayerService, TICK_INTERVAL, spawn_player, spawn_player_with};
pub use state::{PlayerSnapshot, PlayerStatus, SharedPlayerState};
pub use track::{Track, TrackId};
