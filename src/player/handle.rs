//! Player handle for non-blocking control from the front-end
//!
//! `PlayerHandle` sends commands to the player thread and returns at once.
//! Outcomes arrive as `PlayerEvent`s; state is read from `SharedPlayerState`.

use crate::audio::{EQ_BANDS, FileRef};

use super::state::{PlayerSnapshot, SharedPlayerState};
use super::track::{Track, TrackId};

/// Commands processed in order by the player thread
pub enum PlayerCommand {
    SelectLibrary(Vec<Track>),
    RegisterSource { id: TrackId, file: FileRef },
    PlayTrack(Track),
    AddToQueue(Track),
    AddAlbumToQueue(Vec<Track>),
    RemoveFromQueue(TrackId),
    ReorderQueue(Vec<TrackId>),
    MoveInQueue { from: usize, to: usize },
    ClearQueue,
    PlayFromQueue(usize),
    TogglePlay,
    Play,
    Pause,
    Seek(f64),
    Next,
    Previous,
    LoadPlaylist(Vec<Track>),
    SetVolume(f32),
    SetEqBand { band: usize, gain_db: f32 },
    SetEqGains([f32; EQ_BANDS]),
    SetNormalization(bool),
    SetCrossfade { enabled: bool, duration_secs: f64 },
    SetTrackCrossfade { id: TrackId, enabled: bool },
    Shutdown,
}

impl std::fmt::Debug for PlayerCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SelectLibrary(tracks) => write!(f, "SelectLibrary({} tracks)", tracks.len()),
            Self::RegisterSource { id, file } => f
                .debug_struct("RegisterSource")
                .field("id", id)
                .field("file", &file.display_name())
                .finish(),
            Self::PlayTrack(track) => f.debug_tuple("PlayTrack").field(&track.id).finish(),
            Self::AddToQueue(track) => f.debug_tuple("AddToQueue").field(&track.id).finish(),
            Self::AddAlbumToQueue(tracks) => write!(f, "AddAlbumToQueue({} tracks)", tracks.len()),
            Self::RemoveFromQueue(id) => f.debug_tuple("RemoveFromQueue").field(id).finish(),
            Self::ReorderQueue(order) => f.debug_tuple("ReorderQueue").field(order).finish(),
            Self::MoveInQueue { from, to } => f
                .debug_struct("MoveInQueue")
                .field("from", from)
                .field("to", to)
                .finish(),
            Self::ClearQueue => write!(f, "ClearQueue"),
            Self::PlayFromQueue(index) => f.debug_tuple("PlayFromQueue").field(index).finish(),
            Self::TogglePlay => write!(f, "TogglePlay"),
            Self::Play => write!(f, "Play"),
            Self::Pause => write!(f, "Pause"),
            Self::Seek(secs) => f.debug_tuple("Seek").field(secs).finish(),
            Self::Next => write!(f, "Next"),
            Self::Previous => write!(f, "Previous"),
            Self::LoadPlaylist(tracks) => write!(f, "LoadPlaylist({} tracks)", tracks.len()),
            Self::SetVolume(volume) => f.debug_tuple("SetVolume").field(volume).finish(),
            Self::SetEqBand { band, gain_db } => f
                .debug_struct("SetEqBand")
                .field("band", band)
                .field("gain_db", gain_db)
                .finish(),
            Self::SetEqGains(gains) => f.debug_tuple("SetEqGains").field(gains).finish(),
            Self::SetNormalization(enabled) => {
                f.debug_tuple("SetNormalization").field(enabled).finish()
            }
            Self::SetCrossfade {
                enabled,
                duration_secs,
            } => f
                .debug_struct("SetCrossfade")
                .field("enabled", enabled)
                .field("duration_secs", duration_secs)
                .finish(),
            Self::SetTrackCrossfade { id, enabled } => f
                .debug_struct("SetTrackCrossfade")
                .field("id", id)
                .field("enabled", enabled)
                .finish(),
            Self::Shutdown => write!(f, "Shutdown"),
        }
    }
}

pub type PlayerCommandSender = tokio::sync::mpsc::UnboundedSender<PlayerCommand>;
pub type PlayerCommandReceiver = tokio::sync::mpsc::UnboundedReceiver<PlayerCommand>;

pub fn player_command_channel() -> (PlayerCommandSender, PlayerCommandReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Handle for controlling the player from the front-end
#[derive(Clone)]
pub struct PlayerHandle {
    command_tx: PlayerCommandSender,
    state: SharedPlayerState,
}

impl std::fmt::Debug for PlayerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerHandle")
            .field("state", &self.state)
            .finish()
    }
}

impl PlayerHandle {
    pub fn new(command_tx: PlayerCommandSender, state: SharedPlayerState) -> Self {
        Self { command_tx, state }
    }

    fn send(&self, command: PlayerCommand) {
        if self.command_tx.send(command).is_err() {
            tracing::warn!("Player thread is gone, command dropped");
        }
    }

    // ============ Library & Queue ============

    pub fn select_library(&self, tracks: Vec<Track>) {
        self.send(PlayerCommand::SelectLibrary(tracks));
    }

    pub fn register_source(&self, id: TrackId, file: FileRef) {
        self.send(PlayerCommand::RegisterSource { id, file });
    }

    pub fn play_track(&self, track: Track) {
        self.send(PlayerCommand::PlayTrack(track));
    }

    pub fn add_to_queue(&self, track: Track) {
        self.send(PlayerCommand::AddToQueue(track));
    }

    pub fn add_album_to_queue(&self, tracks: Vec<Track>) {
        self.send(PlayerCommand::AddAlbumToQueue(tracks));
    }

    pub fn remove_from_queue(&self, id: TrackId) {
        self.send(PlayerCommand::RemoveFromQueue(id));
    }

    pub fn reorder_queue(&self, order: Vec<TrackId>) {
        self.send(PlayerCommand::ReorderQueue(order));
    }

    pub fn move_in_queue(&self, from: usize, to: usize) {
        self.send(PlayerCommand::MoveInQueue { from, to });
    }

    pub fn clear_queue(&self) {
        self.send(PlayerCommand::ClearQueue);
    }

    pub fn play_from_queue(&self, index: usize) {
        self.send(PlayerCommand::PlayFromQueue(index));
    }

    pub fn load_playlist(&self, tracks: Vec<Track>) {
        self.send(PlayerCommand::LoadPlaylist(tracks));
    }

    // ============ Transport ============

    pub fn toggle_play(&self) {
        self.send(PlayerCommand::TogglePlay);
    }

    pub fn play(&self) {
        self.send(PlayerCommand::Play);
    }

    pub fn pause(&self) {
        self.send(PlayerCommand::Pause);
    }

    pub fn seek(&self, secs: f64) {
        self.send(PlayerCommand::Seek(secs));
    }

    pub fn next(&self) {
        self.send(PlayerCommand::Next);
    }

    pub fn previous(&self) {
        self.send(PlayerCommand::Previous);
    }

    // ============ Parameters ============

    /// Volume in 0-100
    pub fn set_volume(&self, volume: f32) {
        self.send(PlayerCommand::SetVolume(volume));
    }

    pub fn set_eq_band(&self, band: usize, gain_db: f32) {
        self.send(PlayerCommand::SetEqBand { band, gain_db });
    }

    pub fn set_eq_gains(&self, gains: [f32; EQ_BANDS]) {
        self.send(PlayerCommand::SetEqGains(gains));
    }

    pub fn set_normalization(&self, enabled: bool) {
        self.send(PlayerCommand::SetNormalization(enabled));
    }

    pub fn set_crossfade(&self, enabled: bool, duration_secs: f64) {
        self.send(PlayerCommand::SetCrossfade {
            enabled,
            duration_secs,
        });
    }

    pub fn set_track_crossfade(&self, id: TrackId, enabled: bool) {
        self.send(PlayerCommand::SetTrackCrossfade { id, enabled });
    }

    /// Ask the player thread to dispose the engine and exit
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(PlayerCommand::Shutdown);
    }

    // ============ State ============

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.state.snapshot()
    }

    pub fn state(&self) -> &SharedPlayerState {
        &self.state
    }
}
