//! Feature modules - collaborators around the player core
//!
//! Library scanning, settings and playlists. The player never reads these
//! directly; the front-end loads them and feeds plain values in.

pub mod import;
pub mod library;
pub mod playlists;
pub mod settings;

pub use library::Library;
pub use playlists::{Playlist, PlaylistStore};
pub use settings::{EqualizerPreset, Settings, SettingsError};
