//! Application settings persistence
//!
//! Handles saving and loading user preferences. The player core never reads
//! this file; the front-end pushes values into it at startup and writes them
//! back when the user changes something.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio::{DEFAULT_CROSSFADE_SECS, EQ_BANDS};

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Volume level (0 to 100)
    pub volume: u8,
    /// Playback settings
    pub playback: PlaybackSettings,
    /// Library settings
    pub library: LibrarySettings,
    /// Queue at last exit, as file paths
    pub saved_queue: Vec<PathBuf>,
}

/// Playback-related settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Enable volume normalization (limiter engaged)
    pub volume_normalization: bool,
    /// Equalizer preset
    pub equalizer_preset: EqualizerPreset,
    /// Band gains in dB: [60Hz, 250Hz, 1kHz, 4kHz, 12kHz]
    pub equalizer_values: [f32; EQ_BANDS],
    /// Fade-out window for tracks that opt in
    pub crossfade_seconds: f32,
    /// Tracks with crossfade enabled, by path
    pub crossfade_tracks: BTreeSet<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Last scanned library folder
    pub last_root: Option<PathBuf>,
}

/// Equalizer presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EqualizerPreset {
    /// Flat (no adjustment)
    #[default]
    Flat,
    /// Bass boost
    Bass,
    /// Treble boost
    Treble,
    Rock,
    Pop,
    Jazz,
    Classical,
    /// Custom (user-defined)
    Custom,
}

impl EqualizerPreset {
    /// Get all presets
    pub fn all() -> &'static [EqualizerPreset] {
        &[
            EqualizerPreset::Flat,
            EqualizerPreset::Bass,
            EqualizerPreset::Treble,
            EqualizerPreset::Rock,
            EqualizerPreset::Pop,
            EqualizerPreset::Jazz,
            EqualizerPreset::Classical,
            EqualizerPreset::Custom,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EqualizerPreset::Flat => "Flat",
            EqualizerPreset::Bass => "Bass Boost",
            EqualizerPreset::Treble => "Treble Boost",
            EqualizerPreset::Rock => "Rock",
            EqualizerPreset::Pop => "Pop",
            EqualizerPreset::Jazz => "Jazz",
            EqualizerPreset::Classical => "Classical",
            EqualizerPreset::Custom => "Custom",
        }
    }

    /// Get equalizer values for this preset
    /// Returns [60Hz, 250Hz, 1kHz, 4kHz, 12kHz]
    pub fn values(&self) -> Option<[f32; EQ_BANDS]> {
        let values = match self {
            EqualizerPreset::Flat => [0.0, 0.0, 0.0, 0.0, 0.0],
            EqualizerPreset::Bass => [6.0, 4.0, 0.0, 0.0, 0.0],
            EqualizerPreset::Treble => [0.0, 0.0, 0.0, 4.0, 6.0],
            EqualizerPreset::Rock => [4.0, 2.0, -1.0, 3.0, 4.0],
            EqualizerPreset::Pop => [-1.0, 2.0, 4.0, 2.0, -1.0],
            EqualizerPreset::Jazz => [3.0, 0.0, 2.0, 3.0, 4.0],
            EqualizerPreset::Classical => [0.0, 0.0, 0.0, 2.0, 3.0],
            // Custom uses stored values
            EqualizerPreset::Custom => return None,
        };
        Some(values)
    }

    /// Parse a preset name as typed by the user
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|p| format!("{:?}", p).to_ascii_lowercase() == name)
    }
}

impl std::fmt::Display for EqualizerPreset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            volume: 80,
            playback: PlaybackSettings::default(),
            library: LibrarySettings::default(),
            saved_queue: Vec::new(),
        }
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            volume_normalization: true,
            equalizer_preset: EqualizerPreset::Flat,
            equalizer_values: [0.0; EQ_BANDS],
            crossfade_seconds: DEFAULT_CROSSFADE_SECS as f32,
            crossfade_tracks: BTreeSet::new(),
        }
    }
}

impl PlaybackSettings {
    /// Gains to apply: the preset's, or the stored values for Custom
    pub fn effective_eq(&self) -> [f32; EQ_BANDS] {
        self.equalizer_preset
            .values()
            .unwrap_or(self.equalizer_values)
    }

    pub fn crossfade_enabled(&self, path: &Path) -> bool {
        self.crossfade_tracks.contains(path)
    }

    pub fn set_crossfade(&mut self, path: &Path, enabled: bool) {
        if enabled {
            self.crossfade_tracks.insert(path.to_path_buf());
        } else {
            self.crossfade_tracks.remove(path);
        }
    }
}

/// Config directory shared by settings and playlists
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "jim", "JimPlayer").map(|dirs| dirs.config_dir().to_path_buf())
}

impl Settings {
    /// Get the settings file path
    pub fn file_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from file, or return defaults if not found
    pub fn load() -> Self {
        Self::file_path()
            .and_then(|path| Self::load_from_file(&path).ok())
            .unwrap_or_default()
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Save settings to the default file
    pub fn save(&self) -> Result<(), SettingsError> {
        if let Some(path) = Self::file_path() {
            self.save_to_file(&path)
        } else {
            Err(SettingsError::Io(
                "Could not determine config directory".to_string(),
            ))
        }
    }

    /// Save settings to a specific file
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }

        let content =
            serde_json::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| SettingsError::Io(e.to_string()))?;
        tracing::debug!("Settings saved to {:?}", path);
        Ok(())
    }
}

/// Errors that can occur with settings and playlists
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
