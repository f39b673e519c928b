//! Named playlists
//!
//! Ordered lists of track paths, persisted as one JSON file next to the
//! settings. Paths rather than ids are stored since ids are reassigned on
//! every library scan.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::settings::{SettingsError, config_dir};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: u64,
    pub name: String,
    /// Creation time, ms since the Unix epoch
    pub created: u64,
    pub tracks: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistStore {
    playlists: Vec<Playlist>,
    path: Option<PathBuf>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl PlaylistStore {
    pub fn file_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("playlists.json"))
    }

    /// Load from the default location; an unreadable file yields an empty store
    pub fn load() -> Self {
        let Some(path) = Self::file_path() else {
            return Self::default();
        };
        Self::load_from_file(&path).unwrap_or_else(|e| {
            tracing::debug!("No playlists loaded: {}", e);
            Self {
                playlists: Vec::new(),
                path: Some(path),
            }
        })
    }

    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| SettingsError::Io(e.to_string()))?;
        let playlists: Vec<Playlist> =
            serde_json::from_str(&content).map_err(|e| SettingsError::Parse(e.to_string()))?;
        Ok(Self {
            playlists,
            path: Some(path.to_path_buf()),
        })
    }

    /// Write back to the file this store was loaded from
    pub fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Err(SettingsError::Io(
                "Could not determine config directory".to_string(),
            ));
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Io(e.to_string()))?;
        }
        let content = serde_json::to_string_pretty(&self.playlists)
            .map_err(|e| SettingsError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| SettingsError::Io(e.to_string()))
    }

    /// Playlists sorted by name
    pub fn list(&self) -> Vec<&Playlist> {
        let mut list: Vec<&Playlist> = self.playlists.iter().collect();
        list.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        list
    }

    pub fn get(&self, id: u64) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Playlist> {
        self.playlists
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn create(&mut self, name: &str) -> u64 {
        let id = self.playlists.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        self.playlists.push(Playlist {
            id,
            name: name.to_string(),
            created: now_ms(),
            tracks: Vec::new(),
        });
        id
    }

    pub fn rename(&mut self, id: u64, name: &str) -> bool {
        match self.playlists.iter_mut().find(|p| p.id == id) {
            Some(playlist) => {
                playlist.name = name.to_string();
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.playlists.len();
        self.playlists.retain(|p| p.id != id);
        self.playlists.len() != before
    }

    /// Replace a playlist's contents
    pub fn set_tracks(&mut self, id: u64, tracks: Vec<PathBuf>) -> bool {
        match self.playlists.iter_mut().find(|p| p.id == id) {
            Some(playlist) => {
                playlist.tracks = tracks;
                true
            }
            None => false,
        }
    }

    pub fn add_tracks(&mut self, id: u64, tracks: impl IntoIterator<Item = PathBuf>) -> bool {
        match self.playlists.iter_mut().find(|p| p.id == id) {
            Some(playlist) => {
                playlist.tracks.extend(tracks);
                true
            }
            None => false,
        }
    }

    /// Create or overwrite the playlist called `name`
    pub fn save_as(&mut self, name: &str, tracks: Vec<PathBuf>) -> u64 {
        let id = match self.find_by_name(name) {
            Some(existing) => existing.id,
            None => self.create(name),
        };
        self.set_tracks(id, tracks);
        id
    }
}
