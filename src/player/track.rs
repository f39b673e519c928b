//! Track model

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::audio::MediaKind;

pub type TrackId = u64;

/// A library entry
///
/// Identity is `id`; `duration` is filled in by the first successful load and
/// `crossfade` is the per-track fade-out opt-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub is_video: bool,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub crossfade: bool,
}

impl Track {
    pub fn new(id: TrackId, path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            title: title.into(),
            artist: "Unknown Artist".to_string(),
            album: "Unknown Album".to_string(),
            is_video: false,
            duration: None,
            crossfade: false,
        }
    }

    pub fn media_kind(&self) -> MediaKind {
        MediaKind::from_is_video(self.is_video)
    }
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}
