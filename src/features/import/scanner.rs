//! Recursive folder scanner with parallel tag reading
//!
//! Walks the library root for media files, reads tags in parallel and
//! builds `Track`s with ids assigned in path order.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;
use walkdir::WalkDir;

use super::metadata::{TagMetadata, path_metadata, read_tags};
use super::{is_media_file, is_video_file};
use crate::player::{Track, TrackId};

/// Scanner configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Read embedded tags; off means names come from the path only
    pub read_tags: bool,
    /// Maximum depth to scan (None = unlimited)
    pub max_depth: Option<usize>,
    /// Include video files
    pub include_video: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            read_tags: true,
            max_depth: None,
            include_video: true,
        }
    }
}

/// Find media files under `root`, sorted by path
pub fn discover_media_files(root: &Path, config: &ScanConfig) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root).follow_links(true);
    if let Some(max_depth) = config.max_depth {
        walker = walker.max_depth(max_depth);
    }

    let mut files: Vec<PathBuf> = walker
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| is_media_file(p) && (config.include_video || !is_video_file(p)))
        .collect();
    files.sort();
    files
}

fn build_track(root: &Path, path: &Path, id: TrackId, tags: Option<TagMetadata>) -> Track {
    let (artist, album, title) = path_metadata(root, path);
    let tags = tags.unwrap_or_default();
    Track {
        id,
        path: path.to_path_buf(),
        title: tags.title.unwrap_or(title),
        artist: tags.artist.unwrap_or(artist),
        album: tags.album.unwrap_or(album),
        is_video: is_video_file(path),
        duration: tags.duration_secs,
        crossfade: false,
    }
}

/// Scan `root` and build the library; ids start at 1
pub fn scan_library_blocking(root: &Path, config: &ScanConfig) -> Result<Vec<Track>> {
    let start_time = Instant::now();
    if !root.is_dir() {
        anyhow::bail!("Not a directory: {}", root.display());
    }

    let files = discover_media_files(root, config);

    let tags: Vec<Option<TagMetadata>> = if config.read_tags {
        files
            .par_iter()
            .map(|path| match read_tags(path) {
                Ok(tags) => Some(tags),
                Err(e) => {
                    tracing::debug!("No tags for {:?}: {:#}", path, e);
                    None
                }
            })
            .collect()
    } else {
        vec![None; files.len()]
    };

    let tracks: Vec<Track> = files
        .iter()
        .zip(tags)
        .enumerate()
        .map(|(i, (path, tags))| build_track(root, path, i as TrackId + 1, tags))
        .collect();

    tracing::info!(
        "Scanned {:?}: {} tracks in {:.2}s",
        root,
        tracks.len(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(tracks)
}

/// Scan on the blocking pool
pub async fn scan_library(root: PathBuf, config: ScanConfig) -> Result<Vec<Track>> {
    tokio::task::spawn_blocking(move || scan_library_blocking(&root, &config))
        .await
        .context("Library scan task failed")?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"not really media").unwrap();
    }

    fn library() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Beta Band/Hot Shots/02 Squares.mp3");
        touch(dir.path(), "Beta Band/Hot Shots/01 Life.flac");
        touch(dir.path(), "Beta Band/Hot Shots/cover.jpg");
        touch(dir.path(), "Alpha/live.mkv");
        touch(dir.path(), "single.ogg");
        touch(dir.path(), "notes.txt");
        dir
    }

    fn untagged() -> ScanConfig {
        ScanConfig {
            read_tags: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = library();
        let files = discover_media_files(dir.path(), &ScanConfig::default());
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            names,
            vec![
                "Alpha/live.mkv",
                "Beta Band/Hot Shots/01 Life.flac",
                "Beta Band/Hot Shots/02 Squares.mp3",
                "single.ogg",
            ]
        );
    }

    #[test]
    fn test_scan_builds_tracks_from_paths() {
        let dir = library();
        let tracks = scan_library_blocking(dir.path(), &untagged()).unwrap();
        let ids: Vec<TrackId> = tracks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        let video = &tracks[0];
        assert!(video.is_video);
        assert_eq!(video.artist, "Alpha");
        assert_eq!(video.album, "Unknown Album");

        let life = &tracks[1];
        assert_eq!(life.title, "01 Life");
        assert_eq!(life.artist, "Beta Band");
        assert_eq!(life.album, "Hot Shots");
        assert!(!life.is_video);
        assert_eq!(life.duration, None);

        assert_eq!(tracks[3].artist, "Unknown Artist");
    }

    #[test]
    fn test_unreadable_tags_fall_back_to_path() {
        let dir = library();
        let tracks = scan_library_blocking(dir.path(), &ScanConfig::default()).unwrap();
        assert_eq!(tracks.len(), 4);
        assert_eq!(tracks[2].title, "02 Squares");
    }

    #[test]
    fn test_audio_only_and_depth() {
        let dir = library();
        let config = ScanConfig {
            include_video: false,
            max_depth: Some(1),
            ..untagged()
        };
        let tracks = scan_library_blocking(dir.path(), &config).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "single");
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_library_blocking(&dir.path().join("gone"), &untagged()).is_err());
    }

    #[tokio::test]
    async fn test_async_scan() {
        let dir = library();
        let tracks = scan_library(dir.path().to_path_buf(), untagged()).await.unwrap();
        assert_eq!(tracks.len(), 4);
    }
}
