//! Local media library import
//!
//! Handles:
//! - Recursive folder scanning for audio and video files
//! - Tag reading with path-derived fallbacks
//! - Sequential track id assignment
//! - Embedded cover art extraction and caching

mod cover;
mod metadata;
mod scanner;

#[cfg(test)]
pub(crate) use cover::tests as cover_test_support;
pub use cover::{CoverCache, default_cache_dir};
pub use metadata::{TagMetadata, path_metadata, read_tags};
pub use scanner::{ScanConfig, discover_media_files, scan_library, scan_library_blocking};

use std::path::Path;

/// Supported audio file extensions
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "ogg", "flac", "aac", "wma"];

/// Supported video file extensions
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mkv", "avi", "mov", "m4v"];

fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Check if a file extension is a supported audio format
pub fn is_audio_file(path: &Path) -> bool {
    lowercase_extension(path)
        .map(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Check if a file extension is a supported video format
pub fn is_video_file(path: &Path) -> bool {
    lowercase_extension(path)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

pub fn is_media_file(path: &Path) -> bool {
    is_audio_file(path) || is_video_file(path)
}
