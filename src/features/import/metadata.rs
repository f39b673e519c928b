//! Tag reading and path-derived metadata
//!
//! Uses lofty for tags. Anything the tags leave out comes from the file's
//! location: `<root>/<artist>/<album>/.../<title>.<ext>`.

use std::path::Path;

use anyhow::{Context, Result};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::Accessor;

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Tag fields found in a media file; missing fields are `None`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_secs: Option<f64>,
}

fn non_empty(value: Option<std::borrow::Cow<'_, str>>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read tags and stream properties from a media file
pub fn read_tags(path: &Path) -> Result<TagMetadata> {
    let tagged_file = Probe::open(path)
        .context("Failed to open media file")?
        .read()
        .context("Failed to read media file")?;

    let duration = tagged_file.properties().duration().as_secs_f64();
    let mut metadata = TagMetadata {
        duration_secs: (duration > 0.0).then_some(duration),
        ..Default::default()
    };

    // Try to get the primary tag, or any available tag
    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        metadata.title = non_empty(tag.title());
        metadata.artist = non_empty(tag.artist());
        metadata.album = non_empty(tag.album());
    }

    Ok(metadata)
}

/// Artist, album and title implied by where the file sits under `root`
pub fn path_metadata(root: &Path, path: &Path) -> (String, String, String) {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut folders = relative
        .parent()
        .into_iter()
        .flat_map(|p| p.components())
        .filter_map(|c| c.as_os_str().to_str())
        .filter(|s| !s.is_empty() && *s != "/");

    let artist = folders
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
    let album = folders
        .next()
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());
    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| "Unknown Title".to_string());

    (artist, album, title)
}
