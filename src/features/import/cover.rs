//! Cover art caching
//!
//! Extracts the embedded front cover from a media file and keeps it on disk
//! under its content hash, so albums sharing one image store it once. Lookups
//! are remembered per file and per album, misses included, and concurrent
//! requests for the same file share a single extraction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use lofty::file::TaggedFileExt;
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use parking_lot::Mutex;
use tokio::sync::OnceCell;
use xxhash_rust::xxh3::xxh3_64;

use super::metadata::UNKNOWN_ALBUM;
use crate::player::Track;

/// Extension used when the tag does not say what the image is
const FALLBACK_EXTENSION: &str = "jpg";

/// Image bytes pulled out of a tag
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedCover {
    pub data: Vec<u8>,
    pub mime: Option<MimeType>,
}

type Lookup = Arc<OnceCell<Option<PathBuf>>>;

/// Cover cache manager
#[derive(Debug)]
pub struct CoverCache {
    cache_dir: PathBuf,
    /// File path or album key -> cached image, `None` once known to have none
    lookups: Mutex<HashMap<String, Lookup>>,
}

impl CoverCache {
    /// Cache rooted at `cache_dir`; the directory is created on first save
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            lookups: Mutex::new(HashMap::new()),
        }
    }

    /// Generate a hash for cover art data
    pub fn hash_cover(data: &[u8]) -> String {
        format!("{:016x}", xxh3_64(data))
    }

    /// Result of an earlier lookup for `key`
    ///
    /// `None` means not looked up yet (or still running), `Some(None)` means
    /// the lookup found no cover.
    pub fn cached(&self, key: &str) -> Option<Option<PathBuf>> {
        self.lookups.lock().get(key).and_then(|cell| cell.get().cloned())
    }

    /// Cover image for `track`, extracting and caching it on first use
    pub async fn cover_for(&self, track: &Track) -> Option<PathBuf> {
        let album = album_key(track);
        if let Some(Some(path)) = album.as_deref().and_then(|key| self.cached(key)) {
            return Some(path);
        }

        let source = track.path.clone();
        let found = self
            .resolve_with(&track.path.to_string_lossy(), move || extract_front_cover(&source))
            .await;

        // Later tracks from the same album reuse this image
        if let (Some(album), Some(path)) = (album, &found) {
            self.lookups
                .lock()
                .entry(album)
                .or_insert_with(|| Arc::new(OnceCell::from(Some(path.clone()))));
        }
        found
    }

    /// Run `extract` for `key` at most once; concurrent callers wait for the same result
    pub(crate) async fn resolve_with<F>(&self, key: &str, extract: F) -> Option<PathBuf>
    where
        F: FnOnce() -> Result<Option<EmbeddedCover>> + Send + 'static,
    {
        let cell = self.lookups.lock().entry(key.to_string()).or_default().clone();
        let cache_dir = self.cache_dir.clone();

        cell.get_or_init(|| async move {
            let saved = tokio::task::spawn_blocking(move || {
                extract()?
                    .map(|cover| save_cover_in(&cache_dir, &cover))
                    .transpose()
            })
            .await;
            match saved {
                Ok(Ok(path)) => path,
                Ok(Err(e)) => {
                    tracing::debug!("No cover for {}: {:#}", key, e);
                    None
                }
                Err(e) => {
                    tracing::warn!("Cover extraction for {} panicked: {}", key, e);
                    None
                }
            }
        })
        .await
        .clone()
    }

    /// Forget every lookup; images already on disk stay
    pub fn clear(&self) {
        self.lookups.lock().clear();
    }
}

/// Write `cover` under its hash, reusing an existing copy
fn save_cover_in(cache_dir: &Path, cover: &EmbeddedCover) -> Result<PathBuf> {
    let ext = cover
        .mime
        .as_ref()
        .and_then(MimeType::ext)
        .unwrap_or(FALLBACK_EXTENSION);
    let path = cache_dir.join(format!("{}.{}", CoverCache::hash_cover(&cover.data), ext));

    // Skip if already cached
    if path.exists() {
        return Ok(path);
    }
    std::fs::create_dir_all(cache_dir).context("Failed to create cover cache directory")?;
    std::fs::write(&path, &cover.data).context("Failed to write cover to cache")?;
    tracing::debug!("Cached cover {}", path.display());
    Ok(path)
}

/// Key shared by every track of one album; untagged albums get none
fn album_key(track: &Track) -> Option<String> {
    (track.album != UNKNOWN_ALBUM).then(|| format!("{}/{}", track.artist, track.album))
}

/// The front cover if tagged as such, else the first picture
fn pick_front_cover(pictures: &[Picture]) -> Option<&Picture> {
    pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())
}

/// Embedded cover art of the file at `path`
pub fn extract_front_cover(path: &Path) -> Result<Option<EmbeddedCover>> {
    let tagged_file = Probe::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .read()
        .with_context(|| format!("Failed to read tags of {}", path.display()))?;

    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
        return Ok(None);
    };
    Ok(pick_front_cover(tag.pictures()).map(|picture| EmbeddedCover {
        data: picture.data().to_vec(),
        mime: picture.mime_type().cloned(),
    }))
}

/// Get the default cover cache directory
pub fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "jim", "JimPlayer")
        .map(|dirs| dirs.cache_dir().join("covers"))
        .unwrap_or_else(|| PathBuf::from(".cache/covers"))
}
