//! Media source adapter
//!
//! Turns an opaque file reference into a playable resource: the bytes are
//! materialized and registered under a fresh `blob:` URI. The registry is
//! the single owner of those URIs, so leak checks are just `live_count()`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::PlayerError;

const URI_SCHEME: &str = "blob:jim-player/";

/// Reference to a track's bytes, as handed over by the library
#[derive(Clone)]
pub enum FileRef {
    /// File capability resolved lazily at load time
    Path(PathBuf),
    /// File object already in memory
    Memory { name: String, bytes: Arc<[u8]> },
}

impl FileRef {
    pub fn memory(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Memory {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Human-readable name for logs and errors
    pub fn display_name(&self) -> String {
        match self {
            Self::Path(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Self::Memory { name, .. } => name.clone(),
        }
    }

    /// File extension, used as a decoder hint
    pub fn extension(&self) -> Option<String> {
        let name = match self {
            Self::Path(path) => return path.extension().map(|e| e.to_string_lossy().to_lowercase()),
            Self::Memory { name, .. } => name,
        };
        name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
    }

    /// Read the underlying bytes
    pub async fn materialize(&self) -> Result<Arc<[u8]>, PlayerError> {
        match self {
            Self::Memory { bytes, .. } => Ok(bytes.clone()),
            Self::Path(path) => tokio::fs::read(path)
                .await
                .map(Arc::from)
                .map_err(|e| PlayerError::Resource {
                    name: self.display_name(),
                    reason: e.to_string(),
                }),
        }
    }
}

impl std::fmt::Debug for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
            Self::Memory { name, bytes } => f
                .debug_struct("Memory")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

/// Revocable handle granting byte access to a loaded file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceUri(u64);

impl ResourceUri {
    pub fn id(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", URI_SCHEME, self.0)
    }
}

/// A materialized resource, ready for a media element
#[derive(Debug, Clone)]
pub struct MediaResource {
    pub uri: ResourceUri,
    pub name: String,
    pub extension: Option<String>,
}

/// Registry of live playable-resource URIs
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    live: Mutex<HashMap<ResourceUri, Arc<[u8]>>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes under a new URI
    pub fn create(&self, file: &FileRef, bytes: Arc<[u8]>) -> MediaResource {
        let uri = ResourceUri(self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.inner.live.lock().insert(uri.clone(), bytes);
        tracing::debug!("Created {} for {}", uri, file.display_name());
        MediaResource {
            uri,
            name: file.display_name(),
            extension: file.extension(),
        }
    }

    /// Bytes behind a live URI
    pub fn resolve(&self, uri: &ResourceUri) -> Option<Arc<[u8]>> {
        self.inner.live.lock().get(uri).cloned()
    }

    /// Release a URI; returns false if it was not live
    pub fn revoke(&self, uri: &ResourceUri) -> bool {
        let removed = self.inner.live.lock().remove(uri).is_some();
        if removed {
            tracing::debug!("Revoked {}", uri);
        } else {
            tracing::warn!("Revoke of unknown resource {}", uri);
        }
        removed
    }

    pub fn is_live(&self, uri: &ResourceUri) -> bool {
        self.inner.live.lock().contains_key(uri)
    }

    pub fn live_count(&self) -> usize {
        self.inner.live.lock().len()
    }
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceRegistry")
            .field("live", &self.live_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_uri_format() {
        let registry = ResourceRegistry::new();
        let file = FileRef::memory("a.mp3", vec![1u8, 2, 3]);
        let resource = registry.create(&file, Arc::from(vec![1u8, 2, 3]));
        assert_eq!(resource.uri.to_string(), "blob:jim-player/1");
        assert_eq!(resource.extension.as_deref(), Some("mp3"));
    }

    #[test]
    fn test_create_resolve_revoke() {
        let registry = ResourceRegistry::new();
        let file = FileRef::memory("a.flac", vec![9u8]);
        let resource = registry.create(&file, Arc::from(vec![9u8]));
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.resolve(&resource.uri).as_deref(), Some(&[9u8][..]));

        assert!(registry.revoke(&resource.uri));
        assert!(!registry.revoke(&resource.uri));
        assert_eq!(registry.live_count(), 0);
        assert!(registry.resolve(&resource.uri).is_none());
    }

    #[tokio::test]
    async fn test_materialize_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"RIFF").unwrap();
        let file_ref = FileRef::Path(file.path().to_path_buf());
        let bytes = file_ref.materialize().await.unwrap();
        assert_eq!(&bytes[..], b"RIFF");
    }

    #[tokio::test]
    async fn test_missing_file_is_resource_error() {
        let file_ref = FileRef::Path(PathBuf::from("/nonexistent/dir/track.mp3"));
        let err = file_ref.materialize().await.unwrap_err();
        assert!(matches!(err, PlayerError::Resource { ref name, .. } if name == "track.mp3"));
    }

    #[test]
    fn test_extension_lowercased() {
        assert_eq!(
            FileRef::Path(PathBuf::from("/music/A/B/Song.FLAC")).extension().as_deref(),
            Some("flac")
        );
        assert_eq!(FileRef::memory("noext", vec![0u8]).extension(), None);
    }
}
