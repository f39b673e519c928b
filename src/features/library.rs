//! In-memory media library
//!
//! Holds the tracks from the last scan, grouped artist -> album for browsing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::player::{Track, TrackId};

/// artist -> album -> tracks sorted by title
pub type ArtistAlbums = BTreeMap<String, BTreeMap<String, Vec<Track>>>;

#[derive(Debug, Clone, Default)]
pub struct Library {
    root: Option<PathBuf>,
    tracks: Vec<Track>,
}

impl Library {
    pub fn new(root: PathBuf, tracks: Vec<Track>) -> Self {
        Self {
            root: Some(root),
            tracks,
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn find_by_path(&self, path: &Path) -> Option<&Track> {
        self.tracks.iter().find(|t| t.path == path)
    }

    /// Tracks for the given paths, in order; unknown paths are skipped
    pub fn resolve_paths(&self, paths: &[PathBuf]) -> Vec<Track> {
        paths
            .iter()
            .filter_map(|p| self.find_by_path(p).cloned())
            .collect()
    }

    /// Apply stored per-track crossfade flags
    pub fn apply_crossfade(&mut self, enabled: impl Fn(&Path) -> bool) {
        for track in &mut self.tracks {
            track.crossfade = enabled(&track.path);
        }
    }

    pub fn set_crossfade(&mut self, id: TrackId, enabled: bool) -> Option<&Track> {
        let track = self.tracks.iter_mut().find(|t| t.id == id)?;
        track.crossfade = enabled;
        Some(track)
    }

    pub fn organize(&self) -> ArtistAlbums {
        let mut organized = ArtistAlbums::new();
        for track in &self.tracks {
            organized
                .entry(track.artist.clone())
                .or_default()
                .entry(track.album.clone())
                .or_default()
                .push(track.clone());
        }
        for albums in organized.values_mut() {
            for tracks in albums.values_mut() {
                tracks.sort_by(|a, b| a.title.cmp(&b.title));
            }
        }
        organized
    }

    /// Tracks of one album, sorted by title; names match case-insensitively
    pub fn album(&self, artist: &str, album: &str) -> Vec<Track> {
        let mut tracks: Vec<Track> = self
            .tracks
            .iter()
            .filter(|t| t.artist.eq_ignore_ascii_case(artist) && t.album.eq_ignore_ascii_case(album))
            .cloned()
            .collect();
        tracks.sort_by(|a, b| a.title.cmp(&b.title));
        tracks
    }

    /// Case-insensitive substring match on title, artist or album
    pub fn search(&self, query: &str) -> Vec<&Track> {
        let lower = query.to_lowercase();
        self.tracks
            .iter()
            .filter(|t| {
                t.title.to_lowercase().contains(&lower)
                    || t.artist.to_lowercase().contains(&lower)
                    || t.album.to_lowercase().contains(&lower)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: TrackId, artist: &str, album: &str, title: &str) -> Track {
        let mut track = Track::new(id, format!("/m/{}/{}/{}.mp3", artist, album, title), title);
        track.artist = artist.to_string();
        track.album = album.to_string();
        track
    }

    fn library() -> Library {
        Library::new(
            PathBuf::from("/m"),
            vec![
                track(1, "Low", "Things We Lost", "Sunflower"),
                track(2, "Low", "Things We Lost", "Closer"),
                track(3, "Low", "Secret Name", "Weight of Water"),
                track(4, "Slint", "Spiderland", "Breadcrumb Trail"),
            ],
        )
    }

    #[test]
    fn test_organize_groups_and_sorts() {
        let organized = library().organize();
        assert_eq!(organized.len(), 2);
        let lost = &organized["Low"]["Things We Lost"];
        let titles: Vec<&str> = lost.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Closer", "Sunflower"]);
        assert_eq!(organized["Low"].len(), 2);
    }

    #[test]
    fn test_album_lookup() {
        let ids: Vec<TrackId> = library().album("low", "things we lost").iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert!(library().album("Low", "Nope").is_empty());
    }

    #[test]
    fn test_search_any_field() {
        let library = library();
        assert_eq!(library.search("SLINT").len(), 1);
        assert_eq!(library.search("lost").len(), 2);
        assert_eq!(library.search("water")[0].id, 3);
        assert!(library.search("zzz").is_empty());
    }

    #[test]
    fn test_resolve_paths_keeps_order() {
        let library = library();
        let paths = vec![
            PathBuf::from("/m/Slint/Spiderland/Breadcrumb Trail.mp3"),
            PathBuf::from("/m/gone.mp3"),
            PathBuf::from("/m/Low/Things We Lost/Sunflower.mp3"),
        ];
        let ids: Vec<TrackId> = library.resolve_paths(&paths).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![4, 1]);
    }

    #[test]
    fn test_crossfade_flags() {
        let mut library = library();
        library.apply_crossfade(|p| p.ends_with("Closer.mp3"));
        assert!(library.get(2).is_some_and(|t| t.crossfade));
        assert!(library.get(1).is_some_and(|t| !t.crossfade));
        assert!(library.set_crossfade(1, true).is_some());
        assert!(library.set_crossfade(99, true).is_none());
    }
}
