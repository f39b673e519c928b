//! Playlist handlers

use anyhow::{Result, anyhow};

use crate::app::command::Command;
use crate::app::App;

impl App {
    /// Handle playlist-related commands
    pub(super) fn handle_playlist(&mut self, command: &Command) -> Option<Result<()>> {
        let result = match command {
            Command::PlaylistSave(name) => {
                let paths = self
                    .player
                    .snapshot()
                    .queue
                    .into_iter()
                    .map(|t| t.path)
                    .collect::<Vec<_>>();
                println!("Saved \"{}\" ({} tracks)", name, paths.len());
                self.playlists.save_as(name, paths);
                self.persist_playlists();
                Ok(())
            }

            Command::PlaylistLoad(name) => match self.playlists.find_by_name(name) {
                Some(playlist) => {
                    let tracks = self.library.resolve_paths(&playlist.tracks);
                    if tracks.is_empty() {
                        Err(anyhow!("None of \"{}\" is in the library", playlist.name))
                    } else {
                        if tracks.len() < playlist.tracks.len() {
                            tracing::warn!(
                                "{} tracks of \"{}\" are missing from the library",
                                playlist.tracks.len() - tracks.len(),
                                playlist.name
                            );
                        }
                        self.player.load_playlist(tracks);
                        Ok(())
                    }
                }
                None => Err(anyhow!("No playlist named \"{}\"", name)),
            },

            Command::PlaylistDelete(name) => match self.playlists.find_by_name(name).map(|p| p.id) {
                Some(id) => {
                    self.playlists.delete(id);
                    self.persist_playlists();
                    Ok(())
                }
                None => Err(anyhow!("No playlist named \"{}\"", name)),
            },

            Command::Playlists => {
                for playlist in self.playlists.list() {
                    println!("{} ({} tracks)", playlist.name, playlist.tracks.len());
                }
                Ok(())
            }

            _ => return None,
        };
        Some(result)
    }
}
