//! Queue management handlers

use anyhow::{Result, anyhow};

use crate::app::command::Command;
use crate::app::App;

impl App {
    /// Handle queue-related commands
    pub(super) fn handle_queue(&mut self, command: &Command) -> Option<Result<()>> {
        let result = match command {
            Command::Queue(id) => match self.library.get(*id) {
                Some(track) => {
                    println!("Queued {}", track);
                    self.player.add_to_queue(track.clone());
                    Ok(())
                }
                None => Err(anyhow!("No track with id {}", id)),
            },

            Command::Album { artist, album } => {
                let tracks = self.library.album(artist, album);
                if tracks.is_empty() {
                    Err(anyhow!("No album \"{}\" by {}", album, artist))
                } else {
                    println!("Queued {} tracks", tracks.len());
                    self.player.add_album_to_queue(tracks);
                    Ok(())
                }
            }

            Command::Remove(id) => {
                self.player.remove_from_queue(*id);
                Ok(())
            }

            Command::Move { from, to } => {
                self.player.move_in_queue(*from, *to);
                Ok(())
            }

            Command::Clear => {
                self.player.clear_queue();
                Ok(())
            }

            Command::Jump(index) => {
                self.player.play_from_queue(*index);
                Ok(())
            }

            _ => return None,
        };
        Some(result)
    }
}
