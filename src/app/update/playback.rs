//! Playback control handlers

use std::path::Path;

use anyhow::{Result, anyhow};

use crate::app::command::Command;
use crate::app::App;
use crate::player::PlayerSnapshot;

fn format_time(secs: f64) -> String {
    let secs = secs.max(0.0) as u64;
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn format_status(snapshot: &PlayerSnapshot, cover: Option<&Path>) -> String {
    let mut lines = Vec::new();
    match &snapshot.current_track {
        Some(track) => lines.push(format!(
            "[{}] {}  {} / {}",
            snapshot.status,
            track,
            format_time(snapshot.position),
            snapshot.duration.map(format_time).unwrap_or_else(|| "--:--".into())
        )),
        None => lines.push(format!("[{}] nothing loaded", snapshot.status)),
    }
    if let Some(cover) = cover {
        lines.push(format!("cover {}", cover.display()));
    }
    if let Some(engine) = &snapshot.engine {
        lines.push(format!(
            "volume {:.0}%  eq {:?}  normalization {}  crossfade {} ({:.1}s)",
            engine.volume * 100.0,
            engine.eq_gains_db,
            if engine.normalization_enabled { "on" } else { "off" },
            if engine.crossfade_enabled { "on" } else { "off" },
            engine.crossfade_duration_secs
        ));
    }
    for (i, track) in snapshot.queue.iter().enumerate() {
        let marker = if snapshot.current_index == Some(i) { ">" } else { " " };
        lines.push(format!("{} {:>3}. [{}] {}", marker, i + 1, track.id, track));
    }
    lines.join("\n")
}

impl App {
    /// Print the player state, with the current track's cover art if it has any
    pub(super) async fn show_status(&self) {
        let snapshot = self.player.snapshot();
        let cover = match &snapshot.current_track {
            Some(track) => self.covers.cover_for(track).await,
            None => None,
        };
        println!("{}", format_status(&snapshot, cover.as_deref()));
    }

    /// Handle playback-related commands
    pub(super) fn handle_playback(&mut self, command: &Command) -> Option<Result<()>> {
        match command {
            Command::Play(id) => Some(match self.library.get(*id) {
                Some(track) => {
                    self.player.play_track(track.clone());
                    Ok(())
                }
                None => Err(anyhow!("No track with id {}", id)),
            }),

            Command::Toggle => {
                self.player.toggle_play();
                Some(Ok(()))
            }

            Command::Next => {
                self.player.next();
                Some(Ok(()))
            }

            Command::Previous => {
                self.player.previous();
                Some(Ok(()))
            }

            Command::Seek(secs) => {
                self.player.seek(*secs);
                Some(Ok(()))
            }

            _ => None,
        }
    }
}
