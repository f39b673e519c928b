//! Console front-end
//!
//! Reads commands from stdin, forwards them to the player thread and keeps
//! settings, playlists and the library in step. Player events are printed
//! as they arrive.

pub mod command;
mod update;

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::features::import::{CoverCache, ScanConfig, default_cache_dir};
use crate::features::{Library, PlaylistStore, Settings};
use crate::player::{PlayerEvent, PlayerEventReceiver, PlayerHandle};

pub use command::{Command, CommandError};

/// What the input loop does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    player: PlayerHandle,
    library: Library,
    settings: Settings,
    /// Where settings are written; `None` keeps them in memory only
    settings_path: Option<PathBuf>,
    playlists: PlaylistStore,
    scan_config: ScanConfig,
    covers: CoverCache,
    /// The saved queue is restored once, after the first scan
    queue_restored: bool,
}

impl App {
    /// Create the front-end and push stored settings into the player
    pub fn new(
        player: PlayerHandle,
        settings: Settings,
        settings_path: Option<PathBuf>,
        playlists: PlaylistStore,
    ) -> Self {
        let playback = &settings.playback;
        player.set_volume(f32::from(settings.volume));
        player.set_eq_gains(playback.effective_eq());
        player.set_normalization(playback.volume_normalization);
        // Enabled per track on load; only the window length is global
        player.set_crossfade(false, f64::from(playback.crossfade_seconds));

        Self {
            player,
            library: Library::default(),
            settings,
            settings_path,
            playlists,
            scan_config: ScanConfig::default(),
            covers: CoverCache::new(default_cache_dir()),
            queue_restored: false,
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn persist_settings(&self) {
        let Some(path) = &self.settings_path else {
            return;
        };
        if let Err(e) = self.settings.save_to_file(path) {
            tracing::warn!("Failed to save settings: {}", e);
        }
    }

    fn persist_playlists(&self) {
        if let Err(e) = self.playlists.save() {
            tracing::warn!("Failed to save playlists: {}", e);
        }
    }

    /// Print what the user should see for a player event
    pub fn handle_event(&self, event: &PlayerEvent) {
        match event {
            PlayerEvent::TrackChanged(Some(track)) => println!("Now playing: {}", track),
            PlayerEvent::TrackChanged(None) => println!("Stopped"),
            PlayerEvent::Error { message } => eprintln!("Error: {}", message),
            PlayerEvent::CrossfadeStarted { remaining } => {
                tracing::debug!("Fading out, {:.1}s left", remaining)
            }
            PlayerEvent::StatusChanged(status) => tracing::debug!("Player {}", status),
            _ => {}
        }
    }

    /// Remember the queue and stop the player thread
    pub fn shutdown(&mut self) {
        self.settings.saved_queue = self
            .player
            .snapshot()
            .queue
            .into_iter()
            .map(|t| t.path)
            .collect();
        self.persist_settings();
        self.player.shutdown();
    }

    /// Interactive loop over stdin lines and player events
    pub async fn run(mut self, mut events: PlayerEventReceiver) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("Type `help` for commands");

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if line.trim().is_empty() {
                        continue;
                    }
                    match command::parse(&line) {
                        Ok(command) => match self.update(command).await {
                            Ok(Flow::Quit) => break,
                            Ok(Flow::Continue) => {}
                            Err(e) => eprintln!("{:#}", e),
                        },
                        Err(e) => eprintln!("{}", e),
                    }
                }
                Some(event) = events.recv() => self.handle_event(&event),
            }
        }

        self.shutdown();
        Ok(())
    }
}
