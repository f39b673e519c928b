//! Player thread
//!
//! Runs the `PlaybackController` on a dedicated thread with its own
//! current-thread runtime. Commands are handled one at a time, so a load
//! always settles before the next command starts. A fixed tick stands in
//! for the media clock's time-update cadence.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;
use tokio::time::MissedTickBehavior;

use crate::audio::{AudioEngine, EngineEventReceiver, EngineEventSender, engine_event_channel};

use super::controller::PlaybackController;
use super::events::{PlayerEvent, PlayerEventReceiver, player_event_channel};
use super::handle::{PlayerCommand, PlayerCommandReceiver, PlayerHandle, player_command_channel};
use super::state::SharedPlayerState;

/// Host cadence for position updates and end-of-media checks
pub const TICK_INTERVAL: Duration = Duration::from_millis(250);

pub struct PlayerService {
    pub handle: PlayerHandle,
    event_rx: Option<PlayerEventReceiver>,
    thread_handle: Option<JoinHandle<()>>,
}

impl PlayerService {
    pub fn take_event_rx(&mut self) -> Option<PlayerEventReceiver> {
        self.event_rx.take()
    }

    /// Shut the thread down and wait for it, giving up after `timeout`
    pub fn join(mut self, timeout: Duration) -> anyhow::Result<()> {
        if let Some(handle) = self.thread_handle.take() {
            self.handle.shutdown();

            let start = std::time::Instant::now();
            loop {
                if handle.is_finished() {
                    let _ = handle.join();
                    return Ok(());
                }
                if start.elapsed() > timeout {
                    anyhow::bail!("Player thread did not exit in time");
                }
                thread::sleep(Duration::from_millis(10));
            }
        }
        Ok(())
    }
}

impl Drop for PlayerService {
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}

/// Spawn the player thread on the default output device
pub fn spawn_player() -> anyhow::Result<PlayerService> {
    spawn_player_with(AudioEngine::open_default)
}

/// Spawn the player thread with a custom engine
///
/// The engine is built inside the thread since output streams are not `Send`
/// on every platform.
pub fn spawn_player_with<F>(make_engine: F) -> anyhow::Result<PlayerService>
where
    F: FnOnce(EngineEventSender) -> anyhow::Result<AudioEngine> + Send + 'static,
{
    let (command_tx, command_rx) = player_command_channel();
    let (event_tx, event_rx) = player_event_channel();
    let state = SharedPlayerState::new();
    let handle = PlayerHandle::new(command_tx, state.clone());

    let thread_handle = thread::Builder::new()
        .name("player-engine".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!("Failed to create player runtime: {}", e);
                    return;
                }
            };

            let (engine_tx, engine_rx) = engine_event_channel();
            match make_engine(engine_tx) {
                Ok(engine) => {
                    let controller = PlaybackController::new(engine, event_tx, state);
                    runtime.block_on(player_main(controller, command_rx, engine_rx));
                }
                Err(e) => {
                    tracing::error!("Failed to create audio engine: {:#}", e);
                    let _ = event_tx.send(PlayerEvent::Error {
                        message: format!("{:#}", e),
                    });
                }
            }
        })
        .context("Failed to spawn player thread")?;

    Ok(PlayerService {
        handle,
        event_rx: Some(event_rx),
        thread_handle: Some(thread_handle),
    })
}

async fn player_main(
    mut controller: PlaybackController,
    mut command_rx: PlayerCommandReceiver,
    mut engine_rx: EngineEventReceiver,
) {
    tracing::info!("Player thread started");

    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            command = command_rx.recv() => match command {
                Some(PlayerCommand::Shutdown) | None => break,
                Some(command) => dispatch(&mut controller, command).await,
            },
            Some(event) = engine_rx.recv() => {
                // Failures were already published as events
                let _ = controller.handle_engine_event(event).await;
            }
            _ = ticker.tick() => controller.tick(),
        }
    }

    controller.dispose();
    tracing::info!("Player thread stopped");
}

async fn dispatch(controller: &mut PlaybackController, command: PlayerCommand) {
    tracing::debug!("Player command: {:?}", command);
    let result = match command {
        PlayerCommand::SelectLibrary(tracks) => {
            controller.select_library(&tracks);
            Ok(())
        }
        PlayerCommand::RegisterSource { id, file } => {
            controller.register_source(id, file);
            Ok(())
        }
        PlayerCommand::PlayTrack(track) => controller.play_track(track).await,
        PlayerCommand::AddToQueue(track) => {
            controller.add_to_queue(track);
            Ok(())
        }
        PlayerCommand::AddAlbumToQueue(tracks) => {
            controller.add_album_to_queue(tracks);
            Ok(())
        }
        PlayerCommand::RemoveFromQueue(id) => controller.remove_from_queue(id).await,
        PlayerCommand::ReorderQueue(order) => {
            controller.reorder_queue(&order);
            Ok(())
        }
        PlayerCommand::MoveInQueue { from, to } => {
            controller.move_in_queue(from, to);
            Ok(())
        }
        PlayerCommand::ClearQueue => {
            controller.clear_queue();
            Ok(())
        }
        PlayerCommand::PlayFromQueue(index) => controller.play_from_queue(index).await,
        PlayerCommand::TogglePlay => controller.toggle_play().await,
        PlayerCommand::Play => {
            controller.play();
            Ok(())
        }
        PlayerCommand::Pause => {
            controller.pause();
            Ok(())
        }
        PlayerCommand::Seek(secs) => {
            controller.seek(secs);
            Ok(())
        }
        PlayerCommand::Next => controller.next().await,
        PlayerCommand::Previous => controller.previous().await,
        PlayerCommand::LoadPlaylist(tracks) => {
            controller.load_playlist(tracks);
            Ok(())
        }
        PlayerCommand::SetVolume(volume) => {
            controller.set_volume(volume);
            Ok(())
        }
        PlayerCommand::SetEqBand { band, gain_db } => {
            controller.set_eq_band(band, gain_db);
            Ok(())
        }
        PlayerCommand::SetEqGains(gains) => {
            controller.set_eq_gains(gains);
            Ok(())
        }
        PlayerCommand::SetNormalization(enabled) => {
            controller.set_normalization(enabled);
            Ok(())
        }
        PlayerCommand::SetCrossfade {
            enabled,
            duration_secs,
        } => {
            controller.set_crossfade(enabled, duration_secs);
            Ok(())
        }
        PlayerCommand::SetTrackCrossfade { id, enabled } => {
            controller.set_track_crossfade(id, enabled);
            Ok(())
        }
        PlayerCommand::Shutdown => Ok(()),
    };

    if let Err(e) = result {
        tracing::warn!("Command failed: {}", e);
    }
}
