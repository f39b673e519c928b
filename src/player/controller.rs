//! Playback controller
//!
//! Owns the engine and the queue and turns user commands and engine events
//! into state transitions:
//!
//! ```text
//! Idle --load--> Loading --ok--> Playing <--toggle--> Paused
//!                   |                |
//!                 error           Ended --next exists--> Loading
//!                   v                +----exhausted----> Idle
//!            prior stable state
//! ```
//!
//! Every method takes `&mut self`, so loads are serialized by construction.

use std::collections::HashMap;

use crate::audio::{AudioEngine, EQ_BANDS, EngineEvent, FileRef};
use crate::error::Result;

use super::events::{PlayerEvent, PlayerEventSender};
use super::queue::{Queue, Removal};
use super::state::{PlayerSnapshot, PlayerStatus, SharedPlayerState};
use super::track::{Track, TrackId};

/// Past this point `previous` restarts the track instead of moving back
pub const RESTART_THRESHOLD_SECS: f64 = 3.0;

pub struct PlaybackController {
    engine: AudioEngine,
    queue: Queue,
    current_track: Option<Track>,
    status: PlayerStatus,
    /// Backing file for each library track; falls back to the track's path
    sources: HashMap<TrackId, FileRef>,
    crossfade_secs: f64,
    events: PlayerEventSender,
    shared: SharedPlayerState,
}

/// Transport calls with nothing loaded are no-ops
fn ignore_invalid(result: Result<()>, op: &str) {
    if let Err(e) = result {
        tracing::debug!("{} ignored: {}", op, e);
    }
}

impl PlaybackController {
    pub fn new(engine: AudioEngine, events: PlayerEventSender, shared: SharedPlayerState) -> Self {
        let crossfade_secs = engine.state().crossfade_duration_secs;
        let controller = Self {
            engine,
            queue: Queue::new(),
            current_track: None,
            status: PlayerStatus::Idle,
            sources: HashMap::new(),
            crossfade_secs,
            events,
            shared,
        };
        controller.publish();
        controller
    }

    // ========================================================================
    // Library
    // ========================================================================

    /// Switch to a freshly scanned library; everything queued is dropped
    pub fn select_library(&mut self, tracks: &[Track]) {
        self.sources = tracks
            .iter()
            .map(|t| (t.id, FileRef::Path(t.path.clone())))
            .collect();
        self.reset_playback();
        tracing::info!("Library selected: {} tracks", tracks.len());
        self.emit_queue();
        self.publish();
    }

    /// Override the file backing a track
    pub fn register_source(&mut self, id: TrackId, file: FileRef) {
        self.sources.insert(id, file);
    }

    fn resolve(&self, track: &Track) -> FileRef {
        self.sources
            .get(&track.id)
            .cloned()
            .unwrap_or_else(|| FileRef::Path(track.path.clone()))
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load `track` and start it; on failure the prior state is restored
    async fn load_and_play(&mut self, track: Track) -> Result<Track> {
        let prior = self.status;
        self.set_status(PlayerStatus::Loading);

        let file = self.resolve(&track);
        let duration = match self.engine.load(&file, track.media_kind()).await {
            Ok(duration) => duration,
            Err(e) => {
                self.set_status(prior);
                // Only a file that would not load is news to the listener
                if e.is_load_failure() {
                    tracing::error!("Failed to play {}: {}", track.title, e);
                    self.emit(PlayerEvent::Error {
                        message: e.to_string(),
                    });
                } else {
                    tracing::warn!("Cannot play {}: {}", track.title, e);
                }
                return Err(e);
            }
        };

        self.engine.set_crossfade(track.crossfade, self.crossfade_secs);

        let mut track = track;
        if duration.is_some() {
            track.duration = duration;
        }
        ignore_invalid(self.engine.play(), "play after load");

        tracing::info!("Now playing: {}", track);
        self.current_track = Some(track.clone());
        self.emit(PlayerEvent::TrackChanged(Some(track.clone())));
        self.set_status(PlayerStatus::Playing);
        Ok(track)
    }

    /// Play a library track, queueing it if needed
    pub async fn play_track(&mut self, track: Track) -> Result<()> {
        let loaded = self.load_and_play(track).await?;
        let index = self.queue.push(loaded.clone());
        self.queue.update_duration(loaded.id, loaded.duration);
        self.queue.set_current(Some(index));
        self.emit_queue();
        self.publish();
        Ok(())
    }

    /// Play the queue entry at `index`; out of range is a no-op
    pub async fn play_from_queue(&mut self, index: usize) -> Result<()> {
        let Some(track) = self.queue.get(index).cloned() else {
            tracing::debug!("play_from_queue({}) out of range", index);
            return Ok(());
        };
        let loaded = self.load_and_play(track).await?;
        self.queue.update_duration(loaded.id, loaded.duration);
        self.queue.set_current(Some(index));
        self.emit_queue();
        self.publish();
        Ok(())
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Advance to the next entry, or stop when the queue is exhausted
    pub async fn next(&mut self) -> Result<()> {
        if self.queue.is_empty() {
            tracing::debug!("next ignored: queue is empty");
            return Ok(());
        }
        match self.queue.next_index() {
            Some(index) => self.play_from_queue(index).await,
            None => {
                self.finish_queue();
                Ok(())
            }
        }
    }

    pub async fn previous(&mut self) -> Result<()> {
        if self.current_track.is_some() && self.engine.current_time() > RESTART_THRESHOLD_SECS {
            self.seek(0.0);
            return Ok(());
        }
        match self.queue.previous_index() {
            Some(index) => self.play_from_queue(index).await,
            None => {
                tracing::debug!("previous ignored: at start of queue");
                Ok(())
            }
        }
    }

    fn finish_queue(&mut self) {
        tracing::info!("Queue finished");
        ignore_invalid(self.engine.stop(), "stop");
        self.queue.set_current(None);
        self.current_track = None;
        self.emit(PlayerEvent::TrackChanged(None));
        self.set_status(PlayerStatus::Idle);
        self.emit_queue();
        self.publish();
    }

    /// Stop and forget the current track and queue
    fn reset_playback(&mut self) {
        ignore_invalid(self.engine.stop(), "stop");
        self.queue.clear();
        if self.current_track.take().is_some() {
            self.emit(PlayerEvent::TrackChanged(None));
        }
        self.set_status(PlayerStatus::Idle);
    }

    // ========================================================================
    // Queue editing
    // ========================================================================

    pub fn add_to_queue(&mut self, track: Track) {
        if self.queue.contains(track.id) {
            tracing::debug!("{} already queued", track.title);
            return;
        }
        self.queue.push(track);
        self.emit_queue();
        self.publish();
    }

    pub fn add_album_to_queue(&mut self, tracks: Vec<Track>) {
        let added = self.queue.extend_unique(tracks);
        tracing::info!("Added {} tracks to queue", added);
        if added > 0 {
            self.emit_queue();
            self.publish();
        }
    }

    /// Remove an entry; removing the current one continues with its replacement
    pub async fn remove_from_queue(&mut self, id: TrackId) -> Result<()> {
        match self.queue.remove(id) {
            Removal::NotFound => {
                tracing::debug!("remove_from_queue: {} not queued", id);
                return Ok(());
            }
            Removal::Kept => {}
            Removal::Emptied => {
                ignore_invalid(self.engine.stop(), "stop");
                if self.current_track.take().is_some() {
                    self.emit(PlayerEvent::TrackChanged(None));
                }
                self.set_status(PlayerStatus::Idle);
            }
            Removal::Replaced { index } => {
                if let Some(track) = self.queue.get(index).cloned() {
                    match self.load_and_play(track).await {
                        Ok(loaded) => self.queue.update_duration(loaded.id, loaded.duration),
                        Err(e) => {
                            // The engine still owns the removed track
                            self.queue.set_current(None);
                            self.emit_queue();
                            self.publish();
                            return Err(e);
                        }
                    }
                }
            }
        }
        self.emit_queue();
        self.publish();
        Ok(())
    }

    /// Adopt a new queue order given as track ids
    pub fn reorder_queue(&mut self, order: &[TrackId]) {
        self.queue.reorder(order);
        self.emit_queue();
        self.publish();
    }

    pub fn move_in_queue(&mut self, from: usize, to: usize) {
        if self.queue.move_entry(from, to) {
            self.emit_queue();
            self.publish();
        }
    }

    pub fn clear_queue(&mut self) {
        self.reset_playback();
        self.emit_queue();
        self.publish();
    }

    /// Replace the queue with a playlist; nothing starts playing
    pub fn load_playlist(&mut self, tracks: Vec<Track>) {
        ignore_invalid(self.engine.stop(), "stop");
        self.queue.replace(tracks);
        if self.current_track.take().is_some() {
            self.emit(PlayerEvent::TrackChanged(None));
        }
        self.set_status(PlayerStatus::Idle);
        tracing::info!("Playlist loaded: {} tracks", self.queue.len());
        self.emit_queue();
        self.publish();
    }

    // ========================================================================
    // Transport
    // ========================================================================

    pub async fn toggle_play(&mut self) -> Result<()> {
        match self.status {
            PlayerStatus::Playing => {
                self.pause();
                Ok(())
            }
            _ if self.current_track.is_some() => {
                self.play();
                Ok(())
            }
            _ if !self.queue.is_empty() => self.play_from_queue(0).await,
            _ => Ok(()),
        }
    }

    pub fn play(&mut self) {
        if self.current_track.is_none() {
            tracing::debug!("play ignored: nothing loaded");
            return;
        }
        match self.engine.play() {
            Ok(()) => self.set_status(PlayerStatus::Playing),
            Err(e) => tracing::debug!("play ignored: {}", e),
        }
        self.publish();
    }

    pub fn pause(&mut self) {
        if self.status != PlayerStatus::Playing {
            return;
        }
        match self.engine.pause() {
            Ok(()) => self.set_status(PlayerStatus::Paused),
            Err(e) => tracing::debug!("pause ignored: {}", e),
        }
        self.publish();
    }

    /// Seek within the current track; play/pause status is unchanged
    pub fn seek(&mut self, secs: f64) {
        ignore_invalid(self.engine.seek(secs), "seek");
        self.shared.set_position(self.engine.current_time());
    }

    // ========================================================================
    // Engine events
    // ========================================================================

    /// Host cadence tick; the engine answers on its event channel
    pub fn tick(&mut self) {
        self.engine.poll();
    }

    pub async fn handle_engine_event(&mut self, event: EngineEvent) -> Result<()> {
        match event {
            EngineEvent::TimeUpdated { seconds } => {
                self.shared.set_position(seconds);
                self.emit(PlayerEvent::TimeUpdated { seconds });
            }
            EngineEvent::DurationKnown { seconds } => {
                self.emit(PlayerEvent::DurationKnown { seconds });
            }
            EngineEvent::CrossfadeStarted { remaining } => {
                self.emit(PlayerEvent::CrossfadeStarted { remaining });
            }
            EngineEvent::Ended { load_id } => return self.handle_ended(load_id).await,
        }
        Ok(())
    }

    async fn handle_ended(&mut self, load_id: u64) -> Result<()> {
        if load_id != self.engine.load_id() || self.status != PlayerStatus::Playing {
            tracing::debug!("Ignoring stale end of load {}", load_id);
            return Ok(());
        }
        if let Some(track) = &self.current_track {
            self.emit(PlayerEvent::Ended { track_id: track.id });
        }
        self.set_status(PlayerStatus::Paused);

        match self.queue.current_index().and_then(|_| self.queue.next_index()) {
            Some(index) => self.play_from_queue(index).await,
            None => {
                self.finish_queue();
                Ok(())
            }
        }
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    /// Volume in 0-100; returns the master gain actually applied
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        let gain = self.engine.set_volume(volume);
        self.publish();
        gain
    }

    pub fn set_eq_band(&mut self, band: usize, gain_db: f32) -> Option<f32> {
        let applied = self.engine.set_eq_band(band, gain_db);
        if applied.is_none() {
            tracing::warn!("No EQ band {}", band);
        }
        self.publish();
        applied
    }

    pub fn set_eq_gains(&mut self, gains: [f32; EQ_BANDS]) {
        self.engine.set_eq_gains(gains);
        self.publish();
    }

    pub fn set_normalization(&mut self, enabled: bool) {
        self.engine.set_normalization(enabled);
        self.publish();
    }

    /// Scheduler configuration; the duration also applies to later loads
    pub fn set_crossfade(&mut self, enabled: bool, duration_secs: f64) {
        self.engine.set_crossfade(enabled, duration_secs);
        self.crossfade_secs = self.engine.state().crossfade_duration_secs;
        self.publish();
    }

    /// Per-track opt-in; applied to the engine at once if the track is loaded
    pub fn set_track_crossfade(&mut self, id: TrackId, enabled: bool) {
        self.queue.set_crossfade(id, enabled);
        if let Some(track) = self.current_track.as_mut().filter(|t| t.id == id) {
            track.crossfade = enabled;
            self.engine.set_crossfade(enabled, self.crossfade_secs);
        }
        self.emit_queue();
        self.publish();
    }

    /// Release the engine; the controller is inert afterwards
    pub fn dispose(&mut self) {
        self.engine.dispose();
        self.current_track = None;
        self.queue.set_current(None);
        self.set_status(PlayerStatus::Idle);
        self.publish();
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_track.as_ref()
    }

    pub fn engine(&self) -> &AudioEngine {
        &self.engine
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            status: self.status,
            current_track: self.current_track.clone(),
            queue: self.queue.entries().to_vec(),
            current_index: self.queue.current_index(),
            position: self.engine.current_time(),
            duration: self.current_track.as_ref().and_then(|t| t.duration),
            engine: Some(self.engine.state()),
        }
    }

    fn publish(&self) {
        self.shared.publish(self.snapshot());
    }

    fn set_status(&mut self, status: PlayerStatus) {
        if self.status != status {
            self.status = status;
            self.emit(PlayerEvent::StatusChanged(status));
        }
    }

    fn emit(&self, event: PlayerEvent) {
        let _ = self.events.send(event);
    }

    fn emit_queue(&self) {
        self.emit(PlayerEvent::QueueChanged {
            queue: self.queue.entries().to_vec(),
            current_index: self.queue.current_index(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{FakeElement, FakeHandle, corrupt_file, track_file};
    use crate::audio::{EngineEventReceiver, MediaKind, SignalGraph, engine_event_channel};
    use crate::error::PlayerError;
    use crate::player::events::{PlayerEventReceiver, player_event_channel};

    struct Rig {
        controller: PlaybackController,
        audio: FakeHandle,
        video: FakeHandle,
        engine_rx: EngineEventReceiver,
        events: PlayerEventReceiver,
        shared: SharedPlayerState,
    }

    fn track(id: TrackId, name: &str) -> Track {
        Track::new(id, format!("/music/{}", name), name)
    }

    fn rig() -> Rig {
        let (audio_el, audio) = FakeElement::new(MediaKind::Audio);
        let (video_el, video) = FakeElement::new(MediaKind::Video);
        let (engine_tx, engine_rx) = engine_event_channel();
        let engine = AudioEngine::new(
            SignalGraph::new(),
            Box::new(audio_el),
            Box::new(video_el),
            engine_tx,
        );
        let (tx, events) = player_event_channel();
        let shared = SharedPlayerState::new();
        Rig {
            controller: PlaybackController::new(engine, tx, shared.clone()),
            audio,
            video,
            engine_rx,
            events,
            shared,
        }
    }

    impl Rig {
        /// Register an in-memory source and return the matching track
        fn add(&mut self, id: TrackId, name: &str, secs: f64) -> Track {
            self.controller.register_source(id, track_file(name, secs));
            track(id, name)
        }

        /// Queue [a, b, c] (10 s each) and start playing `index`
        async fn abc_playing(&mut self, index: usize) -> [Track; 3] {
            let tracks = [
                self.add(1, "a.mp3", 10.0),
                self.add(2, "b.mp3", 10.0),
                self.add(3, "c.mp3", 10.0),
            ];
            self.controller.add_album_to_queue(tracks.to_vec());
            self.controller.play_from_queue(index).await.unwrap();
            tracks
        }

        /// One host tick, with engine events handed to the controller
        async fn pump(&mut self) {
            self.controller.tick();
            while let Ok(event) = self.engine_rx.try_recv() {
                let _ = self.controller.handle_engine_event(event).await;
            }
        }

        fn drain(&mut self) -> Vec<PlayerEvent> {
            let mut out = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                out.push(event);
            }
            out
        }

        fn queue_ids(&self) -> Vec<TrackId> {
            self.controller.queue().entries().iter().map(|t| t.id).collect()
        }

        fn current_id(&self) -> Option<TrackId> {
            self.controller.current_track().map(|t| t.id)
        }
    }

    #[tokio::test]
    async fn test_play_track_appends_and_records_duration() {
        let mut rig = rig();
        let a = rig.add(1, "a.mp3", 42.0);
        rig.controller.play_track(a).await.unwrap();

        assert_eq!(rig.controller.status(), PlayerStatus::Playing);
        assert_eq!(rig.controller.queue().current_index(), Some(0));
        assert_eq!(rig.controller.queue().get(0).and_then(|t| t.duration), Some(42.0));
        assert_eq!(rig.controller.current_track().and_then(|t| t.duration), Some(42.0));
        assert_eq!(rig.audio.loaded().as_deref(), Some("a.mp3"));
        assert!(!rig.audio.is_paused());
        assert_eq!(rig.shared.status(), PlayerStatus::Playing);
    }

    #[tokio::test]
    async fn test_play_track_already_queued_plays_in_place() {
        let mut rig = rig();
        let tracks = rig.abc_playing(0).await;
        rig.controller.play_track(tracks[2].clone()).await.unwrap();
        assert_eq!(rig.queue_ids(), vec![1, 2, 3]);
        assert_eq!(rig.controller.queue().current_index(), Some(2));
        assert_eq!(rig.audio.loaded().as_deref(), Some("c.mp3"));
    }

    #[tokio::test]
    async fn test_failed_play_track_rolls_back() {
        let mut rig = rig();
        let a = rig.add(1, "a.mp3", 10.0);
        rig.controller.play_track(a).await.unwrap();
        rig.controller.register_source(9, corrupt_file("bad.mp3"));
        rig.drain();

        let err = rig.controller.play_track(track(9, "bad.mp3")).await.unwrap_err();
        assert!(matches!(err, PlayerError::Decode { .. }));
        assert_eq!(rig.controller.status(), PlayerStatus::Playing);
        assert_eq!(rig.queue_ids(), vec![1]);
        assert_eq!(rig.current_id(), Some(1));
        assert_eq!(rig.audio.loaded().as_deref(), Some("a.mp3"));
        assert!(rig.drain().iter().any(|e| matches!(e, PlayerEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_failed_first_load_returns_to_idle() {
        let mut rig = rig();
        let err = rig.controller.play_track(track(5, "missing.mp3")).await;
        assert!(matches!(err, Err(PlayerError::Resource { .. })));
        assert_eq!(rig.controller.status(), PlayerStatus::Idle);
        assert!(rig.controller.queue().is_empty());
        assert_eq!(rig.controller.engine().resources().live_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_current_continues_with_entry_in_its_slot() {
        let mut rig = rig();
        rig.abc_playing(1).await;

        rig.controller.remove_from_queue(2).await.unwrap();
        assert_eq!(rig.queue_ids(), vec![1, 3]);
        assert_eq!(rig.controller.queue().current_index(), Some(1));
        assert_eq!(rig.current_id(), Some(3));
        assert_eq!(rig.audio.loaded().as_deref(), Some("c.mp3"));
        assert_eq!(rig.controller.status(), PlayerStatus::Playing);
    }

    #[tokio::test]
    async fn test_remove_current_last_falls_back_to_new_last() {
        let mut rig = rig();
        rig.abc_playing(2).await;
        rig.controller.remove_from_queue(3).await.unwrap();
        assert_eq!(rig.controller.queue().current_index(), Some(1));
        assert_eq!(rig.audio.loaded().as_deref(), Some("b.mp3"));
    }

    #[tokio::test]
    async fn test_remove_before_current_keeps_playback() {
        let mut rig = rig();
        rig.abc_playing(2).await;
        let loads = rig.audio.loads();
        rig.controller.remove_from_queue(1).await.unwrap();
        assert_eq!(rig.controller.queue().current_index(), Some(1));
        assert_eq!(rig.current_id(), Some(3));
        assert_eq!(rig.audio.loads(), loads);
    }

    #[tokio::test]
    async fn test_remove_last_entry_stops() {
        let mut rig = rig();
        let a = rig.add(1, "a.mp3", 10.0);
        rig.controller.play_track(a).await.unwrap();
        rig.controller.remove_from_queue(1).await.unwrap();
        assert!(rig.controller.queue().is_empty());
        assert_eq!(rig.controller.current_track(), None);
        assert_eq!(rig.controller.status(), PlayerStatus::Idle);
        assert!(rig.audio.is_paused());
    }

    #[tokio::test]
    async fn test_removing_last_entry_after_reorder_dropped_current_stops() {
        let mut rig = rig();
        let a = rig.add(1, "a.mp3", 10.0);
        let b = rig.add(2, "b.mp3", 10.0);
        rig.controller.add_album_to_queue(vec![a, b]);
        rig.controller.play_from_queue(0).await.unwrap();

        rig.controller.reorder_queue(&[2]);
        assert_eq!(rig.controller.queue().current_index(), None);
        assert_eq!(rig.controller.status(), PlayerStatus::Playing);
        rig.drain();

        rig.controller.remove_from_queue(2).await.unwrap();
        assert!(rig.controller.queue().is_empty());
        assert_eq!(rig.controller.current_track(), None);
        assert_eq!(rig.controller.status(), PlayerStatus::Idle);
        assert_eq!(rig.shared.status(), PlayerStatus::Idle);
        assert!(rig.audio.is_paused());
        assert_eq!(rig.audio.time(), 0.0);
        assert!(
            rig.drain()
                .iter()
                .any(|e| matches!(e, PlayerEvent::TrackChanged(None)))
        );
    }

    #[tokio::test]
    async fn test_remove_current_with_broken_replacement() {
        let mut rig = rig();
        let a = rig.add(1, "a.mp3", 10.0);
        rig.controller.register_source(2, corrupt_file("b.mp3"));
        rig.controller.add_album_to_queue(vec![a, track(2, "b.mp3")]);
        rig.controller.play_from_queue(0).await.unwrap();

        assert!(rig.controller.remove_from_queue(1).await.is_err());
        assert_eq!(rig.queue_ids(), vec![2]);
        assert_eq!(rig.controller.queue().current_index(), None);
        assert_eq!(rig.controller.engine().resources().live_count(), 1);
    }

    #[tokio::test]
    async fn test_reorder_keeps_current_by_identity() {
        let mut rig = rig();
        rig.abc_playing(2).await;
        rig.controller.reorder_queue(&[3, 1, 2]);
        assert_eq!(rig.queue_ids(), vec![3, 1, 2]);
        assert_eq!(rig.controller.queue().current_index(), Some(0));
        assert_eq!(rig.current_id(), Some(3));
        assert_eq!(rig.shared.snapshot().current_index, Some(0));
    }

    #[tokio::test]
    async fn test_move_in_queue() {
        let mut rig = rig();
        rig.abc_playing(0).await;
        rig.controller.move_in_queue(0, 2);
        assert_eq!(rig.queue_ids(), vec![2, 3, 1]);
        assert_eq!(rig.controller.queue().current_index(), Some(2));
    }

    #[tokio::test]
    async fn test_previous_restarts_after_three_seconds() {
        let mut rig = rig();
        rig.abc_playing(1).await;
        rig.audio.set_time(5.0);
        rig.controller.previous().await.unwrap();
        assert_eq!(rig.audio.time(), 0.0);
        assert_eq!(rig.controller.queue().current_index(), Some(1));
        assert_eq!(rig.audio.loaded().as_deref(), Some("b.mp3"));
        assert_eq!(rig.controller.status(), PlayerStatus::Playing);
    }

    #[tokio::test]
    async fn test_previous_restart_mid_fade_restores_gain() {
        let mut rig = rig();
        let mut a = rig.add(1, "a.mp3", 180.0);
        a.crossfade = true;
        rig.controller.play_track(a).await.unwrap();
        rig.audio.set_time(178.0);
        rig.pump().await;
        assert!(rig.controller.engine().state().is_crossfading);

        rig.controller.previous().await.unwrap();
        assert_eq!(rig.audio.time(), 0.0);
        assert_eq!(rig.controller.engine().graph().fade().scheduled_ramp(), None);
        assert!(!rig.controller.engine().state().is_crossfading);
        assert_eq!(rig.controller.status(), PlayerStatus::Playing);

        rig.drain();
        rig.audio.set_time(178.0);
        rig.pump().await;
        assert!(rig.drain().contains(&PlayerEvent::CrossfadeStarted { remaining: 2.0 }));
    }

    #[tokio::test]
    async fn test_previous_early_moves_back() {
        let mut rig = rig();
        rig.abc_playing(1).await;
        rig.audio.set_time(2.0);
        rig.controller.previous().await.unwrap();
        assert_eq!(rig.controller.queue().current_index(), Some(0));
        assert_eq!(rig.audio.loaded().as_deref(), Some("a.mp3"));
    }

    #[tokio::test]
    async fn test_previous_at_first_entry_is_noop() {
        let mut rig = rig();
        rig.abc_playing(0).await;
        let loads = rig.audio.loads();
        rig.controller.previous().await.unwrap();
        assert_eq!(rig.audio.loads(), loads);
        assert_eq!(rig.controller.queue().current_index(), Some(0));
    }

    #[tokio::test]
    async fn test_next_advances_then_stops_at_end() {
        let mut rig = rig();
        rig.abc_playing(1).await;
        rig.controller.next().await.unwrap();
        assert_eq!(rig.controller.queue().current_index(), Some(2));
        assert_eq!(rig.audio.loaded().as_deref(), Some("c.mp3"));

        rig.controller.next().await.unwrap();
        assert_eq!(rig.controller.queue().current_index(), None);
        assert_eq!(rig.controller.status(), PlayerStatus::Idle);
        assert!(!rig.controller.engine().state().is_playing);
    }

    #[tokio::test]
    async fn test_next_on_empty_queue_is_noop() {
        let mut rig = rig();
        rig.controller.next().await.unwrap();
        assert_eq!(rig.controller.status(), PlayerStatus::Idle);
        assert!(rig.drain().is_empty());
    }

    #[tokio::test]
    async fn test_failed_next_keeps_position() {
        let mut rig = rig();
        let a = rig.add(1, "a.mp3", 10.0);
        rig.controller.register_source(2, corrupt_file("b.mp3"));
        rig.controller.add_album_to_queue(vec![a, track(2, "b.mp3")]);
        rig.controller.play_from_queue(0).await.unwrap();

        assert!(rig.controller.next().await.is_err());
        assert_eq!(rig.controller.queue().current_index(), Some(0));
        assert_eq!(rig.controller.status(), PlayerStatus::Playing);
    }

    #[tokio::test]
    async fn test_end_of_only_track_exhausts_queue() {
        let mut rig = rig();
        let a = rig.add(1, "a.mp3", 10.0);
        rig.controller.play_track(a).await.unwrap();
        rig.drain();

        rig.audio.finish();
        rig.pump().await;

        assert_eq!(rig.controller.queue().current_index(), None);
        assert_eq!(rig.controller.status(), PlayerStatus::Idle);
        assert!(!rig.controller.engine().state().is_playing);
        assert!(rig.drain().contains(&PlayerEvent::Ended { track_id: 1 }));
    }

    #[tokio::test]
    async fn test_auto_advance_on_end() {
        let mut rig = rig();
        rig.abc_playing(0).await;
        rig.audio.finish();
        rig.pump().await;
        assert_eq!(rig.controller.queue().current_index(), Some(1));
        assert_eq!(rig.audio.loaded().as_deref(), Some("b.mp3"));
        assert_eq!(rig.controller.status(), PlayerStatus::Playing);
    }

    #[tokio::test]
    async fn test_duplicate_and_stale_ends_are_ignored() {
        let mut rig = rig();
        rig.abc_playing(0).await;
        let first_load = rig.controller.engine().load_id();
        rig.controller.next().await.unwrap();

        rig.controller
            .handle_engine_event(EngineEvent::Ended { load_id: first_load })
            .await
            .unwrap();
        assert_eq!(rig.controller.queue().current_index(), Some(1));

        rig.controller.pause();
        let current = rig.controller.engine().load_id();
        rig.controller
            .handle_engine_event(EngineEvent::Ended { load_id: current })
            .await
            .unwrap();
        assert_eq!(rig.controller.queue().current_index(), Some(1));
    }

    #[tokio::test]
    async fn test_time_updates_reach_snapshot() {
        let mut rig = rig();
        rig.abc_playing(0).await;
        rig.drain();
        rig.audio.set_time(4.5);
        rig.pump().await;
        assert_eq!(rig.shared.position(), 4.5);
        assert_eq!(rig.drain(), vec![PlayerEvent::TimeUpdated { seconds: 4.5 }]);
    }

    #[tokio::test]
    async fn test_toggle_play() {
        let mut rig = rig();
        rig.controller.toggle_play().await.unwrap();
        assert_eq!(rig.controller.status(), PlayerStatus::Idle);

        rig.abc_playing(0).await;
        rig.controller.clear_queue();
        let tracks = [rig.add(1, "a.mp3", 10.0), rig.add(2, "b.mp3", 10.0)];
        rig.controller.add_album_to_queue(tracks.to_vec());

        // Nothing loaded: starts the queue
        rig.controller.toggle_play().await.unwrap();
        assert_eq!(rig.controller.queue().current_index(), Some(0));
        assert_eq!(rig.controller.status(), PlayerStatus::Playing);

        rig.controller.toggle_play().await.unwrap();
        assert_eq!(rig.controller.status(), PlayerStatus::Paused);
        assert!(rig.audio.is_paused());

        rig.controller.toggle_play().await.unwrap();
        assert_eq!(rig.controller.status(), PlayerStatus::Playing);
        assert!(!rig.audio.is_paused());
    }

    #[tokio::test]
    async fn test_seek_keeps_pause_state() {
        let mut rig = rig();
        rig.abc_playing(0).await;
        rig.controller.pause();
        rig.controller.seek(6.0);
        assert_eq!(rig.audio.time(), 6.0);
        assert_eq!(rig.controller.status(), PlayerStatus::Paused);
        assert!(rig.audio.is_paused());
    }

    #[tokio::test]
    async fn test_add_to_queue_skips_duplicates() {
        let mut rig = rig();
        let a = rig.add(1, "a.mp3", 10.0);
        let b = rig.add(2, "b.mp3", 10.0);
        rig.controller.add_to_queue(a.clone());
        rig.controller.add_to_queue(a.clone());
        rig.controller.add_album_to_queue(vec![b.clone(), a, b]);
        assert_eq!(rig.queue_ids(), vec![1, 2]);
        assert_eq!(rig.controller.status(), PlayerStatus::Idle);
    }

    #[tokio::test]
    async fn test_clear_queue_stops() {
        let mut rig = rig();
        rig.abc_playing(1).await;
        rig.controller.clear_queue();
        assert!(rig.controller.queue().is_empty());
        assert_eq!(rig.controller.current_track(), None);
        assert_eq!(rig.controller.status(), PlayerStatus::Idle);
        assert!(rig.audio.is_paused());
    }

    #[tokio::test]
    async fn test_load_playlist_replaces_queue_without_playing() {
        let mut rig = rig();
        rig.abc_playing(0).await;
        let d = rig.add(4, "d.mp3", 10.0);
        let e = rig.add(5, "e.mp3", 10.0);
        rig.controller.load_playlist(vec![d.clone(), e, d]);
        assert_eq!(rig.queue_ids(), vec![4, 5]);
        assert_eq!(rig.controller.queue().current_index(), None);
        assert_eq!(rig.controller.status(), PlayerStatus::Idle);
        assert!(rig.audio.is_paused());
    }

    #[tokio::test]
    async fn test_play_from_queue_out_of_range_is_noop() {
        let mut rig = rig();
        rig.abc_playing(0).await;
        rig.controller.play_from_queue(7).await.unwrap();
        assert_eq!(rig.controller.queue().current_index(), Some(0));
    }

    #[tokio::test]
    async fn test_track_crossfade_flag_drives_engine() {
        let mut rig = rig();
        let mut a = rig.add(1, "a.mp3", 180.0);
        a.crossfade = true;
        let b = rig.add(2, "b.mp3", 180.0);
        rig.controller.add_album_to_queue(vec![a, b]);

        rig.controller.play_from_queue(0).await.unwrap();
        assert!(rig.controller.engine().state().crossfade_enabled);

        rig.controller.next().await.unwrap();
        assert!(!rig.controller.engine().state().crossfade_enabled);

        rig.controller.set_track_crossfade(2, true);
        assert!(rig.controller.engine().state().crossfade_enabled);
        assert!(rig.controller.queue().get(1).is_some_and(|t| t.crossfade));

        rig.audio.set_time(178.0);
        rig.pump().await;
        assert!(rig.drain().contains(&PlayerEvent::CrossfadeStarted { remaining: 2.0 }));
    }

    #[tokio::test]
    async fn test_crossfade_duration_applies_to_later_loads() {
        let mut rig = rig();
        rig.controller.set_crossfade(false, 5.0);
        let mut a = rig.add(1, "a.mp3", 60.0);
        a.crossfade = true;
        rig.controller.play_track(a).await.unwrap();
        let state = rig.controller.engine().state();
        assert!(state.crossfade_enabled);
        assert_eq!(state.crossfade_duration_secs, 5.0);
    }

    #[tokio::test]
    async fn test_video_track_uses_video_element() {
        let mut rig = rig();
        let mut v = rig.add(1, "clip.mp4", 30.0);
        v.is_video = true;
        rig.controller.play_track(v).await.unwrap();
        assert_eq!(rig.video.loaded().as_deref(), Some("clip.mp4"));
        assert_eq!(rig.controller.engine().state().active_kind, MediaKind::Video);
    }

    #[test]
    fn test_parameters_clamp_and_publish() {
        let mut rig = rig();
        assert_eq!(rig.controller.set_volume(150.0), 1.0);
        assert_eq!(rig.controller.set_volume(40.0), 0.4);
        assert_eq!(rig.controller.set_eq_band(4, -20.0), Some(-12.0));
        assert_eq!(rig.controller.set_eq_band(5, 3.0), None);
        rig.controller.set_normalization(false);

        let engine = rig.shared.snapshot().engine.unwrap();
        assert_eq!(engine.volume, 0.4);
        assert_eq!(engine.eq_gains_db[4], -12.0);
        assert!(!engine.normalization_enabled);
    }

    #[tokio::test]
    async fn test_select_library_resets() {
        let mut rig = rig();
        rig.abc_playing(0).await;
        rig.controller.select_library(&[track(10, "x.mp3")]);
        assert!(rig.controller.queue().is_empty());
        assert_eq!(rig.controller.current_track(), None);
        assert_eq!(rig.controller.status(), PlayerStatus::Idle);
    }

    #[tokio::test]
    async fn test_dispose_releases_engine() {
        let mut rig = rig();
        rig.abc_playing(0).await;
        rig.controller.dispose();
        assert_eq!(rig.controller.engine().resources().live_count(), 0);
        assert_eq!(rig.controller.status(), PlayerStatus::Idle);
        assert!(rig.controller.play_from_queue(1).await.is_err());
    }

    #[tokio::test]
    async fn test_play_after_dispose_is_not_reported_as_load_error() {
        let mut rig = rig();
        let a = rig.add(1, "a.mp3", 10.0);
        rig.controller.dispose();
        rig.drain();

        let err = rig.controller.play_track(a).await.unwrap_err();
        assert!(matches!(err, PlayerError::InvalidOperation(_)));
        assert_eq!(rig.controller.status(), PlayerStatus::Idle);
        assert!(rig.controller.queue().is_empty());
        assert!(
            !rig.drain()
                .iter()
                .any(|e| matches!(e, PlayerEvent::Error { .. }))
        );
    }
}
