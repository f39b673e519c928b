//! Audio engine
//!
//! Owns the signal graph, both media elements, the crossfade scheduler and
//! the resource registry. `load` is the only async operation; everything
//! else is a synchronous call or an atomic parameter write.
//!
//! There is no locking around `load`: it takes `&mut self`, so two loads on
//! one engine cannot overlap.

use rodio::{OutputStream, OutputStreamBuilder};

use super::clock::secs_to_flicks;
use super::crossfade::{CrossfadeScheduler, FadeOut};
use super::element::{MediaElement, MediaKind, RodioElement};
use super::equalizer::EQ_BANDS;
use super::events::{EngineEvent, EngineEventSender};
use super::graph::SignalGraph;
use super::media::{FileRef, ResourceRegistry, ResourceUri};
use super::transport::{PlayState, Transport};
use crate::error::PlayerError;

/// Read-only view of the engine's state
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub active_kind: MediaKind,
    pub is_playing: bool,
    pub is_crossfading: bool,
    pub crossfade_enabled: bool,
    pub crossfade_duration_secs: f64,
    pub eq_gains_db: [f32; EQ_BANDS],
    pub normalization_enabled: bool,
    /// Master gain in [0, 1]
    pub volume: f32,
}

pub struct AudioEngine {
    graph: SignalGraph,
    transport: Transport,
    crossfade: CrossfadeScheduler,
    resources: ResourceRegistry,
    current_uri: Option<ResourceUri>,
    /// Bumped on every successful load, tags `Ended` events
    load_id: u64,
    ended_reported: bool,
    events: EngineEventSender,
    disposed: bool,
    _stream: Option<OutputStream>,
}

impl AudioEngine {
    /// Build an engine around two media elements sharing `graph`
    pub fn new(
        graph: SignalGraph,
        audio: Box<dyn MediaElement>,
        video: Box<dyn MediaElement>,
        events: EngineEventSender,
    ) -> Self {
        let transport = Transport::new(audio, video, graph.context().clone());
        Self {
            graph,
            transport,
            crossfade: CrossfadeScheduler::new(),
            resources: ResourceRegistry::new(),
            current_uri: None,
            load_id: 0,
            ended_reported: false,
            events,
            disposed: false,
            _stream: None,
        }
    }

    /// Engine on the default output device
    pub fn open_default(events: EngineEventSender) -> anyhow::Result<Self> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| anyhow::anyhow!("Failed to create audio output: {}", e))?;
        stream.log_on_drop(false);
        let mixer = stream.mixer().clone();

        let graph = SignalGraph::new();
        let audio = RodioElement::new(MediaKind::Audio, mixer.clone(), graph.clone());
        let video = RodioElement::new(MediaKind::Video, mixer, graph.clone());

        let mut engine = Self::new(graph, Box::new(audio), Box::new(video), events);
        engine._stream = Some(stream);
        tracing::info!("Audio engine ready on default output");
        Ok(engine)
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load a track into the element for `kind`; returns its duration if known
    ///
    /// The fade gain is back at 1 and the crossfade latch cleared whatever the
    /// outcome. On failure the previous track keeps playing and no URI leaks.
    pub async fn load(&mut self, file: &FileRef, kind: MediaKind) -> Result<Option<f64>, PlayerError> {
        if self.disposed {
            return Err(PlayerError::InvalidOperation("load on a disposed engine"));
        }

        self.graph.fade().set_value(1.0);
        self.crossfade.reset();

        let name = file.display_name();
        tracing::info!("Loading {} ({})", name, kind);

        let bytes = file.materialize().await.inspect_err(|e| {
            tracing::warn!("Load failed: {}", e);
        })?;

        let resource = self.resources.create(file, bytes.clone());
        let duration = match self.transport.element_mut(kind).load(&resource, bytes) {
            Ok(duration) => duration,
            Err(e) => {
                tracing::warn!("Load failed: {}", e);
                self.resources.revoke(&resource.uri);
                return Err(e);
            }
        };

        // Switch first, then release what the old source was reading
        self.transport.activate(kind);
        if let Some(previous) = self.current_uri.replace(resource.uri) {
            self.resources.revoke(&previous);
        }

        self.load_id += 1;
        self.ended_reported = false;

        if let Some(seconds) = duration {
            self.emit(EngineEvent::DurationKnown { seconds });
        }
        Ok(duration)
    }

    /// Tear down: unload both elements, revoke the last URI, close the context
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.transport.unload_all();
        if let Some(uri) = self.current_uri.take() {
            self.resources.revoke(&uri);
        }
        self.graph.context().close();
        self.disposed = true;
        tracing::info!("Audio engine disposed");
    }

    // ========================================================================
    // Transport
    // ========================================================================

    pub fn play(&mut self) -> Result<(), PlayerError> {
        self.transport.play()
    }

    pub fn pause(&mut self) -> Result<(), PlayerError> {
        self.transport.pause()
    }

    pub fn stop(&mut self) -> Result<(), PlayerError> {
        self.transport.stop()?;
        self.after_seek();
        Ok(())
    }

    /// Jump to `secs`; leaving the crossfade window restores full gain
    pub fn seek(&mut self, secs: f64) -> Result<(), PlayerError> {
        self.transport.seek(secs)?;
        self.after_seek();
        Ok(())
    }

    fn after_seek(&mut self) {
        let position = self.transport.current_time();
        if self.crossfade.rearm(position, self.transport.duration()) {
            self.graph.fade().set_value(1.0);
            tracing::debug!("Crossfade cancelled by seek to {:.3}s", position);
        }
    }

    pub fn current_time(&self) -> f64 {
        self.transport.current_time()
    }

    pub fn duration(&self) -> Option<f64> {
        self.transport.duration()
    }

    pub fn play_state(&self) -> PlayState {
        self.transport.play_state()
    }

    pub fn is_loaded(&self) -> bool {
        self.transport.is_loaded()
    }

    // ========================================================================
    // Host cadence
    // ========================================================================

    /// Periodic tick from the host: publishes position and end-of-media
    pub fn poll(&mut self) {
        if self.disposed || !self.transport.is_loaded() {
            return;
        }
        if self.transport.has_ended() {
            if !self.ended_reported {
                self.ended_reported = true;
                tracing::debug!("Track {} ended", self.load_id);
                self.emit(EngineEvent::Ended {
                    load_id: self.load_id,
                });
            }
            return;
        }
        if self.transport.play_state() == PlayState::Playing {
            let seconds = self.transport.current_time();
            self.emit(EngineEvent::TimeUpdated { seconds });
            self.on_time_update(seconds);
        }
    }

    /// Feed a position update to the crossfade scheduler
    pub fn on_time_update(&mut self, position: f64) {
        let kind = self.transport.active_kind();
        let duration = self.transport.duration();
        if let Some(fade) = self.crossfade.on_time_update(kind, position, duration) {
            self.schedule_fade_out(fade);
        }
    }

    fn schedule_fade_out(&mut self, fade: FadeOut) {
        let fade_gain = self.graph.fade();
        fade_gain.cancel_scheduled_values();
        let now = self.graph.clock().now();
        let ramp =
            fade_gain.linear_ramp_to_value_at_time(0.0, now, now + secs_to_flicks(fade.remaining));
        tracing::info!(
            "Crossfade: fading out over {:.3}s (clock {:.3}s -> {:.3}s)",
            fade.remaining,
            ramp.start_secs(),
            ramp.end_secs()
        );
        self.emit(EngineEvent::CrossfadeStarted {
            remaining: fade.remaining,
        });
    }

    // ========================================================================
    // Parameters
    // ========================================================================

    pub fn set_eq_band(&self, band: usize, gain_db: f32) -> Option<f32> {
        self.graph.set_eq_band(band, gain_db)
    }

    pub fn set_eq_gains(&self, gains: [f32; EQ_BANDS]) {
        self.graph.set_eq_gains(gains);
    }

    /// Volume control in 0-100
    pub fn set_volume(&self, volume: f32) -> f32 {
        self.graph.set_volume(volume)
    }

    pub fn set_normalization(&self, enabled: bool) {
        self.graph.set_normalization(enabled);
    }

    pub fn set_crossfade(&mut self, enabled: bool, duration_secs: f64) {
        self.crossfade.set_config(enabled, duration_secs);
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn state(&self) -> EngineState {
        EngineState {
            active_kind: self.transport.active_kind(),
            is_playing: self.transport.is_loaded()
                && self.transport.play_state() == PlayState::Playing
                && !self.transport.has_ended(),
            is_crossfading: self.crossfade.is_crossfading(),
            crossfade_enabled: self.crossfade.enabled(),
            crossfade_duration_secs: self.crossfade.duration_secs(),
            eq_gains_db: self.graph.eq_gains(),
            normalization_enabled: self.graph.normalization(),
            volume: self.graph.master_gain(),
        }
    }

    pub fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn current_uri(&self) -> Option<&ResourceUri> {
        self.current_uri.as_ref()
    }

    pub fn load_id(&self) -> u64 {
        self.load_id
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::events::{EngineEventReceiver, engine_event_channel};
    use crate::audio::testing::{FakeElement, FakeHandle, corrupt_file, track_file};
    use std::path::PathBuf;

    struct Rig {
        engine: AudioEngine,
        audio: FakeHandle,
        video: FakeHandle,
        events: EngineEventReceiver,
    }

    fn rig() -> Rig {
        let (audio_el, audio) = FakeElement::new(MediaKind::Audio);
        let (video_el, video) = FakeElement::new(MediaKind::Video);
        let (tx, events) = engine_event_channel();
        let engine = AudioEngine::new(SignalGraph::new(), Box::new(audio_el), Box::new(video_el), tx);
        Rig {
            engine,
            audio,
            video,
            events,
        }
    }

    fn drain(rx: &mut EngineEventReceiver) -> Vec<EngineEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_load_reports_duration() {
        let mut rig = rig();
        let duration = rig.engine.load(&track_file("a.mp3", 10.0), MediaKind::Audio).await;
        assert_eq!(duration, Ok(Some(10.0)));
        assert_eq!(rig.audio.loaded().as_deref(), Some("a.mp3"));
        assert_eq!(drain(&mut rig.events), vec![EngineEvent::DurationKnown { seconds: 10.0 }]);
    }

    #[tokio::test]
    async fn test_fifty_loads_leave_one_live_uri() {
        let mut rig = rig();
        for i in 0..50 {
            let file = track_file(&format!("track{}.mp3", i), 60.0);
            rig.engine.load(&file, MediaKind::Audio).await.unwrap();
            assert_eq!(rig.engine.resources().live_count(), 1);
        }
        let uri = rig.engine.current_uri().cloned().unwrap();
        assert_eq!(uri.id(), 50);
        assert!(rig.engine.resources().is_live(&uri));
    }

    #[tokio::test]
    async fn test_decode_failure_keeps_previous_track_and_uri() {
        let mut rig = rig();
        rig.engine.load(&track_file("a.mp3", 10.0), MediaKind::Audio).await.unwrap();
        rig.engine.play().unwrap();
        let before = rig.engine.current_uri().cloned();

        let err = rig.engine.load(&corrupt_file("bad.mp3"), MediaKind::Audio).await.unwrap_err();
        assert!(matches!(err, PlayerError::Decode { .. }));
        assert_eq!(rig.engine.current_uri().cloned(), before);
        assert_eq!(rig.engine.resources().live_count(), 1);
        assert_eq!(rig.audio.loaded().as_deref(), Some("a.mp3"));
        assert!(rig.engine.state().is_playing);
    }

    #[tokio::test]
    async fn test_resource_failure_creates_no_uri() {
        let mut rig = rig();
        let missing = FileRef::Path(PathBuf::from("/nonexistent/gone.mp3"));
        let err = rig.engine.load(&missing, MediaKind::Audio).await.unwrap_err();
        assert!(matches!(err, PlayerError::Resource { .. }));
        assert_eq!(rig.engine.resources().live_count(), 0);
        assert_eq!(rig.engine.current_uri(), None);
    }

    #[tokio::test]
    async fn test_failed_load_resets_fade_gain() {
        let mut rig = rig();
        rig.engine.set_crossfade(true, 3.0);
        rig.engine.load(&track_file("a.mp3", 180.0), MediaKind::Audio).await.unwrap();
        rig.engine.on_time_update(178.0);
        assert!(rig.engine.graph().fade().scheduled_ramp().is_some());

        let _ = rig.engine.load(&corrupt_file("bad.mp3"), MediaKind::Audio).await;
        assert_eq!(rig.engine.graph().fade().scheduled_ramp(), None);
        assert_eq!(rig.engine.graph().fade().value_at(u64::MAX), 1.0);
        assert!(!rig.engine.state().is_crossfading);
    }

    #[tokio::test]
    async fn test_crossfade_ramp_ends_at_track_end() {
        let mut rig = rig();
        rig.engine.set_crossfade(true, 3.0);
        rig.engine.load(&track_file("a.mp3", 180.0), MediaKind::Audio).await.unwrap();
        rig.engine.play().unwrap();
        drain(&mut rig.events);

        rig.audio.set_time(178.0);
        rig.engine.poll();

        let ramp = rig.engine.graph().fade().scheduled_ramp().unwrap();
        let now = rig.engine.graph().clock().now();
        assert_eq!(ramp.target, 0.0);
        assert_eq!(ramp.start, now);
        assert_eq!(ramp.end, now + secs_to_flicks(2.0));
        assert!(rig.engine.state().is_crossfading);
        assert_eq!(
            drain(&mut rig.events),
            vec![
                EngineEvent::TimeUpdated { seconds: 178.0 },
                EngineEvent::CrossfadeStarted { remaining: 2.0 },
            ]
        );

        // A later tick inside the window must not reschedule
        rig.audio.set_time(179.9);
        rig.engine.poll();
        assert_eq!(rig.engine.graph().fade().scheduled_ramp(), Some(ramp));
        assert_eq!(
            drain(&mut rig.events),
            vec![EngineEvent::TimeUpdated { seconds: 179.9 }]
        );
    }

    #[tokio::test]
    async fn test_seek_back_out_of_window_cancels_fade() {
        let mut rig = rig();
        rig.engine.set_crossfade(true, 3.0);
        rig.engine.load(&track_file("a.mp3", 180.0), MediaKind::Audio).await.unwrap();
        rig.engine.play().unwrap();
        rig.audio.set_time(178.0);
        rig.engine.poll();
        assert!(rig.engine.state().is_crossfading);
        drain(&mut rig.events);

        // Still inside the window: the fade keeps running
        rig.engine.seek(178.5).unwrap();
        assert!(rig.engine.graph().fade().scheduled_ramp().is_some());
        assert!(rig.engine.state().is_crossfading);

        rig.engine.seek(60.0).unwrap();
        let now = rig.engine.graph().clock().now();
        assert_eq!(rig.engine.graph().fade().scheduled_ramp(), None);
        assert_eq!(rig.engine.graph().fade().value_at(now), 1.0);
        assert!(!rig.engine.state().is_crossfading);

        // Reaching the window again fades out again
        rig.audio.set_time(178.0);
        rig.engine.poll();
        assert!(rig.engine.graph().fade().scheduled_ramp().is_some());
        assert_eq!(
            drain(&mut rig.events),
            vec![
                EngineEvent::TimeUpdated { seconds: 178.0 },
                EngineEvent::CrossfadeStarted { remaining: 2.0 },
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_mid_fade_restores_gain() {
        let mut rig = rig();
        rig.engine.set_crossfade(true, 3.0);
        rig.engine.load(&track_file("a.mp3", 180.0), MediaKind::Audio).await.unwrap();
        rig.engine.play().unwrap();
        rig.audio.set_time(179.0);
        rig.engine.poll();

        rig.engine.stop().unwrap();
        let now = rig.engine.graph().clock().now();
        assert_eq!(rig.engine.graph().fade().value_at(now), 1.0);
        assert!(!rig.engine.state().is_crossfading);
    }

    #[tokio::test]
    async fn test_video_never_crossfades() {
        let mut rig = rig();
        rig.engine.set_crossfade(true, 3.0);
        rig.engine.load(&track_file("v.mp4", 60.0), MediaKind::Video).await.unwrap();
        rig.engine.play().unwrap();
        rig.video.set_time(59.0);
        rig.engine.poll();
        assert_eq!(rig.engine.graph().fade().scheduled_ramp(), None);
        assert_eq!(rig.engine.state().active_kind, MediaKind::Video);
    }

    #[tokio::test]
    async fn test_ended_fires_once_per_track() {
        let mut rig = rig();
        rig.engine.load(&track_file("a.mp3", 10.0), MediaKind::Audio).await.unwrap();
        rig.engine.play().unwrap();
        drain(&mut rig.events);

        rig.audio.finish();
        rig.engine.poll();
        rig.engine.poll();
        assert_eq!(drain(&mut rig.events), vec![EngineEvent::Ended { load_id: 1 }]);
        assert!(!rig.engine.state().is_playing);
    }

    #[tokio::test]
    async fn test_paused_engine_emits_no_time_updates() {
        let mut rig = rig();
        rig.engine.load(&track_file("a.mp3", 10.0), MediaKind::Audio).await.unwrap();
        drain(&mut rig.events);
        rig.audio.set_time(3.0);
        rig.engine.poll();
        assert!(drain(&mut rig.events).is_empty());
    }

    #[tokio::test]
    async fn test_switching_to_video_releases_audio_element() {
        let mut rig = rig();
        rig.engine.load(&track_file("a.mp3", 10.0), MediaKind::Audio).await.unwrap();
        rig.engine.load(&track_file("v.mp4", 20.0), MediaKind::Video).await.unwrap();
        assert_eq!(rig.audio.loaded(), None);
        assert_eq!(rig.video.loaded().as_deref(), Some("v.mp4"));
        assert_eq!(rig.engine.resources().live_count(), 1);
        assert_eq!(rig.engine.duration(), Some(20.0));
    }

    #[tokio::test]
    async fn test_dispose_revokes_final_uri() {
        let mut rig = rig();
        rig.engine.load(&track_file("a.mp3", 10.0), MediaKind::Audio).await.unwrap();
        rig.engine.dispose();
        assert_eq!(rig.engine.resources().live_count(), 0);
        assert!(!rig.engine.is_loaded());
        let err = rig.engine.load(&track_file("b.mp3", 10.0), MediaKind::Audio).await;
        assert!(matches!(err, Err(PlayerError::InvalidOperation(_))));
    }

    #[test]
    fn test_parameters_reflected_in_state() {
        let rig = rig();
        rig.engine.set_volume(35.0);
        rig.engine.set_eq_band(1, 15.0);
        rig.engine.set_normalization(false);
        let state = rig.engine.state();
        assert_eq!(state.volume, 0.35);
        assert_eq!(state.eq_gains_db, [0.0, 12.0, 0.0, 0.0, 0.0]);
        assert!(!state.normalization_enabled);
        assert!(!state.is_playing);
    }
}
