//! Engine event types
//!
//! The engine publishes these on an unbounded channel; the playback
//! controller subscribes. Delivery cadence follows the host tick, handling
//! lives in the controller.
//!
//! ```text
//! AudioEngine::poll --[EngineEvent]--> PlaybackController
//! ```

/// Events emitted by the audio engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Position of the active element
    TimeUpdated { seconds: f64 },
    /// Natural end of the track loaded as `load_id`
    Ended { load_id: u64 },
    /// Duration became known after a load
    DurationKnown { seconds: f64 },
    /// Fade-out started; the track ends in `remaining` seconds
    CrossfadeStarted { remaining: f64 },
}

/// Sender for engine events (held by the engine)
pub type EngineEventSender = tokio::sync::mpsc::UnboundedSender<EngineEvent>;

/// Receiver for engine events (held by the controller's driver)
pub type EngineEventReceiver = tokio::sync::mpsc::UnboundedReceiver<EngineEvent>;

/// Create a new engine event channel
pub fn engine_event_channel() -> (EngineEventSender, EngineEventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}
