//! Audio engine module
//!
//! This module provides playback through a fixed processing graph:
//! - `AudioEngine`: Track loading, transport and crossfade scheduling
//! - `SignalGraph`: EQ, limiter, master gain and fade gain shared by both elements
//! - `media`: File references and the playable-resource URI registry
//! - `element`: The media element abstraction and its rodio implementation
//! - `events`: Engine events consumed by the playback controller

mod clock;
mod crossfade;
mod element;
mod engine;
mod equalizer;
pub mod events;
mod fade;
mod graph;
mod limiter;
pub mod media;
mod transport;

#[cfg(test)]
pub mod testing;

pub use crossfade::DEFAULT_CROSSFADE_SECS;
pub use element::{MediaElement, MediaKind, RodioElement};
pub use engine::{AudioEngine, EngineState};
pub use equalizer::{EQ_BANDS, EQ_FREQUENCIES, EQ_MAX_DB, EQ_MIN_DB};
pub use events::{EngineEvent, EngineEventReceiver, EngineEventSender, engine_event_channel};
pub use graph::SignalGraph;
pub use media::{FileRef, ResourceRegistry, ResourceUri};
pub use transport::PlayState;
