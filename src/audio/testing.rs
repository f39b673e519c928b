//! In-memory media element for engine and controller tests
//!
//! Payload format: `dur:<seconds>` decodes with that duration, `nodur`
//! decodes with unknown duration, anything else fails to decode. Time only
//! moves when a test calls `FakeHandle::set_time` or `finish`.

use std::sync::Arc;

use parking_lot::Mutex;

use super::element::{MediaElement, MediaKind};
use super::media::{FileRef, MediaResource};
use crate::error::PlayerError;

#[derive(Debug, Default)]
pub struct FakeState {
    pub loaded: Option<String>,
    pub duration: Option<f64>,
    pub time: f64,
    pub paused: bool,
    pub ended: bool,
    pub loads: usize,
}

/// Test-side view of a fake element
#[derive(Clone, Default)]
pub struct FakeHandle(Arc<Mutex<FakeState>>);

impl FakeHandle {
    pub fn set_time(&self, secs: f64) {
        self.0.lock().time = secs;
    }

    /// Simulate natural end of media
    pub fn finish(&self) {
        let mut state = self.0.lock();
        state.time = state.duration.unwrap_or(state.time);
        state.ended = true;
    }

    pub fn loaded(&self) -> Option<String> {
        self.0.lock().loaded.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.0.lock().paused
    }

    pub fn time(&self) -> f64 {
        self.0.lock().time
    }

    pub fn loads(&self) -> usize {
        self.0.lock().loads
    }
}

pub struct FakeElement {
    kind: MediaKind,
    state: FakeHandle,
}

impl FakeElement {
    pub fn new(kind: MediaKind) -> (Self, FakeHandle) {
        let state = FakeHandle::default();
        state.0.lock().paused = true;
        (
            Self {
                kind,
                state: state.clone(),
            },
            state,
        )
    }
}

/// In-memory track with a known duration
pub fn track_file(name: &str, duration: f64) -> FileRef {
    FileRef::memory(name, format!("dur:{}", duration).into_bytes())
}

/// In-memory track the element cannot decode
pub fn corrupt_file(name: &str) -> FileRef {
    FileRef::memory(name, b"corrupt".to_vec())
}

impl MediaElement for FakeElement {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn load(&mut self, resource: &MediaResource, bytes: Arc<[u8]>) -> Result<Option<f64>, PlayerError> {
        let text = String::from_utf8_lossy(&bytes);
        let duration = if text == "nodur" {
            None
        } else {
            let secs = text
                .strip_prefix("dur:")
                .and_then(|d| d.parse::<f64>().ok())
                .ok_or_else(|| PlayerError::Decode {
                    name: resource.name.clone(),
                    reason: "unrecognized payload".into(),
                })?;
            Some(secs)
        };

        let mut state = self.state.0.lock();
        state.loaded = Some(resource.name.clone());
        state.duration = duration;
        state.time = 0.0;
        state.paused = true;
        state.ended = false;
        state.loads += 1;
        Ok(duration)
    }

    fn unload(&mut self) {
        let mut state = self.state.0.lock();
        state.loaded = None;
        state.duration = None;
        state.time = 0.0;
        state.paused = true;
        state.ended = false;
    }

    fn is_loaded(&self) -> bool {
        self.state.0.lock().loaded.is_some()
    }

    fn play(&mut self) {
        let mut state = self.state.0.lock();
        if state.loaded.is_some() {
            if state.ended {
                state.ended = false;
                state.time = 0.0;
            }
            state.paused = false;
        }
    }

    fn pause(&mut self) {
        self.state.0.lock().paused = true;
    }

    fn seek(&mut self, secs: f64) -> Result<(), PlayerError> {
        let mut state = self.state.0.lock();
        if state.loaded.is_none() {
            return Err(PlayerError::InvalidOperation("seek with nothing loaded"));
        }
        state.time = secs.max(0.0);
        state.ended = false;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.state.0.lock().time
    }

    fn duration(&self) -> Option<f64> {
        self.state.0.lock().duration
    }

    fn is_paused(&self) -> bool {
        self.state.0.lock().paused
    }

    fn has_ended(&self) -> bool {
        let state = self.state.0.lock();
        state.ended && !state.paused
    }
}
