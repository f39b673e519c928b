//! Transport controls over the active media element

use super::clock::ProcessingContext;
use super::element::{MediaElement, MediaKind};
use crate::error::PlayerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Playing,
    Paused,
}

/// Play/pause/seek against whichever element is active
pub struct Transport {
    audio: Box<dyn MediaElement>,
    video: Box<dyn MediaElement>,
    active: MediaKind,
    context: ProcessingContext,
}

impl Transport {
    pub fn new(
        audio: Box<dyn MediaElement>,
        video: Box<dyn MediaElement>,
        context: ProcessingContext,
    ) -> Self {
        Self {
            audio,
            video,
            active: MediaKind::Audio,
            context,
        }
    }

    pub fn active_kind(&self) -> MediaKind {
        self.active
    }

    pub fn element(&self, kind: MediaKind) -> &dyn MediaElement {
        match kind {
            MediaKind::Audio => self.audio.as_ref(),
            MediaKind::Video => self.video.as_ref(),
        }
    }

    pub fn element_mut(&mut self, kind: MediaKind) -> &mut dyn MediaElement {
        match kind {
            MediaKind::Audio => self.audio.as_mut(),
            MediaKind::Video => self.video.as_mut(),
        }
    }

    fn active(&self) -> &dyn MediaElement {
        self.element(self.active)
    }

    fn active_mut(&mut self) -> &mut dyn MediaElement {
        self.element_mut(self.active)
    }

    /// Make `kind` the active element, silencing the other one
    pub fn activate(&mut self, kind: MediaKind) {
        if self.active != kind {
            tracing::debug!("Switching active element: {} -> {}", self.active, kind);
            self.active_mut().unload();
            self.active = kind;
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.active().is_loaded()
    }

    fn require_loaded(&self, op: &'static str) -> Result<(), PlayerError> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(PlayerError::InvalidOperation(op))
        }
    }

    /// Resume the processing context, then start the element
    pub fn play(&mut self) -> Result<(), PlayerError> {
        self.require_loaded("play with nothing loaded")?;
        if self.context.resume() {
            tracing::debug!("Processing context resumed");
        }
        self.active_mut().play();
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), PlayerError> {
        self.require_loaded("pause with nothing loaded")?;
        self.active_mut().pause();
        Ok(())
    }

    /// Pause and rewind to the start
    pub fn stop(&mut self) -> Result<(), PlayerError> {
        self.require_loaded("stop with nothing loaded")?;
        let element = self.active_mut();
        element.pause();
        element.seek(0.0)
    }

    pub fn seek(&mut self, secs: f64) -> Result<(), PlayerError> {
        self.require_loaded("seek with nothing loaded")?;
        let secs = match self.duration() {
            Some(duration) => secs.clamp(0.0, duration),
            None => secs.max(0.0),
        };
        self.active_mut().seek(secs)
    }

    pub fn current_time(&self) -> f64 {
        self.active().current_time()
    }

    pub fn duration(&self) -> Option<f64> {
        self.active().duration()
    }

    pub fn play_state(&self) -> PlayState {
        if self.active().is_paused() {
            PlayState::Paused
        } else {
            PlayState::Playing
        }
    }

    pub fn has_ended(&self) -> bool {
        self.active().has_ended()
    }

    /// Unload both elements
    pub fn unload_all(&mut self) {
        self.audio.unload();
        self.video.unload();
    }
}
