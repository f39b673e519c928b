//! Crossfade scheduling
//!
//! Watches the active element's position and decides when the fade-out
//! starts. The decision is pure; the engine turns it into a ramp on the
//! fade gain. Once latched, a track never schedules a second fade.

use super::element::MediaKind;

/// Default crossfade window in seconds
pub const DEFAULT_CROSSFADE_SECS: f64 = 3.0;

/// Fade-out decided by the scheduler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeOut {
    /// Seconds left until natural end; the ramp must last exactly this long
    pub remaining: f64,
}

#[derive(Debug, Clone)]
pub struct CrossfadeScheduler {
    enabled: bool,
    duration_secs: f64,
    is_crossfading: bool,
}

impl CrossfadeScheduler {
    pub fn new() -> Self {
        Self {
            enabled: false,
            duration_secs: DEFAULT_CROSSFADE_SECS,
            is_crossfading: false,
        }
    }

    pub fn set_config(&mut self, enabled: bool, duration_secs: f64) {
        self.enabled = enabled;
        if duration_secs.is_finite() && duration_secs >= 0.0 {
            self.duration_secs = duration_secs;
        } else {
            tracing::warn!("Ignoring invalid crossfade duration: {}", duration_secs);
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    pub fn is_crossfading(&self) -> bool {
        self.is_crossfading
    }

    /// Clear the latch for a fresh track
    pub fn reset(&mut self) {
        self.is_crossfading = false;
    }

    /// Clear the latch after a seek lands back before the window
    ///
    /// Returns true when a fade-out was in progress and must be undone.
    pub fn rearm(&mut self, position: f64, duration: Option<f64>) -> bool {
        if !self.is_crossfading {
            return false;
        }
        let before_window = match duration.filter(|d| d.is_finite() && *d > 0.0) {
            Some(duration) => duration - position > self.duration_secs,
            None => true,
        };
        if before_window {
            self.is_crossfading = false;
        }
        before_window
    }

    /// Position tick; returns the fade-out to schedule, at most once per track
    pub fn on_time_update(
        &mut self,
        kind: MediaKind,
        position: f64,
        duration: Option<f64>,
    ) -> Option<FadeOut> {
        if kind != MediaKind::Audio || !self.enabled || self.is_crossfading {
            return None;
        }
        let duration = duration.filter(|d| d.is_finite() && *d > 0.0)?;
        let remaining = duration - position;
        if remaining > 0.0 && remaining <= self.duration_secs {
            self.is_crossfading = true;
            Some(FadeOut { remaining })
        } else {
            None
        }
    }
}

impl Default for CrossfadeScheduler {
    fn default() -> Self {
        Self::new()
    }
}
