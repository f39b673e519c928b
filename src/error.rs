//! Error types for the playback core
//!
//! `Resource` and `Decode` come out of track loading and are recovered by the
//! controller (state rolls back, the message goes to the UI). `InvalidOperation`
//! marks transport calls made with nothing loaded; callers treat it as a no-op.
//! Out-of-range parameters are never an error, they are clamped by [`clamp_param`].

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    #[error("Cannot read {name}: {reason}")]
    Resource { name: String, reason: String },

    #[error("Cannot decode {name}: {reason}")]
    Decode { name: String, reason: String },

    #[error("Invalid operation: {0}")]
    InvalidOperation(&'static str),
}

impl PlayerError {
    /// Whether this error came out of a failed load
    pub fn is_load_failure(&self) -> bool {
        matches!(self, Self::Resource { .. } | Self::Decode { .. })
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;

/// Clamp a user-facing parameter into `[min, max]`, logging when it was out of range
pub fn clamp_param(name: &'static str, value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        tracing::warn!("{} is NaN, using {}", name, min);
        return min;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        tracing::warn!("{} out of range: {} (clamped to {})", name, value, clamped);
    }
    clamped
}
