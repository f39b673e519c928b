//! Signal graph
//!
//! The fixed processing chain every media element renders through:
//! - 5-band equalizer
//! - Limiter (loudness normalization)
//! - Master gain (user volume)
//! - Fade gain (crossfade automation)
//! - Clock / context gate
//!
//! The graph holds only shared parameter handles, so it can be cloned into
//! both media elements and into the engine. Every parameter write is a
//! lock-free atomic store picked up by the rendering sources.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use rodio::Source;

use super::clock::{Clocked, ProcessingClock, ProcessingContext};
use super::equalizer::{EQ_BANDS, Equalizer, EqualizerParams};
use super::fade::{FadeControl, FadeEnvelope};
use super::limiter::{Limiter, LimiterParams};
use crate::error::clamp_param;

/// Shared signal graph parameters
#[derive(Clone)]
pub struct SignalGraph {
    eq: EqualizerParams,
    limiter: LimiterParams,
    /// Master gain in [0, 1], f32 bits
    master_gain: Arc<AtomicU32>,
    fade: FadeControl,
    clock: ProcessingClock,
    context: ProcessingContext,
}

impl SignalGraph {
    /// Build the graph with flat EQ, normalization on and full volume
    pub fn new() -> Self {
        Self {
            eq: EqualizerParams::new(),
            limiter: LimiterParams::new(true),
            master_gain: Arc::new(AtomicU32::new(1.0_f32.to_bits())),
            fade: FadeControl::new(1.0),
            clock: ProcessingClock::new(),
            context: ProcessingContext::new(),
        }
    }

    // ========================================================================
    // Equalizer
    // ========================================================================

    /// Set one band's gain in dB; out-of-range gains are clamped
    pub fn set_eq_band(&self, band: usize, gain_db: f32) -> Option<f32> {
        self.eq.set_band_gain(band, gain_db)
    }

    pub fn set_eq_gains(&self, gains: [f32; EQ_BANDS]) {
        self.eq.set_gains(gains);
    }

    pub fn eq_gains(&self) -> [f32; EQ_BANDS] {
        self.eq.gains()
    }

    // ========================================================================
    // Limiter
    // ========================================================================

    pub fn set_normalization(&self, enabled: bool) {
        self.limiter.set_normalization(enabled);
    }

    pub fn normalization(&self) -> bool {
        self.limiter.normalization()
    }

    pub fn limiter_threshold_db(&self) -> f32 {
        self.limiter.threshold_db()
    }

    // ========================================================================
    // Gains
    // ========================================================================

    /// Map a 0-100 volume control onto the master gain
    pub fn set_volume(&self, volume: f32) -> f32 {
        let volume = clamp_param("volume", volume, 0.0, 100.0);
        let gain = volume / 100.0;
        self.master_gain.store(gain.to_bits(), Ordering::Release);
        gain
    }

    pub fn master_gain(&self) -> f32 {
        f32::from_bits(self.master_gain.load(Ordering::Acquire))
    }

    pub fn fade(&self) -> &FadeControl {
        &self.fade
    }

    // ========================================================================
    // Clock and context
    // ========================================================================

    pub fn clock(&self) -> &ProcessingClock {
        &self.clock
    }

    pub fn context(&self) -> &ProcessingContext {
        &self.context
    }

    // ========================================================================
    // Source processing
    // ========================================================================

    /// Route a decoded source through the graph
    ///
    /// Processing order: EQ, limiter, master gain, fade gain, clock.
    pub fn apply<S>(&self, source: S) -> ProcessedSource<S>
    where
        S: Source<Item = f32>,
    {
        ProcessedSource::new(source, self)
    }
}

impl Default for SignalGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SignalGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalGraph")
            .field("eq", &self.eq)
            .field("limiter", &self.limiter)
            .field("master_gain", &self.master_gain())
            .field("fade", &self.fade)
            .field("context", &self.context)
            .finish()
    }
}

/// Audio source with the signal graph applied
pub struct ProcessedSource<S>
where
    S: Source<Item = f32>,
{
    inner: Clocked<FadeEnvelope<MasterGain<Limiter<Equalizer<S>>>>>,
}

impl<S> ProcessedSource<S>
where
    S: Source<Item = f32>,
{
    fn new(source: S, graph: &SignalGraph) -> Self {
        let eq = Equalizer::new(source, graph.eq.clone());
        let limited = Limiter::new(eq, graph.limiter.clone());
        let gained = MasterGain::new(limited, graph.master_gain.clone());
        let faded = FadeEnvelope::new(gained, graph.fade.clone(), graph.clock.clone());
        let clocked = Clocked::new(faded, graph.clock.clone(), graph.context.clone());
        Self { inner: clocked }
    }
}

impl<S> Iterator for ProcessedSource<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S> Source for ProcessedSource<S>
where
    S: Source<Item = f32>,
{
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<std::time::Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: std::time::Duration) -> Result<(), rodio::source::SeekError> {
        self.inner.try_seek(pos)
    }
}

/// Master gain stage
struct MasterGain<S>
where
    S: Source<Item = f32>,
{
    source: S,
    gain: Arc<AtomicU32>,
}

impl<S> MasterGain<S>
where
    S: Source<Item = f32>,
{
    fn new(source: S, gain: Arc<AtomicU32>) -> Self {
        Self { source, gain }
    }
}

impl<S> Iterator for MasterGain<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        let sample = self.source.next()?;
        let gain = f32::from_bits(self.gain.load(Ordering::Relaxed));
        Some(sample * gain)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.source.size_hint()
    }
}

impl<S> Source for MasterGain<S>
where
    S: Source<Item = f32>,
{
    fn current_span_len(&self) -> Option<usize> {
        self.source.current_span_len()
    }

    fn channels(&self) -> u16 {
        self.source.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.source.sample_rate()
    }

    fn total_duration(&self) -> Option<std::time::Duration> {
        self.source.total_duration()
    }

    fn try_seek(&mut self, pos: std::time::Duration) -> Result<(), rodio::source::SeekError> {
        self.source.try_seek(pos)
    }
}
