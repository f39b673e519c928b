//! Loudness limiter ("normalization")
//!
//! A hard-knee dynamics compressor with fixed ratio and timing. Only the
//! threshold moves: -6 dB when normalization is on, 0 dB when off. At 0 dB
//! nothing below full scale is touched, so the stage stays in the graph
//! without coloring the signal.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use rodio::Source;

pub const LIMITER_RATIO: f32 = 20.0;
pub const LIMITER_KNEE_DB: f32 = 0.0;
pub const LIMITER_ATTACK: Duration = Duration::from_millis(3);
pub const LIMITER_RELEASE: Duration = Duration::from_millis(250);

/// Threshold while normalization is engaged
pub const THRESHOLD_ENGAGED_DB: f32 = -6.0;
/// Threshold while normalization is off
pub const THRESHOLD_DISENGAGED_DB: f32 = 0.0;

/// Below this level the detector reports silence
const SILENCE_DB: f32 = -120.0;

/// Shared limiter threshold, lock-free
#[derive(Clone)]
pub struct LimiterParams {
    threshold_db: Arc<AtomicU32>,
}

impl LimiterParams {
    pub fn new(normalization: bool) -> Self {
        let params = Self {
            threshold_db: Arc::new(AtomicU32::new(THRESHOLD_DISENGAGED_DB.to_bits())),
        };
        params.set_normalization(normalization);
        params
    }

    pub fn set_normalization(&self, enabled: bool) {
        let threshold = if enabled {
            THRESHOLD_ENGAGED_DB
        } else {
            THRESHOLD_DISENGAGED_DB
        };
        self.threshold_db
            .store(threshold.to_bits(), Ordering::Release);
    }

    pub fn normalization(&self) -> bool {
        self.threshold_db() < THRESHOLD_DISENGAGED_DB
    }

    pub fn threshold_db(&self) -> f32 {
        f32::from_bits(self.threshold_db.load(Ordering::Acquire))
    }
}

impl std::fmt::Debug for LimiterParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimiterParams")
            .field("threshold_db", &self.threshold_db())
            .finish()
    }
}

fn linear_to_db(x: f32) -> f32 {
    if x <= 0.0 {
        SILENCE_DB
    } else {
        (20.0 * x.log10()).max(SILENCE_DB)
    }
}

fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// One-pole smoothing coefficient for a time constant
fn time_coeff(time: Duration, sample_rate: u32) -> f32 {
    let samples = time.as_secs_f32() * sample_rate as f32;
    if samples <= 0.0 {
        0.0
    } else {
        (-1.0 / samples).exp()
    }
}

/// Static gain reduction in dB for an input level, hard knee
pub fn gain_reduction_db(level_db: f32, threshold_db: f32) -> f32 {
    let over = level_db - threshold_db;
    if over <= LIMITER_KNEE_DB {
        0.0
    } else {
        over * (1.0 - 1.0 / LIMITER_RATIO)
    }
}

/// Limiter Source wrapper
///
/// Detection is linked across channels: one envelope drives every channel
/// so the stereo image does not shift under reduction.
pub struct Limiter<S>
where
    S: Source<Item = f32>,
{
    source: S,
    params: LimiterParams,
    /// Smoothed gain reduction in dB (positive = quieter)
    reduction_db: f32,
    attack_coeff: f32,
    release_coeff: f32,
    channel_count: usize,
    /// Current frame, processed when the last channel arrives
    frame: Vec<f32>,
    /// Processed samples still to hand out
    pending: Vec<f32>,
    pending_pos: usize,
}

impl<S> Limiter<S>
where
    S: Source<Item = f32>,
{
    pub fn new(source: S, params: LimiterParams) -> Self {
        let sample_rate = source.sample_rate();
        let channels = source.channels().max(1) as usize;
        Self {
            source,
            params,
            reduction_db: 0.0,
            attack_coeff: time_coeff(LIMITER_ATTACK, sample_rate),
            release_coeff: time_coeff(LIMITER_RELEASE, sample_rate),
            channel_count: channels,
            frame: Vec::with_capacity(channels),
            pending: Vec::with_capacity(channels),
            pending_pos: 0,
        }
    }

    /// Pull one frame from the source and apply the current gain to it
    fn process_frame(&mut self) -> bool {
        self.frame.clear();
        for _ in 0..self.channel_count {
            match self.source.next() {
                Some(sample) => self.frame.push(sample),
                None => break,
            }
        }
        if self.frame.is_empty() {
            return false;
        }

        let peak = self.frame.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
        let target = gain_reduction_db(linear_to_db(peak), self.params.threshold_db());

        let coeff = if target > self.reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.reduction_db = target + coeff * (self.reduction_db - target);

        let gain = if self.reduction_db > 1e-4 {
            db_to_linear(-self.reduction_db)
        } else {
            1.0
        };

        self.pending.clear();
        self.pending.extend(self.frame.iter().map(|s| s * gain));
        self.pending_pos = 0;
        true
    }
}

impl<S> Iterator for Limiter<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending_pos >= self.pending.len() && !self.process_frame() {
            return None;
        }
        let sample = self.pending[self.pending_pos];
        self.pending_pos += 1;
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let buffered = self.pending.len() - self.pending_pos;
        let (lower, upper) = self.source.size_hint();
        (
            lower.saturating_add(buffered),
            upper.and_then(|u| u.checked_add(buffered)),
        )
    }
}

impl<S> Source for Limiter<S>
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

    fn total_duration(&self) -> Option<Duration> {
        self.source.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), rodio::source::SeekError> {
        self.pending.clear();
        self.pending_pos = 0;
        self.reduction_db = 0.0;
        self.source.try_seek(pos)
    }
}
