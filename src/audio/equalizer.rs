//! 5-band equalizer using biquad filters
//!
//! Bands: 60Hz low-shelf, 250Hz / 1kHz / 4kHz peaking (Q=1), 12kHz high-shelf.
//! Coefficients follow the RBJ audio EQ cookbook with shelf slope S=1.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use rodio::Source;

use crate::error::clamp_param;

/// Number of EQ bands
pub const EQ_BANDS: usize = 5;

/// Band center frequencies in Hz
pub const EQ_FREQUENCIES: [f32; EQ_BANDS] = [60.0, 250.0, 1000.0, 4000.0, 12000.0];

/// Gain range accepted by every band, in dB
pub const EQ_MIN_DB: f32 = -12.0;
pub const EQ_MAX_DB: f32 = 12.0;

/// Q of the three peaking bands
const PEAKING_Q: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandKind {
    LowShelf,
    Peaking,
    HighShelf,
}

/// Filter type of each band
pub const EQ_KINDS: [BandKind; EQ_BANDS] = [
    BandKind::LowShelf,
    BandKind::Peaking,
    BandKind::Peaking,
    BandKind::Peaking,
    BandKind::HighShelf,
];

/// Biquad filter coefficients, normalized by a0
#[derive(Debug, Clone, Copy, PartialEq)]
struct BiquadCoeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl BiquadCoeffs {
    const UNITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn normalized(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    #[cfg(test)]
    fn dc_gain(&self) -> f32 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::UNITY
    }
}

/// Biquad filter state for one channel
#[derive(Clone, Copy, Default)]
struct BiquadState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadState {
    fn process(&mut self, coeffs: &BiquadCoeffs, input: f32) -> f32 {
        let output = coeffs.b0 * input + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Coefficients for one band
fn band_coeffs(kind: BandKind, freq: f32, gain_db: f32, sample_rate: f32) -> BiquadCoeffs {
    if gain_db.abs() < 0.01 || sample_rate <= 0.0 {
        return BiquadCoeffs::UNITY;
    }

    // Keep the 12kHz shelf below Nyquist at low sample rates
    let freq = freq.min(sample_rate * 0.45);

    let a = 10.0_f32.powf(gain_db / 40.0);
    let omega = 2.0 * std::f32::consts::PI * freq / sample_rate;
    let sin_omega = omega.sin();
    let cos_omega = omega.cos();

    match kind {
        BandKind::Peaking => {
            let alpha = sin_omega / (2.0 * PEAKING_Q);
            BiquadCoeffs::normalized(
                1.0 + alpha * a,
                -2.0 * cos_omega,
                1.0 - alpha * a,
                1.0 + alpha / a,
                -2.0 * cos_omega,
                1.0 - alpha / a,
            )
        }
        BandKind::LowShelf => {
            let alpha = sin_omega / 2.0 * std::f32::consts::SQRT_2;
            let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
            BiquadCoeffs::normalized(
                a * ((a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha),
                2.0 * a * ((a - 1.0) - (a + 1.0) * cos_omega),
                a * ((a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha),
                (a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha,
                -2.0 * ((a - 1.0) + (a + 1.0) * cos_omega),
                (a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha,
            )
        }
        BandKind::HighShelf => {
            let alpha = sin_omega / 2.0 * std::f32::consts::SQRT_2;
            let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;
            BiquadCoeffs::normalized(
                a * ((a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha),
                -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
                a * ((a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha),
                (a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha,
                2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
                (a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha,
            )
        }
    }
}

/// Shared equalizer gains, writable while audio renders
///
/// Gains are stored as f32 bits in atomics. Every write bumps `generation`
/// so each rendering `Equalizer` knows to recompute its coefficients.
#[derive(Clone)]
pub struct EqualizerParams {
    inner: Arc<EqualizerParamsInner>,
}

struct EqualizerParamsInner {
    gains: [AtomicU32; EQ_BANDS],
    generation: AtomicU32,
}

impl EqualizerParams {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(EqualizerParamsInner {
                gains: std::array::from_fn(|_| AtomicU32::new(0.0_f32.to_bits())),
                generation: AtomicU32::new(0),
            }),
        }
    }

    /// Set a single band gain, clamped to [-12, 12] dB
    ///
    /// Returns the stored value, or `None` when `band` does not exist.
    pub fn set_band_gain(&self, band: usize, gain_db: f32) -> Option<f32> {
        let slot = self.inner.gains.get(band)?;
        let gain_db = clamp_param("eq band gain", gain_db, EQ_MIN_DB, EQ_MAX_DB);
        slot.store(gain_db.to_bits(), Ordering::Release);
        self.inner.generation.fetch_add(1, Ordering::Release);
        Some(gain_db)
    }

    /// Set all band gains at once (each clamped)
    pub fn set_gains(&self, gains: [f32; EQ_BANDS]) {
        for (slot, gain) in self.inner.gains.iter().zip(gains) {
            let gain = clamp_param("eq band gain", gain, EQ_MIN_DB, EQ_MAX_DB);
            slot.store(gain.to_bits(), Ordering::Release);
        }
        self.inner.generation.fetch_add(1, Ordering::Release);
    }

    pub fn band_gain(&self, band: usize) -> Option<f32> {
        self.inner
            .gains
            .get(band)
            .map(|slot| f32::from_bits(slot.load(Ordering::Acquire)))
    }

    pub fn gains(&self) -> [f32; EQ_BANDS] {
        std::array::from_fn(|i| f32::from_bits(self.inner.gains[i].load(Ordering::Acquire)))
    }

    fn generation(&self) -> u32 {
        self.inner.generation.load(Ordering::Acquire)
    }
}

impl Default for EqualizerParams {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EqualizerParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EqualizerParams")
            .field("gains", &self.gains())
            .finish()
    }
}

/// 5-band equalizer Source wrapper
pub struct Equalizer<S>
where
    S: Source<Item = f32>,
{
    source: S,
    params: EqualizerParams,
    coeffs: [BiquadCoeffs; EQ_BANDS],
    // One filter state per band, per channel
    states: Vec<[BiquadState; EQ_BANDS]>,
    // Channel of the next interleaved sample
    current_channel: usize,
    last_generation: u32,
    sample_rate: u32,
}

impl<S> Equalizer<S>
where
    S: Source<Item = f32>,
{
    pub fn new(source: S, params: EqualizerParams) -> Self {
        let channels = source.channels().max(1) as usize;
        let sample_rate = source.sample_rate();
        let last_generation = params.generation();

        let mut eq = Self {
            source,
            params,
            coeffs: [BiquadCoeffs::UNITY; EQ_BANDS],
            states: vec![[BiquadState::default(); EQ_BANDS]; channels],
            current_channel: 0,
            last_generation,
            sample_rate,
        };

        eq.update_coefficients();
        eq
    }

    fn update_coefficients(&mut self) {
        let gains = self.params.gains();
        for band in 0..EQ_BANDS {
            self.coeffs[band] = band_coeffs(
                EQ_KINDS[band],
                EQ_FREQUENCIES[band],
                gains[band],
                self.sample_rate as f32,
            );
        }
    }
}

impl<S> Iterator for Equalizer<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        // Only recompute at frame boundaries so both channels share coefficients
        if self.current_channel == 0 {
            let generation = self.params.generation();
            if generation != self.last_generation {
                self.last_generation = generation;
                self.update_coefficients();
            }
        }

        let sample = self.source.next()?;

        let channel = self.current_channel;
        let mut output = sample;
        for (band, coeff) in self.coeffs.iter().enumerate() {
            output = self.states[channel][band].process(coeff, output);
        }

        self.current_channel = (self.current_channel + 1) % self.states.len();
        Some(output)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.source.size_hint()
    }
}

impl<S> Source for Equalizer<S>
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
        // Stale filter memory would click on the first samples after the jump
        for channel_states in &mut self.states {
            for state in channel_states {
                state.reset();
            }
        }
        self.current_channel = 0;
        self.source.try_seek(pos)
    }
}
