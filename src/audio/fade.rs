//! Fade gain - the automatable gain stage used for crossfades
//!
//! Holds at most one automation event: either a fixed value or a single
//! linear ramp with start/end times on the processing clock. Scheduling a
//! new event replaces the old one, so ramps can never stack.
//!
//! Writes go through a small seqlock (odd generation = write in progress)
//! so the audio thread never takes a lock and never sees a torn ramp.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use rodio::Source;

use super::clock::{ProcessingClock, flicks_to_secs};

/// A scheduled linear ramp, times in flicks on the processing clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeRamp {
    pub from: f32,
    pub target: f32,
    pub start: u64,
    pub end: u64,
}

impl FadeRamp {
    /// Gain at processing time `now`
    pub fn value_at(&self, now: u64) -> f32 {
        if now <= self.start {
            return self.from;
        }
        if now >= self.end {
            return self.target;
        }
        let progress = (now - self.start) as f64 / (self.end - self.start) as f64;
        self.from + (self.target - self.from) * progress as f32
    }

    pub fn start_secs(&self) -> f64 {
        flicks_to_secs(self.start)
    }

    pub fn end_secs(&self) -> f64 {
        flicks_to_secs(self.end)
    }

    /// Ramp length in seconds
    pub fn duration_secs(&self) -> f64 {
        flicks_to_secs(self.end.saturating_sub(self.start))
    }
}

const MODE_HOLD: u8 = 0;
const MODE_RAMP: u8 = 1;

/// Shared fade control handle
///
/// Clone this to control the fade from outside the audio thread.
#[derive(Clone)]
pub struct FadeControl {
    inner: Arc<FadeControlInner>,
}

struct FadeControlInner {
    mode: AtomicU8,
    /// Held value, or ramp start value in ramp mode (f32 bits)
    from: AtomicU32,
    target: AtomicU32,
    start: AtomicU64,
    end: AtomicU64,
    /// Seqlock counter, odd while a write is in progress
    generation: AtomicU32,
    /// Last value the renderer applied (f32 bits)
    rendered: AtomicU32,
}

/// What the renderer reads out of the control
#[derive(Debug, Clone, Copy, PartialEq)]
enum Automation {
    Hold(f32),
    Ramp(FadeRamp),
}

impl Automation {
    fn value_at(&self, now: u64) -> f32 {
        match self {
            Self::Hold(value) => *value,
            Self::Ramp(ramp) => ramp.value_at(now),
        }
    }
}

impl FadeControl {
    pub fn new(initial: f32) -> Self {
        let initial = initial.clamp(0.0, 1.0);
        Self {
            inner: Arc::new(FadeControlInner {
                mode: AtomicU8::new(MODE_HOLD),
                from: AtomicU32::new(initial.to_bits()),
                target: AtomicU32::new(initial.to_bits()),
                start: AtomicU64::new(0),
                end: AtomicU64::new(0),
                generation: AtomicU32::new(0),
                rendered: AtomicU32::new(initial.to_bits()),
            }),
        }
    }

    fn write(&self, automation: Automation) {
        let inner = &self.inner;
        inner.generation.fetch_add(1, Ordering::AcqRel);
        match automation {
            Automation::Hold(value) => {
                inner.from.store(value.to_bits(), Ordering::Relaxed);
                inner.target.store(value.to_bits(), Ordering::Relaxed);
                inner.mode.store(MODE_HOLD, Ordering::Relaxed);
            }
            Automation::Ramp(ramp) => {
                inner.from.store(ramp.from.to_bits(), Ordering::Relaxed);
                inner.target.store(ramp.target.to_bits(), Ordering::Relaxed);
                inner.start.store(ramp.start, Ordering::Relaxed);
                inner.end.store(ramp.end, Ordering::Relaxed);
                inner.mode.store(MODE_RAMP, Ordering::Relaxed);
            }
        }
        inner.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Consistent snapshot, or `None` if a write raced the read
    fn read(&self) -> Option<(u32, Automation)> {
        let inner = &self.inner;
        let before = inner.generation.load(Ordering::Acquire);
        if before % 2 == 1 {
            return None;
        }
        let mode = inner.mode.load(Ordering::Relaxed);
        let from = f32::from_bits(inner.from.load(Ordering::Relaxed));
        let target = f32::from_bits(inner.target.load(Ordering::Relaxed));
        let start = inner.start.load(Ordering::Relaxed);
        let end = inner.end.load(Ordering::Relaxed);
        let after = inner.generation.load(Ordering::Acquire);
        if before != after {
            return None;
        }
        let automation = if mode == MODE_RAMP {
            Automation::Ramp(FadeRamp {
                from,
                target,
                start,
                end,
            })
        } else {
            Automation::Hold(from)
        };
        Some((after, automation))
    }

    /// Jump to `value` now, dropping any scheduled ramp
    pub fn set_value(&self, value: f32) {
        self.write(Automation::Hold(value.clamp(0.0, 1.0)));
    }

    /// Drop any scheduled ramp, holding the last rendered value
    pub fn cancel_scheduled_values(&self) {
        self.write(Automation::Hold(self.value()));
    }

    /// Ramp linearly from the current value to `target`, starting at `now`
    /// and arriving exactly at `end` (both on the processing clock)
    pub fn linear_ramp_to_value_at_time(&self, target: f32, now: u64, end: u64) -> FadeRamp {
        let ramp = FadeRamp {
            from: self.value(),
            target: target.clamp(0.0, 1.0),
            start: now,
            end: end.max(now),
        };
        self.write(Automation::Ramp(ramp));
        ramp
    }

    /// The ramp currently scheduled, if any
    pub fn scheduled_ramp(&self) -> Option<FadeRamp> {
        match self.read() {
            Some((_, Automation::Ramp(ramp))) => Some(ramp),
            _ => None,
        }
    }

    /// Gain most recently applied by the renderer
    pub fn value(&self) -> f32 {
        f32::from_bits(self.inner.rendered.load(Ordering::Acquire))
    }

    /// Gain the automation prescribes at processing time `now`
    pub fn value_at(&self, now: u64) -> f32 {
        self.read()
            .map(|(_, automation)| automation.value_at(now))
            .unwrap_or_else(|| self.value())
    }

    fn publish(&self, value: f32) {
        self.inner
            .rendered
            .store(value.to_bits(), Ordering::Release);
    }
}

impl Default for FadeControl {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl std::fmt::Debug for FadeControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FadeControl")
            .field("value", &self.value())
            .field("ramp", &self.scheduled_ramp())
            .finish()
    }
}

/// Fade gain Source wrapper
///
/// Evaluates the automation once per frame against the processing clock.
pub struct FadeEnvelope<S>
where
    S: Source<Item = f32>,
{
    source: S,
    control: FadeControl,
    clock: ProcessingClock,
    automation: Automation,
    last_generation: u32,
    gain: f32,
    channels: u16,
    current_channel: u16,
}

impl<S> FadeEnvelope<S>
where
    S: Source<Item = f32>,
{
    pub fn new(source: S, control: FadeControl, clock: ProcessingClock) -> Self {
        let channels = source.channels().max(1);
        let gain = control.value();
        Self {
            source,
            control,
            clock,
            automation: Automation::Hold(gain),
            last_generation: u32::MAX,
            gain,
            channels,
            current_channel: 0,
        }
    }

    fn refresh(&mut self) {
        if let Some((generation, automation)) = self.control.read() {
            if generation != self.last_generation {
                self.last_generation = generation;
                self.automation = automation;
            }
        }
        self.gain = self.automation.value_at(self.clock.now());
        self.control.publish(self.gain);
    }
}

impl<S> Iterator for FadeEnvelope<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_channel == 0 {
            self.refresh();
        }
        let sample = self.source.next()?;
        self.current_channel = (self.current_channel + 1) % self.channels;
        Some(sample * self.gain)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.source.size_hint()
    }
}

impl<S> Source for FadeEnvelope<S>
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
        self.current_channel = 0;
        self.source.try_seek(pos)
    }
}
