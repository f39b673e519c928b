//! Processing clock and context state
//!
//! The clock counts rendered frames, not wall time, so gain automation lands on
//! exact sample boundaries. Time is kept in flicks (1/705_600_000 s): every
//! common sample rate divides it evenly, so per-frame advances never drift.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use rodio::Source;

/// Ticks per second
pub const FLICKS_PER_SECOND: u64 = 705_600_000;

/// Flicks covered by one frame at `sample_rate`
pub fn flicks_per_frame(sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    FLICKS_PER_SECOND / sample_rate as u64
}

pub fn flicks_to_secs(flicks: u64) -> f64 {
    flicks as f64 / FLICKS_PER_SECOND as f64
}

pub fn secs_to_flicks(secs: f64) -> u64 {
    if secs <= 0.0 {
        0
    } else {
        (secs * FLICKS_PER_SECOND as f64).round() as u64
    }
}

/// Shared render clock, advanced by the graph's output stage
#[derive(Clone, Default)]
pub struct ProcessingClock {
    flicks: Arc<AtomicU64>,
}

impl ProcessingClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current processing time in flicks
    pub fn now(&self) -> u64 {
        self.flicks.load(Ordering::Acquire)
    }

    /// Current processing time in seconds
    pub fn now_secs(&self) -> f64 {
        flicks_to_secs(self.now())
    }

    /// Advance by one rendered frame
    pub fn advance_frame(&self, sample_rate: u32) {
        self.flicks
            .fetch_add(flicks_per_frame(sample_rate), Ordering::AcqRel);
    }
}

impl std::fmt::Debug for ProcessingClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingClock")
            .field("secs", &self.now_secs())
            .finish()
    }
}

/// Lifecycle of the processing context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not yet allowed to render
    Suspended,
    Running,
    /// Disposed, never renders again
    Closed,
}

impl ContextState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Running,
            2 => Self::Closed,
            _ => Self::Suspended,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Suspended => 0,
            Self::Running => 1,
            Self::Closed => 2,
        }
    }
}

/// Render gate shared by every processed source
///
/// Starts suspended. `resume` is synchronous and idempotent, so a `pause`
/// issued right after `play` can never be overtaken by a late resume.
#[derive(Clone)]
pub struct ProcessingContext {
    state: Arc<AtomicU8>,
}

impl ProcessingContext {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(ContextState::Suspended.as_u8())),
        }
    }

    pub fn state(&self) -> ContextState {
        ContextState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == ContextState::Running
    }

    /// Resume rendering; returns true if the context was suspended
    pub fn resume(&self) -> bool {
        self.state
            .compare_exchange(
                ContextState::Suspended.as_u8(),
                ContextState::Running.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub fn close(&self) {
        self.state
            .store(ContextState::Closed.as_u8(), Ordering::Release);
    }
}

impl Default for ProcessingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProcessingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ProcessingContext")
            .field(&self.state())
            .finish()
    }
}

/// Last stage of the graph: gates output on the context and advances the clock
///
/// While suspended it emits silence without pulling from the inner source,
/// so the track position does not move. A closed context ends the source.
pub struct Clocked<S>
where
    S: Source<Item = f32>,
{
    source: S,
    clock: ProcessingClock,
    context: ProcessingContext,
    channels: u16,
    sample_rate: u32,
    current_channel: u16,
}

impl<S> Clocked<S>
where
    S: Source<Item = f32>,
{
    pub fn new(source: S, clock: ProcessingClock, context: ProcessingContext) -> Self {
        let channels = source.channels().max(1);
        let sample_rate = source.sample_rate();
        Self {
            source,
            clock,
            context,
            channels,
            sample_rate,
            current_channel: 0,
        }
    }
}

impl<S> Iterator for Clocked<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        match self.context.state() {
            ContextState::Closed => return None,
            // Only gate on frame boundaries so channels never get swapped
            ContextState::Suspended if self.current_channel == 0 => return Some(0.0),
            _ => {}
        }

        let sample = self.source.next()?;
        self.current_channel += 1;
        if self.current_channel >= self.channels {
            self.current_channel = 0;
            self.clock.advance_frame(self.sample_rate);
        }
        Some(sample)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.source.size_hint()
    }
}

impl<S> Source for Clocked<S>
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
