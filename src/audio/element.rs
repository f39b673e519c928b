//! Media elements
//!
//! A media element owns one decoded source and its transport state. The
//! engine keeps two of them (audio and video) and talks to whichever is
//! active. Both render through the same `SignalGraph`.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use lofty::file::AudioFile;
use lofty::probe::Probe;
use rodio::mixer::Mixer;
use rodio::{Decoder, Sink, Source};
use serde::{Deserialize, Serialize};

use super::graph::SignalGraph;
use super::media::MediaResource;
use crate::error::PlayerError;

/// Which element a track plays through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MediaKind {
    #[default]
    Audio,
    Video,
}

impl MediaKind {
    pub fn from_is_video(is_video: bool) -> Self {
        if is_video { Self::Video } else { Self::Audio }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Host media playback facility
///
/// Times are in seconds. `load` must leave the current source untouched
/// when decoding fails. Elements start paused after a load, and their
/// native volume never changes: all gain lives in the signal graph.
pub trait MediaElement {
    fn kind(&self) -> MediaKind;

    /// Decode `bytes` and make them the element's source; returns the duration if known
    fn load(&mut self, resource: &MediaResource, bytes: Arc<[u8]>) -> Result<Option<f64>, PlayerError>;

    /// Drop the current source
    fn unload(&mut self);

    fn is_loaded(&self) -> bool;

    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, secs: f64) -> Result<(), PlayerError>;

    fn current_time(&self) -> f64;

    fn duration(&self) -> Option<f64>;

    fn is_paused(&self) -> bool;

    /// Reached the natural end of the media
    fn has_ended(&self) -> bool;
}

/// Decode in-memory bytes; the whole buffer is present, so the decoder may seek
/// and size the stream, and the file extension narrows format detection
fn decode(resource: &MediaResource, bytes: Arc<[u8]>) -> Result<Decoder<Cursor<Arc<[u8]>>>, PlayerError> {
    let byte_len = bytes.len() as u64;
    let mut builder = Decoder::builder()
        .with_data(Cursor::new(bytes))
        .with_byte_len(byte_len)
        .with_seekable(true);
    if let Some(ext) = resource.extension.as_deref() {
        builder = builder.with_hint(ext);
    }
    builder.build().map_err(|e| PlayerError::Decode {
        name: resource.name.clone(),
        reason: e.to_string(),
    })
}

/// Duration from container metadata, for streams the decoder cannot size
fn probe_duration(bytes: &Arc<[u8]>) -> Option<f64> {
    let tagged = Probe::new(Cursor::new(bytes.clone()))
        .guess_file_type()
        .ok()?
        .read()
        .ok()?;
    let duration = tagged.properties().duration();
    (!duration.is_zero()).then(|| duration.as_secs_f64())
}

/// Media element backed by a rodio sink
pub struct RodioElement {
    kind: MediaKind,
    mixer: Mixer,
    graph: SignalGraph,
    sink: Option<Sink>,
    /// Source bytes kept for rebuilding after end-of-media or a failed seek
    bytes: Option<(MediaResource, Arc<[u8]>)>,
    duration: Option<f64>,
    paused: bool,
}

impl RodioElement {
    pub fn new(kind: MediaKind, mixer: Mixer, graph: SignalGraph) -> Self {
        Self {
            kind,
            mixer,
            graph,
            sink: None,
            bytes: None,
            duration: None,
            paused: true,
        }
    }

    fn stop_sink(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    /// Recreate the sink from the kept bytes, positioned at `secs`
    fn rebuild(&mut self, secs: f64) -> Result<(), PlayerError> {
        let (resource, bytes) = self
            .bytes
            .clone()
            .ok_or(PlayerError::InvalidOperation("nothing loaded"))?;
        tracing::info!("Rebuilding {} source for {}", self.kind, resource.name);

        let decoder = decode(&resource, bytes)?;
        self.stop_sink();

        let sink = Sink::connect_new(&self.mixer);
        sink.set_volume(1.0);
        sink.pause();
        sink.append(self.graph.apply(decoder));
        if secs > 0.0 {
            if let Err(e) = sink.try_seek(Duration::from_secs_f64(secs)) {
                tracing::warn!("Seek after rebuild failed: {:?}", e);
            }
        }
        if !self.paused {
            sink.play();
        }
        self.sink = Some(sink);
        Ok(())
    }
}

impl MediaElement for RodioElement {
    fn kind(&self) -> MediaKind {
        self.kind
    }

    fn load(&mut self, resource: &MediaResource, bytes: Arc<[u8]>) -> Result<Option<f64>, PlayerError> {
        let decoder = decode(resource, bytes.clone())?;
        let duration = decoder
            .total_duration()
            .map(|d| d.as_secs_f64())
            .filter(|d| *d > 0.0)
            .or_else(|| probe_duration(&bytes));

        // Decoding succeeded, only now replace the old source
        self.stop_sink();

        let sink = Sink::connect_new(&self.mixer);
        sink.set_volume(1.0);
        sink.pause();
        sink.append(self.graph.apply(decoder));

        self.sink = Some(sink);
        self.bytes = Some((resource.clone(), bytes));
        self.duration = duration;
        self.paused = true;

        tracing::info!("Loaded {} on {} element, duration: {:?}", resource.name, self.kind, duration);
        Ok(duration)
    }

    fn unload(&mut self) {
        self.stop_sink();
        self.bytes = None;
        self.duration = None;
        self.paused = true;
    }

    fn is_loaded(&self) -> bool {
        self.bytes.is_some()
    }

    fn play(&mut self) {
        if self.bytes.is_none() {
            return;
        }
        self.paused = false;
        let finished = self.sink.as_ref().is_none_or(|sink| sink.empty());
        if finished {
            // Playing again after the end starts over
            if let Err(e) = self.rebuild(0.0) {
                tracing::error!("Failed to restart {} element: {}", self.kind, e);
            }
            return;
        }
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn pause(&mut self) {
        self.paused = true;
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn seek(&mut self, secs: f64) -> Result<(), PlayerError> {
        if self.bytes.is_none() {
            return Err(PlayerError::InvalidOperation("seek with nothing loaded"));
        }
        let secs = secs.max(0.0);
        if let Some(sink) = &self.sink {
            if !sink.empty() {
                match sink.try_seek(Duration::from_secs_f64(secs)) {
                    Ok(()) => {
                        tracing::debug!("Seek to {:.2}s successful", secs);
                        return Ok(());
                    }
                    Err(e) => tracing::debug!("Direct seek failed: {:?}, will try reload", e),
                }
            }
        }
        self.rebuild(secs)
    }

    fn current_time(&self) -> f64 {
        match &self.sink {
            Some(sink) if sink.empty() && self.bytes.is_some() => self.duration.unwrap_or(0.0),
            Some(sink) => sink.get_pos().as_secs_f64(),
            None => 0.0,
        }
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn has_ended(&self) -> bool {
        !self.paused
            && self.bytes.is_some()
            && self.sink.as_ref().is_some_and(|sink| sink.empty())
    }
}
