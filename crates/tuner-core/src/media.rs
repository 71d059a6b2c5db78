//! Media abstraction: something that can open a source and hand back a
//! playable handle.
//!
//! The shipped backend is [`ClockBackend`], a simulated output whose handles
//! advance on `tokio::time` and which models the browser autoplay policy: a
//! start before the first user gesture is refused with
//! [`MediaError::NotAllowed`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::time::Instant;
use tracing::debug;

use crate::error::MediaError;

/// A single playable audio element.
pub trait MediaHandle: Send + 'static {
    fn source(&self) -> &str;
    /// Start or resume.  May be refused.
    fn play(&mut self) -> Result<(), MediaError>;
    fn pause(&mut self);
    /// Move the play head, clamped to `[0, duration]`.
    fn seek(&mut self, seconds: f64);
    fn position(&self) -> f64;
    fn duration(&self) -> Option<f64>;
    fn is_playing(&self) -> bool;
    /// True once the play head has reached the end.
    fn has_ended(&self) -> bool;
    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;
}

/// Factory for handles.
pub trait MediaBackend: Send + 'static {
    type Handle: MediaHandle;

    fn open(&self, source: &str, volume: f32) -> Result<Self::Handle, MediaError>;

    /// Open with a length declared by the content table.  Backends that read
    /// the real length from the media ignore the hint.
    fn open_with_length(
        &self,
        source: &str,
        volume: f32,
        length: Option<f64>,
    ) -> Result<Self::Handle, MediaError> {
        let _ = length;
        self.open(source, volume)
    }

    /// Record that the user interacted with the page.
    fn note_gesture(&self) {}
}

// ── Simulated clock backend ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClockBackend {
    gesture_seen: Arc<AtomicBool>,
    durations: HashMap<String, f64>,
    default_duration: f64,
    media_root: Option<PathBuf>,
}

impl ClockBackend {
    /// A non-positive or non-finite `default_duration` falls back to one
    /// second.
    pub fn new(default_duration: f64) -> Self {
        Self {
            gesture_seen: Arc::new(AtomicBool::new(false)),
            durations: HashMap::new(),
            default_duration: usable_length(default_duration).unwrap_or(1.0),
            media_root: None,
        }
    }

    /// Allow starts before any gesture.
    pub fn without_gesture_gate(self) -> Self {
        self.gesture_seen.store(true, Ordering::Relaxed);
        self
    }

    /// Only sources present under `root` can be opened.
    pub fn with_media_root(mut self, root: PathBuf) -> Self {
        self.media_root = Some(root);
        self
    }

    pub fn with_duration(mut self, source: impl Into<String>, seconds: f64) -> Self {
        if let Some(seconds) = usable_length(seconds) {
            self.durations.insert(source.into(), seconds);
        }
        self
    }

    pub fn gesture_seen(&self) -> bool {
        self.gesture_seen.load(Ordering::Relaxed)
    }
}

impl MediaBackend for ClockBackend {
    type Handle = ClockHandle;

    fn open(&self, source: &str, volume: f32) -> Result<ClockHandle, MediaError> {
        self.open_with_length(source, volume, None)
    }

    /// Declared lengths win over per-source overrides and the default.
    fn open_with_length(
        &self,
        source: &str,
        volume: f32,
        length: Option<f64>,
    ) -> Result<ClockHandle, MediaError> {
        if let Some(root) = &self.media_root {
            if !root.join(source).exists() {
                return Err(MediaError::SourceUnavailable(source.to_string()));
            }
        }
        let duration = length
            .and_then(usable_length)
            .or_else(|| self.durations.get(source).copied())
            .unwrap_or(self.default_duration);
        debug!("clock backend: open {} ({:.1}s)", source, duration);
        Ok(ClockHandle {
            source: source.to_string(),
            duration,
            volume: volume.clamp(0.0, 1.0),
            head: PlayHead::Paused { at: 0.0 },
            gesture_seen: Arc::clone(&self.gesture_seen),
        })
    }

    fn note_gesture(&self) {
        self.gesture_seen.store(true, Ordering::Relaxed);
    }
}

fn usable_length(seconds: f64) -> Option<f64> {
    (seconds.is_finite() && seconds > 0.0).then_some(seconds)
}

#[derive(Debug, Clone, Copy)]
enum PlayHead {
    Paused { at: f64 },
    Running { since: Instant, from: f64 },
}

#[derive(Debug)]
pub struct ClockHandle {
    source: String,
    duration: f64,
    volume: f32,
    head: PlayHead,
    gesture_seen: Arc<AtomicBool>,
}

impl MediaHandle for ClockHandle {
    fn source(&self) -> &str {
        &self.source
    }

    fn play(&mut self) -> Result<(), MediaError> {
        if !self.gesture_seen.load(Ordering::Relaxed) {
            return Err(MediaError::NotAllowed);
        }
        if let PlayHead::Paused { at } = self.head {
            let from = if at >= self.duration { 0.0 } else { at };
            self.head = PlayHead::Running {
                since: Instant::now(),
                from,
            };
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.head = PlayHead::Paused {
            at: self.position(),
        };
    }

    fn seek(&mut self, seconds: f64) {
        let at = seconds.max(0.0).min(self.duration);
        self.head = match self.head {
            PlayHead::Paused { .. } => PlayHead::Paused { at },
            PlayHead::Running { .. } => PlayHead::Running {
                since: Instant::now(),
                from: at,
            },
        };
    }

    fn position(&self) -> f64 {
        match self.head {
            PlayHead::Paused { at } => at,
            PlayHead::Running { since, from } => {
                (from + since.elapsed().as_secs_f64()).min(self.duration)
            }
        }
    }

    fn duration(&self) -> Option<f64> {
        Some(self.duration)
    }

    fn is_playing(&self) -> bool {
        matches!(self.head, PlayHead::Running { .. }) && !self.has_ended()
    }

    fn has_ended(&self) -> bool {
        self.position() >= self.duration
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn volume(&self) -> f32 {
        self.volume
    }
}
