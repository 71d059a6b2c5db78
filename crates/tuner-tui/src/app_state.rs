//! AppState: shared read-only data passed to all components during render
//! and key handling.
//!
//! Only the App event loop writes to it.

use tuner_core::protocol::TunerSnapshot;
use tuner_core::station::Station;

#[derive(Debug, Default)]
pub struct AppState {
    /// Latest snapshot from the core loop (`None` until the first arrives).
    pub snapshot: Option<TunerSnapshot>,
    /// Last WARN/ERROR line forwarded by the log layer.
    pub last_log: Option<String>,
    pub show_keys: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            show_keys: true,
            ..Self::default()
        }
    }

    pub fn displayed_station(&self) -> Option<&Station> {
        self.snapshot.as_ref().and_then(|s| s.displayed())
    }

    pub fn prompt_open(&self) -> bool {
        self.snapshot.as_ref().map_or(false, |s| s.prompt_open)
    }

    pub fn gesture_seen(&self) -> bool {
        self.snapshot.as_ref().map_or(false, |s| s.gesture_seen)
    }

    pub fn is_playing(&self) -> bool {
        self.snapshot.as_ref().map_or(false, |s| s.is_playing)
    }

    pub fn volume_percent(&self) -> u8 {
        self.snapshot
            .as_ref()
            .map_or(0, |s| (s.volume.clamp(0.0, 1.0) * 100.0).round() as u8)
    }
}

/// Snapshot of a freshly built engine over the built-in content.
#[cfg(test)]
pub fn sample_snapshot() -> TunerSnapshot {
    use tuner_core::config::Config;
    use tuner_core::media::ClockBackend;
    use tuner_core::station::Content;
    use tuner_core::TunerEngine;

    let content = Content::builtin().expect("built-in content");
    let engine = TunerEngine::new(content, &Config::default(), ClockBackend::new(120.0));
    engine.snapshot()
}
