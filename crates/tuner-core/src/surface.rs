//! Anything that can make sound registers as a [`PlaybackSurface`] so the
//! coordinator can silence everything with one sweep.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::media::MediaHandle;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SurfaceId {
    Main,
    Narrative,
    Cards,
}

pub trait PlaybackSurface: Send {
    fn surface_id(&self) -> SurfaceId;

    /// Number of handles on this surface that are producing audio.
    fn playing_count(&self) -> usize;

    fn is_playing(&self) -> bool {
        self.playing_count() > 0
    }

    /// Silence the surface immediately.
    fn halt(&mut self);
}

/// The main tuner's audio element plus the flag the UI reads.
#[derive(Debug)]
pub struct MainSurface<H> {
    handle: Option<H>,
    playing: bool,
    station: Option<usize>,
}

impl<H> Default for MainSurface<H> {
    fn default() -> Self {
        Self {
            handle: None,
            playing: false,
            station: None,
        }
    }
}

impl<H: MediaHandle> MainSurface<H> {
    /// Install a freshly opened handle for `station`.  Any previous handle is
    /// paused and dropped.
    pub fn install(&mut self, station: usize, handle: H) {
        self.halt();
        self.handle = Some(handle);
        self.station = Some(station);
    }

    pub fn handle(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut H> {
        self.handle.as_mut()
    }

    pub fn station(&self) -> Option<usize> {
        self.station
    }

    /// The UI-facing flag.  Tracks what the engine asked for, not what the
    /// handle reports.
    pub fn flagged_playing(&self) -> bool {
        self.playing
    }

    pub fn set_flag(&mut self, playing: bool) {
        self.playing = playing;
    }

    /// Drop a handle that ran to its end.  Returns true when one did.
    pub fn reap_ended(&mut self) -> bool {
        let ended = self.handle.as_ref().is_some_and(|h| h.has_ended());
        if ended {
            debug!("main audio reached end of media");
            self.handle = None;
            self.playing = false;
        }
        ended
    }
}

impl<H: MediaHandle> PlaybackSurface for MainSurface<H> {
    fn surface_id(&self) -> SurfaceId {
        SurfaceId::Main
    }

    fn playing_count(&self) -> usize {
        usize::from(self.handle.as_ref().is_some_and(|h| h.is_playing()))
    }

    fn halt(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.pause();
        }
        self.playing = false;
        self.station = None;
    }
}
