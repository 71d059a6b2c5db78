//! Independent per-card players, kept in configuration order.
//!
//! The set only knows how to drive its own handles.  Exclusivity across the
//! whole widget is the coordinator's job: callers run `stop_all` before
//! starting any card.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MediaError, TunerError};
use crate::media::{MediaBackend, MediaHandle};
use crate::station::CardSpec;
use crate::surface::{PlaybackSurface, SurfaceId};

#[derive(Debug)]
pub struct CardPlayer<H> {
    spec: CardSpec,
    /// `None` when the source could not be opened.
    handle: Option<H>,
}

impl<H: MediaHandle> CardPlayer<H> {
    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn spec(&self) -> &CardSpec {
        &self.spec
    }

    pub fn is_playing(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_playing())
    }

    pub fn position(&self) -> f64 {
        self.handle.as_ref().map_or(0.0, |h| h.position())
    }

    pub fn duration(&self) -> Option<f64> {
        self.handle
            .as_ref()
            .and_then(|h| h.duration())
            .or(self.spec.duration_secs)
    }

    fn view(&self) -> CardView {
        CardView {
            id: self.spec.id.clone(),
            title: self.spec.title.clone(),
            subtitle: self.spec.subtitle.clone(),
            playing: self.is_playing(),
            position_secs: self.position(),
            duration_secs: self.duration(),
            available: self.handle.is_some(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardView {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub playing: bool,
    pub position_secs: f64,
    pub duration_secs: Option<f64>,
    pub available: bool,
}

#[derive(Debug)]
pub struct CardPlayerSet<H> {
    players: Vec<CardPlayer<H>>,
}

impl<H: MediaHandle> CardPlayerSet<H> {
    pub fn open<B>(backend: &B, specs: Vec<CardSpec>, volume: f32) -> Self
    where
        B: MediaBackend<Handle = H>,
    {
        let players = specs
            .into_iter()
            .map(|spec| {
                let opened = backend.open_with_length(&spec.source, volume, spec.duration_secs);
                let handle = match opened {
                    Ok(h) => Some(h),
                    Err(e) => {
                        warn!("card {}: {}", spec.id, e);
                        None
                    }
                };
                CardPlayer { spec, handle }
            })
            .collect();
        Self { players }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&CardPlayer<H>> {
        self.players.iter().find(|p| p.spec.id == id)
    }

    pub fn is_card_playing(&self, id: &str) -> Result<bool, TunerError> {
        Ok(self.player(id)?.is_playing())
    }

    fn position_of(&self, id: &str) -> Result<usize, TunerError> {
        self.players
            .iter()
            .position(|p| p.spec.id == id)
            .ok_or_else(|| TunerError::UnknownPlayer(id.to_string()))
    }

    fn player(&self, id: &str) -> Result<&CardPlayer<H>, TunerError> {
        self.position_of(id).map(|i| &self.players[i])
    }

    fn handle_mut(&mut self, id: &str) -> Result<&mut H, TunerError> {
        let i = self.position_of(id)?;
        let player = &mut self.players[i];
        player.handle.as_mut().ok_or_else(|| {
            TunerError::Media(MediaError::SourceUnavailable(player.spec.source.clone()))
        })
    }

    /// Start one card.  A refused start leaves it paused.
    pub fn play(&mut self, id: &str) -> Result<bool, TunerError> {
        let handle = self.handle_mut(id)?;
        match handle.play() {
            Ok(()) => {
                debug!("card {} playing", id);
                Ok(true)
            }
            Err(MediaError::NotAllowed) => {
                warn!("card {}: start refused before first gesture", id);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn pause(&mut self, id: &str) -> Result<(), TunerError> {
        self.handle_mut(id)?.pause();
        Ok(())
    }

    pub fn seek(&mut self, id: &str, seconds: f64) -> Result<(), TunerError> {
        self.handle_mut(id)?.seek(seconds);
        Ok(())
    }

    /// Seek to a fraction of the card's length.  No-op while the length is
    /// unknown.
    pub fn scrub(&mut self, id: &str, fraction: f64) -> Result<(), TunerError> {
        let handle = self.handle_mut(id)?;
        if let Some(duration) = handle.duration().filter(|d| d.is_finite() && *d > 0.0) {
            handle.seek(fraction.clamp(0.0, 1.0) * duration);
        }
        Ok(())
    }

    pub fn rewind(&mut self, id: &str) -> Result<(), TunerError> {
        self.seek(id, 0.0)
    }

    /// Id of the card `forward` (or backward) from `id`, wrapping at both ends.
    pub fn neighbor(&self, id: &str, forward: bool) -> Result<String, TunerError> {
        let n = self.players.len();
        let i = self.position_of(id)?;
        let j = if forward { (i + 1) % n } else { (i + n - 1) % n };
        Ok(self.players[j].spec.id.clone())
    }

    /// Pause and rewind every card that reached its end.  Returns the ids.
    pub fn reap_ended(&mut self) -> Vec<String> {
        let mut ended = Vec::new();
        for player in &mut self.players {
            if let Some(handle) = player.handle.as_mut() {
                if handle.has_ended() {
                    handle.pause();
                    handle.seek(0.0);
                    ended.push(player.spec.id.clone());
                }
            }
        }
        ended
    }

    pub fn views(&self) -> Vec<CardView> {
        self.players.iter().map(CardPlayer::view).collect()
    }
}

impl<H: MediaHandle> PlaybackSurface for CardPlayerSet<H> {
    fn surface_id(&self) -> SurfaceId {
        SurfaceId::Cards
    }

    fn playing_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_playing()).count()
    }

    /// Pause and rewind every card.
    fn halt(&mut self) {
        for handle in self.players.iter_mut().filter_map(|p| p.handle.as_mut()) {
            handle.pause();
            handle.seek(0.0);
        }
    }
}
