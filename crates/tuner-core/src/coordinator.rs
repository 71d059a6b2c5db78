//! Single-flight audio.
//!
//! The coordinator owns every surface that can make sound.  Every start in
//! the widget goes through here and is preceded by an awaited
//! [`PlaybackCoordinator::stop_all`], so at most one handle is ever playing.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cards::CardPlayerSet;
use crate::config::PlaybackConfig;
use crate::error::{MediaError, TunerError};
use crate::media::{MediaBackend, MediaHandle};
use crate::narrative::NarrativeSection;
use crate::station::{CardSpec, LoveChoice, SourceResolution, StationRegistry, Story};
use crate::surface::{MainSurface, PlaybackSurface};

/// Result of asking for a station's audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Started,
    /// The backend refused the start; nothing is playing.
    Blocked,
    /// Gated station with no recorded choice; nothing was opened.
    AwaitingChoice,
}

pub struct PlaybackCoordinator<B: MediaBackend> {
    backend: B,
    settle: Duration,
    volume: f32,
    pub main: MainSurface<B::Handle>,
    pub narrative: NarrativeSection,
    pub cards: CardPlayerSet<B::Handle>,
}

impl<B: MediaBackend> PlaybackCoordinator<B> {
    pub fn new(
        backend: B,
        playback: &PlaybackConfig,
        cards: Vec<CardSpec>,
        stories: Vec<Story>,
    ) -> Self {
        Self::with_narrative(backend, playback, cards, NarrativeSection::new(stories))
    }

    pub fn with_narrative(
        backend: B,
        playback: &PlaybackConfig,
        cards: Vec<CardSpec>,
        narrative: NarrativeSection,
    ) -> Self {
        let volume = playback.default_volume.clamp(0.0, 1.0);
        let cards = CardPlayerSet::open(&backend, cards, volume);
        Self {
            backend,
            settle: playback.settle(),
            volume,
            main: MainSurface::default(),
            narrative,
            cards,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn note_gesture(&self) {
        self.backend.note_gesture();
    }

    fn registered(&mut self) -> [&mut dyn PlaybackSurface; 3] {
        [&mut self.main, &mut self.narrative, &mut self.cards]
    }

    /// Handles producing audio right now, across every surface.
    pub fn playing_count(&self) -> usize {
        self.main.playing_count() + self.narrative.playing_count() + self.cards.playing_count()
    }

    /// Silence every surface, then let the output settle.
    pub async fn stop_all(&mut self) {
        for surface in self.registered() {
            if surface.is_playing() {
                debug!("halting {:?}", surface.surface_id());
            }
            surface.halt();
        }
        tokio::time::sleep(self.settle).await;
    }

    /// Stop everything and start the station at `index`.
    ///
    /// A refused start is logged and reported as [`PlayOutcome::Blocked`]; the
    /// handle is kept paused so the position can still be scrubbed.
    pub async fn play_station(
        &mut self,
        registry: &mut StationRegistry,
        index: usize,
        choice: Option<LoveChoice>,
    ) -> Result<PlayOutcome, TunerError> {
        self.stop_all().await;

        let source = match registry.resolve_source(index, choice)? {
            SourceResolution::Ready(source) => source,
            SourceResolution::AwaitingChoice => {
                debug!("station {} is waiting for a choice", index);
                return Ok(PlayOutcome::AwaitingChoice);
            }
        };

        let mut handle = self.backend.open(&source, self.volume)?;
        let outcome = match handle.play() {
            Ok(()) => {
                info!("playing station {} ({})", index, source);
                PlayOutcome::Started
            }
            Err(MediaError::NotAllowed) => {
                warn!("start of {} refused: no user gesture yet", source);
                PlayOutcome::Blocked
            }
            Err(e) => return Err(e.into()),
        };
        self.main.install(index, handle);
        self.main.set_flag(outcome == PlayOutcome::Started);
        Ok(outcome)
    }

    /// Move the main play head to `fraction` of the current station.
    ///
    /// Opens a paused handle when none exists yet.  A running handle keeps
    /// running from the new position.
    pub fn scrub_main(
        &mut self,
        registry: &mut StationRegistry,
        index: usize,
        choice: Option<LoveChoice>,
        fraction: f64,
    ) -> Result<(), TunerError> {
        if self.main.handle().is_none() {
            let SourceResolution::Ready(source) = registry.resolve_source(index, choice)? else {
                return Ok(());
            };
            let handle = self.backend.open(&source, self.volume)?;
            self.main.install(index, handle);
        }
        let Some(handle) = self.main.handle_mut() else {
            return Ok(());
        };
        if let Some(duration) = handle.duration().filter(|d| d.is_finite() && *d > 0.0) {
            handle.seek(fraction.clamp(0.0, 1.0) * duration);
        }
        Ok(())
    }

    /// Volume in percent, applied to the live handle and to later opens.
    pub fn set_main_volume(&mut self, percent: u8) {
        self.volume = f32::from(percent.min(100)) / 100.0;
        if let Some(handle) = self.main.handle_mut() {
            handle.set_volume(self.volume);
        }
        debug!("main volume {:.2}", self.volume);
    }

    /// Apply end-of-media rules.  Returns true when any surface changed.
    pub fn reap_ended(&mut self) -> bool {
        let main = self.main.reap_ended();
        let cards = self.cards.reap_ended();
        for id in &cards {
            debug!("card {} finished, rewound", id);
        }
        main || !cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ClockBackend;
    use crate::station::Content;

    fn coordinator(gate: bool) -> (PlaybackCoordinator<ClockBackend>, StationRegistry) {
        let content = Content::builtin().unwrap();
        let backend = if gate {
            ClockBackend::new(120.0)
        } else {
            ClockBackend::new(120.0).without_gesture_gate()
        };
        let coord = PlaybackCoordinator::new(
            backend,
            &PlaybackConfig::default(),
            content.cards,
            content.stories,
        );
        (coord, content.stations)
    }

    #[tokio::test(start_paused = true)]
    async fn play_station_replaces_card_audio() {
        let (mut coord, mut registry) = coordinator(false);
        coord.cards.play("2").unwrap();
        assert_eq!(coord.playing_count(), 1);

        let outcome = coord.play_station(&mut registry, 1, None).await.unwrap();
        assert_eq!(outcome, PlayOutcome::Started);
        assert_eq!(coord.playing_count(), 1);
        assert!(!coord.cards.is_card_playing("2").unwrap());
        assert_eq!(coord.main.handle().unwrap().source(), "audio/iqra.mp3");
        assert!((coord.main.handle().unwrap().volume() - 0.7).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_start_leaves_flag_clear() {
        let (mut coord, mut registry) = coordinator(true);
        let outcome = coord.play_station(&mut registry, 0, None).await.unwrap();
        assert_eq!(outcome, PlayOutcome::Blocked);
        assert!(!coord.main.flagged_playing());
        assert_eq!(coord.playing_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn gated_station_opens_nothing_without_choice() {
        let (mut coord, mut registry) = coordinator(false);
        let outcome = coord.play_station(&mut registry, 3, None).await.unwrap();
        assert_eq!(outcome, PlayOutcome::AwaitingChoice);
        assert!(coord.main.handle().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_waits_for_settle() {
        let (mut coord, mut registry) = coordinator(false);
        coord.play_station(&mut registry, 0, None).await.unwrap();
        let before = tokio::time::Instant::now();
        coord.stop_all().await;
        assert!(before.elapsed() >= PlaybackConfig::default().settle());
        assert_eq!(coord.playing_count(), 0);
        assert!(coord.main.handle().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn scrub_opens_paused_handle() {
        let (mut coord, mut registry) = coordinator(false);
        coord.scrub_main(&mut registry, 2, None, 0.25).unwrap();
        let handle = coord.main.handle().unwrap();
        assert!(!handle.is_playing());
        assert_eq!(handle.position(), 30.0);
    }

    #[tokio::test(start_paused = true)]
    async fn scrub_keeps_running_handle_playing() {
        let (mut coord, mut registry) = coordinator(false);
        coord.play_station(&mut registry, 0, None).await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        coord.scrub_main(&mut registry, 0, None, 0.5).unwrap();
        let handle = coord.main.handle().unwrap();
        assert!(handle.is_playing());
        assert_eq!(handle.position(), 60.0);
        assert!(coord.main.flagged_playing());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!((coord.main.handle().unwrap().position() - 65.0).abs() < 1e-6);

        // Ran off the end, not reaped yet.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(coord.playing_count(), 0);
        coord.scrub_main(&mut registry, 0, None, 0.25).unwrap();
        assert_eq!(coord.playing_count(), 1);
        assert_eq!(coord.main.handle().unwrap().position(), 30.0);
    }

    #[tokio::test(start_paused = true)]
    async fn volume_applies_to_live_and_future_handles() {
        let (mut coord, mut registry) = coordinator(false);
        coord.play_station(&mut registry, 0, None).await.unwrap();
        coord.set_main_volume(40);
        assert!((coord.main.handle().unwrap().volume() - 0.4).abs() < 1e-6);
        coord.play_station(&mut registry, 1, None).await.unwrap();
        assert!((coord.main.handle().unwrap().volume() - 0.4).abs() < 1e-6);
    }
}
