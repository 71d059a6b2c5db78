//! The tuner engine: one owner for the registry, the coordinator and the
//! sequencer.  Every public operation runs to completion before the next
//! one starts; the core loop guarantees that by owning the engine.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{Config, DisplayConfig, TransitionConfig};
use crate::coordinator::{PlayOutcome, PlaybackCoordinator};
use crate::dial;
use crate::error::TunerError;
use crate::media::{MediaBackend, MediaHandle};
use crate::narrative::NarrativeSection;
use crate::protocol::{Command, TunerSnapshot};
use crate::sequencer::SwitchSequencer;
use crate::spectrum::SpectrumState;
use crate::station::{CardSpec, Content, LoveChoice, StationRegistry};

/// How a station switch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Animated switch: call [`TunerEngine::complete_transition`] with
    /// `generation` once `delay` has passed.
    Deferred { generation: u64, delay: Duration },
    Finished(PlayOutcome),
    /// Landed on the gated station; the choice prompt is open.
    Prompted,
}

#[derive(Debug, Clone, Copy)]
enum KnobMove {
    Advance,
    Retreat,
    Absolute,
}

pub struct TunerEngine<B: MediaBackend> {
    registry: StationRegistry,
    coordinator: PlaybackCoordinator<B>,
    seq: SwitchSequencer,
    spectrum: SpectrumState,
    transition: TransitionConfig,
    display: DisplayConfig,
    gesture_seen: bool,
    scheduled: Option<(u64, Duration)>,
    rev: u64,
}

impl<B: MediaBackend> TunerEngine<B> {
    pub fn new(content: Content, config: &Config, backend: B) -> Self {
        let narrative = NarrativeSection::new(content.stories);
        Self::with_narrative(content.stations, content.cards, narrative, config, backend)
    }

    pub fn with_narrative(
        registry: StationRegistry,
        cards: Vec<CardSpec>,
        narrative: NarrativeSection,
        config: &Config,
        backend: B,
    ) -> Self {
        let coordinator =
            PlaybackCoordinator::with_narrative(backend, &config.playback, cards, narrative);
        let mut spectrum = SpectrumState::new(config.spectrum.bars);
        spectrum.rebuild_for_station(0);
        info!(
            "tuner engine ready: {} stations, {} cards",
            registry.len(),
            coordinator.cards.len()
        );
        Self {
            registry,
            coordinator,
            seq: SwitchSequencer::default(),
            spectrum,
            transition: config.transition.clone(),
            display: config.display.clone(),
            gesture_seen: false,
            scheduled: None,
            rev: 0,
        }
    }

    pub fn registry(&self) -> &StationRegistry {
        &self.registry
    }

    pub fn sequencer(&self) -> &SwitchSequencer {
        &self.seq
    }

    pub fn coordinator(&self) -> &PlaybackCoordinator<B> {
        &self.coordinator
    }

    pub fn spectrum(&self) -> &SpectrumState {
        &self.spectrum
    }

    pub fn playing_count(&self) -> usize {
        self.coordinator.playing_count()
    }

    pub fn is_scanning(&self) -> bool {
        self.seq.scanner.is_active()
    }

    /// The transition the core loop still has to arm a timer for.
    pub fn take_scheduled(&mut self) -> Option<(u64, Duration)> {
        self.scheduled.take()
    }

    // ── Station switching ────────────────────────────────────────────────────

    /// Stop everything, point the display at `index` and either start its
    /// audio now or open a transition window.
    pub async fn switch_to_station(
        &mut self,
        index: usize,
        animate: bool,
    ) -> Result<SwitchOutcome, TunerError> {
        if index >= self.registry.len() {
            warn!("switch to unknown station {}", index);
            return Err(TunerError::UnknownStation(index));
        }

        self.coordinator.stop_all().await;
        self.seq.retarget(index);
        self.spectrum.rebuild_for_station(index);
        debug!("display -> station {} (animate={})", index, animate);

        if animate {
            let generation = self.seq.begin_transition();
            let delay = self.transition.switch_delay();
            self.scheduled = Some((generation, delay));
            return Ok(SwitchOutcome::Deferred { generation, delay });
        }
        self.finish_switch(index).await.map(SwitchOutcome::Finished)
    }

    /// Close the transition window opened for `generation`.  Returns `None`
    /// when that transition was superseded.
    pub async fn complete_transition(
        &mut self,
        generation: u64,
    ) -> Result<Option<PlayOutcome>, TunerError> {
        let Some(target) = self.seq.finish_transition(generation) else {
            return Ok(None);
        };
        self.finish_switch(target).await.map(Some)
    }

    async fn finish_switch(&mut self, target: usize) -> Result<PlayOutcome, TunerError> {
        if !self.seq.may_start(self.registry.is_gated(target)) {
            self.seq.set_playing(false);
            return Ok(PlayOutcome::AwaitingChoice);
        }
        let outcome = self
            .coordinator
            .play_station(&mut self.registry, target, self.seq.choice())
            .await;
        self.seq
            .set_playing(matches!(outcome, Ok(PlayOutcome::Started)));
        outcome
    }

    pub async fn toggle_main_playback(&mut self) -> Result<Option<PlayOutcome>, TunerError> {
        if self.coordinator.main.flagged_playing() {
            self.stop_all_audio().await;
            return Ok(None);
        }
        let current = self.seq.current();
        if self.registry.is_gated(current) && self.seq.choice().is_none() {
            self.coordinator.stop_all().await;
            self.seq.park_on_gate(current);
            return Ok(Some(PlayOutcome::AwaitingChoice));
        }
        self.seq.invalidate();
        let outcome = self.finish_switch(current).await?;
        Ok(Some(outcome))
    }

    /// Explicit stop: silences every surface and cancels a pending switch.
    pub async fn stop_all_audio(&mut self) {
        self.seq.invalidate();
        self.coordinator.stop_all().await;
        self.seq.set_playing(false);
        info!("all audio stopped");
    }

    pub async fn set_love_choice(&mut self, choice: LoveChoice) -> Result<SwitchOutcome, TunerError> {
        let gated = self.registry.gated_index().ok_or(TunerError::NoGatedStation)?;
        info!("love choice: {}", choice.label());
        self.seq.record_choice(choice);
        self.registry.resolve_source(gated, Some(choice))?;
        self.seq.scanner.stop();
        self.seq.knob.set_index(gated);
        self.switch_to_station(gated, true).await
    }

    pub fn dismiss_choice_prompt(&mut self) {
        self.seq.dismiss_prompt();
    }

    // ── Navigation ───────────────────────────────────────────────────────────

    pub async fn next_station(&mut self) -> Result<SwitchOutcome, TunerError> {
        let target = self.seq.neighbor(self.registry.len(), true);
        self.navigate(target, KnobMove::Advance).await
    }

    pub async fn prev_station(&mut self) -> Result<SwitchOutcome, TunerError> {
        let target = self.seq.neighbor(self.registry.len(), false);
        self.navigate(target, KnobMove::Retreat).await
    }

    pub async fn tune_knob(&mut self) -> Result<SwitchOutcome, TunerError> {
        self.next_station().await
    }

    pub async fn select_preset(&mut self, index: usize) -> Result<SwitchOutcome, TunerError> {
        self.navigate(index, KnobMove::Absolute).await
    }

    async fn navigate(&mut self, target: usize, knob: KnobMove) -> Result<SwitchOutcome, TunerError> {
        if target >= self.registry.len() {
            warn!("navigate to unknown station {}", target);
            return Err(TunerError::UnknownStation(target));
        }
        match knob {
            KnobMove::Advance => self.seq.knob.advance(),
            KnobMove::Retreat => self.seq.knob.retreat(),
            KnobMove::Absolute => self.seq.knob.set_index(target),
        }

        if self.registry.is_gated(target) {
            self.stop_all_audio().await;
            self.seq.park_on_gate(target);
            info!("station {} needs a choice, prompting", target);
            return Ok(SwitchOutcome::Prompted);
        }

        self.seq.scanner.stop();
        self.switch_to_station(target, true).await
    }

    // ── Scanner ──────────────────────────────────────────────────────────────

    pub fn start_scan(&mut self) -> bool {
        let started = self.seq.scanner.start();
        if started {
            info!("scan started");
        }
        started
    }

    pub fn stop_scan(&mut self) -> bool {
        let stopped = self.seq.scanner.stop();
        if stopped {
            info!("scan stopped");
        }
        stopped
    }

    pub fn toggle_scan(&mut self) -> bool {
        if self.is_scanning() {
            self.stop_scan();
        } else {
            self.start_scan();
        }
        self.is_scanning()
    }

    /// One scan interval elapsed.
    pub async fn scan_step(&mut self) -> Result<Option<SwitchOutcome>, TunerError> {
        let Some(index) = self.seq.scanner.step(self.registry.len()) else {
            return Ok(None);
        };
        debug!("scan step -> station {}", index);
        self.switch_to_station(index, true).await.map(Some)
    }

    // ── Main audio controls ──────────────────────────────────────────────────

    pub fn scrub_main(&mut self, fraction: f64) -> Result<(), TunerError> {
        let current = self.seq.current();
        self.coordinator
            .scrub_main(&mut self.registry, current, self.seq.choice(), fraction)
    }

    pub fn set_main_volume(&mut self, percent: u8) {
        self.coordinator.set_main_volume(percent);
    }

    // ── Cards ────────────────────────────────────────────────────────────────

    /// Start one card after silencing everything else.
    pub async fn card_play(&mut self, id: &str) -> Result<bool, TunerError> {
        self.coordinator.cards.is_card_playing(id)?;
        self.stop_all_audio().await;
        self.coordinator.cards.play(id)
    }

    pub fn card_pause(&mut self, id: &str) -> Result<(), TunerError> {
        self.coordinator.cards.pause(id)
    }

    /// Returns whether the card is playing afterwards.
    pub async fn card_toggle(&mut self, id: &str) -> Result<bool, TunerError> {
        let was_playing = self.coordinator.cards.is_card_playing(id)?;
        self.stop_all_audio().await;
        if was_playing {
            return Ok(false);
        }
        self.coordinator.cards.play(id)
    }

    pub fn card_seek(&mut self, id: &str, seconds: f64) -> Result<(), TunerError> {
        self.coordinator.cards.seek(id, seconds)
    }

    pub fn card_scrub(&mut self, id: &str, fraction: f64) -> Result<(), TunerError> {
        self.coordinator.cards.scrub(id, fraction)
    }

    pub async fn card_next(&mut self, id: &str) -> Result<String, TunerError> {
        self.card_step(id, true).await
    }

    pub async fn card_prev(&mut self, id: &str) -> Result<String, TunerError> {
        self.card_step(id, false).await
    }

    async fn card_step(&mut self, id: &str, forward: bool) -> Result<String, TunerError> {
        self.coordinator.cards.pause(id)?;
        let neighbor = self.coordinator.cards.neighbor(id, forward)?;
        self.stop_all_audio().await;
        self.coordinator.cards.rewind(&neighbor)?;
        self.coordinator.cards.play(&neighbor)?;
        debug!("card {} -> {}", id, neighbor);
        Ok(neighbor)
    }

    // ── Narrative section ────────────────────────────────────────────────────

    pub fn narrative(&self) -> &NarrativeSection {
        &self.coordinator.narrative
    }

    pub fn narrative_activate(&mut self) {
        self.coordinator.narrative.activate();
    }

    pub fn narrative_tune_forward(&mut self) {
        self.coordinator.narrative.tune_forward();
    }

    pub fn narrative_tune_back(&mut self) {
        self.coordinator.narrative.tune_back();
    }

    pub fn narrative_select(&mut self, frequency: f64) -> Result<(), TunerError> {
        self.coordinator.narrative.select_story(frequency)
    }

    pub fn narrative_volume_click(&mut self) {
        self.coordinator.narrative.volume_click();
    }

    pub fn signal_tick(&mut self) -> bool {
        let changed = self.coordinator.narrative.signal_tick();
        if changed {
            self.rev += 1;
        }
        changed
    }

    // ── Housekeeping ─────────────────────────────────────────────────────────

    /// First interaction unlocks playback and wakes the narrative section.
    pub fn note_gesture(&mut self) {
        if self.gesture_seen {
            return;
        }
        self.gesture_seen = true;
        self.coordinator.note_gesture();
        if !self.coordinator.narrative.is_active() {
            self.coordinator.narrative.activate();
        }
        info!("first user gesture");
    }

    /// Apply end-of-media rules.  Returns true when anything changed.
    pub fn poll(&mut self) -> bool {
        let changed = self.coordinator.reap_ended();
        if changed {
            if !self.coordinator.main.flagged_playing() {
                self.seq.set_playing(false);
            }
            self.rev += 1;
        }
        changed
    }

    /// Route one front-end command.
    pub async fn apply(&mut self, cmd: Command) -> Result<(), TunerError> {
        if cmd.is_gesture() {
            self.note_gesture();
        }
        self.rev += 1;
        match cmd {
            Command::SwitchTo { index, animate } => {
                self.switch_to_station(index, animate).await?;
            }
            Command::TogglePlayback => {
                self.toggle_main_playback().await?;
            }
            Command::StopAll => self.stop_all_audio().await,
            Command::SetLoveChoice { choice } => {
                self.set_love_choice(choice).await?;
            }
            Command::DismissChoicePrompt => self.dismiss_choice_prompt(),
            Command::NextStation => {
                self.next_station().await?;
            }
            Command::PrevStation => {
                self.prev_station().await?;
            }
            Command::TuneKnob => {
                self.tune_knob().await?;
            }
            Command::SelectPreset { index } => {
                self.select_preset(index).await?;
            }
            Command::StartScan => {
                self.start_scan();
            }
            Command::StopScan => {
                self.stop_scan();
            }
            Command::ToggleScan => {
                self.toggle_scan();
            }
            Command::ScrubMain { fraction } => self.scrub_main(fraction)?,
            Command::Volume { percent } => self.set_main_volume(percent),
            Command::CardPlay { id } => {
                self.card_play(&id).await?;
            }
            Command::CardPause { id } => self.card_pause(&id)?,
            Command::CardToggle { id } => {
                self.card_toggle(&id).await?;
            }
            Command::CardSeek { id, seconds } => self.card_seek(&id, seconds)?,
            Command::CardScrub { id, fraction } => self.card_scrub(&id, fraction)?,
            Command::CardNext { id } => {
                self.card_next(&id).await?;
            }
            Command::CardPrev { id } => {
                self.card_prev(&id).await?;
            }
            Command::NarrativeActivate => self.narrative_activate(),
            Command::NarrativeTuneForward => self.narrative_tune_forward(),
            Command::NarrativeTuneBack => self.narrative_tune_back(),
            Command::NarrativeSelect { frequency } => self.narrative_select(frequency)?,
            Command::NarrativeVolume => self.narrative_volume_click(),
            Command::Gesture => {}
        }
        Ok(())
    }

    pub fn snapshot(&self) -> TunerSnapshot {
        let displayed = self.seq.displayed();
        let station = self.registry.get(displayed);
        let main = self.coordinator.main.handle();
        TunerSnapshot {
            rev: self.rev,
            stations: self.registry.stations().to_vec(),
            current_station: self.seq.current(),
            displayed_station: displayed,
            active_preset: self.seq.active_preset(),
            phase: self.seq.phase(),
            changing: self.seq.is_changing(),
            is_playing: self.coordinator.main.flagged_playing(),
            position_secs: main.map(|h| h.position()),
            duration_secs: main.and_then(|h| h.duration()),
            volume: self.coordinator.volume(),
            main_knob_deg: dial::main_knob_angle(displayed, self.registry.len()),
            home_knob_deg: self.seq.knob.rotation_deg,
            dial_percent: station
                .and_then(|s| s.frequency_mhz())
                .map_or(0.0, |f| {
                    dial::dial_position(f, self.display.dial_min_mhz, self.display.dial_max_mhz)
                }),
            signal_bars_lit: station.map_or(0, |s| {
                dial::lit_signal_bars(s.signal, self.display.signal_bars)
            }),
            signal_bars_total: self.display.signal_bars,
            love_choice: self.seq.choice(),
            prompt_open: self.seq.prompt_open(),
            scanning: self.is_scanning(),
            spectrum_seed: self.spectrum.seed(),
            spectrum_base: self.spectrum.base().to_vec(),
            cards: self.coordinator.cards.views(),
            narrative: self.coordinator.narrative.view(),
            playing_count: self.playing_count(),
            gesture_seen: self.gesture_seen,
        }
    }
}
