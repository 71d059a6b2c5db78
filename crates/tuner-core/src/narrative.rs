//! The second, story-driven dial.  Runs in preview mode: it tunes, shows a
//! story and a signal meter, but never produces audio.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::TunerError;
use crate::station::Story;
use crate::surface::{PlaybackSurface, SurfaceId};

pub const START_FREQUENCY: f64 = 88.7;
pub const KNOB_STEP_DEG: f64 = 60.0;
pub const VOLUME_KNOB_STEP_DEG: f64 = 45.0;
pub const VOLUME_LEVELS: u8 = 6;
pub const DEFAULT_VOLUME_LEVEL: u8 = 3;
const SIGNAL_REROLL_CHANCE: f64 = 0.1;

#[derive(Debug)]
pub struct NarrativeSection {
    stories: Vec<Story>,
    index: usize,
    active: bool,
    knob_deg: f64,
    volume_knob_deg: f64,
    volume_level: u8,
    signal: u8,
    rng: StdRng,
}

/// What the front-end draws for the section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NarrativeView {
    pub active: bool,
    pub frequency: Option<f64>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub knob_deg: f64,
    pub volume_knob_deg: f64,
    pub volume_level: u8,
    pub wave_opacity: f64,
    pub signal: u8,
    pub frequencies: Vec<f64>,
}

impl NarrativeSection {
    pub fn new(stories: Vec<Story>) -> Self {
        Self::with_rng(stories, StdRng::from_entropy())
    }

    pub fn with_rng(stories: Vec<Story>, rng: StdRng) -> Self {
        let index = stories
            .iter()
            .position(|s| (s.frequency - START_FREQUENCY).abs() < 1e-6)
            .unwrap_or(0);
        let mut section = Self {
            stories,
            index,
            active: false,
            knob_deg: 0.0,
            volume_knob_deg: 0.0,
            volume_level: DEFAULT_VOLUME_LEVEL,
            signal: 3,
            rng,
        };
        section.roll_signal();
        section
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn current(&self) -> Option<&Story> {
        self.stories.get(self.index)
    }

    pub fn volume_level(&self) -> u8 {
        self.volume_level
    }

    pub fn signal(&self) -> u8 {
        self.signal
    }

    pub fn knob_deg(&self) -> f64 {
        self.knob_deg
    }

    pub fn activate(&mut self) {
        if !self.active {
            info!("narrative section activated");
            self.active = true;
        }
        self.roll_signal();
    }

    /// Knob click: next frequency, wrapping.
    pub fn tune_forward(&mut self) {
        let n = self.stories.len();
        if n == 0 {
            return;
        }
        if !self.active {
            self.active = true;
        }
        self.index = (self.index + 1) % n;
        self.knob_deg += KNOB_STEP_DEG;
        self.roll_signal();
        debug!("narrative tuned to {:?}", self.current().map(|s| s.frequency));
    }

    /// Previous frequency, wrapping.  Ignored while inactive.
    pub fn tune_back(&mut self) {
        let n = self.stories.len();
        if !self.active || n == 0 {
            return;
        }
        self.index = (self.index + n - 1) % n;
        self.knob_deg -= KNOB_STEP_DEG;
        self.roll_signal();
    }

    pub fn select_story(&mut self, frequency: f64) -> Result<(), TunerError> {
        let index = self
            .stories
            .iter()
            .position(|s| (s.frequency - frequency).abs() < 1e-6)
            .ok_or(TunerError::UnknownFrequency(frequency))?;
        self.active = true;
        self.index = index;
        self.knob_deg = index as f64 * KNOB_STEP_DEG;
        self.roll_signal();
        Ok(())
    }

    /// Volume knob click.  The first click only wakes the section.
    pub fn volume_click(&mut self) {
        self.volume_knob_deg += VOLUME_KNOB_STEP_DEG;
        if self.active {
            self.volume_level = (self.volume_level + 1) % VOLUME_LEVELS;
        } else {
            self.activate();
        }
    }

    pub fn wave_opacity(&self) -> f64 {
        (f64::from(self.volume_level) * 0.1).min(0.3).max(0.1)
    }

    /// Periodic signal flicker.  Returns true when the meter changed.
    pub fn signal_tick(&mut self) -> bool {
        if !self.active || self.rng.gen::<f64>() >= SIGNAL_REROLL_CHANCE {
            return false;
        }
        let before = self.signal;
        self.roll_signal();
        before != self.signal
    }

    fn roll_signal(&mut self) {
        self.signal = self.rng.gen_range(3..=4);
    }

    pub fn view(&self) -> NarrativeView {
        let story = self.current();
        NarrativeView {
            active: self.active,
            frequency: story.map(|s| s.frequency),
            title: story.map(|s| s.title.clone()),
            subtitle: story.map(|s| s.subtitle.clone()),
            knob_deg: self.knob_deg,
            volume_knob_deg: self.volume_knob_deg,
            volume_level: self.volume_level,
            wave_opacity: self.wave_opacity(),
            signal: self.signal,
            frequencies: self.stories.iter().map(|s| s.frequency).collect(),
        }
    }
}

impl PlaybackSurface for NarrativeSection {
    fn surface_id(&self) -> SurfaceId {
        SurfaceId::Narrative
    }

    fn playing_count(&self) -> usize {
        0
    }

    fn halt(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::station::Content;

    fn section() -> NarrativeSection {
        let stories = Content::builtin().unwrap().stories;
        NarrativeSection::with_rng(stories, StdRng::seed_from_u64(11))
    }

    fn freq(section: &NarrativeSection) -> f64 {
        section.current().unwrap().frequency
    }

    #[test]
    fn starts_inactive_at_default_frequency() {
        let s = section();
        assert!(!s.is_active());
        assert_eq!(freq(&s), 88.7);
        assert_eq!(s.volume_level(), DEFAULT_VOLUME_LEVEL);
    }

    #[test]
    fn tuning_wraps_both_ways() {
        let mut s = section();
        s.tune_forward();
        s.tune_forward();
        assert_eq!(freq(&s), 89.1);
        s.tune_forward();
        assert_eq!(freq(&s), 88.1);
        assert_eq!(s.knob_deg(), 180.0);

        s.tune_back();
        assert_eq!(freq(&s), 89.1);
        assert_eq!(s.knob_deg(), 120.0);
    }

    #[test]
    fn tune_back_needs_activation() {
        let mut s = section();
        s.tune_back();
        assert_eq!(freq(&s), 88.7);
        assert!(!s.is_active());
    }

    #[test]
    fn select_story_sets_absolute_angle() {
        let mut s = section();
        s.select_story(88.3).unwrap();
        assert!(s.is_active());
        assert_eq!(s.knob_deg(), 60.0);
        assert_eq!(s.current().unwrap().title, "Divine Love");
        assert_eq!(s.select_story(95.0), Err(TunerError::UnknownFrequency(95.0)));
    }

    #[test]
    fn volume_cycles_after_first_click() {
        let mut s = section();
        s.volume_click();
        assert!(s.is_active());
        assert_eq!(s.volume_level(), 3);
        let levels: Vec<u8> = (0..6)
            .map(|_| {
                s.volume_click();
                s.volume_level()
            })
            .collect();
        assert_eq!(levels, vec![4, 5, 0, 1, 2, 3]);
        assert_eq!(s.view().volume_knob_deg, 7.0 * 45.0);
    }

    #[test]
    fn wave_opacity_is_bounded() {
        let mut s = section();
        s.activate();
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push((s.volume_level(), s.wave_opacity()));
            s.volume_click();
        }
        for (level, opacity) in seen {
            let expected = match level {
                0 | 1 => 0.1,
                2 => 0.2,
                _ => 0.3,
            };
            assert!((opacity - expected).abs() < 1e-9, "level {level}");
        }
    }

    #[test]
    fn signal_stays_three_or_four() {
        let mut s = section();
        assert!(!s.signal_tick());
        s.activate();
        for _ in 0..500 {
            s.signal_tick();
            assert!((3..=4).contains(&s.signal()));
        }
    }

    #[test]
    fn never_plays() {
        let mut s = section();
        s.activate();
        s.halt();
        assert_eq!(s.playing_count(), 0);
        assert_eq!(s.surface_id(), SurfaceId::Narrative);
    }
}
