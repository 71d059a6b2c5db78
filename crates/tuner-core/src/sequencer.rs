//! Station switch state machine.
//!
//! Pure bookkeeping: which station is current and displayed, whether a
//! transition is pending, the gate prompt and the scanner.  The engine drives
//! audio around it.
//!
//! Every animated switch is keyed by a generation number.  Completing a
//! generation that is no longer current does nothing, so a late timer can
//! never start audio for a station the user already left.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dial::HomeKnob;
use crate::station::LoveChoice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Transitioning { generation: u64, target: usize },
    Playing,
}

/// Automatic station cycling.  Steps start at station 0.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    active: bool,
    next_index: usize,
}

impl Scanner {
    pub fn start(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        self.next_index = 0;
        true
    }

    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.active, false)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// The station for this step, advancing the cursor.
    pub fn step(&mut self, station_count: usize) -> Option<usize> {
        if !self.active || station_count == 0 {
            return None;
        }
        let index = self.next_index % station_count;
        self.next_index = (index + 1) % station_count;
        Some(index)
    }
}

#[derive(Debug, Clone)]
pub struct SwitchSequencer {
    phase: Phase,
    generation: u64,
    current: usize,
    displayed: usize,
    changing: bool,
    pub knob: HomeKnob,
    active_preset: Option<usize>,
    choice: Option<LoveChoice>,
    prompt_open: bool,
    pub scanner: Scanner,
}

impl Default for SwitchSequencer {
    fn default() -> Self {
        Self {
            phase: Phase::Idle,
            generation: 0,
            current: 0,
            displayed: 0,
            changing: false,
            knob: HomeKnob::default(),
            active_preset: None,
            choice: None,
            prompt_open: false,
            scanner: Scanner::default(),
        }
    }
}

impl SwitchSequencer {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn displayed(&self) -> usize {
        self.displayed
    }

    pub fn is_changing(&self) -> bool {
        self.changing
    }

    pub fn active_preset(&self) -> Option<usize> {
        self.active_preset
    }

    pub fn choice(&self) -> Option<LoveChoice> {
        self.choice
    }

    pub fn prompt_open(&self) -> bool {
        self.prompt_open
    }

    /// Whether audio may start for `target` right now.
    pub fn may_start(&self, gated: bool) -> bool {
        !gated || self.choice.is_some()
    }

    /// Point the display at `target`.  Any pending transition is superseded.
    pub fn retarget(&mut self, target: usize) {
        self.invalidate();
        self.current = target;
        self.displayed = target;
        self.active_preset = Some(target);
    }

    /// Enter the transition window for the current target.
    pub fn begin_transition(&mut self) -> u64 {
        self.generation += 1;
        self.phase = Phase::Transitioning {
            generation: self.generation,
            target: self.current,
        };
        self.changing = true;
        debug!("transition {} -> station {}", self.generation, self.current);
        self.generation
    }

    /// Close the transition window for `generation`, returning its target.
    /// `None` when that generation was superseded.
    pub fn finish_transition(&mut self, generation: u64) -> Option<usize> {
        match self.phase {
            Phase::Transitioning {
                generation: pending,
                target,
            } if pending == generation => {
                self.phase = Phase::Idle;
                self.changing = false;
                Some(target)
            }
            _ => {
                debug!("dropping stale transition {}", generation);
                None
            }
        }
    }

    /// Cancel whatever transition is pending.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        if matches!(self.phase, Phase::Transitioning { .. }) {
            self.phase = Phase::Idle;
        }
        self.changing = false;
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.phase = if playing { Phase::Playing } else { Phase::Idle };
    }

    /// Land on the gated station without switching: it becomes current and
    /// the prompt opens.  The display keeps showing the previous station.
    pub fn park_on_gate(&mut self, index: usize) {
        self.invalidate();
        self.phase = Phase::Idle;
        self.current = index;
        self.active_preset = Some(index);
        self.prompt_open = true;
    }

    pub fn record_choice(&mut self, choice: LoveChoice) {
        self.choice = Some(choice);
        self.prompt_open = false;
    }

    pub fn dismiss_prompt(&mut self) {
        self.prompt_open = false;
    }

    /// Neighbor of the current station, wrapping.
    pub fn neighbor(&self, station_count: usize, forward: bool) -> usize {
        if station_count == 0 {
            return 0;
        }
        if forward {
            (self.current + 1) % station_count
        } else {
            (self.current + station_count - 1) % station_count
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scanner_cycles_from_zero() {
        let mut scanner = Scanner::default();
        assert_eq!(scanner.step(4), None);
        assert!(scanner.start());
        assert!(!scanner.start());
        let visited: Vec<_> = (0..6).filter_map(|_| scanner.step(4)).collect();
        assert_eq!(visited, vec![0, 1, 2, 3, 0, 1]);

        assert!(scanner.stop());
        assert!(!scanner.stop());
        scanner.start();
        assert_eq!(scanner.step(4), Some(0));
    }

    #[test]
    fn superseded_generation_is_ignored() {
        let mut seq = SwitchSequencer::default();
        seq.retarget(1);
        let first = seq.begin_transition();
        seq.retarget(2);
        let second = seq.begin_transition();
        assert_ne!(first, second);

        assert_eq!(seq.finish_transition(first), None);
        assert!(seq.is_changing());
        assert_eq!(seq.finish_transition(second), Some(2));
        assert!(!seq.is_changing());
        assert_eq!(seq.finish_transition(second), None);
    }

    #[test]
    fn invalidate_cancels_pending() {
        let mut seq = SwitchSequencer::default();
        seq.retarget(1);
        let generation = seq.begin_transition();
        seq.invalidate();
        assert_eq!(seq.phase(), Phase::Idle);
        assert_eq!(seq.finish_transition(generation), None);
    }

    #[test]
    fn gate_parking_keeps_display() {
        let mut seq = SwitchSequencer::default();
        seq.retarget(2);
        seq.park_on_gate(3);
        assert_eq!(seq.current(), 3);
        assert_eq!(seq.displayed(), 2);
        assert_eq!(seq.active_preset(), Some(3));
        assert!(seq.prompt_open());
        assert!(!seq.may_start(true));

        seq.record_choice(LoveChoice::Loving);
        assert!(!seq.prompt_open());
        assert!(seq.may_start(true));
    }

    #[test]
    fn neighbors_wrap() {
        let mut seq = SwitchSequencer::default();
        assert_eq!(seq.neighbor(4, false), 3);
        seq.retarget(3);
        assert_eq!(seq.neighbor(4, true), 0);
        assert_eq!(seq.neighbor(0, true), 0);
    }
}
