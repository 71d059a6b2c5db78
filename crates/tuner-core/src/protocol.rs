use serde::{Deserialize, Serialize};

use crate::cards::CardView;
use crate::narrative::NarrativeView;
use crate::sequencer::Phase;
use crate::station::{LoveChoice, Station};

/// Messages sent from the front-end to the core loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd")]
pub enum Command {
    SwitchTo { index: usize, animate: bool },
    TogglePlayback,
    StopAll,
    SetLoveChoice { choice: LoveChoice },
    DismissChoicePrompt,
    NextStation,
    PrevStation,
    /// Click on the home tuning knob.  Same as `NextStation`.
    TuneKnob,
    SelectPreset { index: usize },
    StartScan,
    StopScan,
    ToggleScan,
    ScrubMain { fraction: f64 },
    Volume { percent: u8 },
    CardPlay { id: String },
    CardPause { id: String },
    CardToggle { id: String },
    CardSeek { id: String, seconds: f64 },
    CardScrub { id: String, fraction: f64 },
    CardNext { id: String },
    CardPrev { id: String },
    NarrativeActivate,
    NarrativeTuneForward,
    NarrativeTuneBack,
    NarrativeSelect { frequency: f64 },
    NarrativeVolume,
    /// A bare user interaction with no other effect.
    Gesture,
}

impl Command {
    /// Commands that count as a user gesture for the autoplay policy.
    pub fn is_gesture(&self) -> bool {
        matches!(
            self,
            Command::TogglePlayback
                | Command::NextStation
                | Command::PrevStation
                | Command::TuneKnob
                | Command::SelectPreset { .. }
                | Command::SetLoveChoice { .. }
                | Command::CardPlay { .. }
                | Command::CardToggle { .. }
                | Command::CardNext { .. }
                | Command::CardPrev { .. }
                | Command::Gesture
        )
    }
}

/// Messages published by the core loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "broadcast")]
pub enum Broadcast {
    State { data: TunerSnapshot },
    Log { message: String },
}

/// Full state of the tuner.  `rev` increases on every change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TunerSnapshot {
    #[serde(default)]
    pub rev: u64,
    pub stations: Vec<Station>,
    pub current_station: usize,
    /// Station whose metadata is on the display.  Lags `current_station`
    /// while the choice prompt is open.
    pub displayed_station: usize,
    pub active_preset: Option<usize>,
    pub phase: Phase,
    pub changing: bool,
    pub is_playing: bool,
    pub position_secs: Option<f64>,
    pub duration_secs: Option<f64>,
    pub volume: f32,
    pub main_knob_deg: f64,
    pub home_knob_deg: f64,
    /// Tuning indicator position, percent of the dial.
    pub dial_percent: f64,
    pub signal_bars_lit: usize,
    pub signal_bars_total: usize,
    pub love_choice: Option<LoveChoice>,
    pub prompt_open: bool,
    pub scanning: bool,
    pub spectrum_seed: u64,
    pub spectrum_base: Vec<f64>,
    pub cards: Vec<CardView>,
    pub narrative: NarrativeView,
    /// Handles producing audio across every surface.
    pub playing_count: usize,
    pub gesture_seen: bool,
}

impl TunerSnapshot {
    pub fn displayed(&self) -> Option<&Station> {
        self.stations.get(self.displayed_station)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_tagged() {
        let json = serde_json::to_string(&Command::SetLoveChoice {
            choice: LoveChoice::BeingLoved,
        })
        .unwrap();
        assert_eq!(json, r#"{"cmd":"SetLoveChoice","choice":"being_loved"}"#);

        let cmd: Command = serde_json::from_str(r#"{"cmd":"CardSeek","id":"2","seconds":12.5}"#).unwrap();
        assert_eq!(
            cmd,
            Command::CardSeek {
                id: "2".into(),
                seconds: 12.5
            }
        );
    }

    #[test]
    fn gesture_classification() {
        assert!(Command::TogglePlayback.is_gesture());
        assert!(Command::CardToggle { id: "1".into() }.is_gesture());
        assert!(!Command::StopAll.is_gesture());
        assert!(!Command::ScrubMain { fraction: 0.5 }.is_gesture());
    }
}
