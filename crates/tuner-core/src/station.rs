//! Station registry and the content tables (stations, stories, cards).
//!
//! The tables are plain configuration: a `[[station]]` / `[[story]]` /
//! `[[card]]` TOML file, with a built-in copy compiled into the crate.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::error::TunerError;

const BUILTIN_CONTENT: &str = include_str!("../assets/stations.toml");

/// Reception quality shown by the main signal meter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SignalTier {
    Weak,
    Medium,
    #[default]
    Strong,
}

/// Visual pattern tag carried with each station.  Purely cosmetic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpectrumPattern {
    #[default]
    Smooth,
    Wave,
    Aggressive,
    Dynamic,
}

/// The binary answer that unlocks the gated station.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LoveChoice {
    BeingLoved,
    Loving,
}

impl LoveChoice {
    pub fn label(self) -> &'static str {
        match self {
            Self::BeingLoved => "Being loved",
            Self::Loving => "Loving",
        }
    }
}

/// Per-choice sources for the gated station, plus the metadata that replaces
/// the entry's track/artist once a choice is made.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gate {
    pub being_loved: String,
    pub loving: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
}

impl Gate {
    pub fn source_for(&self, choice: LoveChoice) -> &str {
        match choice {
            LoveChoice::BeingLoved => &self.being_loved,
            LoveChoice::Loving => &self.loving,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Station {
    /// Display frequency, e.g. "88.5 FM".
    pub freq: String,
    pub name: String,
    pub track: String,
    pub artist: String,
    pub album: String,
    pub genre: String,
    pub signal: SignalTier,
    /// Broadcast mode label ("STEREO", "HD STEREO", ...).
    pub mode: String,
    pub pattern: SpectrumPattern,
    /// `None` until resolved (gated station) or when the entry has no audio.
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<Gate>,
}

impl Station {
    /// Numeric frequency parsed from the label ("101.5 FM" → 101.5).
    pub fn frequency_mhz(&self) -> Option<f64> {
        crate::dial::parse_frequency(&self.freq)
    }

    pub fn is_gated(&self) -> bool {
        self.gate.is_some()
    }
}

/// A narrative story pinned to one frequency of the second dial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Story {
    pub frequency: f64,
    pub title: String,
    pub subtitle: String,
}

/// Static description of one card player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardSpec {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
}

/// What a station's audio source resolves to right now.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceResolution {
    Ready(String),
    /// Gated station and no choice recorded yet.
    AwaitingChoice,
}

// ── TOML content loader ──────────────────────────────────────────────────────

/// Intermediate structs matching the TOML tables.  Kept separate from
/// `Station` so the file schema can diverge from the snapshot types.
#[derive(Debug, Deserialize)]
struct TomlContentFile {
    #[serde(default)]
    station: Vec<TomlStation>,
    #[serde(default)]
    story: Vec<Story>,
    #[serde(default)]
    card: Vec<CardSpec>,
}

#[derive(Debug, Deserialize)]
struct TomlStation {
    freq: String,
    name: String,
    #[serde(default)]
    track: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    album: String,
    #[serde(default)]
    genre: String,
    #[serde(default)]
    signal: SignalTier,
    #[serde(default = "default_mode")]
    mode: String,
    #[serde(default)]
    pattern: SpectrumPattern,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    gate: Option<Gate>,
}

fn default_mode() -> String {
    "STEREO".to_string()
}

/// Everything a content file provides.
#[derive(Debug, Clone)]
pub struct Content {
    pub stations: StationRegistry,
    pub stories: Vec<Story>,
    pub cards: Vec<CardSpec>,
}

impl Content {
    pub fn builtin() -> anyhow::Result<Self> {
        parse_content_from_toml_str(BUILTIN_CONTENT)
    }

    /// Load `path` when it exists, otherwise fall back to the built-in tables.
    pub fn load_or_builtin(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            info!("Loading content tables from {:?}", path);
            load_content_from_toml(path)
        } else {
            debug!("{:?} not found, using built-in content", path);
            Self::builtin()
        }
    }
}

pub fn load_content_from_toml(path: &Path) -> anyhow::Result<Content> {
    let content = std::fs::read_to_string(path)?;
    parse_content_from_toml_str(&content)
}

pub fn parse_content_from_toml_str(content: &str) -> anyhow::Result<Content> {
    let file: TomlContentFile = toml::from_str(content)?;
    let stations = file
        .station
        .into_iter()
        .map(|s| Station {
            freq: s.freq,
            name: s.name,
            track: s.track,
            artist: s.artist,
            album: s.album,
            genre: s.genre,
            signal: s.signal,
            mode: s.mode,
            pattern: s.pattern,
            // A gated entry starts unresolved whatever the file says.
            source: if s.gate.is_some() { None } else { s.source },
            gate: s.gate,
        })
        .collect();

    let mut seen = std::collections::HashSet::new();
    for card in &file.card {
        if !seen.insert(card.id.as_str()) {
            anyhow::bail!("duplicate card id {:?}", card.id);
        }
    }

    Ok(Content {
        stations: StationRegistry::new(stations)?,
        stories: file.story,
        cards: file.card,
    })
}

// ── Registry ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct StationRegistry {
    stations: Vec<Station>,
}

impl StationRegistry {
    pub fn new(stations: Vec<Station>) -> anyhow::Result<Self> {
        let gated = stations.iter().filter(|s| s.is_gated()).count();
        if gated > 1 {
            anyhow::bail!("at most one station may carry a gate, found {}", gated);
        }
        Ok(Self { stations })
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Station> {
        self.stations.get(index)
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn gated_index(&self) -> Option<usize> {
        self.stations.iter().position(Station::is_gated)
    }

    pub fn is_gated(&self, index: usize) -> bool {
        self.gated_index() == Some(index)
    }

    /// Resolve the audio source for `index`.
    ///
    /// For the gated station a recorded `choice` rewrites the entry in place
    /// (source, track and artist); without one the result is
    /// [`SourceResolution::AwaitingChoice`].
    pub fn resolve_source(
        &mut self,
        index: usize,
        choice: Option<LoveChoice>,
    ) -> Result<SourceResolution, TunerError> {
        let station = self
            .stations
            .get_mut(index)
            .ok_or(TunerError::UnknownStation(index))?;

        if let Some(gate) = &station.gate {
            let Some(choice) = choice else {
                return Ok(SourceResolution::AwaitingChoice);
            };
            station.source = Some(gate.source_for(choice).to_string());
            if let Some(track) = &gate.track {
                station.track = track.clone();
            }
            if let Some(artist) = &gate.artist {
                station.artist = artist.clone();
            }
        }

        station
            .source
            .clone()
            .map(SourceResolution::Ready)
            .ok_or(TunerError::MissingSource(index))
    }

    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.stations)?)
    }
}
