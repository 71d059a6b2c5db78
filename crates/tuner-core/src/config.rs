use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub transition: TransitionConfig,
    #[serde(default)]
    pub spectrum: SpectrumConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub stations: StationsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Volume given to every freshly opened main handle (0.0..=1.0).
    #[serde(default = "default_volume")]
    pub default_volume: f32,
    /// Pause settling window awaited at the end of every stop-all.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Refuse to start audio until the first key press, like a browser
    /// autoplay policy.
    #[serde(default = "default_true")]
    pub require_gesture: bool,
    /// Directory that relative audio sources are resolved against.  When set,
    /// a source whose file does not exist there is treated as missing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_root: Option<PathBuf>,
    /// Length assumed for sources that declare no duration.
    #[serde(default = "default_duration_secs")]
    pub default_duration_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionConfig {
    /// Station-change animation window; audio starts when it elapses.
    #[serde(default = "default_switch_delay_ms")]
    pub switch_delay_ms: u64,
    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,
    /// How often the narrative signal meter gets a chance to re-roll.
    #[serde(default = "default_signal_interval_ms")]
    pub signal_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumConfig {
    #[serde(default = "default_bars")]
    pub bars: usize,
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_signal_bars")]
    pub signal_bars: usize,
    #[serde(default = "default_dial_min")]
    pub dial_min_mhz: f64,
    #[serde(default = "default_dial_max")]
    pub dial_max_mhz: f64,
}

/// Where the station, story and card tables come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationsConfig {
    /// Local TOML content file.  The built-in table is used when it is absent.
    #[serde(default = "default_stations_toml")]
    pub stations_toml: PathBuf,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_volume: default_volume(),
            settle_ms: default_settle_ms(),
            require_gesture: default_true(),
            media_root: None,
            default_duration_secs: default_duration_secs(),
        }
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            switch_delay_ms: default_switch_delay_ms(),
            scan_interval_ms: default_scan_interval_ms(),
            signal_interval_ms: default_signal_interval_ms(),
        }
    }
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self {
            bars: default_bars(),
            frame_ms: default_frame_ms(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            signal_bars: default_signal_bars(),
            dial_min_mhz: default_dial_min(),
            dial_max_mhz: default_dial_max(),
        }
    }
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            stations_toml: default_stations_toml(),
        }
    }
}

fn default_volume() -> f32 {
    0.7
}

fn default_settle_ms() -> u64 {
    50
}

fn default_true() -> bool {
    true
}

fn default_duration_secs() -> f64 {
    180.0
}

fn default_switch_delay_ms() -> u64 {
    250
}

fn default_scan_interval_ms() -> u64 {
    2000
}

fn default_signal_interval_ms() -> u64 {
    3000
}

fn default_bars() -> usize {
    150
}

fn default_frame_ms() -> u64 {
    100
}

fn default_signal_bars() -> usize {
    5
}

fn default_dial_min() -> f64 {
    88.1
}

fn default_dial_max() -> f64 {
    107.9
}

fn default_stations_toml() -> PathBuf {
    platform::config_dir().join("stations.toml")
}

impl PlaybackConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl TransitionConfig {
    pub fn switch_delay(&self) -> Duration {
        Duration::from_millis(self.switch_delay_ms)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn signal_interval(&self) -> Duration {
        Duration::from_millis(self.signal_interval_ms)
    }
}

impl SpectrumConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }
}

impl Config {
    /// Load from the default location, writing a default file on first run.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save_to(&config_path)?;
            return Ok(config);
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the timers and the media clock cannot work with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let length = self.playback.default_duration_secs;
        anyhow::ensure!(
            length.is_finite() && length > 0.0,
            "playback.default_duration_secs must be a positive number of seconds, got {length}"
        );
        anyhow::ensure!(
            self.transition.scan_interval_ms > 0,
            "transition.scan_interval_ms must be greater than zero"
        );
        anyhow::ensure!(
            self.transition.signal_interval_ms > 0,
            "transition.signal_interval_ms must be greater than zero"
        );
        anyhow::ensure!(
            self.spectrum.frame_ms > 0,
            "spectrum.frame_ms must be greater than zero"
        );
        anyhow::ensure!(
            self.display.dial_min_mhz < self.display.dial_max_mhz,
            "display.dial_min_mhz must be below display.dial_max_mhz"
        );
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.playback.default_volume, 0.7);
        assert_eq!(config.playback.settle(), Duration::from_millis(50));
        assert!(config.playback.require_gesture);
        assert_eq!(config.transition.switch_delay(), Duration::from_millis(250));
        assert_eq!(config.transition.scan_interval(), Duration::from_secs(2));
        assert_eq!(config.spectrum.bars, 150);
        assert_eq!(config.display.signal_bars, 5);
        assert!(config
            .stations
            .stations_toml
            .ends_with("tuner/stations.toml"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [playback]
            settle_ms = 10

            [spectrum]
            bars = 40
            "#,
        )
        .unwrap();
        assert_eq!(config.playback.settle_ms, 10);
        assert_eq!(config.playback.default_volume, 0.7);
        assert_eq!(config.spectrum.bars, 40);
        assert_eq!(config.spectrum.frame_ms, 100);
        assert_eq!(config.transition.switch_delay_ms, 250);
    }

    #[test]
    fn test_rejects_unusable_values() {
        for bad in [
            "[playback]\ndefault_duration_secs = -1.0",
            "[playback]\ndefault_duration_secs = 0.0",
            "[transition]\nscan_interval_ms = 0",
            "[transition]\nsignal_interval_ms = 0",
            "[spectrum]\nframe_ms = 0",
            "[display]\ndial_min_mhz = 108.0",
        ] {
            assert!(Config::from_toml_str(bad).is_err(), "accepted {bad:?}");
        }
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_load_from_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[transition]\nscan_interval_ms = 0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("scan_interval_ms"));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.transition.scan_interval_ms = 500;
        config.playback.media_root = Some(PathBuf::from("/srv/audio"));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.transition.scan_interval_ms, 500);
        assert_eq!(loaded.playback.media_root, Some(PathBuf::from("/srv/audio")));
    }
}
