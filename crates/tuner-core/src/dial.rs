//! Knob, dial and meter arithmetic shared by the tuner and the front-end.

use crate::station::SignalTier;

/// Sweep of the main tuning knob across the whole station list.
pub const MAIN_KNOB_SWEEP_DEG: f64 = 270.0;
/// Rotation of the home knob per station step.
pub const HOME_KNOB_STEP_DEG: f64 = 90.0;

/// Parse "101.5 FM" (or a bare "101.5") into MHz.
pub fn parse_frequency(label: &str) -> Option<f64> {
    label
        .trim()
        .trim_end_matches("FM")
        .trim_end_matches("MHz")
        .trim()
        .parse()
        .ok()
}

/// "88.5 FM" → "88.5 MHz" for the stats line.
pub fn stat_label(label: &str) -> String {
    label.replace(" FM", " MHz")
}

/// Main knob angle: stations spread evenly over the knob sweep.
pub fn main_knob_angle(index: usize, station_count: usize) -> f64 {
    if station_count <= 1 {
        return 0.0;
    }
    index as f64 * MAIN_KNOB_SWEEP_DEG / (station_count - 1) as f64
}

/// Number of lit bars out of `total` for a signal tier.
pub fn lit_signal_bars(tier: SignalTier, total: usize) -> usize {
    match tier {
        SignalTier::Strong => total,
        SignalTier::Medium => total.min(3),
        SignalTier::Weak => total.min(2),
    }
}

/// Where a frequency sits on the dial, in percent of the full dial width.
pub fn dial_position(freq_mhz: f64, min_mhz: f64, max_mhz: f64) -> f64 {
    if max_mhz <= min_mhz {
        return 0.0;
    }
    (freq_mhz - min_mhz) / (max_mhz - min_mhz) * 100.0
}

/// Dial position corrected for symmetric padding inside a container of
/// `width` units, in percent of the container width.
pub fn indicator_position(base_percent: f64, width: f64, padding: f64) -> f64 {
    if width <= 0.0 {
        return base_percent;
    }
    let usable = width - 2.0 * padding;
    padding / width * 100.0 + base_percent * (usable / width)
}

/// Home knob rotation, tracked as an unbounded angle so the animation always
/// turns the short way.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HomeKnob {
    pub rotation_deg: f64,
}

impl HomeKnob {
    pub fn advance(&mut self) {
        self.rotation_deg += HOME_KNOB_STEP_DEG;
    }

    pub fn retreat(&mut self) {
        self.rotation_deg -= HOME_KNOB_STEP_DEG;
    }

    pub fn set_index(&mut self, index: usize) {
        self.rotation_deg = index as f64 * HOME_KNOB_STEP_DEG;
    }
}

/// Format seconds as `m:ss`.
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Remaining time as `-m:ss`.
pub fn format_remaining(current: f64, duration: f64) -> String {
    format!("-{}", format_time((duration - current).max(0.0)))
}

/// Progress in percent, capped at 100.  Zero while the duration is unknown.
pub fn progress_percent(current: f64, duration: Option<f64>) -> f64 {
    match duration {
        Some(d) if d > 0.0 && d.is_finite() => (current / d * 100.0).clamp(0.0, 100.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_frequency_labels() {
        assert_eq!(parse_frequency("88.5 FM"), Some(88.5));
        assert_eq!(parse_frequency("101.5 FM"), Some(101.5));
        assert_eq!(parse_frequency("97.8"), Some(97.8));
        assert_eq!(parse_frequency("FM"), None);
        assert_eq!(stat_label("92.3 FM"), "92.3 MHz");
    }

    #[test]
    fn main_knob_spans_sweep() {
        assert_eq!(main_knob_angle(0, 4), 0.0);
        assert_eq!(main_knob_angle(3, 4), 270.0);
        assert_eq!(main_knob_angle(1, 4), 90.0);
        assert_eq!(main_knob_angle(0, 1), 0.0);
    }

    #[test]
    fn signal_tiers_light_bars() {
        assert_eq!(lit_signal_bars(SignalTier::Strong, 5), 5);
        assert_eq!(lit_signal_bars(SignalTier::Medium, 5), 3);
        assert_eq!(lit_signal_bars(SignalTier::Weak, 5), 2);
        assert_eq!(lit_signal_bars(SignalTier::Medium, 2), 2);
    }

    #[test]
    fn dial_positions() {
        assert_eq!(dial_position(88.1, 88.1, 107.9), 0.0);
        assert!((dial_position(107.9, 88.1, 107.9) - 100.0).abs() < 1e-9);
        // 10-unit padding on a 200-unit container
        let adjusted = indicator_position(50.0, 200.0, 10.0);
        assert!((adjusted - (5.0 + 50.0 * 0.9)).abs() < 1e-9);
        assert_eq!(indicator_position(42.0, 0.0, 10.0), 42.0);
    }

    #[test]
    fn home_knob_steps() {
        let mut knob = HomeKnob::default();
        knob.advance();
        knob.advance();
        assert_eq!(knob.rotation_deg, 180.0);
        knob.retreat();
        assert_eq!(knob.rotation_deg, 90.0);
        knob.set_index(3);
        assert_eq!(knob.rotation_deg, 270.0);
    }

    #[test]
    fn formats_times() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_remaining(30.0, 95.0), "-1:05");
        assert_eq!(format_remaining(120.0, 95.0), "-0:00");
    }

    #[test]
    fn progress_is_capped() {
        assert_eq!(progress_percent(30.0, Some(60.0)), 50.0);
        assert_eq!(progress_percent(90.0, Some(60.0)), 100.0);
        assert_eq!(progress_percent(10.0, None), 0.0);
    }
}
