//! SpectrumPanel: bar visualizer driven by the station's seeded base profile
//! plus a fresh jitter frame on every animation tick.

use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    widgets::Paragraph,
    Frame,
};

use tuner_core::spectrum::{jitter_frame, FrameBar};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::component::Component;
use crate::theme::{dim, spectrum_color, style_muted, C_SECONDARY};
use crate::widgets::pane_chrome::{pane_chrome, Badge};

/// Characters for vertical bar rendering (8 levels).
const BAR_CHARS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Opacity of the resting profile when nothing plays.
const IDLE_OPACITY: f64 = 0.35;

pub struct SpectrumPanel {
    frame: Vec<FrameBar>,
    /// Seed of the base profile `frame` was built from.
    seed: u64,
    frozen: bool,
    rng: StdRng,
}

impl SpectrumPanel {
    pub fn new() -> Self {
        Self {
            frame: Vec::new(),
            seed: 0,
            frozen: false,
            rng: StdRng::from_entropy(),
        }
    }

    /// Roll the next animation frame.  Returns true when the panel changed.
    pub fn advance(&mut self, state: &AppState) -> bool {
        let Some(snap) = state.snapshot.as_ref() else {
            return false;
        };
        let reseeded = snap.spectrum_seed != self.seed;
        if self.frozen && !reseeded {
            return false;
        }
        self.seed = snap.spectrum_seed;
        if snap.is_playing && !self.frozen {
            self.frame = jitter_frame(&snap.spectrum_base, &mut self.rng);
        } else {
            self.frame = snap
                .spectrum_base
                .iter()
                .map(|&height| FrameBar {
                    height,
                    opacity: IDLE_OPACITY,
                })
                .collect();
        }
        true
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl Default for SpectrumPanel {
    fn default() -> Self {
        Self::new()
    }
}

/// Cells of one bar from the bottom up; `height` is 0..=100.
fn bar_cells(height: f64, rows: u16) -> Vec<char> {
    let levels = (height.clamp(0.0, 100.0) / 100.0 * 8.0 * rows as f64) as usize;
    let full = levels / 8;
    let partial = levels % 8;
    (0..rows as usize)
        .map(|row| {
            if row < full {
                '█'
            } else if row == full && partial > 0 {
                BAR_CHARS[partial]
            } else {
                ' '
            }
        })
        .collect()
}

/// Pick the bar shown in `column` when `bars` bars share `width` columns.
fn bar_for_column(column: usize, width: usize, bars: usize) -> usize {
    if width == 0 || bars == 0 {
        return 0;
    }
    (column * bars / width).min(bars - 1)
}

fn render_bars(frame: &[FrameBar], area: Rect, buf: &mut Buffer) {
    if frame.is_empty() || area.width == 0 || area.height == 0 {
        return;
    }
    let columns = (area.width as usize).min(frame.len());
    let start_x = area.x + ((area.width as usize - columns) / 2) as u16;

    for col in 0..columns {
        let bar = frame[bar_for_column(col, columns, frame.len())];
        let color = dim(spectrum_color(bar.height), bar.opacity);
        let x = start_x + col as u16;
        for (row, ch) in bar_cells(bar.height, area.height).into_iter().enumerate() {
            if ch == ' ' {
                continue;
            }
            let y = area.y + area.height - 1 - row as u16;
            buf[(x, y)].set_char(ch).set_style(Style::default().fg(color));
        }
    }
}

impl Component for SpectrumPanel {
    fn id(&self) -> ComponentId {
        ComponentId::Spectrum
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Char('f') | KeyCode::Enter => vec![Action::ToggleSpectrumFreeze],
            _ => vec![],
        }
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        if *action == Action::ToggleSpectrumFreeze {
            self.frozen = !self.frozen;
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let pattern = state
            .displayed_station()
            .map(|s| format!("{:?}", s.pattern).to_lowercase())
            .unwrap_or_default();
        let badge = if self.frozen {
            Some(Badge {
                text: "FROZEN",
                color: C_SECONDARY,
            })
        } else {
            Some(Badge {
                text: pattern.as_str(),
                color: C_SECONDARY,
            })
        };
        let block = pane_chrome("SPECTRUM", focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if self.frame.is_empty() {
            frame.render_widget(Paragraph::new("·").style(style_muted()), inner);
            return;
        }
        render_bars(&self.frame, inner, frame.buffer_mut());
    }

    fn min_height(&self) -> u16 {
        6
    }
}
