//! TunerPanel: the main radio face.  Frequency readout, station metadata,
//! signal meter, dial strip, knobs, progress and the preset row.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use tuner_core::dial;
use tuner_core::protocol::{Command, TunerSnapshot};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::component::Component;
use crate::theme::{
    style_default, style_muted, style_secondary, style_selected, C_CHANGING, C_DIAL, C_LOVE,
    C_MUTED, C_PLAYING, C_PRIMARY,
};
use crate::widgets::pane_chrome::{pane_chrome, Badge};
use crate::widgets::progress_bar::draw_progress;

/// Relative scrub step for `,` / `.`.
const SCRUB_STEP: f64 = 0.05;
/// Cells kept free at each end of the dial strip.
const DIAL_PADDING: f64 = 1.0;

pub struct TunerPanel;

impl TunerPanel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TunerPanel {
    fn default() -> Self {
        Self::new()
    }
}

fn scrub_target(snap: &TunerSnapshot, delta: f64) -> Option<f64> {
    let duration = snap.duration_secs.filter(|d| *d > 0.0)?;
    let position = snap.position_secs.unwrap_or(0.0);
    Some((position / duration + delta).clamp(0.0, 1.0))
}

impl Component for TunerPanel {
    fn id(&self) -> ComponentId {
        ComponentId::Tuner
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        let cmd = match key.code {
            KeyCode::Right | KeyCode::Char('l') => Command::NextStation,
            KeyCode::Left | KeyCode::Char('h') => Command::PrevStation,
            KeyCode::Char('t') => Command::TuneKnob,
            KeyCode::Enter | KeyCode::Char(' ') => Command::TogglePlayback,
            KeyCode::Char(c @ '1'..='9') => Command::SelectPreset {
                index: c as usize - '1' as usize,
            },
            KeyCode::Char(',') | KeyCode::Char('.') => {
                let delta = if key.code == KeyCode::Char(',') {
                    -SCRUB_STEP
                } else {
                    SCRUB_STEP
                };
                match state.snapshot.as_ref().and_then(|s| scrub_target(s, delta)) {
                    Some(fraction) => Command::ScrubMain { fraction },
                    None => return vec![],
                }
            }
            _ => return vec![],
        };
        vec![Action::Send(cmd)]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let badge = state.snapshot.as_ref().and_then(|s| {
            if s.scanning {
                Some(Badge {
                    text: "SCAN",
                    color: C_DIAL,
                })
            } else if s.changing {
                Some(Badge {
                    text: "TUNING",
                    color: C_CHANGING,
                })
            } else if s.is_playing {
                Some(Badge {
                    text: "ON AIR",
                    color: C_PLAYING,
                })
            } else {
                None
            }
        });
        let block = pane_chrome("TUNER", focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(snap) = state.snapshot.as_ref() else {
            frame.render_widget(Paragraph::new("warming up…").style(style_muted()), inner);
            return;
        };
        let Some(station) = snap.displayed() else {
            frame.render_widget(Paragraph::new("no stations").style(style_muted()), inner);
            return;
        };

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // frequency + signal
                Constraint::Length(1), // name
                Constraint::Length(1), // track / artist
                Constraint::Length(1), // album / genre
                Constraint::Length(1), // dial strip
                Constraint::Length(1), // knobs + volume
                Constraint::Length(1), // progress
                Constraint::Min(1),    // presets
            ])
            .split(inner);

        // Frequency readout and signal meter.
        let mut bars = String::new();
        for i in 0..snap.signal_bars_total {
            bars.push(if i < snap.signal_bars_lit { '▮' } else { '▯' });
        }
        let freq_style = if snap.changing {
            Style::default().fg(C_CHANGING).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(C_DIAL).add_modifier(Modifier::BOLD)
        };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(format!("{:>9}", station.freq), freq_style),
                Span::styled(format!("  {}  ", dial::stat_label(&station.freq)), style_muted()),
                Span::styled(bars, Style::default().fg(C_PLAYING)),
                Span::styled(format!("  {}", station.mode), style_secondary()),
            ])),
            rows[0],
        );

        let name_style = if station.is_gated() {
            Style::default().fg(C_LOVE).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
        };
        let mut name = vec![Span::styled(station.name.clone(), name_style)];
        if let Some(choice) = snap.love_choice.filter(|_| station.is_gated()) {
            name.push(Span::styled(format!("  ♥ {}", choice.label()), Style::default().fg(C_LOVE)));
        }
        frame.render_widget(Paragraph::new(Line::from(name)), rows[1]);

        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(station.track.clone(), style_default()),
                Span::styled("  by  ", style_muted()),
                Span::styled(station.artist.clone(), style_secondary()),
            ])),
            rows[2],
        );
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(station.album.clone(), style_secondary()),
                Span::styled(" · ", style_muted()),
                Span::styled(station.genre.clone(), style_muted()),
            ])),
            rows[3],
        );

        frame.render_widget(Paragraph::new(dial_line(snap.dial_percent, rows[4].width)), rows[4]);

        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("main ", style_muted()),
                Span::styled(format!("{:>5.1}°", snap.main_knob_deg), style_secondary()),
                Span::styled("   home ", style_muted()),
                Span::styled(
                    format!("{:>6.1}°", snap.home_knob_deg),
                    style_secondary(),
                ),
                Span::styled("   vol ", style_muted()),
                Span::styled(format!("{:>3}%", state.volume_percent()), style_secondary()),
            ])),
            rows[5],
        );

        draw_progress(frame, rows[6], snap.position_secs, snap.duration_secs);

        let mut presets = Vec::new();
        for (i, s) in snap.stations.iter().enumerate() {
            let label = format!(" {} {} ", i + 1, s.freq);
            let style = if snap.active_preset == Some(i) {
                style_selected(focused)
            } else {
                style_muted()
            };
            presets.push(Span::styled(label, style));
            presets.push(Span::raw(" "));
        }
        frame.render_widget(Paragraph::new(Line::from(presets)), rows[7]);
    }

    fn min_height(&self) -> u16 {
        10
    }
}

/// The dial strip: a rule with a needle at `dial_percent`.
fn dial_line(dial_percent: f64, width: u16) -> Line<'static> {
    let w = width as usize;
    if w < 3 {
        return Line::default();
    }
    let pct = dial::indicator_position(dial_percent.clamp(0.0, 100.0), w as f64, DIAL_PADDING);
    let needle = ((pct / 100.0 * w as f64) as usize).min(w - 1);
    let left: String = "┈".repeat(needle);
    let right: String = "┈".repeat(w - needle - 1);
    Line::from(vec![
        Span::styled(left, Style::default().fg(C_MUTED)),
        Span::styled("┃", Style::default().fg(C_DIAL).add_modifier(Modifier::BOLD)),
        Span::styled(right, Style::default().fg(C_MUTED)),
    ])
}
