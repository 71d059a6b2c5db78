//! NarrativePanel: the "Love Radio" story dial.  Visual only.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use tuner_core::narrative::VOLUME_LEVELS;
use tuner_core::protocol::Command;

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::component::Component;
use crate::theme::{dim, style_muted, style_secondary, C_LOVE, C_PLAYING};
use crate::widgets::pane_chrome::{pane_chrome, Badge};

const WAVE: &str = "∿";
const SIGNAL_BARS: u8 = 4;

pub struct NarrativePanel;

impl NarrativePanel {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NarrativePanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for NarrativePanel {
    fn id(&self) -> ComponentId {
        ComponentId::Narrative
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        let cmd = match key.code {
            KeyCode::Right | KeyCode::Char('l') => Command::NarrativeTuneForward,
            KeyCode::Left | KeyCode::Char('h') => Command::NarrativeTuneBack,
            KeyCode::Char('v') => Command::NarrativeVolume,
            KeyCode::Enter => Command::NarrativeActivate,
            KeyCode::Char(c @ '1'..='9') => {
                let idx = c as usize - '1' as usize;
                let frequency = state
                    .snapshot
                    .as_ref()
                    .and_then(|s| s.narrative.frequencies.get(idx).copied());
                match frequency {
                    Some(frequency) => Command::NarrativeSelect { frequency },
                    None => return vec![],
                }
            }
            _ => return vec![],
        };
        vec![Action::Send(cmd)]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let view = state.snapshot.as_ref().map(|s| &s.narrative);
        let badge = Some(Badge {
            text: "PREVIEW",
            color: C_LOVE,
        });
        let block = pane_chrome("LOVE RADIO", focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(view) = view else {
            return;
        };

        let mut lines = Vec::new();

        // Frequency strip with the current one highlighted.
        let mut strip = Vec::new();
        for f in &view.frequencies {
            let style = if view.active && view.frequency == Some(*f) {
                Style::default().fg(C_LOVE).add_modifier(Modifier::BOLD)
            } else {
                style_muted()
            };
            strip.push(Span::styled(format!(" {:.1} ", f), style));
        }
        lines.push(Line::from(strip));

        if view.active {
            let bars: String = (0..SIGNAL_BARS)
                .map(|i| if i < view.signal { '▮' } else { '▯' })
                .collect();
            lines.push(Line::from(vec![
                Span::styled("signal ", style_muted()),
                Span::styled(bars, Style::default().fg(C_PLAYING)),
                Span::styled("   knob ", style_muted()),
                Span::styled(format!("{:.0}°", view.knob_deg), style_secondary()),
            ]));
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                view.title.clone().unwrap_or_default(),
                Style::default().fg(C_LOVE).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                view.subtitle.clone().unwrap_or_default(),
                style_secondary(),
            )));
        } else {
            lines.push(Line::from(Span::styled("static… press enter", style_muted())));
        }

        lines.push(Line::from(""));
        let level = view.volume_level.min(VOLUME_LEVELS - 1);
        lines.push(Line::from(vec![
            Span::styled("vol ", style_muted()),
            Span::styled(
                format!("{}/{}", level, VOLUME_LEVELS - 1),
                style_secondary(),
            ),
            Span::raw("  "),
            Span::styled(
                WAVE.repeat(inner.width.saturating_sub(10) as usize),
                Style::default().fg(dim(C_LOVE, view.wave_opacity / 0.3)),
            ),
        ]));

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
    }

    fn min_height(&self) -> u16 {
        9
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::sample_snapshot;
    use ratatui::crossterm::event::KeyModifiers;

    #[test]
    fn digit_selects_story_frequency() {
        let state = AppState {
            snapshot: Some(sample_snapshot()),
            ..AppState::new()
        };
        let first = state.snapshot.as_ref().unwrap().narrative.frequencies[0];
        let mut panel = NarrativePanel::new();
        let actions = panel.handle_key(KeyEvent::new(KeyCode::Char('1'), KeyModifiers::NONE), &state);
        assert_eq!(
            actions,
            vec![Action::Send(Command::NarrativeSelect { frequency: first })]
        );
        assert!(panel
            .handle_key(KeyEvent::new(KeyCode::Char('9'), KeyModifiers::NONE), &state)
            .is_empty());
    }
}
