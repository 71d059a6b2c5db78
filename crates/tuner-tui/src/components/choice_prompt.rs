//! ChoicePrompt: modal asking which love the gated station should play.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use tuner_core::protocol::Command;
use tuner_core::station::LoveChoice;

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::component::Component;
use crate::components::centered_rect;
use crate::theme::{style_muted, C_LOVE, C_POPUP_BG, C_PRIMARY};

pub struct ChoicePrompt;

impl ChoicePrompt {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ChoicePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for ChoicePrompt {
    fn id(&self) -> ComponentId {
        ComponentId::ChoicePrompt
    }

    /// Called only while the prompt is open; swallows everything else.
    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        let cmd = match key.code {
            KeyCode::Char('1') | KeyCode::Char('b') => Command::SetLoveChoice {
                choice: LoveChoice::BeingLoved,
            },
            KeyCode::Char('2') | KeyCode::Char('l') => Command::SetLoveChoice {
                choice: LoveChoice::Loving,
            },
            KeyCode::Esc => Command::DismissChoicePrompt,
            _ => return vec![],
        };
        vec![Action::Send(cmd)]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, _focused: bool, state: &AppState) {
        if !state.prompt_open() {
            return;
        }
        let popup = centered_rect(50, 8, area);
        let option = |key: &'static str, choice: LoveChoice| {
            Line::from(vec![
                Span::styled(
                    format!("[{}] ", key),
                    Style::default().fg(C_LOVE).add_modifier(Modifier::BOLD),
                ),
                Span::styled(choice.label(), Style::default().fg(C_PRIMARY)),
            ])
        };
        let lines = vec![
            Line::from(Span::styled(
                "Which love are you tuning in to?",
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            option("1", LoveChoice::BeingLoved),
            option("2", LoveChoice::Loving),
            Line::from(""),
            Line::from(Span::styled("esc to close", style_muted())),
        ];
        frame.render_widget(Clear, popup);
        frame.render_widget(
            Paragraph::new(lines).alignment(Alignment::Center).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(C_LOVE))
                    .style(Style::default().bg(C_POPUP_BG)),
            ),
            popup,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn press(code: KeyCode) -> Vec<Action> {
        ChoicePrompt::new().handle_key(KeyEvent::new(code, KeyModifiers::NONE), &AppState::new())
    }

    #[test]
    fn keys_map_to_choices() {
        assert_eq!(
            press(KeyCode::Char('1')),
            vec![Action::Send(Command::SetLoveChoice {
                choice: LoveChoice::BeingLoved
            })]
        );
        assert_eq!(
            press(KeyCode::Char('l')),
            vec![Action::Send(Command::SetLoveChoice {
                choice: LoveChoice::Loving
            })]
        );
        assert_eq!(
            press(KeyCode::Esc),
            vec![Action::Send(Command::DismissChoicePrompt)]
        );
        assert!(press(KeyCode::Char('x')).is_empty());
    }
}
