//! CardList: the per-card players, one row each with its own progress bar.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use tuner_core::cards::CardView;
use tuner_core::protocol::Command;

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::component::Component;
use crate::theme::{style_muted, style_secondary, style_selected, C_ACCENT, C_PLAYING, C_PRIMARY};
use crate::widgets::pane_chrome::{pane_chrome, Badge};
use crate::widgets::progress_bar::draw_progress;

/// Seek step for `,` / `.`, in seconds.
const SEEK_STEP_SECS: f64 = 10.0;

pub struct CardList {
    selected: usize,
}

impl CardList {
    pub fn new() -> Self {
        Self { selected: 0 }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    fn cards<'a>(state: &'a AppState) -> &'a [CardView] {
        state
            .snapshot
            .as_ref()
            .map(|s| s.cards.as_slice())
            .unwrap_or(&[])
    }

    fn selected_card<'a>(&self, state: &'a AppState) -> Option<&'a CardView> {
        Self::cards(state).get(self.selected)
    }

    /// Move the selection onto `id` (used after next/prev jumps).
    fn select_id(&mut self, id: &str, state: &AppState) {
        if let Some(pos) = Self::cards(state).iter().position(|c| c.id == id) {
            self.selected = pos;
        }
    }
}

impl Default for CardList {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for CardList {
    fn id(&self) -> ComponentId {
        ComponentId::Cards
    }

    fn handle_key(&mut self, key: KeyEvent, state: &AppState) -> Vec<Action> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => return vec![Action::SelectUp],
            KeyCode::Down | KeyCode::Char('j') => return vec![Action::SelectDown],
            _ => {}
        }
        let Some(card) = self.selected_card(state) else {
            return vec![];
        };
        let id = card.id.clone();
        let cmd = match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => Command::CardToggle { id },
            KeyCode::Char('n') => Command::CardNext { id },
            KeyCode::Char('p') => Command::CardPrev { id },
            KeyCode::Char('0') => Command::CardSeek { id, seconds: 0.0 },
            KeyCode::Char(',') => Command::CardSeek {
                seconds: (card.position_secs - SEEK_STEP_SECS).max(0.0),
                id,
            },
            KeyCode::Char('.') => Command::CardSeek {
                seconds: card.position_secs + SEEK_STEP_SECS,
                id,
            },
            _ => return vec![],
        };
        vec![Action::Send(cmd)]
    }

    fn on_action(&mut self, action: &Action, state: &AppState) -> Vec<Action> {
        let len = Self::cards(state).len();
        match action {
            Action::SelectUp if len > 0 => {
                self.selected = (self.selected + len - 1) % len;
            }
            Action::SelectDown if len > 0 => {
                self.selected = (self.selected + 1) % len;
            }
            // Follow the neighbor the core is about to start.
            Action::Send(Command::CardNext { id }) | Action::Send(Command::CardPrev { id }) => {
                let forward = matches!(action, Action::Send(Command::CardNext { .. }));
                let cards = Self::cards(state);
                if let Some(pos) = cards.iter().position(|c| &c.id == id) {
                    let next = if forward {
                        (pos + 1) % cards.len()
                    } else {
                        (pos + cards.len() - 1) % cards.len()
                    };
                    let target = cards[next].id.clone();
                    self.select_id(&target, state);
                }
            }
            _ => {}
        }
        vec![]
    }

    fn tick(&mut self, state: &AppState) -> Vec<Action> {
        let len = Self::cards(state).len();
        if len > 0 && self.selected >= len {
            self.selected = len - 1;
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let cards = Self::cards(state);
        let badge = cards.iter().find(|c| c.playing).map(|_| Badge {
            text: "PLAYING",
            color: C_PLAYING,
        });
        let block = pane_chrome("CARDS", focused, badge);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if cards.is_empty() {
            frame.render_widget(Paragraph::new("no cards").style(style_muted()), inner);
            return;
        }

        // Two rows per card: title line, progress line.
        let mut y = inner.y;
        for (i, card) in cards.iter().enumerate() {
            if y + 1 >= inner.y + inner.height {
                break;
            }
            let icon = if card.playing { "▶" } else { "‖" };
            let icon_style = if !card.available {
                Style::default().fg(C_ACCENT)
            } else if card.playing {
                Style::default().fg(C_PLAYING)
            } else {
                style_muted()
            };
            let title_style = if i == self.selected {
                style_selected(focused)
            } else {
                Style::default().fg(C_PRIMARY).add_modifier(Modifier::BOLD)
            };
            let title = Line::from(vec![
                Span::styled(format!(" {} ", icon), icon_style),
                Span::styled(card.title.clone(), title_style),
                Span::styled(format!("  {}", card.subtitle), style_secondary()),
            ]);
            frame.render_widget(
                Paragraph::new(title),
                Rect {
                    x: inner.x,
                    y,
                    width: inner.width,
                    height: 1,
                },
            );
            draw_progress(
                frame,
                Rect {
                    x: inner.x + 3,
                    y: y + 1,
                    width: inner.width.saturating_sub(4),
                    height: 1,
                },
                Some(card.position_secs),
                card.duration_secs,
            );
            y += 2;
        }
    }

    fn min_height(&self) -> u16 {
        6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::sample_snapshot;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn state() -> AppState {
        AppState {
            snapshot: Some(sample_snapshot()),
            ..AppState::new()
        }
    }

    #[test]
    fn selection_wraps() {
        let state = state();
        let len = state.snapshot.as_ref().map_or(0, |s| s.cards.len());
        assert!(len > 1);
        let mut list = CardList::new();
        list.on_action(&Action::SelectUp, &state);
        assert_eq!(list.selected(), len - 1);
        list.on_action(&Action::SelectDown, &state);
        assert_eq!(list.selected(), 0);
    }

    #[test]
    fn enter_toggles_the_selected_card() {
        let state = state();
        let first = state.snapshot.as_ref().unwrap().cards[0].id.clone();
        let mut list = CardList::new();
        let actions = list.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE), &state);
        assert_eq!(actions, vec![Action::Send(Command::CardToggle { id: first })]);
    }

    #[test]
    fn prev_from_first_selects_last() {
        let state = state();
        let mut list = CardList::new();
        let actions = list.handle_key(key('p'), &state);
        list.on_action(&actions[0], &state);
        assert_eq!(list.selected(), state.snapshot.as_ref().unwrap().cards.len() - 1);
    }

    #[test]
    fn seek_back_never_goes_negative() {
        let state = state();
        let mut list = CardList::new();
        match list.handle_key(key(','), &state).as_slice() {
            [Action::Send(Command::CardSeek { seconds, .. })] => assert_eq!(*seconds, 0.0),
            other => panic!("unexpected actions: {:?}", other),
        }
    }
}
