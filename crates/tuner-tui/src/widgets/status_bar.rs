//! Bottom lines: last log message and the keybinding footer.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::action::ComponentId;
use crate::theme::{C_ACCENT, C_MUTED, C_PLAYING, C_SECONDARY, C_SEPARATOR};

/// Draw the log bar: on-air dot plus the last log line.
pub fn draw_log_bar(frame: &mut Frame, area: Rect, last_log: Option<&str>, on_air: bool) {
    let dot = if on_air {
        Span::styled("●", Style::default().fg(C_PLAYING))
    } else {
        Span::styled("○", Style::default().fg(C_ACCENT))
    };
    let line = Line::from(vec![
        dot,
        Span::raw(" "),
        Span::styled(last_log.unwrap_or(""), Style::default().fg(C_SECONDARY)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

/// Key hints for the focused pane.
pub fn keys_for(focus: ComponentId) -> &'static str {
    match focus {
        ComponentId::Tuner => {
            " ←→/hl station  1-4 preset  t knob  enter play/stop  s scan  ,/. scrub  -/+ vol  x stop all"
        }
        ComponentId::Spectrum => " f freeze  x stop all",
        ComponentId::Cards => {
            " ↑↓/jk select  enter play/pause  n/p next/prev  ,/. seek  0 rewind  x stop all"
        }
        ComponentId::Narrative => " →/l tune  ←/h back  1-6 story  v volume  x stop all",
        ComponentId::ChoicePrompt => " 1/b being loved  2/l loving  esc close",
        ComponentId::HelpOverlay => " ? or esc close",
    }
}

/// Draw the keybindings footer (one row).
pub fn draw_keys_bar(frame: &mut Frame, area: Rect, focus: ComponentId) {
    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", focus.label()),
            Style::default().fg(C_SECONDARY).add_modifier(Modifier::BOLD),
        ),
        Span::styled(keys_for(focus), Style::default().fg(C_MUTED)),
        Span::styled("  tab panes  ? help  q quit", Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
