pub mod card_list;
pub mod choice_prompt;
pub mod help_overlay;
pub mod narrative_panel;
pub mod spectrum_panel;
pub mod tuner_panel;

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// A `percent_x` wide, `height` tall rectangle centred in `r`.
pub fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1])[1]
}
