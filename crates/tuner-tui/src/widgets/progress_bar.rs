//! Smooth Unicode progress bar with `m:ss` / `-m:ss` labels.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use tuner_core::dial::{format_remaining, format_time, progress_percent};

use crate::theme::{C_MUTED, C_PLAYING, C_SECONDARY};

const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Build the bar body: `width` cells filled to `percent` (0..=100) in eighths.
pub fn bar_string(percent: f64, width: usize) -> String {
    let eighths = (percent.clamp(0.0, 100.0) / 100.0 * width as f64 * 8.0) as usize;
    let full = eighths / 8;
    let partial = eighths % 8;

    let mut bar = String::with_capacity(width * 3);
    bar.extend(std::iter::repeat('█').take(full.min(width)));
    if full < width {
        bar.push(BLOCKS[partial]);
        bar.extend(std::iter::repeat(' ').take(width - full - 1));
    }
    bar
}

/// Render elapsed time, the bar and remaining time in `area`.
pub fn draw_progress(frame: &mut Frame, area: Rect, position: Option<f64>, duration: Option<f64>) {
    if area.width < 4 || area.height == 0 {
        return;
    }

    let current = position.unwrap_or(0.0);
    let left = format_time(current);
    let right = match duration {
        Some(d) => format_remaining(current, d),
        None => "-:--".to_string(),
    };
    let label_w = (left.chars().count() + right.chars().count() + 2) as u16;
    let bar_w = area.width.saturating_sub(label_w).max(4) as usize;

    let line = Line::from(vec![
        Span::styled(format!("{} ", left), Style::default().fg(C_SECONDARY)),
        Span::styled(
            bar_string(progress_percent(current, duration), bar_w),
            Style::default().fg(C_PLAYING),
        ),
        Span::styled(format!(" {}", right), Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}
