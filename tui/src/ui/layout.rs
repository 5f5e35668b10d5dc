use crate::app::{App, PX_PER_COL, PX_PER_ROW};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};
use stickies_core::card::{CARD_HEIGHT, CARD_WIDTH};

use super::{
    render_banner, render_canvas, render_color_popup, render_form, render_header, render_help_screen,
    render_status_bar, render_summary_modal,
};

/// Height of the creation form including its border
const FORM_HEIGHT: u16 = 7;

/// Render the complete UI
pub fn render(frame: &mut Frame, app: &mut App) {
    app.hit_regions.clear();
    let size = frame.size();
    let banner_height = if app.board.alerts().banner().is_some() { 1 } else { 0 };

    // Create main layout: header, alert banner, form, canvas, status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),             // Header
            Constraint::Length(banner_height), // Alert banner
            Constraint::Length(FORM_HEIGHT),   // Creation form
            Constraint::Min(0),                // Canvas
            Constraint::Length(1),             // Status bar
        ])
        .split(size);

    render_header(frame, app, chunks[0]);
    if banner_height > 0 {
        render_banner(frame, app, chunks[1]);
    }
    render_form(frame, app, chunks[2]);
    render_canvas(frame, app, chunks[3]);
    render_status_bar(frame, app, chunks[4]);

    // Overlays (drawn last)
    if app.color_popup.is_some() {
        render_color_popup(frame, app);
    }
    if app.summary.is_some() {
        render_summary_modal(frame, app, size);
    }
    if app.help_open {
        render_help_screen(frame, app, size);
    }
}

/// Screen cells of a card at canvas position (`x`, `y`), clipped to `canvas`
pub fn card_rect(canvas: Rect, x: i32, y: i32) -> Rect {
    let col = i32::from(canvas.x) + x.max(0) / PX_PER_COL;
    let row = i32::from(canvas.y) + y.max(0) / PX_PER_ROW;
    let full = Rect {
        x: col.clamp(0, i32::from(u16::MAX)) as u16,
        y: row.clamp(0, i32::from(u16::MAX)) as u16,
        width: (CARD_WIDTH / PX_PER_COL) as u16,
        height: (CARD_HEIGHT / PX_PER_ROW) as u16,
    };
    full.intersection(canvas)
}
