use crate::app::{App, CardPart, FormField, HitTarget, Pane, GENERATING_SUMMARY};
use chrono::Local;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use stickies_core::card::CardState;
use stickies_core::history::HISTORY_LIMIT;
use stickies_core::models::{FontSize, Note, NoteColor, Rgb};
use unicode_width::UnicodeWidthStr;

use super::card_rect;

/// Controls along the bottom edge of a card, labelled with their default keys
const CARD_CONTROLS: [(&str, CardPart); 6] = [
    ("[S]", CardPart::Strike),
    ("[D]", CardPart::Delete),
    ("[C]", CardPart::Color),
    ("[M]", CardPart::Summarize),
    ("[X]", CardPart::Expand),
    ("[E]", CardPart::Edit),
];

const TEXT_LINES: u16 = 3;

fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

/// A run of text on one row, optionally clickable
struct Segment {
    text: String,
    style: Style,
    target: Option<HitTarget>,
}

impl Segment {
    fn new(text: impl Into<String>, style: Style, target: Option<HitTarget>) -> Self {
        Self {
            text: text.into(),
            style,
            target,
        }
    }

    fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Style::default(), None)
    }
}

/// Lay segments out left to right on `area`'s first row, returning the line and
/// the screen rectangles of the clickable ones.
fn lay_out_row(area: Rect, segments: Vec<Segment>) -> (Line<'static>, Vec<(Rect, HitTarget)>) {
    let mut spans = Vec::with_capacity(segments.len());
    let mut regions = Vec::new();
    let mut x = area.x;
    let right = area.x.saturating_add(area.width);

    for segment in segments {
        let width = segment.text.width() as u16;
        if let Some(target) = segment.target {
            if x < right {
                let clipped = width.min(right - x);
                regions.push((Rect::new(x, area.y, clipped, 1), target));
            }
        }
        x = x.saturating_add(width);
        spans.push(Span::styled(segment.text, segment.style));
    }

    (Line::from(spans), regions)
}

/// Render the header with title, signed-in user and key hints
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let keymap = &app.config.keymap;
    let mut user = format!(" user {} ", app.session.short_id());
    if app.session.degraded {
        user.push_str("(offline) ");
    }

    let key_hints = if app.form.editing.is_some() {
        " [Enter:Save] [Esc:Cancel] [Alt+Enter:Newline] ".to_string()
    } else {
        format!(
            " [{}:Undo] [{}:Generate] [Tab:Next note] [{}:Help] [{}:Quit] ",
            keymap.undo, keymap.generate, keymap.help, keymap.quit
        )
    };

    let header_spans = vec![
        Span::styled(
            " 🗒 Sticky Notes ",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ),
        Span::raw("|"),
        Span::styled(
            user,
            if app.session.degraded {
                Style::default().fg(Color::Red)
            } else {
                Style::default().fg(Color::Cyan)
            },
        ),
        Span::raw("|"),
        Span::styled(key_hints, Style::default().fg(Color::DarkGray)),
    ];

    let header = Paragraph::new(Line::from(header_spans))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);

    frame.render_widget(header, area);
}

/// Render the alert banner. Clicking anywhere on it dismisses both alerts.
pub fn render_banner(frame: &mut Frame, app: &mut App, area: Rect) {
    let Some(message) = app.board.alerts().banner().map(str::to_string) else {
        return;
    };

    let banner = Paragraph::new(Line::from(vec![
        Span::styled(format!(" ⚠ {} ", message), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("[x]"),
    ]))
    .style(Style::default().bg(Color::Red).fg(Color::White));

    frame.render_widget(banner, area);
    app.hit_regions.push((area, HitTarget::Banner));
}

/// Render the note form: text, palette pickers and action buttons
pub fn render_form(frame: &mut Frame, app: &mut App, area: Rect) {
    let editing = app.form.editing.is_some();
    let active = app.pane == Pane::Form;

    let block = Block::default()
        .title(if editing { " Edit Note " } else { " New Note " })
        .borders(Borders::ALL)
        .border_style(if active {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        });
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let mut regions = Vec::new();

    // Text lines, scrolled so the cursor stays visible
    let text_area = Rect::new(inner.x, inner.y, inner.width, TEXT_LINES.min(inner.height));
    let (cursor_line, cursor_col) = app.form.cursor_line_col();
    let first_line = cursor_line.saturating_sub(usize::from(text_area.height).saturating_sub(1));
    let text = if app.form.text.is_empty() {
        let placeholder = if editing {
            "Edit your note..."
        } else {
            "Type a new note, or a topic to generate..."
        };
        Paragraph::new(Span::styled(placeholder, Style::default().fg(Color::DarkGray)))
    } else {
        let lines: Vec<Line> = app
            .form
            .text
            .split('\n')
            .skip(first_line)
            .take(usize::from(text_area.height))
            .map(|line| Line::from(line.to_string()))
            .collect();
        Paragraph::new(lines).style(Style::default().fg(rgb(app.form.font_color.swatch())))
    };
    frame.render_widget(text, text_area);
    regions.push((text_area, HitTarget::FormText));

    if active && app.form.field == FormField::Text {
        let line = app.form.text.split('\n').nth(cursor_line).unwrap_or("");
        let before: String = line.chars().take(cursor_col).collect();
        let x = inner.x.saturating_add(before.width() as u16).min(inner.right().saturating_sub(1));
        let y = text_area.y + (cursor_line - first_line) as u16;
        frame.set_cursor(x, y);
    }

    // Palette pickers
    if inner.height > TEXT_LINES {
        let row = Rect::new(inner.x, inner.y + TEXT_LINES, inner.width, 1);
        let picker = |field: FormField, label: &str, value: String| {
            let selected = active && app.form.field == field;
            let style = if selected {
                Style::default().bg(Color::Blue).fg(Color::White)
            } else {
                Style::default().fg(Color::Gray)
            };
            Segment::new(format!("{}: ‹{}›", label, value), style, Some(HitTarget::Picker(field)))
        };
        let segments = vec![
            Segment::new(
                "■ ",
                Style::default().fg(rgb(app.form.note_color.background())),
                None,
            ),
            picker(FormField::NoteColor, "Color", app.form.note_color.to_string()),
            Segment::plain("  "),
            Segment::new("■ ", Style::default().fg(rgb(app.form.font_color.swatch())), None),
            picker(FormField::FontColor, "Font", app.form.font_color.to_string()),
            Segment::plain("  "),
            picker(FormField::FontSize, "Size", app.form.font_size.to_string()),
        ];
        let (line, row_regions) = lay_out_row(row, segments);
        frame.render_widget(Paragraph::new(line), row);
        regions.extend(row_regions);
    }

    // Buttons
    if inner.height > TEXT_LINES + 1 {
        let row = Rect::new(inner.x, inner.y + TEXT_LINES + 1, inner.width, 1);
        let enabled = Style::default().fg(Color::Black).bg(Color::Cyan);
        let disabled = Style::default().fg(Color::DarkGray);

        let generating = app.is_generating();
        let can_generate = !editing && !generating && !app.form.text.trim().is_empty();
        let mut segments = vec![
            Segment::new(
                if generating { " Generating... " } else { " ✨ Generate " },
                if can_generate { enabled } else { disabled },
                Some(HitTarget::Generate),
            ),
            Segment::plain(" "),
            Segment::new(
                if editing { " Save Changes " } else { " Add Note " },
                if app.form.text.trim().is_empty() { disabled } else { enabled },
                Some(HitTarget::Submit),
            ),
        ];
        if editing {
            segments.push(Segment::plain(" "));
            segments.push(Segment::new(
                " Cancel ",
                Style::default().fg(Color::White).bg(Color::DarkGray),
                Some(HitTarget::Cancel),
            ));
        }
        segments.push(Segment::plain(" "));
        segments.push(Segment::new(
            " ↶ Undo ",
            if app.board.can_undo() { enabled } else { disabled },
            Some(HitTarget::Undo),
        ));

        let (line, row_regions) = lay_out_row(row, segments);
        frame.render_widget(Paragraph::new(line), row);
        regions.extend(row_regions);
    }

    app.hit_regions.extend(regions);
}

/// Render the canvas and every card on it, bottom-most first
pub fn render_canvas(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default()
        .title(" Canvas ")
        .borders(Borders::ALL)
        .border_style(if app.pane == Pane::Canvas {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        });
    let inner = block.inner(area);
    frame.render_widget(block, area);
    app.canvas_area = inner;

    if !app.board.is_loaded() || app.board.canvas().is_empty() {
        let message = if app.board.is_loaded() {
            "No notes yet. Add one above!"
        } else {
            "Initializing..."
        };
        let y = inner.y + inner.height / 2;
        let row = Rect::new(inner.x, y.min(inner.bottom().saturating_sub(1)), inner.width, inner.height.min(1));
        let empty = Paragraph::new(message)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, row);
        return;
    }

    let focused = app.board.focused_id().map(str::to_string);
    let cards: Vec<(Note, (i32, i32), CardState)> = app
        .board
        .canvas()
        .render_order()
        .into_iter()
        .filter_map(|placed| {
            let position = app.card_position(placed.id())?;
            Some((placed.note.clone(), position, app.card_state(placed.id())))
        })
        .collect();

    let mut regions = Vec::new();
    for (note, (x, y), state) in cards {
        let rect = card_rect(inner, x, y);
        if rect.width == 0 || rect.height == 0 {
            continue;
        }
        let is_focused = focused.as_deref() == Some(note.id.as_str());
        regions.extend(render_card(frame, &note, rect, is_focused, state));
    }
    app.hit_regions.extend(regions);
}

/// Draw one card and return its clickable parts, body first
fn render_card(frame: &mut Frame, note: &Note, rect: Rect, focused: bool, state: CardState) -> Vec<(Rect, HitTarget)> {
    let card = |part: CardPart| HitTarget::Card {
        id: note.id.clone(),
        part,
    };
    let background = rgb(note.note_color.background());
    let chrome = Style::default().fg(rgb(note.note_color.text())).bg(background);

    let title = match state {
        CardState::Editing => " ⠿ editing ",
        _ if state.is_dragging() => " ⠿ moving ",
        _ => " ⠿ ",
    };
    let mut border_style = Style::default().fg(rgb(note.note_color.border())).bg(background);
    if focused || state.is_dragging() {
        border_style = border_style.add_modifier(Modifier::BOLD);
    }
    let block = Block::default()
        .title(Span::styled(title, chrome))
        .borders(Borders::ALL)
        .border_type(if focused { BorderType::Thick } else { BorderType::Rounded })
        .border_style(border_style)
        .style(Style::default().bg(background));
    let inner = block.inner(rect);

    frame.render_widget(Clear, rect);
    frame.render_widget(block, rect);

    let mut regions = vec![
        (rect, card(CardPart::Body)),
        (Rect::new(rect.x, rect.y, rect.width, 1), card(CardPart::Handle)),
    ];
    if inner.width == 0 || inner.height == 0 {
        return regions;
    }

    // Body text
    let body_area = Rect::new(inner.x, inner.y, inner.width, inner.height.saturating_sub(1));
    let mut text_style = Style::default().fg(rgb(note.font_color.swatch())).bg(background);
    text_style = match note.font_size {
        FontSize::Small => text_style.add_modifier(Modifier::DIM),
        FontSize::Medium => text_style,
        FontSize::Large => text_style.add_modifier(Modifier::BOLD),
        FontSize::ExtraLarge => text_style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
    };
    if note.is_struck_through {
        text_style = text_style.add_modifier(Modifier::CROSSED_OUT | Modifier::DIM);
    }
    let lines: Vec<Line> = note.text.split('\n').map(|line| Line::from(line.to_string())).collect();
    frame.render_widget(
        Paragraph::new(lines).style(text_style).wrap(Wrap { trim: false }),
        body_area,
    );

    // Footer: controls on the left, creation date on the right
    let footer = Rect::new(inner.x, inner.bottom() - 1, inner.width, 1);
    let mut segments = Vec::with_capacity(CARD_CONTROLS.len());
    for (label, part) in CARD_CONTROLS {
        let style = if part == CardPart::Strike && note.is_struck_through {
            chrome.add_modifier(Modifier::REVERSED)
        } else {
            chrome
        };
        segments.push(Segment::new(label, style, Some(card(part))));
    }
    let (controls, control_regions) = lay_out_row(footer, segments);
    frame.render_widget(Paragraph::new(controls), footer);
    regions.extend(control_regions);

    if let Some(created) = note.created_at {
        let date = created.with_timezone(&Local).format("%b %-d").to_string();
        let controls_width = CARD_CONTROLS.iter().map(|(label, _)| label.width()).sum::<usize>() as u16;
        if footer.width > controls_width + date.width() as u16 {
            frame.render_widget(
                Paragraph::new(Span::styled(date, chrome)).alignment(Alignment::Right),
                footer,
            );
        }
    }

    regions
}

/// Render the colour picker for the card it was opened on
pub fn render_color_popup(frame: &mut Frame, app: &mut App) {
    let Some(id) = app.color_popup.clone() else {
        return;
    };
    let Some((x, y)) = app.card_position(&id) else {
        return;
    };
    let card = card_rect(app.canvas_area, x, y);
    let screen = frame.size();

    let popup_width = 14;
    let popup_height = NoteColor::ALL.len() as u16 + 2;
    let popup_x = card.x.saturating_add(1).min(screen.width.saturating_sub(popup_width));
    let popup_y = card
        .bottom()
        .saturating_sub(popup_height + 1)
        .max(app.canvas_area.y)
        .min(screen.height.saturating_sub(popup_height));
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height).intersection(screen);

    let block = Block::default()
        .title(" Color ")
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::Black).fg(Color::White));
    let inner = block.inner(popup_area);

    let mut lines = Vec::with_capacity(NoteColor::ALL.len());
    let mut regions = Vec::with_capacity(NoteColor::ALL.len());
    for (index, color) in NoteColor::ALL.iter().copied().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", index + 1), Style::default().fg(Color::DarkGray)),
            Span::styled("■ ", Style::default().fg(rgb(color.background()))),
            Span::raw(color.name()),
        ]));
        let row = inner.y + index as u16;
        if row < inner.bottom() {
            regions.push((
                Rect::new(inner.x, row, inner.width, 1),
                HitTarget::Swatch { id: id.clone(), color },
            ));
        }
    }

    frame.render_widget(Clear, popup_area);
    frame.render_widget(Paragraph::new(lines).block(block), popup_area);
    app.hit_regions.extend(regions);
}

/// Render the summary modal over everything else
pub fn render_summary_modal(frame: &mut Frame, app: &mut App, size: Rect) {
    let Some(summary) = &app.summary else {
        return;
    };

    let popup_width = 64.min(size.width);
    let popup_height = 14.min(size.height);
    let x = (size.width.saturating_sub(popup_width)) / 2;
    let y = (size.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(x, y, popup_width, popup_height);

    let block = Block::default()
        .title(" ✨ Note Summary ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .style(Style::default().bg(Color::Black).fg(Color::White));
    let inner = block.inner(popup_area);

    let content = if summary.content == GENERATING_SUMMARY {
        Paragraph::new(Span::styled(
            GENERATING_SUMMARY,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else {
        Paragraph::new(summary.content.clone())
    };

    frame.render_widget(Clear, popup_area);
    frame.render_widget(block, popup_area);
    if inner.height < 2 {
        return;
    }

    let body = Rect::new(inner.x, inner.y, inner.width, inner.height - 2);
    frame.render_widget(content.wrap(Wrap { trim: true }), body);

    let label = " Close ";
    let width = (label.width() as u16).min(inner.width);
    let button = Rect::new(inner.right() - width, inner.bottom() - 1, width, 1);
    frame.render_widget(
        Paragraph::new(Span::styled(label, Style::default().fg(Color::Black).bg(Color::Magenta))),
        button,
    );
    app.hit_regions.push((button, HitTarget::ModalClose));
}

/// Render the key binding reference
pub fn render_help_screen(frame: &mut Frame, app: &App, size: Rect) {
    let keymap = &app.config.keymap;
    let section = |title: &'static str| {
        Line::from(Span::styled(
            title,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))
    };
    let binding = |keys: &str, what: &str| Line::from(format!("{:<14}{}", keys, what));

    let help_text = vec![
        Line::from(""),
        section("Form"),
        binding("Enter", "Add note / save changes"),
        binding("Alt+Enter", "New line"),
        binding("Tab", "Next field"),
        binding("←/→/Space", "Change color, font or size"),
        binding(&keymap.generate, "Generate note from topic"),
        binding("Esc", "Cancel edit, go to canvas"),
        Line::from(""),
        section("Canvas"),
        binding(&keymap.focus_next, "Focus next note"),
        binding("Shift+Tab", "Focus previous note"),
        binding("Arrows", "Move focused note"),
        binding(&keymap.edit, "Edit focused note"),
        binding(&keymap.delete, "Delete focused note"),
        binding(&keymap.toggle_strike, "Strike through"),
        binding(&keymap.cycle_color, "Change color"),
        binding(&keymap.summarize, "Summarize"),
        binding(&keymap.expand, "Expand"),
        binding("Mouse", "Drag the ⠿ edge to move, double-click to edit"),
        Line::from(""),
        section("Anywhere"),
        binding(&keymap.undo, "Undo last change"),
        binding(&keymap.focus_form, "Go to form"),
        binding(&keymap.dismiss, "Dismiss alerts"),
        binding(&keymap.help, "Show this help"),
        binding(&keymap.quit, "Quit"),
        Line::from(""),
        Line::from(Span::styled(
            format!("Press '{}' or 'Esc' to close", keymap.help),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let popup_width = 64.min(size.width);
    let popup_height = (help_text.len() as u16 + 2).min(size.height);
    let x = (size.width.saturating_sub(popup_width)) / 2;
    let y = (size.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(x, y, popup_width, popup_height);

    let block = Block::default()
        .title(" Help - Keyboard Shortcuts ")
        .borders(Borders::ALL)
        .style(Style::default().bg(Color::Black));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(Paragraph::new(help_text).block(block), popup_area);
}

/// Render the status bar at the bottom
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let pane = match app.pane {
        Pane::Form => "Form",
        Pane::Canvas => "Canvas",
    };
    let mut status_text = format!(
        " {} notes | Undo: {}/{} | {} ",
        app.board.canvas().len(),
        app.board.history().len(),
        HISTORY_LIMIT,
        pane
    );
    if app.pending_ai_count() > 0 {
        status_text.push_str(&format!("| ✨ AI working ({}) ", app.pending_ai_count()));
    }

    let status_bar = Paragraph::new(status_text)
        .style(Style::default().bg(Color::DarkGray).fg(Color::White))
        .alignment(Alignment::Center);

    frame.render_widget(status_bar, area);
}

/// Full-screen fallback shown after a rendering or input handler panicked
pub fn render_recovery_screen(frame: &mut Frame) {
    let size = frame.size();
    let text = vec![
        Line::from(Span::styled(
            "Oops! Something went wrong.",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("We're sorry for the inconvenience. Press r to reload or q to quit."),
    ];

    let height = (text.len() as u16).min(size.height);
    let area = Rect::new(size.x, size.y + size.height.saturating_sub(height) / 2, size.width, height);

    frame.render_widget(Clear, size);
    frame.render_widget(Paragraph::new(text).alignment(Alignment::Center), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lay_out_row_places_targets_by_display_width() {
        let area = Rect::new(5, 3, 40, 1);
        let (line, regions) = lay_out_row(
            area,
            vec![
                Segment::new(" ✨ Generate ", Style::default(), Some(HitTarget::Generate)),
                Segment::plain(" "),
                Segment::new(" Add Note ", Style::default(), Some(HitTarget::Submit)),
            ],
        );

        assert_eq!(line.spans.len(), 3);
        let generate_width = " ✨ Generate ".width() as u16;
        assert_eq!(regions[0], (Rect::new(5, 3, generate_width, 1), HitTarget::Generate));
        assert_eq!(regions[1].0.x, 5 + generate_width + 1);
        assert_eq!(regions[1].1, HitTarget::Submit);
    }

    #[test]
    fn test_lay_out_row_clips_to_area() {
        let area = Rect::new(0, 0, 6, 1);
        let (_, regions) = lay_out_row(
            area,
            vec![
                Segment::new("[S]", Style::default(), Some(HitTarget::Undo)),
                Segment::new("[D]", Style::default(), Some(HitTarget::Cancel)),
                Segment::new("[C]", Style::default(), Some(HitTarget::Banner)),
            ],
        );

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[1].0, Rect::new(3, 0, 3, 1));
    }
}
