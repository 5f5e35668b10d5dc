use crate::app::{App, FormField, Pane};
use crate::config::Keymap;
use anyhow::Result;
use crossterm::event::{
    self, Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use std::time::Duration;
use stickies_core::models::NoteColor;

/// Terminal events
#[derive(Debug, Clone, Copy)]
pub enum Event {
    /// Key press event
    Key(KeyEvent),
    /// Terminal tick event
    Tick,
    /// Mouse event
    Mouse(MouseEvent),
}

/// Event handler for the terminal
pub struct EventHandler {
    /// Tick rate in milliseconds
    tick_rate: Duration,
}

impl EventHandler {
    /// Create a new event handler
    pub fn new(tick_rate_ms: u64) -> Self {
        Self {
            tick_rate: Duration::from_millis(tick_rate_ms),
        }
    }

    /// Poll for the next event
    pub fn next(&self) -> Result<Event> {
        if event::poll(self.tick_rate)? {
            match event::read()? {
                CEvent::Key(key) => return Ok(Event::Key(key)),
                CEvent::Mouse(m) => return Ok(Event::Mouse(m)),
                _ => {}
            }
        }
        Ok(Event::Tick)
    }
}

/// Handle key events for the application
pub fn handle_key_event(key: KeyEvent, app: &mut App) {
    // On Windows, crossterm reports both key press and release events.
    // We only want to handle press events to avoid duplicates.
    if key.kind != KeyEventKind::Press {
        return;
    }

    let keymap = app.config.keymap.clone();
    if Keymap::matches(&keymap.quit, &key) {
        app.quit();
        return;
    }

    // Help screen takes precedence
    if app.help_open {
        if key.code == KeyCode::Esc || Keymap::matches(&keymap.help, &key) {
            app.close_help();
        }
        return;
    }

    if app.summary.is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
            app.close_summary();
        }
        return;
    }

    if let Some(id) = app.color_popup.clone() {
        handle_color_popup_input(key, app, &id);
        return;
    }

    // --- Bindings that work from either pane ---
    if Keymap::matches(&keymap.undo, &key) {
        app.undo();
    } else if Keymap::matches(&keymap.dismiss, &key) {
        app.dismiss_alerts();
    } else if Keymap::matches(&keymap.help, &key) {
        app.open_help();
    } else if Keymap::matches(&keymap.generate, &key) {
        app.request_generate();
    } else if Keymap::matches(&keymap.focus_form, &key) {
        app.pane = Pane::Form;
        app.form.field = FormField::Text;
    } else {
        match app.pane {
            Pane::Form => handle_form_input(key, app),
            Pane::Canvas => handle_canvas_input(key, app, &keymap),
        }
    }
}

/// Handle key events while the creation form has focus
fn handle_form_input(key: KeyEvent, app: &mut App) {
    let field = app.form.field;
    match key.code {
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            if field == FormField::Text {
                app.form.insert_char('\n');
            }
        }
        KeyCode::Enter => app.submit_form(),
        KeyCode::Esc => {
            if app.form.editing.is_some() {
                app.cancel_edit();
            }
            app.pane = Pane::Canvas;
        }
        KeyCode::Tab => app.form.field = field.next(),
        KeyCode::Backspace if field == FormField::Text => app.form.backspace(),
        KeyCode::Left if field == FormField::Text => app.form.move_left(),
        KeyCode::Right if field == FormField::Text => app.form.move_right(),
        KeyCode::Home if field == FormField::Text => app.form.move_home(),
        KeyCode::End if field == FormField::Text => app.form.move_end(),
        KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if field != FormField::Text => {
            app.form.cycle_field(field);
        }
        KeyCode::Char(c) if field == FormField::Text => {
            // Allow AltGr combinations (CONTROL+ALT) for special characters
            if !key.modifiers.contains(KeyModifiers::CONTROL) || key.modifiers.contains(KeyModifiers::ALT) {
                app.form.insert_char(c);
            }
        }
        _ => {}
    }
}

/// Handle key events while the canvas has focus; actions apply to the focused note
fn handle_canvas_input(key: KeyEvent, app: &mut App, keymap: &Keymap) {
    if Keymap::matches(&keymap.focus_next, &key) {
        app.focus_next();
        return;
    }

    match key.code {
        KeyCode::BackTab => app.focus_prev(),
        KeyCode::Up => app.nudge_focused(0, -1),
        KeyCode::Down => app.nudge_focused(0, 1),
        KeyCode::Left => app.nudge_focused(-1, 0),
        KeyCode::Right => app.nudge_focused(1, 0),
        KeyCode::Esc => app.pane = Pane::Form,
        _ => {
            let Some(id) = app.focused_id() else {
                return;
            };
            if Keymap::matches(&keymap.delete, &key) || key.code == KeyCode::Delete {
                app.delete_note(&id);
            } else if Keymap::matches(&keymap.toggle_strike, &key) {
                app.toggle_strike(&id);
            } else if Keymap::matches(&keymap.cycle_color, &key) {
                app.cycle_color(&id);
            } else if Keymap::matches(&keymap.summarize, &key) {
                app.open_summary(&id);
            } else if Keymap::matches(&keymap.expand, &key) {
                app.request_expand(&id);
            } else if Keymap::matches(&keymap.edit, &key) || key.code == KeyCode::Enter {
                app.start_edit(&id);
            }
        }
    }
}

/// Number keys pick a swatch from the open colour popup
fn handle_color_popup_input(key: KeyEvent, app: &mut App, id: &str) {
    match key.code {
        KeyCode::Esc => app.color_popup = None,
        KeyCode::Char(c) => {
            let picked = c
                .to_digit(10)
                .and_then(|digit| (digit as usize).checked_sub(1))
                .and_then(|index| NoteColor::ALL.get(index).copied());
            if let Some(color) = picked {
                app.set_note_color(id, color);
            }
        }
        _ => {}
    }
}

/// Handle mouse events: clicks are hit-tested against the regions drawn last frame
pub fn handle_mouse_event(mouse: MouseEvent, app: &mut App) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.pointer_down(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.pointer_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.pointer_up(),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_handler_creation() {
        let handler = EventHandler::new(250);
        assert_eq!(handler.tick_rate, Duration::from_millis(250));
    }
}
