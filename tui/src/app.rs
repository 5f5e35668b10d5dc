use crate::config::Config;
use anyhow::Result;
use log::{debug, info};
use ratatui::layout::{Position, Rect};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};
use stickies_core::{
    ai::{AiClient, AiError, AiRequest},
    card::{CardEffect, CardEvent, CardState, DragBounds, PointerTarget},
    identity::{Session, SIGN_IN_FAILED},
    models::{FontColor, FontSize, NoteColor, NoteDraft},
    storage::{CollectionPath, SqliteStore},
    Board,
};

/// Canvas units per terminal column
pub const PX_PER_COL: i32 = 8;
/// Canvas units per terminal row
pub const PX_PER_ROW: i32 = 16;

pub const TOPIC_REQUIRED: &str = "Please enter a topic to generate a note.";
pub const GENERATING_SUMMARY: &str = "Generating summary...";
pub const EDITED_NOTE_REMOVED: &str = "The note you were editing was deleted.";

const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);

/// Which half of the screen receives typed keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Form,
    Canvas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Text,
    NoteColor,
    FontColor,
    FontSize,
}

impl FormField {
    pub fn next(self) -> Self {
        match self {
            FormField::Text => FormField::NoteColor,
            FormField::NoteColor => FormField::FontColor,
            FormField::FontColor => FormField::FontSize,
            FormField::FontSize => FormField::Text,
        }
    }
}

/// The creation form: text plus the three palette pickers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteForm {
    pub text: String,
    /// Cursor as a char index into `text`
    pub cursor: usize,
    pub note_color: NoteColor,
    pub font_color: FontColor,
    pub font_size: FontSize,
    pub field: FormField,
    /// Id of the note being edited, if any
    pub editing: Option<String>,
}

impl NoteForm {
    pub fn draft(&self) -> NoteDraft {
        NoteDraft {
            text: self.text.clone(),
            note_color: self.note_color,
            font_color: self.font_color,
            font_size: self.font_size,
        }
    }

    pub fn load(&mut self, id: &str, draft: NoteDraft) {
        self.editing = Some(id.to_string());
        self.note_color = draft.note_color;
        self.font_color = draft.font_color;
        self.font_size = draft.font_size;
        self.field = FormField::Text;
        self.set_text(draft.text);
    }

    /// Back to an empty draft with default palette entries
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn set_text(&mut self, text: String) {
        self.cursor = text.chars().count();
        self.text = text;
    }

    pub fn insert_char(&mut self, ch: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let at = self.byte_index(self.cursor - 1);
        self.text.remove(at);
        self.cursor -= 1;
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    /// Step the picker under `field` forward
    pub fn cycle_field(&mut self, field: FormField) {
        match field {
            FormField::Text => {}
            FormField::NoteColor => self.note_color = self.note_color.next(),
            FormField::FontColor => self.font_color = self.font_color.next(),
            FormField::FontSize => self.font_size = self.font_size.next(),
        }
    }

    /// Cursor as (line, column) for drawing
    pub fn cursor_line_col(&self) -> (usize, usize) {
        let before: String = self.text.chars().take(self.cursor).collect();
        let line = before.matches('\n').count();
        let col = before.rsplit('\n').next().map(|tail| tail.chars().count()).unwrap_or(0);
        (line, col)
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(index, _)| index)
            .unwrap_or(self.text.len())
    }
}

/// Part of a drawn card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardPart {
    Handle,
    Body,
    Strike,
    Delete,
    Color,
    Summarize,
    Expand,
    Edit,
}

impl CardPart {
    pub fn pointer_target(self) -> PointerTarget {
        match self {
            CardPart::Handle => PointerTarget::DragHandle,
            CardPart::Body => PointerTarget::Body,
            _ => PointerTarget::Control,
        }
    }
}

/// Something clickable, registered while rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HitTarget {
    Card { id: String, part: CardPart },
    Swatch { id: String, color: NoteColor },
    FormText,
    Picker(FormField),
    Generate,
    Submit,
    Cancel,
    Undo,
    Banner,
    ModalClose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryModal {
    pub note_id: String,
    pub content: String,
}

struct PendingAi {
    request: AiRequest,
    receiver: Receiver<Result<String, AiError>>,
}

/// Application state
pub struct App {
    pub should_quit: bool,
    pub config: Config,
    pub session: Session,
    pub board: Board<SqliteStore>,
    pub form: NoteForm,
    pub pane: Pane,
    /// Interaction state of cards that are not idle
    pub card_states: HashMap<String, CardState>,
    /// Card whose colour popup is open
    pub color_popup: Option<String>,
    pub summary: Option<SummaryModal>,
    pub help_open: bool,
    /// Clickable regions from the last frame, bottom-most first
    pub hit_regions: Vec<(Rect, HitTarget)>,
    /// Inner area of the canvas in the last frame
    pub canvas_area: Rect,
    ai: AiClient,
    pending_ai: Vec<PendingAi>,
    last_click: Option<(Instant, u16, u16)>,
}

impl App {
    /// Open the store, sign in and subscribe to this user's notes.
    pub fn new(config: Config) -> Result<Self> {
        let store = SqliteStore::open(&config.store.database_path)?;
        let session = Session::establish(&store);
        let collection = CollectionPath::notes(&config.store.app_id, &session.user_id);
        let mut board = Board::open(store, collection, session.user_id.clone());
        if session.degraded {
            board.raise_storage_alert(SIGN_IN_FAILED);
        }
        let ai = AiClient::new(config.ai.clone())?;

        info!(
            "event=app_ready user={} notes={} ai_configured={}",
            session.short_id(),
            board.canvas().len(),
            ai.is_configured()
        );

        Ok(Self {
            should_quit: false,
            config,
            session,
            board,
            form: NoteForm::default(),
            pane: Pane::Form,
            card_states: HashMap::new(),
            color_popup: None,
            summary: None,
            help_open: false,
            hit_regions: Vec::new(),
            canvas_area: Rect::default(),
            ai,
            pending_ai: Vec::new(),
            last_click: None,
        })
    }

    /// Handle tick events: apply new snapshots and finished AI requests
    pub fn tick(&mut self) {
        self.board.sync();
        self.poll_ai();
        self.card_states.retain(|id, _| self.board.note(id).is_some());
        if let Some(id) = &self.color_popup {
            if self.board.note(id).is_none() {
                self.color_popup = None;
            }
        }
        if let Some(id) = self.form.editing.clone() {
            if self.board.note(&id).is_none() {
                info!("event=edit_abandoned note={}", id);
                self.cancel_edit();
                self.board.raise_storage_alert(EDITED_NOTE_REMOVED);
            }
        }
    }

    /// Quit the application
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    // ===========
    // Form
    // ===========

    /// Add a note, or save the one being edited
    pub fn submit_form(&mut self) {
        let draft = self.form.draft();
        if draft.is_blank() {
            return;
        }

        let saved = match self.form.editing.clone() {
            Some(id) => self.board.update_note(&id, &draft).is_ok(),
            None => self.board.add_note(&draft).is_ok(),
        };
        if saved {
            self.finish_editing();
            self.form.reset();
        }
    }

    pub fn cancel_edit(&mut self) {
        self.finish_editing();
        self.form.reset();
    }

    /// Load note `id` into the form for editing
    pub fn start_edit(&mut self, id: &str) {
        let Some(placed) = self.board.note(id) else {
            return;
        };
        let draft = NoteDraft::from_note(&placed.note);

        if self.form.editing.as_deref() != Some(id) {
            self.finish_editing();
        }
        let state = self.card_state(id);
        let (state, _) = state.on(
            CardEvent::DoubleClick {
                target: PointerTarget::Body,
            },
            (0, 0),
            self.drag_bounds(),
        );
        self.set_card_state(id, state);

        self.board.focus(Some(id));
        self.form.load(id, draft);
        self.pane = Pane::Form;
        debug!("event=edit_started note={}", id);
    }

    fn finish_editing(&mut self) {
        if let Some(id) = self.form.editing.take() {
            let (state, _) = self.card_state(&id).on(CardEvent::EditFinished, (0, 0), self.drag_bounds());
            self.set_card_state(&id, state);
        }
    }

    // ===========
    // Canvas
    // ===========

    pub fn undo(&mut self) {
        let _ = self.board.undo();
    }

    pub fn dismiss_alerts(&mut self) {
        self.board.dismiss_alerts();
    }

    /// Move focus to the next note in creation order, wrapping around
    pub fn focus_next(&mut self) {
        self.focus_step(1);
    }

    pub fn focus_prev(&mut self) {
        self.focus_step(-1);
    }

    fn focus_step(&mut self, step: isize) {
        let notes = self.board.canvas().notes();
        if notes.is_empty() {
            return;
        }
        let len = notes.len() as isize;
        let current = self
            .board
            .focused_id()
            .and_then(|id| notes.iter().position(|placed| placed.id() == id))
            .map(|index| index as isize)
            .unwrap_or(-1);
        let next = (current + step).rem_euclid(len) as usize;
        let id = notes[next].id().to_string();
        self.board.focus(Some(&id));
    }

    /// Shift the focused note by whole cells and save the new position
    pub fn nudge_focused(&mut self, cols: i32, rows: i32) {
        let Some(id) = self.focused_id() else {
            return;
        };
        let Some((x, y)) = self.board.note(&id).map(|placed| placed.position()) else {
            return;
        };
        let (x, y) = self
            .drag_bounds()
            .clamp(x + cols * PX_PER_COL, y + rows * PX_PER_ROW);
        let _ = self.board.commit_position(&id, x, y);
    }

    pub fn delete_note(&mut self, id: &str) {
        if self.form.editing.as_deref() == Some(id) {
            self.cancel_edit();
        }
        let _ = self.board.delete_note(id);
    }

    pub fn toggle_strike(&mut self, id: &str) {
        let _ = self.board.toggle_strike_through(id);
    }

    pub fn set_note_color(&mut self, id: &str, color: NoteColor) {
        let _ = self.board.change_note_color(id, color);
        self.color_popup = None;
    }

    pub fn cycle_color(&mut self, id: &str) {
        if let Some(color) = self.board.note(id).map(|placed| placed.note.note_color.next()) {
            self.set_note_color(id, color);
        }
    }

    pub fn focused_id(&self) -> Option<String> {
        self.board.focused_id().map(str::to_string)
    }

    pub fn card_state(&self, id: &str) -> CardState {
        self.card_states.get(id).copied().unwrap_or_default()
    }

    fn set_card_state(&mut self, id: &str, state: CardState) {
        if state == CardState::Idle {
            self.card_states.remove(id);
        } else {
            self.card_states.insert(id.to_string(), state);
        }
    }

    /// Where card `id` is drawn, following a drag in progress
    pub fn card_position(&self, id: &str) -> Option<(i32, i32)> {
        let stored = self.board.note(id)?.position();
        Some(self.card_state(id).display_position(stored))
    }

    pub fn drag_bounds(&self) -> DragBounds {
        DragBounds::for_canvas(
            i32::from(self.canvas_area.width) * PX_PER_COL,
            i32::from(self.canvas_area.height) * PX_PER_ROW,
        )
    }

    /// Terminal cell to canvas units
    pub fn to_canvas(&self, column: u16, row: u16) -> (i32, i32) {
        (
            (i32::from(column) - i32::from(self.canvas_area.x)) * PX_PER_COL,
            (i32::from(row) - i32::from(self.canvas_area.y)) * PX_PER_ROW,
        )
    }

    // ===========
    // Pointer
    // ===========

    /// Top-most clickable thing under the cell
    pub fn hit_test(&self, column: u16, row: u16) -> Option<HitTarget> {
        self.hit_regions
            .iter()
            .rev()
            .find(|(rect, _)| rect.contains(Position::new(column, row)))
            .map(|(_, target)| target.clone())
    }

    pub fn pointer_down(&mut self, column: u16, row: u16) {
        let now = Instant::now();
        let double = self
            .last_click
            .is_some_and(|(at, col, r)| col == column && r == row && now.duration_since(at) <= DOUBLE_CLICK_WINDOW);
        self.last_click = if double { None } else { Some((now, column, row)) };

        let target = self.hit_test(column, row);

        // Overlays swallow clicks meant for what is underneath.
        if self.help_open {
            self.close_help();
            return;
        }
        if self.summary.is_some() {
            if target == Some(HitTarget::ModalClose) {
                self.close_summary();
            }
            return;
        }

        if !matches!(
            target,
            Some(HitTarget::Swatch { .. })
                | Some(HitTarget::Card {
                    part: CardPart::Color,
                    ..
                })
        ) {
            self.color_popup = None;
        }

        match target {
            Some(HitTarget::Card { id, part }) => self.card_pointer_down(&id, part, column, row, double),
            Some(HitTarget::Swatch { id, color }) => self.set_note_color(&id, color),
            Some(HitTarget::FormText) => {
                self.pane = Pane::Form;
                self.form.field = FormField::Text;
            }
            Some(HitTarget::Picker(field)) => {
                self.pane = Pane::Form;
                self.form.field = field;
                self.form.cycle_field(field);
            }
            Some(HitTarget::Generate) => self.request_generate(),
            Some(HitTarget::Submit) => self.submit_form(),
            Some(HitTarget::Cancel) => self.cancel_edit(),
            Some(HitTarget::Undo) => self.undo(),
            Some(HitTarget::Banner) => self.dismiss_alerts(),
            Some(HitTarget::ModalClose) => self.close_summary(),
            None => {
                if self.canvas_area.contains(Position::new(column, row)) {
                    self.pane = Pane::Canvas;
                }
            }
        }
    }

    fn card_pointer_down(&mut self, id: &str, part: CardPart, column: u16, row: u16, double: bool) {
        self.pane = Pane::Canvas;
        match part {
            CardPart::Strike => return self.toggle_strike(id),
            CardPart::Delete => return self.delete_note(id),
            CardPart::Color => {
                self.color_popup = match self.color_popup.as_deref() {
                    Some(open) if open == id => None,
                    _ => Some(id.to_string()),
                };
                return;
            }
            CardPart::Summarize => return self.open_summary(id),
            CardPart::Expand => return self.request_expand(id),
            CardPart::Edit => return self.start_edit(id),
            CardPart::Handle | CardPart::Body => {}
        }

        let target = part.pointer_target();
        let (x, y) = self.to_canvas(column, row);
        let event = if double {
            CardEvent::DoubleClick { target }
        } else if target == PointerTarget::DragHandle {
            CardEvent::PointerDown { target, x, y }
        } else {
            CardEvent::Click {
                focused: self.board.focused_id() == Some(id),
            }
        };
        self.card_event(id, event);
    }

    pub fn pointer_drag(&mut self, column: u16, row: u16) {
        let (x, y) = self.to_canvas(column, row);
        for id in self.dragging_ids() {
            self.card_event(&id, CardEvent::PointerMove { x, y });
        }
    }

    pub fn pointer_up(&mut self) {
        for id in self.dragging_ids() {
            self.card_event(&id, CardEvent::PointerUp);
        }
    }

    fn dragging_ids(&self) -> Vec<String> {
        self.card_states
            .iter()
            .filter(|(_, state)| state.is_dragging())
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn card_event(&mut self, id: &str, event: CardEvent) {
        let Some(position) = self.board.note(id).map(|placed| placed.position()) else {
            return;
        };
        let (state, effect) = self.card_state(id).on(event, position, self.drag_bounds());
        self.set_card_state(id, state);

        match effect {
            Some(CardEffect::Focus) => self.board.focus(Some(id)),
            Some(CardEffect::CommitPosition { x, y }) => {
                let _ = self.board.commit_position(id, x, y);
            }
            Some(CardEffect::Edit) => {
                // The reducer already moved the card to Editing.
                self.set_card_state(id, CardState::Idle);
                self.start_edit(id);
            }
            None => {}
        }
    }

    // ===========
    // AI
    // ===========

    /// Replace the form text with content generated from it as a topic
    pub fn request_generate(&mut self) {
        if self.form.editing.is_some() || self.is_generating() {
            return;
        }
        let topic = self.form.text.trim().to_string();
        if topic.is_empty() {
            self.board.raise_ai_alert(TOPIC_REQUIRED);
            return;
        }
        self.spawn_ai(AiRequest::Generate { topic });
    }

    pub fn open_summary(&mut self, id: &str) {
        let Some(text) = self.board.note(id).map(|placed| placed.note.text.clone()) else {
            return;
        };
        if self.is_busy_with(id) {
            return;
        }
        self.summary = Some(SummaryModal {
            note_id: id.to_string(),
            content: GENERATING_SUMMARY.to_string(),
        });
        self.spawn_ai(AiRequest::Summarize {
            note_id: id.to_string(),
            text,
        });
    }

    pub fn close_summary(&mut self) {
        self.summary = None;
        self.board.clear_ai_alert();
    }

    pub fn request_expand(&mut self, id: &str) {
        let Some(text) = self.board.note(id).map(|placed| placed.note.text.clone()) else {
            return;
        };
        if self.is_busy_with(id) {
            return;
        }
        self.spawn_ai(AiRequest::Expand {
            note_id: id.to_string(),
            text,
        });
    }

    pub fn is_generating(&self) -> bool {
        self.pending_ai
            .iter()
            .any(|pending| matches!(pending.request, AiRequest::Generate { .. }))
    }

    /// A summary or expansion for note `id` is in flight
    pub fn is_busy_with(&self, id: &str) -> bool {
        self.pending_ai.iter().any(|pending| pending.request.note_id() == Some(id))
    }

    pub fn pending_ai_count(&self) -> usize {
        self.pending_ai.len()
    }

    fn spawn_ai(&mut self, request: AiRequest) {
        self.board.clear_ai_alert();
        let (sender, receiver) = mpsc::channel();
        let client = self.ai.clone();
        let prompt = request.prompt();
        std::thread::spawn(move || {
            let _ = sender.send(client.generate(&prompt));
        });
        let kind = match &request {
            AiRequest::Generate { .. } => "generate",
            AiRequest::Summarize { .. } => "summarize",
            AiRequest::Expand { .. } => "expand",
        };
        debug!("event=ai_request kind={}", kind);
        self.pending_ai.push(PendingAi { request, receiver });
    }

    fn poll_ai(&mut self) {
        let mut finished = Vec::new();
        self.pending_ai.retain(|pending| match pending.receiver.try_recv() {
            Ok(result) => {
                finished.push((pending.request.clone(), result));
                false
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Disconnected) => {
                finished.push((
                    pending.request.clone(),
                    Err(AiError::Upstream("AI request ended unexpectedly.".to_string())),
                ));
                false
            }
        });

        for (request, result) in finished {
            self.apply_ai_result(request, result);
        }
    }

    fn apply_ai_result(&mut self, request: AiRequest, result: Result<String, AiError>) {
        match (request, result) {
            (AiRequest::Generate { .. }, Ok(text)) => {
                if self.form.editing.is_none() {
                    self.form.set_text(text);
                }
            }
            (AiRequest::Summarize { note_id, .. }, outcome) => {
                let content = match &outcome {
                    Ok(summary) => summary.clone(),
                    Err(err) => format!("Could not generate summary: {}", err),
                };
                if let Err(err) = &outcome {
                    self.board.report_ai_error(err);
                }
                if let Some(modal) = self.summary.as_mut().filter(|modal| modal.note_id == note_id) {
                    modal.content = content;
                }
            }
            (AiRequest::Expand { note_id, .. }, Ok(text)) => {
                if self.board.note(&note_id).is_some() {
                    self.start_edit(&note_id);
                    self.form.set_text(text);
                    self.form.field = FormField::NoteColor;
                }
            }
            (_, Err(err)) => self.board.report_ai_error(&err),
        }
    }

    // ===========
    // Overlays
    // ===========

    pub fn open_help(&mut self) {
        self.help_open = true;
    }

    pub fn close_help(&mut self) {
        self.help_open = false;
    }
}
