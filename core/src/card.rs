//! Pointer interaction state for a single note card.
//!
//! Dragging and editing are mutually exclusive. Transitions are pure: the
//! caller feeds events in and carries out the returned effect.

/// Size of a note card in canvas units.
pub const CARD_WIDTH: i32 = 240;
pub const CARD_HEIGHT: i32 = 240;

/// Part of the card a pointer event landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    DragHandle,
    Body,
    /// A button or popup; never starts a drag
    Control,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardEvent {
    /// Pointer pressed at canvas position (`x`, `y`)
    PointerDown { target: PointerTarget, x: i32, y: i32 },
    PointerMove { x: i32, y: i32 },
    PointerUp,
    Click { focused: bool },
    DoubleClick { target: PointerTarget },
    EditFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardState {
    #[default]
    Idle,
    Dragging {
        /// Pointer offset from the card's top-left corner
        grab: (i32, i32),
        /// Live card position
        at: (i32, i32),
    },
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardEffect {
    Focus,
    /// Drag ended with the card at (`x`, `y`)
    CommitPosition { x: i32, y: i32 },
    /// Load the note into the creation form
    Edit,
}

/// Largest top-left position that keeps a card inside the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragBounds {
    pub max_x: i32,
    pub max_y: i32,
}

impl DragBounds {
    pub fn for_canvas(width: i32, height: i32) -> Self {
        Self {
            max_x: (width - CARD_WIDTH).max(0),
            max_y: (height - CARD_HEIGHT).max(0),
        }
    }

    pub fn clamp(&self, x: i32, y: i32) -> (i32, i32) {
        (x.clamp(0, self.max_x), y.clamp(0, self.max_y))
    }
}

impl CardState {
    pub fn is_dragging(&self) -> bool {
        matches!(self, CardState::Dragging { .. })
    }

    /// Apply `event` to a card currently at `position`.
    pub fn on(self, event: CardEvent, position: (i32, i32), bounds: DragBounds) -> (CardState, Option<CardEffect>) {
        match (self, event) {
            (CardState::Idle, CardEvent::PointerDown { target: PointerTarget::DragHandle, x, y }) => (
                CardState::Dragging {
                    grab: (x - position.0, y - position.1),
                    at: position,
                },
                Some(CardEffect::Focus),
            ),
            (CardState::Dragging { grab, .. }, CardEvent::PointerMove { x, y }) => (
                CardState::Dragging {
                    grab,
                    at: bounds.clamp(x - grab.0, y - grab.1),
                },
                None,
            ),
            (CardState::Dragging { at, .. }, CardEvent::PointerUp) => {
                (CardState::Idle, Some(CardEffect::CommitPosition { x: at.0, y: at.1 }))
            }
            (CardState::Idle, CardEvent::DoubleClick { target: PointerTarget::Body }) => {
                (CardState::Editing, Some(CardEffect::Edit))
            }
            (CardState::Editing, CardEvent::EditFinished) => (CardState::Idle, None),
            (state, CardEvent::Click { focused: false }) if !state.is_dragging() => (state, Some(CardEffect::Focus)),
            (state, _) => (state, None),
        }
    }

    /// Where the card should be drawn: the live drag position while dragging.
    pub fn display_position(&self, stored: (i32, i32)) -> (i32, i32) {
        match self {
            CardState::Dragging { at, .. } => *at,
            _ => stored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: DragBounds = DragBounds { max_x: 1000, max_y: 600 };

    #[test]
    fn test_drag_lifecycle() {
        let (state, effect) = CardState::Idle.on(
            CardEvent::PointerDown {
                target: PointerTarget::DragHandle,
                x: 15,
                y: 12,
            },
            (10, 10),
            BOUNDS,
        );
        assert_eq!(effect, Some(CardEffect::Focus));
        assert!(state.is_dragging());

        let (state, effect) = state.on(CardEvent::PointerMove { x: 105, y: 52 }, (10, 10), BOUNDS);
        assert_eq!(effect, None);
        assert_eq!(state.display_position((10, 10)), (100, 50));

        let (state, effect) = state.on(CardEvent::PointerUp, (10, 10), BOUNDS);
        assert_eq!(state, CardState::Idle);
        assert_eq!(effect, Some(CardEffect::CommitPosition { x: 100, y: 50 }));
    }

    #[test]
    fn test_controls_never_start_a_drag() {
        let (state, effect) = CardState::Idle.on(
            CardEvent::PointerDown {
                target: PointerTarget::Control,
                x: 0,
                y: 0,
            },
            (0, 0),
            BOUNDS,
        );
        assert_eq!(state, CardState::Idle);
        assert_eq!(effect, None);
    }

    #[test]
    fn test_drag_is_clamped_to_canvas() {
        let dragging = CardState::Dragging { grab: (0, 0), at: (0, 0) };
        let (state, _) = dragging.on(CardEvent::PointerMove { x: -40, y: 5000 }, (0, 0), BOUNDS);
        assert_eq!(state.display_position((0, 0)), (0, 600));
    }

    #[test]
    fn test_double_click_enters_editing_and_blocks_drag() {
        let (state, effect) = CardState::Idle.on(
            CardEvent::DoubleClick {
                target: PointerTarget::Body,
            },
            (0, 0),
            BOUNDS,
        );
        assert_eq!(state, CardState::Editing);
        assert_eq!(effect, Some(CardEffect::Edit));

        let (state, effect) = state.on(
            CardEvent::PointerDown {
                target: PointerTarget::DragHandle,
                x: 1,
                y: 1,
            },
            (0, 0),
            BOUNDS,
        );
        assert_eq!(state, CardState::Editing);
        assert_eq!(effect, None);

        let (state, _) = state.on(CardEvent::EditFinished, (0, 0), BOUNDS);
        assert_eq!(state, CardState::Idle);
    }

    #[test]
    fn test_double_click_on_handle_does_not_edit() {
        let (state, effect) = CardState::Idle.on(
            CardEvent::DoubleClick {
                target: PointerTarget::DragHandle,
            },
            (0, 0),
            BOUNDS,
        );
        assert_eq!(state, CardState::Idle);
        assert_eq!(effect, None);
    }

    #[test]
    fn test_click_focuses_only_unfocused_cards() {
        let (_, effect) = CardState::Idle.on(CardEvent::Click { focused: false }, (0, 0), BOUNDS);
        assert_eq!(effect, Some(CardEffect::Focus));
        let (_, effect) = CardState::Idle.on(CardEvent::Click { focused: true }, (0, 0), BOUNDS);
        assert_eq!(effect, None);
    }

    #[test]
    fn test_bounds_for_small_canvas() {
        let bounds = DragBounds::for_canvas(100, 100);
        assert_eq!(bounds.clamp(50, 50), (0, 0));
    }
}
