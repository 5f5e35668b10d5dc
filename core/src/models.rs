mod note;
mod palette;

pub use note::{Note, NoteDraft, NotePatch, NOTE_SCHEMA_VERSION};
pub use palette::{FontColor, FontSize, NoteColor, PaletteEntry, Rgb};
