// Example: Basic usage of the stickies-core library
use std::fs;

use stickies_core::identity::Session;
use stickies_core::models::*;
use stickies_core::storage::*;
use stickies_core::Board;

fn main() -> anyhow::Result<()> {
    let db_path = "basic_usage_stickies.db";
    fs::remove_file(db_path).ok(); // Clean up previous run

    println!("--- Basic Usage of stickies-core ---");

    // ========== Open Store ==========
    println!("\n1. Opening store...");
    let conn = Database::file(db_path).open()?;
    println!("   ✓ Database created with schema version {}", Database::get_schema_version(&conn)?);
    let store = SqliteStore::from_connection(conn);

    let session = Session::establish(&store);
    println!("   ✓ Signed in as {}", session.short_id());

    let collection = CollectionPath::notes("default-sticky-notes-app-local", &session.user_id);
    let mut board = Board::open(store, collection, session.user_id.clone());

    // ========== Create Notes ==========
    println!("\n2. Creating notes...");
    let milk = board
        .add_note(&NoteDraft::new("Buy milk"))?
        .ok_or_else(|| anyhow::anyhow!("draft was blank"))?;
    let mom = board
        .add_note(&NoteDraft {
            text: "Call mom".to_string(),
            note_color: NoteColor::Pink,
            font_size: FontSize::Large,
            ..NoteDraft::default()
        })?
        .ok_or_else(|| anyhow::anyhow!("draft was blank"))?;
    print_canvas(&board);

    // ========== Edit ==========
    println!("\n3. Moving and editing...");
    board.commit_position(&milk, 300, 120)?;
    board.toggle_strike_through(&milk)?;
    board.change_note_color(&mom, NoteColor::Blue)?;
    board.focus(Some(&milk));
    print_canvas(&board);

    // ========== Undo ==========
    println!("\n4. Undoing {} actions...", board.history().len());
    while board.can_undo() {
        let kind = board.history().peek().map(|entry| entry.kind());
        board.undo()?;
        println!("   ✓ Undid {:?}", kind);
    }
    print_canvas(&board);

    fs::remove_file(db_path).ok();
    println!("\n--- Done ---");
    Ok(())
}

fn print_canvas<S: DocumentStore>(board: &Board<S>) {
    for placed in board.canvas().render_order() {
        let (x, y) = placed.position();
        let marker = if board.focused_id() == Some(placed.id()) { "*" } else { " " };
        println!(
            "   {} [{:>3},{:>3}] z={:<4} {:<8} {}{}",
            marker,
            x,
            y,
            placed.z_index,
            placed.note.note_color,
            placed.note.text,
            if placed.note.is_struck_through { " (done)" } else { "" }
        );
    }
}
