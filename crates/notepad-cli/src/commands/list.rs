use notepad_core::store::sort_recent_first;
use notepad_core::{Note, NoteStore};

use crate::commands::common::{format_note_lines, note_to_list_item, AppContext, NoteListItem};
use crate::error::CliError;

pub async fn run_list(ctx: &AppContext, limit: usize, as_json: bool) -> Result<(), CliError> {
    let notes = recent_notes(&ctx.store, limit).await?;

    if as_json {
        let json_items = notes
            .iter()
            .map(note_to_list_item)
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else {
        for line in format_note_lines(&notes) {
            println!("{line}");
        }
    }

    Ok(())
}

/// Newest `limit` notes; the store returns them in no particular order.
pub async fn recent_notes<S: NoteStore>(store: &S, limit: usize) -> Result<Vec<Note>, CliError> {
    let mut notes = store.list().await?;
    sort_recent_first(&mut notes);
    notes.truncate(limit);
    Ok(notes)
}
