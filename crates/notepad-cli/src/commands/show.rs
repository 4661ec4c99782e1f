use notepad_core::NoteStore;

use crate::commands::common::{note_to_list_item, parse_note_id, AppContext};
use crate::error::CliError;

pub async fn run_show(ctx: &AppContext, id: &str, as_json: bool) -> Result<(), CliError> {
    let note_id = parse_note_id(id)?;
    let note = ctx.store.get(note_id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&note_to_list_item(&note))?);
        return Ok(());
    }

    if let Some(title) = note.title.as_deref().filter(|title| !title.trim().is_empty()) {
        println!("# {title}");
        println!();
    }
    println!("{}", note.content);

    if ctx.drafts()?.load(note_id).is_some() {
        eprintln!("Note {note_id} has an unsaved local draft; run `notepad edit {note_id}` to restore it.");
    }
    Ok(())
}
