use notepad_core::{NewNote, NoteStore};

use crate::commands::common::{resolve_note_content, AppContext};
use crate::error::CliError;

pub async fn run_add(
    ctx: &AppContext,
    title: Option<String>,
    content_parts: &[String],
) -> Result<(), CliError> {
    let content = resolve_note_content(content_parts)?;
    let title = title.filter(|title| !title.trim().is_empty());

    let note = ctx.store.create(&NewNote { title, content }).await?;
    println!("{}", note.id);
    Ok(())
}
