use notepad_core::session::Prompter;
use notepad_core::{EditorSession, KeyValueStore, NoteStore, SaveOutcome};

use crate::commands::common::{edit_in_editor, edited_content, parse_note_id, AppContext};
use crate::error::CliError;

pub async fn run_edit(
    ctx: &AppContext,
    id: &str,
    title: Option<String>,
    content_parts: &[String],
) -> Result<(), CliError> {
    let session = ctx.open_session(parse_note_id(id)?).await?;

    let content = if content_parts.iter().any(|part| !part.trim().is_empty()) {
        content_parts.join(" ")
    } else {
        edited_content(&edit_in_editor(&session.content())?).ok_or(CliError::EmptyEditedContent)?
    };

    match apply_edit(&session, title, content).await {
        Ok(SaveOutcome::Cancelled) => {
            tracing::debug!("Edit of note {} left as a local draft", session.note_id());
            eprintln!("Save cancelled; your edit is kept as a local draft.");
            println!("{}", session.note_id());
        }
        Ok(SaveOutcome::Duplicated(copy_id)) => {
            eprintln!("Saved your edit as a new note.");
            println!("{copy_id}");
        }
        Ok(_) => println!("{}", session.note_id()),
        Err(error) => {
            eprintln!("{}", session.status_label());
            return Err(error);
        }
    }
    Ok(())
}

/// Replace the buffer and save it right away.
pub async fn apply_edit<S, K, P>(
    session: &EditorSession<S, K, P>,
    title: Option<String>,
    content: String,
) -> Result<SaveOutcome, CliError>
where
    S: NoteStore,
    K: KeyValueStore,
    P: Prompter,
{
    if let Some(title) = title {
        session.set_title(title);
    }
    session.set_content(content);
    Ok(session.save_now().await?)
}
