use notepad_core::NoteStore;

use crate::commands::common::{note_to_list_item, AppContext};
use crate::error::CliError;

pub async fn run_shared(ctx: &AppContext, share_id: &str, as_json: bool) -> Result<(), CliError> {
    let note = ctx.store.get_shared(share_id.trim()).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&note_to_list_item(&note))?);
    } else {
        println!("# {}", note.display_title(200));
        println!();
        println!("{}", note.content);
    }
    Ok(())
}
