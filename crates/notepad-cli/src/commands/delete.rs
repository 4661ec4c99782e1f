use crate::commands::common::{parse_note_id, AppContext};
use crate::error::CliError;

pub async fn run_delete(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let note_id = parse_note_id(id)?;
    let session = ctx.open_session(note_id).await?;

    if session.delete().await? {
        println!("{note_id}");
    } else {
        eprintln!("Delete cancelled");
    }
    Ok(())
}
