use crate::commands::common::{parse_note_id, AppContext};
use crate::error::CliError;

pub async fn run_share(ctx: &AppContext, id: &str) -> Result<(), CliError> {
    let session = ctx.open_session(parse_note_id(id)?).await?;
    let share_id = session.share().await?;

    let url = session
        .share_url(ctx.config.share_base_url())
        .unwrap_or(share_id);
    println!("{url}");
    Ok(())
}
