use chrono::Utc;
use notepad_core::models::{note_id_from_draft_key, DRAFT_KEY_PREFIX};
use notepad_core::{DraftCache, NoteId, SqliteKeyValueStore};
use serde::Serialize;

use crate::commands::common::{format_relative_time, preview_text, AppContext};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct DraftListItem {
    pub note_id: i64,
    pub preview: String,
    pub ts: i64,
    pub relative_time: String,
}

pub fn run_drafts(ctx: &AppContext, as_json: bool) -> Result<(), CliError> {
    let items = pending_drafts(&ctx.drafts()?)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        eprintln!("No local drafts");
    } else {
        for item in &items {
            println!(
                "{:>6}  {:<40}  {}",
                item.note_id, item.preview, item.relative_time
            );
        }
    }
    Ok(())
}

/// Drafts stored locally, most recently written first.
pub fn pending_drafts(
    drafts: &DraftCache<SqliteKeyValueStore>,
) -> Result<Vec<DraftListItem>, CliError> {
    let now_ms = Utc::now().timestamp_millis();
    let mut items = drafts
        .store()
        .keys_with_prefix(DRAFT_KEY_PREFIX)?
        .iter()
        .filter_map(|key| note_id_from_draft_key(key))
        .filter_map(|id: NoteId| drafts.load(id).map(|draft| (id, draft)))
        .map(|(id, draft)| DraftListItem {
            note_id: id.get(),
            preview: preview_text(&draft.content, 40),
            ts: draft.ts,
            relative_time: format_relative_time(draft.ts, now_ms),
        })
        .collect::<Vec<_>>();

    items.sort_by(|a, b| b.ts.cmp(&a.ts));
    Ok(items)
}
