use std::env;
use std::io::{self, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, TimeDelta, Utc};
use notepad_core::{
    ClientConfig, DraftCache, EditorSession, HttpNoteStore, Note, NoteId, SqliteKeyValueStore,
};
use serde::Serialize;

use crate::error::CliError;
use crate::prompt::TerminalPrompter;

const DEFAULT_EDITOR: &str = if cfg!(windows) { "notepad" } else { "vi" };

pub type CliSession = EditorSession<HttpNoteStore, SqliteKeyValueStore, TerminalPrompter>;

/// Everything a command needs: resolved config, store client and draft location
pub struct AppContext {
    pub config: ClientConfig,
    pub store: HttpNoteStore,
    pub db_path: PathBuf,
    pub assume_yes: bool,
}

impl AppContext {
    pub fn new(
        config_path: Option<&Path>,
        api_url: Option<String>,
        db_path: Option<PathBuf>,
        assume_yes: bool,
    ) -> Result<Self, CliError> {
        let config = load_config(config_path, api_url)?;
        let store = HttpNoteStore::from_config(&config)?;
        let db_path = resolve_db_path(db_path);
        tracing::debug!(
            "Using note service at {} with drafts in {}",
            store.base_url(),
            db_path.display()
        );
        Ok(Self {
            config,
            store,
            db_path,
            assume_yes,
        })
    }

    pub fn drafts(&self) -> Result<DraftCache<SqliteKeyValueStore>, CliError> {
        Ok(DraftCache::new(SqliteKeyValueStore::open(&self.db_path)?))
    }

    pub async fn open_session(&self, id: NoteId) -> Result<CliSession, CliError> {
        let session = EditorSession::builder(
            self.store.clone(),
            self.drafts()?,
            TerminalPrompter::new(self.assume_yes),
        )
        .settings(self.config.session_settings())
        .open(id)
        .await?;
        Ok(session)
    }
}

#[derive(Debug, Serialize)]
pub struct NoteListItem {
    pub id: i64,
    pub title: String,
    pub preview: String,
    pub content: String,
    pub updated_at: Option<String>,
    pub relative_time: String,
    pub share_id: Option<String>,
}

/// Config file (explicit, else the default location when present), then env,
/// then `--api-url`.
pub fn load_config(
    config_path: Option<&Path>,
    api_url: Option<String>,
) -> Result<ClientConfig, CliError> {
    let default_path = default_config_path().filter(|path| path.exists());
    let config = ClientConfig::load(config_path.or(default_path.as_deref()))?;

    let Some(api_url) = api_url else {
        return Ok(config);
    };
    Ok(config.with_overrides(|name| (name == "NOTEPAD_API_URL").then(|| api_url.clone()))?)
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("notepad").join("config.json"))
}

pub fn parse_note_id(id: &str) -> Result<NoteId, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyNoteId);
    }
    trimmed
        .parse()
        .map_err(|_| CliError::InvalidNoteId(trimmed.to_string()))
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    notes
        .iter()
        .map(|note| {
            let id = note.id.to_string();
            let title = preview_text(&note.display_title(40), 40);
            let relative_time = note
                .updated_at
                .as_ref()
                .and_then(|updated_at| watermark_millis(updated_at.as_str()))
                .map_or_else(|| "-".to_string(), |ms| format_relative_time(ms, now_ms));

            if note.share_id.is_some() {
                format!("{id:>6}  {title:<40}  {relative_time:<10}  shared")
            } else {
                format!("{id:>6}  {title:<40}  {relative_time}")
            }
        })
        .collect()
}

pub fn note_to_list_item(note: &Note) -> NoteListItem {
    let now_ms = Utc::now().timestamp_millis();
    let updated_at = note.updated_at.as_ref().map(ToString::to_string);

    NoteListItem {
        id: note.id.get(),
        title: note.display_title(200),
        preview: preview_text(&note.content, 80),
        content: note.content.clone(),
        relative_time: updated_at
            .as_deref()
            .and_then(watermark_millis)
            .map_or_else(|| "-".to_string(), |ms| format_relative_time(ms, now_ms)),
        updated_at,
        share_id: note.share_id.clone(),
    }
}

/// Unix ms of an RFC 3339 server timestamp.
pub fn watermark_millis(value: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|date_time| date_time.timestamp_millis())
}

/// First non-blank line of `text`, whitespace collapsed, cut to `max_chars`.
pub fn preview_text(text: &str, max_chars: usize) -> String {
    let line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default();
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }

    let mut cut = collapsed
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    cut.push('…');
    cut
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let age = TimeDelta::try_milliseconds(now_ms.saturating_sub(timestamp_ms)).unwrap_or_default();
    match (age.num_minutes(), age.num_hours(), age.num_days()) {
        (minutes, _, _) if minutes < 1 => "just now".to_string(),
        (minutes, 0, _) => format!("{minutes}m ago"),
        (_, hours, 0) => format!("{hours}h ago"),
        (_, _, days) if days < 365 => format!("{days}d ago"),
        (_, _, days) => format!("{}y ago", days / 365),
    }
}

/// Content for a new note: arguments, then piped stdin, then `$EDITOR`.
pub fn resolve_note_content(content_parts: &[String]) -> Result<String, CliError> {
    if let Some(content) = normalize_content(&content_parts.join(" ")) {
        return Ok(content);
    }
    if let Some(content) = read_piped_stdin()? {
        return Ok(content);
    }
    normalize_content(&edit_in_editor("")?).ok_or(CliError::EmptyContent)
}

pub fn normalize_content(content: &str) -> Option<String> {
    let trimmed = content.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Edited note text as the user left it, minus the newline editors append.
pub fn edited_content(content: &str) -> Option<String> {
    if content.trim().is_empty() {
        return None;
    }
    let body = content
        .strip_suffix("\r\n")
        .or_else(|| content.strip_suffix('\n'))
        .unwrap_or(content);
    Some(body.to_string())
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    Ok(normalize_content(&buffer))
}

/// Open `initial` in the user's editor and return the file as saved.
pub fn edit_in_editor(initial: &str) -> Result<String, CliError> {
    let mut file = tempfile::Builder::new()
        .prefix("notepad-")
        .suffix(".txt")
        .tempfile()?;
    file.write_all(initial.as_bytes())?;
    file.flush()?;

    let editor = editor_command();
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| CliError::EditorFailed("empty editor command".to_string()))?;
    tracing::debug!("Opening {} in {}", file.path().display(), editor);

    let status = Command::new(program).args(parts).arg(file.path()).status()?;
    if !status.success() {
        return Err(CliError::EditorFailed(format!(
            "`{editor}` exited with status {status}"
        )));
    }
    Ok(std::fs::read_to_string(file.path())?)
}

/// `$VISUAL`, then `$EDITOR`, then the platform default.
pub fn editor_command() -> String {
    ["VISUAL", "EDITOR"]
        .into_iter()
        .filter_map(|name| env::var(name).ok())
        .find(|command| !command.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string())
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("NOTEPAD_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("notepad")
        .join("local.db")
}
