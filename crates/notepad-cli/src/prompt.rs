//! Terminal answers for editor session prompts

use std::io::{self, BufRead, Write};

use notepad_core::session::Prompter;
use notepad_core::{ConflictChoice, Draft, EditConflict, Note};

use crate::commands::common::preview_text;

/// Asks on stderr and reads answers from stdin, or assumes them with `--yes`.
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompter {
    assume_yes: bool,
}

impl TerminalPrompter {
    pub const fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }
}

impl Prompter for TerminalPrompter {
    fn restore_draft(&self, draft: &Draft, server: &Note) -> bool {
        if self.assume_yes {
            return true;
        }

        eprintln!("Note {} has a local draft that was never saved.", server.id);
        eprintln!("  draft:  {}", preview_text(&draft.content, 60));
        eprintln!("  server: {}", preview_text(&server.content, 60));
        parse_yes_no(ask("Restore the draft? [Y/n] ").as_deref(), true)
    }

    fn resolve_conflict(&self, conflict: &EditConflict) -> ConflictChoice {
        if self.assume_yes {
            return ConflictChoice::Duplicate;
        }

        eprintln!(
            "Note {} was changed elsewhere since you started editing.",
            conflict.note_id
        );
        ConflictChoice::from_answer(
            ask("[o]verwrite it, save as a [d]uplicate, or [c]ancel? ").as_deref(),
        )
    }

    fn confirm_delete(&self, note: &Note) -> bool {
        if self.assume_yes {
            return true;
        }

        let question = format!("Delete note {} ({})? [y/N] ", note.id, note.display_title(40));
        parse_yes_no(ask(&question).as_deref(), false)
    }
}

fn ask(question: &str) -> Option<String> {
    eprint!("{question}");
    let _ = io::stderr().flush();

    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

/// `y`/`yes` or `n`/`no`; anything else (including EOF) takes `default`.
pub fn parse_yes_no(answer: Option<&str>, default: bool) -> bool {
    match answer
        .map(|value| value.trim().to_ascii_lowercase())
        .as_deref()
    {
        Some("y" | "yes") => true,
        Some("n" | "no") => false,
        _ => default,
    }
}
