//! Keyboard input consumed by the editor session

use serde::{Deserialize, Serialize};

use super::SaveOutcome;

/// Which modifier acts as the command key for shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutPlatform {
    /// `Cmd` (meta) is the command modifier
    Mac,
    /// `Ctrl` is the command modifier
    Other,
}

impl ShortcutPlatform {
    pub const fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Mac
        } else {
            Self::Other
        }
    }

    /// Modifier + `S`
    pub fn is_save_shortcut(self, press: &KeyPress) -> bool {
        let modifier = match self {
            Self::Mac => press.meta,
            Self::Other => press.ctrl,
        };
        modifier && matches!(&press.key, Key::Character(c) if c.eq_ignore_ascii_case("s"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Character(String),
    Escape,
    Enter,
    Tab,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyPress {
    pub const fn new(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            meta: false,
            shift: false,
            alt: false,
        }
    }

    pub fn character(c: &str) -> Self {
        Self::new(Key::Character(c.to_string()))
    }

    #[must_use]
    pub const fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    #[must_use]
    pub const fn with_meta(mut self) -> Self {
        self.meta = true;
        self
    }
}

/// What the session did with a key press
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// The save shortcut ran a save
    Save(SaveOutcome),
    /// Escape stopped an active dictation
    DictationStopped,
    /// Escape while not dictating: the host should leave the editor
    NavigateBack,
    Ignored,
}
