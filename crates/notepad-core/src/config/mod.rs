//! Client configuration.
//!
//! `ClientConfig` is read from an optional JSON file and then overridden by
//! `NOTEPAD_*` environment variables. Every field has a default, so an empty
//! environment yields a usable local configuration.

use std::collections::HashMap;
use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::session::{SessionSettings, ShortcutPlatform};
use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 600;
const DEFAULT_SAVED_DISPLAY_MS: u64 = 800;
const DEFAULT_DICTATION_LANG: &str = "zh-CN";

const ENV_API_URL: &str = "NOTEPAD_API_URL";
const ENV_PUBLIC_URL: &str = "NOTEPAD_PUBLIC_URL";
const ENV_REQUEST_TIMEOUT_SECS: &str = "NOTEPAD_REQUEST_TIMEOUT_SECS";
const ENV_AUTOSAVE_DEBOUNCE_MS: &str = "NOTEPAD_AUTOSAVE_DEBOUNCE_MS";
const ENV_SAVED_DISPLAY_MS: &str = "NOTEPAD_SAVED_DISPLAY_MS";
const ENV_DICTATION_LANG: &str = "NOTEPAD_DICTATION_LANG";

/// Runtime configuration shared by the note store client and editor sessions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, default)]
pub struct ClientConfig {
    /// Base URL of the note service (`/api/...` is appended)
    pub api_base_url: String,
    /// Base URL used to render public share links; defaults to `api_base_url`
    pub public_base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub autosave_debounce_ms: u64,
    pub saved_display_ms: u64,
    /// Recognition language handed to the dictation capability
    pub dictation_lang: String,
    pub shortcut_platform: ShortcutPlatform,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            public_base_url: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            autosave_debounce_ms: DEFAULT_AUTOSAVE_DEBOUNCE_MS,
            saved_display_ms: DEFAULT_SAVED_DISPLAY_MS,
            dictation_lang: DEFAULT_DICTATION_LANG.to_string(),
            shortcut_platform: ShortcutPlatform::current(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        let values: HashMap<String, String> = env::vars().collect();
        Self::default().with_overrides(|name| values.get(name).cloned())
    }

    /// Load a JSON config file, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_json(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        let values: HashMap<String, String> = env::vars().collect();
        base.with_overrides(|name| values.get(name).cloned())
    }

    /// Parse a JSON config payload.
    pub fn from_json(payload: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(payload)
            .map_err(|error| Error::Config(format!("invalid config JSON: {error}")))?;
        config.validated()
    }

    /// Apply `NOTEPAD_*` overrides from `lookup` and validate the result.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |name: &str| normalize_text_option(lookup(name));

        if let Some(url) = lookup(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(url) = lookup(ENV_PUBLIC_URL) {
            self.public_base_url = Some(url);
        }
        if let Some(value) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            self.request_timeout_secs = parse_u64(ENV_REQUEST_TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = lookup(ENV_AUTOSAVE_DEBOUNCE_MS) {
            self.autosave_debounce_ms = parse_u64(ENV_AUTOSAVE_DEBOUNCE_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_SAVED_DISPLAY_MS) {
            self.saved_display_ms = parse_u64(ENV_SAVED_DISPLAY_MS, &value)?;
        }
        if let Some(lang) = lookup(ENV_DICTATION_LANG) {
            self.dictation_lang = lang;
        }

        self.validated()
    }

    /// Base URL for share links.
    pub fn share_base_url(&self) -> &str {
        self.public_base_url
            .as_deref()
            .unwrap_or(&self.api_base_url)
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timer and keyboard settings for editor sessions.
    pub const fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            autosave_debounce: Duration::from_millis(self.autosave_debounce_ms),
            saved_display: Duration::from_millis(self.saved_display_ms),
            shortcut_platform: self.shortcut_platform,
        }
    }

    fn validated(mut self) -> Result<Self> {
        self.api_base_url = normalize_http_url(&self.api_base_url, "api_base_url")?;
        self.public_base_url = match normalize_text_option(self.public_base_url.take()) {
            Some(url) => Some(normalize_http_url(&url, "public_base_url")?),
            None => None,
        };
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(self)
    }
}

fn normalize_http_url(raw: &str, field: &str) -> Result<String> {
    let value = normalize_text_option(Some(raw.to_string()))
        .ok_or_else(|| Error::Config(format!("'{field}' must not be empty")))?;
    if is_http_url(&value) {
        Ok(value.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(format!(
            "'{field}' must include http:// or https://"
        )))
    }
}

fn parse_u64(name: &str, value: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{name} must be a non-negative integer")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn defaults_match_editor_timings() {
        let config = ClientConfig::default();
        let settings = config.session_settings();
        assert_eq!(settings.autosave_debounce, Duration::from_millis(600));
        assert_eq!(settings.saved_display, Duration::from_millis(800));
        assert_eq!(config.dictation_lang, "zh-CN");
    }

    #[test]
    fn overrides_apply_and_trim_trailing_slash() {
        let config = ClientConfig::default()
            .with_overrides(lookup_from(&[
                (ENV_API_URL, " https://notes.example.com/ "),
                (ENV_AUTOSAVE_DEBOUNCE_MS, "250"),
            ]))
            .unwrap();
        assert_eq!(config.api_base_url, "https://notes.example.com");
        assert_eq!(config.autosave_debounce_ms, 250);
        assert_eq!(config.share_base_url(), "https://notes.example.com");
    }

    #[test]
    fn public_url_overrides_share_base() {
        let config = ClientConfig::default()
            .with_overrides(lookup_from(&[(ENV_PUBLIC_URL, "https://share.example.com/")]))
            .unwrap();
        assert_eq!(config.share_base_url(), "https://share.example.com");
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(ClientConfig::default()
            .with_overrides(lookup_from(&[(ENV_API_URL, "notes.example.com")]))
            .is_err());
        assert!(ClientConfig::default()
            .with_overrides(lookup_from(&[(ENV_SAVED_DISPLAY_MS, "soon")]))
            .is_err());
        assert!(ClientConfig::default()
            .with_overrides(lookup_from(&[(ENV_REQUEST_TIMEOUT_SECS, "0")]))
            .is_err());
    }

    #[test]
    fn json_rejects_unknown_fields() {
        let error = ClientConfig::from_json(r#"{"api_base_url": "https://a.test", "extra": 1}"#)
            .unwrap_err();
        assert!(error.to_string().contains("unknown field"));
    }

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let config =
            ClientConfig::from_json(r#"{"api_base_url": "https://a.test", "saved_display_ms": 100}"#)
                .unwrap();
        assert_eq!(config.saved_display_ms, 100);
        assert_eq!(config.autosave_debounce_ms, DEFAULT_AUTOSAVE_DEBOUNCE_MS);
    }
}
