//! HTTP client for the note service.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::{NewNote, Note, NoteId, NotePatch, ShareToken};
use crate::util::{compact_text, is_http_url, normalize_text_option};

use super::NoteStore;

/// `NoteStore` backed by the REST note service
#[derive(Clone)]
pub struct HttpNoteStore {
    base_url: String,
    client: Client,
}

impl std::fmt::Debug for HttpNoteStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpNoteStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpNoteStore {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            client: Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.api_base_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// The share id is user input; it must stay a single path segment.
    fn shared_url(&self, share_id: &str) -> String {
        self.url(&format!("/api/share/{}", urlencoding::encode(share_id)))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(parse_api_error(status, &body));
        }

        Ok(response.json::<T>().await?)
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<()> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(parse_api_error(status, &body))
        }
    }
}

impl NoteStore for HttpNoteStore {
    async fn list(&self) -> Result<Vec<Note>> {
        self.send_json(self.client.get(self.url("/api/notes"))).await
    }

    async fn create(&self, note: &NewNote) -> Result<Note> {
        let created: Note = self
            .send_json(self.client.post(self.url("/api/notes")).json(note))
            .await?;
        tracing::info!("Created note {}", created.id);
        Ok(created)
    }

    async fn get(&self, id: NoteId) -> Result<Note> {
        self.send_json(self.client.get(self.url(&format!("/api/notes/{id}"))))
            .await
    }

    async fn patch(&self, id: NoteId, patch: &NotePatch) -> Result<Note> {
        let updated: Note = self
            .send_json(
                self.client
                    .patch(self.url(&format!("/api/notes/{id}")))
                    .json(patch),
            )
            .await?;
        tracing::debug!("Patched note {}", id);
        Ok(updated)
    }

    async fn delete(&self, id: NoteId) -> Result<()> {
        self.send_empty(self.client.delete(self.url(&format!("/api/notes/{id}"))))
            .await?;
        tracing::info!("Deleted note {}", id);
        Ok(())
    }

    async fn share(&self, id: NoteId) -> Result<ShareToken> {
        self.send_json(self.client.post(self.url(&format!("/api/notes/{id}/share"))))
            .await
    }

    async fn get_shared(&self, share_id: &str) -> Result<Note> {
        let share_id = share_id.trim();
        if share_id.is_empty() {
            return Err(Error::InvalidInput("share id must not be empty".to_string()));
        }
        self.send_json(self.client.get(self.shared_url(share_id))).await
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    detail: Option<serde_json::Value>,
    message: Option<String>,
    error: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> Error {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|payload| {
            let detail = payload.detail.map(|detail| match detail {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            });
            detail.or(payload.message).or(payload.error)
        })
        .map(|message| compact_text(&message))
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            let trimmed = compact_text(body);
            if trimmed.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                trimmed
            }
        });

    if status == StatusCode::NOT_FOUND {
        Error::NotFound(message)
    } else {
        Error::Api {
            status: status.as_u16(),
            message,
        }
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("note service URL must not be empty".to_string()))?;
    if is_http_url(&url) {
        Ok(url.trim_end_matches('/').to_string())
    } else {
        Err(Error::Config(
            "note service URL must include http:// or https://".to_string(),
        ))
    }
}
