//! Telegram Bot API delivery.
//!
//! A listing goes out as two independent parts to the same chat, in
//! order: a compact highlight via `sendMessage`, then a plain-text
//! detail document via `sendDocument` (multipart upload).

pub mod error;
pub mod format;

pub use error::{Result, TelegramError};
pub use format::{build_details_document, build_message, ListingDigest};

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

const API_BASE: &str = "https://api.telegram.org";
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

pub struct TelegramClient {
    http: reqwest::Client,
    token: String,
    chat_id: String,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            chat_id: chat_id.into(),
            base_url: API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Send the compact highlight message (HTML markup).
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, self.token);
        let response = self
            .http
            .post(&url)
            .timeout(SEND_TIMEOUT)
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": text,
                "parse_mode": "HTML",
                "disable_web_page_preview": false,
            }))
            .send()
            .await?;

        Self::check_response("sendMessage", response).await
    }

    /// Upload the detail document as an attached plain-text file.
    pub async fn send_document(&self, filename: &str, content: String) -> Result<()> {
        let url = format!("{}/bot{}/sendDocument", self.base_url, self.token);
        let part = reqwest::multipart::Part::bytes(content.into_bytes())
            .file_name(filename.to_string())
            .mime_str("text/plain; charset=utf-8")?;
        let form = reqwest::multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .part("document", part);

        let response = self
            .http
            .post(&url)
            .timeout(SEND_TIMEOUT)
            .multipart(form)
            .send()
            .await?;

        Self::check_response("sendDocument", response).await
    }

    /// Verify the bot token against `getMe`. Called once at startup so
    /// a bad token fails the run before any pipeline work happens.
    pub async fn check(&self) -> Result<()> {
        let url = format!("{}/bot{}/getMe", self.base_url, self.token);
        let response = self.http.get(&url).timeout(SEND_TIMEOUT).send().await?;
        Self::check_response("getMe", response).await
    }

    async fn check_response(method: &str, response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let body: ApiResponse = response.json().await.unwrap_or(ApiResponse {
            ok: false,
            description: Some(format!("unreadable response (http {status})")),
        });

        if !body.ok {
            let description = body
                .description
                .unwrap_or_else(|| format!("http {status}"));
            warn!(method, %description, "Telegram API call failed");
            return Err(TelegramError::Api {
                method: method.to_string(),
                description,
            });
        }

        debug!(method, "Telegram API call ok");
        Ok(())
    }
}
