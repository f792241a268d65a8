use std::sync::Arc;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use serde::Serialize;
use url::Url;

use crate::transport::{HttpTransport, TransportRequest};

use super::{Notifier, NotifyError, NotifyResult};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Bot credentials for the Telegram channel.
#[derive(Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .finish()
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Posts the summary through the Bot API `sendMessage` method as HTML.
pub struct TelegramNotifier {
    transport: Arc<dyn HttpTransport>,
    config: TelegramConfig,
    api_base: String,
}

impl TelegramNotifier {
    pub fn new(transport: Arc<dyn HttpTransport>, config: TelegramConfig) -> Self {
        Self {
            transport,
            config,
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }

    /// Point the notifier at a different Bot API host.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> Result<Url, NotifyError> {
        let raw = format!("{}/bot{}/sendMessage", self.api_base, self.config.bot_token);
        Url::parse(&raw).map_err(|err| self.transport_error(err))
    }

    /// The bot token is part of the URL; keep it out of error text.
    fn transport_error(&self, detail: impl std::fmt::Display) -> NotifyError {
        let detail = detail.to_string();
        let token = self.config.bot_token.as_str();
        if token.is_empty() {
            return NotifyError::Transport(detail);
        }
        NotifyError::Transport(detail.replace(token, "<redacted>"))
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, text: &str) -> NotifyResult {
        let payload = serde_json::to_vec(&SendMessage {
            chat_id: &self.config.chat_id,
            text,
            parse_mode: "HTML",
        })
        .map_err(|err| self.transport_error(err))?;

        let request = TransportRequest::post(self.endpoint()?)
            .with_header(CONTENT_TYPE, "application/json")
            .map_err(|err| self.transport_error(err))?
            .with_body(payload);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|err| self.transport_error(err))?;

        if !response.is_success() {
            return Err(NotifyError::Http {
                status: response.status,
                body: response.text(),
            });
        }
        Ok(())
    }
}
