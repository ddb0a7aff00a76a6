//! Telegram Bot API channel — phrase delivery and operator escalation.

use async_trait::async_trait;
use serde::Deserialize;

use phrasedrop_core::error::{PhrasedropError, Result};
use phrasedrop_core::report::FaultReport;
use phrasedrop_core::traits::{EscalationChannel, Notifier};
use phrasedrop_core::types::ChatId;

const SEND_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Thin Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramChannel {
    bot_token: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://api.telegram.org/bot{}/{}", self.bot_token, method)
    }

    /// Send a text message.
    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .timeout(SEND_TIMEOUT)
            .send()
            .await
            .map_err(|e| PhrasedropError::Channel(format!("sendMessage failed: {e}")))?;

        let result: TelegramApiResponse = response
            .json()
            .await
            .map_err(|e| PhrasedropError::Channel(format!("Invalid send response: {e}")))?;
        if !result.ok {
            return Err(PhrasedropError::Channel(format!(
                "Send failed: {}",
                result.description.unwrap_or_default()
            )));
        }
        Ok(())
    }

    /// Upload a text file to a chat.
    pub async fn send_document(&self, chat_id: ChatId, filename: &str, content: String) -> Result<()> {
        let part = reqwest::multipart::Part::text(content).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", part);
        let response = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PhrasedropError::Channel(format!("sendDocument failed: {e}")))?;

        let result: TelegramApiResponse = response
            .json()
            .await
            .map_err(|e| PhrasedropError::Channel(format!("Invalid upload response: {e}")))?;
        if !result.ok {
            return Err(PhrasedropError::Channel(format!(
                "Upload failed: {}",
                result.description.unwrap_or_default()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramChannel {
    async fn send(&self, chat: ChatId, text: &str) -> Result<()> {
        self.send_message(chat, text).await
    }
}

#[derive(Debug, Deserialize)]
struct TelegramApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Escalation channel that sends rendered fault reports to every operator
/// chat, with log excerpts attached as documents.
pub struct TelegramEscalation {
    channel: TelegramChannel,
    admin_chats: Vec<ChatId>,
}

impl TelegramEscalation {
    pub fn new(channel: TelegramChannel, admin_chats: Vec<ChatId>) -> Self {
        Self {
            channel,
            admin_chats,
        }
    }
}

#[async_trait]
impl EscalationChannel for TelegramEscalation {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, report: &FaultReport) -> Result<()> {
        let text = report.render();
        for chat in &self.admin_chats {
            self.channel.send_message(*chat, &text).await?;
            for (i, log) in report.logs.iter().enumerate() {
                self.channel
                    .send_document(*chat, &format!("log{}.txt", i + 1), log.clone())
                    .await?;
            }
        }
        Ok(())
    }
}
