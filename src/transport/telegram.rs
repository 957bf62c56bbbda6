//! Telegram Bot API transport (long polling)

use super::Transport;
use crate::error::AssistantError;
use crate::models::{InboundMessage, UserId};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

const API_BASE: &str = "https://api.telegram.org";
/// Telegram rejects longer message bodies.
const MAX_MESSAGE_CHARS: usize = 4096;
const LONG_POLL_SECS: u64 = 30;

pub struct TelegramTransport {
    client: Client,
    base_url: String,
    offset: AtomicI64,
}

impl TelegramTransport {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_api_base(API_BASE, token)
    }

    fn with_api_base(api_base: &str, token: &str) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(Duration::from_secs(LONG_POLL_SECS + 10))
            .build()?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_base, token),
            offset: AtomicI64::new(0),
        })
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{}", self.base_url, method);
        let response: ApiResponse<R> = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        match (response.ok, response.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(AssistantError::Transport(format!(
                "{} failed: {}",
                method,
                response.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn receive(&self) -> Result<Vec<InboundMessage>> {
        let request = GetUpdates {
            offset: self.offset.load(Ordering::SeqCst),
            timeout: LONG_POLL_SECS,
            allowed_updates: &["message"],
        };

        let updates: Vec<Update> = self.call("getUpdates", &request).await?;

        if let Some(last) = updates.iter().map(|u| u.update_id).max() {
            self.offset.store(last + 1, Ordering::SeqCst);
        }

        let messages: Vec<InboundMessage> = updates.into_iter().filter_map(into_inbound).collect();
        if !messages.is_empty() {
            debug!("Received {} message(s)", messages.len());
        }
        Ok(messages)
    }

    async fn send(&self, chat_id: i64, text: &str) -> Result<()> {
        for chunk in split_message(text, MAX_MESSAGE_CHARS) {
            let request = SendMessage {
                chat_id,
                text: chunk,
            };
            let _: serde_json::Value = self.call("sendMessage", &request).await?;
        }
        info!(chat_id, "Reply delivered");
        Ok(())
    }
}

fn into_inbound(update: Update) -> Option<InboundMessage> {
    let message = update.message?;
    let from = message.from?;
    Some(InboundMessage {
        user_id: UserId(from.id),
        chat_id: message.chat.id,
        display_name: from.first_name,
        text: message.text,
    })
}

/// Split on char boundaries into chunks of at most `max_chars` chars.
fn split_message(text: &str, max_chars: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        let cut = rest
            .char_indices()
            .nth(max_chars)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(cut);
        chunks.push(head);
        rest = tail;
    }
    chunks.push(rest);
    chunks
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetUpdates {
    offset: i64,
    timeout: u64,
    allowed_updates: &'static [&'static str],
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    chat: TgChat,
    from: Option<TgUser>,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    #[serde(default)]
    first_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_parsing() {
        let raw = serde_json::json!({
            "ok": true,
            "result": [
                {"update_id": 10, "message": {"chat": {"id": 42}, "from": {"id": 42, "first_name": "Ana"}, "text": "saldo"}},
                {"update_id": 11, "message": {"chat": {"id": -1001234}, "from": {"id": 42, "first_name": "Ana"}, "sticker": {}}},
                {"update_id": 12, "edited_message": {}}
            ]
        });

        let response: ApiResponse<Vec<Update>> = serde_json::from_value(raw).unwrap();
        let messages: Vec<InboundMessage> = response
            .result
            .unwrap()
            .into_iter()
            .filter_map(into_inbound)
            .collect();

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].user_id, UserId(42));
        assert_eq!(messages[0].chat_id, 42);
        assert_eq!(messages[0].text.as_deref(), Some("saldo"));
        assert_eq!(messages[1].chat_id, -1001234);
        assert_eq!(messages[1].text, None);
    }

    #[tokio::test]
    async fn test_request_errors_hide_token() {
        let transport = TelegramTransport::with_api_base("http://127.0.0.1:1", "123:SECRETTOKEN").unwrap();

        let err = transport.receive().await.unwrap_err();
        assert!(!err.to_string().contains("SECRETTOKEN"), "{}", err);

        let err = transport.send(42, "hola").await.unwrap_err();
        assert!(!err.to_string().contains("SECRETTOKEN"), "{}", err);
    }

    #[test]
    fn test_split_message() {
        assert_eq!(split_message("hola", 10), vec!["hola"]);
        assert_eq!(split_message("", 10), vec![""]);

        let text = "ñ".repeat(9);
        let chunks = split_message(&text, 4);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].chars().count(), 4);
        assert_eq!(chunks[2].chars().count(), 1);
        assert_eq!(chunks.concat(), text);
    }
}
