// src/mcp/tools/telegram.rs

use std::sync::Arc;

use anyhow::{bail, Result};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::mcp::schema::{Field, ToolSchema};
use crate::mcp::tool::{handler_fn, success, ToolDescriptor, ToolFailure, ToolResult};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Clone)]
pub struct TelegramBot {
    http: Client,
    token: Option<SecretString>,
    default_chat: Option<String>,
    base_url: String,
}

impl TelegramBot {
    pub fn new(http: Client, token: Option<SecretString>, default_chat: Option<String>) -> Self {
        Self {
            http,
            token,
            default_chat,
            base_url: TELEGRAM_API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub async fn send(&self, text: &str, chat_id: Option<&str>) -> ToolResult {
        let Some(token) = &self.token else {
            return Err(ToolFailure::error(
                "Telegram bot token not configured. Please set TELEGRAM_BOT_TOKEN environment variable.",
            )
            .suggestion("Create a bot with @BotFather and copy its token"));
        };
        let Some(chat_id) = chat_id
            .filter(|c| !c.trim().is_empty())
            .or(self.default_chat.as_deref())
        else {
            return Err(ToolFailure::error(
                "No Telegram chat configured. Pass chat_id or set TELEGRAM_CHAT_ID environment variable.",
            ));
        };

        match self.post(token, chat_id, text).await {
            Ok(result) => {
                info!("Telegram message delivered");
                success(json!({
                    "chat_id": chat_id,
                    "message_id": result.get("message_id"),
                }))
            }
            Err(e) => {
                error!("Telegram send failed: {}", e);
                Err(ToolFailure::message(format!("Failed to send Telegram message: {}", e)))
            }
        }
    }

    async fn post(&self, token: &SecretString, chat_id: &str, text: &str) -> Result<Value> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, token.expose_secret());
        let response = self
            .http
            .post(&url)
            .json(&SendMessageBody { chat_id, text })
            .send()
            .await
            // The URL embeds the token; keep it out of error text.
            .map_err(|e| e.without_url())?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() || body.get("ok").and_then(Value::as_bool) != Some(true) {
            let description = body
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            bail!("Telegram API error {}: {}", status.as_u16(), description);
        }
        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }
}

pub fn descriptors(bot: TelegramBot) -> Vec<ToolDescriptor> {
    let bot = Arc::new(bot);
    vec![ToolDescriptor::new(
        "send_telegram_message",
        "Send a text message through the configured Telegram bot",
        ToolSchema::object()
            .field(Field::string("text").min_len(1).max_len(4096).describe("Message text"))
            .field(
                Field::string("chat_id")
                    .optional()
                    .describe("Target chat; defaults to TELEGRAM_CHAT_ID"),
            ),
        handler_fn(move |args: Value| {
            let bot = bot.clone();
            async move {
                let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
                let chat_id = args.get("chat_id").and_then(Value::as_str);
                bot.send(text, chat_id).await
            }
        }),
    )
    .with_title("Send Telegram Message")]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline(token: Option<&str>, chat: Option<&str>) -> TelegramBot {
        TelegramBot::new(
            Client::new(),
            token.map(|t| SecretString::new(t.to_string())),
            chat.map(str::to_string),
        )
        .with_base_url("http://127.0.0.1:9")
    }

    #[tokio::test]
    async fn missing_token_is_reported_without_a_request() {
        let err = offline(None, Some("42")).send("hi", None).await.unwrap_err();
        assert!(err.text().contains("not configured"));
    }

    #[tokio::test]
    async fn missing_chat_is_reported_without_a_request() {
        let err = offline(Some("123:abc"), None).send("hi", None).await.unwrap_err();
        assert!(err.text().contains("No Telegram chat"));
    }

    #[tokio::test]
    async fn transport_errors_hide_the_token() {
        let err = offline(Some("123:secret"), Some("42"))
            .send("hi", None)
            .await
            .unwrap_err();
        assert!(err.text().starts_with("Failed to send Telegram message"));
        assert!(!err.text().contains("secret"));
    }
}
