//! Telegram Bot API client.
//!
//! Thin async wrapper over the handful of Bot API methods the gateway
//! needs: `getMe`, long-poll `getUpdates`, and `sendMessage`.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::{Error, Result};

/// A bot's own identity, from `getMe`.
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    /// Numeric bot id.
    pub id: i64,
    /// Username without the leading `@`.
    pub username: Option<String>,
}

/// One incoming update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update id, used as the long-poll offset.
    pub update_id: i64,
    /// The message payload, when the update carries one.
    pub message: Option<Message>,
}

/// An incoming message.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Chat the message arrived in.
    pub chat: Chat,
    /// Sender, when known.
    pub from: Option<User>,
    /// Text content; absent for stickers, photos, and similar.
    pub text: Option<String>,
}

/// A chat identifier.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Numeric chat id.
    pub id: i64,
}

/// A Telegram user.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// Display first name.
    pub first_name: String,
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Async Bot API client.
pub struct TelegramApi {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl TelegramApi {
    /// Creates a client for a bot token.
    #[must_use]
    pub fn new(token: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{method}",
            self.base_url,
            self.token.expose_secret()
        )
    }

    /// Fetches the bot identity, validating the token.
    ///
    /// # Errors
    ///
    /// Returns `Error::OperationFailed` when the token is rejected or
    /// the transport fails.
    pub async fn get_me(&self) -> Result<BotIdentity> {
        self.call("getMe", &json!({})).await
    }

    /// Long-polls for updates after `offset`.
    ///
    /// # Errors
    ///
    /// Returns `Error::OperationFailed` on transport or API failures.
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    /// Sends a message, optionally with a parse mode.
    ///
    /// # Errors
    ///
    /// Returns `Error::RenderRejected` when the API refuses to parse the
    /// message entities, `Error::OperationFailed` otherwise.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        parse_mode: Option<&str>,
    ) -> Result<()> {
        let mut body = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(mode) = parse_mode {
            body["parse_mode"] = json!(mode);
        }

        let _: serde_json::Value = self.call("sendMessage", &body).await?;
        Ok(())
    }

    /// Posts a method call and unwraps the response envelope.
    async fn call<T: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::OperationFailed {
                operation: format!("telegram_{method}"),
                cause: e.to_string(),
            })?;

        let status = response.status();
        let envelope: ApiEnvelope<T> =
            response.json().await.map_err(|e| Error::OperationFailed {
                operation: format!("telegram_{method}"),
                cause: format!("HTTP {status}: {e}"),
            })?;

        if !envelope.ok {
            let description = envelope
                .description
                .unwrap_or_else(|| format!("HTTP {status}"));
            if description.to_lowercase().contains("can't parse entities") {
                return Err(Error::RenderRejected(description));
            }
            return Err(Error::OperationFailed {
                operation: format!("telegram_{method}"),
                cause: description,
            });
        }

        envelope.result.ok_or_else(|| Error::OperationFailed {
            operation: format!("telegram_{method}"),
            cause: "response envelope had no result".to_string(),
        })
    }
}
