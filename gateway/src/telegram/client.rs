//! Bot API Client
//!
//! Thin reqwest wrapper over the four Bot API methods the gateway uses.
//! Long polling holds a `getUpdates` request open server-side, so the
//! HTTP timeout must exceed the poll window or every quiet poll would end
//! in a client-side timeout.

use std::time::Duration;

use async_trait::async_trait;
use kg_common::{AssetRef, ChannelId, UserId};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::error::TelegramError;
use super::types::{ApiResponse, ChatMember, InlineKeyboardMarkup, Message, Update};
use crate::membership::{MembershipProbe, TransientLookupError};

/// Slack added on top of the poll window before the HTTP client gives up.
const POLL_GRACE_SECS: u64 = 10;

/// HTTP client bound to one bot token.
pub struct BotClient {
    http: reqwest::Client,
    base_url: String,
    poll_timeout_secs: u64,
}

impl BotClient {
    pub fn new(
        api_base_url: &str,
        token: &str,
        poll_timeout_secs: u64,
    ) -> Result<Self, TelegramError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + POLL_GRACE_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{token}", api_base_url.trim_end_matches('/')),
            poll_timeout_secs,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, TelegramError> {
        let response: ApiResponse<T> = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(TelegramError::Api {
                code: response.error_code.unwrap_or(0),
                description: response
                    .description
                    .unwrap_or_else(|| String::from("no description")),
            });
        }
        response.result.ok_or(TelegramError::MissingResult)
    }

    /// Fetch updates after `offset`, waiting up to the poll window for
    /// new ones.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            json!({
                "offset": offset,
                "timeout": self.poll_timeout_secs,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    /// Send a plain-text message, optionally with an inline keyboard.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        let body = match markup {
            Some(markup) => json!({
                "chat_id": chat_id,
                "text": text,
                "reply_markup": markup,
            }),
            None => json!({ "chat_id": chat_id, "text": text }),
        };

        self.call::<Message>("sendMessage", body).await?;
        Ok(())
    }

    /// Deliver a stored video by its file reference with an HTML caption.
    pub async fn send_video(
        &self,
        chat_id: i64,
        asset: &AssetRef,
        caption: &str,
    ) -> Result<(), TelegramError> {
        self.call::<Message>(
            "sendVideo",
            json!({
                "chat_id": chat_id,
                "video": asset.as_str(),
                "caption": caption,
                "parse_mode": "HTML",
            }),
        )
        .await?;
        Ok(())
    }

    /// Membership status of `user` in `channel`.
    pub async fn get_chat_member(
        &self,
        channel: ChannelId,
        user: UserId,
    ) -> Result<ChatMember, TelegramError> {
        self.call(
            "getChatMember",
            json!({ "chat_id": channel.0, "user_id": user.0 }),
        )
        .await
    }
}

#[async_trait]
impl MembershipProbe for BotClient {
    /// API rejections are definitive non-membership: 400 means the user
    /// is unknown to the channel, 403 means the bot itself was removed
    /// and can no longer vouch for anyone. Rate limits and server errors
    /// leave the verdict unknown.
    async fn is_member(
        &self,
        channel: ChannelId,
        user: UserId,
    ) -> Result<bool, TransientLookupError> {
        match self.get_chat_member(channel, user).await {
            Ok(member) => Ok(member.status.is_active_member()),
            Err(TelegramError::Api {
                code: 400 | 403, ..
            }) => Ok(false),
            Err(e) => Err(anyhow::Error::new(e).into()),
        }
    }
}
