//! Bot API Wire Types
//!
//! Inbound shapes carry only the fields the gateway reads; serde skips
//! the rest of the Bot API's payload.

use serde::{Deserialize, Serialize};

/// Envelope every Bot API method returns.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i32>,
}

/// One long-poll update.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub video: Option<Video>,
    pub reply_to_message: Option<Box<Message>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
}

/// `getChatMember` result; only the status matters here.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    pub status: ChatMemberStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatMemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

impl ChatMemberStatus {
    /// Whether this status satisfies the mandatory-channel requirement.
    /// Restricted users still sit in the member list but have lost
    /// privileges; they do not count.
    #[must_use]
    pub const fn is_active_member(self) -> bool {
        matches!(self, Self::Creator | Self::Administrator | Self::Member)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_update() {
        let raw = r#"{
            "update_id": 900100,
            "message": {
                "message_id": 5,
                "from": {"id": 1350513135, "is_bot": false, "first_name": "A"},
                "chat": {"id": 1350513135, "type": "private"},
                "date": 1750900000,
                "text": "X7"
            }
        }"#;

        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.update_id, 900_100);
        let message = update.message.unwrap();
        assert_eq!(message.from.unwrap().id, 1_350_513_135);
        assert_eq!(message.text.as_deref(), Some("X7"));
        assert!(message.video.is_none());
    }

    #[test]
    fn test_decode_reply_to_video() {
        let raw = r#"{
            "message_id": 9,
            "from": {"id": 1, "is_bot": false},
            "chat": {"id": 1, "type": "private"},
            "date": 1750900000,
            "text": "/upload X7 Episode 7",
            "reply_to_message": {
                "message_id": 8,
                "chat": {"id": 1, "type": "private"},
                "date": 1750899000,
                "video": {"file_id": "BAACAgIAAxkBAAIB", "width": 1280, "height": 720, "duration": 60}
            }
        }"#;

        let message: Message = serde_json::from_str(raw).unwrap();
        let replied = message.reply_to_message.unwrap();
        assert_eq!(replied.video.unwrap().file_id, "BAACAgIAAxkBAAIB");
    }

    #[test]
    fn test_decode_chat_member_statuses() {
        let member: ChatMember = serde_json::from_str(r#"{"status": "member"}"#).unwrap();
        assert!(member.status.is_active_member());

        let kicked: ChatMember = serde_json::from_str(r#"{"status": "kicked"}"#).unwrap();
        assert_eq!(kicked.status, ChatMemberStatus::Kicked);
        assert!(!kicked.status.is_active_member());

        let restricted: ChatMember = serde_json::from_str(r#"{"status": "restricted"}"#).unwrap();
        assert!(!restricted.status.is_active_member());
    }

    #[test]
    fn test_decode_error_envelope() {
        let raw = r#"{"ok": false, "error_code": 400, "description": "Bad Request: user not found"}"#;
        let response: ApiResponse<ChatMember> = serde_json::from_str(raw).unwrap();

        assert!(!response.ok);
        assert_eq!(response.error_code, Some(400));
        assert!(response.result.is_none());
    }

    #[test]
    fn test_markup_serializes_like_the_api_expects() {
        let markup = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton {
                text: String::from("join"),
                url: String::from("https://t.me/example"),
            }]],
        };

        assert_eq!(
            serde_json::to_string(&markup).unwrap(),
            r#"{"inline_keyboard":[[{"text":"join","url":"https://t.me/example"}]]}"#
        );
    }
}
