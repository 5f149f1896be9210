//! Outcome Rendering
//!
//! Maps engine outcomes to user-visible replies. Unauthorized mutation
//! attempts render to nothing at all; the command set stays invisible to
//! users who cannot use it.

use kg_common::{Action, AssetRef, ChannelId, CodeMapping, Outcome};

use super::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use crate::config::ChannelSpec;

pub(crate) const VERIFIED: &str =
    "✅ Kanal(lar)ga a'zolik tasdiqlandi!\nIltimos, videoni olish uchun kodni kiriting:";
pub(crate) const JOIN_PROMPT: &str =
    "Salom! Videoni olishdan oldin quyidagi kanal(lar)ga a'zo bo'ling:";
pub(crate) const JOIN_BUTTON: &str = "➕ Kanalga qo'shiling";
pub(crate) const INVALID_CODE: &str =
    "🚫 Bunday kod topilmadi. To'g'ri kiriting yoki /start buyrug'ini qayta bajaring.";
pub(crate) const UPLOAD_NEEDS_VIDEO: &str =
    "⬆️ Videoni yuklash uchun avval videoga javob sifatida /upload <kod> <nom> deb yozing.";
pub(crate) const UPLOAD_USAGE: &str = "Foydalanish: /upload <kod> <nom>";
pub(crate) const UPLOAD_CONFLICT: &str =
    "🚫 Bu kod allaqachon band. Avval /delete bilan o'chiring yoki boshqa kod tanlang.";
pub(crate) const DELETE_USAGE: &str = "Foydalanish: /delete <kod>";
pub(crate) const DELETE_NOT_FOUND: &str = "🚫 Bunday kod topilmadi.";
pub(crate) const STORAGE_UNAVAILABLE: &str =
    "⚠️ Vaqtinchalik xatolik. Birozdan so'ng qayta urinib ko'ring.";

/// A reply ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text {
        text: String,
        markup: Option<InlineKeyboardMarkup>,
    },
    Video {
        asset: AssetRef,
        caption: String,
    },
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            markup: None,
        }
    }
}

/// The reply for `outcome`, or `None` when silence is the right answer.
#[must_use]
pub fn render(action: &Action, outcome: &Outcome, channels: &[ChannelSpec]) -> Option<Reply> {
    match outcome {
        Outcome::Verified => Some(Reply::text(VERIFIED)),
        Outcome::Granted(mapping) => Some(Reply::Video {
            asset: mapping.asset_ref.clone(),
            caption: caption_for(mapping),
        }),
        Outcome::DeniedNotSubscribed(missing) => Some(Reply::Text {
            text: JOIN_PROMPT.to_string(),
            markup: join_markup(channels, missing),
        }),
        Outcome::DeniedInvalidCode => Some(Reply::text(INVALID_CODE)),
        Outcome::DeniedUnauthorized => None,
        Outcome::Ok => confirmation_for(action),
        Outcome::Conflict => Some(Reply::text(UPLOAD_CONFLICT)),
        Outcome::NotFound => Some(Reply::text(DELETE_NOT_FOUND)),
        Outcome::StorageUnavailable => Some(Reply::text(STORAGE_UNAVAILABLE)),
    }
}

fn caption_for(mapping: &CodeMapping) -> String {
    format!(
        "📹 <b>{}</b>\nKod: <code>{}</code>",
        escape_html(&mapping.title),
        escape_html(mapping.code.as_str())
    )
}

fn confirmation_for(action: &Action) -> Option<Reply> {
    match action {
        Action::Upload { code, title, .. } => Some(Reply::text(format!(
            "✅ Video saqlandi! Kod: {code} -> {title}"
        ))),
        Action::Delete(code) => Some(Reply::text(format!(
            "🗑️ {code} kodi bilan video o'chirildi."
        ))),
        Action::Start | Action::RedeemCode(_) => None,
    }
}

/// One button row per missing channel that has a public invite link.
/// Channels without a link are still enforced, just not linkable.
fn join_markup(channels: &[ChannelSpec], missing: &[ChannelId]) -> Option<InlineKeyboardMarkup> {
    let rows: Vec<Vec<InlineKeyboardButton>> = channels
        .iter()
        .filter(|spec| missing.contains(&spec.id))
        .filter_map(|spec| spec.invite_url.as_ref())
        .map(|url| {
            vec![InlineKeyboardButton {
                text: JOIN_BUTTON.to_string(),
                url: url.clone(),
            }]
        })
        .collect();

    (!rows.is_empty()).then_some(InlineKeyboardMarkup {
        inline_keyboard: rows,
    })
}

/// Minimal escaping for Telegram's HTML parse mode.
fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
