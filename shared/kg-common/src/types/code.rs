//! Redemption Code Types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::UserId;

/// Short text token users exchange for a video.
///
/// Codes compare exactly (byte equality). Deployments that want the
/// legacy case-insensitive behavior fold user input to uppercase at the
/// parse boundary via [`Code::from_input`], so the store itself never
/// needs a collation policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    /// Wrap an already-normalized code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Build a code from raw user input: trims surrounding whitespace and,
    /// when `fold_case` is set, uppercases the token.
    pub fn from_input(raw: &str, fold_case: bool) -> Self {
        let trimmed = raw.trim();
        if fold_case {
            Self(trimmed.to_uppercase())
        } else {
            Self(trimmed.to_owned())
        }
    }

    /// The code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Code {
    fn from(code: &str) -> Self {
        Self(code.to_owned())
    }
}

/// Opaque reference to a deliverable video.
///
/// In practice this is a Telegram `file_id`; the core never interprets
/// it, it only hands it back to the transport for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    /// Wrap a raw asset reference.
    pub fn new(asset: impl Into<String>) -> Self {
        Self(asset.into())
    }

    /// The reference as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetRef {
    fn from(asset: &str) -> Self {
        Self(asset.to_owned())
    }
}

/// A live code-to-asset registration.
///
/// Created by an authorized `/upload`, destroyed by an authorized
/// `/delete`. Mappings are never mutated in place; delete-then-recreate
/// is the only update path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeMapping {
    /// Unique redemption token.
    pub code: Code,
    /// Human-readable caption for the video.
    pub title: String,
    /// The deliverable the code resolves to.
    pub asset_ref: AssetRef,
    /// Who registered the mapping.
    pub created_by: UserId,
    /// When the mapping was registered.
    pub created_at: DateTime<Utc>,
}
