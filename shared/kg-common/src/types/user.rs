//! User Types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Telegram numeric user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Privilege tier of a user, derived from the configured owner and admin
/// ID sets. Never persisted; recomputed on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Operator of the deployment.
    Owner,
    /// Delegated manager of the code table.
    Admin,
    /// Everyone else.
    Regular,
}
