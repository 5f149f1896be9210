//! Channel Types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Telegram channel or supergroup identifier.
///
/// Channel IDs are negative numbers in the Bot API (`-100...` for
/// supergroups/channels). The set of mandatory channels is fixed at
/// startup and immutable for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub i64);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChannelId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}
