//! Gateway Configuration
//!
//! Loads configuration from environment variables. The configuration is
//! immutable for the process lifetime; every component receives the parts
//! it needs at construction time.

use std::collections::HashSet;
use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use kg_common::{ChannelId, UserId};

/// One mandatory channel, with an optional public invite link used when
/// rendering join prompts.
#[derive(Debug, Clone)]
pub struct ChannelSpec {
    /// Channel identifier (negative for channels/supergroups).
    pub id: ChannelId,

    /// Public invite URL rendered as a join button, if known.
    pub invite_url: Option<String>,
}

/// Gateway configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram bot token
    pub bot_token: String,

    /// Channels a user must have joined before redeeming codes
    pub mandatory_channels: Vec<ChannelSpec>,

    /// User IDs holding the Owner role
    pub owner_ids: HashSet<UserId>,

    /// User IDs holding the Admin role
    pub admin_ids: HashSet<UserId>,

    /// SQLite database path (default: "kinogate.db")
    pub database_path: String,

    /// How long a cached membership verdict stays fresh (default: 60s)
    pub membership_cache_ttl: Duration,

    /// Upper bound on a single membership probe (default: 5s)
    pub membership_lookup_timeout: Duration,

    /// Treat unverifiable membership as satisfied instead of missing.
    /// Degraded-mode override; off by default (fail closed).
    pub membership_fail_open: bool,

    /// Uppercase redemption codes at the parse boundary (default: false)
    pub fold_code_case: bool,

    /// Long-poll window for `getUpdates` in seconds (default: 30)
    pub poll_timeout_secs: u64,

    /// Telegram Bot API base URL (override for tests/self-hosted servers)
    pub api_base_url: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let mandatory_channels = parse_channel_list(
            &env::var("MANDATORY_CHANNELS").context("MANDATORY_CHANNELS must be set")?,
        )?;
        if mandatory_channels.is_empty() {
            bail!("MANDATORY_CHANNELS must list at least one channel");
        }

        Ok(Self {
            bot_token: env::var("BOT_TOKEN").context("BOT_TOKEN must be set")?,
            mandatory_channels,
            owner_ids: parse_id_set(env::var("OWNER_IDS").ok().as_deref())
                .context("OWNER_IDS is not a comma-separated list of user IDs")?,
            admin_ids: parse_id_set(env::var("ADMIN_IDS").ok().as_deref())
                .context("ADMIN_IDS is not a comma-separated list of user IDs")?,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "kinogate.db".into()),
            membership_cache_ttl: Duration::from_secs(
                env::var("MEMBERSHIP_CACHE_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
            membership_lookup_timeout: Duration::from_secs(
                env::var("MEMBERSHIP_LOOKUP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5),
            ),
            membership_fail_open: env::var("MEMBERSHIP_FAIL_OPEN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            fold_code_case: env::var("CODE_FOLD_CASE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            poll_timeout_secs: env::var("POLL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            api_base_url: env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| "https://api.telegram.org".into()),
        })
    }

    /// The bare channel IDs, in configuration order.
    #[must_use]
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.mandatory_channels.iter().map(|c| c.id).collect()
    }

    /// Create a default configuration for testing.
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bot_token: "0000:test-token".into(),
            mandatory_channels: vec![
                ChannelSpec {
                    id: ChannelId(-1001234567890),
                    invite_url: Some("https://t.me/kinospeeds".into()),
                },
                ChannelSpec {
                    id: ChannelId(-1009876543210),
                    invite_url: None,
                },
            ],
            owner_ids: HashSet::from([UserId(1)]),
            admin_ids: HashSet::from([UserId(2)]),
            database_path: "kinogate-test.db".into(),
            membership_cache_ttl: Duration::from_secs(60),
            membership_lookup_timeout: Duration::from_secs(5),
            membership_fail_open: false,
            fold_code_case: false,
            poll_timeout_secs: 30,
            api_base_url: "https://api.telegram.org".into(),
        }
    }
}

/// Parse a comma-separated channel list. Each entry is either a bare
/// channel ID (`-1001234567890`) or an ID with a join link attached
/// (`-1001234567890=https://t.me/mychannel`).
fn parse_channel_list(raw: &str) -> Result<Vec<ChannelSpec>> {
    let mut channels = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (id_part, url_part) = match entry.split_once('=') {
            Some((id, url)) => (id, Some(url.trim().to_owned())),
            None => (entry, None),
        };
        let id: i64 = id_part
            .trim()
            .parse()
            .with_context(|| format!("invalid channel ID in MANDATORY_CHANNELS: {id_part:?}"))?;
        channels.push(ChannelSpec {
            id: ChannelId(id),
            invite_url: url_part.filter(|u| !u.is_empty()),
        });
    }
    Ok(channels)
}

/// Parse a comma-separated set of numeric user IDs; `None` and empty
/// strings yield the empty set.
fn parse_id_set(raw: Option<&str>) -> Result<HashSet<UserId>> {
    let mut ids = HashSet::new();
    let Some(raw) = raw else {
        return Ok(ids);
    };
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let id: i64 = entry
            .parse()
            .with_context(|| format!("invalid user ID: {entry:?}"))?;
        ids.insert(UserId(id));
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_parse_channel_list_bare_ids() {
        let channels = parse_channel_list("-1001234567890, -1009876543210").unwrap();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].id, ChannelId(-1001234567890));
        assert!(channels[0].invite_url.is_none());
    }

    #[test]
    fn test_parse_channel_list_with_invite_urls() {
        let channels =
            parse_channel_list("-100123=https://t.me/first,-100456").unwrap();
        assert_eq!(
            channels[0].invite_url.as_deref(),
            Some("https://t.me/first")
        );
        assert!(channels[1].invite_url.is_none());
    }

    #[test]
    fn test_parse_channel_list_rejects_garbage() {
        assert!(parse_channel_list("-100123,not-a-number").is_err());
    }

    #[test]
    fn test_parse_id_set() {
        let ids = parse_id_set(Some("1350513135, 42")).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&UserId(42)));

        assert!(parse_id_set(None).unwrap().is_empty());
        assert!(parse_id_set(Some("")).unwrap().is_empty());
        assert!(parse_id_set(Some("abc")).is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_round_trip() {
        env::set_var("BOT_TOKEN", "123:abc");
        env::set_var("MANDATORY_CHANNELS", "-100123=https://t.me/one,-100456");
        env::set_var("OWNER_IDS", "1");
        env::set_var("ADMIN_IDS", "2,3");
        env::set_var("MEMBERSHIP_CACHE_TTL_SECS", "120");
        env::set_var("CODE_FOLD_CASE", "true");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.mandatory_channels.len(), 2);
        assert_eq!(config.owner_ids, HashSet::from([UserId(1)]));
        assert_eq!(config.admin_ids, HashSet::from([UserId(2), UserId(3)]));
        assert_eq!(config.membership_cache_ttl, Duration::from_secs(120));
        assert!(config.fold_code_case);
        assert!(!config.membership_fail_open);

        for key in [
            "BOT_TOKEN",
            "MANDATORY_CHANNELS",
            "OWNER_IDS",
            "ADMIN_IDS",
            "MEMBERSHIP_CACHE_TTL_SECS",
            "CODE_FOLD_CASE",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_requires_token_and_channels() {
        env::remove_var("BOT_TOKEN");
        env::remove_var("MANDATORY_CHANNELS");
        assert!(Config::from_env().is_err());

        env::set_var("BOT_TOKEN", "123:abc");
        env::set_var("MANDATORY_CHANNELS", " ");
        assert!(Config::from_env().is_err());

        env::remove_var("BOT_TOKEN");
        env::remove_var("MANDATORY_CHANNELS");
    }
}
