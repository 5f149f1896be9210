//! Membership Verdict Cache
//!
//! Process-local TTL cache of membership verdicts keyed by
//! `(user, channel)`. Both positive and negative verdicts are cached so a
//! user hammering the bot does not translate into a membership query per
//! message. Unknown verdicts (lookup failures) are never stored.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use kg_common::{ChannelId, UserId};

#[derive(Debug, Clone, Copy)]
struct MembershipRecord {
    is_member: bool,
    checked_at: Instant,
}

impl MembershipRecord {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.checked_at.elapsed() < ttl
    }
}

/// TTL cache of per-`(user, channel)` membership verdicts.
///
/// Entries expire lazily on read; [`purge_expired`](Self::purge_expired)
/// sweeps the rest so the map does not grow unbounded.
#[derive(Debug)]
pub struct MembershipCache {
    entries: DashMap<(UserId, ChannelId), MembershipRecord>,
    ttl: Duration,
}

impl MembershipCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Fresh verdict for the pair, if one is cached.
    pub fn get(&self, user: UserId, channel: ChannelId) -> Option<bool> {
        let key = (user, channel);
        let hit = self
            .entries
            .get(&key)
            .map(|record| (record.is_member, record.is_fresh(self.ttl)));
        match hit {
            Some((is_member, true)) => Some(is_member),
            Some((_, false)) => {
                // Another task may have refreshed the entry since we looked;
                // only evict if it is still stale.
                self.entries
                    .remove_if(&key, |_, record| !record.is_fresh(self.ttl));
                None
            }
            None => None,
        }
    }

    /// Record a definitive verdict for the pair.
    pub fn put(&self, user: UserId, channel: ChannelId, is_member: bool) {
        self.entries.insert(
            (user, channel),
            MembershipRecord {
                is_member,
                checked_at: Instant::now(),
            },
        );
    }

    /// Drop the cached verdict for the pair, forcing a re-probe.
    pub fn invalidate(&self, user: UserId, channel: ChannelId) {
        self.entries.remove(&(user, channel));
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        self.entries.retain(|_, record| record.is_fresh(self.ttl));
    }
}
