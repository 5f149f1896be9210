//! Subscription Checker
//!
//! Aggregates per-channel membership verdicts into a single answer:
//! is this user currently subscribed to every mandatory channel?
//!
//! Lookups that cannot complete (transport failure, timeout) leave the
//! verdict unknown. Unknown is treated as not-a-member unless the
//! operator explicitly opted into fail-open, and is never cached, so a
//! flaky transport cannot pin a user out past the blip itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use kg_common::{ChannelId, UserId};
use tracing::warn;

use super::cache::MembershipCache;

/// The transport could not produce a verdict; membership is unknown.
///
/// Distinct from a definitive "not a member": probes return `Ok(false)`
/// for users the channel has no record of.
#[derive(Debug, thiserror::Error)]
#[error("membership lookup failed: {0}")]
pub struct TransientLookupError(#[from] pub anyhow::Error);

/// Asks the transport whether a user currently belongs to a channel.
#[async_trait]
pub trait MembershipProbe: Send + Sync {
    async fn is_member(
        &self,
        channel: ChannelId,
        user: UserId,
    ) -> Result<bool, TransientLookupError>;
}

/// Aggregate verdict over the mandatory channel set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionStatus {
    /// Every mandatory channel reports active membership.
    AllSatisfied,
    /// Channels the user has not joined, or whose verdict could not be
    /// obtained, in configuration order.
    Missing(Vec<ChannelId>),
}

/// Checks users against the mandatory channel set, cache first.
pub struct SubscriptionChecker {
    probe: Arc<dyn MembershipProbe>,
    channels: Vec<ChannelId>,
    cache: MembershipCache,
    lookup_timeout: Duration,
    fail_open: bool,
}

impl SubscriptionChecker {
    #[must_use]
    pub fn new(
        probe: Arc<dyn MembershipProbe>,
        channels: Vec<ChannelId>,
        cache_ttl: Duration,
        lookup_timeout: Duration,
        fail_open: bool,
    ) -> Self {
        Self {
            probe,
            channels,
            cache: MembershipCache::new(cache_ttl),
            lookup_timeout,
            fail_open,
        }
    }

    /// Check `user` against every mandatory channel concurrently.
    pub async fn is_subscribed(&self, user: UserId) -> SubscriptionStatus {
        let checks = self
            .channels
            .iter()
            .map(|&channel| self.channel_satisfied(user, channel));
        let verdicts = join_all(checks).await;

        let missing: Vec<ChannelId> = self
            .channels
            .iter()
            .zip(verdicts)
            .filter_map(|(&channel, satisfied)| (!satisfied).then_some(channel))
            .collect();

        if missing.is_empty() {
            SubscriptionStatus::AllSatisfied
        } else {
            SubscriptionStatus::Missing(missing)
        }
    }

    /// One channel's verdict. Definitive answers are cached; failures and
    /// timeouts resolve to the fail-open setting and are not.
    async fn channel_satisfied(&self, user: UserId, channel: ChannelId) -> bool {
        if let Some(cached) = self.cache.get(user, channel) {
            return cached;
        }

        let lookup = self.probe.is_member(channel, user);
        match tokio::time::timeout(self.lookup_timeout, lookup).await {
            Ok(Ok(is_member)) => {
                self.cache.put(user, channel, is_member);
                is_member
            }
            Ok(Err(e)) => {
                warn!(
                    %user,
                    %channel,
                    error = %e,
                    fail_open = self.fail_open,
                    "Membership lookup failed; verdict unknown"
                );
                self.fail_open
            }
            Err(_) => {
                warn!(
                    %user,
                    %channel,
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    fail_open = self.fail_open,
                    "Membership lookup timed out; verdict unknown"
                );
                self.fail_open
            }
        }
    }

    /// Drop cached verdicts for `user`, forcing re-probes on the next check.
    pub fn invalidate(&self, user: UserId) {
        for &channel in &self.channels {
            self.cache.invalidate(user, channel);
        }
    }

    /// Sweep expired cache entries.
    pub fn purge_expired(&self) {
        self.cache.purge_expired();
    }
}
