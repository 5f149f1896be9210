//! Update Poller
//!
//! Long-poll loop: fetch a batch of updates, advance the acknowledgement
//! offset, and handle each message in its own task. Consecutive poll
//! failures back off exponentially so an API outage never turns into a
//! tight error loop.

use std::sync::Arc;
use std::time::Duration;

use kg_common::UserId;
use tracing::{error, info, warn};

use super::client::BotClient;
use super::commands::{parse_message, Command};
use super::render::{render, Reply};
use super::types::Message;
use crate::access::AccessEngine;
use crate::authz::AuthorizationPolicy;
use crate::config::Config;

/// Drives the gateway from the Bot API update stream.
pub struct UpdatePoller {
    client: Arc<BotClient>,
    engine: Arc<AccessEngine>,
    policy: AuthorizationPolicy,
    config: Arc<Config>,
}

impl UpdatePoller {
    #[must_use]
    pub fn new(client: Arc<BotClient>, engine: Arc<AccessEngine>, config: Arc<Config>) -> Self {
        let policy = AuthorizationPolicy::new(
            config.owner_ids.clone(),
            config.admin_ids.clone(),
        );
        Self {
            client,
            engine,
            policy,
            config,
        }
    }

    /// Poll forever. Cancellation comes from the caller dropping this
    /// future (the shutdown path in `main`); updates not yet acknowledged
    /// are simply re-delivered on the next start.
    pub async fn run(&self) {
        info!("Update poller started");

        let mut offset: i64 = 0;
        let mut consecutive_errors: u32 = 0;

        loop {
            let updates = match self.client.get_updates(offset).await {
                Ok(updates) => {
                    consecutive_errors = 0;
                    updates
                }
                Err(e) => {
                    consecutive_errors += 1;
                    let backoff_secs = 1u64 << consecutive_errors.min(6); // 2, 4, 8, ... 64
                    if backoff_secs > 30 {
                        error!(
                            consecutive_errors,
                            backoff_secs,
                            "Persistent update fetch failure, backing off: {}",
                            e
                        );
                    } else {
                        error!("Failed to fetch updates: {}", e);
                    }
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);

                let Some(message) = update.message else {
                    continue;
                };
                let client = Arc::clone(&self.client);
                let engine = Arc::clone(&self.engine);
                let policy = self.policy.clone();
                let config = Arc::clone(&self.config);

                tokio::spawn(async move {
                    handle_message(&client, &engine, &policy, &config, message).await;
                });
            }
        }
    }
}

async fn handle_message(
    client: &BotClient,
    engine: &AccessEngine,
    policy: &AuthorizationPolicy,
    config: &Config,
    message: Message,
) {
    let Some(from) = message.from.as_ref() else {
        return;
    };
    let actor = UserId(from.id);
    let chat_id = message.chat.id;

    let action = match parse_message(&message, config.fold_code_case) {
        Command::Invoke(action) => action,
        Command::PrivilegedReply(text) => {
            if may_see_usage(policy, actor) {
                send_reply(client, chat_id, &Reply::Text {
                    text: text.to_string(),
                    markup: None,
                })
                .await;
            }
            return;
        }
        Command::Ignore => return,
    };

    let outcome = engine.handle(actor, action.clone()).await;
    if let Some(reply) = render(&action, &outcome, &config.mandatory_channels) {
        send_reply(client, chat_id, &reply).await;
    }
}

/// Usage feedback for privileged commands is itself privileged.
fn may_see_usage(policy: &AuthorizationPolicy, actor: UserId) -> bool {
    AuthorizationPolicy::can_mutate_store(policy.role_of(actor))
}

async fn send_reply(client: &BotClient, chat_id: i64, reply: &Reply) {
    let result = match reply {
        Reply::Text { text, markup } => client.send_message(chat_id, text, markup.as_ref()).await,
        Reply::Video { asset, caption } => client.send_video(chat_id, asset, caption).await,
    };

    if let Err(e) = result {
        warn!(chat_id, error = %e, "Failed to send reply");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_usage_feedback_is_gated_by_role() {
        let policy = AuthorizationPolicy::new(
            HashSet::from([UserId(1)]),
            HashSet::from([UserId(2)]),
        );

        assert!(may_see_usage(&policy, UserId(1)));
        assert!(may_see_usage(&policy, UserId(2)));
        assert!(!may_see_usage(&policy, UserId(100)));
    }
}
