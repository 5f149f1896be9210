//! Kinogate - Main Entry Point
//!
//! Telegram gateway that trades redemption codes for stored videos,
//! gated on mandatory channel membership.

use std::sync::Arc;

use anyhow::Result;
use kg_gateway::access::AccessEngine;
use kg_gateway::authz::AuthorizationPolicy;
use kg_gateway::config::Config;
use kg_gateway::membership::{MembershipProbe, SubscriptionChecker};
use kg_gateway::store::SqliteCodeStore;
use kg_gateway::telegram::{BotClient, UpdatePoller};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kg_gateway=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Arc::new(Config::from_env()?);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        channels = config.mandatory_channels.len(),
        "Starting Kinogate"
    );

    // Initialize database
    let store = Arc::new(SqliteCodeStore::connect(&config.database_path).await?);

    // The Bot API client doubles as the membership probe
    let client = Arc::new(BotClient::new(
        &config.api_base_url,
        &config.bot_token,
        config.poll_timeout_secs,
    )?);

    if config.membership_fail_open {
        warn!("MEMBERSHIP_FAIL_OPEN is set; unverifiable memberships count as satisfied");
    }

    let checker = Arc::new(SubscriptionChecker::new(
        Arc::clone(&client) as Arc<dyn MembershipProbe>,
        config.channel_ids(),
        config.membership_cache_ttl,
        config.membership_lookup_timeout,
        config.membership_fail_open,
    ));

    // Sweep expired membership verdicts so the cache does not grow with
    // one entry per user-channel pair forever.
    {
        let checker = Arc::clone(&checker);
        let sweep_every = config.membership_cache_ttl * 2;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(sweep_every).await;
                checker.purge_expired();
            }
        });
    }

    let policy = AuthorizationPolicy::new(config.owner_ids.clone(), config.admin_ids.clone());
    info!(
        privileged_users = policy.privileged_count(),
        "Authorization policy loaded"
    );

    let engine = Arc::new(AccessEngine::new(policy, checker, store));
    let poller = UpdatePoller::new(client, engine, Arc::clone(&config));

    // Graceful shutdown handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("Received shutdown signal, cleaning up...");
    };

    tokio::select! {
        () = poller.run() => {},
        () = shutdown_signal => {},
    }

    info!("Gateway shutdown complete");

    Ok(())
}
