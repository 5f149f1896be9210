//! Telegram Transport
//!
//! Everything that touches the Bot API lives here: wire types, the HTTP
//! client, inbound message parsing, outcome rendering, and the long-poll
//! loop that drives them.

pub mod client;
pub mod commands;
pub mod error;
pub mod poller;
pub mod render;
pub mod types;

pub use client::BotClient;
pub use error::TelegramError;
pub use poller::UpdatePoller;
