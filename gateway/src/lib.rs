//! Kinogate Gateway
//!
//! Telegram bot that gates a library of videos behind two checks:
//! membership in a configured set of channels, and possession of a short
//! redemption code registered by an owner or admin.

pub mod access;
pub mod authz;
pub mod config;
pub mod membership;
pub mod store;
pub mod telegram;
