//! Core domain types.

pub mod channel;
pub mod code;
pub mod user;

pub use channel::ChannelId;
pub use code::{AssetRef, Code, CodeMapping};
pub use user::{Role, UserId};
