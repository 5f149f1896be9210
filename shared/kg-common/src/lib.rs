//! Kinogate Common Library
//!
//! Domain types and the engine protocol shared across the workspace.

pub mod protocol;
pub mod types;

pub use protocol::{Action, Outcome};
pub use types::*;
