//! Engine Protocol
//!
//! The seam between the transport layer and the access engine: parsed
//! inbound actions, and the terminal outcome of handling one of them.

use serde::{Deserialize, Serialize};

use crate::types::{AssetRef, ChannelId, Code, CodeMapping};

/// An inbound user action, already parsed by the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// `/start`: verify channel membership and prompt for a code.
    Start,
    /// A plain-text redemption attempt.
    RedeemCode(Code),
    /// `/upload`: register a new code-to-asset mapping.
    Upload {
        /// Token the asset will be redeemable under.
        code: Code,
        /// Caption shown alongside the delivered video.
        title: String,
        /// The asset being registered.
        asset: AssetRef,
    },
    /// `/delete`: remove an existing mapping.
    Delete(Code),
}

/// Terminal result of one request through the access engine.
///
/// Denials are expected control results, not failures; the transport
/// layer decides how (or whether) each variant is rendered to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// Membership verified; the user may submit a code.
    Verified,
    /// Redemption granted; deliver the mapped asset.
    Granted(CodeMapping),
    /// The user has not joined every mandatory channel, or membership
    /// could not be verified; carries the channels still required.
    DeniedNotSubscribed(Vec<ChannelId>),
    /// No live mapping exists for the submitted code.
    DeniedInvalidCode,
    /// The actor may not mutate the code table.
    DeniedUnauthorized,
    /// Mutation applied.
    Ok,
    /// Upload rejected: the code is already registered.
    Conflict,
    /// Delete targeted a code with no live mapping.
    NotFound,
    /// The backing store could not serve the request; retryable.
    StorageUnavailable,
}
