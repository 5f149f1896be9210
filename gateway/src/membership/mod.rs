//! Membership verification against the mandatory channel set.
//!
//! A user may redeem codes only while they are a member of every
//! configured channel. Verdicts come from the transport's membership API
//! through the [`MembershipProbe`] seam and are cached briefly per
//! `(user, channel)` pair.

pub mod cache;
pub mod checker;

pub use cache::MembershipCache;
pub use checker::{
    MembershipProbe, SubscriptionChecker, SubscriptionStatus, TransientLookupError,
};
