//! Access Engine
//!
//! The single decision point between inbound actions and outcomes. The
//! ordering here is the whole security model: membership is verified
//! before the store is consulted, and authorization is verified before
//! the store is written. Every request is judged from scratch; nothing a
//! user earned on a previous message carries over.

use std::sync::Arc;

use chrono::Utc;
use kg_common::{Action, Code, CodeMapping, Outcome, UserId};
use tracing::{error, info, warn};

use crate::authz::AuthorizationPolicy;
use crate::membership::{SubscriptionChecker, SubscriptionStatus};
use crate::store::{CodeStore, StoreError};

/// Routes each parsed action through the gating rules to its outcome.
pub struct AccessEngine {
    policy: AuthorizationPolicy,
    checker: Arc<SubscriptionChecker>,
    store: Arc<dyn CodeStore>,
}

impl AccessEngine {
    #[must_use]
    pub fn new(
        policy: AuthorizationPolicy,
        checker: Arc<SubscriptionChecker>,
        store: Arc<dyn CodeStore>,
    ) -> Self {
        Self {
            policy,
            checker,
            store,
        }
    }

    /// Resolve one action to its terminal outcome. Never fails; store
    /// breakage surfaces as [`Outcome::StorageUnavailable`].
    #[tracing::instrument(skip(self, action), fields(%actor))]
    pub async fn handle(&self, actor: UserId, action: Action) -> Outcome {
        match action {
            Action::Start => self.verify(actor).await,
            Action::RedeemCode(code) => self.redeem(actor, code).await,
            Action::Upload { code, title, asset } => {
                let mapping = CodeMapping {
                    code,
                    title,
                    asset_ref: asset,
                    created_by: actor,
                    created_at: Utc::now(),
                };
                self.upload(actor, mapping).await
            }
            Action::Delete(code) => self.delete(actor, code).await,
        }
    }

    async fn verify(&self, actor: UserId) -> Outcome {
        match self.checker.is_subscribed(actor).await {
            SubscriptionStatus::AllSatisfied => Outcome::Verified,
            SubscriptionStatus::Missing(channels) => Outcome::DeniedNotSubscribed(channels),
        }
    }

    /// Membership gates the store lookup, not just the delivery: an
    /// unsubscribed user learns nothing about which codes exist.
    async fn redeem(&self, actor: UserId, code: Code) -> Outcome {
        if let SubscriptionStatus::Missing(channels) = self.checker.is_subscribed(actor).await {
            return Outcome::DeniedNotSubscribed(channels);
        }

        match self.store.lookup(&code).await {
            Ok(Some(mapping)) => {
                info!(%actor, code = %mapping.code, "Code redeemed");
                Outcome::Granted(mapping)
            }
            Ok(None) => Outcome::DeniedInvalidCode,
            Err(e) => storage_failure(&e),
        }
    }

    async fn upload(&self, actor: UserId, mapping: CodeMapping) -> Outcome {
        let role = self.policy.role_of(actor);
        if !AuthorizationPolicy::can_mutate_store(role) {
            warn!(%actor, ?role, "Unauthorized upload attempt");
            return Outcome::DeniedUnauthorized;
        }

        match self.store.insert(&mapping).await {
            Ok(true) => {
                info!(%actor, code = %mapping.code, "Code registered");
                Outcome::Ok
            }
            Ok(false) => Outcome::Conflict,
            Err(e) => storage_failure(&e),
        }
    }

    async fn delete(&self, actor: UserId, code: Code) -> Outcome {
        let role = self.policy.role_of(actor);
        if !AuthorizationPolicy::can_mutate_store(role) {
            warn!(%actor, ?role, "Unauthorized delete attempt");
            return Outcome::DeniedUnauthorized;
        }

        match self.store.remove(&code).await {
            Ok(true) => {
                info!(%actor, %code, "Code removed");
                Outcome::Ok
            }
            Ok(false) => Outcome::NotFound,
            Err(e) => storage_failure(&e),
        }
    }
}

fn storage_failure(e: &StoreError) -> Outcome {
    error!(error = %e, "Store unavailable; request fails closed");
    Outcome::StorageUnavailable
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use kg_common::{AssetRef, ChannelId};

    use super::*;
    use crate::membership::{MembershipProbe, TransientLookupError};
    use crate::store::MemoryCodeStore;

    const OWNER: UserId = UserId(1);
    const ADMIN: UserId = UserId(2);
    const VIEWER: UserId = UserId(100);
    const OUTSIDER: UserId = UserId(200);
    const CH_A: ChannelId = ChannelId(-1001);
    const CH_B: ChannelId = ChannelId(-1002);

    /// Probe over a fixed membership table.
    struct TableProbe {
        members: HashSet<(ChannelId, UserId)>,
    }

    #[async_trait]
    impl MembershipProbe for TableProbe {
        async fn is_member(
            &self,
            channel: ChannelId,
            user: UserId,
        ) -> Result<bool, TransientLookupError> {
            Ok(self.members.contains(&(channel, user)))
        }
    }

    /// Store wrapper that counts how often each operation is reached.
    struct CountingStore {
        inner: MemoryCodeStore,
        lookups: AtomicUsize,
        inserts: AtomicUsize,
        removes: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: MemoryCodeStore::new(),
                lookups: AtomicUsize::new(0),
                inserts: AtomicUsize::new(0),
                removes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl CodeStore for CountingStore {
        async fn lookup(&self, code: &Code) -> Result<Option<CodeMapping>, StoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.lookup(code).await
        }

        async fn insert(&self, mapping: &CodeMapping) -> Result<bool, StoreError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            self.inner.insert(mapping).await
        }

        async fn remove(&self, code: &Code) -> Result<bool, StoreError> {
            self.removes.fetch_add(1, Ordering::SeqCst);
            self.inner.remove(code).await
        }
    }

    /// Store whose backing database is gone.
    struct BrokenStore;

    #[async_trait]
    impl CodeStore for BrokenStore {
        async fn lookup(&self, _code: &Code) -> Result<Option<CodeMapping>, StoreError> {
            Err(StoreError::from(sqlx::Error::PoolClosed))
        }

        async fn insert(&self, _mapping: &CodeMapping) -> Result<bool, StoreError> {
            Err(StoreError::from(sqlx::Error::PoolClosed))
        }

        async fn remove(&self, _code: &Code) -> Result<bool, StoreError> {
            Err(StoreError::from(sqlx::Error::PoolClosed))
        }
    }

    /// Members of every mandatory channel: OWNER and VIEWER. ADMIN is
    /// deliberately outside the channels; mutations do not require
    /// membership. OUTSIDER joined only CH_A.
    fn engine_with(store: Arc<dyn CodeStore>) -> AccessEngine {
        let probe = Arc::new(TableProbe {
            members: HashSet::from([
                (CH_A, OWNER),
                (CH_B, OWNER),
                (CH_A, VIEWER),
                (CH_B, VIEWER),
                (CH_A, OUTSIDER),
            ]),
        });
        let checker = Arc::new(SubscriptionChecker::new(
            probe,
            vec![CH_A, CH_B],
            Duration::from_secs(60),
            Duration::from_secs(5),
            false,
        ));
        let policy = AuthorizationPolicy::new(
            HashSet::from([OWNER]),
            HashSet::from([ADMIN]),
        );
        AccessEngine::new(policy, checker, store)
    }

    fn upload(code: &str, asset: &str) -> Action {
        Action::Upload {
            code: Code::from(code),
            title: String::from("Episode 7"),
            asset: AssetRef::from(asset),
        }
    }

    #[tokio::test]
    async fn start_verifies_subscriber() {
        let engine = engine_with(CountingStore::new());

        assert_eq!(engine.handle(VIEWER, Action::Start).await, Outcome::Verified);
    }

    #[tokio::test]
    async fn start_lists_only_missing_channels() {
        let engine = engine_with(CountingStore::new());

        assert_eq!(
            engine.handle(OUTSIDER, Action::Start).await,
            Outcome::DeniedNotSubscribed(vec![CH_B])
        );
    }

    #[tokio::test]
    async fn subscriber_redeems_registered_code() {
        let engine = engine_with(CountingStore::new());
        engine.handle(OWNER, upload("X7", "file-abc")).await;

        let outcome = engine
            .handle(VIEWER, Action::RedeemCode(Code::from("X7")))
            .await;
        match outcome {
            Outcome::Granted(mapping) => {
                assert_eq!(mapping.asset_ref, AssetRef::from("file-abc"));
                assert_eq!(mapping.created_by, OWNER);
            }
            other => panic!("expected Granted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_code_is_denied() {
        let engine = engine_with(CountingStore::new());

        assert_eq!(
            engine
                .handle(VIEWER, Action::RedeemCode(Code::from("NOPE")))
                .await,
            Outcome::DeniedInvalidCode
        );
    }

    #[tokio::test]
    async fn redemption_requires_membership_even_for_admins() {
        let engine = engine_with(CountingStore::new());

        // Mutation rights do not exempt anyone from the channel gate.
        assert_eq!(
            engine
                .handle(ADMIN, Action::RedeemCode(Code::from("X7")))
                .await,
            Outcome::DeniedNotSubscribed(vec![CH_A, CH_B])
        );
    }

    #[tokio::test]
    async fn unsubscribed_redeem_never_reaches_store() {
        let store = CountingStore::new();
        let engine = engine_with(Arc::clone(&store) as Arc<dyn CodeStore>);
        engine.handle(OWNER, upload("X7", "file-abc")).await;

        let outcome = engine
            .handle(OUTSIDER, Action::RedeemCode(Code::from("X7")))
            .await;

        // Denied the same way whether or not the code exists, and without
        // the lookup that would tell us.
        assert_eq!(outcome, Outcome::DeniedNotSubscribed(vec![CH_B]));
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn regular_user_upload_has_no_side_effects() {
        let store = CountingStore::new();
        let engine = engine_with(Arc::clone(&store) as Arc<dyn CodeStore>);

        let outcome = engine.handle(VIEWER, upload("X7", "file-abc")).await;

        assert_eq!(outcome, Outcome::DeniedUnauthorized);
        assert_eq!(store.inserts.load(Ordering::SeqCst), 0);
        assert_eq!(
            engine
                .handle(VIEWER, Action::RedeemCode(Code::from("X7")))
                .await,
            Outcome::DeniedInvalidCode
        );
    }

    #[tokio::test]
    async fn regular_user_delete_has_no_side_effects() {
        let store = CountingStore::new();
        let engine = engine_with(Arc::clone(&store) as Arc<dyn CodeStore>);
        engine.handle(OWNER, upload("X7", "file-abc")).await;

        let outcome = engine
            .handle(VIEWER, Action::Delete(Code::from("X7")))
            .await;

        assert_eq!(outcome, Outcome::DeniedUnauthorized);
        assert_eq!(store.removes.load(Ordering::SeqCst), 0);
        assert!(matches!(
            engine
                .handle(VIEWER, Action::RedeemCode(Code::from("X7")))
                .await,
            Outcome::Granted(_)
        ));
    }

    #[tokio::test]
    async fn admin_mutates_without_channel_membership() {
        let engine = engine_with(CountingStore::new());

        assert_eq!(engine.handle(ADMIN, upload("X7", "file-abc")).await, Outcome::Ok);
        assert_eq!(
            engine.handle(ADMIN, Action::Delete(Code::from("X7"))).await,
            Outcome::Ok
        );
    }

    #[tokio::test]
    async fn upload_conflict_keeps_original_mapping() {
        let engine = engine_with(CountingStore::new());
        engine.handle(OWNER, upload("X7", "file-first")).await;

        assert_eq!(
            engine.handle(ADMIN, upload("X7", "file-second")).await,
            Outcome::Conflict
        );

        match engine
            .handle(VIEWER, Action::RedeemCode(Code::from("X7")))
            .await
        {
            Outcome::Granted(mapping) => {
                assert_eq!(mapping.asset_ref, AssetRef::from("file-first"));
            }
            other => panic!("expected Granted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_frees_code_for_reregistration() {
        let engine = engine_with(CountingStore::new());
        engine.handle(OWNER, upload("X7", "file-old")).await;

        assert_eq!(
            engine.handle(OWNER, Action::Delete(Code::from("X7"))).await,
            Outcome::Ok
        );
        assert_eq!(
            engine
                .handle(VIEWER, Action::RedeemCode(Code::from("X7")))
                .await,
            Outcome::DeniedInvalidCode
        );

        // Redeeming after re-registration yields the new asset, never the
        // deleted one.
        engine.handle(OWNER, upload("X7", "file-new")).await;
        match engine
            .handle(VIEWER, Action::RedeemCode(Code::from("X7")))
            .await
        {
            Outcome::Granted(mapping) => {
                assert_eq!(mapping.asset_ref, AssetRef::from("file-new"));
            }
            other => panic!("expected Granted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_of_unknown_code_reports_not_found() {
        let engine = engine_with(CountingStore::new());

        assert_eq!(
            engine.handle(OWNER, Action::Delete(Code::from("GHOST"))).await,
            Outcome::NotFound
        );
    }

    #[tokio::test]
    async fn store_failure_fails_closed() {
        let engine = engine_with(Arc::new(BrokenStore));

        assert_eq!(
            engine
                .handle(VIEWER, Action::RedeemCode(Code::from("X7")))
                .await,
            Outcome::StorageUnavailable
        );
        assert_eq!(
            engine.handle(OWNER, upload("X7", "file-abc")).await,
            Outcome::StorageUnavailable
        );
        assert_eq!(
            engine.handle(OWNER, Action::Delete(Code::from("X7"))).await,
            Outcome::StorageUnavailable
        );
    }

    #[tokio::test]
    async fn unauthorized_is_decided_before_store_is_touched() {
        let engine = engine_with(Arc::new(BrokenStore));

        // Authorization is decided before the store is touched, so the
        // outcome is DeniedUnauthorized rather than StorageUnavailable.
        assert_eq!(
            engine.handle(VIEWER, upload("X7", "file-abc")).await,
            Outcome::DeniedUnauthorized
        );
    }
}
