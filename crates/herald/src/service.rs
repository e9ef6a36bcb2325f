//! The Herald service: a ledger behind one async lock, with a journal.
//!
//! Operations are serialized through the lock, so the ledger sees a single
//! total order. Each operation is staged, its events are appended to the
//! store's journal, and only then is it committed. A journal failure aborts
//! the staged operation, so the ledger and the journal never disagree.

use std::sync::Arc;

use bytes::Bytes;
use herald_core::{
    Address, Amount, Channel, ChannelGroup, ChannelType, Event, Height, Membership, PublicKey,
    User,
};
use herald_ledger::{Capabilities, FeeLedger, Ledger, LedgerState, Operation, PoolLedger};
use herald_store::{JournalEntry, Snapshot, Store};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::HeraldConfig;
use crate::error::Result;

struct Inner {
    ledger: Ledger,
    /// Operations committed since the last snapshot.
    since_snapshot: u64,
}

/// The main Herald struct.
///
/// Provides a unified API for:
/// - Creating, updating and deactivating channels
/// - Subscribing and unsubscribing, directly or delegated
/// - Registering public keys
/// - Querying records, counters and fair shares
/// - Reading the event journal
pub struct Herald<S: Store> {
    inner: Mutex<Inner>,
    store: Arc<S>,
    config: HeraldConfig,
}

impl<S: Store> Herald<S> {
    /// Open a Herald service over `store`.
    ///
    /// Resumes from the latest snapshot if the store has one. Otherwise runs
    /// genesis at height `at`, journals its events and saves a first snapshot.
    pub async fn open(
        store: Arc<S>,
        caps: Capabilities,
        config: HeraldConfig,
        at: Height,
    ) -> Result<Self> {
        config.validate()?;

        let ledger = match store.latest_snapshot().await? {
            Some(snapshot) => {
                info!(height = snapshot.height, "restoring ledger from snapshot");
                Ledger::restore(config.ledger.clone(), caps, snapshot.state)
            }
            None => {
                let (ledger, events) = Ledger::genesis(config.ledger.clone(), caps, at)?;
                store.append_events(at, &events).await?;
                store
                    .save_snapshot(&Snapshot {
                        height: at,
                        state: ledger.state().clone(),
                    })
                    .await?;
                ledger
            }
        };

        Ok(Self {
            inner: Mutex::new(Inner {
                ledger,
                since_snapshot: 0,
            }),
            store,
            config,
        })
    }

    pub fn config(&self) -> &HeraldConfig {
        &self.config
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Channel Operations
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn create_channel(
        &self,
        owner: Address,
        channel_type: ChannelType,
        metadata: impl Into<Bytes>,
        contribution: Amount,
        at: Height,
    ) -> Result<Vec<Event>> {
        let op = Operation::CreateChannel {
            owner,
            channel_type,
            metadata: metadata.into(),
            contribution,
        };
        self.apply(op, at).await
    }

    pub async fn create_channel_with_public_key(
        &self,
        owner: Address,
        public_key: PublicKey,
        channel_type: ChannelType,
        metadata: impl Into<Bytes>,
        contribution: Amount,
        at: Height,
    ) -> Result<Vec<Event>> {
        let op = Operation::CreateChannelWithPublicKey {
            owner,
            public_key,
            channel_type,
            metadata: metadata.into(),
            contribution,
        };
        self.apply(op, at).await
    }

    pub async fn create_promoter_channel(&self, payer: Address, at: Height) -> Result<Vec<Event>> {
        self.apply(Operation::CreatePromoterChannel { payer }, at)
            .await
    }

    pub async fn deactivate_channel(&self, caller: Address, at: Height) -> Result<Vec<Event>> {
        self.apply(Operation::DeactivateChannel { caller }, at)
            .await
    }

    pub async fn update_metadata(
        &self,
        caller: Address,
        metadata: impl Into<Bytes>,
        at: Height,
    ) -> Result<Vec<Event>> {
        let op = Operation::UpdateMetadata {
            caller,
            metadata: metadata.into(),
        };
        self.apply(op, at).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Membership Operations
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn subscribe(
        &self,
        channel: Address,
        subscriber: Address,
        at: Height,
    ) -> Result<Vec<Event>> {
        self.apply(Operation::Subscribe { channel, subscriber }, at)
            .await
    }

    pub async fn subscribe_with_public_key(
        &self,
        channel: Address,
        subscriber: Address,
        public_key: PublicKey,
        at: Height,
    ) -> Result<Vec<Event>> {
        let op = Operation::SubscribeWithPublicKey {
            channel,
            subscriber,
            public_key,
        };
        self.apply(op, at).await
    }

    pub async fn subscribe_delegated(
        &self,
        caller: Address,
        subscriber: Address,
        at: Height,
    ) -> Result<Vec<Event>> {
        self.apply(Operation::SubscribeDelegated { caller, subscriber }, at)
            .await
    }

    pub async fn subscribe_with_public_key_delegated(
        &self,
        caller: Address,
        subscriber: Address,
        public_key: PublicKey,
        at: Height,
    ) -> Result<Vec<Event>> {
        let op = Operation::SubscribeWithPublicKeyDelegated {
            caller,
            subscriber,
            public_key,
        };
        self.apply(op, at).await
    }

    pub async fn unsubscribe(
        &self,
        channel: Address,
        subscriber: Address,
        at: Height,
    ) -> Result<Vec<Event>> {
        self.apply(Operation::Unsubscribe { channel, subscriber }, at)
            .await
    }

    pub async fn broadcast_public_key(
        &self,
        address: Address,
        public_key: PublicKey,
        at: Height,
    ) -> Result<Vec<Event>> {
        self.apply(Operation::BroadcastPublicKey { address, public_key }, at)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Run a read-only closure against the ledger.
    pub async fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        let inner = self.inner.lock().await;
        f(&inner.ledger)
    }

    pub async fn channel(&self, owner: &Address) -> Option<Channel> {
        self.read(|ledger| ledger.channel(owner).cloned()).await
    }

    pub async fn user(&self, address: &Address) -> Option<User> {
        self.read(|ledger| ledger.user(address).cloned()).await
    }

    pub async fn membership(&self, channel: Address, subscriber: Address) -> Membership {
        self.read(|ledger| ledger.membership(channel, subscriber))
            .await
    }

    pub async fn member_exists(&self, subscriber: Address, channel: Address) -> bool {
        self.read(|ledger| ledger.member_exists(subscriber, channel))
            .await
    }

    pub async fn is_graylisted(&self, subscriber: Address, channel: Address) -> bool {
        self.read(|ledger| ledger.is_graylisted(subscriber, channel))
            .await
    }

    pub async fn users_count(&self) -> usize {
        self.read(Ledger::users_count).await
    }

    pub async fn channels_count(&self) -> usize {
        self.read(Ledger::channels_count).await
    }

    pub async fn channel_at(&self, index: usize) -> Option<Channel> {
        self.read(|ledger| ledger.channel_at(index).cloned()).await
    }

    pub async fn user_at(&self, index: usize) -> Option<(Address, User)> {
        self.read(|ledger| {
            ledger
                .user_at(index)
                .map(|(address, user)| (*address, user.clone()))
        })
        .await
    }

    pub async fn pool(&self) -> PoolLedger {
        self.read(|ledger| *ledger.pool()).await
    }

    pub async fn fees(&self) -> FeeLedger {
        self.read(|ledger| *ledger.fees()).await
    }

    pub async fn channel_group(&self) -> ChannelGroup {
        self.read(|ledger| *ledger.channel_group()).await
    }

    pub async fn last_height(&self) -> Height {
        self.read(Ledger::last_height).await
    }

    pub async fn channel_fair_share(&self, owner: &Address, at: Height) -> Result<u128> {
        Ok(self
            .read(|ledger| ledger.channel_fair_share(owner, at))
            .await?)
    }

    pub async fn subscriber_fair_share(
        &self,
        channel: &Address,
        subscriber: &Address,
        at: Height,
    ) -> Result<u128> {
        Ok(self
            .read(|ledger| ledger.subscriber_fair_share(channel, subscriber, at))
            .await?)
    }

    /// A copy of the committed ledger state.
    pub async fn state(&self) -> LedgerState {
        self.read(|ledger| ledger.state().clone()).await
    }

    /// Journal entries with `seq > after`.
    pub async fn events_since(&self, after: u64) -> Result<Vec<JournalEntry>> {
        Ok(self.store.events_since(after).await?)
    }

    /// Save a snapshot of the current state now.
    pub async fn snapshot(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.save_snapshot(&mut inner).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────────

    /// Stage `op`, journal its events, then commit it.
    ///
    /// If the journal append fails the staged operation is aborted and the
    /// ledger is left as it was. A failed snapshot after the commit is only
    /// logged and retried after the next operation.
    async fn apply(&self, op: Operation, at: Height) -> Result<Vec<Event>> {
        let mut inner = self.inner.lock().await;
        let staged = inner.ledger.prepare(op, at)?;

        let head = match self.store.append_events(at, staged.events()).await {
            Ok(head) => head,
            Err(e) => {
                inner.ledger.abort(staged);
                return Err(e.into());
            }
        };
        let events = inner.ledger.commit(staged)?;
        debug!(at, events = events.len(), head, "events journaled");

        inner.since_snapshot += 1;
        if inner.since_snapshot >= self.config.snapshot_interval {
            if let Err(e) = self.save_snapshot(&mut inner).await {
                warn!(at, error = %e, "snapshot failed");
            }
        }
        Ok(events)
    }

    async fn save_snapshot(&self, inner: &mut Inner) -> Result<()> {
        let snapshot = Snapshot {
            height: inner.ledger.last_height(),
            state: inner.ledger.state().clone(),
        };
        self.store.save_snapshot(&snapshot).await?;
        inner.since_snapshot = 0;
        debug!(height = snapshot.height, "snapshot saved");
        Ok(())
    }
}
