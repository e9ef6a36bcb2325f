//! Service-level behavior: journaling, snapshots, reopening.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use herald::ledger::capabilities::memory::{MemoryAllowList, MemoryToken, MemoryVault};
use herald::ledger::config::TOKEN;
use herald::ledger::{AssetLedger, Capabilities, DerivedKeyVerifier, LedgerError};
use herald::store::{JournalEntry, MemoryStore, Snapshot, Store, StoreError};
use herald::{Address, ChannelType, Event, Height, Herald, HeraldConfig, HeraldError};

struct World {
    allow: Arc<MemoryAllowList>,
    token: Arc<MemoryToken>,
    caps: Capabilities,
}

fn world() -> World {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let allow = Arc::new(MemoryAllowList::new());
    let token = Arc::new(MemoryToken::new());
    let caps = Capabilities {
        allow_list: allow.clone(),
        assets: token.clone(),
        vault: Arc::new(MemoryVault::new(token.clone())),
        keys: Arc::new(DerivedKeyVerifier),
    };
    World { allow, token, caps }
}

fn addr(b: u8) -> Address {
    Address::from_bytes([b; 20])
}

/// A memory store whose writes can be switched off.
#[derive(Default)]
struct FailingStore {
    inner: MemoryStore,
    fail_appends: AtomicBool,
    fail_snapshots: AtomicBool,
}

#[async_trait]
impl Store for FailingStore {
    async fn append_events(&self, height: Height, events: &[Event]) -> herald::store::Result<u64> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidData("disk full".into()));
        }
        self.inner.append_events(height, events).await
    }

    async fn events_since(&self, after: u64) -> herald::store::Result<Vec<JournalEntry>> {
        self.inner.events_since(after).await
    }

    async fn event_count(&self) -> herald::store::Result<u64> {
        self.inner.event_count().await
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> herald::store::Result<()> {
        if self.fail_snapshots.load(Ordering::SeqCst) {
            return Err(StoreError::InvalidData("disk full".into()));
        }
        self.inner.save_snapshot(snapshot).await
    }

    async fn latest_snapshot(&self) -> herald::store::Result<Option<Snapshot>> {
        self.inner.latest_snapshot().await
    }
}

#[tokio::test]
async fn test_open_runs_genesis_once() -> anyhow::Result<()> {
    let w = world();
    let store = Arc::new(MemoryStore::new());

    let herald = Herald::open(store.clone(), w.caps.clone(), HeraldConfig::default(), 0).await?;
    assert_eq!(herald.channels_count().await, 2);
    assert_eq!(herald.users_count().await, 2);
    assert_eq!(store.event_count().await?, 5);
    assert_eq!(store.snapshot_count(), 1);
    drop(herald);

    let reopened = Herald::open(store.clone(), w.caps, HeraldConfig::default(), 0).await?;
    assert_eq!(reopened.channels_count().await, 2);
    assert_eq!(store.event_count().await?, 5);
    Ok(())
}

#[tokio::test]
async fn test_operations_are_journaled() -> anyhow::Result<()> {
    let w = world();
    let store = Arc::new(MemoryStore::new());
    let herald = Herald::open(store.clone(), w.caps.clone(), HeraldConfig::default(), 0).await?;

    let alice = addr(0xA1);
    let bob = addr(0xB0);
    w.allow.allow(alice);
    w.token.mint(alice, 50 * TOKEN);

    herald
        .create_channel(alice, ChannelType::InterestBearing, "alice", 50 * TOKEN, 10)
        .await?;
    herald.subscribe(alice, bob, 11).await?;

    let entries = herald.events_since(5).await?;
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].seq, 6);
    assert_eq!(entries[0].height, 10);
    assert_eq!(
        entries[3].event,
        Event::Subscribed {
            channel: alice,
            subscriber: bob
        }
    );
    assert_eq!(entries[3].height, 11);
    Ok(())
}

#[tokio::test]
async fn test_rejection_journals_nothing() -> anyhow::Result<()> {
    let w = world();
    let store = Arc::new(MemoryStore::new());
    let herald = Herald::open(store.clone(), w.caps, HeraldConfig::default(), 0).await?;

    let err = herald.subscribe(addr(0xA1), addr(0xB0), 1).await.unwrap_err();
    assert_eq!(
        err.as_ledger(),
        Some(&LedgerError::ChannelInactive(addr(0xA1)))
    );
    assert_eq!(store.event_count().await?, 5);
    assert_eq!(store.snapshot_count(), 1);
    assert_eq!(herald.last_height().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_snapshot_interval() -> anyhow::Result<()> {
    let w = world();
    let store = Arc::new(MemoryStore::new());
    let config = HeraldConfig {
        snapshot_interval: 2,
        ..HeraldConfig::default()
    };
    let herald = Herald::open(store.clone(), w.caps.clone(), config.clone(), 0).await?;

    let alice = addr(0xA1);
    w.allow.allow(alice);
    w.token.mint(alice, 50 * TOKEN);
    herald
        .create_channel(alice, ChannelType::InterestBearing, "a", 50 * TOKEN, 1)
        .await?;
    assert_eq!(store.latest_snapshot().await?.map(|s| s.height), Some(0));

    herald.subscribe(alice, addr(0xB0), 2).await?;
    assert_eq!(store.latest_snapshot().await?.map(|s| s.height), Some(2));

    herald.subscribe(alice, addr(0xB1), 3).await?;
    herald.snapshot().await?;
    assert_eq!(store.latest_snapshot().await?.map(|s| s.height), Some(3));
    assert_eq!(store.snapshot_count(), 1);

    drop(herald);
    let reopened = Herald::open(store, w.caps, config, 0).await?;
    assert_eq!(reopened.users_count().await, 5);
    assert_eq!(reopened.last_height().await, 3);
    assert_eq!(reopened.channel(&alice).await.map(|c| c.member_count), Some(3));
    Ok(())
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let w = world();
    let config = HeraldConfig {
        snapshot_interval: 0,
        ..HeraldConfig::default()
    };
    let result = Herald::open(Arc::new(MemoryStore::new()), w.caps, config, 0).await;
    assert!(matches!(result, Err(HeraldError::Config(_))));
}

#[tokio::test]
async fn test_journal_failure_commits_nothing() -> anyhow::Result<()> {
    let w = world();
    let store = Arc::new(FailingStore::default());
    let config = HeraldConfig::default();
    let admin = config.ledger.admin;
    let herald = Herald::open(store.clone(), w.caps, config, 0).await?;
    let bob = addr(0xB0);

    store.fail_appends.store(true, Ordering::SeqCst);
    let err = herald.subscribe(admin, bob, 1).await.unwrap_err();
    assert!(matches!(err, HeraldError::Store(_)));
    assert!(!herald.member_exists(bob, admin).await);
    assert_eq!(herald.users_count().await, 2);
    assert_eq!(herald.last_height().await, 0);
    assert_eq!(store.event_count().await?, 5);

    store.fail_appends.store(false, Ordering::SeqCst);
    herald.subscribe(admin, bob, 1).await?;
    assert!(herald.member_exists(bob, admin).await);

    let subscribed = Event::Subscribed {
        channel: admin,
        subscriber: bob,
    };
    let journaled = herald
        .events_since(0)
        .await?
        .into_iter()
        .filter(|entry| entry.event == subscribed)
        .count();
    assert_eq!(journaled, 1);
    Ok(())
}

#[tokio::test]
async fn test_journal_failure_refunds_delegation_fee() -> anyhow::Result<()> {
    let w = world();
    let store = Arc::new(FailingStore::default());
    let config = HeraldConfig::default();
    let admin = config.ledger.admin;
    let fee = config.ledger.delegation_fee;
    w.token.mint(admin, fee);
    let herald = Herald::open(store.clone(), w.caps.clone(), config, 0).await?;

    store.fail_appends.store(true, Ordering::SeqCst);
    assert!(herald.subscribe_delegated(admin, addr(0xB0), 1).await.is_err());
    assert_eq!(w.token.balance_of(&admin), fee);
    assert_eq!(herald.fees().await.owner_funds, 0);
    Ok(())
}

#[tokio::test]
async fn test_snapshot_failure_keeps_commit() -> anyhow::Result<()> {
    let w = world();
    let store = Arc::new(FailingStore::default());
    let config = HeraldConfig::default();
    let admin = config.ledger.admin;
    let herald = Herald::open(store.clone(), w.caps, config, 0).await?;

    store.fail_snapshots.store(true, Ordering::SeqCst);
    herald.subscribe(admin, addr(0xB0), 1).await?;
    assert!(herald.member_exists(addr(0xB0), admin).await);
    assert_eq!(store.event_count().await?, 6);
    assert_eq!(store.latest_snapshot().await?.map(|s| s.height), Some(0));

    store.fail_snapshots.store(false, Ordering::SeqCst);
    herald.subscribe(admin, addr(0xB1), 2).await?;
    assert_eq!(store.latest_snapshot().await?.map(|s| s.height), Some(2));
    Ok(())
}

#[tokio::test]
async fn test_only_latest_snapshot_is_kept() -> anyhow::Result<()> {
    let w = world();
    let store = Arc::new(MemoryStore::new());
    let config = HeraldConfig::default();
    let admin = config.ledger.admin;
    let herald = Herald::open(store.clone(), w.caps, config, 0).await?;

    for i in 0..200u32 {
        let mut bytes = [0u8; 20];
        bytes[..4].copy_from_slice(&(i + 1).to_be_bytes());
        herald
            .subscribe(admin, Address::from_bytes(bytes), u64::from(i) + 1)
            .await?;
    }

    assert_eq!(store.snapshot_count(), 1);
    assert_eq!(store.latest_snapshot().await?.map(|s| s.height), Some(200));
    Ok(())
}
