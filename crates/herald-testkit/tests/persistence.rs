//! Reopening a SQLite-backed service.

use std::sync::Arc;

use herald::store::{SqliteStore, Store};
use herald::{Herald, HeraldConfig};
use herald_testkit::{multi_party, TestFixture};

#[tokio::test]
async fn reopen_restores_state_and_journal() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("herald.db");
    let fixture = TestFixture::new();
    let parties = multi_party(3);
    let creator = &parties[0];

    let state = {
        let store = Arc::new(SqliteStore::open(&path)?);
        let herald = Herald::open(store, fixture.caps(), HeraldConfig::default(), 0).await?;

        fixture.whitelist(creator.address);
        fixture.fund(creator.address, fixture.config.min_contribution);
        herald
            .create_channel(
                creator.address,
                herald::ChannelType::InterestBearing,
                "persisted",
                fixture.config.min_contribution,
                fixture.next_height(),
            )
            .await?;
        for party in &parties[1..] {
            herald
                .subscribe(creator.address, party.address, fixture.next_height())
                .await?;
        }
        herald
            .unsubscribe(creator.address, parties[2].address, fixture.next_height())
            .await?;
        herald.state().await
    };

    let store = Arc::new(SqliteStore::open(&path)?);
    let herald = Herald::open(store.clone(), fixture.caps(), HeraldConfig::default(), 0).await?;

    assert_eq!(herald.state().await, state);
    assert_eq!(herald.last_height().await, fixture.height());
    assert!(herald.is_graylisted(parties[2].address, creator.address).await);
    assert_eq!(
        herald.channel(&creator.address).await.map(|c| c.member_count),
        Some(2)
    );

    // genesis 5 + create 3 + two subscribes + one unsubscribe
    assert_eq!(store.event_count().await?, 11);

    // The journal continues where it left off.
    herald
        .subscribe(creator.address, parties[2].address, fixture.next_height())
        .await?;
    let tail = herald.events_since(11).await?;
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].seq, 12);
    Ok(())
}

#[tokio::test]
async fn stale_heights_survive_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("herald.db");
    let fixture = TestFixture::new();
    let parties = multi_party(1);
    let bob = &parties[0];

    {
        let store = Arc::new(SqliteStore::open(&path)?);
        let herald = Herald::open(store, fixture.caps(), HeraldConfig::default(), 0).await?;
        herald
            .broadcast_public_key(bob.address, bob.public_key, 40)
            .await?;
    }

    let store = Arc::new(SqliteStore::open(&path)?);
    let herald = Herald::open(store, fixture.caps(), HeraldConfig::default(), 0).await?;
    let admin = fixture.config.admin;

    let err = herald.subscribe(admin, bob.address, 39).await.unwrap_err();
    assert!(matches!(
        err.as_ledger(),
        Some(herald::ledger::LedgerError::StaleHeight { last: 40, got: 39 })
    ));
    herald.subscribe(admin, bob.address, 40).await?;
    Ok(())
}
