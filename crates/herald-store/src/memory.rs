//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use herald_core::{Event, Height};

use crate::error::{Result, StoreError};
use crate::traits::{JournalEntry, Snapshot, Store};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    journal: Vec<JournalEntry>,
    snapshot: Option<Snapshot>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots retained.
    pub fn snapshot_count(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        usize::from(inner.snapshot.is_some())
    }
}

fn poisoned<T>(e: PoisonError<T>) -> StoreError {
    StoreError::LockPoisoned(e.to_string())
}

#[async_trait]
impl Store for MemoryStore {
    async fn append_events(&self, height: Height, events: &[Event]) -> Result<u64> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        for event in events {
            let seq = inner.journal.len() as u64 + 1;
            inner.journal.push(JournalEntry {
                seq,
                height,
                event: event.clone(),
            });
        }
        Ok(inner.journal.len() as u64)
    }

    async fn events_since(&self, after: u64) -> Result<Vec<JournalEntry>> {
        let inner = self.inner.read().map_err(poisoned)?;
        let start = usize::try_from(after)
            .unwrap_or(usize::MAX)
            .min(inner.journal.len());
        Ok(inner.journal[start..].to_vec())
    }

    async fn event_count(&self) -> Result<u64> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.journal.len() as u64)
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.snapshot = Some(snapshot.clone());
        Ok(())
    }

    async fn latest_snapshot(&self) -> Result<Option<Snapshot>> {
        let inner = self.inner.read().map_err(poisoned)?;
        Ok(inner.snapshot.clone())
    }
}
