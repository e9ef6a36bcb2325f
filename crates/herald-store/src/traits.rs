//! Store trait: the abstract interface for journal and snapshot persistence.
//!
//! This trait keeps the service storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use herald_core::{Event, Height};
use herald_ledger::LedgerState;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One journaled event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the journal, starting at 1.
    pub seq: u64,
    /// Height of the operation that emitted the event.
    pub height: Height,
    pub event: Event,
}

/// Full ledger state as of `height`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub height: Height,
    pub state: LedgerState,
}

/// The Store trait: async interface for journal and snapshot persistence.
///
/// For SQLite, blocking work is moved off the runtime with `spawn_blocking`.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Journal
    // ─────────────────────────────────────────────────────────────────────────

    /// Append the events of one operation committed at `height`.
    ///
    /// All events are appended or none are. Returns the sequence number of
    /// the journal head afterwards.
    async fn append_events(&self, height: Height, events: &[Event]) -> Result<u64>;

    /// Entries with `seq > after`, in order.
    async fn events_since(&self, after: u64) -> Result<Vec<JournalEntry>>;

    /// Number of journaled events.
    async fn event_count(&self) -> Result<u64>;

    // ─────────────────────────────────────────────────────────────────────────
    // Snapshots
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a snapshot, replacing any earlier one.
    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()>;

    /// The most recently saved snapshot, if any.
    async fn latest_snapshot(&self) -> Result<Option<Snapshot>>;
}
