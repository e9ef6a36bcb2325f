//! # Herald Store
//!
//! Persistence for the Herald ledger. Two things are stored:
//!
//! - the **journal**: every event the ledger emitted, in commit order, each
//!   tagged with a journal sequence number and the height it was committed at
//! - **snapshots**: full serialized [`LedgerState`](herald_ledger::LedgerState)
//!   at a given height, from which a ledger can be restored
//!
//! ## Key Types
//!
//! - [`Store`] - The async trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use herald_store::{SqliteStore, Store};
//!
//! async fn example() {
//!     let store = SqliteStore::open("herald.db").unwrap();
//!     let count = store.event_count().await.unwrap();
//!     let entries = store.events_since(0).await.unwrap();
//!     assert_eq!(entries.len() as u64, count);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Append-only journal**: entries are never rewritten or deleted
//! - **Atomic batches**: all events of one operation are appended together
//! - **Latest snapshot wins**: restoring always uses the most recent snapshot

pub mod codec;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{JournalEntry, Snapshot, Store};
