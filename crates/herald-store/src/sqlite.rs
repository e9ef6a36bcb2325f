//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled SQLite,
//! wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use herald_core::{Event, Height};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::codec;
use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{JournalEntry, Snapshot, Store};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Number of snapshots retained.
    pub async fn snapshot_count(&self) -> Result<u64> {
        self.blocking(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?;
            from_sql_int(count, "count")
        })
        .await
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn to_sql_int(value: u64, what: &str) -> Result<i64> {
    i64::try_from(value).map_err(|_| StoreError::InvalidData(format!("{} out of range: {}", what, value)))
}

fn from_sql_int(value: i64, what: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| StoreError::InvalidData(format!("negative {}: {}", what, value)))
}

fn head_seq(conn: &Connection) -> Result<u64> {
    let seq: i64 = conn.query_row("SELECT COALESCE(MAX(seq), 0) FROM journal", [], |row| {
        row.get(0)
    })?;
    from_sql_int(seq, "seq")
}

#[async_trait]
impl Store for SqliteStore {
    async fn append_events(&self, height: Height, events: &[Event]) -> Result<u64> {
        let height = to_sql_int(height, "height")?;
        let encoded = events
            .iter()
            .map(|event| Ok((event.name(), codec::encode(event)?)))
            .collect::<Result<Vec<_>>>()?;

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let now = now_millis();
            for (kind, bytes) in &encoded {
                tx.execute(
                    "INSERT INTO journal (height, kind, event, recorded_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![height, kind, bytes, now],
                )?;
            }
            let head = head_seq(&tx)?;
            tx.commit()?;
            Ok(head)
        })
        .await
    }

    async fn events_since(&self, after: u64) -> Result<Vec<JournalEntry>> {
        let after = i64::try_from(after).unwrap_or(i64::MAX);

        let rows = self
            .blocking(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT seq, height, event FROM journal WHERE seq > ?1 ORDER BY seq",
                )?;
                let rows = stmt
                    .query_map(params![after], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, Vec<u8>>(2)?,
                        ))
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter()
            .map(|(seq, height, bytes)| {
                Ok(JournalEntry {
                    seq: from_sql_int(seq, "seq")?,
                    height: from_sql_int(height, "height")?,
                    event: codec::decode(&bytes)?,
                })
            })
            .collect()
    }

    async fn event_count(&self) -> Result<u64> {
        self.blocking(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM journal", [], |row| row.get(0))?;
            from_sql_int(count, "count")
        })
        .await
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let height = to_sql_int(snapshot.height, "height")?;
        let state = codec::encode(&snapshot.state)?;
        let size = state.len();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO snapshots (height, state, created_at) VALUES (?1, ?2, ?3)",
                params![height, state, now_millis()],
            )?;
            let id = tx.last_insert_rowid();
            tx.execute("DELETE FROM snapshots WHERE id < ?1", params![id])?;
            tx.commit()?;
            Ok(())
        })
        .await?;

        debug!(height = snapshot.height, bytes = size, "snapshot saved");
        Ok(())
    }

    async fn latest_snapshot(&self) -> Result<Option<Snapshot>> {
        let row = self
            .blocking(|conn| {
                conn.query_row(
                    "SELECT height, state FROM snapshots ORDER BY id DESC LIMIT 1",
                    [],
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)),
                )
                .optional()
                .map_err(StoreError::from)
            })
            .await?;

        row.map(|(height, bytes)| {
            Ok(Snapshot {
                height: from_sql_int(height, "height")?,
                state: codec::decode(&bytes)?,
            })
        })
        .transpose()
    }
}
