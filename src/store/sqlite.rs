use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;

use crate::store::{EventStore, EVENT_LOG_CAPACITY};
use crate::{now_ms, Event};

/// SQLite-backed event store.
///
/// Events are stored as JSON payloads in insertion order; the autoincrement
/// row id is the per-device insertion order. The capacity bound is enforced
/// on every append so the durable backend behaves exactly like the
/// in-process one. A single connection serializes access; SQLite's bounded
/// busy handling keeps latency finite, and any failure is surfaced to the
/// caller instead of being reported as an empty log.
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
    capacity: usize,
}

impl SqliteEventStore {
    pub fn open(db_path: &str) -> Result<Self> {
        Self::open_with_capacity(db_path, EVENT_LOG_CAPACITY)
    }

    pub fn open_with_capacity(db_path: &str, capacity: usize) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("open event store database {}", db_path))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let store = Self {
            conn: Mutex::new(conn),
            capacity: capacity.max(1),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS device_events (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              device_id TEXT NOT NULL,
              created_at INTEGER NOT NULL,
              payload_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_device_events_device
              ON device_events(device_id, id);
            "#,
        )?;
        Ok(())
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("event store connection lock poisoned"))
    }
}

impl EventStore for SqliteEventStore {
    fn append(&self, device_id: &str, event: Event) -> Result<()> {
        let payload_json = serde_json::to_string(&event)?;
        let created_at = now_ms()?;

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO device_events(device_id, created_at, payload_json) VALUES (?1, ?2, ?3)",
            params![device_id, created_at, payload_json],
        )?;

        // Oldest retained row id for this device, once the log is full.
        let cutoff: Option<i64> = tx
            .query_row(
                "SELECT id FROM device_events WHERE device_id = ?1
                 ORDER BY id DESC LIMIT 1 OFFSET ?2",
                params![device_id, (self.capacity - 1) as i64],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(cutoff) = cutoff {
            tx.execute(
                "DELETE FROM device_events WHERE device_id = ?1 AND id < ?2",
                params![device_id, cutoff],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn read(&self, device_id: &str, limit: usize) -> Result<Vec<Event>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT payload_json FROM device_events WHERE device_id = ?1
             ORDER BY id DESC LIMIT ?2",
        )?;
        let mut rows = stmt.query(params![device_id, limit as i64])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let payload: String = row.get(0)?;
            let event: Event = serde_json::from_str(&payload)
                .with_context(|| format!("corrupt event payload for device '{}'", device_id))?;
            out.push(event);
        }
        Ok(out)
    }
}
