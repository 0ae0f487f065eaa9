//! Bounded per-device event retention.
//!
//! One trait, two backends: an in-process bounded buffer and a SQLite-backed
//! durable store. Both honor the same contract: per-device insertion order,
//! capacity-bounded logs with oldest-first eviction, newest-first reads,
//! empty (not erroring) reads for unknown devices, and errors surfaced to
//! the caller rather than masked as empty data.

mod memory;
mod sqlite;

use anyhow::Result;

pub use memory::MemoryEventStore;
pub use sqlite::SqliteEventStore;

use crate::Event;

/// Maximum events retained per device.
pub const EVENT_LOG_CAPACITY: usize = 500;

/// Default number of events returned by a read.
pub const DEFAULT_READ_LIMIT: usize = 50;

/// Per-device, insertion-ordered, capacity-bounded event log.
///
/// Implementations must keep `append` and `read` atomic per device: a read
/// never observes a partially applied append. Operations on different
/// devices should not contend on a single lock where the backend allows it.
pub trait EventStore: Send + Sync {
    /// Insert `event` as the newest record for `device_id`, creating the
    /// device's log on first use and evicting the oldest record when the
    /// log is at capacity.
    fn append(&self, device_id: &str, event: Event) -> Result<()>;

    /// Up to `limit` most-recent events for `device_id`, newest first.
    /// Unknown devices read as empty.
    fn read(&self, device_id: &str, limit: usize) -> Result<Vec<Event>>;
}
