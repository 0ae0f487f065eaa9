//! edgewatch
//!
//! A two-tier detection-event pipeline:
//!
//! - **Edge**: a frame source feeds a detector backend; qualifying detections
//!   pass through a debounced emitter that produces at most one [`Event`] per
//!   cooldown window; a delivery client posts each event to the cloud (or
//!   logs it in dry-run mode).
//! - **Cloud**: an HTTP ingestion service appends events to a per-device,
//!   insertion-ordered, capacity-bounded [`store::EventStore`] and serves
//!   them back newest-first.
//!
//! # Module Structure
//!
//! - `frame`: raw frame value passed from ingestion to detection
//! - `ingest`: frame sources (synthetic `stub://` plus RTSP placeholder)
//! - `detect`: detector backend trait and implementations
//! - `emit`: debounced event emission
//! - `delivery`: edge-to-cloud event delivery
//! - `store`: bounded per-device event retention (memory and SQLite)
//! - `api`: ingestion HTTP service
//! - `config`: cloud ingestion configuration

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod api;
pub mod config;
pub mod delivery;
pub mod detect;
pub mod emit;
pub mod frame;
pub mod ingest;
pub mod store;

pub use delivery::{DeliveryClient, DeliveryResult};
pub use detect::{backend_for, Detection, DetectorBackend, StubBackend};
pub use emit::{DebouncedEmitter, EmitterConfig, Provenance};
pub use frame::RawFrame;
pub use ingest::{rtsp::RtspConfig, RtspSource};
pub use store::{EventStore, MemoryEventStore, SqliteEventStore};

/// Sentinel device identifier used when an event arrives without one.
pub const UNKNOWN_DEVICE_ID: &str = "unknown";

fn default_device_id() -> String {
    UNKNOWN_DEVICE_ID.to_string()
}

/// The unit of record: one detection event as emitted by an edge device.
///
/// Events are immutable once created. The schema is open: fields beyond the
/// ones named here are carried through `extra` so the store never assumes a
/// closed record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Event {
    /// Originating edge unit. Defaults to [`UNKNOWN_DEVICE_ID`] when absent.
    #[serde(default = "default_device_id")]
    pub device_id: String,
    /// Milliseconds since epoch, assigned at emission time.
    #[serde(default)]
    pub ts: i64,
    /// Event kind tag, e.g. "person_detected".
    #[serde(default)]
    pub event: String,
    /// Number of qualifying detections in the triggering frame.
    #[serde(default)]
    pub person_count: u32,
    /// Maximum confidence among qualifying detections, rounded to 4 decimals.
    #[serde(default)]
    pub top_confidence: f64,
    /// Detector version the event was produced with.
    #[serde(default)]
    pub model: String,
    /// Deployment artifact identifier.
    #[serde(default)]
    pub image_tag: String,
    /// Any additional fields present on the wire.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> Result<i64> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(elapsed.as_millis() as i64)
}

/// Round a confidence to 4 decimal places for event payloads.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round4_truncates_noise() {
        assert_eq!(round4(0.123_456_78), 0.1235);
        assert_eq!(round4(0.6), 0.6);
        assert_eq!(round4(1.0), 1.0);
    }

    #[test]
    fn event_defaults_device_id_and_keeps_extra_fields() {
        let ev: Event = serde_json::from_str(
            r#"{"ts": 12, "event": "person_detected", "site": "lobby"}"#,
        )
        .unwrap();
        assert_eq!(ev.device_id, UNKNOWN_DEVICE_ID);
        assert_eq!(ev.ts, 12);
        assert_eq!(ev.extra["site"], "lobby");

        let round_trip = serde_json::to_value(&ev).unwrap();
        assert_eq!(round_trip["site"], "lobby");
        assert_eq!(round_trip["device_id"], UNKNOWN_DEVICE_ID);
    }
}
