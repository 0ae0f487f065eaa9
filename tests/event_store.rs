use std::sync::Arc;

use tempfile::tempdir;

use edgewatch::store::{EventStore, EVENT_LOG_CAPACITY};
use edgewatch::{Event, MemoryEventStore, SqliteEventStore};

fn event(device_id: &str, ts: i64) -> Event {
    Event {
        device_id: device_id.to_string(),
        ts,
        event: "person_detected".to_string(),
        person_count: 1,
        top_confidence: 0.9,
        model: "stub".to_string(),
        image_tag: "edgewatch/edge:test".to_string(),
        extra: serde_json::Map::new(),
    }
}

/// Run one check against both store backends.
fn with_each_store(check: impl Fn(&dyn EventStore)) {
    let memory = MemoryEventStore::new();
    check(&memory);

    let dir = tempdir().expect("temp dir");
    let db_path = dir.path().join("events.db");
    let sqlite = SqliteEventStore::open(db_path.to_str().expect("utf-8 path")).expect("open store");
    check(&sqlite);
}

#[test]
fn read_returns_newest_first() {
    with_each_store(|store| {
        for ts in [1, 2, 3] {
            store.append("cam-1", event("cam-1", ts)).unwrap();
        }

        let events = store.read("cam-1", 2).unwrap();
        let timestamps: Vec<i64> = events.iter().map(|ev| ev.ts).collect();
        assert_eq!(timestamps, vec![3, 2]);
    });
}

#[test]
fn read_clamps_to_available_count() {
    with_each_store(|store| {
        for ts in [1, 2, 3] {
            store.append("cam-1", event("cam-1", ts)).unwrap();
        }

        let events = store.read("cam-1", 50).unwrap();
        assert_eq!(events.len(), 3);
        let timestamps: Vec<i64> = events.iter().map(|ev| ev.ts).collect();
        assert_eq!(timestamps, vec![3, 2, 1]);
    });
}

#[test]
fn unknown_device_reads_empty_not_error() {
    with_each_store(|store| {
        let events = store.read("no-such-device", 50).unwrap();
        assert!(events.is_empty());
    });
}

#[test]
fn devices_are_isolated() {
    with_each_store(|store| {
        store.append("cam-a", event("cam-a", 1)).unwrap();
        store.append("cam-b", event("cam-b", 2)).unwrap();

        let a = store.read("cam-a", 50).unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].device_id, "cam-a");

        let b = store.read("cam-b", 50).unwrap();
        assert_eq!(b.len(), 1);
        assert_eq!(b[0].device_id, "cam-b");
    });
}

#[test]
fn capacity_evicts_oldest_records() {
    with_each_store(|store| {
        let total = (EVENT_LOG_CAPACITY + 10) as i64;
        for ts in 1..=total {
            store.append("cam-1", event("cam-1", ts)).unwrap();
        }

        let events = store.read("cam-1", EVENT_LOG_CAPACITY).unwrap();
        assert_eq!(events.len(), EVENT_LOG_CAPACITY);
        // Newest first, and nothing older than the capacity window survives.
        assert_eq!(events.first().unwrap().ts, total);
        assert_eq!(events.last().unwrap().ts, total - EVENT_LOG_CAPACITY as i64 + 1);

        // Eviction applies per device, not globally.
        store.append("cam-2", event("cam-2", 1)).unwrap();
        assert_eq!(store.read("cam-2", 50).unwrap().len(), 1);
        assert_eq!(
            store.read("cam-1", EVENT_LOG_CAPACITY).unwrap().len(),
            EVENT_LOG_CAPACITY
        );
    });
}

#[test]
fn extra_fields_survive_storage() {
    with_each_store(|store| {
        let mut ev = event("cam-1", 7);
        ev.extra
            .insert("site".to_string(), serde_json::json!("lobby"));
        store.append("cam-1", ev).unwrap();

        let events = store.read("cam-1", 1).unwrap();
        assert_eq!(events[0].extra["site"], "lobby");
    });
}

#[test]
fn sqlite_store_persists_across_reopen() {
    let dir = tempdir().expect("temp dir");
    let db_path = dir.path().join("events.db");
    let path = db_path.to_str().expect("utf-8 path");

    {
        let store = SqliteEventStore::open(path).unwrap();
        store.append("cam-1", event("cam-1", 42)).unwrap();
    }

    let store = SqliteEventStore::open(path).unwrap();
    let events = store.read("cam-1", 50).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].ts, 42);
}

#[test]
fn parallel_appends_across_devices() {
    let store = Arc::new(MemoryEventStore::new());
    let mut handles = Vec::new();

    for device in 0..4 {
        let store = store.clone();
        handles.push(std::thread::spawn(move || {
            let device_id = format!("cam-{}", device);
            for ts in 1..=100 {
                store.append(&device_id, event(&device_id, ts)).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    for device in 0..4 {
        let device_id = format!("cam-{}", device);
        let events = store.read(&device_id, 200).unwrap();
        assert_eq!(events.len(), 100);
        assert_eq!(events.first().unwrap().ts, 100);
    }
}
