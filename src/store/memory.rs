use anyhow::{anyhow, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use crate::store::{EventStore, EVENT_LOG_CAPACITY};
use crate::Event;

/// In-process event store.
///
/// The registry maps device ids to independently locked logs: the outer
/// `RwLock` is write-held only while inserting a new device, so appends and
/// reads for different devices proceed in parallel while operations on one
/// device serialize on that device's mutex.
pub struct MemoryEventStore {
    capacity: usize,
    logs: RwLock<HashMap<String, Arc<Mutex<VecDeque<Event>>>>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            logs: RwLock::new(HashMap::new()),
        }
    }

    fn log_for(&self, device_id: &str) -> Result<Arc<Mutex<VecDeque<Event>>>> {
        {
            let logs = self
                .logs
                .read()
                .map_err(|_| anyhow!("event store registry lock poisoned"))?;
            if let Some(log) = logs.get(device_id) {
                return Ok(log.clone());
            }
        }
        let mut logs = self
            .logs
            .write()
            .map_err(|_| anyhow!("event store registry lock poisoned"))?;
        Ok(logs
            .entry(device_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::new())))
            .clone())
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore for MemoryEventStore {
    fn append(&self, device_id: &str, event: Event) -> Result<()> {
        let log = self.log_for(device_id)?;
        let mut log = log
            .lock()
            .map_err(|_| anyhow!("event log lock poisoned for device '{}'", device_id))?;
        log.push_back(event);
        while log.len() > self.capacity {
            log.pop_front();
        }
        Ok(())
    }

    fn read(&self, device_id: &str, limit: usize) -> Result<Vec<Event>> {
        let log = {
            let logs = self
                .logs
                .read()
                .map_err(|_| anyhow!("event store registry lock poisoned"))?;
            match logs.get(device_id) {
                Some(log) => log.clone(),
                None => return Ok(Vec::new()),
            }
        };
        let log = log
            .lock()
            .map_err(|_| anyhow!("event log lock poisoned for device '{}'", device_id))?;
        Ok(log.iter().rev().take(limit).cloned().collect())
    }
}
