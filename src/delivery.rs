//! Edge-to-cloud event delivery.
//!
//! Delivery is best effort: a failed POST is reported and dropped, never
//! retried, and must never take the detection loop down. With no endpoint
//! configured the client runs in dry-run mode and performs no network I/O.

use std::time::Duration;

use crate::Event;

pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of one delivery attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryResult {
    /// The ingestion endpoint acknowledged the event.
    Delivered,
    /// No endpoint configured; the event was only surfaced locally.
    DryRun,
    /// The attempt failed (timeout, connection error, non-success status).
    Failed(String),
}

/// HTTP client for the ingestion endpoint.
#[derive(Clone)]
pub struct DeliveryClient {
    agent: ureq::Agent,
    /// Full events URL, `None` in dry-run mode.
    endpoint: Option<String>,
}

impl DeliveryClient {
    /// Build a client from the configured API base. An empty or absent base
    /// selects dry-run mode.
    pub fn from_base(api_base: Option<&str>) -> Self {
        let endpoint = api_base
            .map(str::trim)
            .filter(|base| !base.is_empty())
            .map(|base| format!("{}/events", base.trim_end_matches('/')));
        let agent = ureq::AgentBuilder::new()
            .timeout(DELIVERY_TIMEOUT)
            .build();
        Self { agent, endpoint }
    }

    pub fn is_dry_run(&self) -> bool {
        self.endpoint.is_none()
    }

    /// Deliver one event. Never panics and never blocks past the timeout.
    pub fn deliver(&self, event: &Event) -> DeliveryResult {
        let Some(endpoint) = &self.endpoint else {
            return DeliveryResult::DryRun;
        };
        match self.agent.post(endpoint).send_json(event) {
            Ok(_) => DeliveryResult::Delivered,
            Err(ureq::Error::Status(code, _)) => {
                DeliveryResult::Failed(format!("endpoint returned status {}", code))
            }
            Err(err) => DeliveryResult::Failed(err.to_string()),
        }
    }
}
