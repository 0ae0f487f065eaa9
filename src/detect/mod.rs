//! Detector adapter.
//!
//! Detection is an opaque external capability: given a frame, a backend
//! returns zero or more labeled detections with confidences and bounding
//! boxes. The pipeline never looks inside a backend beyond that contract.

mod backend;
mod result;
mod stub;

use anyhow::{anyhow, Result};

pub use backend::DetectorBackend;
pub use result::Detection;
pub use stub::StubBackend;

/// Select a detector backend by name.
///
/// Unknown names are a startup failure: the daemon must not enter its main
/// loop with detection unavailable.
pub fn backend_for(name: &str) -> Result<Box<dyn DetectorBackend>> {
    match name {
        "stub" => Ok(Box::new(StubBackend::default())),
        other => Err(anyhow!(
            "unknown detector backend '{}' (no detector assets compiled in)",
            other
        )),
    }
}
