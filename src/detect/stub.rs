use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::RawFrame;

/// Synthetic detector for tests and demo runs.
///
/// Reports a single "person" detection on every `period`-th frame and
/// nothing otherwise, so a stub pipeline produces a predictable trickle of
/// qualifying frames.
#[derive(Debug)]
pub struct StubBackend {
    period: u64,
    confidence: f32,
}

impl StubBackend {
    pub fn new(period: u64, confidence: f32) -> Self {
        Self {
            period: period.max(1),
            confidence,
        }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new(25, 0.9)
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &RawFrame) -> Result<Vec<Detection>> {
        if frame.index() % self.period == 0 {
            Ok(vec![Detection::new("person", self.confidence)
                .with_box(0.25, 0.25, 0.5, 0.5)])
        } else {
            Ok(vec![])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn frame(index: u64) -> RawFrame {
        RawFrame::new(vec![0u8; 12], 2, 2, Instant::now(), index)
    }

    #[test]
    fn stub_backend_fires_on_period() {
        let mut backend = StubBackend::new(3, 0.7);

        assert!(backend.detect(&frame(1)).unwrap().is_empty());
        assert!(backend.detect(&frame(2)).unwrap().is_empty());

        let hits = backend.detect(&frame(3)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].label, "person");
        assert_eq!(hits[0].confidence, 0.7);
    }
}
