//! Debounced event emission.
//!
//! The emitter turns per-frame detection lists into discrete events: a frame
//! qualifies when at least one detection of the class of interest meets the
//! confidence threshold, and emission is suppressed while the cooldown from
//! the previous emission is still running. Debounce state is explicit and
//! owned here; whoever owns the emitter owns the authoritative clock.

use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};

use crate::detect::Detection;
use crate::{now_ms, round4, Event};

pub const DEFAULT_THRESHOLD: f32 = 0.60;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(3);
pub const DEFAULT_CLASS_OF_INTEREST: &str = "person";
pub const PERSON_DETECTED_EVENT: &str = "person_detected";

/// Emitter configuration.
#[derive(Clone, Debug)]
pub struct EmitterConfig {
    /// Confidence threshold for qualifying detections, in [0, 1].
    pub threshold: f32,
    /// Minimum time between emissions.
    pub cooldown: Duration,
    /// Class label that qualifies a detection.
    pub class_of_interest: String,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
            class_of_interest: DEFAULT_CLASS_OF_INTEREST.to_string(),
        }
    }
}

impl EmitterConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(anyhow!(
                "detection threshold must be within [0, 1], got {}",
                self.threshold
            ));
        }
        if self.class_of_interest.trim().is_empty() {
            return Err(anyhow!("class_of_interest must not be empty"));
        }
        Ok(())
    }
}

/// Provenance stamped on every emitted event.
#[derive(Clone, Debug)]
pub struct Provenance {
    pub device_id: String,
    pub model: String,
    pub image_tag: String,
}

/// Debounced event emitter.
///
/// Two states: idle (no emission yet, or cooldown expired) and cooling.
/// The transition back to idle is implicit in the elapsed-time check, so no
/// timer task is needed. Callers must serialize `observe` calls; the frame
/// loop owns the emitter and evaluates frames in order.
pub struct DebouncedEmitter {
    config: EmitterConfig,
    provenance: Provenance,
    last_emitted: Option<Instant>,
}

impl DebouncedEmitter {
    pub fn new(config: EmitterConfig, provenance: Provenance) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            provenance,
            last_emitted: None,
        })
    }

    /// Whether the emitter is currently suppressing emissions.
    pub fn is_cooling(&self, now: Instant) -> bool {
        self.last_emitted
            .is_some_and(|last| now.duration_since(last) < self.config.cooldown)
    }

    /// Evaluate one frame's detections against threshold and cooldown.
    ///
    /// Returns the event to deliver, or `None` when the frame does not
    /// qualify or the cooldown is still running. The first qualifying frame
    /// always emits.
    pub fn observe(&mut self, detections: &[Detection], now: Instant) -> Result<Option<Event>> {
        let qualifying: Vec<f32> = detections
            .iter()
            .filter(|d| {
                d.label == self.config.class_of_interest && d.confidence >= self.config.threshold
            })
            .map(|d| d.confidence)
            .collect();

        if qualifying.is_empty() || self.is_cooling(now) {
            return Ok(None);
        }

        let top = qualifying.iter().cloned().fold(f32::MIN, f32::max);
        let event = Event {
            device_id: self.provenance.device_id.clone(),
            ts: now_ms()?,
            event: PERSON_DETECTED_EVENT.to_string(),
            person_count: qualifying.len() as u32,
            top_confidence: round4(top as f64),
            model: self.provenance.model.clone(),
            image_tag: self.provenance.image_tag.clone(),
            extra: serde_json::Map::new(),
        };

        self.last_emitted = Some(now);
        Ok(Some(event))
    }
}
