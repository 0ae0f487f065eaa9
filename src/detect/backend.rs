use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::RawFrame;

/// Detector backend trait.
///
/// Implementations wrap whatever object-classification capability is
/// available (a neural network runtime, a remote accelerator, a synthetic
/// generator for tests). They must treat frame pixels as read-only and
/// ephemeral and must not block longer than one frame interval.
pub trait DetectorBackend: Send + std::fmt::Debug {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame, returning one entry per detected object.
    fn detect(&mut self, frame: &RawFrame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
