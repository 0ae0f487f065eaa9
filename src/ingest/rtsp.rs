use anyhow::{anyhow, Context, Result};
use std::time::Instant;
use url::Url;

use crate::frame::RawFrame;

/// Configuration for a video frame source.
#[derive(Clone, Debug)]
pub struct RtspConfig {
    /// Stream URL. `stub://<name>` selects the synthetic source; an optional
    /// `?frames=N` query bounds it for end-of-stream testing.
    pub url: String,
    /// Target frame rate (frames per second); the daemon paces to this.
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for RtspConfig {
    fn default() -> Self {
        Self {
            url: "stub://camera".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

/// Video frame source.
///
/// Only the synthetic `stub://` backend is compiled in; real RTSP decode is
/// supplied by an external capability and rejected here at construction so
/// a misconfigured daemon fails before entering its main loop.
pub struct RtspSource {
    backend: RtspBackend,
}

enum RtspBackend {
    Synthetic(SyntheticSource),
}

impl RtspSource {
    pub fn new(config: RtspConfig) -> Result<Self> {
        let url = Url::parse(&config.url).context("parse frame source url")?;
        match url.scheme() {
            "stub" => Ok(Self {
                backend: RtspBackend::Synthetic(SyntheticSource::new(config, &url)),
            }),
            other => Err(anyhow!(
                "unsupported frame source scheme '{}': no video decode backend compiled in",
                other
            )),
        }
    }

    /// Connect to the stream.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            RtspBackend::Synthetic(source) => source.connect(),
        }
    }

    /// Capture the next frame. `Ok(None)` means the stream ended.
    pub fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        match &mut self.backend {
            RtspBackend::Synthetic(source) => source.next_frame(),
        }
    }

    /// Check if the source is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            RtspBackend::Synthetic(source) => source.is_healthy(),
        }
    }

    /// Get frame statistics.
    pub fn stats(&self) -> SourceStats {
        match &self.backend {
            RtspBackend::Synthetic(source) => source.stats(),
        }
    }
}

/// Statistics for a frame source.
#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub url: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and demo runs
// ----------------------------------------------------------------------------

struct SyntheticSource {
    config: RtspConfig,
    frame_count: u64,
    /// Stop after this many frames when set (`?frames=N`).
    frame_limit: Option<u64>,
}

impl SyntheticSource {
    fn new(config: RtspConfig, url: &Url) -> Self {
        let frame_limit = url
            .query_pairs()
            .find(|(key, _)| key == "frames")
            .and_then(|(_, value)| value.parse().ok());
        Self {
            config,
            frame_count: 0,
            frame_limit,
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!("RtspSource: connected to {} (synthetic)", self.config.url);
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        if let Some(limit) = self.frame_limit {
            if self.frame_count >= limit {
                return Ok(None);
            }
        }
        self.frame_count += 1;

        let pixels = self.generate_synthetic_pixels();
        Ok(Some(RawFrame::new(
            pixels,
            self.config.width,
            self.config.height,
            Instant::now(),
            self.frame_count,
        )))
    }

    /// Generate synthetic RGB pixel data, varying by frame so downstream
    /// stages see a changing scene.
    fn generate_synthetic_pixels(&self) -> Vec<u8> {
        let pixel_count = (self.config.width * self.config.height * 3) as usize;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count) % 256) as u8;
        }
        pixels
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            url: self.config.url.clone(),
        }
    }
}
