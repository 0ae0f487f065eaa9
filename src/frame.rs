use std::time::Instant;

/// A raw video frame handed from a frame source to detection.
///
/// Pixel data is RGB, row-major, `width * height * 3` bytes. Frames are
/// transient: nothing downstream of detection retains them.
#[derive(Clone, Debug)]
pub struct RawFrame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    /// Monotonic capture instant, the authoritative clock for debouncing.
    captured_at: Instant,
    /// Sequence number within the stream, starting at 1.
    index: u64,
}

impl RawFrame {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, captured_at: Instant, index: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            captured_at,
            index,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn index(&self) -> u64 {
        self.index
    }
}
