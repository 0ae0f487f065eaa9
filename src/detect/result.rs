/// One detected object in one frame. Transient, never persisted.
#[derive(Clone, Debug)]
pub struct Detection {
    /// Class label, e.g. "person".
    pub label: String,
    /// Confidence in 0..=1.
    pub confidence: f32,
    /// Bounding box (normalized 0..1 coordinates).
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
            x: 0.0,
            y: 0.0,
            w: 0.0,
            h: 0.0,
        }
    }

    pub fn with_box(mut self, x: f32, y: f32, w: f32, h: f32) -> Self {
        self.x = x;
        self.y = y;
        self.w = w;
        self.h = h;
        self
    }
}
