//! Frame ingestion sources.
//!
//! A frame source produces `RawFrame`s until the stream ends. The edge
//! daemon treats sources as opaque: decode details (RTSP, files, synthetic)
//! live entirely behind [`RtspSource`].
//!
//! `next_frame` returns `Ok(None)` at end-of-stream; callers exit cleanly
//! rather than treating that as an error.

pub mod rtsp;

pub use rtsp::RtspSource;
