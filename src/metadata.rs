//! Source video metadata.
//!
//! [`VideoMetadata`] is probed once when a [`VideoSource`](crate::VideoSource)
//! is opened and is carried into the [`SplitReport`](crate::SplitReport).

use std::time::Duration;

/// Metadata for the video stream being split.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second (average rate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Estimated total number of frames, computed from duration and frame rate.
    pub frame_count: u64,
    /// Container-level duration.
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`, `"mpeg4"`, `"vp9"`).
    pub codec: String,
}
