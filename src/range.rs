//! Scene time ranges and their conversion to frame indices.
//!
//! A detector reports scenes as [`TimeRange`] values in seconds. The
//! extractor works in frame indices, so every range is converted to a
//! half-open [`FrameSpan`] using the source frame rate. How the boundaries
//! are rounded is selected with [`FrameIndexing`].
//!
//! # Example
//!
//! ```
//! use scenesplit::{FrameIndexing, TimeRange, range::frame_spans};
//!
//! let ranges = [
//!     TimeRange::new(0.0, 3.0)?,
//!     TimeRange::new(3.0, 7.0)?,
//!     TimeRange::new(7.0, 10.0)?,
//! ];
//! let spans = frame_spans(&ranges, 30.0, FrameIndexing::Floor);
//! assert_eq!(spans[1].start, 90);
//! assert_eq!(spans[1].end, 210);
//! # Ok::<(), scenesplit::SceneSplitError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::SceneSplitError;

/// Tolerance used to decide that two range boundaries are the same instant.
const BOUNDARY_EPSILON: f64 = 1e-9;

/// A scene expressed as a time interval `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    /// Start of the scene in seconds (inclusive).
    pub start: f64,
    /// End of the scene in seconds (exclusive).
    pub end: f64,
}

impl TimeRange {
    /// Create a range, checking that `0 <= start < end` and both are finite.
    ///
    /// # Errors
    ///
    /// Returns [`SceneSplitError::InvalidRange`] otherwise.
    pub fn new(start: f64, end: f64) -> Result<Self, SceneSplitError> {
        if !start.is_finite() || !end.is_finite() || start < 0.0 || start >= end {
            return Err(SceneSplitError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a range from frame indices `[start_frame, end_frame)`.
    pub(crate) fn from_frames(start_frame: u64, end_frame: u64, frames_per_second: f64) -> Self {
        Self {
            start: start_frame as f64 / frames_per_second,
            end: end_frame as f64 / frames_per_second,
        }
    }

    /// Length of the range in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:.3}s-{:.3}s", self.start, self.end)
    }
}

/// A half-open range of frame indices `[start, end)`.
///
/// Unlike [`TimeRange`], a span may be empty (`start >= end`) when a very
/// short scene rounds to nothing. Empty spans produce no clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpan {
    /// First frame index of the span.
    pub start: u64,
    /// One past the last frame index of the span.
    pub end: u64,
}

impl FrameSpan {
    /// Number of frames the span covers.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the span covers no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How range boundaries in seconds are converted to frame indices.
///
/// Converting each boundary independently can drift by a frame at scene
/// boundaries when `seconds × fps` lands just below an integer.
/// `Cumulative` converts every shared boundary once so consecutive spans
/// never overlap or leave gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameIndexing {
    /// `floor(seconds × fps)` for each boundary of each range.
    #[default]
    Floor,
    /// `round(seconds × fps)` for each boundary of each range.
    Round,
    /// A range that starts where the previous one ended reuses the previous
    /// span's end index; only end boundaries are converted, by rounding.
    Cumulative,
}

impl FrameIndexing {
    fn convert(self, seconds: f64, frames_per_second: f64) -> u64 {
        let raw = seconds * frames_per_second;
        let index = match self {
            FrameIndexing::Floor => raw.floor(),
            FrameIndexing::Round | FrameIndexing::Cumulative => raw.round(),
        };
        if index > 0.0 { index as u64 } else { 0 }
    }
}

/// Convert ordered time ranges to frame spans.
pub fn frame_spans(
    ranges: &[TimeRange],
    frames_per_second: f64,
    indexing: FrameIndexing,
) -> Vec<FrameSpan> {
    let mut spans: Vec<FrameSpan> = Vec::with_capacity(ranges.len());

    for (position, range) in ranges.iter().enumerate() {
        let end = indexing.convert(range.end, frames_per_second);
        let start = match (indexing, position.checked_sub(1)) {
            (FrameIndexing::Cumulative, Some(previous))
                if (ranges[previous].end - range.start).abs() < BOUNDARY_EPSILON =>
            {
                spans[previous].end
            }
            _ => indexing.convert(range.start, frames_per_second),
        };
        spans.push(FrameSpan { start, end });
    }

    spans
}

/// Turn detected cut frames into contiguous scene ranges.
///
/// The ranges are `[0, c1), [c1, c2), ..., [cN, total_frames)`. With no
/// cuts the whole video is a single scene; with no frames there are no
/// scenes. Cuts outside `(0, total_frames)` or out of order are ignored.
pub fn ranges_from_cuts(cuts: &[u64], total_frames: u64, frames_per_second: f64) -> Vec<TimeRange> {
    if total_frames == 0 || frames_per_second <= 0.0 {
        return Vec::new();
    }

    let mut ranges = Vec::with_capacity(cuts.len() + 1);
    let mut scene_start = 0_u64;

    for &cut in cuts {
        if cut <= scene_start || cut >= total_frames {
            continue;
        }
        ranges.push(TimeRange::from_frames(scene_start, cut, frames_per_second));
        scene_start = cut;
    }
    ranges.push(TimeRange::from_frames(scene_start, total_frames, frames_per_second));

    ranges
}
