//! Scene boundary detection.
//!
//! [`SceneDetector`] is the boundary oracle the splitter consumes: given a
//! video it returns ordered, contiguous [`TimeRange`]s covering the whole
//! video. [`ContentDetector`] is the built-in implementation. It compares
//! each decoded frame with the previous one in HSV space and registers a
//! cut wherever the average channel difference reaches the threshold.
//!
//! # Example
//!
//! ```no_run
//! use scenesplit::{ContentDetector, ContentDetectorOptions, SceneDetector, SceneSplitError};
//!
//! let mut detector = ContentDetector::new(ContentDetectorOptions::new().threshold(27.0));
//! for scene in detector.detect("input.mp4".as_ref())? {
//!     println!("{scene}");
//! }
//! # Ok::<(), SceneSplitError>(())
//! ```

use std::{path::Path, sync::Arc};

use ffmpeg_next::{
    format::Pixel,
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::{
    error::SceneSplitError,
    progress::{CancellationToken, NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
    range::{TimeRange, ranges_from_cuts},
    source::{FrameSource, VideoSource},
};

/// Default content threshold.
pub const DEFAULT_THRESHOLD: f64 = 30.0;

/// Default minimum scene length in frames.
pub const DEFAULT_MIN_SCENE_LEN: u64 = 15;

/// Default width frames are scaled down to before comparison.
pub const DEFAULT_ANALYSIS_WIDTH: u32 = 256;

/// Finds scene boundaries in a video.
pub trait SceneDetector {
    /// Detect the scenes of the video at `path`.
    ///
    /// Returned ranges are ordered, non-overlapping and contiguous, starting
    /// at zero. A video without cuts is a single scene.
    fn detect(&mut self, path: &Path) -> Result<Vec<TimeRange>, SceneSplitError>;
}

/// Settings for [`ContentDetector`].
#[derive(Debug, Clone, PartialEq)]
pub struct ContentDetectorOptions {
    /// Minimum average HSV difference (0–255 scale) between consecutive
    /// frames for a cut. Lower values detect more cuts. Default: 30.0.
    pub threshold: f64,
    /// Minimum number of frames between two cuts (and before the first).
    /// Default: 15.
    pub min_scene_len: u64,
    /// Frames wider than this are scaled down before comparison.
    /// Default: 256.
    pub analysis_width: u32,
}

impl Default for ContentDetectorOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_scene_len: DEFAULT_MIN_SCENE_LEN,
            analysis_width: DEFAULT_ANALYSIS_WIDTH,
        }
    }
}

impl ContentDetectorOptions {
    /// Options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cut threshold.
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the minimum scene length in frames.
    pub fn min_scene_len(mut self, frames: u64) -> Self {
        self.min_scene_len = frames;
        self
    }

    /// Set the maximum analysis width in pixels (minimum 1).
    pub fn analysis_width(mut self, width: u32) -> Self {
        self.analysis_width = width.max(1);
        self
    }
}

/// Content-difference scene detector.
pub struct ContentDetector {
    options: ContentDetectorOptions,
    progress: Arc<dyn ProgressCallback>,
    cancellation: Option<CancellationToken>,
    batch_size: u64,
}

impl ContentDetector {
    /// Create a detector with the given options.
    pub fn new(options: ContentDetectorOptions) -> Self {
        Self {
            options,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
        }
    }

    /// Report progress while detecting, every `batch_size` frames.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>, batch_size: u64) -> Self {
        self.progress = callback;
        self.batch_size = batch_size.max(1);
        self
    }

    /// Stop with [`SceneSplitError::Cancelled`] once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Options in effect.
    pub fn options(&self) -> &ContentDetectorOptions {
        &self.options
    }

    /// Detect cut frame indices in an already-open source.
    ///
    /// Returns the cuts and the number of frames decoded.
    pub fn detect_cuts(
        &mut self,
        source: &mut VideoSource,
    ) -> Result<(Vec<u64>, u64), SceneSplitError> {
        let threshold = self.options.threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(SceneSplitError::InvalidThreshold(threshold));
        }

        log::debug!(
            "Detecting scenes in {} (threshold={threshold}, min_scene_len={})",
            source.path().display(),
            self.options.min_scene_len,
        );

        let mut tracker = ProgressTracker::new(
            self.progress.clone(),
            OperationType::SceneDetection,
            Some(source.metadata().frame_count),
            self.batch_size,
        );
        let mut analyzer = FrameAnalyzer::new(self.options.analysis_width);
        let mut filter = CutFilter::new(threshold, self.options.min_scene_len);

        let mut previous: Option<HsvFrame> = None;
        let mut cuts = Vec::new();
        let mut frame_index: u64 = 0;

        while let Some(frame) = source.next_frame()? {
            if self
                .cancellation
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                return Err(SceneSplitError::Cancelled);
            }

            let current = analyzer.analyze(&frame)?;
            if let Some(previous) = &previous {
                let score = current.content_score(previous);
                log::trace!("Frame {frame_index}: content score {score:.3}");
                if filter.observe(frame_index, score) {
                    log::debug!("Scene cut at frame {frame_index} (score {score:.2})");
                    cuts.push(frame_index);
                }
            }
            previous = Some(current);

            tracker.advance(Some(frame_index), None);
            frame_index += 1;
        }
        tracker.finish();

        Ok((cuts, frame_index))
    }
}

impl SceneDetector for ContentDetector {
    fn detect(&mut self, path: &Path) -> Result<Vec<TimeRange>, SceneSplitError> {
        let mut source = VideoSource::open(path)?;
        let frames_per_second = source.frame_rate();
        if !frames_per_second.is_finite() || frames_per_second <= 0.0 {
            return Err(SceneSplitError::InvalidFrameRate(frames_per_second));
        }

        let (cuts, total_frames) = self.detect_cuts(&mut source)?;
        Ok(ranges_from_cuts(&cuts, total_frames, frames_per_second))
    }
}

/// Decides which scored frames become cuts.
#[derive(Debug, Clone)]
pub(crate) struct CutFilter {
    threshold: f64,
    min_scene_len: u64,
    last_cut: u64,
}

impl CutFilter {
    pub(crate) fn new(threshold: f64, min_scene_len: u64) -> Self {
        Self {
            threshold,
            min_scene_len,
            last_cut: 0,
        }
    }

    /// Returns `true` if `frame_index` starts a new scene.
    pub(crate) fn observe(&mut self, frame_index: u64, score: f64) -> bool {
        if score >= self.threshold && frame_index.saturating_sub(self.last_cut) >= self.min_scene_len {
            self.last_cut = frame_index;
            true
        } else {
            false
        }
    }
}

/// A frame split into 8-bit hue (0–179), saturation and value planes.
#[derive(Debug, Clone)]
pub(crate) struct HsvFrame {
    hue: Vec<u8>,
    saturation: Vec<u8>,
    value: Vec<u8>,
}

impl HsvFrame {
    pub(crate) fn from_rgb(image: &RgbImage) -> Self {
        let pixels = (image.width() as usize) * (image.height() as usize);
        let mut hue = Vec::with_capacity(pixels);
        let mut saturation = Vec::with_capacity(pixels);
        let mut value = Vec::with_capacity(pixels);

        for pixel in image.pixels() {
            let (h, s, v) = rgb_to_hsv(pixel[0], pixel[1], pixel[2]);
            hue.push(h);
            saturation.push(s);
            value.push(v);
        }

        Self {
            hue,
            saturation,
            value,
        }
    }

    /// Mean of the per-channel mean absolute differences.
    pub(crate) fn content_score(&self, other: &HsvFrame) -> f64 {
        if self.hue.len() != other.hue.len() || self.hue.is_empty() {
            return if self.hue.len() == other.hue.len() { 0.0 } else { f64::INFINITY };
        }

        let delta_hue = mean_abs_difference(&self.hue, &other.hue);
        let delta_saturation = mean_abs_difference(&self.saturation, &other.saturation);
        let delta_value = mean_abs_difference(&self.value, &other.value);
        (delta_hue + delta_saturation + delta_value) / 3.0
    }
}

fn mean_abs_difference(a: &[u8], b: &[u8]) -> f64 {
    let total: u64 = a
        .iter()
        .zip(b)
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum();
    total as f64 / a.len() as f64
}

/// 8-bit RGB to HSV with hue halved into 0–179.
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let (r, g, b) = (f64::from(r), f64::from(g), f64::from(b));
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let mut hue = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (g - b) / delta
    } else if max == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    (
        ((hue / 2.0).round() as u8).min(179),
        saturation.round() as u8,
        max as u8,
    )
}

/// Scales decoded frames to the analysis size and converts them to HSV.
struct FrameAnalyzer {
    max_width: u32,
    /// Converter from the current source layout to RGB24 at analysis size.
    scaler: Option<(ScalingContext, Pixel, u32, u32)>,
    /// Analysis size, fixed by the first frame.
    size: Option<(u32, u32)>,
}

impl FrameAnalyzer {
    fn new(max_width: u32) -> Self {
        Self {
            max_width: max_width.max(1),
            scaler: None,
            size: None,
        }
    }

    fn analyze(&mut self, frame: &VideoFrame) -> Result<HsvFrame, SceneSplitError> {
        let (width, height) = *self
            .size
            .get_or_insert_with(|| analysis_size(frame.width(), frame.height(), self.max_width));

        let layout = (frame.format(), frame.width(), frame.height());
        let stale = self
            .scaler
            .as_ref()
            .is_none_or(|(_, format, w, h)| (*format, *w, *h) != layout);
        if stale {
            let context = ScalingContext::get(
                layout.0,
                layout.1,
                layout.2,
                Pixel::RGB24,
                width,
                height,
                ScalingFlags::AREA,
            )
            .map_err(|e| SceneSplitError::VideoDecodeError(format!("cannot create scaler: {e}")))?;
            self.scaler = Some((context, layout.0, layout.1, layout.2));
        }

        let mut rgb_frame = VideoFrame::empty();
        if let Some((scaler, ..)) = self.scaler.as_mut() {
            scaler
                .run(frame, &mut rgb_frame)
                .map_err(|e| SceneSplitError::VideoDecodeError(format!("scaling failed: {e}")))?;
        }

        let buffer = packed_rgb(&rgb_frame, width, height);
        let image = RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            SceneSplitError::VideoDecodeError("scaled frame has an unexpected size".to_string())
        })?;
        Ok(HsvFrame::from_rgb(&image))
    }
}

/// Largest size no wider than `max_width` that keeps the aspect ratio.
fn analysis_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width.max(1), height.max(1));
    }
    let scaled_height = (f64::from(height) * f64::from(max_width) / f64::from(width)).round() as u32;
    (max_width, scaled_height.max(1))
}

/// Copy an RGB24 frame into a tightly packed buffer, dropping row padding.
fn packed_rgb(frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let row_len = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_len {
        return data[..row_len * height as usize].to_vec();
    }

    let mut buffer = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        buffer.extend_from_slice(&data[start..start + row_len]);
    }
    buffer
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    fn solid(width: u32, height: u32, color: [u8; 3]) -> HsvFrame {
        HsvFrame::from_rgb(&RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn hsv_primaries() {
        assert_eq!(rgb_to_hsv(255, 0, 0), (0, 255, 255));
        assert_eq!(rgb_to_hsv(0, 255, 0), (60, 255, 255));
        assert_eq!(rgb_to_hsv(0, 0, 255), (120, 255, 255));
        assert_eq!(rgb_to_hsv(0, 0, 0), (0, 0, 0));
        assert_eq!(rgb_to_hsv(128, 128, 128), (0, 0, 128));
    }

    #[test]
    fn identical_frames_score_zero() {
        let a = solid(16, 9, [10, 200, 30]);
        let b = solid(16, 9, [10, 200, 30]);
        assert_eq!(a.content_score(&b), 0.0);
    }

    #[test]
    fn black_to_white_scores_a_third_of_full_scale() {
        let black = solid(8, 8, [0, 0, 0]);
        let white = solid(8, 8, [255, 255, 255]);
        assert!((black.content_score(&white) - 85.0).abs() < 1e-9);
    }

    #[test]
    fn hard_color_cut_exceeds_default_threshold() {
        let red = solid(8, 8, [220, 20, 20]);
        let blue = solid(8, 8, [20, 20, 220]);
        assert!(red.content_score(&blue) > DEFAULT_THRESHOLD);
    }

    #[test]
    fn small_brightness_change_stays_below_threshold() {
        let a = solid(8, 8, [100, 100, 100]);
        let b = solid(8, 8, [110, 110, 110]);
        assert!(a.content_score(&b) < DEFAULT_THRESHOLD);
    }

    #[test]
    fn cut_filter_enforces_min_scene_len() {
        let mut filter = CutFilter::new(30.0, 15);
        assert!(!filter.observe(10, 90.0), "too close to the start");
        assert!(filter.observe(15, 90.0));
        assert!(!filter.observe(20, 90.0), "too close to the previous cut");
        assert!(!filter.observe(40, 29.9));
        assert!(filter.observe(40, 30.0));
    }

    #[test]
    fn zero_min_scene_len_accepts_every_strong_frame() {
        let mut filter = CutFilter::new(10.0, 0);
        assert!(filter.observe(1, 50.0));
        assert!(filter.observe(2, 50.0));
    }

    #[test]
    fn analysis_size_keeps_aspect_ratio() {
        assert_eq!(analysis_size(1920, 1080, 256), (256, 144));
        assert_eq!(analysis_size(160, 90, 256), (160, 90));
        assert_eq!(analysis_size(1000, 1, 256), (256, 1));
    }

    #[test]
    fn detector_options_builder() {
        let options = ContentDetectorOptions::new()
            .threshold(12.0)
            .min_scene_len(4)
            .analysis_width(0);
        assert_eq!(options.threshold, 12.0);
        assert_eq!(options.min_scene_len, 4);
        assert_eq!(options.analysis_width, 1);
    }
}
