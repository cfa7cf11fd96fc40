//! Split configuration.
//!
//! [`SplitConfig`] names the input, the output directory and the detection
//! threshold; [`SplitOptions`] carries everything else (detector tuning,
//! output codec, boundary rounding, progress and cancellation) so the
//! entry point takes a single value.
//!
//! # Example
//!
//! ```
//! use scenesplit::{Container, FrameIndexing, SplitConfig, SplitOptions, VideoCodec};
//!
//! let options = SplitOptions::new()
//!     .with_min_scene_len(24)
//!     .with_codec(VideoCodec::H264)
//!     .with_container(Container::Mkv)
//!     .with_frame_indexing(FrameIndexing::Cumulative);
//! let config = SplitConfig::new("input.mp4", "scenes")
//!     .with_threshold(27.0)
//!     .with_options(options);
//! assert_eq!(config.threshold, 27.0);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::sync::Arc;

use crate::{
    detect::{ContentDetectorOptions, DEFAULT_MIN_SCENE_LEN, DEFAULT_THRESHOLD},
    encode::{ClipEncoderOptions, Container, VideoCodec},
    progress::{CancellationToken, NoOpProgress, ProgressCallback},
    range::FrameIndexing,
};

/// Operational settings for a split.
#[derive(Clone)]
pub struct SplitOptions {
    /// Minimum scene length in frames.
    pub(crate) min_scene_len: u64,
    /// How clips are encoded.
    pub(crate) encoder: ClipEncoderOptions,
    /// How scene boundaries in seconds become frame indices.
    pub(crate) frame_indexing: FrameIndexing,
    /// Progress callback. Defaults to a no-op.
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// Cancellation token. `None` means never cancelled.
    pub(crate) cancellation: Option<CancellationToken>,
    /// Fire the progress callback every N frames.
    pub(crate) batch_size: u64,
}

impl Debug for SplitOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SplitOptions")
            .field("min_scene_len", &self.min_scene_len)
            .field("encoder", &self.encoder)
            .field("frame_indexing", &self.frame_indexing)
            .field("has_cancellation", &self.cancellation.is_some())
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SplitOptions {
    /// Defaults: 15-frame minimum scene, MPEG-4 in MP4 with staged writes,
    /// floor boundary rounding, no progress, no cancellation, batch size 1.
    pub fn new() -> Self {
        Self {
            min_scene_len: DEFAULT_MIN_SCENE_LEN,
            encoder: ClipEncoderOptions::default(),
            frame_indexing: FrameIndexing::Floor,
            progress: Arc::new(NoOpProgress),
            cancellation: None,
            batch_size: 1,
        }
    }

    /// Require at least `frames` frames between two cuts.
    #[must_use]
    pub fn with_min_scene_len(mut self, frames: u64) -> Self {
        self.min_scene_len = frames;
        self
    }

    /// Set the output codec.
    #[must_use]
    pub fn with_codec(mut self, codec: VideoCodec) -> Self {
        self.encoder.codec = codec;
        self
    }

    /// Set the output container (and therefore the clip file extension).
    #[must_use]
    pub fn with_container(mut self, container: Container) -> Self {
        self.encoder.container = container;
        self
    }

    /// Replace all encoder settings.
    #[must_use]
    pub fn with_encoder(mut self, encoder: ClipEncoderOptions) -> Self {
        self.encoder = encoder;
        self
    }

    /// Write clips under a temporary name and rename them when complete.
    #[must_use]
    pub fn with_staged_writes(mut self, staged: bool) -> Self {
        self.encoder.staged_writes = staged;
        self
    }

    /// Choose how range boundaries are converted to frame indices.
    #[must_use]
    pub fn with_frame_indexing(mut self, indexing: FrameIndexing) -> Self {
        self.frame_indexing = indexing;
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Attach a cancellation token.
    ///
    /// When cancelled, the split stops at the next decoded frame and
    /// returns [`SceneSplitError::Cancelled`](crate::SceneSplitError::Cancelled).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Fire the progress callback every `size` frames (minimum 1).
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Encoder settings in effect.
    pub fn encoder(&self) -> &ClipEncoderOptions {
        &self.encoder
    }

    /// Boundary rounding in effect.
    pub fn frame_indexing(&self) -> FrameIndexing {
        self.frame_indexing
    }

    /// Minimum scene length in frames.
    pub fn min_scene_len(&self) -> u64 {
        self.min_scene_len
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Everything [`split_video`](crate::split_video) needs.
#[derive(Debug, Clone)]
pub struct SplitConfig {
    /// Video to split.
    pub input: PathBuf,
    /// Directory clips are written to; created if missing.
    pub output_dir: PathBuf,
    /// Scene detection threshold. Lower values detect more scenes.
    pub threshold: f64,
    /// Operational settings.
    pub options: SplitOptions,
}

impl SplitConfig {
    /// Configuration with the default threshold and options.
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            threshold: DEFAULT_THRESHOLD,
            options: SplitOptions::default(),
        }
    }

    /// Set the detection threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Replace the operational settings.
    #[must_use]
    pub fn with_options(mut self, options: SplitOptions) -> Self {
        self.options = options;
        self
    }

    /// Detector settings derived from this configuration.
    pub fn detector_options(&self) -> ContentDetectorOptions {
        ContentDetectorOptions::new()
            .threshold(self.threshold)
            .min_scene_len(self.options.min_scene_len)
    }
}
