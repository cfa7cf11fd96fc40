//! # scenesplit
//!
//! Split a video into one clip per scene.
//!
//! `scenesplit` finds scene cuts with a content-difference detector, then
//! re-encodes every scene as a standalone clip named `scene_001.mp4`,
//! `scene_002.mp4`, ... in an output directory. Decoding and encoding go
//! through FFmpeg via the [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)
//! crate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use scenesplit::{SceneSplitError, SplitConfig};
//!
//! let config = SplitConfig::new("input_video.mp4", "output_scenes").with_threshold(30.0);
//! let report = scenesplit::split_video(&config)?;
//! println!("Detected {} scenes.", report.scenes.len());
//! # Ok::<(), SceneSplitError>(())
//! ```
//!
//! ## Pieces
//!
//! - **Detection**: [`SceneDetector`] returns ordered, contiguous
//!   [`TimeRange`]s; [`ContentDetector`] is the built-in implementation
//!   (HSV frame difference with a threshold and a minimum scene length).
//! - **Extraction**: [`extract_clips`] converts ranges to frame spans
//!   ([`FrameIndexing`]), seeks a [`FrameSource`] and copies each span into
//!   a writer from a [`ClipSink`]. Writers are opened lazily, so a scene
//!   that decodes no frames leaves no file.
//! - **Codec I/O**: [`VideoSource`] and [`ClipEncoder`] implement the
//!   source and sink traits with FFmpeg.
//! - **Progress & cancellation**: [`ProgressCallback`] and
//!   [`CancellationToken`], checked once per decoded frame.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on the system.

pub mod config;
mod conversion;
pub mod detect;
pub mod encode;
pub mod error;
pub mod extract;
pub mod ffmpeg;
pub mod metadata;
pub mod progress;
pub mod range;
pub mod source;
pub mod split;

pub use config::{SplitConfig, SplitOptions};
pub use detect::{ContentDetector, ContentDetectorOptions, SceneDetector};
pub use encode::{
    ClipEncoder, ClipEncoderOptions, ClipSink, ClipWriter, Container, FfmpegClipWriter, VideoCodec,
};
pub use error::SceneSplitError;
pub use extract::{ClipInfo, clip_file_name, extract_clips};
pub use ffmpeg::{FfmpegLogLevel, get_ffmpeg_log_level, set_ffmpeg_log_level};
pub use metadata::VideoMetadata;
pub use progress::{CancellationToken, OperationType, ProgressCallback, ProgressInfo};
pub use range::{FrameIndexing, FrameSpan, TimeRange};
pub use source::{FrameDimensions, FrameSource, VideoSource};
pub use split::{
    SplitReport, content_detector, detect_scenes, extract_scenes, split_video, split_with_detector,
};
