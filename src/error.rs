//! Error types for the `scenesplit` crate.
//!
//! [`SceneSplitError`] is returned by every fallible operation in the crate.
//! Variants carry the path, range or upstream message involved so callers
//! can report a failure without extra logging.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `scenesplit` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SceneSplitError {
    /// The input video could not be opened.
    #[error("Failed to open media file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// The source reports a frame rate that cannot be used to convert
    /// timestamps to frame indices.
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f64),

    /// A time range whose start is not strictly before its end.
    #[error("Invalid range: start ({start}s) must be less than end ({end}s)")]
    InvalidRange {
        /// Start of the range in seconds.
        start: f64,
        /// End of the range in seconds.
        end: f64,
    },

    /// A detection threshold that is negative or not a number.
    #[error("Invalid scene detection threshold: {0}")]
    InvalidThreshold(f64),

    /// A video frame could not be decoded or converted.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The encoder could not be found, configured, or fed.
    #[error("Video encoding error: {0}")]
    VideoEncodeError(String),

    /// Writing the output container failed.
    #[error("Video write error: {0}")]
    VideoWriteError(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while creating directories or files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// The operation was cancelled via a [`CancellationToken`](crate::CancellationToken).
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<FfmpegError> for SceneSplitError {
    fn from(error: FfmpegError) -> Self {
        SceneSplitError::FfmpegError(error.to_string())
    }
}
