//! Progress reporting and cancellation.
//!
//! [`ProgressCallback`] observes scene detection and clip extraction as they
//! run; [`CancellationToken`] asks them to stop. Both are attached through
//! [`SplitOptions`](crate::SplitOptions).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use scenesplit::{ProgressCallback, ProgressInfo, SplitConfig, SplitOptions, SceneSplitError};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("[{:?}] {} frames", info.operation, info.current);
//!     }
//! }
//!
//! let options = SplitOptions::new().with_progress(Arc::new(PrintProgress)).with_batch_size(100);
//! let config = SplitConfig::new("input.mp4", "output_scenes").with_options(options);
//! scenesplit::split_video(&config)?;
//! # Ok::<(), SceneSplitError>(())
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// The phase of a split that a progress report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Decoding the whole source to find scene cuts.
    SceneDetection,
    /// Re-encoding scenes into clips.
    ClipExtraction,
}

/// A snapshot of progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Which phase is running.
    pub operation: OperationType,
    /// Frames processed so far in this phase.
    pub current: u64,
    /// Frames expected in this phase, if known.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the phase started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on throughput so far.
    pub estimated_remaining: Option<Duration>,
    /// Source frame index most recently processed.
    pub current_frame: Option<u64>,
    /// 1-based ordinal of the clip being written (extraction only).
    pub current_clip: Option<usize>,
}

/// Receives progress updates.
///
/// Callbacks observe but cannot halt the work; use [`CancellationToken`]
/// for that.
pub trait ProgressCallback: Send + Sync {
    /// Called every `batch_size` frames and once when a phase ends.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Cooperative cancellation flag shared between clones.
///
/// Detection and extraction check it once per decoded frame.
///
/// # Example
///
/// ```
/// use scenesplit::CancellationToken;
///
/// let token = CancellationToken::new();
/// let handle = token.clone();
/// handle.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation; every clone observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks timing for one phase and fires the callback in batches.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total: total.filter(|&total| total > 0),
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            since_last_report: 0,
        }
    }

    /// Record one processed frame.
    pub(crate) fn advance(&mut self, frame_index: Option<u64>, clip: Option<usize>) {
        self.current += 1;
        self.since_last_report += 1;

        if self.since_last_report >= self.batch_size {
            self.report(frame_index, clip);
            self.since_last_report = 0;
        }
    }

    /// Emit a final report for the phase.
    pub(crate) fn finish(&mut self) {
        self.report(None, None);
    }

    fn report(&self, frame_index: Option<u64>, clip: Option<usize>) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .map(|total| (self.current.min(total) as f32 / total as f32) * 100.0);

        let estimated_remaining = match (self.total, self.current) {
            (Some(total), current) if current > 0 => {
                let remaining = total.saturating_sub(current);
                Some(elapsed.mul_f64(remaining as f64 / current as f64))
            }
            _ => None,
        };

        self.callback.on_progress(&ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_frame: frame_index,
            current_clip: clip,
        });
    }
}
