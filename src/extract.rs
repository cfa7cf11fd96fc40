//! Segment extraction: re-encode each scene as its own clip.
//!
//! [`extract_clips`] walks the scene ranges in order over a single
//! [`FrameSource`]. For each range it converts the boundaries to frame
//! indices, seeks the source to the first frame and copies frames into a
//! writer from the [`ClipSink`] until the range's frame budget is spent or
//! the source runs out. The writer is opened lazily with the first decoded
//! frame's dimensions, so a range that decodes no frames leaves no file
//! behind.

use std::path::{Path, PathBuf};

use crate::{
    config::SplitOptions,
    encode::{ClipSink, ClipWriter},
    error::SceneSplitError,
    progress::{OperationType, ProgressTracker},
    range::{FrameSpan, TimeRange, frame_spans},
    source::{FrameDimensions, FrameSource},
};

/// A clip written by [`extract_clips`].
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    /// 1-based position of the scene in the detector's output.
    pub ordinal: usize,
    /// Where the clip was written.
    pub path: PathBuf,
    /// Scene the clip was cut from.
    pub range: TimeRange,
    /// Source frames the scene maps to.
    pub span: FrameSpan,
    /// Frames actually written (fewer than `span.len()` if the source ended early).
    pub frame_count: u64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second the clip was encoded at.
    pub frame_rate: f64,
}

/// File name of the clip for the scene at 1-based `ordinal`.
///
/// ```
/// assert_eq!(scenesplit::clip_file_name(7, "mp4"), "scene_007.mp4");
/// ```
pub fn clip_file_name(ordinal: usize, extension: &str) -> String {
    format!("scene_{ordinal:03}.{extension}")
}

/// A clip whose writer is created by the first frame written to it.
struct PendingClip<W> {
    ordinal: usize,
    path: PathBuf,
    range: TimeRange,
    span: FrameSpan,
    frame_rate: f64,
    writer: Option<W>,
    frame_count: u64,
    width: u32,
    height: u32,
}

impl<W> PendingClip<W> {
    fn new(ordinal: usize, path: PathBuf, range: TimeRange, span: FrameSpan, frame_rate: f64) -> Self {
        Self {
            ordinal,
            path,
            range,
            span,
            frame_rate,
            writer: None,
            frame_count: 0,
            width: 0,
            height: 0,
        }
    }

    fn write<F, K>(&mut self, sink: &mut K, frame: &F) -> Result<(), SceneSplitError>
    where
        F: FrameDimensions,
        W: ClipWriter<F>,
        K: ClipSink<F, Writer = W>,
    {
        if self.writer.is_none() {
            self.width = frame.frame_width();
            self.height = frame.frame_height();
            self.writer = Some(sink.open(&self.path, self.frame_rate, self.width, self.height)?);
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.write(frame)?;
        }
        self.frame_count += 1;
        Ok(())
    }

    /// Close the writer if one was opened.
    fn finish<F>(self) -> Result<Option<ClipInfo>, SceneSplitError>
    where
        W: ClipWriter<F>,
    {
        let Some(writer) = self.writer else {
            return Ok(None);
        };
        writer.finish()?;
        Ok(Some(ClipInfo {
            ordinal: self.ordinal,
            path: self.path,
            range: self.range,
            span: self.span,
            frame_count: self.frame_count,
            width: self.width,
            height: self.height,
            frame_rate: self.frame_rate,
        }))
    }
}

/// Write one clip per range into `output_dir`.
///
/// Ranges are processed strictly in order over the shared decode cursor of
/// `source`. Clip `i` (1-based) is named by [`clip_file_name`] with
/// `extension`. Ranges that decode no frames produce no file and no
/// [`ClipInfo`], but still consume their ordinal.
///
/// # Errors
///
/// - [`SceneSplitError::InvalidFrameRate`] if the source has no usable rate.
/// - [`SceneSplitError::Cancelled`] if the options' token is cancelled; the
///   clip in progress is finalized first.
/// - Any error from seeking, decoding, opening or writing a clip.
pub fn extract_clips<S, K>(
    source: &mut S,
    sink: &mut K,
    ranges: &[TimeRange],
    output_dir: &Path,
    extension: &str,
    options: &SplitOptions,
) -> Result<Vec<ClipInfo>, SceneSplitError>
where
    S: FrameSource,
    K: ClipSink<S::Frame>,
{
    let frame_rate = source.frame_rate();
    if !frame_rate.is_finite() || frame_rate <= 0.0 {
        return Err(SceneSplitError::InvalidFrameRate(frame_rate));
    }

    let spans = frame_spans(ranges, frame_rate, options.frame_indexing);
    let planned_frames = spans.iter().map(FrameSpan::len).sum();
    let mut tracker = ProgressTracker::new(
        options.progress.clone(),
        OperationType::ClipExtraction,
        Some(planned_frames),
        options.batch_size,
    );

    let mut clips = Vec::with_capacity(ranges.len());

    for (position, (range, span)) in ranges.iter().zip(&spans).enumerate() {
        let ordinal = position + 1;
        let path = output_dir.join(clip_file_name(ordinal, extension));

        log::debug!(
            "Scene {ordinal}: {range} -> frames {}..{}",
            span.start,
            span.end
        );

        if span.is_empty() {
            log::warn!("Scene {ordinal} ({range}) is shorter than one frame; no clip written");
            continue;
        }

        source.seek(span.start)?;

        let mut clip = PendingClip::<K::Writer>::new(ordinal, path, *range, *span, frame_rate);
        let mut frame_index = span.start;
        let mut cancelled = false;

        while frame_index < span.end {
            let Some(frame) = source.next_frame()? else {
                log::debug!("Source ended at frame {frame_index}, inside scene {ordinal}");
                break;
            };
            if options.is_cancelled() {
                cancelled = true;
                break;
            }
            clip.write(sink, &frame)?;
            tracker.advance(Some(frame_index), Some(ordinal));
            frame_index += 1;
        }

        match clip.finish::<S::Frame>()? {
            Some(info) => {
                log::info!(
                    "Wrote {} ({} frames, {}x{})",
                    info.path.display(),
                    info.frame_count,
                    info.width,
                    info.height
                );
                clips.push(info);
            }
            None => log::warn!("Scene {ordinal} ({range}) decoded no frames; no clip written"),
        }

        if cancelled {
            return Err(SceneSplitError::Cancelled);
        }
    }

    tracker.finish();
    Ok(clips)
}
