//! Frame-sequential video decoding.
//!
//! [`FrameSource`] is the decode side of the codec interface the extractor
//! consumes: a frame rate, a seek by frame index, and a pull of the next
//! decoded frame. [`VideoSource`] implements it on top of FFmpeg.
//!
//! A source owns a single decode cursor. Reading is strictly in
//! presentation order; a seek moves the cursor and the next call to
//! [`next_frame`](FrameSource::next_frame) yields the frame at the target
//! index (or the first frame after it if the exact index does not exist).

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational, codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder, format::context::Input, frame::Video as VideoFrame,
    media::Type,
    util::error::EAGAIN,
};

use crate::{
    conversion::{container_seek_timestamp, pts_to_frame_index, pts_to_seconds, rational_to_f64},
    error::SceneSplitError,
    metadata::VideoMetadata,
};

/// Forward seeks up to this many frames decode through instead of asking
/// the demuxer to seek.
const SEQUENTIAL_SKIP_LIMIT: u64 = 250;

/// Pixel dimensions of a decoded frame.
pub trait FrameDimensions {
    /// Frame width in pixels.
    fn frame_width(&self) -> u32;
    /// Frame height in pixels.
    fn frame_height(&self) -> u32;
}

impl FrameDimensions for VideoFrame {
    fn frame_width(&self) -> u32 {
        self.width()
    }

    fn frame_height(&self) -> u32 {
        self.height()
    }
}

/// A seekable, frame-sequential decoder.
pub trait FrameSource {
    /// The decoded frame type handed to clip writers.
    type Frame: FrameDimensions;

    /// Frames per second of the source.
    fn frame_rate(&self) -> f64;

    /// Position the cursor so the next decoded frame is `frame_index`.
    ///
    /// Seeking at or beyond the end of the source is not an error; the
    /// following [`next_frame`](FrameSource::next_frame) returns `None`.
    fn seek(&mut self, frame_index: u64) -> Result<(), SceneSplitError>;

    /// Decode the next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>, SceneSplitError>;
}

/// FFmpeg-backed [`FrameSource`] for the best video stream of a file.
///
/// # Example
///
/// ```no_run
/// use scenesplit::{FrameSource, SceneSplitError, VideoSource};
///
/// let mut source = VideoSource::open("input.mp4")?;
/// source.seek(90)?;
/// if let Some(frame) = source.next_frame()? {
///     println!("{}x{}", frame.width(), frame.height());
/// }
/// # Ok::<(), SceneSplitError>(())
/// ```
pub struct VideoSource {
    input_context: Input,
    decoder: VideoDecoder,
    stream_index: usize,
    time_base: Rational,
    /// Stream start time in stream time base; frame 0 sits here.
    start_pts: i64,
    metadata: VideoMetadata,
    /// Index of the frame the next call to `next_frame` yields.
    position: u64,
    /// Frame already decoded while landing a seek.
    pending: Option<VideoFrame>,
    /// End of input has been signalled to the decoder.
    draining: bool,
    path: PathBuf,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("path", &self.path)
            .field("stream_index", &self.stream_index)
            .field("metadata", &self.metadata)
            .field("position", &self.position)
            .field("draining", &self.draining)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open `path` and prepare a decoder for its best video stream.
    ///
    /// Initializes FFmpeg (idempotent) and probes [`VideoMetadata`].
    ///
    /// # Errors
    ///
    /// - [`SceneSplitError::FileOpen`] if the file cannot be opened or its
    ///   codec parameters cannot be read.
    /// - [`SceneSplitError::NoVideoStream`] if the file has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SceneSplitError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video source: {}", path.display());

        ffmpeg_next::init().map_err(|error| SceneSplitError::FileOpen {
            path: path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| SceneSplitError::FileOpen {
                path: path.clone(),
                reason: error.to_string(),
            })?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or(SceneSplitError::NoVideoStream)?;
        let stream_index = stream.index();
        let time_base = stream.time_base();
        let start_pts = match stream.start_time() {
            ffmpeg_sys_next::AV_NOPTS_VALUE => 0,
            start => start,
        };

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| SceneSplitError::FileOpen {
                path: path.clone(),
                reason: format!("Failed to create video decoder for stream {stream_index}: {error}"),
            })?;

        let mut frames_per_second = rational_to_f64(stream.avg_frame_rate());
        if frames_per_second <= 0.0 {
            frames_per_second = rational_to_f64(stream.rate());
        }

        let duration_microseconds = input_context.duration();
        let duration = if duration_microseconds > 0 {
            Duration::from_micros(duration_microseconds as u64)
        } else {
            Duration::ZERO
        };

        let frame_count = match stream.frames() {
            frames if frames > 0 => frames as u64,
            _ => (duration.as_secs_f64() * frames_per_second) as u64,
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
            duration,
            codec,
        };

        log::debug!(
            "Video stream {stream_index}: {}x{} @ {:.3} fps, ~{} frames ({})",
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.frame_count,
            metadata.codec,
        );

        Ok(Self {
            input_context,
            decoder,
            stream_index,
            time_base,
            start_pts,
            metadata,
            position: 0,
            pending: None,
            draining: false,
            path,
        })
    }

    /// Metadata probed when the source was opened.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Path the source was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Index of the frame the next [`next_frame`](FrameSource::next_frame)
    /// call will yield.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Index of a decoded frame derived from its timestamp.
    fn timestamp_frame_index(&self, frame: &VideoFrame) -> Option<u64> {
        frame.timestamp().or(frame.pts()).map(|pts| {
            pts_to_frame_index(
                pts.saturating_sub(self.start_pts),
                self.time_base,
                self.metadata.frames_per_second,
            )
        })
    }

    /// Pull one frame out of the decoder, feeding packets as needed.
    fn decode_next(&mut self) -> Result<Option<VideoFrame>, SceneSplitError> {
        let mut frame = VideoFrame::empty();
        loop {
            match self.decoder.receive_frame(&mut frame) {
                Ok(()) => return Ok(Some(frame)),
                Err(FfmpegError::Eof) => return Ok(None),
                Err(FfmpegError::Other { errno: EAGAIN }) if !self.draining => self.feed_decoder(),
                Err(FfmpegError::Other { errno: EAGAIN }) => return Ok(None),
                Err(error) => return Err(error.into()),
            }
        }
    }

    /// Send the next packet of our stream to the decoder, or signal end of
    /// input when the demuxer has nothing left.
    fn feed_decoder(&mut self) {
        let mut packet = Packet::empty();
        loop {
            match packet.read(&mut self.input_context) {
                Ok(()) => {
                    if packet.stream() != self.stream_index {
                        continue;
                    }
                    match self.decoder.send_packet(&packet) {
                        Ok(()) => return,
                        Err(error) => {
                            log::warn!("Skipping undecodable packet in {}: {error}", self.path.display());
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.begin_draining();
                    return;
                }
                Err(error) => {
                    log::warn!(
                        "Reading {} failed ({error}); treating it as the end of the stream",
                        self.path.display()
                    );
                    self.begin_draining();
                    return;
                }
            }
        }
    }

    fn begin_draining(&mut self) {
        if let Err(error) = self.decoder.send_eof() {
            log::debug!("Decoder rejected end of input: {error}");
        }
        self.draining = true;
    }

    /// Reposition through the demuxer, then decode forward to the target.
    fn seek_container(&mut self, frame_index: u64) -> Result<(), SceneSplitError> {
        let frames_per_second = self.metadata.frames_per_second;
        let start_offset = (pts_to_seconds(self.start_pts, self.time_base) * 1_000_000.0) as i64;
        let timestamp = container_seek_timestamp(frame_index, frames_per_second, start_offset);

        log::debug!("Seeking to frame {frame_index} (timestamp {timestamp}us)");

        self.pending = None;
        self.position = frame_index;

        if let Err(error) = self.input_context.seek(timestamp, ..timestamp) {
            log::warn!(
                "Seek to frame {frame_index} in {} failed ({error}); no further frames",
                self.path.display()
            );
            self.decoder.flush();
            self.draining = true;
            return Ok(());
        }
        self.decoder.flush();
        self.draining = false;

        while let Some(frame) = self.decode_next()? {
            let landed = self.timestamp_frame_index(&frame).unwrap_or(frame_index);
            if landed >= frame_index {
                self.pending = Some(frame);
                break;
            }
        }
        Ok(())
    }
}

impl FrameSource for VideoSource {
    type Frame = VideoFrame;

    fn frame_rate(&self) -> f64 {
        self.metadata.frames_per_second
    }

    fn seek(&mut self, frame_index: u64) -> Result<(), SceneSplitError> {
        if frame_index == self.position {
            return Ok(());
        }

        if frame_index > self.position && frame_index - self.position <= SEQUENTIAL_SKIP_LIMIT {
            log::debug!("Skipping forward from frame {} to {frame_index}", self.position);
            while self.position < frame_index {
                if self.next_frame()?.is_none() {
                    self.position = frame_index;
                    break;
                }
            }
            return Ok(());
        }

        self.seek_container(frame_index)
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, SceneSplitError> {
        let frame = match self.pending.take() {
            Some(frame) => Some(frame),
            None => self.decode_next()?,
        };
        if frame.is_some() {
            self.position += 1;
        }
        Ok(frame)
    }
}
