//! Clip encoding: write decoded frames into standalone video files.
//!
//! [`ClipSink`] and [`ClipWriter`] are the encode side of the codec
//! interface the extractor consumes. [`ClipEncoder`] implements them with
//! FFmpeg: it re-encodes decoded source frames with a fixed [`VideoCodec`]
//! into a [`Container`], preserving the source frame rate and dimensions.
//!
//! # Example
//!
//! ```no_run
//! use scenesplit::{ClipEncoder, ClipEncoderOptions, ClipSink, ClipWriter, FrameSource,
//!     SceneSplitError, VideoCodec, VideoSource};
//!
//! let mut source = VideoSource::open("input.mp4")?;
//! let mut sink = ClipEncoder::new(ClipEncoderOptions::default().codec(VideoCodec::Mpeg4));
//! if let Some(first) = source.next_frame()? {
//!     let mut writer = sink.open(
//!         "first_frame.mp4".as_ref(),
//!         source.frame_rate(),
//!         first.width(),
//!         first.height(),
//!     )?;
//!     writer.write(&first)?;
//!     writer.finish()?;
//! }
//! # Ok::<(), SceneSplitError>(())
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use ffmpeg_next::{
    Dictionary, Packet, Rational,
    codec::{Id, context::Context as CodecContext},
    encoder::Video as OpenedVideoEncoder,
    format::{Flags as FormatFlags, Pixel, context::Output},
    frame::Video as VideoFrame,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::{conversion::encoder_frame_rate, error::SceneSplitError};

/// Bits per pixel per frame used to pick a bit rate when none is set for
/// codecs without a constant-quality mode.
const DEFAULT_BITS_PER_PIXEL: f64 = 0.15;

/// Suffix appended to a clip's file name while it is being written.
pub const STAGING_SUFFIX: &str = "partial";

/// Opens one writer per clip.
pub trait ClipSink<F> {
    /// Writer produced for a single clip.
    type Writer: ClipWriter<F>;

    /// Create a clip at `path` with the given frame rate and dimensions.
    fn open(
        &mut self,
        path: &Path,
        frame_rate: f64,
        width: u32,
        height: u32,
    ) -> Result<Self::Writer, SceneSplitError>;
}

/// Appends frames to one clip.
pub trait ClipWriter<F> {
    /// Encode and append one frame.
    fn write(&mut self, frame: &F) -> Result<(), SceneSplitError>;

    /// Flush buffered output and close the clip.
    fn finish(self) -> Result<(), SceneSplitError>;
}

/// Supported output video codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    /// MPEG-4 Part 2 (`mp4v`). Built into every FFmpeg.
    #[default]
    Mpeg4,
    /// H.264 / AVC.
    H264,
    /// H.265 / HEVC.
    H265,
}

impl VideoCodec {
    fn codec_id(self) -> Id {
        match self {
            VideoCodec::Mpeg4 => Id::MPEG4,
            VideoCodec::H264 => Id::H264,
            VideoCodec::H265 => Id::HEVC,
        }
    }

    fn input_pixel_format(self) -> Pixel {
        Pixel::YUV420P
    }

    fn supports_crf(self) -> bool {
        matches!(self, VideoCodec::H264 | VideoCodec::H265)
    }
}

/// Output container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Container {
    /// MPEG-4 Part 14.
    #[default]
    Mp4,
    /// Matroska.
    Mkv,
    /// QuickTime.
    Mov,
    /// Audio Video Interleave.
    Avi,
}

impl Container {
    /// File extension used for clips in this container.
    pub fn extension(self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mkv => "mkv",
            Container::Mov => "mov",
            Container::Avi => "avi",
        }
    }

    /// FFmpeg muxer name.
    fn muxer_name(self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mkv => "matroska",
            Container::Mov => "mov",
            Container::Avi => "avi",
        }
    }
}

/// Options for [`ClipEncoder`].
#[derive(Debug, Clone)]
pub struct ClipEncoderOptions {
    /// Codec used for every clip. Default: MPEG-4 Part 2.
    pub codec: VideoCodec,
    /// Container used for every clip. Default: MP4.
    pub container: Container,
    /// Constant Rate Factor for H.264/H.265 (0-51, lower is better).
    pub crf: Option<u32>,
    /// Bit rate in bits per second. Overrides CRF when set.
    pub bitrate: Option<usize>,
    /// Write each clip under a `.partial` name and rename it on finish.
    pub staged_writes: bool,
}

impl Default for ClipEncoderOptions {
    fn default() -> Self {
        Self {
            codec: VideoCodec::Mpeg4,
            container: Container::Mp4,
            crf: Some(23),
            bitrate: None,
            staged_writes: true,
        }
    }
}

impl ClipEncoderOptions {
    /// Set the codec.
    pub fn codec(mut self, codec: VideoCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Set the container.
    pub fn container(mut self, container: Container) -> Self {
        self.container = container;
        self
    }

    /// Set the CRF quality value.
    pub fn crf(mut self, crf: u32) -> Self {
        self.crf = Some(crf);
        self
    }

    /// Set the target bitrate in bits per second.
    pub fn bitrate(mut self, bitrate: usize) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// Enable or disable staged writes.
    pub fn staged_writes(mut self, staged: bool) -> Self {
        self.staged_writes = staged;
        self
    }
}

/// Path a clip is written to while it is still open.
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(STAGING_SUFFIX);
    PathBuf::from(name)
}

/// FFmpeg [`ClipSink`] for decoded video frames.
#[derive(Debug, Clone, Default)]
pub struct ClipEncoder {
    options: ClipEncoderOptions,
}

impl ClipEncoder {
    /// Create a clip encoder with the given options.
    pub fn new(options: ClipEncoderOptions) -> Self {
        Self { options }
    }

    /// The options clips are written with.
    pub fn options(&self) -> &ClipEncoderOptions {
        &self.options
    }
}

impl ClipSink<VideoFrame> for ClipEncoder {
    type Writer = FfmpegClipWriter;

    /// # Errors
    ///
    /// - [`SceneSplitError::VideoWriteError`] if the output cannot be created
    ///   or its header cannot be written.
    /// - [`SceneSplitError::VideoEncodeError`] if the codec is unavailable or
    ///   rejects the configuration.
    fn open(
        &mut self,
        path: &Path,
        frame_rate: f64,
        width: u32,
        height: u32,
    ) -> Result<FfmpegClipWriter, SceneSplitError> {
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return Err(SceneSplitError::InvalidFrameRate(frame_rate));
        }

        ffmpeg_next::init()
            .map_err(|e| SceneSplitError::VideoEncodeError(format!("FFmpeg init failed: {e}")))?;

        let codec = self.options.codec;
        let target_pixel = codec.input_pixel_format();
        let rate = encoder_frame_rate(frame_rate);
        let encoder_time_base = rate.invert();

        let staging = self.options.staged_writes.then(|| staging_path(path));
        let write_path = staging.as_deref().unwrap_or(path);

        log::debug!(
            "Opening clip {} ({width}x{height} @ {frame_rate:.3} fps, codec={codec:?})",
            write_path.display(),
        );

        let mut output = ffmpeg_next::format::output_as(&write_path, self.options.container.muxer_name())
            .map_err(|e| SceneSplitError::VideoWriteError(format!("cannot open output: {e}")))?;

        let needs_global_header = output.format().flags().contains(FormatFlags::GLOBAL_HEADER);

        let encoder_codec = ffmpeg_next::encoder::find(codec.codec_id()).ok_or_else(|| {
            SceneSplitError::VideoEncodeError(format!("codec {:?} not available", codec.codec_id()))
        })?;

        let mut stream = output
            .add_stream(encoder_codec)
            .map_err(|e| SceneSplitError::VideoWriteError(format!("cannot add stream: {e}")))?;
        let stream_index = stream.index();

        let mut encoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.encoder().video())
            .map_err(|e| SceneSplitError::VideoEncodeError(format!("cannot create encoder: {e}")))?;

        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(target_pixel);
        encoder.set_time_base(encoder_time_base);
        encoder.set_frame_rate(Some(rate));

        let mut codec_options = Dictionary::new();
        match (self.options.bitrate, self.options.crf) {
            (Some(bitrate), _) => encoder.set_bit_rate(bitrate),
            (None, Some(crf)) if codec.supports_crf() => codec_options.set("crf", &crf.to_string()),
            (None, _) => {
                let bits = width as f64 * height as f64 * frame_rate * DEFAULT_BITS_PER_PIXEL;
                encoder.set_bit_rate(bits as usize);
            }
        }

        if needs_global_header {
            unsafe {
                (*encoder.as_mut_ptr()).flags |= ffmpeg_sys_next::AV_CODEC_FLAG_GLOBAL_HEADER as i32;
            }
        }

        let opened_encoder = encoder
            .open_as_with(encoder_codec, codec_options)
            .map_err(|e| SceneSplitError::VideoEncodeError(format!("cannot open encoder: {e}")))?;

        stream.set_parameters(&opened_encoder);
        stream.set_time_base(encoder_time_base);

        output
            .write_header()
            .map_err(|e| SceneSplitError::VideoWriteError(format!("cannot write header: {e}")))?;

        // The muxer may pick its own time base while writing the header.
        let stream_time_base = output
            .stream(stream_index)
            .map(|stream| stream.time_base())
            .ok_or_else(|| SceneSplitError::VideoWriteError("output stream vanished".to_string()))?;

        Ok(FfmpegClipWriter {
            output,
            encoder: opened_encoder,
            stream_index,
            encoder_time_base,
            stream_time_base,
            scaler: None,
            target_pixel,
            width,
            height,
            frames_written: 0,
            final_path: path.to_path_buf(),
            staging_path: staging,
        })
    }
}

/// Writer for one clip, produced by [`ClipEncoder`].
///
/// Dropping the writer without calling [`finish`](ClipWriter::finish)
/// leaves whatever the muxer has flushed so far on disk.
pub struct FfmpegClipWriter {
    output: Output,
    encoder: OpenedVideoEncoder,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    /// Converter from the source frames' layout, built on first use.
    scaler: Option<(ScalingContext, Pixel, u32, u32)>,
    target_pixel: Pixel,
    width: u32,
    height: u32,
    frames_written: i64,
    final_path: PathBuf,
    staging_path: Option<PathBuf>,
}

impl FfmpegClipWriter {
    /// Number of frames appended so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written as u64
    }

    fn scaler_for(&mut self, frame: &VideoFrame) -> Result<&mut ScalingContext, SceneSplitError> {
        let layout = (frame.format(), frame.width(), frame.height());
        let stale = self
            .scaler
            .as_ref()
            .is_none_or(|(_, format, width, height)| (*format, *width, *height) != layout);

        if stale {
            let context = ScalingContext::get(
                layout.0,
                layout.1,
                layout.2,
                self.target_pixel,
                self.width,
                self.height,
                ScalingFlags::BILINEAR,
            )
            .map_err(|e| SceneSplitError::VideoEncodeError(format!("cannot create scaler: {e}")))?;
            self.scaler = Some((context, layout.0, layout.1, layout.2));
        }

        self.scaler
            .as_mut()
            .map(|(context, ..)| context)
            .ok_or_else(|| SceneSplitError::VideoEncodeError("scaler unavailable".to_string()))
    }

    /// Move every packet the encoder has ready into the container.
    fn drain_packets(&mut self) -> Result<(), SceneSplitError> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .map_err(|e| SceneSplitError::VideoWriteError(format!("write packet failed: {e}")))?;
        }
        Ok(())
    }
}

impl ClipWriter<VideoFrame> for FfmpegClipWriter {
    fn write(&mut self, frame: &VideoFrame) -> Result<(), SceneSplitError> {
        let mut converted = VideoFrame::empty();
        self.scaler_for(frame)?
            .run(frame, &mut converted)
            .map_err(|e| SceneSplitError::VideoEncodeError(format!("scaling failed: {e}")))?;

        converted.set_pts(Some(self.frames_written));
        self.frames_written += 1;

        self.encoder
            .send_frame(&converted)
            .map_err(|e| SceneSplitError::VideoEncodeError(format!("send_frame failed: {e}")))?;
        self.drain_packets()
    }

    fn finish(mut self) -> Result<(), SceneSplitError> {
        self.encoder
            .send_eof()
            .map_err(|e| SceneSplitError::VideoEncodeError(format!("send_eof failed: {e}")))?;
        self.drain_packets()?;

        self.output
            .write_trailer()
            .map_err(|e| SceneSplitError::VideoWriteError(format!("cannot write trailer: {e}")))?;

        // Close the file before moving it into place.
        let FfmpegClipWriter {
            output,
            final_path,
            staging_path,
            frames_written,
            ..
        } = self;
        drop(output);

        if let Some(staging) = staging_path {
            fs::rename(&staging, &final_path)?;
        }

        log::debug!("Closed clip {} ({frames_written} frames)", final_path.display());
        Ok(())
    }
}
