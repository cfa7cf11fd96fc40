//! Synthetic fixtures shared by the integration tests.
//!
//! Videos are generated with the crate's own MPEG-4 encoder so the tests do
//! not depend on checked-in media. When the encoder is unavailable the
//! fixture returns `None` and the calling test is skipped.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ffmpeg_next::{format::Pixel, frame::Video as VideoFrame};
use scenesplit::{ClipEncoder, ClipEncoderOptions, ClipSink, ClipWriter, Container, VideoCodec};

pub const FRAME_RATE: f64 = 30.0;
pub const WIDTH: u32 = 160;
pub const HEIGHT: u32 = 120;

/// Luma levels for black, white and mid-grey in limited-range YUV.
pub const BLACK: u8 = 16;
pub const WHITE: u8 = 235;
pub const GREY: u8 = 126;

pub fn grey_frame(luma: u8, width: u32, height: u32) -> VideoFrame {
    let mut frame = VideoFrame::new(Pixel::YUV420P, width, height);
    frame.data_mut(0).fill(luma);
    frame.data_mut(1).fill(128);
    frame.data_mut(2).fill(128);
    frame
}

/// MPEG-4 in MP4, written in place.
pub fn fixture_encoder() -> ClipEncoder {
    ClipEncoder::new(
        ClipEncoderOptions::default()
            .codec(VideoCodec::Mpeg4)
            .container(Container::Mp4)
            .bitrate(400_000)
            .staged_writes(false),
    )
}

/// Write a flat-colour video made of `(frame_count, luma)` segments.
///
/// Returns `None` (and prints a skip notice) if the MPEG-4 encoder or the
/// MP4 muxer is not available in the linked FFmpeg.
pub fn write_segments(path: &Path, segments: &[(u64, u8)]) -> Option<PathBuf> {
    write_video(path, segments, FRAME_RATE, WIDTH, HEIGHT)
}

/// [`write_segments`] with an explicit frame rate and size.
pub fn write_video(
    path: &Path,
    segments: &[(u64, u8)],
    frame_rate: f64,
    width: u32,
    height: u32,
) -> Option<PathBuf> {
    let mut encoder = fixture_encoder();

    let mut writer = match encoder.open(path, frame_rate, width, height) {
        Ok(writer) => writer,
        Err(error) => {
            eprintln!("Skipping: MPEG-4 encoder not available ({error})");
            return None;
        }
    };

    for &(count, luma) in segments {
        let frame = grey_frame(luma, width, height);
        for _ in 0..count {
            writer.write(&frame).expect("write synthetic frame");
        }
    }
    writer.finish().expect("finish synthetic video");

    Some(path.to_path_buf())
}

/// Ten seconds at 30 fps with hard cuts at 3 s and 7 s.
pub fn three_scene_video(dir: &Path) -> Option<PathBuf> {
    write_segments(
        &dir.join("input_video.mp4"),
        &[(90, BLACK), (120, WHITE), (90, GREY)],
    )
}

/// Two seconds of a single flat colour.
pub fn single_scene_video(dir: &Path) -> Option<PathBuf> {
    write_segments(&dir.join("static.mp4"), &[(60, GREY)])
}

/// Sorted file names in `dir`.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read output dir")
        .map(|entry| {
            entry
                .expect("dir entry")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}
