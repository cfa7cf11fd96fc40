//! Written clips keep the source's frame size and frame rate.

mod common;

use std::path::Path;

use scenesplit::{ClipSink, ClipWriter, FrameSource, SplitConfig, VideoSource};
use tempfile::TempDir;

/// Average rate many phone recordings report in their MP4 headers.
const CAMERA_FRAME_RATE: f64 = 1_800_000.0 / 60_061.0;

fn assert_clips_match_source(input: &Path, output: &Path) {
    let source = VideoSource::open(input).expect("open source");
    let expected = source.metadata().clone();

    let report = scenesplit::split_video(&SplitConfig::new(input, output)).expect("split");
    assert!(!report.clips.is_empty());

    for clip in &report.clips {
        let written = VideoSource::open(&clip.path).expect("open clip");
        let actual = written.metadata();
        assert_eq!(
            (actual.width, actual.height),
            (expected.width, expected.height),
            "{}",
            clip.path.display()
        );
        assert!(
            (actual.frames_per_second - expected.frames_per_second).abs() < 0.01,
            "{}: {} fps, source {} fps",
            clip.path.display(),
            actual.frames_per_second,
            expected.frames_per_second
        );
    }
}

#[test]
fn odd_sized_source_keeps_its_dimensions() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::write_video(
        &dir.path().join("odd.mp4"),
        &[(45, common::BLACK), (45, common::WHITE)],
        common::FRAME_RATE,
        161,
        121,
    ) else {
        return;
    };

    let source = VideoSource::open(&input).expect("open source");
    assert_eq!((source.metadata().width, source.metadata().height), (161, 121));

    assert_clips_match_source(&input, &dir.path().join("out"));
}

#[test]
fn even_sized_source_keeps_its_rate_and_dimensions() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::three_scene_video(dir.path()) else {
        return;
    };

    assert_clips_match_source(&input, &dir.path().join("out"));
}

#[test]
fn encoder_accepts_camera_average_frame_rate() {
    let dir = TempDir::new().unwrap();
    let mut encoder = common::fixture_encoder();
    if encoder
        .open(&dir.path().join("baseline.mp4"), common::FRAME_RATE, 64, 48)
        .and_then(|writer| writer.finish())
        .is_err()
    {
        eprintln!("Skipping: MPEG-4 encoder not available");
        return;
    }

    let path = dir.path().join("camera.mp4");
    let mut writer = encoder
        .open(&path, CAMERA_FRAME_RATE, 64, 48)
        .expect("open encoder at 1800000/60061 fps");
    let frame = common::grey_frame(common::GREY, 64, 48);
    for _ in 0..10 {
        writer.write(&frame).expect("write frame");
    }
    writer.finish().expect("finish clip");

    let mut reopened = VideoSource::open(&path).expect("reopen clip");
    assert!((reopened.frame_rate() - CAMERA_FRAME_RATE).abs() < 0.01);
    let mut decoded = 0;
    while reopened.next_frame().expect("decode").is_some() {
        decoded += 1;
    }
    assert_eq!(decoded, 10);
}

#[test]
fn camera_rate_source_splits_cleanly() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::write_video(
        &dir.path().join("camera.mp4"),
        &[(60, common::BLACK), (60, common::WHITE)],
        CAMERA_FRAME_RATE,
        common::WIDTH,
        common::HEIGHT,
    ) else {
        return;
    };
    let output = dir.path().join("out");

    let report = scenesplit::split_video(&SplitConfig::new(&input, &output)).expect("split");

    assert_eq!(report.clips.len(), 2);
    assert_eq!(report.total_frames(), 120);
    assert_clips_match_source(&input, &dir.path().join("again"));
}
