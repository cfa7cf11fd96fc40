//! Error reporting for bad inputs and settings.

mod common;

use scenesplit::{SceneSplitError, SplitConfig, TimeRange, VideoSource};
use tempfile::TempDir;

#[test]
fn missing_input_is_a_file_open_error() {
    let dir = TempDir::new().unwrap();
    let config = SplitConfig::new(dir.path().join("nope.mp4"), dir.path().join("out"));

    let error = scenesplit::split_video(&config).unwrap_err();

    assert!(matches!(error, SceneSplitError::FileOpen { .. }));
    assert!(error.to_string().contains("Failed to open media file"));
}

#[test]
fn non_media_input_is_rejected() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("notes.txt");
    std::fs::write(&input, "definitely not a video").unwrap();

    let result = VideoSource::open(&input);

    assert!(matches!(
        result,
        Err(SceneSplitError::FileOpen { .. }) | Err(SceneSplitError::NoVideoStream)
    ));
}

#[test]
fn missing_input_leaves_output_dir_empty() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out");
    let config = SplitConfig::new(dir.path().join("nope.mp4"), &output);

    assert!(scenesplit::split_video(&config).is_err());
    assert!(!output.exists() || common::file_names(&output).is_empty());
}

#[test]
fn negative_threshold_is_rejected() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::single_scene_video(dir.path()) else {
        return;
    };
    let config = SplitConfig::new(&input, dir.path().join("out")).with_threshold(-1.0);

    let error = scenesplit::detect_scenes(&config).unwrap_err();

    assert!(matches!(error, SceneSplitError::InvalidThreshold(t) if t == -1.0));
}

#[test]
fn inverted_range_is_rejected() {
    let error = TimeRange::new(5.0, 2.0).unwrap_err();

    assert!(matches!(error, SceneSplitError::InvalidRange { .. }));
    assert!(error.to_string().contains("must be less than end"));
}

#[test]
fn output_path_that_is_a_file_fails() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::single_scene_video(dir.path()) else {
        return;
    };
    let blocker = dir.path().join("occupied");
    std::fs::write(&blocker, b"file").unwrap();

    let error = scenesplit::split_video(&SplitConfig::new(&input, &blocker)).unwrap_err();

    assert!(matches!(error, SceneSplitError::IoError(_)));
}
