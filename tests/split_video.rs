//! End-to-end splitting on synthetic videos.

mod common;

use std::path::Path;

use scenesplit::{
    FrameIndexing, FrameSource, SceneDetector, SceneSplitError, SplitConfig, SplitOptions,
    TimeRange, VideoSource,
};
use tempfile::TempDir;

fn decoded_frames(path: &Path) -> u64 {
    let mut source = VideoSource::open(path).expect("open clip");
    let mut count = 0;
    while source.next_frame().expect("decode clip").is_some() {
        count += 1;
    }
    count
}

#[test]
fn three_scenes_become_three_clips() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::three_scene_video(dir.path()) else {
        return;
    };
    let output = dir.path().join("output_scenes");

    let report = scenesplit::split_video(&SplitConfig::new(&input, &output)).expect("split");

    assert_eq!(report.scenes.len(), 3);
    assert!((report.scenes[0].end - 3.0).abs() < 1e-6);
    assert!((report.scenes[1].end - 7.0).abs() < 1e-6);
    assert_eq!(
        common::file_names(&output),
        ["scene_001.mp4", "scene_002.mp4", "scene_003.mp4"]
    );

    let counts: Vec<u64> = report.clips.iter().map(|clip| clip.frame_count).collect();
    assert_eq!(counts, [90, 120, 90]);
    assert_eq!(report.total_frames(), 300);

    for clip in &report.clips {
        assert_eq!((clip.width, clip.height), (common::WIDTH, common::HEIGHT));
        assert_eq!(decoded_frames(&clip.path), clip.frame_count);
    }
}

#[test]
fn clips_are_written_in_scene_order() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::three_scene_video(dir.path()) else {
        return;
    };
    let output = dir.path().join("out");

    let report = scenesplit::split_video(&SplitConfig::new(&input, &output)).expect("split");

    let ordinals: Vec<usize> = report.clips.iter().map(|clip| clip.ordinal).collect();
    assert_eq!(ordinals, [1, 2, 3]);
    for pair in report.clips.windows(2) {
        assert_eq!(pair[0].span.end, pair[1].span.start);
    }
}

#[test]
fn static_video_is_one_clip() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::single_scene_video(dir.path()) else {
        return;
    };
    let output = dir.path().join("out");

    let report = scenesplit::split_video(&SplitConfig::new(&input, &output)).expect("split");

    assert_eq!(report.scenes.len(), 1);
    assert_eq!(report.clips.len(), 1);
    assert_eq!(report.clips[0].frame_count, 60);
    assert_eq!(common::file_names(&output), ["scene_001.mp4"]);
}

#[test]
fn high_threshold_keeps_everything_in_one_scene() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::three_scene_video(dir.path()) else {
        return;
    };
    let config = SplitConfig::new(&input, dir.path().join("out")).with_threshold(200.0);

    let scenes = scenesplit::detect_scenes(&config).expect("detect");

    assert_eq!(scenes.len(), 1);
    assert!((scenes[0].end - 10.0).abs() < 1e-6);
}

#[test]
fn long_min_scene_len_suppresses_second_cut() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::three_scene_video(dir.path()) else {
        return;
    };
    let options = SplitOptions::new().with_min_scene_len(150);
    let config = SplitConfig::new(&input, dir.path().join("out")).with_options(options);

    let scenes = scenesplit::detect_scenes(&config).expect("detect");

    // The cut at frame 90 is inside the first 150 frames; 210 is kept.
    assert_eq!(scenes.len(), 2);
    assert!((scenes[0].end - 7.0).abs() < 1e-6);
}

#[test]
fn rerunning_overwrites_the_same_files() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::three_scene_video(dir.path()) else {
        return;
    };
    let output = dir.path().join("out");
    let config = SplitConfig::new(&input, &output);

    let first = scenesplit::split_video(&config).expect("first split");
    let second = scenesplit::split_video(&config).expect("second split");

    assert_eq!(common::file_names(&output).len(), 3);
    let first_counts: Vec<u64> = first.clips.iter().map(|c| c.frame_count).collect();
    let second_counts: Vec<u64> = second.clips.iter().map(|c| c.frame_count).collect();
    assert_eq!(first_counts, second_counts);
}

#[test]
fn no_staging_files_are_left_behind() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::three_scene_video(dir.path()) else {
        return;
    };
    let output = dir.path().join("out");

    scenesplit::split_video(&SplitConfig::new(&input, &output)).expect("split");

    assert!(
        common::file_names(&output)
            .iter()
            .all(|name| !name.ends_with(".partial"))
    );
}

struct FixedRanges(Vec<TimeRange>);

impl SceneDetector for FixedRanges {
    fn detect(&mut self, _path: &Path) -> Result<Vec<TimeRange>, SceneSplitError> {
        Ok(self.0.clone())
    }
}

#[test]
fn range_past_the_end_writes_no_file() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::three_scene_video(dir.path()) else {
        return;
    };
    let output = dir.path().join("out");
    let mut detector = FixedRanges(vec![
        TimeRange::new(0.0, 5.0).unwrap(),
        TimeRange::new(5.0, 10.0).unwrap(),
        TimeRange::new(12.0, 15.0).unwrap(),
    ]);

    let report =
        scenesplit::split_with_detector(&SplitConfig::new(&input, &output), &mut detector)
            .expect("split");

    assert_eq!(report.clips.len(), 2);
    assert_eq!(common::file_names(&output), ["scene_001.mp4", "scene_002.mp4"]);
}

#[test]
fn range_running_past_the_end_is_truncated() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::three_scene_video(dir.path()) else {
        return;
    };
    let output = dir.path().join("out");
    let mut detector = FixedRanges(vec![TimeRange::new(8.0, 20.0).unwrap()]);

    let report =
        scenesplit::split_with_detector(&SplitConfig::new(&input, &output), &mut detector)
            .expect("split");

    assert_eq!(report.clips.len(), 1);
    assert_eq!(report.clips[0].frame_count, 60);
}

#[test]
fn backward_ranges_seek_the_source() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::three_scene_video(dir.path()) else {
        return;
    };
    let output = dir.path().join("out");
    let mut detector = FixedRanges(vec![
        TimeRange::new(7.0, 8.0).unwrap(),
        TimeRange::new(1.0, 2.0).unwrap(),
    ]);

    let report =
        scenesplit::split_with_detector(&SplitConfig::new(&input, &output), &mut detector)
            .expect("split");

    let counts: Vec<u64> = report.clips.iter().map(|clip| clip.frame_count).collect();
    assert_eq!(counts, [30, 30]);
    assert_eq!(report.clips[1].span.start, 30);
}

#[test]
fn cumulative_indexing_covers_every_frame_once() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::three_scene_video(dir.path()) else {
        return;
    };
    let output = dir.path().join("out");
    let options = SplitOptions::new().with_frame_indexing(FrameIndexing::Cumulative);
    let config = SplitConfig::new(&input, &output).with_options(options);

    let report = scenesplit::split_video(&config).expect("split");

    assert_eq!(report.total_frames(), 300);
}

#[test]
fn mkv_container_uses_its_extension() {
    let dir = TempDir::new().unwrap();
    let Some(input) = common::single_scene_video(dir.path()) else {
        return;
    };
    let output = dir.path().join("out");
    let options = SplitOptions::new().with_container(scenesplit::Container::Mkv);

    match scenesplit::split_video(&SplitConfig::new(&input, &output).with_options(options)) {
        Ok(report) => {
            assert_eq!(common::file_names(&output), ["scene_001.mkv"]);
            assert_eq!(report.clips[0].frame_count, 60);
        }
        Err(SceneSplitError::VideoWriteError(message)) => {
            eprintln!("Skipping: Matroska muxer not available ({message})");
        }
        Err(other) => panic!("unexpected error: {other}"),
    }
}
