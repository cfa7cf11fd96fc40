//! The split pipeline: detect scenes, then write one clip per scene.
//!
//! [`split_video`] runs both phases with the built-in
//! [`ContentDetector`]. [`detect_scenes`] and [`extract_scenes`] expose the
//! phases separately so a caller can report the scene count (or inspect
//! the ranges) before any clip is written, and [`split_with_detector`]
//! accepts any [`SceneDetector`].

use std::fs;

use crate::{
    config::SplitConfig,
    detect::{ContentDetector, SceneDetector},
    encode::ClipEncoder,
    error::SceneSplitError,
    extract::{ClipInfo, extract_clips},
    metadata::VideoMetadata,
    range::TimeRange,
    source::VideoSource,
};

/// Outcome of a split.
#[derive(Debug, Clone)]
pub struct SplitReport {
    /// Metadata of the source video.
    pub source: VideoMetadata,
    /// Scenes reported by the detector, in order.
    pub scenes: Vec<TimeRange>,
    /// Clips written, in scene order. Scenes that decoded no frames have
    /// no entry.
    pub clips: Vec<ClipInfo>,
}

impl SplitReport {
    /// Total frames written across all clips.
    pub fn total_frames(&self) -> u64 {
        self.clips.iter().map(|clip| clip.frame_count).sum()
    }
}

/// Build the content detector described by `config`.
pub fn content_detector(config: &SplitConfig) -> ContentDetector {
    let options = &config.options;
    let detector = ContentDetector::new(config.detector_options())
        .with_progress(options.progress.clone(), options.batch_size);
    match &options.cancellation {
        Some(token) => detector.with_cancellation(token.clone()),
        None => detector,
    }
}

/// Detect the scenes of `config.input` with the built-in detector.
///
/// # Errors
///
/// Fails if the input cannot be opened or decoded, the threshold is
/// invalid, or the run is cancelled.
pub fn detect_scenes(config: &SplitConfig) -> Result<Vec<TimeRange>, SceneSplitError> {
    let scenes = content_detector(config).detect(&config.input)?;
    log::info!("Detected {} scenes in {}", scenes.len(), config.input.display());
    Ok(scenes)
}

/// Write one clip per scene into `config.output_dir`, creating it if needed.
///
/// # Errors
///
/// Fails if the output directory cannot be created, the input cannot be
/// opened, or a clip cannot be written.
pub fn extract_scenes(
    config: &SplitConfig,
    scenes: &[TimeRange],
) -> Result<SplitReport, SceneSplitError> {
    fs::create_dir_all(&config.output_dir)?;

    let mut source = VideoSource::open(&config.input)?;
    let mut sink = ClipEncoder::new(config.options.encoder.clone());
    let extension = config.options.encoder.container.extension();

    let clips = extract_clips(
        &mut source,
        &mut sink,
        scenes,
        &config.output_dir,
        extension,
        &config.options,
    )?;

    log::info!(
        "Wrote {} clips to {}",
        clips.len(),
        config.output_dir.display()
    );

    Ok(SplitReport {
        source: source.metadata().clone(),
        scenes: scenes.to_vec(),
        clips,
    })
}

/// Split `config.input` into one clip per detected scene.
///
/// The scene count is logged at `info`, not printed; callers that want to
/// show it use [`detect_scenes`] and [`extract_scenes`] separately.
///
/// # Example
///
/// ```no_run
/// use scenesplit::{SceneSplitError, SplitConfig};
///
/// let report = scenesplit::split_video(&SplitConfig::new("input_video.mp4", "output_scenes"))?;
/// for clip in &report.clips {
///     println!("{} ({} frames)", clip.path.display(), clip.frame_count);
/// }
/// # Ok::<(), SceneSplitError>(())
/// ```
pub fn split_video(config: &SplitConfig) -> Result<SplitReport, SceneSplitError> {
    split_with_detector(config, &mut content_detector(config))
}

/// Split using a caller-supplied detector.
pub fn split_with_detector(
    config: &SplitConfig,
    detector: &mut dyn SceneDetector,
) -> Result<SplitReport, SceneSplitError> {
    fs::create_dir_all(&config.output_dir)?;

    let scenes = detector.detect(&config.input)?;
    log::info!("Detected {} scenes in {}", scenes.len(), config.input.display());

    extract_scenes(config, &scenes)
}
