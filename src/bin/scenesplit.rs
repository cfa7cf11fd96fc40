use std::{path::PathBuf, sync::Arc};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Value, json};
use scenesplit::{
    Container, FfmpegLogLevel, FrameIndexing, OperationType, ProgressCallback, ProgressInfo,
    SplitConfig, SplitOptions, SplitReport, TimeRange, VideoCodec,
};

const CLI_AFTER_HELP: &str = "Examples:\n  scenesplit split input_video.mp4 output_scenes\n  scenesplit split input.mkv scenes --threshold 20 --codec h264 --container mkv --progress\n  scenesplit detect input.mp4 --json\n  scenesplit completions zsh > _scenesplit";

#[derive(Debug, Parser)]
#[command(
    name = "scenesplit",
    version,
    about = "Split a video into one clip per detected scene",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show informational log output (RUST_LOG overrides).
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar.
    #[arg(long, global = true)]
    progress: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, verbose, debug).
    #[arg(long, global = true)]
    log_level: Option<FfmpegLogLevel>,
}

#[derive(Debug, Parser, Clone)]
struct DetectionArgs {
    /// Scene detection threshold; lower values detect more scenes.
    #[arg(long, default_value_t = 30.0)]
    threshold: f64,

    /// Minimum scene length in frames.
    #[arg(long, default_value_t = 15)]
    min_scene_len: u64,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Detect scenes and write one clip per scene.
    #[command(
        about = "Split a video at scene cuts",
        after_help = "Examples:\n  scenesplit split input_video.mp4 output_scenes\n  scenesplit split input.mp4 out --indexing cumulative --json"
    )]
    Split {
        /// Input video path.
        input: PathBuf,
        /// Output directory for the clips (created if missing).
        #[arg(default_value = "output_scenes")]
        output_dir: PathBuf,
        #[command(flatten)]
        detection: DetectionArgs,
        /// Output codec: mpeg4 | h264 | h265.
        #[arg(long, default_value = "mpeg4")]
        codec: String,
        /// Output container: mp4 | mkv | mov | avi.
        #[arg(long, default_value = "mp4")]
        container: String,
        /// Boundary rounding: floor | round | cumulative.
        #[arg(long, default_value = "floor")]
        indexing: String,
        /// Write clips directly under their final names.
        #[arg(long)]
        no_staging: bool,
        /// Print the split report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Detect scenes and print their time ranges.
    #[command(about = "Detect scenes without writing clips")]
    Detect {
        /// Input video path.
        input: PathBuf,
        #[command(flatten)]
        detection: DetectionArgs,
        /// Print the ranges as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_codec(value: &str) -> Option<VideoCodec> {
    match value.to_ascii_lowercase().as_str() {
        "mpeg4" | "mp4v" => Some(VideoCodec::Mpeg4),
        "h264" | "avc" => Some(VideoCodec::H264),
        "h265" | "hevc" => Some(VideoCodec::H265),
        _ => None,
    }
}

fn parse_container(value: &str) -> Option<Container> {
    match value.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "mp4" => Some(Container::Mp4),
        "mkv" | "matroska" => Some(Container::Mkv),
        "mov" => Some(Container::Mov),
        "avi" => Some(Container::Avi),
        _ => None,
    }
}

fn parse_indexing(value: &str) -> Option<FrameIndexing> {
    match value.to_ascii_lowercase().as_str() {
        "floor" => Some(FrameIndexing::Floor),
        "round" | "nearest" => Some(FrameIndexing::Round),
        "cumulative" => Some(FrameIndexing::Cumulative),
        _ => None,
    }
}

fn init_logging(global: &GlobalOptions) {
    let default_filter = if global.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();

    if let Some(level) = global.log_level {
        scenesplit::set_ffmpeg_log_level(level);
    }
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {msg:<10} {bar:40.cyan/blue} {pos}/{len}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let label = match info.operation {
            OperationType::SceneDetection => "detecting",
            OperationType::ClipExtraction => "writing",
            _ => "working",
        };
        self.bar.set_message(label);
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
    }
}

fn range_json(range: &TimeRange) -> Value {
    json!({
        "start_seconds": range.start,
        "end_seconds": range.end,
    })
}

fn report_json(report: &SplitReport) -> Value {
    json!({
        "source": {
            "width": report.source.width,
            "height": report.source.height,
            "frames_per_second": report.source.frames_per_second,
            "frame_count": report.source.frame_count,
            "duration_seconds": report.source.duration.as_secs_f64(),
            "codec": report.source.codec,
        },
        "scenes": report.scenes.iter().map(range_json).collect::<Vec<_>>(),
        "clips": report.clips.iter().map(|clip| json!({
            "ordinal": clip.ordinal,
            "path": clip.path.display().to_string(),
            "start_seconds": clip.range.start,
            "end_seconds": clip.range.end,
            "frame_count": clip.frame_count,
            "width": clip.width,
            "height": clip.height,
            "frames_per_second": clip.frame_rate,
        })).collect::<Vec<_>>(),
    })
}

fn base_options(
    global: &GlobalOptions,
    detection: &DetectionArgs,
) -> Result<(SplitOptions, Option<ProgressBar>), Box<dyn std::error::Error>> {
    let mut options = SplitOptions::new().with_min_scene_len(detection.min_scene_len);
    let mut bar = None;

    if global.progress {
        let progress = TerminalProgress::new()?;
        bar = Some(progress.bar.clone());
        options = options
            .with_progress(Arc::new(progress))
            .with_batch_size(10);
    }

    Ok((options, bar))
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(&cli.global);

    match cli.command {
        Commands::Split {
            input,
            output_dir,
            detection,
            codec,
            container,
            indexing,
            no_staging,
            json,
        } => {
            let codec = parse_codec(&codec).ok_or(format!("unsupported --codec: {codec}"))?;
            let container =
                parse_container(&container).ok_or(format!("unsupported --container: {container}"))?;
            let indexing =
                parse_indexing(&indexing).ok_or(format!("unsupported --indexing: {indexing}"))?;

            let (options, bar) = base_options(&cli.global, &detection)?;
            let options = options
                .with_codec(codec)
                .with_container(container)
                .with_frame_indexing(indexing)
                .with_staged_writes(!no_staging);

            let config = SplitConfig::new(input, output_dir)
                .with_threshold(detection.threshold)
                .with_options(options);

            let scenes = scenesplit::detect_scenes(&config)?;
            if let Some(bar) = &bar {
                bar.println(format!("Detected {} scenes.", scenes.len()));
            } else if !json {
                println!("Detected {} scenes.", scenes.len());
            }

            let report = scenesplit::extract_scenes(&config, &scenes)?;
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
            } else {
                for clip in &report.clips {
                    println!(
                        "{} {} ({} frames, {})",
                        "saved".green().bold(),
                        clip.path.display(),
                        clip.frame_count,
                        clip.range
                    );
                }
                println!(
                    "{} {}",
                    "success:".green().bold(),
                    format!(
                        "Wrote {} clip(s) to {}",
                        report.clips.len(),
                        config.output_dir.display()
                    )
                    .green()
                );
            }
        }
        Commands::Detect {
            input,
            detection,
            json,
        } => {
            let (options, bar) = base_options(&cli.global, &detection)?;
            let config = SplitConfig::new(input, PathBuf::new())
                .with_threshold(detection.threshold)
                .with_options(options);

            let scenes = scenesplit::detect_scenes(&config)?;
            if let Some(bar) = bar {
                bar.finish_and_clear();
            }

            if json {
                let payload: Vec<Value> = scenes.iter().map(range_json).collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Detected {} scenes.", scenes.len());
                for (position, scene) in scenes.iter().enumerate() {
                    println!("scene {:03}: {scene}", position + 1);
                }
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "scenesplit", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
