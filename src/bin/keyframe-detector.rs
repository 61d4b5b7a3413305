use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use keyframe_detector::{
    ContentType, DecisionStrategy, DetectionConfig, DetectionReport, ImageDirectorySink,
    KeyframeDetector, OutputMode, PeakBaselineOptions, ProgressCallback, ProgressInfo, Sensitivity,
    Termination, TuningOptions, VideoFile,
};
use log::LevelFilter;
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  keyframe-detector detect -s input.mp4 -d out\n  keyframe-detector detect -s input.mp4 -d out --sensitivity high --content-type action --max-time 10\n  keyframe-detector detect -s input.mp4 -d out --output json_debug --start-time 0:30 --end-time 2:00 --progress\n  keyframe-detector tune --sensitivity low --content-type documentary\n  keyframe-detector completions zsh > _keyframe-detector";

/// Images are written to this directory under `--dest`.
const KEYFRAME_DIRECTORY: &str = "keyFrames";

#[derive(Debug, Parser)]
#[command(
    name = "keyframe-detector",
    version,
    about = "Detect representative keyframes in video files",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// FFmpeg log level (off, error, warn, info, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone)]
struct TuningArgs {
    /// Detection sensitivity (low, balanced, high).
    #[arg(long, default_value = "balanced")]
    sensitivity: String,

    /// Content type (action, documentary, general).
    #[arg(long, default_value = "general")]
    content_type: String,

    /// Seconds for sensitivity to recover after a keyframe.
    #[arg(long, default_value_t = 1.0)]
    min_scene_duration: f64,

    /// Minimum seconds between keyframes.
    #[arg(long = "min-time")]
    min_time_constraint: Option<f64>,

    /// Force a keyframe after this many seconds without one.
    #[arg(long = "max-time")]
    max_time_constraint: Option<f64>,

    /// Seconds of video the lookahead window spans.
    #[arg(long, default_value_t = 1.0)]
    look_ahead: f64,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Detect keyframes in a video.
    #[command(
        about = "Detect keyframes",
        after_help = "Examples:\n  keyframe-detector detect -s input.mp4 -d out --output json\n  keyframe-detector detect -s input.mp4 -d out --strategy peak-baseline --peak-threshold 0.4"
    )]
    Detect {
        /// Source video file.
        #[arg(short, long)]
        source: PathBuf,

        /// Destination folder.
        #[arg(short, long)]
        dest: PathBuf,

        #[command(flatten)]
        tuning: TuningArgs,

        /// Start time (SS, MM:SS or HH:MM:SS.fff).
        #[arg(long)]
        start_time: Option<String>,

        /// End time (SS, MM:SS or HH:MM:SS.fff).
        #[arg(long)]
        end_time: Option<String>,

        /// Output mode (images, json, json_only, json_debug).
        #[arg(long, default_value = "images")]
        output: String,

        /// Metadata file name, written under the destination folder.
        #[arg(long, default_value = "keyframes.json")]
        json_filename: String,

        /// Selection strategy (lookahead, peak-baseline).
        #[arg(long, default_value = "lookahead")]
        strategy: String,

        /// Normalized peak threshold for the peak-baseline strategy.
        #[arg(long, default_value_t = 0.3)]
        peak_threshold: f64,

        /// Minimum frames between peaks for the peak-baseline strategy.
        #[arg(long, default_value_t = 1)]
        peak_min_distance: usize,

        /// Show a progress bar.
        #[arg(long)]
        progress: bool,
    },

    /// Print the tuned policy parameters for a preset combination.
    #[command(
        about = "Show tuned parameters",
        after_help = "Examples:\n  keyframe-detector tune --sensitivity high --content-type action"
    )]
    Tune {
        #[command(flatten)]
        tuning: TuningArgs,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_timecode(value: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(format!("invalid time: {trimmed}").into());
        }
        return Ok(Duration::try_from_secs_f64(seconds)?);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [minutes, seconds] => (0, minutes.parse::<u64>()?, *seconds),
        [hours, minutes, seconds] => (hours.parse::<u64>()?, minutes.parse::<u64>()?, *seconds),
        _ => return Err(format!("invalid time format: {trimmed}").into()),
    };

    let seconds = seconds.parse::<f64>()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("invalid time format: {trimmed}").into());
    }
    let total_seconds = (hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds;
    Ok(Duration::try_from_secs_f64(total_seconds)?)
}

fn parse_log_level(value: &str) -> Option<LevelFilter> {
    match value.to_ascii_lowercase().as_str() {
        "off" | "quiet" => Some(LevelFilter::Off),
        "error" | "fatal" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" | "verbose" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

fn parse_strategy(
    value: &str,
    peak_threshold: f64,
    peak_min_distance: usize,
) -> Option<DecisionStrategy> {
    match value.to_ascii_lowercase().replace('_', "-").as_str() {
        "lookahead" | "look-ahead" => Some(DecisionStrategy::LookAhead),
        "peak-baseline" | "peaks" => Some(DecisionStrategy::PeakBaseline(
            PeakBaselineOptions::new()
                .threshold(peak_threshold)
                .min_distance(peak_min_distance),
        )),
        _ => None,
    }
}

fn tuning_options(args: &TuningArgs) -> Result<TuningOptions, Box<dyn std::error::Error>> {
    let mut options = TuningOptions::new()
        .sensitivity(args.sensitivity.parse::<Sensitivity>()?)
        .content_type(args.content_type.parse::<ContentType>()?)
        .min_scene_duration(args.min_scene_duration)
        .look_ahead_time(args.look_ahead);
    if let Some(seconds) = args.min_time_constraint {
        options = options.min_time_constraint(seconds);
    }
    if let Some(seconds) = args.max_time_constraint {
        options = options.max_time_constraint(seconds);
    }
    Ok(options)
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.format_timestamp(None).init();
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(total: Option<u64>) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = match total {
            Some(total) if total > 0 => {
                let bar = ProgressBar::new(total);
                let style = ProgressStyle::with_template(
                    "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}",
                )?;
                bar.set_style(style.progress_chars("##-"));
                bar
            }
            _ => ProgressBar::new_spinner(),
        };
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.frames_processed);
        let time = info.current_time.unwrap_or(0.0);
        self.bar
            .set_message(format!("{time:.2}s, {} keyframes", info.keyframes_detected));
    }
}

fn print_summary(report: &DetectionReport, verbose: bool) {
    if verbose {
        for event in &report.events {
            println!("{} {event}", "keyframe".cyan().bold());
        }
    }

    match &report.termination {
        Termination::Cancelled => eprintln!("{} run cancelled", "warning:".yellow().bold()),
        Termination::SourceFailed(error) | Termination::Failed(error) => eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("stopped early: {error}").yellow()
        ),
        Termination::Exhausted | Termination::EndTimeReached => {}
    }

    if report.image_failures > 0 {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("{} keyframe images could not be saved", report.image_failures).yellow()
        );
    }

    println!(
        "{} {} keyframes from {} frames",
        "detected".green().bold(),
        report.events.len(),
        report.frames_processed
    );
}

fn detect(
    source: &Path,
    dest: &Path,
    config: DetectionConfig,
    json_filename: &str,
    show_progress: bool,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut video = VideoFile::open(source)?;
    let metadata = video.metadata().clone();

    let progress = if show_progress {
        Some(Arc::new(TerminalProgress::new(Some(metadata.frame_count))?))
    } else {
        None
    };
    let config = match &progress {
        Some(progress) => config
            .with_progress(progress.clone())
            .with_batch_size(25),
        None => config,
    };

    let mode = config.output_mode();
    let detector = KeyframeDetector::new(&config, metadata.frames_per_second)?
        .with_total_frames(Some(metadata.frame_count));

    let report = if mode.saves_images() {
        let mut sink = ImageDirectorySink::create(dest.join(KEYFRAME_DIRECTORY))?;
        let mut report = detector.detect_with_sink(video.frames()?, &mut sink)?;
        if config.strategy().is_offline() {
            let mut second_pass = VideoFile::open(source)?;
            detector.save_selected(second_pass.frames()?, &mut report, &mut sink)?;
        }
        report
    } else {
        detector.detect(video.luma_frames()?)?
    };

    if let Some(progress) = progress {
        progress.bar.finish_with_message("done");
    }

    if mode.writes_json() {
        std::fs::create_dir_all(dest)?;
        let path = dest.join(json_filename);
        keyframe_detector::write_metadata(&path, &report.events)?;
        println!("{} {}", "saved".green().bold(), path.display());
    }
    if mode.saves_images() {
        println!(
            "{} {} images in {}",
            "saved".green().bold(),
            report.images_saved,
            dest.join(KEYFRAME_DIRECTORY).display()
        );
    }

    print_summary(&report, verbose);
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(level) = &cli.log_level {
        let parsed = parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?;
        keyframe_detector::set_decoder_log_level(parsed);
    }

    match cli.command {
        Commands::Detect {
            source,
            dest,
            tuning,
            start_time,
            end_time,
            output,
            json_filename,
            strategy,
            peak_threshold,
            peak_min_distance,
            progress,
        } => {
            let start = start_time
                .as_deref()
                .map(parse_timecode)
                .transpose()?
                .map(|time| time.as_secs_f64());
            let end = end_time
                .as_deref()
                .map(parse_timecode)
                .transpose()?
                .map(|time| time.as_secs_f64());
            let strategy = parse_strategy(&strategy, peak_threshold, peak_min_distance)
                .ok_or(format!("unsupported --strategy: {strategy}"))?;

            let config = DetectionConfig::new()
                .with_tuning(tuning_options(&tuning)?)
                .with_strategy(strategy)
                .with_time_bounds(start, end)
                .with_output_mode(output.parse::<OutputMode>()?);

            detect(&source, &dest, config, &json_filename, progress, cli.verbose)?;
        }
        Commands::Tune { tuning } => {
            let params = tuning_options(&tuning)?.tune()?;
            let payload = json!({
                "threshold": params.threshold,
                "min_scene_length": params.min_scene_length,
                "max_motion_factor": params.max_motion_factor,
                "content_weight": params.content_weight,
                "min_time_constraint": params.min_time_constraint,
                "max_time_constraint": params.max_time_constraint,
                "look_ahead_time": params.look_ahead_time,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(
                shell,
                &mut command,
                "keyframe-detector",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}
