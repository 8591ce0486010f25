//! Posture monitor: classifies sitting posture from body landmarks and alerts
//! on sustained bad posture.

use anyhow::{Context, Result};
use clap::Parser;
use posture_monitor::{
    app::PostureMonitor,
    capture::{CaptureSource, ImageSequenceSource, Resolution, SettingsHandle},
    config::{Config, EXAMPLE_CONFIG},
    estimator::ReplayEstimator,
    notifier::{AlertNotifier, TerminalBell},
    presentation::LogPresenter,
    scheduler::FrameScheduler,
    store::{ExportFormat, PostureStore},
};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Camera index to use (overrides the configuration file)
    #[arg(long)]
    cam: Option<i32>,

    /// Capture resolution such as 1280x720 (overrides the configuration file)
    #[arg(short, long)]
    resolution: Option<Resolution>,

    /// Directory of still frames to replay instead of a camera
    #[arg(short, long)]
    frames: Option<PathBuf>,

    /// JSON-lines landmark recording, one line per analyzed frame
    #[arg(short, long)]
    landmarks: Option<PathBuf>,

    /// Loop the frame and landmark recordings
    #[arg(long = "loop")]
    looping: bool,

    /// Stop after this many frames
    #[arg(short, long)]
    max_frames: Option<u64>,

    /// Export the recorded events at exit (csv, json)
    #[arg(short, long)]
    export: Option<ExportFormat>,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    info!("Posture Monitor {}", env!("CARGO_PKG_VERSION"));

    // Load configuration if provided
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        match Config::from_file(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load config file: {e}. Using defaults.");
                Config::default()
            }
        }
    } else {
        Config::default()
    };
    if let Some(cam) = args.cam {
        config.camera.device_index = cam;
    }
    if let Some(resolution) = args.resolution {
        config.camera.width = resolution.width;
        config.camera.height = resolution.height;
    }
    let resolution = config.camera.settings().resolution;
    if !resolution.is_preset() {
        let presets: Vec<String> = Resolution::presets().map(|r| r.to_string()).collect();
        warn!("Resolution {resolution} is not one of {}; the camera may reject it", presets.join(", "));
    }
    config.validate().context("Invalid configuration")?;

    let Some(landmarks_path) = &args.landmarks else {
        anyhow::bail!("No landmark source: pass --landmarks with a JSON-lines recording");
    };
    let capture = open_capture(&args)?;
    let estimator = ReplayEstimator::from_file(landmarks_path, args.looping)
        .with_context(|| format!("Failed to load landmarks from {}", landmarks_path.display()))?;
    let scheduler = FrameScheduler::new(
        Box::new(estimator),
        config.analysis_session(),
        config.scheduler_options(),
    )?;
    let notifier = config
        .alerts
        .sound_enabled
        .then(|| AlertNotifier::new(config.sound_period(), Arc::new(TerminalBell)));

    let mut monitor = PostureMonitor::new(
        capture,
        scheduler,
        Box::new(config.event_store()),
        Box::new(LogPresenter::new()),
        notifier,
        SettingsHandle::new(config.camera.settings()),
        config.monitor_options(),
    )?;

    // Session errors are already reported through the presenter
    match monitor.run(args.max_frames) {
        Ok(stats) => info!(
            "Session finished: {} frames, {} analyzed, {} classified ({} from cache), {} alerts",
            stats.frames, stats.analyzed, stats.classified, stats.cache_hits, stats.alerts
        ),
        Err(e) => warn!("Session ended with an error: {e}"),
    }

    let summary = monitor.store().daily_summary()?;
    info!(
        "Today: {} correct, {} incorrect ({:.1}% correct)",
        summary.correct_minutes, summary.incorrect_minutes, summary.percent_correct
    );

    if let Some(format) = args.export {
        match monitor.store().export(format, None, None) {
            Ok(path) => info!("Events exported to {}", path.display()),
            Err(e) => warn!("Export failed: {e}"),
        }
    }

    Ok(())
}

fn open_capture(args: &Args) -> Result<Box<dyn CaptureSource>> {
    if let Some(dir) = &args.frames {
        let source = ImageSequenceSource::from_dir(dir, args.looping)
            .with_context(|| format!("Failed to read frames from {}", dir.display()))?;
        return Ok(Box::new(source));
    }
    open_camera()
}

#[cfg(feature = "camera")]
fn open_camera() -> Result<Box<dyn CaptureSource>> {
    use posture_monitor::capture::opencv_camera::{available_cameras, OpenCvCamera};

    let cameras = available_cameras();
    if cameras.is_empty() {
        warn!("No camera answered the device scan");
    } else {
        info!("Available cameras: {cameras:?}");
    }
    Ok(Box::new(OpenCvCamera::new()))
}

#[cfg(not(feature = "camera"))]
fn open_camera() -> Result<Box<dyn CaptureSource>> {
    anyhow::bail!("No frame source: pass --frames or build with the `camera` feature")
}
