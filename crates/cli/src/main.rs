use std::path::PathBuf;
use std::process;
use std::time::{Duration, Instant};

use clap::Parser;

use facetrack_core::capture::domain::frame_source::FrameSource;
use facetrack_core::capture::infrastructure::image_sequence_source::ImageSequenceSource;
use facetrack_core::detection::domain::detection_strategy::DetectionFlags;
use facetrack_core::detection::domain::face_detector::FaceDetector;
use facetrack_core::detection::infrastructure::cascade_face_detector::CascadeFaceDetector;
use facetrack_core::detection::infrastructure::classifier_loader::default_classifier_loader;
use facetrack_core::pipeline::frame_processor::{FrameProcessor, ProcessorConfig, ReseedPolicy};
use facetrack_core::pipeline::mode::{Mode, ModeError};
use facetrack_core::pipeline::pipeline_logger::SummaryPipelineLogger;
use facetrack_core::shared::constants::WORKING_SCALE;
use facetrack_core::video::domain::image_writer::ImageWriter;
use facetrack_core::video::domain::video_sink::VideoSink;
use facetrack_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Live face detection and CamShift face tracking.
#[derive(Parser)]
#[command(name = "facetrack")]
struct Cli {
    /// Replay a directory of images instead of opening a camera.
    #[arg(long)]
    images: Option<PathBuf>,

    /// Frame rate reported for --images.
    #[arg(long, default_value = "15")]
    fps: f64,

    /// Restart --images from the first file when it runs out.
    #[arg(long = "loop")]
    loop_images: bool,

    /// The --images files hold bottom-up rows.
    #[arg(long)]
    bottom_up: bool,

    /// Camera device index (needs the opencv feature).
    #[arg(long, default_value = "0")]
    camera: i32,

    /// Haar cascade file. Defaults to the bundled frontal-face cascade.
    #[arg(long)]
    cascade: Option<PathBuf>,

    /// Processing mode: idle, detect or track.
    #[arg(long, default_value = "track")]
    mode: Mode,

    /// Search by shrinking the image rather than scaling features.
    #[arg(long)]
    scale_image: bool,

    /// Report only the biggest face.
    #[arg(long)]
    biggest_object: bool,

    /// Stop at the first scale that finds a face (with --biggest-object).
    #[arg(long)]
    rough_search: bool,

    /// Skip regions with implausible edge density.
    #[arg(long)]
    edge_pruning: bool,

    /// Downscale factor applied before cascade matching.
    #[arg(long, default_value_t = WORKING_SCALE)]
    detect_scale: f64,

    /// Minimum brightness for a pixel to count towards the face colour.
    #[arg(long, default_value = "65")]
    vmin: u16,

    /// Minimum saturation for a pixel to count towards the face colour.
    #[arg(long, default_value = "55")]
    smin: u16,

    /// Rebuild the colour model from every successful detection.
    #[arg(long)]
    reseed_on_detection: bool,

    /// Mirror frames left to right.
    #[arg(long)]
    mirror_horizontal: bool,

    /// Mirror frames top to bottom.
    #[arg(long)]
    mirror_vertical: bool,

    /// Do not draw detection and tracking shapes into frames.
    #[arg(long)]
    no_overlay: bool,

    /// Stop after this many processed frames instead of running until the
    /// source ends.
    #[arg(long)]
    frames: Option<usize>,

    /// Process frames as fast as possible instead of at the capture rate.
    #[arg(long)]
    no_pacing: bool,

    /// Write every presented frame as a numbered PNG into this directory.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Save the last presented frame as a screenshot into this directory.
    #[arg(long)]
    screenshot_dir: Option<PathBuf>,

    /// Record the session as an AVI into this directory (needs the ffmpeg or
    /// opencv feature).
    #[arg(long)]
    record: Option<PathBuf>,
}

/// Consecutive empty ticks after which the source is considered finished.
const MAX_EMPTY_TICKS: usize = 30;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let source = build_source(&cli)?;
    let detector = build_detector(&cli)?;
    let config = ProcessorConfig {
        flags: DetectionFlags {
            scale_image: cli.scale_image,
            biggest_object: cli.biggest_object,
            rough_search: cli.rough_search,
            edge_pruning: cli.edge_pruning,
        },
        v_min: cli.vmin,
        s_min: cli.smin,
        mirror_horizontal: cli.mirror_horizontal,
        mirror_vertical: cli.mirror_vertical,
        draw_overlays: !cli.no_overlay,
        reseed: if cli.reseed_on_detection {
            ReseedPolicy::OnDetection
        } else {
            ReseedPolicy::OnLoss
        },
        load_default_cascade: cli.cascade.is_none(),
    };

    let mut processor = FrameProcessor::open(source, detector, config)
        .with_logger(Box::new(SummaryPipelineLogger::default()));
    let Some(info) = processor.capture_info().cloned() else {
        return Err("capture source could not be opened".into());
    };
    processor
        .set_mode(cli.mode)
        .map_err(|e| mode_refused(cli.mode, e))?;
    log::info!("Mode: {}, strategy: {}", cli.mode, processor.detection_strategy());

    if let Some(dir) = &cli.record {
        std::fs::create_dir_all(dir)?;
        let path = processor.start_recording(build_sink()?, dir)?;
        log::info!("Recording to {}", path.display());
    }
    if let Some(dir) = &cli.output_dir {
        std::fs::create_dir_all(dir)?;
    }

    let writer = ImageFileWriter::new();
    let period = info.tick_period();
    let mut processed = 0usize;
    let mut empty = 0usize;
    while cli.frames.map_or(true, |limit| processed < limit) {
        let started = Instant::now();
        match processor.tick() {
            Some(out) => {
                processed += 1;
                empty = 0;
                log::debug!("frame {}: {}", out.frame.index(), out.status);
                if let Some(dir) = &cli.output_dir {
                    let path = dir.join(format!("frame{processed:05}.png"));
                    writer.write(&path, out.frame)?;
                }
            }
            None => {
                empty += 1;
                if empty >= MAX_EMPTY_TICKS {
                    log::info!("Source ran dry after {processed} frames");
                    break;
                }
            }
        }
        if !cli.no_pacing {
            pace(started, period);
        }
    }

    if let Some(dir) = &cli.screenshot_dir {
        std::fs::create_dir_all(dir)?;
        let path = processor.save_screenshot(dir)?;
        log::info!("Screenshot written to {}", path.display());
    }
    processor.stop_recording()?;
    processor.summary();
    Ok(())
}

fn mode_refused(mode: Mode, e: ModeError) -> String {
    match e {
        ModeError::NoClassifierModel => format!(
            "cannot start {mode} mode: {e}; pass --cascade with a build that has \
             --features opencv, or run with --mode idle"
        ),
        ModeError::CaptureUnavailable => format!("cannot start {mode} mode: {e}"),
    }
}

fn pace(started: Instant, period: Duration) {
    if let Some(rest) = period.checked_sub(started.elapsed()) {
        std::thread::sleep(rest);
    }
}

fn build_source(cli: &Cli) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    if let Some(dir) = &cli.images {
        return Ok(Box::new(
            ImageSequenceSource::new(dir, cli.fps)
                .looping(cli.loop_images)
                .bottom_up(cli.bottom_up),
        ));
    }
    camera_source(cli.camera)
}

#[cfg(feature = "opencv")]
fn camera_source(device: i32) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    use facetrack_core::capture::infrastructure::opencv_camera::OpenCvCamera;
    Ok(Box::new(OpenCvCamera::new(device)))
}

#[cfg(not(feature = "opencv"))]
fn camera_source(_device: i32) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    Err("camera capture needs the opencv feature; use --images to replay a directory".into())
}

fn build_detector(cli: &Cli) -> Result<Box<dyn FaceDetector>, Box<dyn std::error::Error>> {
    let mut detector = CascadeFaceDetector::with_scale(default_classifier_loader(), cli.detect_scale);
    if let Some(path) = &cli.cascade {
        detector.load_model(path)?;
    }
    log::info!(
        "Cascade detector at 1/{} scale, model {}",
        detector.scale(),
        detector
            .model_path()
            .map_or_else(|| "default".to_string(), |p| p.display().to_string())
    );
    Ok(Box::new(detector))
}

#[cfg(feature = "ffmpeg")]
fn build_sink() -> Result<Box<dyn VideoSink>, Box<dyn std::error::Error>> {
    use facetrack_core::video::infrastructure::ffmpeg_sink::FfmpegSink;
    Ok(Box::new(FfmpegSink::new()))
}

#[cfg(all(feature = "opencv", not(feature = "ffmpeg")))]
fn build_sink() -> Result<Box<dyn VideoSink>, Box<dyn std::error::Error>> {
    use facetrack_core::video::infrastructure::opencv_sink::OpenCvSink;
    Ok(Box::new(OpenCvSink::new()))
}

#[cfg(not(any(feature = "opencv", feature = "ffmpeg")))]
fn build_sink() -> Result<Box<dyn VideoSink>, Box<dyn std::error::Error>> {
    Err("recording needs the ffmpeg or opencv feature".into())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(dir) = &cli.images {
        if !dir.is_dir() {
            return Err(format!("Image directory not found: {}", dir.display()).into());
        }
    }
    if let Some(path) = &cli.cascade {
        if !path.is_file() {
            return Err(format!("Cascade file not found: {}", path.display()).into());
        }
    }
    if !(cli.fps.is_finite() && cli.fps > 0.0) {
        return Err(format!("FPS must be positive, got {}", cli.fps).into());
    }
    if !(cli.detect_scale.is_finite() && cli.detect_scale >= 1.0) {
        return Err(format!("Detect scale must be at least 1.0, got {}", cli.detect_scale).into());
    }
    if cli.vmin > 255 {
        return Err(format!("vmin must be between 0 and 255, got {}", cli.vmin).into());
    }
    if cli.smin > 255 {
        return Err(format!("smin must be between 0 and 255, got {}", cli.smin).into());
    }
    if cli.frames == Some(0) {
        return Err("--frames must be at least 1".into());
    }
    if cli.rough_search && !cli.biggest_object {
        log::warn!("--rough-search only applies together with --biggest-object");
    }
    Ok(())
}
