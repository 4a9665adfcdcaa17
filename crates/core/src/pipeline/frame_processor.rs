use std::path::{Path, PathBuf};
use std::time::Instant;

use thiserror::Error;

use crate::capture::domain::frame_source::{CaptureInfo, FrameSource};
use crate::detection::domain::cascade_classifier::ModelError;
use crate::detection::domain::detection_strategy::{DetectionFlags, DetectionStrategy};
use crate::detection::domain::face_detector::FaceDetector;
use crate::pipeline::frame_normalizer::FrameNormalizer;
use crate::pipeline::mode::{Mode, ModeError};
use crate::pipeline::overlay::{self, OverlayShape};
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::shared::constants::{
    DEFAULT_S_MIN, DEFAULT_V_MIN, RECORDING_EXTENSION, RECORDING_PREFIX, SCREENSHOT_EXTENSION,
    SCREENSHOT_PREFIX,
};
use crate::shared::frame::Frame;
use crate::shared::geometry::{OrientedRegion, Rect};
use crate::shared::model_resolver;
use crate::tracking::hue_tracker::HueTracker;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_sink::{RecordingFormat, VideoSink};
use crate::video::infrastructure::image_file_writer::ImageFileWriter;
use crate::video::infrastructure::output_paths::next_free_path;

/// When the tracker's colour model is rebuilt from a fresh detection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReseedPolicy {
    /// Only after the target is lost (or on entering tracking).
    #[default]
    OnLoss,
    /// Whenever the biggest-object pass finds a face, every tick.
    OnDetection,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProcessorConfig {
    pub flags: DetectionFlags,
    pub v_min: u16,
    pub s_min: u16,
    pub mirror_horizontal: bool,
    pub mirror_vertical: bool,
    /// Draw overlay shapes into the presented frame.
    pub draw_overlays: bool,
    pub reseed: ReseedPolicy,
    /// Look for the default cascade when the detector has no model yet.
    pub load_default_cascade: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            flags: DetectionFlags::default(),
            v_min: DEFAULT_V_MIN,
            s_min: DEFAULT_S_MIN,
            mirror_horizontal: false,
            mirror_vertical: false,
            draw_overlays: true,
            reseed: ReseedPolicy::default(),
            load_default_cascade: true,
        }
    }
}

#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("capture device unavailable")]
    CaptureUnavailable,
    #[error("a recording is already running")]
    AlreadyRecording,
    #[error("video sink failed: {0}")]
    Sink(Box<dyn std::error::Error + Send + Sync>),
}

impl RecordingError {
    fn sink(e: Box<dyn std::error::Error>) -> Self {
        RecordingError::Sink(e.to_string().into())
    }
}

#[derive(Error, Debug)]
pub enum ScreenshotError {
    #[error("no frame has been presented yet")]
    NoFrame,
    #[error("could not write screenshot: {0}")]
    Write(Box<dyn std::error::Error + Send + Sync>),
}

/// Everything the presentation layer gets for one tick.
#[derive(Debug)]
pub struct TickOutput<'a> {
    /// Oriented, annotated frame in presentation channel order.
    pub frame: &'a Frame,
    /// Shapes for this tick only; the processor keeps no copy.
    pub shapes: Vec<OverlayShape>,
    pub status: &'a str,
}

/// Per-frame orchestrator: pulls a frame, runs detection or tracking
/// depending on the mode, and hands back the annotated result.
///
/// Owns the frame source, detector and tracker for its whole lifetime; all
/// state is touched only from `tick` and the mode/configuration setters.
pub struct FrameProcessor {
    source: Box<dyn FrameSource>,
    capture: Option<CaptureInfo>,
    detector: Box<dyn FaceDetector>,
    tracker: Option<HueTracker>,
    normalizer: FrameNormalizer,
    config: ProcessorConfig,
    strategy: DetectionStrategy,
    mode: Mode,
    target: Option<Rect>,
    shapes: Vec<OverlayShape>,
    last_frame: Option<Frame>,
    recording: Option<Box<dyn VideoSink>>,
    logger: Box<dyn PipelineLogger>,
    status: String,
    ticks: usize,
}

impl FrameProcessor {
    /// Opens `source` and prepares the vision pipeline.
    ///
    /// An unavailable source is reported once here; afterwards `tick`
    /// returns `None` and every mode change except to idle is refused.
    pub fn open(
        mut source: Box<dyn FrameSource>,
        mut detector: Box<dyn FaceDetector>,
        config: ProcessorConfig,
    ) -> Self {
        let capture = match source.open() {
            Ok(info) => {
                log::info!(
                    "Capture {} opened: {}x{}, {:.1} fps",
                    source.name(),
                    info.width,
                    info.height,
                    info.fps()
                );
                Some(info)
            }
            Err(e) => {
                log::warn!("{e}; detection, tracking and recording are disabled");
                None
            }
        };

        if config.load_default_cascade && !detector.has_model() {
            match model_resolver::resolve_default_cascade() {
                Ok(path) => {
                    if let Err(e) = detector.load_model(&path) {
                        log::warn!("Default cascade not usable: {e}");
                    }
                }
                Err(e) => log::debug!("{e}"),
            }
        }

        let tracker = capture.as_ref().map(|info| {
            let mut tracker = HueTracker::new(info.width, info.height);
            tracker.set_v_min(config.v_min);
            tracker.set_s_min(config.s_min);
            tracker
        });

        let status = if capture.is_some() {
            Mode::Idle.to_string()
        } else {
            "capture unavailable".to_string()
        };

        Self {
            source,
            capture,
            detector,
            tracker,
            normalizer: FrameNormalizer {
                mirror_horizontal: config.mirror_horizontal,
                mirror_vertical: config.mirror_vertical,
                ..FrameNormalizer::default()
            },
            strategy: DetectionStrategy::from_flags(config.flags),
            config,
            mode: Mode::Idle,
            target: None,
            shapes: Vec::new(),
            last_frame: None,
            recording: None,
            logger: Box::new(NullPipelineLogger),
            status,
            ticks: 0,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn is_capture_active(&self) -> bool {
        self.capture.is_some()
    }

    pub fn capture_info(&self) -> Option<&CaptureInfo> {
        self.capture.as_ref()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn has_classifier_model(&self) -> bool {
        self.detector.has_model()
    }

    pub fn detection_strategy(&self) -> DetectionStrategy {
        self.strategy
    }

    pub fn detection_flags(&self) -> DetectionFlags {
        self.config.flags
    }

    /// Rectangle the tracker will continue from, if a target is held.
    pub fn target(&self) -> Option<Rect> {
        self.target
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    pub fn tracking_thresholds(&self) -> (u16, u16) {
        match &self.tracker {
            Some(tracker) => (tracker.v_min(), tracker.s_min()),
            None => (self.config.v_min, self.config.s_min),
        }
    }

    pub fn summary(&self) {
        self.logger.summary();
    }

    /// Switches mode. Leaving tracking discards the colour model and target;
    /// entering tracking always starts from a fresh detection.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), ModeError> {
        if mode.needs_classifier() {
            if self.capture.is_none() {
                return Err(ModeError::CaptureUnavailable);
            }
            if !self.detector.has_model() {
                return Err(ModeError::NoClassifierModel);
            }
        }

        if self.mode == Mode::Tracking || mode == Mode::Tracking {
            self.drop_target();
        }
        if self.mode != mode {
            self.logger.info(&format!("Mode: {} -> {mode}", self.mode));
        }
        self.mode = mode;
        self.shapes.clear();
        Ok(())
    }

    /// Like [`set_mode`](Self::set_mode), but when no model is loaded asks
    /// `supply` for a cascade file first. The mode is unchanged if none is
    /// supplied or it fails to load.
    pub fn set_mode_or_load<F>(&mut self, mode: Mode, supply: F) -> Result<(), ModeError>
    where
        F: FnOnce() -> Option<PathBuf>,
    {
        if mode.needs_classifier() && self.capture.is_some() && !self.detector.has_model() {
            if let Some(path) = supply() {
                if let Err(e) = self.load_classifier_model(&path) {
                    log::warn!("{e}");
                }
            }
        }
        self.set_mode(mode)
    }

    pub fn set_detection_flags(&mut self, flags: DetectionFlags) {
        self.config.flags = flags;
        self.strategy = DetectionStrategy::from_flags(flags);
        log::debug!("Detection strategy: {}", self.strategy);
    }

    /// Takes effect on the next tracking tick; an already built colour
    /// model is not rebuilt.
    pub fn set_tracking_thresholds(&mut self, v_min: u16, s_min: u16) {
        self.config.v_min = v_min;
        self.config.s_min = s_min;
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.set_v_min(v_min);
            tracker.set_s_min(s_min);
        }
    }

    pub fn set_mirror(&mut self, horizontal: bool, vertical: bool) {
        self.config.mirror_horizontal = horizontal;
        self.config.mirror_vertical = vertical;
        self.normalizer.mirror_horizontal = horizontal;
        self.normalizer.mirror_vertical = vertical;
    }

    /// Replaces the classifier model. On failure the previous model stays.
    pub fn load_classifier_model(&mut self, path: &Path) -> Result<(), ModelError> {
        self.detector.load_model(path)
    }

    fn drop_target(&mut self) {
        self.target = None;
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.release();
        }
    }

    /// Runs one processing step. `None` when there is no frame this tick
    /// (capture unavailable, device hiccup, or a frame of the wrong size).
    pub fn tick(&mut self) -> Option<TickOutput<'_>> {
        let (width, height) = {
            let info = self.capture.as_ref()?;
            (info.width, info.height)
        };

        let started = Instant::now();
        let Some(mut frame) = self.source.next_frame() else {
            log::debug!("No frame from {}", self.source.name());
            return None;
        };
        if frame.size() != (width, height) {
            log::debug!(
                "Dropping {:?} frame, capture is {width}x{height}",
                frame.size()
            );
            return None;
        }
        self.normalizer.orient(&mut frame);
        self.logger.timing("capture", elapsed_ms(started));

        if let Some(sink) = self.recording.as_mut() {
            if let Err(e) = sink.write(&frame) {
                log::warn!("Recording frame {} failed: {e}", frame.index());
            }
        }

        self.shapes.clear();
        match self.mode {
            Mode::Idle => self.status = Mode::Idle.to_string(),
            Mode::Detecting => self.detect(&frame),
            Mode::Tracking => self.track(&frame),
        }

        let started = Instant::now();
        if self.config.draw_overlays {
            overlay::draw(&mut frame, &self.shapes);
        }
        self.normalizer.present(&mut frame);
        self.logger.timing("present", elapsed_ms(started));

        self.ticks += 1;
        self.logger.progress(self.ticks);

        let shapes = std::mem::take(&mut self.shapes);
        let frame = &*self.last_frame.insert(frame);
        Some(TickOutput {
            frame,
            shapes,
            status: &self.status,
        })
    }

    fn detect(&mut self, frame: &Frame) {
        let started = Instant::now();
        let faces = match self.detector.detect(frame, self.strategy) {
            Ok(faces) => faces,
            Err(e) => {
                log::debug!("Detection failed: {e}");
                Vec::new()
            }
        };
        let ms = elapsed_ms(started);
        self.logger.timing("detect", ms);
        self.logger.metric("faces", faces.len() as f64);

        self.status = format!("detecting: {} face(s) in {ms:.1} ms", faces.len());
        self.shapes
            .extend(faces.into_iter().map(OverlayShape::Rectangle));
    }

    /// Bootstrap detection restricted to the single biggest face.
    fn acquire(&mut self, frame: &Frame) -> Option<Rect> {
        let started = Instant::now();
        let found = match self.detector.detect(frame, DetectionStrategy::TRACKING_BOOTSTRAP) {
            Ok(faces) => faces.into_iter().find(Rect::is_valid),
            Err(e) => {
                log::debug!("Bootstrap detection failed: {e}");
                None
            }
        };
        self.logger.timing("detect", elapsed_ms(started));
        found
    }

    fn track(&mut self, frame: &Frame) {
        let holds_target = self.target.is_some_and(|t| t.is_valid())
            && self.tracker.as_ref().is_some_and(HueTracker::is_tracking);
        if !holds_target {
            // Acquisition tick: seed the colour model, re-estimate from the next frame on.
            self.target = None;
            let acquired = match self.acquire(frame) {
                Some(face) => self.start_session(frame, face).then_some(face),
                None => None,
            };
            match acquired {
                Some(face) => {
                    let region = OrientedRegion::from_rect(&face);
                    self.status = describe(&region);
                    self.shapes.push(OverlayShape::Region(region));
                }
                None => self.status = "tracking: awaiting target".to_string(),
            }
            return;
        }

        if self.config.reseed == ReseedPolicy::OnDetection {
            if let Some(face) = self.acquire(frame) {
                self.start_session(frame, face);
            }
        }

        let Some(target) = self.target else {
            self.status = "tracking: awaiting target".to_string();
            return;
        };

        let seed = target.clamp_to(frame.width(), frame.height());
        if !seed.is_valid() {
            self.drop_target();
            self.status = "tracking: awaiting target".to_string();
            return;
        }

        let Some(tracker) = self.tracker.as_mut() else {
            return;
        };
        let started = Instant::now();
        let result = tracker.track_face(frame);
        self.logger.timing("track", elapsed_ms(started));

        match result {
            Ok(Some(region)) => {
                self.target = tracker.search_window().or(Some(seed));
                self.status = describe(&region);
                self.shapes.push(OverlayShape::Region(region));
            }
            Ok(None) => {
                self.logger.info("Target lost");
                self.drop_target();
                self.status = "tracking: target lost".to_string();
            }
            Err(e) => {
                log::debug!("Tracking skipped: {e}");
                self.drop_target();
                self.status = "tracking: awaiting target".to_string();
            }
        }
    }

    /// Rebuilds the colour model from `face`. False if the tracker refused it.
    fn start_session(&mut self, frame: &Frame, face: Rect) -> bool {
        let Some(tracker) = self.tracker.as_mut() else {
            return false;
        };
        match tracker.start_tracking(frame, face) {
            Ok(()) => {
                if self.target.is_none() {
                    self.logger.info(&format!("Target acquired at {face:?}"));
                }
                self.target = Some(face);
                true
            }
            Err(e) => {
                log::debug!("Could not seed tracker: {e}");
                false
            }
        }
    }

    /// Writes the last presented frame as `webcamPic{N}.jpg` in `dir`.
    pub fn save_screenshot(&self, dir: &Path) -> Result<PathBuf, ScreenshotError> {
        self.save_screenshot_with(dir, &ImageFileWriter::new())
    }

    pub fn save_screenshot_with(
        &self,
        dir: &Path,
        writer: &dyn ImageWriter,
    ) -> Result<PathBuf, ScreenshotError> {
        let frame = self.last_frame.as_ref().ok_or(ScreenshotError::NoFrame)?;
        let path = next_free_path(dir, SCREENSHOT_PREFIX, SCREENSHOT_EXTENSION);
        writer
            .write(&path, frame)
            .map_err(|e| ScreenshotError::Write(e.to_string().into()))?;
        log::info!("Screenshot saved to {}", path.display());
        Ok(path)
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Starts recording to the next free `webcamVid{N}.avi` in `dir`.
    pub fn start_recording(
        &mut self,
        sink: Box<dyn VideoSink>,
        dir: &Path,
    ) -> Result<PathBuf, RecordingError> {
        let path = next_free_path(dir, RECORDING_PREFIX, RECORDING_EXTENSION);
        self.start_recording_at(sink, &path)?;
        Ok(path)
    }

    pub fn start_recording_at(
        &mut self,
        mut sink: Box<dyn VideoSink>,
        path: &Path,
    ) -> Result<(), RecordingError> {
        let info = self.capture.as_ref().ok_or(RecordingError::CaptureUnavailable)?;
        if self.recording.is_some() {
            return Err(RecordingError::AlreadyRecording);
        }
        let format = RecordingFormat {
            width: info.width,
            height: info.height,
            fps: info.recording_fps(),
        };
        sink.open(path, &format).map_err(RecordingError::sink)?;
        self.logger
            .info(&format!("Recording to {} at {} fps", path.display(), format.fps));
        self.recording = Some(sink);
        Ok(())
    }

    /// Closes the active recording, if any.
    pub fn stop_recording(&mut self) -> Result<(), RecordingError> {
        match self.recording.take() {
            Some(mut sink) => sink.close().map_err(RecordingError::sink),
            None => Ok(()),
        }
    }
}

impl Drop for FrameProcessor {
    fn drop(&mut self) {
        if let Err(e) = self.stop_recording() {
            log::warn!("Closing recording failed: {e}");
        }
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

fn describe(region: &OrientedRegion) -> String {
    format!(
        "tracking: centre ({:.0}, {:.0}) size {:.0}x{:.0} angle {:.0}",
        region.center.0, region.center.1, region.size.0, region.size.1, region.angle
    )
}
