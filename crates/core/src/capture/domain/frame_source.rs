use std::time::Duration;

use thiserror::Error;

use crate::shared::constants::FALLBACK_FPS;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("capture device {source_name} unavailable: {reason}")]
    DeviceUnavailable { source_name: String, reason: String },
    #[error("capture source {source_name} produced no frames")]
    Empty { source_name: String },
    #[error("capture I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Geometry and pacing of an opened capture source, fixed at `open()` time.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureInfo {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    /// Frame rate reported by the device; may be zero or negative.
    pub reported_fps: f64,
}

impl CaptureInfo {
    /// Reported FPS, or the fallback rate when the device reports nothing usable.
    pub fn fps(&self) -> f64 {
        if self.reported_fps.is_finite() && self.reported_fps > 0.0 {
            self.reported_fps
        } else {
            FALLBACK_FPS
        }
    }

    /// Period of the processing loop.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps())
    }

    /// Frame rate for recorded video: half the camera rate, 5 fps for slow
    /// devices.
    pub fn recording_fps(&self) -> f64 {
        let fps = self.fps();
        if fps < 10.0 {
            5.0
        } else {
            fps / 2.0
        }
    }
}

/// Abstracts the camera device.
///
/// `open` fixes the frame geometry from the first successful frame.
/// `next_frame` must not block indefinitely; `None` means "no frame this
/// tick" and is not an error.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<CaptureInfo, CaptureError>;

    fn next_frame(&mut self) -> Option<Frame>;

    /// Human-readable name for logs.
    fn name(&self) -> String;
}
