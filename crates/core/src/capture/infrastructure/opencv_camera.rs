use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio;

use crate::capture::domain::frame_source::{CaptureError, CaptureInfo, FrameSource};
use crate::shared::frame::Frame;

/// Live camera capture through OpenCV's `VideoCapture`.
pub struct OpenCvCamera {
    device: i32,
    capture: Option<videoio::VideoCapture>,
    buffer: Mat,
    index: usize,
}

impl OpenCvCamera {
    pub fn new(device: i32) -> Self {
        Self {
            device,
            capture: None,
            buffer: Mat::default(),
            index: 0,
        }
    }

    fn unavailable(&self, reason: impl ToString) -> CaptureError {
        CaptureError::DeviceUnavailable {
            source_name: self.name(),
            reason: reason.to_string(),
        }
    }

    fn read_frame(&mut self) -> opencv::Result<Option<Frame>> {
        let Some(capture) = self.capture.as_mut() else {
            return Ok(None);
        };
        if !capture.read(&mut self.buffer)? || self.buffer.empty() {
            return Ok(None);
        }
        let mat = if self.buffer.is_continuous() {
            self.buffer.try_clone()?
        } else {
            // Non-continuous mats (ROI views) are copied into a packed buffer.
            let mut packed = Mat::default();
            self.buffer.copy_to(&mut packed)?;
            packed
        };
        let width = mat.cols() as u32;
        let height = mat.rows() as u32;
        let channels = mat.channels() as u8;
        let frame = Frame::new(mat.data_bytes()?.to_vec(), width, height, channels, self.index);
        self.index += 1;
        Ok(Some(frame))
    }
}

impl FrameSource for OpenCvCamera {
    fn open(&mut self) -> Result<CaptureInfo, CaptureError> {
        let capture = videoio::VideoCapture::new(self.device, videoio::CAP_ANY)
            .map_err(|e| self.unavailable(e))?;
        if !capture.is_opened().map_err(|e| self.unavailable(e))? {
            return Err(self.unavailable("device could not be opened"));
        }
        let reported_fps = capture.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);
        let fallback_size = (
            capture.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0) as u32,
            capture.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0) as u32,
        );
        self.capture = Some(capture);

        // The first frame initialises the device and fixes the geometry;
        // device properties are only a fallback.
        let (width, height, channels) = match self.read_frame() {
            Ok(Some(frame)) => (frame.width(), frame.height(), frame.channels()),
            _ => (fallback_size.0, fallback_size.1, 3),
        };
        if width == 0 || height == 0 {
            self.capture = None;
            return Err(self.unavailable("device reported no frame size"));
        }

        log::info!(
            "Opened camera {} ({width}x{height}, reported {reported_fps:.1} fps)",
            self.device
        );

        Ok(CaptureInfo {
            width,
            height,
            channels,
            reported_fps,
        })
    }

    fn next_frame(&mut self) -> Option<Frame> {
        match self.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::debug!("Camera {} read failed: {e}", self.device);
                None
            }
        }
    }

    fn name(&self) -> String {
        format!("camera {}", self.device)
    }
}
