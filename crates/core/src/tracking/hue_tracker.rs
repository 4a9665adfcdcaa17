use ndarray::{Array2, Array3};
use thiserror::Error;

use crate::shared::constants::{DEFAULT_S_MIN, DEFAULT_V_MAX, DEFAULT_V_MIN};
use crate::shared::frame::Frame;
use crate::shared::geometry::{OrientedRegion, Rect};

use super::cam_shift::{self, TermCriteria};
use super::color_model::ColorModel;
use super::hsv::{self, Gating};

#[derive(Error, Debug, PartialEq)]
pub enum TrackerError {
    #[error("frame is {actual:?}, tracker buffers are {expected:?}")]
    FrameSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("seed {0:?} does not overlap the frame")]
    InvalidSeed(Rect),
    #[error("tracking has not been started")]
    NotStarted,
}

/// CamShift tracker following a hue distribution across frames.
///
/// Scratch planes are allocated once for a fixed frame size and reused on
/// every call. The colour model lives from `start_tracking` until
/// `release` (or the next `start_tracking`).
pub struct HueTracker {
    width: u32,
    height: u32,
    hsv: Array3<u8>,
    hue: Array2<u8>,
    mask: Array2<u8>,
    probability: Array2<u8>,
    gating: Gating,
    criteria: TermCriteria,
    model: Option<ColorModel>,
    window: Option<Rect>,
}

impl HueTracker {
    pub fn new(width: u32, height: u32) -> Self {
        let (rows, cols) = (height as usize, width as usize);
        Self {
            width,
            height,
            hsv: Array3::zeros((rows, cols, 3)),
            hue: Array2::zeros((rows, cols)),
            mask: Array2::zeros((rows, cols)),
            probability: Array2::zeros((rows, cols)),
            gating: Gating {
                v_min: DEFAULT_V_MIN,
                v_max: DEFAULT_V_MAX,
                s_min: DEFAULT_S_MIN,
            },
            criteria: TermCriteria::default(),
            model: None,
            window: None,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn prepare_planes(&mut self, frame: &Frame) -> Result<(), TrackerError> {
        if frame.size() != self.size() {
            return Err(TrackerError::FrameSize {
                expected: self.size(),
                actual: frame.size(),
            });
        }
        hsv::convert_frame(frame, &mut self.hsv);
        hsv::split_hue_and_mask(&self.hsv, self.gating, &mut self.hue, &mut self.mask);
        Ok(())
    }

    /// Builds the colour model from the gated pixels inside `seed` and makes
    /// `seed` the first search window.
    pub fn start_tracking(&mut self, frame: &Frame, seed: Rect) -> Result<(), TrackerError> {
        self.prepare_planes(frame)?;
        let seed_in_frame = seed.intersect(&Rect::new(0, 0, self.width as i32, self.height as i32));
        if !seed_in_frame.is_valid() {
            return Err(TrackerError::InvalidSeed(seed));
        }

        let model = ColorModel::build(&self.hue, &self.mask, seed_in_frame);
        log::debug!(
            "Colour model built from {seed_in_frame:?} (peak {:.1})",
            model.peak()
        );
        self.model = Some(model);
        self.window = Some(seed_in_frame);
        Ok(())
    }

    /// Re-estimates the target in `frame`.
    ///
    /// `Ok(None)` means the target was lost: no gated probability mass was
    /// found near the previous window. The search window is kept so a
    /// caller may retry, but most callers re-acquire instead.
    pub fn track_face(&mut self, frame: &Frame) -> Result<Option<OrientedRegion>, TrackerError> {
        let Some(window) = self.window.filter(|_| self.model.is_some()) else {
            return Err(TrackerError::NotStarted);
        };
        self.prepare_planes(frame)?;
        if let Some(model) = self.model.as_ref() {
            model.back_project(&self.hue, &self.mask, &mut self.probability);
        }

        let window = window.clamp_to(self.width, self.height);
        let Some(result) = cam_shift::cam_shift(&self.probability.view(), window, self.criteria) else {
            return Ok(None);
        };

        self.window = Some(result.window);
        let mut region = result.region;
        // Image rows grow downwards; report angles counter-clockwise.
        region.angle = -region.angle;
        Ok(Some(region))
    }

    pub fn is_tracking(&self) -> bool {
        self.model.is_some()
    }

    pub fn search_window(&self) -> Option<Rect> {
        self.window
    }

    /// Drops the colour model and search window.
    pub fn release(&mut self) {
        self.model = None;
        self.window = None;
    }

    pub fn set_v_min(&mut self, v_min: u16) {
        self.gating.v_min = v_min;
    }

    pub fn set_s_min(&mut self, s_min: u16) {
        self.gating.s_min = s_min;
    }

    pub fn v_min(&self) -> u16 {
        self.gating.v_min
    }

    pub fn s_min(&self) -> u16 {
        self.gating.s_min
    }
}
