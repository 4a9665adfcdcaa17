use std::path::{Path, PathBuf};

use image::GrayImage;
use thiserror::Error;

use crate::shared::constants::{CASCADE_MIN_NEIGHBORS, CASCADE_MIN_SIZE, CASCADE_SCALE_STEP};
use crate::shared::geometry::Rect;

use super::detection_strategy::DetectionStrategy;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("cascade file not found: {0}")]
    NotFound(PathBuf),
    #[error("{path} is not a loadable cascade definition: {reason}")]
    Invalid { path: PathBuf, reason: String },
    #[error("no cascade backend compiled in (build with --features opencv)")]
    BackendUnavailable,
}

/// Parameters of one multi-scale cascade search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CascadeParams {
    pub scale_step: f64,
    pub min_neighbors: i32,
    /// Smallest object size in the searched image's pixels.
    pub min_size: u32,
    pub strategy: DetectionStrategy,
}

impl CascadeParams {
    pub fn new(strategy: DetectionStrategy) -> Self {
        Self {
            scale_step: CASCADE_SCALE_STEP,
            min_neighbors: CASCADE_MIN_NEIGHBORS,
            min_size: CASCADE_MIN_SIZE,
            strategy,
        }
    }
}

/// A loaded cascade model able to run multi-scale matching on a prepared
/// (grayscale, equalised) image.
///
/// Returned rectangles are in the coordinates of `image`.
pub trait CascadeClassifier: Send {
    fn detect_multi_scale(
        &mut self,
        image: &GrayImage,
        params: &CascadeParams,
    ) -> Result<Vec<Rect>, Box<dyn std::error::Error>>;
}

/// Turns a cascade definition file into a [`CascadeClassifier`].
pub trait ClassifierLoader: Send {
    fn load(&self, path: &Path) -> Result<Box<dyn CascadeClassifier>, ModelError>;
}
