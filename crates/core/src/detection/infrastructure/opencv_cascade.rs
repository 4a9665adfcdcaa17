use std::path::Path;

use image::GrayImage;
use opencv::core::{Mat, Size, Vector};
use opencv::objdetect;
use opencv::prelude::*;

use crate::detection::domain::cascade_classifier::{
    CascadeClassifier, CascadeParams, ClassifierLoader, ModelError,
};
use crate::detection::domain::detection_strategy::DetectionStrategy;
use crate::shared::geometry::Rect;

/// Haar/LBP cascade evaluated by OpenCV's `objdetect` module.
pub struct OpenCvCascade {
    inner: objdetect::CascadeClassifier,
}

impl OpenCvCascade {
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let invalid = |reason: String| ModelError::Invalid {
            path: path.to_path_buf(),
            reason,
        };
        let path_str = path
            .to_str()
            .ok_or_else(|| invalid("path is not valid UTF-8".into()))?;
        let inner = objdetect::CascadeClassifier::new(path_str).map_err(|e| invalid(e.to_string()))?;
        if inner.empty().map_err(|e| invalid(e.to_string()))? {
            return Err(invalid("no cascade stages could be read".into()));
        }
        Ok(Self { inner })
    }
}

/// OpenCV search flags for a strategy.
pub fn cascade_flags(strategy: DetectionStrategy) -> i32 {
    match strategy {
        DetectionStrategy::ScaleByResize => objdetect::CASCADE_SCALE_IMAGE,
        DetectionStrategy::BiggestObject { rough_search: false } => {
            objdetect::CASCADE_FIND_BIGGEST_OBJECT
        }
        DetectionStrategy::BiggestObject { rough_search: true } => {
            objdetect::CASCADE_FIND_BIGGEST_OBJECT | objdetect::CASCADE_DO_ROUGH_SEARCH
        }
        DetectionStrategy::EdgePruning => objdetect::CASCADE_DO_CANNY_PRUNING,
        DetectionStrategy::Exhaustive => 0,
    }
}

impl CascadeClassifier for OpenCvCascade {
    fn detect_multi_scale(
        &mut self,
        image: &GrayImage,
        params: &CascadeParams,
    ) -> Result<Vec<Rect>, Box<dyn std::error::Error>> {
        let mat = Mat::new_rows_cols_with_data(
            image.height() as i32,
            image.width() as i32,
            image.as_raw().as_slice(),
        )?;
        let min = params.min_size as i32;
        let mut found = Vector::<opencv::core::Rect>::new();
        self.inner.detect_multi_scale(
            &*mat,
            &mut found,
            params.scale_step,
            params.min_neighbors,
            cascade_flags(params.strategy),
            Size::new(min, min),
            Size::default(),
        )?;
        Ok(found
            .iter()
            .map(|r| Rect::new(r.x, r.y, r.width, r.height))
            .collect())
    }
}

/// Loads cascade XML files through OpenCV.
pub struct OpenCvClassifierLoader;

impl ClassifierLoader for OpenCvClassifierLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn CascadeClassifier>, ModelError> {
        Ok(Box::new(OpenCvCascade::load(path)?))
    }
}
