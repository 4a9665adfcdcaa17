use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::detection::domain::cascade_classifier::{
    CascadeClassifier, CascadeParams, ClassifierLoader, ModelError,
};
use crate::detection::domain::detection_strategy::DetectionStrategy;
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::constants::WORKING_SCALE;
use crate::shared::frame::Frame;
use crate::shared::geometry::Rect;

use super::grayscale;

/// Face detector running a cascade classifier on a shrunken, equalised
/// grayscale copy of each frame.
///
/// The same `scale` shrinks the input and re-expands the results, so the
/// returned rectangles line up with the source frame.
pub struct CascadeFaceDetector {
    loader: Box<dyn ClassifierLoader>,
    classifier: Option<Box<dyn CascadeClassifier>>,
    model_path: Option<PathBuf>,
    scale: f64,
}

impl CascadeFaceDetector {
    pub fn new(loader: Box<dyn ClassifierLoader>) -> Self {
        Self::with_scale(loader, WORKING_SCALE)
    }

    pub fn with_scale(loader: Box<dyn ClassifierLoader>, scale: f64) -> Self {
        Self {
            loader,
            classifier: None,
            model_path: None,
            scale: if scale > 0.0 { scale } else { WORKING_SCALE },
        }
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }
}

impl FaceDetector for CascadeFaceDetector {
    fn load_model(&mut self, path: &Path) -> Result<(), ModelError> {
        if !path.is_file() {
            return Err(ModelError::NotFound(path.to_path_buf()));
        }
        let classifier = self.loader.load(path)?;
        log::info!("Loaded cascade model {}", path.display());
        self.classifier = Some(classifier);
        self.model_path = Some(path.to_path_buf());
        Ok(())
    }

    fn has_model(&self) -> bool {
        self.classifier.is_some()
    }

    fn detect(
        &mut self,
        frame: &Frame,
        strategy: DetectionStrategy,
    ) -> Result<Vec<Rect>, Box<dyn std::error::Error>> {
        let Some(classifier) = self.classifier.as_mut() else {
            return Ok(Vec::new());
        };

        let start = Instant::now();
        let small = grayscale::prepare(frame, self.scale);
        let params = CascadeParams::new(strategy);
        let found = classifier.detect_multi_scale(&small, &params)?;

        let mut rects: Vec<Rect> = found
            .iter()
            .map(|r| grayscale::to_frame_coords(r, self.scale))
            .collect();

        if strategy.is_single_object() && rects.len() > 1 {
            if let Some(biggest) = rects.iter().copied().max_by_key(Rect::area) {
                rects = vec![biggest];
            }
        }

        log::debug!(
            "detection time = {:.2} ms ({} found, {strategy})",
            start.elapsed().as_secs_f64() * 1000.0,
            rects.len()
        );
        Ok(rects)
    }
}
