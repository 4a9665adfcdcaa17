use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::geometry::Rect;

use super::cascade_classifier::ModelError;
use super::detection_strategy::DetectionStrategy;

/// Domain interface for face detection.
///
/// `detect` returns frame-coordinate rectangles; an empty list (not an
/// error) when nothing is found or no model is loaded.
pub trait FaceDetector: Send {
    /// Replaces the current classifier model. On failure the previous model
    /// is kept.
    fn load_model(&mut self, path: &Path) -> Result<(), ModelError>;

    fn has_model(&self) -> bool;

    fn detect(
        &mut self,
        frame: &Frame,
        strategy: DetectionStrategy,
    ) -> Result<Vec<Rect>, Box<dyn std::error::Error>>;
}
