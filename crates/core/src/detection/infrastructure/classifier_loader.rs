use std::path::Path;

use crate::detection::domain::cascade_classifier::{CascadeClassifier, ClassifierLoader, ModelError};

/// Loader used when no cascade backend is compiled in. Every load fails, so
/// detection stays disabled while capture and tracking keep working.
pub struct UnavailableClassifierLoader;

impl ClassifierLoader for UnavailableClassifierLoader {
    fn load(&self, _path: &Path) -> Result<Box<dyn CascadeClassifier>, ModelError> {
        Err(ModelError::BackendUnavailable)
    }
}

/// The best cascade loader this build supports.
pub fn default_classifier_loader() -> Box<dyn ClassifierLoader> {
    #[cfg(feature = "opencv")]
    {
        Box::new(super::opencv_cascade::OpenCvClassifierLoader)
    }
    #[cfg(not(feature = "opencv"))]
    {
        log::debug!("Built without the opencv feature; face detection unavailable");
        Box::new(UnavailableClassifierLoader)
    }
}
