pub mod cascade_face_detector;
pub mod classifier_loader;
pub mod grayscale;
#[cfg(feature = "opencv")]
pub mod opencv_cascade;
