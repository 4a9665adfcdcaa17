pub mod cascade_classifier;
pub mod detection_strategy;
pub mod face_detector;
