//! Camera frame processing: cascade face detection and hue-histogram
//! (CamShift) face tracking over a live capture source.

pub mod capture;
pub mod detection;
pub mod pipeline;
pub mod shared;
pub mod tracking;
pub mod video;
