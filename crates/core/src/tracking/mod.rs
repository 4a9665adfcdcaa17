pub mod cam_shift;
pub mod color_model;
pub mod hsv;
pub mod hue_tracker;
