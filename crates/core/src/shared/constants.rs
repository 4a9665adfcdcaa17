/// Cascade file looked up at startup when no model was given explicitly.
pub const DEFAULT_CASCADE_NAME: &str = "haarcascade_frontalface_alt2.xml";
pub const CASCADE_DIR_NAME: &str = "haarcascades";
pub const APP_DIR_NAME: &str = "facetrack";

/// Downscale ratio applied before cascade matching. The same factor maps
/// results back to frame coordinates.
pub const WORKING_SCALE: f64 = 1.3;

/// Per-level scale step of the multi-scale cascade search.
pub const CASCADE_SCALE_STEP: f64 = 1.2;
pub const CASCADE_MIN_NEIGHBORS: i32 = 3;
/// Smallest object searched for, in working-scale pixels.
pub const CASCADE_MIN_SIZE: u32 = 64;

pub const HUE_BINS: usize = 30;
/// 8-bit hue range (degrees halved).
pub const HUE_RANGE: u16 = 180;
pub const DEFAULT_V_MIN: u16 = 65;
pub const DEFAULT_V_MAX: u16 = 256;
pub const DEFAULT_S_MIN: u16 = 55;

pub const CAMSHIFT_MAX_ITER: usize = 10;
pub const CAMSHIFT_EPSILON: f64 = 1.0;

/// Used when the device reports a non-positive frame rate.
pub const FALLBACK_FPS: f64 = 17.0;

pub const SCREENSHOT_PREFIX: &str = "webcamPic";
pub const SCREENSHOT_EXTENSION: &str = "jpg";
pub const SCREENSHOT_JPEG_QUALITY: u8 = 80;
pub const RECORDING_PREFIX: &str = "webcamVid";
pub const RECORDING_EXTENSION: &str = "avi";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
