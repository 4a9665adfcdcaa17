use std::path::Path;

use crate::shared::frame::Frame;

/// Geometry and rate of a recording, fixed when the sink is opened.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RecordingFormat {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Abstracts video encoding so recording does not depend on a specific codec
/// library.
///
/// Frames arrive orientation-normalised and un-annotated, in either channel
/// order; sinks convert as needed.
pub trait VideoSink: Send {
    fn open(&mut self, path: &Path, format: &RecordingFormat) -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes and releases the output stream. Calling it twice is harmless.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
