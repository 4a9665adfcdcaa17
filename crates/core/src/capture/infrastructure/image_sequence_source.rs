use std::path::{Path, PathBuf};

use crate::capture::domain::frame_source::{CaptureError, CaptureInfo, FrameSource};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::{ColorOrder, Frame, FrameOrigin};

/// Replays a directory of still images as if they came from a camera.
///
/// Files are visited in lexical order. Frames are delivered in capture
/// channel order (BGR), like a real device.
pub struct ImageSequenceSource {
    dir: PathBuf,
    fps: f64,
    looping: bool,
    origin: FrameOrigin,
    files: Vec<PathBuf>,
    cursor: usize,
    index: usize,
}

impl ImageSequenceSource {
    pub fn new(dir: &Path, fps: f64) -> Self {
        Self {
            dir: dir.to_path_buf(),
            fps,
            looping: false,
            origin: FrameOrigin::TopLeft,
            files: Vec::new(),
            cursor: 0,
            index: 0,
        }
    }

    /// Restart from the first image after the last one instead of running dry.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Treat the stored images as bottom-up row dumps, such as frames saved
    /// straight from a bottom-left-origin device buffer.
    pub fn bottom_up(mut self, bottom_up: bool) -> Self {
        self.origin = if bottom_up {
            FrameOrigin::BottomLeft
        } else {
            FrameOrigin::TopLeft
        };
        self
    }

    fn list_images(dir: &Path) -> Result<Vec<PathBuf>, CaptureError> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_image(path))
            .collect();
        files.sort();
        Ok(files)
    }

    fn decode(&self, path: &Path) -> Option<Frame> {
        match image::open(path) {
            Ok(img) => {
                let rgb = img.to_rgb8();
                let (w, h) = rgb.dimensions();
                let mut frame = Frame::new(rgb.into_raw(), w, h, 3, self.index)
                    .with_order(ColorOrder::Rgb)
                    .with_origin(self.origin);
                frame.swap_red_blue();
                Some(frame)
            }
            Err(e) => {
                log::debug!("Skipping undecodable image {}: {e}", path.display());
                None
            }
        }
    }
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<CaptureInfo, CaptureError> {
        if !self.dir.is_dir() {
            return Err(CaptureError::DeviceUnavailable {
                source_name: self.name(),
                reason: "not a directory".to_string(),
            });
        }
        self.files = Self::list_images(&self.dir)?;
        self.cursor = 0;
        self.index = 0;

        let first = self
            .files
            .iter()
            .find_map(|path| self.decode(path))
            .ok_or_else(|| CaptureError::Empty {
                source_name: self.name(),
            })?;

        log::info!(
            "Opened image sequence {} ({} files, {}x{})",
            self.dir.display(),
            self.files.len(),
            first.width(),
            first.height()
        );

        Ok(CaptureInfo {
            width: first.width(),
            height: first.height(),
            channels: first.channels(),
            reported_fps: self.fps,
        })
    }

    fn next_frame(&mut self) -> Option<Frame> {
        if self.files.is_empty() {
            return None;
        }
        if self.cursor >= self.files.len() {
            if !self.looping {
                return None;
            }
            self.cursor = 0;
        }
        let path = self.files[self.cursor].clone();
        self.cursor += 1;
        let frame = self.decode(&path)?;
        self.index += 1;
        Some(frame)
    }

    fn name(&self) -> String {
        format!("image sequence {}", self.dir.display())
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
