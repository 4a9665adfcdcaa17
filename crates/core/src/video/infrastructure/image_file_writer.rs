use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use crate::shared::constants::SCREENSHOT_JPEG_QUALITY;
use crate::shared::frame::{ColorOrder, Frame};
use crate::video::domain::image_writer::ImageWriter;

/// Writes a frame to an image file using the `image` crate.
///
/// JPEG output uses a fixed quality; other formats follow the extension.
pub struct ImageFileWriter {
    jpeg_quality: u8,
}

impl ImageFileWriter {
    pub fn new() -> Self {
        Self::with_quality(SCREENSHOT_JPEG_QUALITY)
    }

    pub fn with_quality(jpeg_quality: u8) -> Self {
        Self {
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Packs a frame into an RGB image regardless of its channel order.
pub fn to_rgb_image(frame: &Frame) -> Option<RgbImage> {
    let channels = frame.channels() as usize;
    let data: Vec<u8> = match (channels, frame.order()) {
        (3, ColorOrder::Rgb) => frame.data().to_vec(),
        (3, ColorOrder::Bgr) => frame
            .data()
            .chunks_exact(3)
            .flat_map(|px| [px[2], px[1], px[0]])
            .collect(),
        (1, _) => frame.data().iter().flat_map(|&v| [v, v, v]).collect(),
        _ => return None,
    };
    RgbImage::from_raw(frame.width(), frame.height(), data)
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let img = to_rgb_image(frame).ok_or("Failed to create image from frame data")?;

        let is_jpeg = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));
        if is_jpeg {
            let out = BufWriter::new(File::create(path)?);
            let mut encoder = JpegEncoder::new_with_quality(out, self.jpeg_quality);
            encoder.encode_image(&img)?;
        } else {
            img.save(path)?;
        }
        Ok(())
    }
}
