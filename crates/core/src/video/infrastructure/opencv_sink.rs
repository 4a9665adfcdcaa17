use std::path::Path;

use opencv::core::{Mat, Size};
use opencv::prelude::*;
use opencv::videoio;

use crate::shared::frame::{ColorOrder, Frame};
use crate::video::domain::video_sink::{RecordingFormat, VideoSink};

/// Records DIVX AVI files through OpenCV's `VideoWriter`.
pub struct OpenCvSink {
    writer: Option<videoio::VideoWriter>,
    size: (u32, u32),
}

impl OpenCvSink {
    pub fn new() -> Self {
        Self {
            writer: None,
            size: (0, 0),
        }
    }
}

impl Default for OpenCvSink {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSink for OpenCvSink {
    fn open(&mut self, path: &Path, format: &RecordingFormat) -> Result<(), Box<dyn std::error::Error>> {
        let path_str = path.to_str().ok_or("recording path is not valid UTF-8")?;
        let fourcc = videoio::VideoWriter::fourcc('D', 'I', 'V', 'X')?;
        let writer = videoio::VideoWriter::new(
            path_str,
            fourcc,
            format.fps,
            Size::new(format.width as i32, format.height as i32),
            true,
        )?;
        if !writer.is_opened()? {
            return Err(format!("could not open {} for writing", path.display()).into());
        }
        self.writer = Some(writer);
        self.size = (format.width, format.height);
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let writer = self.writer.as_mut().ok_or("OpenCvSink: not opened")?;
        if frame.size() != self.size || frame.channels() != 3 {
            return Err("OpenCvSink: frame does not match recording size".into());
        }

        let bgr;
        let data = match frame.order() {
            ColorOrder::Bgr => frame.data(),
            ColorOrder::Rgb => {
                let mut copy = frame.clone();
                copy.swap_red_blue();
                bgr = copy;
                bgr.data()
            }
        };
        let rows = frame.height() as i32;
        let flat = Mat::new_rows_cols_with_data(rows, frame.width() as i32 * 3, data)?;
        let mat = flat.reshape(3, rows)?;
        writer.write(&*mat)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(mut writer) = self.writer.take() {
            writer.release()?;
        }
        Ok(())
    }
}
