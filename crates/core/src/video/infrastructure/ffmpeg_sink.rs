use std::path::Path;

use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling;

use crate::shared::frame::{ColorOrder, Frame};
use crate::video::domain::video_sink::{RecordingFormat, VideoSink};

/// Records frames to a video file via ffmpeg-next (MPEG-4 part 2, the codec
/// behind DIVX-style AVI files).
pub struct FfmpegSink {
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<(Pixel, scaling::Context)>,
    width: u32,
    height: u32,
    fps: i32,
    frame_count: i64,
}

// Safety: FfmpegSink is only used from the processing thread.
// The raw pointers inside ffmpeg types are never shared.
unsafe impl Send for FfmpegSink {}

impl FfmpegSink {
    pub fn new() -> Self {
        Self {
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            fps: 0,
            frame_count: 0,
        }
    }

    /// Scaler from the frame's packed layout to YUV420P, rebuilt if the
    /// channel order changes between frames.
    fn scaler_for(&mut self, pixel: Pixel) -> Result<&mut scaling::Context, ffmpeg_next::Error> {
        let stale = !matches!(&self.scaler, Some((p, _)) if *p == pixel);
        if stale {
            let ctx = scaling::Context::get(
                pixel,
                self.width,
                self.height,
                Pixel::YUV420P,
                self.width,
                self.height,
                scaling::Flags::BILINEAR,
            )?;
            self.scaler = Some((pixel, ctx));
        }
        match self.scaler.as_mut() {
            Some((_, ctx)) => Ok(ctx),
            None => Err(ffmpeg_next::Error::Bug),
        }
    }

    fn drain_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let encoder = self.encoder.as_mut().ok_or("FfmpegSink: not opened")?;
        let octx = self.octx.as_mut().ok_or("FfmpegSink: not opened")?;
        let ost_time_base = octx.stream(0).ok_or("FfmpegSink: missing video stream")?.time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, self.fps), ost_time_base);
            encoded.write_interleaved(octx)?;
        }
        Ok(())
    }
}

impl Default for FfmpegSink {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoSink for FfmpegSink {
    fn open(&mut self, path: &Path, format: &RecordingFormat) -> Result<(), Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        self.width = format.width;
        self.height = format.height;
        self.fps = match format.fps.round() as i32 {
            fps if fps > 0 => fps,
            _ => 5,
        };

        let mut octx = ffmpeg_next::format::output(path)?;
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;
        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;
        encoder_ctx.set_width(format.width);
        encoder_ctx.set_height(format.height);
        encoder_ctx.set_format(Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, self.fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(self.fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);
        octx.write_header()?;

        log::info!(
            "Recording to {} ({}x{} @ {} fps)",
            path.display(),
            format.width,
            format.height,
            self.fps
        );

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = None;
        self.frame_count = 0;
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if self.encoder.is_none() {
            return Err("FfmpegSink: not opened".into());
        }
        if frame.size() != (self.width, self.height) || frame.channels() != 3 {
            return Err(format!(
                "FfmpegSink: frame {:?}x{} does not match {}x{}",
                frame.size(),
                frame.channels(),
                self.width,
                self.height
            )
            .into());
        }

        let pixel = match frame.order() {
            ColorOrder::Bgr => Pixel::BGR24,
            ColorOrder::Rgb => Pixel::RGB24,
        };
        let mut packed = ffmpeg_next::util::frame::video::Video::new(pixel, self.width, self.height);
        let stride = packed.stride(0);
        let row_bytes = self.width as usize * 3;
        let dst = packed.data_mut(0);
        for (row, src) in frame.data().chunks_exact(row_bytes).enumerate() {
            dst[row * stride..row * stride + row_bytes].copy_from_slice(src);
        }

        let mut yuv = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler_for(pixel)?.run(&packed, &mut yuv)?;
        yuv.set_pts(Some(self.frame_count));

        self.encoder
            .as_mut()
            .ok_or("FfmpegSink: not opened")?
            .send_frame(&yuv)?;
        self.drain_packets()?;
        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(encoder) = self.encoder.as_mut() {
            encoder.send_eof()?;
            self.drain_packets()?;
            if let Some(octx) = self.octx.as_mut() {
                octx.write_trailer()?;
            }
            log::info!("Recording closed after {} frames", self.frame_count);
        }
        self.octx = None;
        self.encoder = None;
        self.scaler = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(w: u32, h: u32, fps: f64) -> RecordingFormat {
        RecordingFormat {
            width: w,
            height: h,
            fps,
        }
    }

    fn solid_frame(index: usize, w: u32, h: u32, value: u8) -> Frame {
        Frame::new(vec![value; (w * h * 3) as usize], w, h, 3, index)
    }

    #[test]
    fn test_write_creates_avi() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("webcamVid1.avi");

        let mut sink = FfmpegSink::new();
        sink.open(&path, &format(160, 120, 15.0)).unwrap();
        for i in 0..3 {
            sink.write(&solid_frame(i, 160, 120, 128)).unwrap();
        }
        sink.close().unwrap();

        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_written_video_has_correct_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.avi");

        let mut sink = FfmpegSink::new();
        sink.open(&path, &format(160, 120, 5.0)).unwrap();
        sink.write(&solid_frame(0, 160, 120, 128)).unwrap();
        sink.close().unwrap();

        let ictx = ffmpeg_next::format::input(&path).unwrap();
        let stream = ictx.streams().best(ffmpeg_next::media::Type::Video).unwrap();
        let codec_ctx =
            ffmpeg_next::codec::context::Context::from_parameters(stream.parameters()).unwrap();
        let decoder = codec_ctx.decoder().video().unwrap();
        assert_eq!((decoder.width(), decoder.height()), (160, 120));
    }

    #[test]
    fn test_write_without_open_returns_error() {
        let mut sink = FfmpegSink::new();
        assert!(sink.write(&solid_frame(0, 160, 120, 128)).is_err());
    }

    #[test]
    fn test_mismatched_frame_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FfmpegSink::new();
        sink.open(&dir.path().join("out.avi"), &format(160, 120, 15.0)).unwrap();
        assert!(sink.write(&solid_frame(0, 80, 60, 0)).is_err());
        sink.close().unwrap();
    }

    #[test]
    fn test_close_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = FfmpegSink::new();
        sink.open(&dir.path().join("out.avi"), &format(160, 120, 15.0)).unwrap();
        sink.write(&solid_frame(0, 160, 120, 10)).unwrap();
        sink.close().unwrap();
        sink.close().unwrap();
    }
}
