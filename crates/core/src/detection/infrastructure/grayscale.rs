//! Detector input preparation: grayscale conversion, working-scale resize and
//! contrast normalisation, plus the inverse mapping for results.

use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::shared::frame::{ColorOrder, Frame};
use crate::shared::geometry::{cv_round, Rect};

// ITU-R BT.601 luma weights in 14-bit fixed point.
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const FIXED_SHIFT: u32 = 14;

/// Single-channel luma image of a frame, honouring its channel order.
pub fn to_gray(frame: &Frame) -> GrayImage {
    let channels = frame.channels() as usize;
    let pixels: Vec<u8> = if channels < 3 {
        frame.data().iter().step_by(channels.max(1)).copied().collect()
    } else {
        let (ri, bi) = match frame.order() {
            ColorOrder::Bgr => (2, 0),
            ColorOrder::Rgb => (0, 2),
        };
        frame
            .data()
            .chunks_exact(channels)
            .map(|px| {
                let y = px[ri] as u32 * R_WEIGHT
                    + px[1] as u32 * G_WEIGHT
                    + px[bi] as u32 * B_WEIGHT;
                ((y + (1 << (FIXED_SHIFT - 1))) >> FIXED_SHIFT) as u8
            })
            .collect()
    };
    GrayImage::from_raw(frame.width(), frame.height(), pixels)
        .unwrap_or_else(|| GrayImage::new(frame.width(), frame.height()))
}

/// Size of the downscaled search image for a frame of `width` x `height`.
pub fn working_size(width: u32, height: u32, scale: f64) -> (u32, u32) {
    (
        cv_round(width as f64 / scale).max(1) as u32,
        cv_round(height as f64 / scale).max(1) as u32,
    )
}

/// Grayscale, shrink by `scale`, then equalise the intensity histogram.
pub fn prepare(frame: &Frame, scale: f64) -> GrayImage {
    let gray = to_gray(frame);
    let (w, h) = working_size(frame.width(), frame.height(), scale);
    let small = if (w, h) == gray.dimensions() {
        gray
    } else {
        imageops::resize(&gray, w, h, FilterType::Triangle)
    };
    imageproc::contrast::equalize_histogram(&small)
}

/// Maps a rectangle found in the working image back to frame coordinates.
pub fn to_frame_coords(rect: &Rect, scale: f64) -> Rect {
    rect.scaled(scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn solid(b: u8, g: u8, r: u8, w: u32, h: u32) -> Frame {
        let data = [b, g, r].repeat((w * h) as usize);
        Frame::new(data, w, h, 3, 0)
    }

    #[rstest]
    #[case::white(255, 255, 255, 255)]
    #[case::black(0, 0, 0, 0)]
    #[case::pure_blue(255, 0, 0, 29)]
    #[case::pure_green(0, 255, 0, 150)]
    #[case::pure_red(0, 0, 255, 76)]
    fn test_to_gray_bgr_weights(#[case] b: u8, #[case] g: u8, #[case] r: u8, #[case] expected: u8) {
        let gray = to_gray(&solid(b, g, r, 2, 2));
        assert_eq!(gray.get_pixel(0, 0).0[0], expected);
    }

    #[test]
    fn test_to_gray_respects_rgb_order() {
        let mut frame = solid(255, 0, 0, 2, 2); // blue in BGR
        frame.swap_red_blue(); // same colour, now stored as RGB
        assert_eq!(to_gray(&frame).get_pixel(1, 1).0[0], 29);
    }

    #[rstest]
    #[case(640, 480, (492, 369))]
    #[case(130, 65, (100, 50))]
    #[case(1, 1, (1, 1))]
    fn test_working_size(#[case] w: u32, #[case] h: u32, #[case] expected: (u32, u32)) {
        assert_eq!(working_size(w, h, 1.3), expected);
    }

    #[test]
    fn test_prepare_output_has_working_size() {
        let prepared = prepare(&solid(10, 20, 30, 260, 130), 1.3);
        assert_eq!(prepared.dimensions(), (200, 100));
    }

    #[test]
    fn test_prepare_equalises_contrast() {
        // Left half dark grey, right half slightly lighter grey.
        let (w, h) = (40u32, 20u32);
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for _y in 0..h {
            for x in 0..w {
                let v = if x < w / 2 { 60 } else { 70 };
                data.extend_from_slice(&[v, v, v]);
            }
        }
        let prepared = prepare(&Frame::new(data, w, h, 3, 0), 1.0);
        let dark = prepared.get_pixel(2, 10).0[0];
        let light = prepared.get_pixel(w - 3, 10).0[0];
        assert!(light - dark > 100, "equalised spread {dark}..{light}");
    }

    #[test]
    fn test_to_frame_coords_inverts_working_scale() {
        let small = Rect::new(100, 50, 200, 100);
        assert_eq!(to_frame_coords(&small, 1.3), Rect::new(130, 65, 260, 130));
    }
}
