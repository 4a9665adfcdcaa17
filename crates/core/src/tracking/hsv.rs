//! 8-bit HSV conversion and saturation/value gating.
//!
//! Hue is stored as degrees halved (0..180) so it fits a byte; saturation and
//! value span 0..=255.

use ndarray::{Array2, Array3, Zip};

use crate::shared::frame::{ColorOrder, Frame};

/// Saturation/value window a pixel must fall in for its hue to be trusted.
///
/// Bounds are `[low, high)`; `v_min` and `v_max` may be given in either order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gating {
    pub v_min: u16,
    pub v_max: u16,
    pub s_min: u16,
}

impl Gating {
    pub fn contains(&self, s: u8, v: u8) -> bool {
        let (lo, hi) = (self.v_min.min(self.v_max), self.v_min.max(self.v_max));
        s as u16 >= self.s_min && (lo..hi).contains(&(v as u16))
    }
}

/// Converts one pixel to 8-bit HSV.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> [u8; 3] {
    let (ri, gi, bi) = (r as i32, g as i32, b as i32);
    let v = ri.max(gi).max(bi);
    let min = ri.min(gi).min(bi);
    let diff = v - min;

    let s = if v == 0 {
        0
    } else {
        ((255 * diff) as f64 / v as f64).round() as i32
    };

    // Sector offsets in units of `diff`; each 60 degree sector spans 30 hue steps.
    let h = if diff == 0 {
        0
    } else {
        let raw = if v == ri {
            gi - bi
        } else if v == gi {
            bi - ri + 2 * diff
        } else {
            ri - gi + 4 * diff
        };
        let h = (raw as f64 * 30.0 / diff as f64).round() as i32;
        if h < 0 {
            h + 180
        } else {
            h
        }
    };

    [h.clamp(0, 179) as u8, s.clamp(0, 255) as u8, v as u8]
}

/// Fills `hsv` (rows x cols x 3) from `frame`, honouring its channel order.
/// Single-channel frames convert to zero hue and saturation.
pub fn convert_frame(frame: &Frame, hsv: &mut Array3<u8>) {
    let channels = frame.channels() as usize;
    let (ri, bi) = match frame.order() {
        ColorOrder::Bgr => (2, 0),
        ColorOrder::Rgb => (0, 2),
    };
    let src = frame.data();
    let (rows, cols, _) = hsv.dim();

    for y in 0..rows {
        for x in 0..cols {
            let offset = (y * cols + x) * channels;
            let Some(px) = src.get(offset..offset + channels) else {
                continue;
            };
            let converted = if channels >= 3 {
                rgb_to_hsv(px[ri], px[1], px[bi])
            } else {
                [0, 0, px[0]]
            };
            for (c, value) in converted.into_iter().enumerate() {
                hsv[[y, x, c]] = value;
            }
        }
    }
}

/// Extracts the hue plane and the gating mask (255 where trusted, 0 elsewhere).
pub fn split_hue_and_mask(
    hsv: &Array3<u8>,
    gating: Gating,
    hue: &mut Array2<u8>,
    mask: &mut Array2<u8>,
) {
    Zip::from(hue)
        .and(mask)
        .and(hsv.lanes(ndarray::Axis(2)))
        .for_each(|h, m, px| {
            *h = px[0];
            *m = if gating.contains(px[1], px[2]) { 255 } else { 0 };
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::red(255, 0, 0, [0, 255, 255])]
    #[case::green(0, 255, 0, [60, 255, 255])]
    #[case::blue(0, 0, 255, [120, 255, 255])]
    #[case::yellow(255, 255, 0, [30, 255, 255])]
    #[case::magenta(255, 0, 255, [150, 255, 255])]
    #[case::white(255, 255, 255, [0, 0, 255])]
    #[case::black(0, 0, 0, [0, 0, 0])]
    #[case::dark_red(128, 0, 0, [0, 255, 128])]
    fn test_rgb_to_hsv(#[case] r: u8, #[case] g: u8, #[case] b: u8, #[case] expected: [u8; 3]) {
        assert_eq!(rgb_to_hsv(r, g, b), expected);
    }

    #[test]
    fn test_hue_wraps_below_zero() {
        // Red with a touch of blue sits just under 180.
        let [h, _, _] = rgb_to_hsv(255, 0, 20);
        assert!(h > 170, "hue {h}");
    }

    #[rstest]
    #[case::default_bright(65, 256, 55, 200, 200, true)]
    #[case::too_dark(65, 256, 55, 200, 64, false)]
    #[case::at_v_min(65, 256, 55, 200, 65, true)]
    #[case::grey(65, 256, 55, 54, 200, false)]
    #[case::swapped_bounds(200, 65, 55, 100, 100, true)]
    #[case::upper_bound_exclusive(65, 200, 55, 100, 200, false)]
    fn test_gating(
        #[case] v_min: u16,
        #[case] v_max: u16,
        #[case] s_min: u16,
        #[case] s: u8,
        #[case] v: u8,
        #[case] expected: bool,
    ) {
        let gating = Gating { v_min, v_max, s_min };
        assert_eq!(gating.contains(s, v), expected);
    }

    #[test]
    fn test_convert_frame_honours_channel_order() {
        // One blue pixel stored BGR, then the same pixel stored RGB.
        let bgr = Frame::new(vec![255, 0, 0], 1, 1, 3, 0);
        let mut rgb = bgr.clone();
        rgb.swap_red_blue();

        let mut a = Array3::zeros((1, 1, 3));
        let mut b = Array3::zeros((1, 1, 3));
        convert_frame(&bgr, &mut a);
        convert_frame(&rgb, &mut b);
        assert_eq!(a, b);
        assert_eq!(a[[0, 0, 0]], 120);
    }

    #[test]
    fn test_split_masks_dark_pixels() {
        let frame = Frame::new(vec![255, 0, 0, 0, 0, 0], 2, 1, 3, 0);
        let mut hsv = Array3::zeros((1, 2, 3));
        convert_frame(&frame, &mut hsv);

        let mut hue = Array2::zeros((1, 2));
        let mut mask = Array2::zeros((1, 2));
        let gating = Gating {
            v_min: 65,
            v_max: 256,
            s_min: 55,
        };
        split_hue_and_mask(&hsv, gating, &mut hue, &mut mask);
        assert_eq!(hue[[0, 0]], 120);
        assert_eq!(mask[[0, 0]], 255);
        assert_eq!(mask[[0, 1]], 0);
    }
}
