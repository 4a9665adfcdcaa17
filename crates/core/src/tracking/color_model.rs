use ndarray::{s, Array2, Zip};

use crate::shared::constants::{HUE_BINS, HUE_RANGE};
use crate::shared::geometry::Rect;

/// Hue histogram of a tracked region, scaled so its peak bin reads 255.
///
/// Built once per tracking session and only read afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorModel {
    bins: [f32; HUE_BINS],
}

/// Histogram bin of an 8-bit hue value.
pub fn hue_bin(hue: u8) -> usize {
    (hue as usize * HUE_BINS / HUE_RANGE as usize).min(HUE_BINS - 1)
}

impl ColorModel {
    /// Accumulates the hue of every gated pixel inside `roi`, then normalises.
    ///
    /// `roi` must already lie inside the planes.
    pub fn build(hue: &Array2<u8>, mask: &Array2<u8>, roi: Rect) -> Self {
        let mut bins = [0.0f32; HUE_BINS];
        let (y0, x0) = (roi.y.max(0) as usize, roi.x.max(0) as usize);
        let (rows, cols) = hue.dim();
        let y1 = (roi.bottom().max(0) as usize).min(rows);
        let x1 = (roi.right().max(0) as usize).min(cols);
        if y0 < y1 && x0 < x1 {
            let hue_roi = hue.slice(s![y0..y1, x0..x1]);
            let mask_roi = mask.slice(s![y0..y1, x0..x1]);
            Zip::from(&hue_roi).and(&mask_roi).for_each(|&h, &m| {
                if m != 0 {
                    bins[hue_bin(h)] += 1.0;
                }
            });
        }
        let mut model = Self { bins };
        model.normalize();
        model
    }

    /// Scales bins so the peak maps to 255. A zero peak leaves bins untouched.
    fn normalize(&mut self) {
        let peak = self.peak();
        if peak <= 0.0 {
            return;
        }
        let scale = 255.0 / peak;
        for bin in &mut self.bins {
            *bin *= scale;
        }
    }

    pub fn bins(&self) -> &[f32; HUE_BINS] {
        &self.bins
    }

    pub fn peak(&self) -> f32 {
        self.bins.iter().copied().fold(0.0, f32::max)
    }

    pub fn is_empty(&self) -> bool {
        self.peak() <= 0.0
    }

    /// Writes each pixel's bin value into `probability`, zeroing pixels
    /// outside the gating mask.
    pub fn back_project(&self, hue: &Array2<u8>, mask: &Array2<u8>, probability: &mut Array2<u8>) {
        Zip::from(probability)
            .and(hue)
            .and(mask)
            .for_each(|p, &h, &m| {
                *p = if m == 0 {
                    0
                } else {
                    self.bins[hue_bin(h)].round().clamp(0.0, 255.0) as u8
                };
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0)]
    #[case(5, 0)]
    #[case(6, 1)]
    #[case(120, 20)]
    #[case(179, 29)]
    fn test_hue_bin(#[case] hue: u8, #[case] expected: usize) {
        assert_eq!(hue_bin(hue), expected);
    }

    #[test]
    fn test_peak_normalised_to_255() {
        let hue = Array2::from_shape_fn((4, 4), |(y, _)| if y < 3 { 120 } else { 60 });
        let mask = Array2::from_elem((4, 4), 255u8);
        let model = ColorModel::build(&hue, &mask, Rect::new(0, 0, 4, 4));

        assert_relative_eq!(model.peak(), 255.0);
        assert_relative_eq!(model.bins()[20], 255.0);
        assert_relative_eq!(model.bins()[10], 85.0, epsilon = 1e-3);
    }

    #[test]
    fn test_zero_peak_is_left_unscaled() {
        let hue = Array2::from_elem((4, 4), 120u8);
        let mask = Array2::zeros((4, 4));
        let model = ColorModel::build(&hue, &mask, Rect::new(0, 0, 4, 4));

        assert!(model.is_empty());
        assert!(model.bins().iter().all(|b| *b == 0.0));
    }

    #[test]
    fn test_build_only_counts_roi() {
        let hue = Array2::from_shape_fn((4, 4), |(_, x)| if x < 2 { 0 } else { 120 });
        let mask = Array2::from_elem((4, 4), 255u8);
        let model = ColorModel::build(&hue, &mask, Rect::new(2, 0, 2, 4));
        assert_relative_eq!(model.bins()[20], 255.0);
        assert_relative_eq!(model.bins()[0], 0.0);
    }

    #[test]
    fn test_back_projection_respects_mask() {
        let hue = Array2::from_elem((2, 2), 120u8);
        let roi_mask = Array2::from_elem((2, 2), 255u8);
        let model = ColorModel::build(&hue, &roi_mask, Rect::new(0, 0, 2, 2));

        let mut mask = Array2::from_elem((2, 2), 255u8);
        mask[[1, 1]] = 0;
        let mut prob = Array2::zeros((2, 2));
        model.back_project(&hue, &mask, &mut prob);
        assert_eq!(prob[[0, 0]], 255);
        assert_eq!(prob[[1, 1]], 0);
    }
}
