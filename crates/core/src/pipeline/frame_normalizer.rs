use crate::shared::frame::{ColorOrder, Frame, FrameOrigin};

/// Puts captured frames into a fixed orientation before any vision work,
/// and into presentation channel order after it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameNormalizer {
    pub mirror_horizontal: bool,
    pub mirror_vertical: bool,
    pub presentation_order: ColorOrder,
}

impl Default for FrameNormalizer {
    fn default() -> Self {
        Self {
            mirror_horizontal: false,
            mirror_vertical: false,
            presentation_order: ColorOrder::Rgb,
        }
    }
}

impl FrameNormalizer {
    /// Bottom-left captures are flipped upright first, then the user mirror
    /// is applied (horizontal, then vertical).
    pub fn orient(&self, frame: &mut Frame) {
        if frame.origin() == FrameOrigin::BottomLeft {
            frame.flip_vertical();
        }
        if self.mirror_horizontal {
            frame.flip_horizontal();
        }
        if self.mirror_vertical {
            frame.flip_vertical();
        }
    }

    /// Converts to presentation channel order. Idempotent.
    pub fn present(&self, frame: &mut Frame) {
        if frame.channels() >= 3 && frame.order() != self.presentation_order {
            frame.swap_red_blue();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x2 BGR frame whose pixels are numbered 1..=4 in the blue channel.
    fn numbered() -> Frame {
        let mut data = Vec::new();
        for n in 1..=4u8 {
            data.extend_from_slice(&[n, 0, 100]);
        }
        Frame::new(data, 2, 2, 3, 0)
    }

    fn blues(frame: &Frame) -> Vec<u8> {
        let b = match frame.order() {
            ColorOrder::Bgr => 0,
            ColorOrder::Rgb => 2,
        };
        frame.data().chunks_exact(3).map(|px| px[b]).collect()
    }

    #[test]
    fn test_top_left_without_mirror_is_untouched() {
        let mut frame = numbered();
        FrameNormalizer::default().orient(&mut frame);
        assert_eq!(blues(&frame), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_bottom_left_is_flipped_upright() {
        let mut frame = numbered().with_origin(FrameOrigin::BottomLeft);
        FrameNormalizer::default().orient(&mut frame);
        assert_eq!(blues(&frame), vec![3, 4, 1, 2]);
        assert_eq!(frame.origin(), FrameOrigin::TopLeft);
    }

    #[test]
    fn test_origin_correction_precedes_user_mirror() {
        let mut frame = numbered().with_origin(FrameOrigin::BottomLeft);
        let normalizer = FrameNormalizer {
            mirror_horizontal: true,
            ..Default::default()
        };
        normalizer.orient(&mut frame);
        assert_eq!(blues(&frame), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_both_mirrors() {
        let mut frame = numbered();
        let normalizer = FrameNormalizer {
            mirror_horizontal: true,
            mirror_vertical: true,
            ..Default::default()
        };
        normalizer.orient(&mut frame);
        assert_eq!(blues(&frame), vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_present_converts_exactly_once() {
        let mut frame = numbered();
        let normalizer = FrameNormalizer::default();
        normalizer.present(&mut frame);
        assert_eq!(frame.order(), ColorOrder::Rgb);
        assert_eq!(&frame.data()[..3], &[100, 0, 1]);
        normalizer.present(&mut frame);
        assert_eq!(&frame.data()[..3], &[100, 0, 1]);
    }
}
