use image::{ImageBuffer, Rgb};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};

use crate::shared::frame::{ColorOrder, Frame};
use crate::shared::geometry::{OrientedRegion, Rect};

const LINE_THICKNESS: i32 = 3;
const ELLIPSE_SEGMENTS: usize = 72;
const TRACK_COLOR: [u8; 3] = [255, 0, 0];
const DETECT_COLOR: [u8; 3] = [0, 200, 0];

/// Geometry handed to the presentation layer for one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OverlayShape {
    /// A detected face.
    Rectangle(Rect),
    /// The tracked face.
    Region(OrientedRegion),
}

/// Draws `shapes` into `frame`. Colours are given in RGB and written in the
/// frame's own channel order.
pub fn draw(frame: &mut Frame, shapes: &[OverlayShape]) {
    if shapes.is_empty() || frame.channels() != 3 {
        return;
    }
    let order = frame.order();
    let (width, height) = frame.size();
    let Some(mut canvas) = ImageBuffer::<Rgb<u8>, &mut [u8]>::from_raw(width, height, frame.data_mut())
    else {
        return;
    };

    for shape in shapes {
        match shape {
            OverlayShape::Rectangle(rect) => {
                draw_rect(&mut canvas, rect, in_order(DETECT_COLOR, order));
            }
            OverlayShape::Region(region) => {
                draw_region(&mut canvas, region, in_order(TRACK_COLOR, order));
            }
        }
    }
}

fn in_order(rgb: [u8; 3], order: ColorOrder) -> Rgb<u8> {
    match order {
        ColorOrder::Rgb => Rgb(rgb),
        ColorOrder::Bgr => Rgb([rgb[2], rgb[1], rgb[0]]),
    }
}

fn draw_rect(canvas: &mut ImageBuffer<Rgb<u8>, &mut [u8]>, rect: &Rect, color: Rgb<u8>) {
    for inset in 0..LINE_THICKNESS {
        let (w, h) = (rect.width - 2 * inset, rect.height - 2 * inset);
        if w <= 0 || h <= 0 {
            break;
        }
        let r = imageproc::rect::Rect::at(rect.x + inset, rect.y + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(canvas, r, color);
    }
}

fn draw_region(canvas: &mut ImageBuffer<Rgb<u8>, &mut [u8]>, region: &OrientedRegion, color: Rgb<u8>) {
    if region.is_empty() {
        return;
    }
    let half = LINE_THICKNESS / 2;
    for grow in -half..=half {
        let grown = OrientedRegion::new(
            region.center,
            (region.size.0 + 2.0 * grow as f32, region.size.1 + 2.0 * grow as f32),
            region.angle,
        );
        if grown.is_empty() {
            continue;
        }
        let points = grown.ellipse_points(ELLIPSE_SEGMENTS);
        for (i, &start) in points.iter().enumerate() {
            let end = points[(i + 1) % points.len()];
            draw_line_segment_mut(canvas, start, end, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let o = ((y * frame.width() + x) * 3) as usize;
        [frame.data()[o], frame.data()[o + 1], frame.data()[o + 2]]
    }

    #[test]
    fn test_region_drawn_red_in_bgr_frame() {
        let mut frame = Frame::black(100, 100, 0);
        let region = OrientedRegion::new((50.0, 50.0), (40.0, 20.0), 0.0);
        draw(&mut frame, &[OverlayShape::Region(region)]);

        // Right-most point of the ellipse.
        assert_eq!(pixel(&frame, 70, 50), [0, 0, 255]);
        // Centre untouched.
        assert_eq!(pixel(&frame, 50, 50), [0, 0, 0]);
    }

    #[test]
    fn test_region_drawn_red_in_rgb_frame() {
        let mut frame = Frame::black(100, 100, 0).with_order(ColorOrder::Rgb);
        let region = OrientedRegion::new((50.0, 50.0), (40.0, 20.0), 0.0);
        draw(&mut frame, &[OverlayShape::Region(region)]);
        assert_eq!(pixel(&frame, 70, 50), [255, 0, 0]);
    }

    #[test]
    fn test_rectangle_outline_is_thick() {
        let mut frame = Frame::black(50, 50, 0);
        draw(&mut frame, &[OverlayShape::Rectangle(Rect::new(10, 10, 20, 20))]);
        for inset in 0..3 {
            assert_ne!(pixel(&frame, 10 + inset, 20), [0, 0, 0]);
        }
        assert_eq!(pixel(&frame, 14, 20), [0, 0, 0]);
    }

    #[test]
    fn test_shapes_outside_frame_are_clipped() {
        let mut frame = Frame::black(20, 20, 0);
        draw(
            &mut frame,
            &[
                OverlayShape::Rectangle(Rect::new(-10, -10, 100, 100)),
                OverlayShape::Region(OrientedRegion::new((0.0, 0.0), (80.0, 80.0), 30.0)),
            ],
        );
        assert_eq!(frame.size(), (20, 20));
    }

    #[test]
    fn test_no_shapes_leaves_frame_untouched() {
        let mut frame = Frame::black(10, 10, 0);
        draw(&mut frame, &[]);
        assert!(frame.data().iter().all(|&v| v == 0));
    }
}
