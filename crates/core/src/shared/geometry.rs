/// Rounds half to even, matching the rounding OpenCV uses for pixel
/// coordinates (`cvRound`).
pub fn cv_round(value: f64) -> i32 {
    value.round_ties_even() as i32
}

/// Axis-aligned rectangle in frame-pixel coordinates.
///
/// "No target" is represented by `Option<Rect>::None` at the call sites that
/// hold a target, never by a sentinel value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle usable as a tracking seed: strictly positive size and a
    /// non-negative origin.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.x >= 0 && self.y >= 0
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    /// Pulls a drifting rectangle back inside a `width` x `height` frame.
    ///
    /// The origin is clamped into `[0, dimension)` and the extent shrunk so
    /// the rectangle ends at the frame edge at the latest.
    pub fn clamp_to(&self, width: u32, height: u32) -> Rect {
        let (fw, fh) = (width as i32, height as i32);
        let x = self.x.clamp(0, (fw - 1).max(0));
        let y = self.y.clamp(0, (fh - 1).max(0));
        let w = if x + self.width > fw { fw - x } else { self.width };
        let h = if y + self.height > fh { fh - y } else { self.height };
        Rect::new(x, y, w, h)
    }

    /// Intersection with another rectangle; empty intersections collapse to
    /// a zero-sized rectangle.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            return Rect::default();
        }
        Rect::new(x1, y1, x2 - x1, y2 - y1)
    }

    /// Multiplies every component by `factor`, rounding to the nearest pixel.
    pub fn scaled(&self, factor: f64) -> Rect {
        Rect::new(
            cv_round(self.x as f64 * factor),
            cv_round(self.y as f64 * factor),
            cv_round(self.width as f64 * factor),
            cv_round(self.height as f64 * factor),
        )
    }
}

/// Rotated region produced by the tracker: centre, full size and rotation
/// angle in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OrientedRegion {
    pub center: (f32, f32),
    pub size: (f32, f32),
    pub angle: f32,
}

impl OrientedRegion {
    pub fn new(center: (f32, f32), size: (f32, f32), angle: f32) -> Self {
        Self {
            center,
            size,
            angle,
        }
    }

    /// Axis-aligned region inscribed in a rectangle.
    pub fn from_rect(rect: &Rect) -> Self {
        Self::new(
            rect.center(),
            (rect.width as f32, rect.height as f32),
            0.0,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.size.0 <= 0.0 || self.size.1 <= 0.0
    }

    /// Samples `segments` points along the boundary of the inscribed ellipse.
    pub fn ellipse_points(&self, segments: usize) -> Vec<(f32, f32)> {
        let (cx, cy) = self.center;
        let (a, b) = (self.size.0 / 2.0, self.size.1 / 2.0);
        let (sin, cos) = self.angle.to_radians().sin_cos();
        (0..segments)
            .map(|i| {
                let t = i as f32 / segments as f32 * std::f32::consts::TAU;
                let (ex, ey) = (a * t.cos(), b * t.sin());
                (cx + ex * cos - ey * sin, cy + ex * sin + ey * cos)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rstest::rstest;

    #[rstest]
    #[case::positive(Rect::new(0, 0, 10, 10), true)]
    #[case::zero_width(Rect::new(5, 5, 0, 10), false)]
    #[case::zero_height(Rect::new(5, 5, 10, 0), false)]
    #[case::sentinel(Rect::new(-1, -1, 0, 0), false)]
    #[case::negative_origin(Rect::new(-1, 4, 10, 10), false)]
    fn test_is_valid(#[case] rect: Rect, #[case] expected: bool) {
        assert_eq!(rect.is_valid(), expected);
    }

    #[rstest]
    #[case::inside(Rect::new(10, 10, 20, 20), Rect::new(10, 10, 20, 20))]
    #[case::negative_origin(Rect::new(-5, -8, 20, 20), Rect::new(0, 0, 20, 20))]
    #[case::overflows_right(Rect::new(90, 10, 30, 20), Rect::new(90, 10, 10, 20))]
    #[case::overflows_bottom(Rect::new(10, 70, 20, 40), Rect::new(10, 70, 20, 10))]
    #[case::origin_past_edge(Rect::new(150, 120, 10, 10), Rect::new(99, 79, 1, 1))]
    fn test_clamp_to(#[case] rect: Rect, #[case] expected: Rect) {
        assert_eq!(rect.clamp_to(100, 80), expected);
    }

    #[test]
    fn test_clamp_result_stays_inside_frame() {
        let r = Rect::new(-40, 200, 500, 500).clamp_to(320, 240);
        assert!(r.x >= 0 && r.y >= 0);
        assert!(r.right() <= 320);
        assert!(r.bottom() <= 240);
    }

    #[test]
    fn test_intersect_disjoint_is_empty() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 20, 5, 5);
        assert_eq!(a.intersect(&b), Rect::default());
    }

    #[test]
    fn test_intersect_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersect(&b), Rect::new(5, 5, 5, 5));
    }

    #[test]
    fn test_scaled_round_trip_is_exact_for_multiples() {
        let small = Rect::new(10, 20, 30, 40);
        let big = small.scaled(1.3);
        assert_eq!(big, Rect::new(13, 26, 39, 52));
        assert_eq!(big.scaled(1.0 / 1.3), small);
    }

    #[rstest]
    #[case(0.5, 0)]
    #[case(1.5, 2)]
    #[case(2.5, 2)]
    #[case(-0.5, 0)]
    #[case(69.5, 70)]
    #[case(2.4, 2)]
    fn test_cv_round_ties_to_even(#[case] value: f64, #[case] expected: i32) {
        assert_eq!(cv_round(value), expected);
    }

    #[test]
    fn test_from_rect_centers_region() {
        let region = OrientedRegion::from_rect(&Rect::new(50, 50, 40, 20));
        assert_abs_diff_eq!(region.center.0, 70.0);
        assert_abs_diff_eq!(region.center.1, 60.0);
        assert_abs_diff_eq!(region.angle, 0.0);
    }

    #[test]
    fn test_ellipse_points_lie_on_axes() {
        let region = OrientedRegion::new((10.0, 10.0), (8.0, 4.0), 0.0);
        let pts = region.ellipse_points(4);
        assert_eq!(pts.len(), 4);
        assert_abs_diff_eq!(pts[0].0, 14.0, epsilon = 1e-4);
        assert_abs_diff_eq!(pts[0].1, 10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(pts[1].0, 10.0, epsilon = 1e-4);
        assert_abs_diff_eq!(pts[1].1, 12.0, epsilon = 1e-4);
    }

    #[test]
    fn test_ellipse_points_respect_rotation() {
        let region = OrientedRegion::new((0.0, 0.0), (8.0, 4.0), 90.0);
        let pts = region.ellipse_points(4);
        // The long axis now points down the y axis.
        assert_abs_diff_eq!(pts[0].0, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(pts[0].1, 4.0, epsilon = 1e-4);
    }

    #[test]
    fn test_empty_region() {
        assert!(OrientedRegion::default().is_empty());
        assert!(!OrientedRegion::new((1.0, 1.0), (2.0, 2.0), 0.0).is_empty());
    }
}
