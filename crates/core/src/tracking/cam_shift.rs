//! Mean-shift and CamShift search over an 8-bit probability map.

use ndarray::{s, ArrayView2};

use crate::shared::constants::{CAMSHIFT_EPSILON, CAMSHIFT_MAX_ITER};
use crate::shared::geometry::{cv_round, OrientedRegion, Rect};

/// Margin added around the mean-shift result before measuring orientation.
const TOLERANCE: i32 = 10;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TermCriteria {
    pub max_iter: usize,
    /// Minimum window displacement (pixels) that keeps the search going.
    pub epsilon: f64,
}

impl Default for TermCriteria {
    fn default() -> Self {
        Self {
            max_iter: CAMSHIFT_MAX_ITER,
            epsilon: CAMSHIFT_EPSILON,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CamShiftResult {
    pub region: OrientedRegion,
    /// Axis-aligned window to seed the next search with.
    pub window: Rect,
}

#[derive(Clone, Copy, Debug, Default)]
struct Moments {
    m00: f64,
    m10: f64,
    m01: f64,
    mu20: f64,
    mu11: f64,
    mu02: f64,
}

/// Raw and central moments of `prob` inside `roi`, in ROI-local coordinates.
fn moments(prob: &ArrayView2<u8>, roi: Rect) -> Moments {
    let view = prob.slice(s![
        roi.y as usize..roi.bottom() as usize,
        roi.x as usize..roi.right() as usize
    ]);
    let (mut m00, mut m10, mut m01) = (0.0, 0.0, 0.0);
    let (mut m20, mut m11, mut m02) = (0.0, 0.0, 0.0);
    for ((y, x), &p) in view.indexed_iter() {
        if p == 0 {
            continue;
        }
        let (p, x, y) = (p as f64, x as f64, y as f64);
        m00 += p;
        m10 += x * p;
        m01 += y * p;
        m20 += x * x * p;
        m11 += x * y * p;
        m02 += y * y * p;
    }
    if m00 == 0.0 {
        return Moments::default();
    }
    let (cx, cy) = (m10 / m00, m01 / m00);
    Moments {
        m00,
        m10,
        m01,
        mu20: m20 - cx * m10,
        mu11: m11 - cx * m01,
        mu02: m02 - cy * m01,
    }
}

/// Clips `rect` to the image, falling back to a unit window at the centre
/// when nothing overlaps.
fn fit_window(rect: Rect, cols: i32, rows: i32) -> Rect {
    let mut cur = rect.intersect(&Rect::new(0, 0, cols, rows));
    if cur == Rect::default() {
        cur.x = cols / 2;
        cur.y = rows / 2;
    }
    cur.width = cur.width.max(1);
    cur.height = cur.height.max(1);
    cur
}

/// Moves `window` towards the centroid of `prob` until it settles.
///
/// Returns the number of iterations run and the final window. The window
/// keeps its size; only its origin moves.
pub fn mean_shift(prob: &ArrayView2<u8>, window: Rect, criteria: TermCriteria) -> (usize, Rect) {
    let (rows, cols) = (prob.nrows() as i32, prob.ncols() as i32);
    let eps = cv_round(criteria.epsilon * criteria.epsilon);
    let mut cur = fit_window(window, cols, rows);

    let mut i = 0;
    while i < criteria.max_iter {
        cur = fit_window(cur, cols, rows);
        let m = moments(prob, cur);
        if m.m00.abs() < f64::EPSILON {
            break;
        }

        let dx = cv_round(m.m10 / m.m00 - window.width as f64 * 0.5);
        let dy = cv_round(m.m01 / m.m00 - window.height as f64 * 0.5);
        let nx = (cur.x + dx).max(0).min(cols - cur.width);
        let ny = (cur.y + dy).max(0).min(rows - cur.height);
        let (dx, dy) = (nx - cur.x, ny - cur.y);
        cur.x = nx;
        cur.y = ny;

        if dx * dx + dy * dy < eps {
            break;
        }
        i += 1;
    }
    (i, cur)
}

/// Continuously adaptive mean shift: locates the mass near `window`, then
/// fits an oriented ellipse to it and resizes the window accordingly.
///
/// Returns `None` when the search area holds no probability mass.
pub fn cam_shift(prob: &ArrayView2<u8>, window: Rect, criteria: TermCriteria) -> Option<CamShiftResult> {
    let (rows, cols) = (prob.nrows() as i32, prob.ncols() as i32);
    if rows == 0 || cols == 0 || window.width <= 0 || window.height <= 0 {
        return None;
    }

    let (_, shifted) = mean_shift(prob, window, criteria);

    let mut search = shifted;
    search.x -= TOLERANCE;
    search.y -= TOLERANCE;
    search.width += 2 * TOLERANCE;
    search.height += 2 * TOLERANCE;
    search.x = search.x.max(0);
    search.y = search.y.max(0);
    if search.x + search.width > cols {
        search.width = cols - search.x;
    }
    if search.y + search.height > rows {
        search.height = rows - search.y;
    }
    if search.width <= 0 || search.height <= 0 {
        return None;
    }

    let m = moments(prob, search);
    if m.m00.abs() < f64::EPSILON {
        return None;
    }

    let inv_m00 = 1.0 / m.m00;
    let xc = cv_round(m.m10 * inv_m00 + search.x as f64);
    let yc = cv_round(m.m01 * inv_m00 + search.y as f64);

    let a = m.mu20 * inv_m00;
    let b = m.mu11 * inv_m00;
    let c = m.mu02 * inv_m00;
    let square = (4.0 * b * b + (a - c) * (a - c)).sqrt();
    let mut theta = (2.0 * b).atan2(a - c + square);

    let (mut sn, mut cs) = theta.sin_cos();
    let rotate_a = (cs * cs * m.mu20 + 2.0 * cs * sn * m.mu11 + sn * sn * m.mu02).max(0.0);
    let rotate_c = (sn * sn * m.mu20 - 2.0 * cs * sn * m.mu11 + cs * cs * m.mu02).max(0.0);
    let mut length = (rotate_a * inv_m00).sqrt() * 4.0;
    let mut width = (rotate_c * inv_m00).sqrt() * 4.0;

    if length < width {
        std::mem::swap(&mut length, &mut width);
        std::mem::swap(&mut cs, &mut sn);
        theta = std::f64::consts::FRAC_PI_2 - theta;
    }

    let t0 = cv_round((length * cs).abs());
    let t1 = cv_round((width * sn).abs());
    let mut next = Rect::default();
    next.width = (t0.max(t1) + 2).min((cols - xc) * 2);
    let t0 = cv_round((length * sn).abs());
    let t1 = cv_round((width * cs).abs());
    next.height = (t0.max(t1) + 2).min((rows - yc) * 2);
    next.x = (xc - next.width / 2).max(0);
    next.y = (yc - next.height / 2).max(0);
    next.width = next.width.min(cols - next.x);
    next.height = next.height.min(rows - next.y);

    let mut angle = ((std::f64::consts::FRAC_PI_2 + theta).to_degrees()) as f32;
    angle = angle.rem_euclid(360.0);
    if angle >= 180.0 {
        angle -= 180.0;
    }

    let region = OrientedRegion::new(
        (
            next.x as f32 + next.width as f32 * 0.5,
            next.y as f32 + next.height as f32 * 0.5,
        ),
        (width as f32, length as f32),
        angle,
    );
    Some(CamShiftResult {
        region,
        window: next,
    })
}
