//! Cubic Hermite interpolation and the Akima slope rule.

use serde::{Deserialize, Serialize};

/// One control point of a pitch contour.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HermiteSplinePoint {
    /// Position on the output timeline, in samples.
    pub t: f64,
    /// Pitch value.
    pub y: f32,
    /// Slope in pitch units per sample.
    pub dy: f32,
}

impl HermiteSplinePoint {
    pub fn new(t: f64, y: f32, dy: f32) -> Self {
        Self { t, y, dy }
    }
}

/// Cubic polynomial for one spline segment, in power form around `t0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HermiteInterpolation {
    t0: f64,
    a: f32,
    b: f32,
    c: f32,
    d: f32,
}

impl HermiteInterpolation {
    /// A constant function.
    pub fn constant(value: f32) -> Self {
        Self {
            t0: 0.0,
            a: 0.0,
            b: 0.0,
            c: 0.0,
            d: value,
        }
    }

    /// The cubic Hermite segment between `p0` and `p1`.
    ///
    /// Falls back to a line through `p0` with slope `p0.dy` when the two
    /// points share a position.
    pub fn new(p0: &HermiteSplinePoint, p1: &HermiteSplinePoint) -> Self {
        let dt = (p1.t - p0.t) as f32;
        if !(dt > 0.0) {
            return Self {
                t0: p0.t,
                a: 0.0,
                b: 0.0,
                c: 0.0,
                d: p0.y,
            };
        }
        let m = (p1.y - p0.y) / dt;
        Self {
            t0: p0.t,
            a: (p0.dy + p1.dy - 2.0 * m) / (dt * dt),
            b: (3.0 * m - 2.0 * p0.dy - p1.dy) / dt,
            c: p0.dy,
            d: p0.y,
        }
    }

    /// Evaluates the segment at `t`.
    #[inline]
    pub fn eval(&self, t: f64) -> f32 {
        let t = (t - self.t0) as f32;
        self.d + t * (self.c + t * (self.b + t * self.a))
    }
}

/// Secant slope between two points, zero for coincident positions.
#[inline]
pub fn secant(p0: &HermiteSplinePoint, p1: &HermiteSplinePoint) -> f32 {
    let dt = (p1.t - p0.t) as f32;
    if dt > 0.0 {
        (p1.y - p0.y) / dt
    } else {
        0.0
    }
}

/// Computes the Akima slope at `p2` from up to two neighbors on each side.
///
/// Missing outer neighbors degrade to the plain average of the two adjacent
/// secants; a missing inner neighbor degrades to the one-sided secant. An
/// isolated point keeps its current slope.
pub fn akima_slope(
    p0: Option<&HermiteSplinePoint>,
    p1: Option<&HermiteSplinePoint>,
    p2: &HermiteSplinePoint,
    p3: Option<&HermiteSplinePoint>,
    p4: Option<&HermiteSplinePoint>,
) -> f32 {
    let (p1, p3) = match (p1, p3) {
        (None, None) => return p2.dy,
        (None, Some(p3)) => return secant(p2, p3),
        (Some(p1), None) => return secant(p1, p2),
        (Some(p1), Some(p3)) => (p1, p3),
    };

    let m1 = secant(p1, p2);
    let m2 = secant(p2, p3);

    let (p0, p4) = match (p0, p4) {
        (Some(p0), Some(p4)) => (p0, p4),
        _ => return (m1 + m2) / 2.0,
    };

    let m0 = secant(p0, p1);
    let m3 = secant(p3, p4);

    let a = (m2 - m3).abs();
    let b = (m0 - m1).abs();
    if a + b > 0.0 {
        (a * m1 + b * m2) / (a + b)
    } else {
        (m1 + m2) / 2.0
    }
}

/// Recomputes Akima slopes for every point of a contiguous point sequence.
pub fn update_akima_slopes(points: &mut [HermiteSplinePoint]) {
    fn at(points: &[HermiteSplinePoint], j: isize) -> Option<&HermiteSplinePoint> {
        usize::try_from(j).ok().and_then(|j| points.get(j))
    }

    let snapshot: Vec<HermiteSplinePoint> = points.to_vec();
    for (i, point) in points.iter_mut().enumerate() {
        let i = i as isize;
        point.dy = akima_slope(
            at(&snapshot, i - 2),
            at(&snapshot, i - 1),
            &snapshot[i as usize],
            at(&snapshot, i + 1),
            at(&snapshot, i + 2),
        );
    }
}

/// Evaluates a contour described by sorted points at `t`, holding the end
/// values outside the covered range.
pub fn evaluate(points: &[HermiteSplinePoint], t: f64) -> Option<f32> {
    let first = points.first()?;
    if points.len() == 1 || t <= first.t {
        return Some(first.y);
    }
    let idx = points.partition_point(|p| p.t <= t);
    if idx >= points.len() {
        return points.last().map(|p| p.y);
    }
    Some(HermiteInterpolation::new(&points[idx - 1], &points[idx]).eval(t))
}
