//! Planar geometry on normalized landmark coordinates.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A 2-D point in normalized image coordinates (x and y typically in `[0, 1]`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn sub(self, other: Self) -> (f64, f64) {
        (self.x - other.x, self.y - other.y)
    }
}

impl From<(f64, f64)> for Point2 {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Angle in degrees at vertex `p2` between the rays `p2 -> p1` and `p2 -> p3`.
///
/// The result lies in `[0, 180]`. The cosine is clamped to `[-1, 1]` so
/// rounding on nearly collinear points cannot push `acos` out of its domain.
///
/// # Errors
///
/// Returns [`Error::DegenerateGeometry`] when either ray has zero length
/// (`p1 == p2` or `p3 == p2`) or any coordinate is not finite.
pub fn angle(p1: Point2, p2: Point2, p3: Point2) -> Result<f64> {
    let (bax, bay) = p1.sub(p2);
    let (bcx, bcy) = p3.sub(p2);

    let norm_ba = bax.hypot(bay);
    let norm_bc = bcx.hypot(bcy);
    let denominator = norm_ba * norm_bc;

    if !denominator.is_finite() {
        return Err(Error::DegenerateGeometry(format!(
            "non-finite coordinates around vertex ({}, {})",
            p2.x, p2.y
        )));
    }
    if denominator == 0.0 {
        return Err(Error::DegenerateGeometry(format!(
            "zero-length ray at vertex ({}, {})",
            p2.x, p2.y
        )));
    }

    let cosine = (bax * bcx + bay * bcy) / denominator;
    Ok(cosine.clamp(-1.0, 1.0).acos().to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn test_right_angle() {
        let a = angle(p(1.0, 0.0), p(0.0, 0.0), p(0.0, 1.0)).unwrap();
        assert!((a - 90.0).abs() < 1e-10);
    }

    #[test]
    fn test_straight_and_zero_angles() {
        let straight = angle(p(-1.0, 0.0), p(0.0, 0.0), p(1.0, 0.0)).unwrap();
        assert!((straight - 180.0).abs() < 1e-10);

        let zero = angle(p(1.0, 0.0), p(0.0, 0.0), p(2.0, 0.0)).unwrap();
        assert!(zero.abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_rays() {
        let vertex = p(0.4, 0.5);
        assert!(matches!(
            angle(vertex, vertex, p(0.6, 0.5)),
            Err(Error::DegenerateGeometry(_))
        ));
        assert!(matches!(
            angle(p(0.5, 0.3), vertex, vertex),
            Err(Error::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_non_finite_input() {
        let result = angle(p(f64::NAN, 0.0), p(0.0, 0.0), p(1.0, 0.0));
        assert!(matches!(result, Err(Error::DegenerateGeometry(_))));

        let result = angle(p(f64::INFINITY, 0.0), p(0.0, 0.0), p(1.0, 0.0));
        assert!(result.is_err());
    }

    #[test]
    fn test_symmetry() {
        let a = angle(p(0.5, 0.3), p(0.4, 0.5), p(0.6, 0.5)).unwrap();
        let b = angle(p(0.6, 0.5), p(0.4, 0.5), p(0.5, 0.3)).unwrap();
        assert_eq!(a, b);
    }
}
