//! Exact geometric predicates for 3D hull construction.
//!
//! Hull classification decides, for every input point, whether it sits on the
//! boundary or strictly inside. Floating-point determinants get that wrong for
//! nearly coplanar points, so the orientation test here is evaluated with
//! Shewchuk's adaptive-precision arithmetic (the `robust` crate) and its sign
//! is exact.

use robust::{Coord3D, orient3d};

/// Represents the orientation of a point relative to an oriented triangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// The point lies on the outer side of the triangle (determinant < 0)
    NEGATIVE,
    /// The point lies exactly in the triangle's plane
    DEGENERATE,
    /// The point lies on the inner side of the triangle (determinant > 0)
    POSITIVE,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NEGATIVE => write!(f, "NEGATIVE"),
            Self::DEGENERATE => write!(f, "DEGENERATE"),
            Self::POSITIVE => write!(f, "POSITIVE"),
        }
    }
}

#[inline]
fn coord(p: &[f64; 3]) -> Coord3D<f64> {
    Coord3D {
        x: p[0],
        y: p[1],
        z: p[2],
    }
}

/// Signed volume determinant of the tetrahedron `(a, b, c, d)`.
///
/// The value is six times the signed volume and is positive when `d` lies
/// below the plane through `a`, `b`, `c`, where "below" means `a`, `b`, `c`
/// appear counter-clockwise when viewed from above. The sign is exact; the
/// magnitude is a floating-point approximation that is proportional to the
/// distance of `d` from the plane.
#[inline]
#[must_use]
pub fn orient3d_value(a: &[f64; 3], b: &[f64; 3], c: &[f64; 3], d: &[f64; 3]) -> f64 {
    orient3d(coord(a), coord(b), coord(c), coord(d))
}

/// Exact orientation of `d` relative to the oriented triangle `(a, b, c)`.
///
/// Hull facets are stored counter-clockwise as seen from outside, so a point
/// in the interior of the hull is [`Orientation::POSITIVE`] for every facet and
/// a point beyond a facet is [`Orientation::NEGATIVE`] for that facet.
///
/// # Examples
///
/// ```
/// use hullclean::geometry::predicates::{Orientation, orientation_3d};
///
/// let a = [0.0, 0.0, 0.0];
/// let b = [1.0, 0.0, 0.0];
/// let c = [0.0, 1.0, 0.0];
///
/// assert_eq!(orientation_3d(&a, &b, &c, &[0.2, 0.2, -1.0]), Orientation::POSITIVE);
/// assert_eq!(orientation_3d(&a, &b, &c, &[0.2, 0.2, 1.0]), Orientation::NEGATIVE);
/// assert_eq!(orientation_3d(&a, &b, &c, &[5.0, 5.0, 0.0]), Orientation::DEGENERATE);
/// ```
#[must_use]
pub fn orientation_3d(a: &[f64; 3], b: &[f64; 3], c: &[f64; 3], d: &[f64; 3]) -> Orientation {
    let det = orient3d_value(a, b, c, d);
    if det > 0.0 {
        Orientation::POSITIVE
    } else if det < 0.0 {
        Orientation::NEGATIVE
    } else {
        Orientation::DEGENERATE
    }
}
