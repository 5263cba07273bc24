//! Small fixed-size vector helpers for 3D coordinates.
//!
//! Point sets store plain `[f64; 3]` arrays so they can be handed to the k-d
//! tree and the exact orientation predicate without conversion. These helpers
//! cover the handful of vector operations the hull and metric code needs.

pub mod point_generation;

pub use point_generation::*;

/// Component-wise difference `a - b`.
#[inline]
#[must_use]
pub fn sub(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Dot product.
#[inline]
#[must_use]
pub fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product `a × b`.
#[inline]
#[must_use]
pub fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Sum of squared components.
///
/// # Examples
///
/// ```
/// use hullclean::geometry::util::squared_norm;
///
/// assert_eq!(squared_norm(&[1.0, 2.0, 2.0]), 9.0);
/// ```
#[inline]
#[must_use]
pub fn squared_norm(v: &[f64; 3]) -> f64 {
    dot(v, v)
}

/// Euclidean length, computed with scaling so that very large or very small
/// components neither overflow nor underflow.
///
/// # Examples
///
/// ```
/// use hullclean::geometry::util::hypot;
///
/// assert_eq!(hypot(&[1.0, 2.0, 2.0]), 3.0);
/// assert_eq!(hypot(&[0.0, 0.0, 0.0]), 0.0);
/// ```
#[must_use]
pub fn hypot(v: &[f64; 3]) -> f64 {
    let max_abs = v.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()));
    if max_abs == 0.0 || !max_abs.is_finite() {
        return max_abs;
    }
    let scaled = [v[0] / max_abs, v[1] / max_abs, v[2] / max_abs];
    max_abs * squared_norm(&scaled).sqrt()
}

/// Squared Euclidean distance between two points.
#[inline]
#[must_use]
pub fn squared_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    squared_norm(&sub(a, b))
}

/// Returns `v` scaled to unit length.
///
/// A zero vector has no direction; it is returned unchanged.
#[must_use]
pub fn normalize(v: &[f64; 3]) -> [f64; 3] {
    let len = hypot(v);
    if len == 0.0 {
        return *v;
    }
    [v[0] / len, v[1] / len, v[2] / len]
}

/// Returns `true` if every component is finite.
#[inline]
#[must_use]
pub fn is_finite(v: &[f64; 3]) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// Hashable identity of a coordinate; `-0.0` and `0.0` compare equal.
#[inline]
#[must_use]
pub fn coordinate_key(p: &[f64; 3]) -> [u64; 3] {
    p.map(|c| (c + 0.0).to_bits())
}
