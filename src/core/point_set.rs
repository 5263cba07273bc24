//! In-memory point cloud model.
//!
//! A [`PointSet`] is an ordered list of 3D coordinates with an optional,
//! index-aligned list of normals. Everything downstream (hull peeling, spatial
//! indexing, metrics) reads point sets; the only in-place mutation offered is
//! normal augmentation, which fills in normals when they are absent and never
//! overwrites existing ones.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::spatial_index::SpatialIndexError;
use crate::geometry::normals::{NormalEstimator, NormalSearchParams};
use crate::geometry::util::{is_finite, normalize, squared_norm};

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised when a point set's parallel arrays disagree.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PointSetError {
    /// Normals were supplied but their count differs from the point count.
    #[error("Shape mismatch: {points} points but {normals} normals")]
    ShapeMismatch {
        /// Number of coordinates.
        points: usize,
        /// Number of normals.
        normals: usize,
    },
    /// A selection referenced an index past the end of the set.
    #[error("Index {index} is out of bounds for a point set of length {len}")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Length of the point set.
        len: usize,
    },
    /// A supplied normal has a NaN or infinite component.
    #[error("Normal {index} has a non-finite component")]
    NonFiniteNormal {
        /// Index of the offending normal.
        index: usize,
    },
}

// =============================================================================
// POINT SET
// =============================================================================

/// An ordered 3D point cloud with optional per-point normals.
///
/// Invariant: when `normals` is present it has exactly one entry per point,
/// with the same index correspondence.
///
/// # Examples
///
/// ```rust
/// use hullclean::core::point_set::PointSet;
///
/// let cloud = PointSet::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
/// assert_eq!(cloud.len(), 2);
/// assert!(!cloud.has_normals());
///
/// let oriented = PointSet::with_normals(
///     vec![[0.0, 0.0, 0.0]],
///     vec![[0.0, 0.0, 1.0]],
/// ).unwrap();
/// assert!(oriented.has_normals());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPointSet")]
pub struct PointSet {
    points: Vec<[f64; 3]>,
    normals: Option<Vec<[f64; 3]>>,
}

/// Unchecked serde shape; converted through [`PointSet::with_normals`].
#[derive(Deserialize)]
struct RawPointSet {
    points: Vec<[f64; 3]>,
    normals: Option<Vec<[f64; 3]>>,
}

impl TryFrom<RawPointSet> for PointSet {
    type Error = PointSetError;

    fn try_from(raw: RawPointSet) -> Result<Self, Self::Error> {
        match raw.normals {
            Some(normals) => Self::with_normals(raw.points, normals),
            None => Ok(Self::new(raw.points)),
        }
    }
}

impl PointSet {
    /// Creates a point set without normals.
    #[must_use]
    pub const fn new(points: Vec<[f64; 3]>) -> Self {
        Self {
            points,
            normals: None,
        }
    }

    /// Creates a point set with one normal per point.
    ///
    /// # Errors
    ///
    /// - [`PointSetError::ShapeMismatch`] if the two arrays differ in length
    /// - [`PointSetError::NonFiniteNormal`] if any normal component is NaN or infinite
    pub fn with_normals(
        points: Vec<[f64; 3]>,
        normals: Vec<[f64; 3]>,
    ) -> Result<Self, PointSetError> {
        if points.len() != normals.len() {
            return Err(PointSetError::ShapeMismatch {
                points: points.len(),
                normals: normals.len(),
            });
        }
        if let Some(index) = normals.iter().position(|n| !is_finite(n)) {
            return Err(PointSetError::NonFiniteNormal { index });
        }
        Ok(Self {
            points,
            normals: Some(normals),
        })
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the set holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The coordinates, in input order.
    #[must_use]
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// The normals, if present.
    #[must_use]
    pub fn normals(&self) -> Option<&[[f64; 3]]> {
        self.normals.as_deref()
    }

    /// Whether the set carries normals.
    #[must_use]
    pub const fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Builds a new set from the given indices, keeping normals aligned.
    ///
    /// Indices may repeat and appear in any order; the output follows them.
    ///
    /// # Errors
    ///
    /// Returns [`PointSetError::IndexOutOfBounds`] for any index `>= self.len()`.
    pub fn select(&self, indices: &[usize]) -> Result<Self, PointSetError> {
        let len = self.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(PointSetError::IndexOutOfBounds { index, len });
        }
        let points = indices.iter().map(|&i| self.points[i]).collect();
        let normals = self
            .normals
            .as_ref()
            .map(|normals| indices.iter().map(|&i| normals[i]).collect());
        Ok(Self { points, normals })
    }

    /// Estimates normals from local neighborhoods when the set has none.
    ///
    /// Existing normals are left untouched. Returns `true` when normals were
    /// added by this call.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialIndexError::NonFiniteCoordinate`] if a coordinate is
    /// NaN or infinite; the set is left unchanged.
    pub fn estimate_normals(
        &mut self,
        params: &NormalSearchParams,
    ) -> Result<bool, SpatialIndexError> {
        if self.normals.is_some() {
            return Ok(false);
        }
        let estimator = NormalEstimator::new(*params);
        self.normals = Some(estimator.estimate(&self.points)?);
        Ok(true)
    }

    /// Rescales every normal to unit length.
    ///
    /// Zero-length normals have no direction and are left as zero vectors.
    pub fn normalize_normals(&mut self) {
        if let Some(normals) = self.normals.as_mut() {
            for n in normals.iter_mut() {
                if squared_norm(n) > 0.0 {
                    *n = normalize(n);
                }
            }
        }
    }

    /// Splits the set back into its parts.
    #[must_use]
    pub fn into_parts(self) -> (Vec<[f64; 3]>, Option<Vec<[f64; 3]>>) {
        (self.points, self.normals)
    }
}

impl From<Vec<[f64; 3]>> for PointSet {
    fn from(points: Vec<[f64; 3]>) -> Self {
        Self::new(points)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_with_normals_rejects_length_mismatch() {
        let err = PointSet::with_normals(vec![[0.0; 3]; 3], vec![[0.0, 0.0, 1.0]; 2]).unwrap_err();
        assert_eq!(
            err,
            PointSetError::ShapeMismatch {
                points: 3,
                normals: 2
            }
        );
    }

    #[test]
    fn test_with_normals_rejects_non_finite() {
        for bad in [
            [f64::NAN, f64::NAN, f64::NAN],
            [0.0, f64::INFINITY, 0.0],
            [0.0, 0.0, f64::NEG_INFINITY],
        ] {
            let err = PointSet::with_normals(
                vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
                vec![[0.0, 0.0, 1.0], bad],
            )
            .unwrap_err();
            assert_eq!(err, PointSetError::NonFiniteNormal { index: 1 });
        }
    }

    #[test]
    fn test_select_keeps_normals_aligned() {
        let cloud = PointSet::with_normals(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        )
        .unwrap();

        let picked = cloud.select(&[2, 0]).unwrap();
        assert_eq!(picked.points(), &[[2.0, 0.0, 0.0], [0.0, 0.0, 0.0]]);
        assert_eq!(
            picked.normals().unwrap(),
            &[[0.0, 0.0, 1.0], [1.0, 0.0, 0.0]]
        );
    }

    #[test]
    fn test_select_out_of_bounds() {
        let cloud = PointSet::new(vec![[0.0; 3]; 2]);
        assert_eq!(
            cloud.select(&[0, 5]),
            Err(PointSetError::IndexOutOfBounds { index: 5, len: 2 })
        );
    }

    #[test]
    fn test_estimate_normals_never_overwrites() {
        let existing = vec![[0.0, 2.0, 0.0]; 4];
        let mut cloud = PointSet::with_normals(vec![[0.0; 3]; 4], existing.clone()).unwrap();
        assert!(!cloud.estimate_normals(&NormalSearchParams::default()).unwrap());
        assert_eq!(cloud.normals().unwrap(), existing.as_slice());
    }

    #[test]
    fn test_estimate_normals_fills_missing() {
        let mut cloud = PointSet::new(vec![
            [0.0, 0.0, 0.0],
            [0.05, 0.0, 0.0],
            [0.0, 0.05, 0.0],
            [0.05, 0.05, 0.0],
        ]);
        assert!(cloud.estimate_normals(&NormalSearchParams::default()).unwrap());
        let normals = cloud.normals().unwrap();
        assert_eq!(normals.len(), 4);
        for n in normals {
            assert_relative_eq!(n[2].abs(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_normalize_normals_skips_zero_vectors() {
        let mut cloud =
            PointSet::with_normals(vec![[0.0; 3]; 2], vec![[0.0, 3.0, 4.0], [0.0, 0.0, 0.0]])
                .unwrap();
        cloud.normalize_normals();
        let normals = cloud.normals().unwrap();
        assert_relative_eq!(normals[0][1], 0.6, epsilon = 1e-12);
        assert_relative_eq!(normals[0][2], 0.8, epsilon = 1e-12);
        assert_eq!(normals[1], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_serde_round_trip() {
        let cloud = PointSet::with_normals(vec![[1.0, 2.0, 3.0]], vec![[0.0, 0.0, 1.0]]).unwrap();
        let json = serde_json::to_string(&cloud).expect("Serialization failed");
        let back: PointSet = serde_json::from_str(&json).expect("Deserialization failed");
        assert_eq!(back, cloud);
    }

    #[test]
    fn test_deserialize_rejects_misaligned_normals() {
        let json = r#"{"points":[[0.0,0.0,0.0]],"normals":[]}"#;
        assert!(serde_json::from_str::<PointSet>(json).is_err());
    }

    #[test]
    fn test_deserialize_rejects_non_finite_normals() {
        let json = r#"{"points":[[0.0,0.0,0.0]],"normals":[[1e400,0.0,0.0]]}"#;
        assert!(serde_json::from_str::<PointSet>(json).is_err());
    }
}
