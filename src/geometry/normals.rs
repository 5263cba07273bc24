//! Local surface normal estimation.
//!
//! Each point's normal is fitted by principal component analysis of its
//! neighborhood: the eigenvector of the neighborhood covariance with the
//! smallest eigenvalue is perpendicular to the best-fit tangent plane.
//! Neighborhoods use a hybrid criterion, all points within a radius capped
//! at the nearest `max_neighbors`.
//!
//! The sign of an estimated normal is arbitrary. Comparisons between
//! estimated normals must be sign-invariant (absolute dot products).

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use crate::core::spatial_index::{SpatialIndex, SpatialIndexError};

/// Normal used when a neighborhood is too small to define a plane.
pub const FALLBACK_NORMAL: [f64; 3] = [0.0, 0.0, 1.0];

/// Smallest neighborhood (including the point itself) that defines a plane.
const MIN_NEIGHBORHOOD: usize = 3;

/// Hybrid neighborhood search parameters for normal estimation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalSearchParams {
    /// Neighborhood radius, in the cloud's units.
    pub radius: f64,
    /// Maximum number of neighbors (nearest first) used for the fit.
    pub max_neighbors: usize,
}

impl Default for NormalSearchParams {
    fn default() -> Self {
        Self {
            radius: 0.1,
            max_neighbors: 30,
        }
    }
}

/// PCA normal estimator.
///
/// # Examples
///
/// ```rust
/// use hullclean::geometry::normals::{NormalEstimator, NormalSearchParams};
///
/// // A small patch of the z = 0 plane.
/// let patch = vec![
///     [0.0, 0.0, 0.0],
///     [0.02, 0.0, 0.0],
///     [0.0, 0.02, 0.0],
///     [0.02, 0.02, 0.0],
/// ];
/// let normals = NormalEstimator::new(NormalSearchParams::default())
///     .estimate(&patch)
///     .unwrap();
///
/// for n in normals {
///     assert!((n[2].abs() - 1.0).abs() < 1e-9);
/// }
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NormalEstimator {
    params: NormalSearchParams,
}

impl NormalEstimator {
    /// Creates an estimator with the given search parameters.
    #[must_use]
    pub const fn new(params: NormalSearchParams) -> Self {
        Self { params }
    }

    /// The search parameters in use.
    #[must_use]
    pub const fn params(&self) -> &NormalSearchParams {
        &self.params
    }

    /// Estimates one unit normal per point, in input order.
    ///
    /// Points whose neighborhood holds fewer than three points get
    /// [`FALLBACK_NORMAL`]. An empty input yields an empty output.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialIndexError::NonFiniteCoordinate`] if any coordinate is
    /// NaN or infinite.
    pub fn estimate(&self, points: &[[f64; 3]]) -> Result<Vec<[f64; 3]>, SpatialIndexError> {
        if points.is_empty() {
            return Ok(Vec::new());
        }
        let index = SpatialIndex::build(points)?;

        let mut sparse = 0_usize;
        let normals = points
            .iter()
            .map(|p| {
                let neighborhood: Vec<Vector3<f64>> = index
                    .within(p, self.params.radius, self.params.max_neighbors)
                    .into_iter()
                    .map(|n| Vector3::from(points[n.index]))
                    .collect();
                fit_normal(&neighborhood).unwrap_or_else(|| {
                    sparse += 1;
                    FALLBACK_NORMAL
                })
            })
            .collect();

        if sparse > 0 {
            tracing::warn!(
                sparse,
                total = points.len(),
                radius = self.params.radius,
                "neighborhoods too small for a plane fit; using fallback normal"
            );
        }
        Ok(normals)
    }
}

/// Smallest-eigenvalue eigenvector of the neighborhood covariance.
fn fit_normal(neighborhood: &[Vector3<f64>]) -> Option<[f64; 3]> {
    if neighborhood.len() < MIN_NEIGHBORHOOD {
        return None;
    }

    #[allow(clippy::cast_precision_loss)]
    let count = neighborhood.len() as f64;
    let centroid = neighborhood
        .iter()
        .fold(Vector3::zeros(), |acc, v| acc + v)
        / count;
    let covariance = neighborhood
        .iter()
        .map(|v| {
            let d = v - centroid;
            d * d.transpose()
        })
        .fold(Matrix3::zeros(), |acc, m| acc + m)
        / count;
    if !covariance.iter().all(|c| c.is_finite()) {
        return None;
    }

    let eigen = covariance.symmetric_eigen();
    let smallest = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .fold(0, |best, (i, &value)| {
            if value < eigen.eigenvalues[best] { i } else { best }
        });

    let normal = eigen.eigenvectors.column(smallest).into_owned();
    let norm = normal.norm();
    if norm > 1e-12 && norm.is_finite() {
        let unit = normal / norm;
        Some([unit.x, unit.y, unit.z])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::util::{dot, generate_unit_sphere_seeded, hypot};
    use approx::assert_relative_eq;

    #[test]
    fn test_default_params() {
        let params = NormalSearchParams::default();
        assert_relative_eq!(params.radius, 0.1);
        assert_eq!(params.max_neighbors, 30);
    }

    #[test]
    fn test_tilted_plane_normal() {
        // Grid on the plane x + y + z = 0.
        let mut points = Vec::new();
        for i in -3..=3 {
            for j in -3..=3 {
                let (u, v) = (f64::from(i) * 0.01, f64::from(j) * 0.01);
                points.push([u, v, -u - v]);
            }
        }
        let normals = NormalEstimator::default().estimate(&points).unwrap();
        let expected = 1.0 / 3.0_f64.sqrt();
        for n in &normals {
            assert_relative_eq!(hypot(n), 1.0, epsilon = 1e-9);
            assert_relative_eq!(dot(n, &[expected; 3]).abs(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_isolated_points_fall_back() {
        let points = vec![[0.0, 0.0, 0.0], [5.0, 0.0, 0.0], [0.0, 5.0, 0.0]];
        let normals = NormalEstimator::default().estimate(&points).unwrap();
        assert_eq!(normals, vec![FALLBACK_NORMAL; 3]);
    }

    #[test]
    fn test_dense_sphere_normals_are_radial() {
        let sphere = generate_unit_sphere_seeded(4000, 21);
        let estimator = NormalEstimator::new(NormalSearchParams {
            radius: 0.15,
            max_neighbors: 30,
        });
        let normals = estimator.estimate(sphere.points()).unwrap();
        let mean_alignment = sphere
            .points()
            .iter()
            .zip(&normals)
            .map(|(p, n)| dot(p, n).abs())
            .sum::<f64>()
            / 4000.0;
        assert!(mean_alignment > 0.95, "mean alignment {mean_alignment}");
    }

    #[test]
    fn test_stacked_duplicates_get_finite_normals() {
        let mut points = vec![[0.5, 0.5, 0.5]; 400];
        for i in 0..5 {
            points.push([0.5 + f64::from(i) * 0.01, 0.5, 0.5]);
        }
        let normals = NormalEstimator::default().estimate(&points).unwrap();
        assert_eq!(normals.len(), 405);
        for n in &normals {
            assert!(n.iter().all(|c| c.is_finite()));
            assert_relative_eq!(hypot(n), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(NormalEstimator::default().estimate(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_non_finite_input() {
        let err = NormalEstimator::default()
            .estimate(&[[0.0, 0.0, 0.0], [f64::INFINITY, 0.0, 0.0]])
            .unwrap_err();
        assert_eq!(err, SpatialIndexError::NonFiniteCoordinate { index: 1 });
    }
}
