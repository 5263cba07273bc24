//! Normal consistency between two point clouds.
//!
//! Points are matched by position exactly as for the Chamfer distance; each
//! match is then scored by the absolute dot product of the two unit normals.
//! The absolute value makes the score independent of normal sign, which local
//! PCA estimation does not fix. Scores lie in `[0, 1]`: `1` for parallel or
//! anti-parallel normals, `0` for orthogonal ones.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::core::point_set::PointSet;
use crate::core::spatial_index::Neighbor;
use crate::geometry::normals::NormalSearchParams;
use crate::geometry::util::dot;
use crate::metrics::correspondence::{CorrespondenceConfig, CorrespondenceMetric, MetricError};

/// Which normals a match compares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalPairing {
    /// The query point's normal against its nearest neighbor's normal.
    #[default]
    CrossSet,
    /// The reference cloud's normal at the query's position in the sample
    /// against the reference cloud's normal at the match.
    ///
    /// This reproduces the scores of an earlier evaluation tool for
    /// comparisons against its published numbers. It only pairs samples of
    /// equal size.
    SelfIndexed,
}

/// Mean absolute normal agreement of nearest-neighbor matches.
///
/// Clouds without normals get them estimated (see
/// [`NormalEstimator`](crate::geometry::normals::NormalEstimator)) on the full
/// cloud before subsampling; all normals are normalized before use.
///
/// # Examples
///
/// ```rust
/// use hullclean::core::point_set::PointSet;
/// use hullclean::metrics::correspondence::CorrespondenceMetric;
/// use hullclean::metrics::normal_consistency::NormalConsistency;
///
/// let a = PointSet::with_normals(
///     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
///     vec![[0.0, 0.0, 1.0], [0.0, 0.0, -2.0]],
/// ).unwrap();
/// let b = PointSet::with_normals(
///     vec![[0.0, 0.0, 0.1], [1.0, 0.0, 0.1]],
///     vec![[0.0, 0.0, 1.0], [1.0, 0.0, 0.0]],
/// ).unwrap();
///
/// let result = NormalConsistency::default().compute(&a, &b).unwrap();
/// assert_eq!(result.a_to_b(), 0.5);
/// assert_eq!(result.combined(), 0.5);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NormalConsistency {
    config: CorrespondenceConfig,
    search: NormalSearchParams,
    pairing: NormalPairing,
}

impl NormalConsistency {
    /// Creates the metric with cross-set pairing.
    #[must_use]
    pub fn new(config: CorrespondenceConfig, search: NormalSearchParams) -> Self {
        Self {
            config,
            search,
            pairing: NormalPairing::default(),
        }
    }

    /// Sets the normal pairing.
    #[must_use]
    pub const fn with_pairing(mut self, pairing: NormalPairing) -> Self {
        self.pairing = pairing;
        self
    }

    /// The normal pairing in use.
    #[must_use]
    pub const fn pairing(&self) -> NormalPairing {
        self.pairing
    }

    /// Neighborhood parameters for clouds that need estimated normals.
    #[must_use]
    pub const fn search_params(&self) -> &NormalSearchParams {
        &self.search
    }

    fn normals<'a>(&self, cloud: &'a PointSet) -> Result<&'a [[f64; 3]], MetricError> {
        cloud
            .normals()
            .ok_or(MetricError::MissingNormals { metric: self.name() })
    }
}

impl CorrespondenceMetric for NormalConsistency {
    fn name(&self) -> &'static str {
        "normal_consistency"
    }

    fn config(&self) -> &CorrespondenceConfig {
        &self.config
    }

    fn prepare<'a>(&self, cloud: &'a PointSet) -> Result<Cow<'a, PointSet>, MetricError> {
        let mut prepared = cloud.clone();
        if prepared.estimate_normals(&self.search)? {
            tracing::debug!(points = prepared.len(), "estimated missing normals");
        }
        prepared.normalize_normals();
        Ok(Cow::Owned(prepared))
    }

    fn check_pairing(&self, a: &PointSet, b: &PointSet) -> Result<(), MetricError> {
        if self.pairing == NormalPairing::SelfIndexed && a.len() != b.len() {
            return Err(MetricError::ShapeMismatch {
                metric: self.name(),
                query: a.len(),
                reference: b.len(),
            });
        }
        Ok(())
    }

    fn score(
        &self,
        query: &PointSet,
        query_index: usize,
        reference: &PointSet,
        neighbor: &Neighbor,
    ) -> Result<f64, MetricError> {
        let reference_normals = self.normals(reference)?;
        let own = match self.pairing {
            NormalPairing::CrossSet => &self.normals(query)?[query_index],
            NormalPairing::SelfIndexed => {
                reference_normals
                    .get(query_index)
                    .ok_or(MetricError::ShapeMismatch {
                        metric: self.name(),
                        query: query.len(),
                        reference: reference.len(),
                    })?
            }
        };
        let agreement = dot(own, &reference_normals[neighbor.index]).abs();
        if !agreement.is_finite() {
            return Err(MetricError::NonFiniteScore {
                metric: self.name(),
                index: query_index,
            });
        }
        // Unit vectors can overshoot 1 by rounding.
        Ok(agreement.min(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spatial_index::SpatialIndexError;
    use crate::geometry::util::generate_unit_sphere_seeded;
    use approx::assert_relative_eq;

    #[test]
    fn test_identical_sphere_is_fully_consistent() {
        let sphere = generate_unit_sphere_seeded(500, 5);
        let result = NormalConsistency::default().compute(&sphere, &sphere).unwrap();
        assert_relative_eq!(result.combined(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_flipped_normals_still_consistent() {
        let sphere = generate_unit_sphere_seeded(200, 6);
        let (points, normals) = sphere.clone().into_parts();
        let flipped: Vec<[f64; 3]> = normals
            .unwrap_or_default()
            .iter()
            .map(|n| n.map(|c| -c))
            .collect();
        let inward = PointSet::with_normals(points, flipped).unwrap();

        let result = NormalConsistency::default().compute(&sphere, &inward).unwrap();
        assert_relative_eq!(result.combined(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_orthogonal_normals_score_zero() {
        let points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let a = PointSet::with_normals(points.clone(), vec![[1.0, 0.0, 0.0]; 2]).unwrap();
        let b = PointSet::with_normals(points, vec![[0.0, 1.0, 0.0]; 2]).unwrap();
        let result = NormalConsistency::default().compute(&a, &b).unwrap();
        assert_eq!(result.combined(), 0.0);
    }

    #[test]
    fn test_missing_normals_are_estimated() {
        // Flat patch without normals against the same patch with +z normals.
        let mut points = Vec::new();
        for i in 0..6 {
            for j in 0..6 {
                points.push([f64::from(i) * 0.02, f64::from(j) * 0.02, 0.0]);
            }
        }
        let bare = PointSet::new(points.clone());
        let oriented = PointSet::with_normals(points, vec![[0.0, 0.0, 1.0]; 36]).unwrap();

        let result = NormalConsistency::default().compute(&bare, &oriented).unwrap();
        assert_relative_eq!(result.combined(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_self_indexed_pairing_requires_equal_sizes() {
        let a = generate_unit_sphere_seeded(40, 1);
        let b = generate_unit_sphere_seeded(30, 2);
        let metric = NormalConsistency::default().with_pairing(NormalPairing::SelfIndexed);
        assert!(matches!(
            metric.compute(&a, &b),
            Err(MetricError::ShapeMismatch {
                query: 40,
                reference: 30,
                ..
            })
        ));
    }

    #[test]
    fn test_self_indexed_pairing_ignores_query_normals() {
        let points = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let a = PointSet::with_normals(points.clone(), vec![[1.0, 0.0, 0.0]; 2]).unwrap();
        let b = PointSet::with_normals(points, vec![[0.0, 1.0, 0.0]; 2]).unwrap();

        let literal = NormalConsistency::default()
            .with_pairing(NormalPairing::SelfIndexed)
            .compute(&a, &b)
            .unwrap();
        assert_eq!(literal.combined(), 1.0);
    }

    #[test]
    fn test_empty_cloud_is_an_error() {
        let sphere = generate_unit_sphere_seeded(10, 1);
        assert_eq!(
            NormalConsistency::default().compute(&sphere, &PointSet::default()),
            Err(MetricError::SpatialIndex(SpatialIndexError::EmptyIndex))
        );
    }
}
