//! Hull-vertex outlier removal.
//!
//! Scanners produce isolated spikes far outside the sampled surface. Such
//! spikes are extremal, so they show up as vertices of the cloud's convex
//! hull. [`HullOutlierRemover`] peels the hull: every point whose coordinate
//! is a hull vertex is classified as an outlier and everything else is kept.
//!
//! The policy is a heuristic. A genuinely convex object loses its outermost
//! surface samples as well, which is why the number of peeling passes is
//! configurable and defaults to a single pass.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::collections::{FastHashSet, fast_hash_set_with_capacity};
use crate::core::point_set::{PointSet, PointSetError};
use crate::geometry::algorithms::convex_hull::{ConvexHull3, ConvexHullConstructionError};
use crate::geometry::util::coordinate_key;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur while peeling hull outliers.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OutlierRemovalError {
    /// The points cannot form a 3D hull: fewer than four points, or all of
    /// them coincident, collinear, or coplanar.
    #[error("Degenerate input on peel pass {pass}: {source}")]
    DegenerateInput {
        /// 1-based pass number.
        pass: usize,
        /// The underlying hull construction failure.
        #[source]
        source: ConvexHullConstructionError,
    },
    /// Hull construction failed for a reason other than degeneracy.
    #[error("Convex hull construction failed on peel pass {pass}: {source}")]
    HullConstruction {
        /// 1-based pass number.
        pass: usize,
        /// The underlying hull construction failure.
        #[source]
        source: ConvexHullConstructionError,
    },
    /// The peel configuration is unusable.
    #[error("Invalid peel configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
    /// Building the output point sets failed.
    #[error(transparent)]
    PointSet(#[from] PointSetError),
}

impl OutlierRemovalError {
    fn from_hull(pass: usize, source: ConvexHullConstructionError) -> Self {
        match source {
            ConvexHullConstructionError::InsufficientPoints { .. }
            | ConvexHullConstructionError::GeometricDegeneracy { .. } => {
                Self::DegenerateInput { pass, source }
            }
            ConvexHullConstructionError::NonFiniteCoordinate { .. }
            | ConvexHullConstructionError::TopologyInconsistency { .. } => {
                Self::HullConstruction { pass, source }
            }
        }
    }
}

// =============================================================================
// CONFIGURATION AND RESULT
// =============================================================================

/// How many hull shells to peel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HullPeelConfig {
    /// Number of peeling passes. Pass 1 removes the outermost shell; each
    /// further pass re-hulls the remaining interior and removes its shell.
    pub passes: usize,
}

impl Default for HullPeelConfig {
    fn default() -> Self {
        Self { passes: 1 }
    }
}

/// Partition of a point set into interior (`kept`) and hull (`removed`) points.
///
/// `kept_indices` and `removed_indices` are ascending indices into the input
/// set. Together they cover every input index exactly once.
#[derive(Clone, Debug, PartialEq)]
pub struct HullResult {
    kept: PointSet,
    removed: PointSet,
    kept_indices: Vec<usize>,
    removed_indices: Vec<usize>,
    passes_completed: usize,
}

impl HullResult {
    /// The cleaned cloud, in input order. Normals carry over when present.
    #[must_use]
    pub const fn kept(&self) -> &PointSet {
        &self.kept
    }

    /// The points classified as outliers, in input order.
    #[must_use]
    pub const fn removed(&self) -> &PointSet {
        &self.removed
    }

    /// Input indices of the kept points, ascending.
    #[must_use]
    pub fn kept_indices(&self) -> &[usize] {
        &self.kept_indices
    }

    /// Input indices of the removed points, ascending.
    #[must_use]
    pub fn removed_indices(&self) -> &[usize] {
        &self.removed_indices
    }

    /// Number of passes that actually peeled a shell.
    #[must_use]
    pub const fn passes_completed(&self) -> usize {
        self.passes_completed
    }

    /// Consumes the result, returning `(kept, removed)`.
    #[must_use]
    pub fn into_point_sets(self) -> (PointSet, PointSet) {
        (self.kept, self.removed)
    }
}

// =============================================================================
// REMOVER
// =============================================================================

/// Classifies convex hull vertices as outliers.
///
/// # Policy
///
/// - A point is removed when its coordinate is bit-equal to the coordinate of
///   a hull vertex, so all copies of a duplicated spike go together.
/// - Pass 1 on degenerate input (fewer than four points, or no four affinely
///   independent points) fails with [`OutlierRemovalError::DegenerateInput`];
///   the remover never invents a partition.
/// - On later passes a degenerate remainder ends the peel early and the
///   partition from the previous pass is returned.
///
/// Which points on flat hull regions count as vertices follows the tie-break
/// rules documented on [`ConvexHull3`].
///
/// # Examples
///
/// ```rust
/// use hullclean::core::point_set::PointSet;
/// use hullclean::geometry::algorithms::outlier_removal::HullOutlierRemover;
///
/// let cloud = PointSet::new(vec![
///     [0.0, 0.0, 0.0],
///     [10.0, 0.0, 0.0],
///     [0.0, 10.0, 0.0],
///     [0.0, 0.0, 10.0],
///     [1.0, 1.0, 1.0],
///     [2.0, 1.0, 1.5],
/// ]);
///
/// let result = HullOutlierRemover::default().remove(&cloud).unwrap();
/// assert_eq!(result.removed_indices(), &[0, 1, 2, 3]);
/// assert_eq!(result.kept_indices(), &[4, 5]);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HullOutlierRemover {
    config: HullPeelConfig,
}

impl HullOutlierRemover {
    /// Creates a remover with the given peel configuration.
    #[must_use]
    pub const fn new(config: HullPeelConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &HullPeelConfig {
        &self.config
    }

    /// Partitions `cloud` into interior points and hull outliers.
    ///
    /// # Errors
    ///
    /// - [`OutlierRemovalError::InvalidConfig`] if `passes` is zero
    /// - [`OutlierRemovalError::DegenerateInput`] if the first pass cannot form a 3D hull
    /// - [`OutlierRemovalError::HullConstruction`] for non-finite coordinates
    pub fn remove(&self, cloud: &PointSet) -> Result<HullResult, OutlierRemovalError> {
        if self.config.passes == 0 {
            return Err(OutlierRemovalError::InvalidConfig {
                message: "passes must be at least 1".to_string(),
            });
        }

        let points = cloud.points();
        let mut kept_indices: Vec<usize> = (0..points.len()).collect();
        let mut is_removed = vec![false; points.len()];
        let mut passes_completed = 0;

        for pass in 1..=self.config.passes {
            let coords: Vec<[f64; 3]> = kept_indices.iter().map(|&i| points[i]).collect();
            let hull = match ConvexHull3::from_points(&coords) {
                Ok(hull) => hull,
                Err(err) => match OutlierRemovalError::from_hull(pass, err) {
                    OutlierRemovalError::DegenerateInput { source, .. } if pass > 1 => {
                        tracing::warn!(
                            pass,
                            remaining = coords.len(),
                            reason = %source,
                            "interior is degenerate; stopping hull peel early"
                        );
                        break;
                    }
                    err => return Err(err),
                },
            };

            let mut extremal: FastHashSet<[u64; 3]> =
                fast_hash_set_with_capacity(hull.vertex_count());
            extremal.extend(
                hull.vertex_indices()
                    .iter()
                    .map(|&v| coordinate_key(&coords[v])),
            );

            let (peeled, remaining): (Vec<usize>, Vec<usize>) = kept_indices
                .into_iter()
                .partition(|&i| extremal.contains(&coordinate_key(&points[i])));
            for &i in &peeled {
                is_removed[i] = true;
            }

            tracing::debug!(
                pass,
                hull_vertices = hull.vertex_count(),
                removed = peeled.len(),
                remaining = remaining.len(),
                "peeled hull shell"
            );
            kept_indices = remaining;
            passes_completed = pass;
        }

        let removed_indices: Vec<usize> = is_removed
            .iter()
            .enumerate()
            .filter_map(|(i, &removed)| removed.then_some(i))
            .collect();

        Ok(HullResult {
            kept: cloud.select(&kept_indices)?,
            removed: cloud.select(&removed_indices)?,
            kept_indices,
            removed_indices,
            passes_completed,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::algorithms::convex_hull::HullLocation;
    use crate::geometry::util::{generate_random_points_seeded, generate_spiked_cube_seeded};

    fn assert_partition(result: &HullResult, n: usize) {
        let mut all: Vec<usize> = result
            .kept_indices()
            .iter()
            .chain(result.removed_indices())
            .copied()
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..n).collect::<Vec<_>>());
        assert_eq!(result.kept().len(), result.kept_indices().len());
        assert_eq!(result.removed().len(), result.removed_indices().len());
    }

    #[test]
    fn test_spikes_are_removed() {
        let spiked = generate_spiked_cube_seeded(1000, 1.0, 10.0, 42).unwrap();
        let result = HullOutlierRemover::default().remove(&spiked.cloud).unwrap();

        assert_eq!(result.removed_indices(), spiked.spike_indices.as_slice());
        assert_eq!(result.kept().len(), 1000);
        assert_eq!(result.passes_completed(), 1);
        assert_partition(&result, 1008);
    }

    #[test]
    fn test_removed_on_boundary_and_kept_inside() {
        let points = generate_random_points_seeded(400, (-2.0, 2.0), 17).unwrap();
        let cloud = PointSet::new(points.clone());
        let result = HullOutlierRemover::default().remove(&cloud).unwrap();
        let hull = ConvexHull3::from_points(&points).unwrap();

        for &i in result.removed_indices() {
            assert_eq!(hull.locate(&points, &points[i]), HullLocation::Boundary);
        }
        for &i in result.kept_indices() {
            assert_eq!(hull.locate(&points, &points[i]), HullLocation::Inside);
        }
    }

    #[test]
    fn test_duplicate_spikes_removed_together() {
        let mut points = generate_random_points_seeded(50, (-1.0, 1.0), 8).unwrap();
        points.push([20.0, 0.1, 0.2]);
        points.push([20.0, 0.1, 0.2]);
        let result = HullOutlierRemover::default()
            .remove(&PointSet::new(points))
            .unwrap();

        assert!(result.removed_indices().contains(&50));
        assert!(result.removed_indices().contains(&51));
    }

    #[test]
    fn test_normals_follow_partition() {
        let spiked = generate_spiked_cube_seeded(30, 1.0, 5.0, 4).unwrap();
        let (points, _) = spiked.cloud.into_parts();
        let normals: Vec<[f64; 3]> = (0..points.len()).map(|i| [i as f64, 0.0, 0.0]).collect();
        let cloud = PointSet::with_normals(points, normals).unwrap();

        let result = HullOutlierRemover::default().remove(&cloud).unwrap();
        let kept_normals = result.kept().normals().unwrap();
        for (slot, &i) in result.kept_indices().iter().enumerate() {
            assert_eq!(kept_normals[slot][0], i as f64);
        }
    }

    #[test]
    fn test_degenerate_first_pass_fails() {
        let flat: Vec<[f64; 3]> = (0..16)
            .map(|i| [f64::from(i % 4), f64::from(i / 4), 0.0])
            .collect();
        let err = HullOutlierRemover::default()
            .remove(&PointSet::new(flat))
            .unwrap_err();
        assert!(matches!(
            err,
            OutlierRemovalError::DegenerateInput { pass: 1, .. }
        ));

        let err = HullOutlierRemover::default()
            .remove(&PointSet::default())
            .unwrap_err();
        assert!(matches!(
            err,
            OutlierRemovalError::DegenerateInput {
                pass: 1,
                source: ConvexHullConstructionError::InsufficientPoints { count: 0 }
            }
        ));
    }

    #[test]
    fn test_non_finite_is_not_degenerate() {
        let mut points = generate_random_points_seeded(10, (-1.0, 1.0), 1).unwrap();
        points[4] = [f64::NAN, 0.0, 0.0];
        let err = HullOutlierRemover::default()
            .remove(&PointSet::new(points))
            .unwrap_err();
        assert!(matches!(err, OutlierRemovalError::HullConstruction { pass: 1, .. }));
    }

    #[test]
    fn test_iterative_peeling_removes_more() {
        let cloud = PointSet::new(generate_random_points_seeded(500, (-1.0, 1.0), 23).unwrap());
        let single = HullOutlierRemover::default().remove(&cloud).unwrap();
        let triple = HullOutlierRemover::new(HullPeelConfig { passes: 3 })
            .remove(&cloud)
            .unwrap();

        assert_eq!(triple.passes_completed(), 3);
        assert!(triple.removed().len() > single.removed().len());
        for i in single.removed_indices() {
            assert!(triple.removed_indices().contains(i));
        }
        assert_partition(&triple, 500);
    }

    #[test]
    fn test_peeling_stops_when_interior_degenerates() {
        // Tetrahedron around a single interior point: pass 2 sees one point.
        let cloud = PointSet::new(vec![
            [0.0, 0.0, 0.0],
            [4.0, 0.0, 0.0],
            [0.0, 4.0, 0.0],
            [0.0, 0.0, 4.0],
            [0.5, 0.5, 0.5],
        ]);
        let result = HullOutlierRemover::new(HullPeelConfig { passes: 5 })
            .remove(&cloud)
            .unwrap();
        assert_eq!(result.passes_completed(), 1);
        assert_eq!(result.kept_indices(), &[4]);
    }

    #[test]
    fn test_zero_passes_rejected() {
        let err = HullOutlierRemover::new(HullPeelConfig { passes: 0 })
            .remove(&PointSet::default())
            .unwrap_err();
        assert!(matches!(err, OutlierRemovalError::InvalidConfig { .. }));
    }
}
