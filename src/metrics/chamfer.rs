//! Chamfer distance between two point clouds.

use crate::core::point_set::PointSet;
use crate::core::spatial_index::Neighbor;
use crate::metrics::correspondence::{CorrespondenceConfig, CorrespondenceMetric, MetricError};

/// Mean nearest-neighbor distance, averaged over both directions.
///
/// All values are non-negative. `combined` is zero exactly when every
/// sampled point of each cloud coincides with a point of the other.
///
/// # Examples
///
/// ```rust
/// use hullclean::core::point_set::PointSet;
/// use hullclean::metrics::chamfer::ChamferDistance;
/// use hullclean::metrics::correspondence::CorrespondenceMetric;
///
/// let a = PointSet::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
/// let b = PointSet::new(vec![[0.0, 0.0, 0.0]]);
///
/// let result = ChamferDistance::default().compute(&a, &b).unwrap();
/// assert_eq!(result.a_to_b(), 0.5);
/// assert_eq!(result.b_to_a(), 0.0);
/// assert_eq!(result.combined(), 0.25);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChamferDistance {
    config: CorrespondenceConfig,
}

impl ChamferDistance {
    /// Creates the metric with the given sampling configuration.
    #[must_use]
    pub const fn new(config: CorrespondenceConfig) -> Self {
        Self { config }
    }
}

impl CorrespondenceMetric for ChamferDistance {
    fn name(&self) -> &'static str {
        "chamfer_distance"
    }

    fn config(&self) -> &CorrespondenceConfig {
        &self.config
    }

    fn score(
        &self,
        _query: &PointSet,
        _query_index: usize,
        _reference: &PointSet,
        neighbor: &Neighbor,
    ) -> Result<f64, MetricError> {
        Ok(neighbor.distance)
    }
}
