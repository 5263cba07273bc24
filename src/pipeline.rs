//! End-to-end evaluation of hull-based outlier removal.
//!
//! [`evaluate`] peels the raw cloud's hull, then measures how far the cleaned
//! cloud drifts from the raw one with both correspondence metrics. Each metric
//! keeps its own outcome so a failure in one never masks, or zeroes, the other.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::point_set::PointSet;
use crate::core::subsample::DEFAULT_SEED;
use crate::geometry::algorithms::outlier_removal::{
    HullOutlierRemover, HullPeelConfig, HullResult, OutlierRemovalError,
};
use crate::geometry::normals::NormalSearchParams;
use crate::metrics::chamfer::ChamferDistance;
use crate::metrics::correspondence::{
    CorrespondenceConfig, CorrespondenceMetric, DEFAULT_MAX_POINTS, MetricError, MetricResult,
};
use crate::metrics::normal_consistency::{NormalConsistency, NormalPairing};
use crate::report::ReportRecord;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that abort an evaluation or its report.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EvaluationError {
    /// Outlier removal failed, so there is nothing to compare.
    #[error("Outlier removal failed: {0}")]
    OutlierRemoval(#[from] OutlierRemovalError),
    /// A metric could not be computed.
    #[error("Metric {metric} failed: {source}")]
    MetricFailed {
        /// Name of the failing metric.
        metric: &'static str,
        /// Why it failed.
        #[source]
        source: MetricError,
    },
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Settings for a full evaluation run.
///
/// # Examples
///
/// ```rust
/// use hullclean::pipeline::EvaluationConfigBuilder;
///
/// let config = EvaluationConfigBuilder::default()
///     .max_points(5_000)
///     .passes(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.correspondence().max_points, 5_000);
/// assert_eq!(config.correspondence().seed, 42);
///
/// assert!(EvaluationConfigBuilder::default().passes(0).build().is_err());
/// ```
#[derive(Builder, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct EvaluationConfig {
    /// Subsampling cap per cloud for each metric.
    #[builder(default = "DEFAULT_MAX_POINTS")]
    pub max_points: usize,
    /// Subsampling seed.
    #[builder(default = "DEFAULT_SEED")]
    pub seed: u64,
    /// Number of hull peeling passes.
    #[builder(default = "1")]
    pub passes: usize,
    /// Neighborhood radius for normal estimation.
    #[builder(default = "0.1")]
    pub normal_radius: f64,
    /// Neighbor cap for normal estimation.
    #[builder(default = "30")]
    pub normal_max_neighbors: usize,
    /// Which normals normal consistency compares.
    #[builder(default)]
    pub normal_pairing: NormalPairing,
}

impl EvaluationConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if self.passes == Some(0) {
            return Err("passes must be at least 1".to_string());
        }
        if let Some(radius) = self.normal_radius {
            if !(radius.is_finite() && radius > 0.0) {
                return Err(format!("normal_radius must be positive and finite, got {radius}"));
            }
        }
        if self.normal_max_neighbors == Some(0) {
            return Err("normal_max_neighbors must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS,
            seed: DEFAULT_SEED,
            passes: 1,
            normal_radius: 0.1,
            normal_max_neighbors: 30,
            normal_pairing: NormalPairing::default(),
        }
    }
}

impl EvaluationConfig {
    /// Sampling settings for the metrics.
    #[must_use]
    pub const fn correspondence(&self) -> CorrespondenceConfig {
        CorrespondenceConfig {
            max_points: self.max_points,
            seed: self.seed,
        }
    }

    /// Normal estimation settings.
    #[must_use]
    pub const fn normal_search(&self) -> NormalSearchParams {
        NormalSearchParams {
            radius: self.normal_radius,
            max_neighbors: self.normal_max_neighbors,
        }
    }

    /// Hull peeling settings.
    #[must_use]
    pub const fn peel(&self) -> HullPeelConfig {
        HullPeelConfig {
            passes: self.passes,
        }
    }
}

// =============================================================================
// EVALUATION
// =============================================================================

/// Outcome of one evaluation run.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// Number of points in the raw cloud.
    pub original_size: usize,
    /// Partition produced by outlier removal.
    pub hull: HullResult,
    /// Chamfer distance between the raw and cleaned clouds.
    pub chamfer: Result<MetricResult, MetricError>,
    /// Normal consistency between the raw and cleaned clouds.
    pub normal_consistency: Result<MetricResult, MetricError>,
}

impl Evaluation {
    /// The metrics that failed, by name.
    #[must_use]
    pub fn failures(&self) -> Vec<(&'static str, &MetricError)> {
        [
            (ChamferDistance::default().name(), &self.chamfer),
            (NormalConsistency::default().name(), &self.normal_consistency),
        ]
        .into_iter()
        .filter_map(|(name, outcome)| outcome.as_ref().err().map(|err| (name, err)))
        .collect()
    }

    /// Summarizes the run for the CSV report.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::MetricFailed`] naming the first failed
    /// metric; a failed metric is never reported as a number.
    pub fn report_record(&self) -> Result<ReportRecord, EvaluationError> {
        let failed = |metric: &'static str, source: &MetricError| EvaluationError::MetricFailed {
            metric,
            source: source.clone(),
        };
        match (&self.chamfer, &self.normal_consistency) {
            (Ok(chamfer), Ok(normal_consistency)) => Ok(ReportRecord {
                original_size: self.original_size,
                hull_size: self.hull.kept().len(),
                chamfer_distance: chamfer.combined(),
                normal_consistency: normal_consistency.combined(),
            }),
            (Err(err), _) => Err(failed(ChamferDistance::default().name(), err)),
            (_, Err(err)) => Err(failed(NormalConsistency::default().name(), err)),
        }
    }
}

/// Removes hull outliers from `raw` and scores the cleaned cloud against it.
///
/// # Errors
///
/// Returns [`EvaluationError::OutlierRemoval`] if the hull cannot be peeled.
/// Metric failures do not fail the call; they are recorded in the returned
/// [`Evaluation`].
///
/// # Examples
///
/// ```rust
/// use hullclean::geometry::util::generate_spiked_cube_seeded;
/// use hullclean::pipeline::{EvaluationConfig, evaluate};
///
/// let spiked = generate_spiked_cube_seeded(200, 1.0, 10.0, 42).unwrap();
/// let evaluation = evaluate(&spiked.cloud, &EvaluationConfig::default()).unwrap();
///
/// let record = evaluation.report_record().unwrap();
/// assert_eq!(record.original_size, 208);
/// assert_eq!(record.hull_size, 200);
/// assert!(record.chamfer_distance > 0.0);
/// ```
pub fn evaluate(raw: &PointSet, config: &EvaluationConfig) -> Result<Evaluation, EvaluationError> {
    let hull = HullOutlierRemover::new(config.peel()).remove(raw)?;
    tracing::info!(
        original = raw.len(),
        kept = hull.kept().len(),
        removed = hull.removed().len(),
        "removed hull outliers"
    );

    let chamfer_metric = ChamferDistance::new(config.correspondence());
    let normal_metric = NormalConsistency::new(config.correspondence(), config.normal_search())
        .with_pairing(config.normal_pairing);
    let clean = hull.kept();

    #[cfg(feature = "parallel")]
    let (chamfer, normal_consistency) = rayon::join(
        || chamfer_metric.compute(raw, clean),
        || normal_metric.compute(raw, clean),
    );
    #[cfg(not(feature = "parallel"))]
    let (chamfer, normal_consistency) = (
        chamfer_metric.compute(raw, clean),
        normal_metric.compute(raw, clean),
    );

    for (name, outcome) in [
        (chamfer_metric.name(), &chamfer),
        (normal_metric.name(), &normal_consistency),
    ] {
        match outcome {
            Ok(result) => tracing::info!(
                metric = name,
                raw_to_clean = result.a_to_b(),
                clean_to_raw = result.b_to_a(),
                combined = result.combined(),
                "computed metric"
            ),
            Err(err) => tracing::warn!(metric = name, error = %err, "metric failed"),
        }
    }

    Ok(Evaluation {
        original_size: raw.len(),
        hull,
        chamfer,
        normal_consistency,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spatial_index::SpatialIndexError;
    use crate::geometry::util::{generate_random_points_seeded, generate_spiked_cube_seeded};

    #[test]
    fn test_builder_defaults_match_default() {
        let built = EvaluationConfigBuilder::default().build().unwrap();
        assert_eq!(built, EvaluationConfig::default());
        assert_eq!(built.normal_search(), NormalSearchParams::default());
        assert_eq!(built.peel(), HullPeelConfig::default());
        assert_eq!(built.correspondence(), CorrespondenceConfig::default());
    }

    #[test]
    fn test_builder_validation() {
        assert!(EvaluationConfigBuilder::default().normal_radius(0.0).build().is_err());
        assert!(EvaluationConfigBuilder::default().normal_radius(f64::NAN).build().is_err());
        assert!(EvaluationConfigBuilder::default().normal_max_neighbors(0).build().is_err());
        assert!(EvaluationConfigBuilder::default().max_points(0).build().is_ok());
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = EvaluationConfigBuilder::default()
            .passes(2)
            .normal_pairing(NormalPairing::SelfIndexed)
            .build()
            .unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let back: EvaluationConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_spiked_cloud_evaluation() {
        let spiked = generate_spiked_cube_seeded(300, 1.0, 10.0, 3).unwrap();
        let evaluation = evaluate(&spiked.cloud, &EvaluationConfig::default()).unwrap();

        assert_eq!(evaluation.hull.removed_indices(), spiked.spike_indices.as_slice());
        assert!(evaluation.failures().is_empty());
        let record = evaluation.report_record().unwrap();
        assert_eq!(record.hull_size, 300);
        assert!((0.0..=1.0).contains(&record.normal_consistency));
    }

    #[test]
    fn test_metric_failure_is_reported_not_zeroed() {
        let cloud = PointSet::new(generate_random_points_seeded(100, (-1.0, 1.0), 2).unwrap());
        let config = EvaluationConfigBuilder::default().max_points(0).build().unwrap();
        let evaluation = evaluate(&cloud, &config).unwrap();

        assert_eq!(evaluation.failures().len(), 2);
        assert_eq!(
            evaluation.report_record(),
            Err(EvaluationError::MetricFailed {
                metric: "chamfer_distance",
                source: MetricError::SpatialIndex(SpatialIndexError::EmptyIndex),
            })
        );
    }

    #[test]
    fn test_degenerate_cloud_aborts() {
        let flat: Vec<[f64; 3]> = (0..20).map(|i| [f64::from(i), f64::from(i * i), 0.0]).collect();
        let err = evaluate(&PointSet::new(flat), &EvaluationConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::OutlierRemoval(OutlierRemovalError::DegenerateInput { pass: 1, .. })
        ));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let cloud = PointSet::new(generate_random_points_seeded(2_000, (-1.0, 1.0), 8).unwrap());
        let config = EvaluationConfigBuilder::default().max_points(500).build().unwrap();
        let first = evaluate(&cloud, &config).unwrap();
        let second = evaluate(&cloud, &config).unwrap();
        assert_eq!(first, second);
    }
}
