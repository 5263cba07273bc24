//! Two-sided nearest-neighbor evaluation shared by the quality metrics.
//!
//! A correspondence metric compares two clouds `A` and `B` in both
//! directions. For the direction `A → B` every (subsampled) point of `A` is
//! matched to its nearest point in `B` and scored; the direction value is the
//! mean score. The metric value is the mean of the two directions, which makes
//! it symmetric under swapping `A` and `B`.
//!
//! [`CorrespondenceMetric`] implements the shared steps once: preparing each
//! cloud, subsampling each cloud with its own generator seeded from the same
//! seed, indexing, and averaging. Implementors only define the per-match
//! score.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::point_set::{PointSet, PointSetError};
use crate::core::spatial_index::{Neighbor, SpatialIndex, SpatialIndexError};
use crate::core::subsample::{DEFAULT_SEED, Subsampler};

/// Default subsampling cap per cloud.
pub const DEFAULT_MAX_POINTS: usize = 10_000;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised while computing a correspondence metric.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MetricError {
    /// A spatial index could not be built. An empty cloud, or a cap of zero
    /// points, surfaces here as [`SpatialIndexError::EmptyIndex`].
    #[error(transparent)]
    SpatialIndex(#[from] SpatialIndexError),
    /// The two sampled clouds cannot be paired index by index.
    #[error("{metric}: cannot pair {query} query points with {reference} reference points")]
    ShapeMismatch {
        /// Metric that rejected the pairing.
        metric: &'static str,
        /// Number of sampled query points.
        query: usize,
        /// Number of sampled reference points.
        reference: usize,
    },
    /// The metric needs normals and the prepared cloud has none.
    #[error("{metric} requires normals")]
    MissingNormals {
        /// Metric that needed the normals.
        metric: &'static str,
    },
    /// A match produced a NaN or infinite score.
    #[error("{metric}: non-finite score for sampled query point {index}")]
    NonFiniteScore {
        /// Metric that produced the score.
        metric: &'static str,
        /// Position of the query point in its sample.
        index: usize,
    },
    /// Building a sampled point set failed.
    #[error(transparent)]
    PointSet(#[from] PointSetError),
}

impl MetricError {
    /// Whether this error means one of the clouds had nothing to index.
    #[must_use]
    pub const fn is_empty_index(&self) -> bool {
        matches!(self, Self::SpatialIndex(SpatialIndexError::EmptyIndex))
    }
}

// =============================================================================
// CONFIGURATION AND RESULT
// =============================================================================

/// Sampling configuration shared by all correspondence metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrespondenceConfig {
    /// Maximum number of points taken from each cloud.
    pub max_points: usize,
    /// Seed for the subsampling generator.
    pub seed: u64,
}

impl Default for CorrespondenceConfig {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS,
            seed: DEFAULT_SEED,
        }
    }
}

/// Directional and combined values of a correspondence metric.
///
/// `combined` is always `(a_to_b + b_to_a) / 2`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricResult {
    a_to_b: f64,
    b_to_a: f64,
    combined: f64,
}

impl MetricResult {
    /// Combines two directional values.
    #[must_use]
    pub fn new(a_to_b: f64, b_to_a: f64) -> Self {
        Self {
            a_to_b,
            b_to_a,
            combined: (a_to_b + b_to_a) / 2.0,
        }
    }

    /// Mean score of `A`'s points matched into `B`.
    #[must_use]
    pub const fn a_to_b(&self) -> f64 {
        self.a_to_b
    }

    /// Mean score of `B`'s points matched into `A`.
    #[must_use]
    pub const fn b_to_a(&self) -> f64 {
        self.b_to_a
    }

    /// Mean of the two directions.
    #[must_use]
    pub const fn combined(&self) -> f64 {
        self.combined
    }
}

// =============================================================================
// METRIC TRAIT
// =============================================================================

/// A symmetric metric built on nearest-neighbor correspondence.
///
/// Implementors provide [`score`](Self::score); the two-sided evaluation in
/// [`compute`](Self::compute) is shared. The search is purely positional.
pub trait CorrespondenceMetric: Sync {
    /// Human-readable metric name, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Sampling configuration.
    fn config(&self) -> &CorrespondenceConfig;

    /// Brings a full cloud into the form the metric needs before sampling.
    ///
    /// # Errors
    ///
    /// Implementation-defined; the default borrows the cloud unchanged.
    fn prepare<'a>(&self, cloud: &'a PointSet) -> Result<Cow<'a, PointSet>, MetricError> {
        Ok(Cow::Borrowed(cloud))
    }

    /// Validates that two sampled clouds can be scored against each other.
    ///
    /// # Errors
    ///
    /// Implementation-defined; the default accepts any pair.
    fn check_pairing(&self, _a: &PointSet, _b: &PointSet) -> Result<(), MetricError> {
        Ok(())
    }

    /// Scores query point `query_index` against its nearest reference point.
    ///
    /// # Errors
    ///
    /// Implementation-defined, for example missing normals.
    fn score(
        &self,
        query: &PointSet,
        query_index: usize,
        reference: &PointSet,
        neighbor: &Neighbor,
    ) -> Result<f64, MetricError>;

    /// Mean score of every `query` point matched into `reference`.
    ///
    /// # Errors
    ///
    /// - [`MetricError::SpatialIndex`] if `reference` is empty or non-finite,
    ///   or `query` is empty
    /// - any error from [`score`](Self::score)
    fn directional(&self, query: &PointSet, reference: &PointSet) -> Result<f64, MetricError> {
        let index = SpatialIndex::build(reference.points())?;
        if query.is_empty() {
            return Err(SpatialIndexError::EmptyIndex.into());
        }
        let matches = index.query(query.points());
        let total = matches
            .iter()
            .enumerate()
            .map(|(qi, neighbor)| self.score(query, qi, reference, neighbor))
            .sum::<Result<f64, MetricError>>()?;
        #[allow(clippy::cast_precision_loss)]
        Ok(total / matches.len() as f64)
    }

    /// Evaluates the metric between `a` and `b`.
    ///
    /// Each cloud is prepared, then subsampled to at most `max_points` with a
    /// generator seeded from the configured seed, then matched in both
    /// directions. Identical inputs and seed give bit-identical results, and
    /// swapping `a` and `b` swaps the directions but leaves `combined`
    /// unchanged.
    ///
    /// # Errors
    ///
    /// - [`MetricError::SpatialIndex`] with [`SpatialIndexError::EmptyIndex`]
    ///   if either sampled cloud is empty (including `max_points == 0`)
    /// - [`MetricError::ShapeMismatch`] if [`check_pairing`](Self::check_pairing) rejects the samples
    /// - any error from [`prepare`](Self::prepare) or [`score`](Self::score)
    fn compute(&self, a: &PointSet, b: &PointSet) -> Result<MetricResult, MetricError> {
        let config = self.config();
        let sampler = Subsampler::new(config.seed);

        let a = sampler.subsample_set(&*self.prepare(a)?, config.max_points)?;
        let b = sampler.subsample_set(&*self.prepare(b)?, config.max_points)?;
        if a.is_empty() || b.is_empty() {
            return Err(SpatialIndexError::EmptyIndex.into());
        }
        self.check_pairing(&a, &b)?;

        #[cfg(feature = "parallel")]
        let (a_to_b, b_to_a) = rayon::join(|| self.directional(&a, &b), || self.directional(&b, &a));
        #[cfg(not(feature = "parallel"))]
        let (a_to_b, b_to_a) = (self.directional(&a, &b), self.directional(&b, &a));

        let result = MetricResult::new(a_to_b?, b_to_a?);
        tracing::debug!(
            metric = self.name(),
            sampled_a = a.len(),
            sampled_b = b.len(),
            a_to_b = result.a_to_b(),
            b_to_a = result.b_to_a(),
            combined = result.combined(),
            "computed correspondence metric"
        );
        Ok(result)
    }
}
