//! Deterministic, seeded subsampling.
//!
//! Metric cost grows with cloud size, so each metric caps the number of
//! points it processes. [`Subsampler`] draws that cap uniformly without
//! replacement from an explicit seed; the same seed and input always select
//! the same indices.

use rand::SeedableRng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::point_set::{PointSet, PointSetError};

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 42;

/// Seeded index sampler.
///
/// Every call starts a fresh generator from the stored seed, so sampling two
/// sets of equal length yields the same index selection for both.
///
/// # Examples
///
/// ```rust
/// use hullclean::core::subsample::Subsampler;
///
/// let sampler = Subsampler::default();
///
/// // At or under the cap: identity.
/// assert_eq!(sampler.subsample(4, 10), vec![0, 1, 2, 3]);
///
/// // Over the cap: `max_points` distinct indices, reproducibly.
/// let picked = sampler.subsample(1000, 25);
/// assert_eq!(picked.len(), 25);
/// assert_eq!(picked, sampler.subsample(1000, 25));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subsampler {
    seed: u64,
}

impl Default for Subsampler {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl Subsampler {
    /// Creates a sampler with the given seed.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// The configured seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Selects at most `max_points` of the indices `0..len`.
    ///
    /// If `len <= max_points` every index is returned in order. Otherwise
    /// `max_points` distinct indices are drawn uniformly at random and
    /// returned in ascending order.
    #[must_use]
    pub fn subsample(&self, len: usize, max_points: usize) -> Vec<usize> {
        if len <= max_points {
            return (0..len).collect();
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut picked = index::sample(&mut rng, len, max_points).into_vec();
        picked.sort_unstable();
        tracing::debug!(len, max_points, seed = self.seed, "subsampled indices");
        picked
    }

    /// Subsamples a point set, keeping normals aligned with their points.
    ///
    /// # Errors
    ///
    /// Propagates [`PointSetError`] from [`PointSet::select`]; the indices
    /// are always in range, so this does not fail in practice.
    pub fn subsample_set(
        &self,
        cloud: &PointSet,
        max_points: usize,
    ) -> Result<PointSet, PointSetError> {
        if cloud.len() <= max_points {
            return Ok(cloud.clone());
        }
        cloud.select(&self.subsample(cloud.len(), max_points))
    }
}
