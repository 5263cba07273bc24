//! Seeded point cloud generators.
//!
//! These produce reproducible synthetic clouds for tests, benchmarks and
//! documentation examples: uniform boxes, unit-sphere samples with analytic
//! normals, and a box of interior points surrounded by far-away spikes.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::core::point_set::PointSet;

/// Errors from the synthetic cloud generators.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RandomPointGenerationError {
    /// The sampling range is empty or not finite.
    #[error("Invalid range: min ({min}) must be finite and strictly less than max ({max})")]
    InvalidRange {
        /// Lower bound that was supplied.
        min: f64,
        /// Upper bound that was supplied.
        max: f64,
    },
    /// The spikes would not lie outside the interior box.
    #[error(
        "Spike distance {spike_distance} must exceed the interior half extent {half_extent}"
    )]
    SpikesInsideBox {
        /// Half edge length of the interior box.
        half_extent: f64,
        /// Distance of the spikes from the origin along each axis.
        spike_distance: f64,
    },
}

/// Generate `n_points` uniformly distributed points in `[min, max)^3`.
///
/// The same seed always yields the same points.
///
/// # Errors
///
/// Returns [`RandomPointGenerationError::InvalidRange`] if `min >= max` or either bound
/// is not finite.
///
/// # Examples
///
/// ```
/// use hullclean::geometry::util::generate_random_points_seeded;
///
/// let a = generate_random_points_seeded(100, (-5.0, 5.0), 42).unwrap();
/// let b = generate_random_points_seeded(100, (-5.0, 5.0), 42).unwrap();
/// assert_eq!(a, b);
///
/// let c = generate_random_points_seeded(100, (-5.0, 5.0), 123).unwrap();
/// assert_ne!(a, c);
/// ```
pub fn generate_random_points_seeded(
    n_points: usize,
    range: (f64, f64),
    seed: u64,
) -> Result<Vec<[f64; 3]>, RandomPointGenerationError> {
    let (min, max) = range;
    if !(min.is_finite() && max.is_finite() && min < max) {
        return Err(RandomPointGenerationError::InvalidRange { min, max });
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Ok((0..n_points)
        .map(|_| [0.0; 3].map(|_: f64| rng.random_range(min..max)))
        .collect())
}

/// Sample `n_points` on the unit sphere with their exact outward normals.
///
/// Points are drawn uniformly by area (uniform height and azimuth), so each
/// normal equals its point.
///
/// # Examples
///
/// ```
/// use hullclean::geometry::util::generate_unit_sphere_seeded;
///
/// let sphere = generate_unit_sphere_seeded(500, 7);
/// assert_eq!(sphere.len(), 500);
/// assert_eq!(sphere.points(), sphere.normals().unwrap());
/// ```
#[must_use]
pub fn generate_unit_sphere_seeded(n_points: usize, seed: u64) -> PointSet {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let points: Vec<[f64; 3]> = (0..n_points)
        .map(|_| {
            let z: f64 = rng.random_range(-1.0..1.0);
            let theta: f64 = rng.random_range(0.0..std::f64::consts::TAU);
            let r = (1.0 - z * z).max(0.0).sqrt();
            [r * theta.cos(), r * theta.sin(), z]
        })
        .collect();
    let normals = points.clone();
    // Both vectors have the same length by construction.
    PointSet::with_normals(points, normals).unwrap_or_default()
}

/// A cloud of interior points with spikes placed near the eight box corners.
#[derive(Clone, Debug)]
pub struct SpikedCloud {
    /// Interior points first, spikes last.
    pub cloud: PointSet,
    /// Indices of the spike points within `cloud`.
    pub spike_indices: Vec<usize>,
}

/// Generate `n_interior` points in `[-half_extent, half_extent)^3` plus eight
/// spikes near `(±spike_distance, ±spike_distance, ±spike_distance)`.
///
/// Each spike coordinate is jittered by up to 1% so that the spikes are in
/// general position.
///
/// # Errors
///
/// Returns [`RandomPointGenerationError::SpikesInsideBox`] unless
/// `spike_distance * 0.99 > half_extent`, and
/// [`RandomPointGenerationError::InvalidRange`] for a non-positive extent.
///
/// # Examples
///
/// ```
/// use hullclean::geometry::util::generate_spiked_cube_seeded;
///
/// let spiked = generate_spiked_cube_seeded(1000, 1.0, 10.0, 42).unwrap();
/// assert_eq!(spiked.cloud.len(), 1008);
/// assert_eq!(spiked.spike_indices, (1000..1008).collect::<Vec<_>>());
/// ```
pub fn generate_spiked_cube_seeded(
    n_interior: usize,
    half_extent: f64,
    spike_distance: f64,
    seed: u64,
) -> Result<SpikedCloud, RandomPointGenerationError> {
    if spike_distance * 0.99 <= half_extent {
        return Err(RandomPointGenerationError::SpikesInsideBox {
            half_extent,
            spike_distance,
        });
    }

    let mut points = generate_random_points_seeded(n_interior, (-half_extent, half_extent), seed)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));

    for corner in 0..8_u8 {
        let spike = [0_u8, 1, 2].map(|axis| {
            let sign = if corner & (1 << axis) == 0 { -1.0 } else { 1.0 };
            let jitter: f64 = rng.random_range(-0.01..0.01);
            sign * spike_distance * (1.0 + jitter)
        });
        points.push(spike);
    }

    Ok(SpikedCloud {
        spike_indices: (n_interior..n_interior + 8).collect(),
        cloud: PointSet::new(points),
    })
}
