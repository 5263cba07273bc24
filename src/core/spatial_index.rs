//! Nearest-neighbor queries over a fixed point snapshot.
//!
//! [`SpatialIndex`] wraps an immutable k-d tree built once from a slice of
//! coordinates. Neighbor indices refer to positions in that slice; the index
//! owns its own copy of the tree, so later changes to the source points are
//! not reflected and require a new index.
//!
//! Scanned clouds routinely repeat coordinates. The tree only ever holds one
//! entry per distinct coordinate, and every entry remembers the slice
//! positions that share it (ascending). A nearest-neighbor match reports the
//! lowest of those positions.

use kiddo::SquaredEuclidean;
use kiddo::immutable::float::kdtree::ImmutableKdTree;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::collections::{FastHashMap, fast_hash_map_with_capacity};
use crate::geometry::util::coordinate_key;

/// Leaf bucket size of the k-d tree.
///
/// Larger than kiddo's default because scanned clouds are often locally
/// planar, which puts many points on the same splitting coordinate.
const BUCKET_SIZE: usize = 256;

/// Errors that can occur when building a spatial index.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SpatialIndexError {
    /// The index would contain no points, so no query could be answered.
    #[error("Cannot build a spatial index over zero points")]
    EmptyIndex,
    /// A coordinate is NaN or infinite.
    #[error("Point {index} has a non-finite coordinate")]
    NonFiniteCoordinate {
        /// Index of the offending point.
        index: usize,
    },
}

/// The nearest indexed point for a query, and its Euclidean distance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    /// Position of the neighbor in the indexed snapshot.
    pub index: usize,
    /// Euclidean (not squared) distance to the query point.
    pub distance: f64,
}

/// Immutable nearest-neighbor index over a 3D point snapshot.
///
/// # Examples
///
/// ```rust
/// use hullclean::core::spatial_index::SpatialIndex;
///
/// let index = SpatialIndex::build(&[[0.0, 0.0, 0.0], [10.0, 0.0, 0.0]]).unwrap();
/// let matches = index.query(&[[1.0, 0.0, 0.0], [7.0, 0.0, 0.0]]);
///
/// assert_eq!(matches[0].index, 0);
/// assert_eq!(matches[1].index, 1);
/// assert_eq!(matches[1].distance, 3.0);
/// ```
pub struct SpatialIndex {
    /// One item per distinct coordinate; the item is its group number.
    tree: ImmutableKdTree<f64, u64, 3, BUCKET_SIZE>,
    /// Group `g` owns `members[offsets[g]..offsets[g + 1]]`.
    offsets: Vec<usize>,
    /// Slice positions grouped by coordinate, ascending within each group.
    members: Vec<usize>,
}

impl std::fmt::Debug for SpatialIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialIndex")
            .field("len", &self.len())
            .field("distinct", &self.distinct_len())
            .finish()
    }
}

impl SpatialIndex {
    /// Builds an index over `points`.
    ///
    /// # Errors
    ///
    /// - [`SpatialIndexError::EmptyIndex`] if `points` is empty
    /// - [`SpatialIndexError::NonFiniteCoordinate`] if any coordinate is NaN or infinite
    pub fn build(points: &[[f64; 3]]) -> Result<Self, SpatialIndexError> {
        if points.is_empty() {
            return Err(SpatialIndexError::EmptyIndex);
        }
        if let Some(index) = points
            .iter()
            .position(|p| !p.iter().all(|c| c.is_finite()))
        {
            return Err(SpatialIndexError::NonFiniteCoordinate { index });
        }

        // The k-d tree cannot split a bucket whose points all coincide, so
        // repeated coordinates are collapsed into groups first.
        let mut groups: FastHashMap<[u64; 3], usize> = fast_hash_map_with_capacity(points.len());
        let mut distinct: Vec<[f64; 3]> = Vec::new();
        let group_of: Vec<usize> = points
            .iter()
            .map(|p| {
                *groups.entry(coordinate_key(p)).or_insert_with(|| {
                    distinct.push(*p);
                    distinct.len() - 1
                })
            })
            .collect();

        let mut offsets = vec![0_usize; distinct.len() + 1];
        for &g in &group_of {
            offsets[g + 1] += 1;
        }
        for g in 1..offsets.len() {
            offsets[g] += offsets[g - 1];
        }
        let mut cursor = offsets.clone();
        let mut members = vec![0_usize; points.len()];
        for (i, &g) in group_of.iter().enumerate() {
            members[cursor[g]] = i;
            cursor[g] += 1;
        }

        let tree: ImmutableKdTree<f64, u64, 3, BUCKET_SIZE> = distinct.as_slice().into();
        tracing::debug!(
            points = points.len(),
            distinct = distinct.len(),
            "built spatial index"
        );
        Ok(Self {
            tree,
            offsets,
            members,
        })
    }

    /// Number of indexed points, duplicates included; always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always `false`: an index cannot be built over zero points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of distinct coordinates held by the tree.
    #[must_use]
    pub fn distinct_len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn group(&self, item: u64) -> &[usize] {
        let g = item_index(item);
        &self.members[self.offsets[g]..self.offsets[g + 1]]
    }

    /// The nearest indexed point to `point`.
    ///
    /// When several indexed points share the nearest coordinate, the lowest
    /// slice position is reported.
    #[must_use]
    pub fn nearest(&self, point: &[f64; 3]) -> Neighbor {
        let nn = self.tree.nearest_one::<SquaredEuclidean>(point);
        let g = item_index(nn.item);
        Neighbor {
            index: self.members[self.offsets[g]],
            distance: nn.distance.sqrt(),
        }
    }

    /// Batched k = 1 query: the nearest indexed point for every query point,
    /// in query order.
    #[must_use]
    pub fn query(&self, points: &[[f64; 3]]) -> Vec<Neighbor> {
        points.iter().map(|p| self.nearest(p)).collect()
    }

    /// Hybrid radius / k-nearest search.
    ///
    /// Returns the indexed points within `radius` of `point` (inclusive),
    /// nearest first, keeping at most `max_neighbors` of them. A query point
    /// that is itself indexed is part of its own neighborhood.
    #[must_use]
    pub fn within(&self, point: &[f64; 3], radius: f64, max_neighbors: usize) -> Vec<Neighbor> {
        if max_neighbors == 0 || radius.is_nan() || radius < 0.0 {
            return Vec::new();
        }
        let found = self
            .tree
            .within::<SquaredEuclidean>(point, radius * radius);
        found
            .into_iter()
            .flat_map(|nn| {
                let distance = nn.distance.sqrt();
                self.group(nn.item)
                    .iter()
                    .map(move |&index| Neighbor { index, distance })
            })
            .take(max_neighbors)
            .collect()
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn item_index(item: u64) -> usize {
    // Items are group numbers, which fit in usize.
    item as usize
}
