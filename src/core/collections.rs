//! Hash collection aliases used by the geometry code.
//!
//! Hull construction keys its edge table by vertex-index pairs and the outlier
//! remover deduplicates coordinates by their bit patterns. Neither needs a
//! DoS-resistant hasher, so both use `rustc_hash`.

use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};

/// Optimized `HashMap` type for performance-critical operations.
///
/// # Examples
///
/// ```rust
/// use hullclean::core::collections::FastHashMap;
///
/// let mut edges: FastHashMap<(usize, usize), usize> = FastHashMap::default();
/// edges.insert((0, 1), 7);
/// assert_eq!(edges.get(&(0, 1)), Some(&7));
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Optimized `HashSet` type for performance-critical operations.
pub type FastHashSet<T> = FxHashSet<T>;

/// Build hasher shared by [`FastHashMap`] and [`FastHashSet`].
pub type FastBuildHasher = FxBuildHasher;

/// Creates a [`FastHashMap`] with at least the given capacity.
#[must_use]
pub fn fast_hash_map_with_capacity<K, V>(capacity: usize) -> FastHashMap<K, V> {
    FastHashMap::with_capacity_and_hasher(capacity, FastBuildHasher::default())
}

/// Creates a [`FastHashSet`] with at least the given capacity.
#[must_use]
pub fn fast_hash_set_with_capacity<T>(capacity: usize) -> FastHashSet<T> {
    FastHashSet::with_capacity_and_hasher(capacity, FastBuildHasher::default())
}
