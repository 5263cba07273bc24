//! # hullclean
//!
//! Convex-hull outlier removal for 3D point clouds, and the metrics that judge
//! how much a cleaning step changed the cloud.
//!
//! # Features
//!
//! - Exact-predicate 3D convex hull (quickhull on `robust::orient3d`)
//! - Hull-vertex outlier peeling, single pass or iterative
//! - Immutable k-d tree nearest-neighbor index (via `kiddo`)
//! - Deterministic seeded subsampling
//! - PCA normal estimation with hybrid radius / k-nearest neighborhoods
//! - Chamfer distance and normal consistency on a shared two-sided
//!   correspondence engine
//! - ASCII PLY and XYZ input/output, CSV reports, and a command-line driver
//! - Serialization/Deserialization of configs and point sets with [serde](https://serde.rs)
//!
//! # Basic Usage
//!
//! ```rust
//! use hullclean::prelude::*;
//!
//! // 1000 points in a unit box plus 8 far-away spikes.
//! let spiked = generate_spiked_cube_seeded(1000, 1.0, 10.0, 42).unwrap();
//!
//! let result = HullOutlierRemover::default().remove(&spiked.cloud).unwrap();
//! assert_eq!(result.removed_indices(), spiked.spike_indices.as_slice());
//! assert_eq!(result.kept().len(), 1000);
//!
//! // Positional drift between the raw and the cleaned cloud.
//! let chamfer = ChamferDistance::default()
//!     .compute(&spiked.cloud, result.kept())
//!     .unwrap();
//! assert!(chamfer.combined() > 0.0);
//! assert_eq!(chamfer.b_to_a(), 0.0); // every kept point is a raw point
//! ```
//!
//! # Outlier Policy
//!
//! Every point whose coordinate is a vertex of the cloud's convex hull is
//! treated as an outlier; everything else is kept. This targets isolated
//! scanning spikes, which are always extremal, but it also strips the
//! outermost samples of a genuinely convex surface. See
//! [`HullOutlierRemover`](geometry::algorithms::outlier_removal::HullOutlierRemover)
//! for the exact rules, including degenerate input and tie-breaking.
//!
//! # Determinism
//!
//! Hull construction uses exact orientation tests with fixed tie-break rules,
//! and subsampling uses an explicitly seeded `ChaCha8` generator (seed 42 by
//! default). Running the same evaluation twice on the same input yields
//! bit-identical results, with or without the `parallel` feature.
//!
//! # Error Handling
//!
//! Every module reports failures through its own `thiserror` enum. Empty
//! inputs never produce `NaN`: building a spatial index over zero points fails
//! with [`SpatialIndexError::EmptyIndex`](core::spatial_index::SpatialIndexError::EmptyIndex),
//! and a metric that fails is reported by name instead of as a number.
//!
//! # Logging
//!
//! Library code logs through [`tracing`](https://docs.rs/tracing). The
//! `hullclean` binary installs a `tracing-subscriber` formatter filtered by
//! `RUST_LOG`.

// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// The `core` module contains the point cloud model and the structures built
/// over it: the nearest-neighbor index and the seeded subsampler.
pub mod core {
    /// Hash collection aliases backed by `rustc-hash`
    pub mod collections;
    pub mod point_set;
    pub mod spatial_index;
    pub mod subsample;
    // Re-export the `core` modules.
    pub use point_set::*;
    pub use spatial_index::*;
    pub use subsample::*;
    // Note: collections module not re-exported here to avoid namespace pollution
}

/// Geometric predicates, the convex hull, hull-based outlier removal, and
/// normal estimation.
pub mod geometry {
    /// Geometric algorithms over point sets
    pub mod algorithms {
        /// Exact 3D convex hull construction and point location
        pub mod convex_hull;
        pub mod outlier_removal;
        pub use convex_hull::*;
        pub use outlier_removal::*;
    }
    pub mod normals;
    pub mod predicates;
    pub mod util;
    pub use algorithms::*;
    pub use normals::*;
    pub use predicates::*;
    pub use util::*;
}

/// Quality metrics comparing two point clouds through nearest-neighbor
/// correspondence.
pub mod metrics {
    pub mod chamfer;
    pub mod correspondence;
    pub mod normal_consistency;
    pub use chamfer::*;
    pub use correspondence::*;
    pub use normal_consistency::*;
}

pub mod io;
pub mod pipeline;
pub mod report;

/// A prelude module that re-exports commonly used types.
/// This makes it easier to import the most commonly used items from the crate.
pub mod prelude {
    // Re-export from core
    pub use crate::core::{point_set::*, spatial_index::*, subsample::*};

    // Re-export commonly used collection types from core::collections
    pub use crate::core::collections::{
        FastHashMap, FastHashSet, fast_hash_map_with_capacity, fast_hash_set_with_capacity,
    };

    // Re-export from geometry
    pub use crate::geometry::{algorithms::*, normals::*, predicates::*, util::*};

    // Re-export metrics and the evaluation driver
    pub use crate::metrics::{chamfer::*, correspondence::*, normal_consistency::*};
    pub use crate::pipeline::{
        Evaluation, EvaluationConfig, EvaluationConfigBuilder, EvaluationError, evaluate,
    };
    pub use crate::report::{ReportRecord, write_report};
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
