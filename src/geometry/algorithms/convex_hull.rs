use crate::core::collections::{FastHashMap, FastHashSet, fast_hash_map_with_capacity};
use crate::geometry::predicates::{Orientation, orient3d_value, orientation_3d};
use crate::geometry::util::{cross, is_finite, squared_distance, squared_norm, sub};
use thiserror::Error;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur during convex hull construction.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConvexHullConstructionError {
    /// Fewer than four points were supplied.
    #[error("Insufficient data for convex hull construction: need at least 4 points, got {count}")]
    InsufficientPoints {
        /// Number of points supplied.
        count: usize,
    },
    /// The points do not span three dimensions (coincident, collinear, or coplanar).
    #[error("Geometric degeneracy encountered during convex hull construction: {message}")]
    GeometricDegeneracy {
        /// Description of the degeneracy.
        message: String,
    },
    /// A coordinate was NaN or infinite.
    #[error("Point {index} has a non-finite coordinate")]
    NonFiniteCoordinate {
        /// Index of the offending point.
        index: usize,
    },
    /// The facet adjacency became inconsistent during construction.
    #[error("Convex hull topology is inconsistent: {message}")]
    TopologyInconsistency {
        /// Description of the broken adjacency.
        message: String,
    },
}

// =============================================================================
// CONVEX HULL DATA STRUCTURE
// =============================================================================

/// Position of a query point relative to a convex hull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HullLocation {
    /// Strictly inside every facet plane.
    Inside,
    /// On the hull surface.
    Boundary,
    /// Strictly beyond at least one facet plane.
    Outside,
}

/// Convex hull of a 3D point set.
///
/// The hull is a triangulated closed surface whose facets reference indices
/// into the point slice it was built from. It is an immutable snapshot: the
/// indices are meaningless for any other slice, so callers must pass the same
/// points to [`ConvexHull3::locate`].
///
/// # Construction
///
/// Incremental beneath-beyond insertion with conflict lists (quickhull
/// ordering): start from a maximal tetrahedron, then repeatedly pick the point
/// farthest beyond some facet, delete every facet it sees, and cone the
/// horizon to it. Expected `O(n log n)`, worst case `O(n²)`.
///
/// # Tie-break rules
///
/// - All visibility tests use the exact [`orientation_3d`] predicate. A point
///   sees a facet only when it is strictly beyond the facet's plane.
/// - A point lying exactly on a facet of the current hull is not inserted. A
///   point inserted earlier that later ends up coplanar with its neighboring
///   facets stays a vertex. For inputs with coplanar points on the hull
///   surface, whether such a point is a vertex therefore depends on insertion
///   order; for points in general position every vertex is extremal.
/// - Among points equally far beyond a facet the lowest index is inserted
///   first, and the initial tetrahedron starts at the lexicographically
///   smallest coordinate (lowest index on ties).
///
/// Construction is a pure function of the coordinates and their order.
///
/// # Examples
///
/// ```rust
/// use hullclean::geometry::algorithms::convex_hull::{ConvexHull3, HullLocation};
///
/// let points = vec![
///     [0.0, 0.0, 0.0],
///     [4.0, 0.0, 0.0],
///     [0.0, 4.0, 0.0],
///     [0.0, 0.0, 4.0],
///     [0.5, 0.5, 0.5], // interior
/// ];
/// let hull = ConvexHull3::from_points(&points).unwrap();
///
/// assert_eq!(hull.vertex_indices(), &[0, 1, 2, 3]);
/// assert_eq!(hull.facet_count(), 4);
/// assert_eq!(hull.locate(&points, &points[4]), HullLocation::Inside);
/// assert_eq!(hull.locate(&points, &[5.0, 5.0, 5.0]), HullLocation::Outside);
/// ```
#[derive(Clone, Debug)]
pub struct ConvexHull3 {
    /// Outward-facing triangles, counter-clockwise when viewed from outside.
    facets: Vec<[usize; 3]>,
    /// Sorted, unique indices of the points that are hull vertices.
    vertices: Vec<usize>,
    /// Length of the slice the hull was built from.
    point_count: usize,
}

impl ConvexHull3 {
    /// Computes the convex hull of `points`.
    ///
    /// # Errors
    ///
    /// - [`ConvexHullConstructionError::NonFiniteCoordinate`] if any coordinate is NaN or infinite
    /// - [`ConvexHullConstructionError::InsufficientPoints`] for fewer than four points
    /// - [`ConvexHullConstructionError::GeometricDegeneracy`] if the points are all
    ///   coincident, collinear, or coplanar
    pub fn from_points(points: &[[f64; 3]]) -> Result<Self, ConvexHullConstructionError> {
        if let Some(index) = points.iter().position(|p| !is_finite(p)) {
            return Err(ConvexHullConstructionError::NonFiniteCoordinate { index });
        }
        if points.len() < 4 {
            return Err(ConvexHullConstructionError::InsufficientPoints {
                count: points.len(),
            });
        }

        let simplex = initial_simplex(points)?;
        let mut builder = HullBuilder::new(points);
        builder.seed(simplex)?;
        builder.expand()?;
        let hull = builder.finish();

        tracing::debug!(
            points = points.len(),
            vertices = hull.vertices.len(),
            facets = hull.facets.len(),
            "convex hull constructed"
        );
        Ok(hull)
    }

    /// Indices of the hull vertices, ascending.
    #[must_use]
    pub fn vertex_indices(&self) -> &[usize] {
        &self.vertices
    }

    /// The hull's triangular facets.
    #[must_use]
    pub fn facets(&self) -> &[[usize; 3]] {
        &self.facets
    }

    /// Number of triangular facets.
    #[must_use]
    pub fn facet_count(&self) -> usize {
        self.facets.len()
    }

    /// Number of hull vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Length of the point slice the hull was built from.
    #[must_use]
    pub const fn point_count(&self) -> usize {
        self.point_count
    }

    /// Whether point `index` is a hull vertex.
    #[must_use]
    pub fn is_vertex(&self, index: usize) -> bool {
        self.vertices.binary_search(&index).is_ok()
    }

    /// Classifies `query` against the hull.
    ///
    /// `points` must be the slice the hull was built from.
    #[must_use]
    pub fn locate(&self, points: &[[f64; 3]], query: &[f64; 3]) -> HullLocation {
        let mut on_plane = false;
        for &[a, b, c] in &self.facets {
            match orientation_3d(&points[a], &points[b], &points[c], query) {
                Orientation::NEGATIVE => return HullLocation::Outside,
                Orientation::DEGENERATE => on_plane = true,
                Orientation::POSITIVE => {}
            }
        }
        if on_plane {
            HullLocation::Boundary
        } else {
            HullLocation::Inside
        }
    }
}

// =============================================================================
// CONSTRUCTION
// =============================================================================

/// Returns the first index with the largest key.
fn argmax_first(keys: impl Iterator<Item = (usize, f64)>) -> Option<(usize, f64)> {
    keys.fold(None, |best, (i, key)| match best {
        Some((_, best_key)) if best_key >= key => best,
        _ => Some((i, key)),
    })
}

/// Picks four affinely independent points spanning a large tetrahedron.
fn initial_simplex(points: &[[f64; 3]]) -> Result<[usize; 4], ConvexHullConstructionError> {
    let lexicographic = |a: &[f64; 3], b: &[f64; 3]| {
        a[0].total_cmp(&b[0])
            .then(a[1].total_cmp(&b[1]))
            .then(a[2].total_cmp(&b[2]))
    };
    let degenerate = |message: &str| ConvexHullConstructionError::GeometricDegeneracy {
        message: message.to_string(),
    };

    let i0 = (0..points.len())
        .min_by(|&a, &b| lexicographic(&points[a], &points[b]))
        .ok_or_else(|| degenerate("empty point set"))?;
    let p0 = points[i0];

    let (i1, spread) = argmax_first(
        points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, squared_distance(p, &p0))),
    )
    .ok_or_else(|| degenerate("empty point set"))?;
    if spread == 0.0 {
        return Err(degenerate("all points coincide"));
    }
    let axis = sub(&points[i1], &p0);

    let (i2, area) = argmax_first(
        points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, squared_norm(&cross(&axis, &sub(p, &p0))))),
    )
    .ok_or_else(|| degenerate("empty point set"))?;
    if area == 0.0 {
        return Err(degenerate("all points are collinear"));
    }
    let p1 = points[i1];
    let p2 = points[i2];

    let (i3, volume) = argmax_first(
        points
            .iter()
            .enumerate()
            .map(|(i, p)| (i, orient3d_value(&p0, &p1, &p2, p).abs())),
    )
    .ok_or_else(|| degenerate("empty point set"))?;
    // The predicate's sign is exact, so a zero magnitude means exactly coplanar.
    if volume == 0.0 {
        return Err(degenerate("all points are coplanar"));
    }

    Ok([i0, i1, i2, i3])
}

struct Facet {
    vertices: [usize; 3],
    /// Points strictly beyond this facet that no earlier facet claimed.
    outside: Vec<usize>,
    alive: bool,
}

struct HullBuilder<'a> {
    points: &'a [[f64; 3]],
    facets: Vec<Facet>,
    /// Directed edge `(a, b)` to the facet that traverses it in that direction.
    edges: FastHashMap<(usize, usize), usize>,
    pending: Vec<usize>,
}

impl<'a> HullBuilder<'a> {
    fn new(points: &'a [[f64; 3]]) -> Self {
        Self {
            points,
            facets: Vec::new(),
            edges: fast_hash_map_with_capacity(points.len().min(1 << 16)),
            pending: Vec::new(),
        }
    }

    fn sees(&self, facet: usize, point: usize) -> bool {
        let [a, b, c] = self.facets[facet].vertices;
        orientation_3d(
            &self.points[a],
            &self.points[b],
            &self.points[c],
            &self.points[point],
        ) == Orientation::NEGATIVE
    }

    fn add_facet(&mut self, vertices: [usize; 3]) -> Result<usize, ConvexHullConstructionError> {
        let id = self.facets.len();
        let [a, b, c] = vertices;
        for edge in [(a, b), (b, c), (c, a)] {
            if self.edges.insert(edge, id).is_some() {
                return Err(ConvexHullConstructionError::TopologyInconsistency {
                    message: format!("directed edge {edge:?} claimed by two facets"),
                });
            }
        }
        self.facets.push(Facet {
            vertices,
            outside: Vec::new(),
            alive: true,
        });
        Ok(id)
    }

    fn retire_facet(&mut self, id: usize) -> Vec<usize> {
        let [a, b, c] = self.facets[id].vertices;
        for edge in [(a, b), (b, c), (c, a)] {
            self.edges.remove(&edge);
        }
        let facet = &mut self.facets[id];
        facet.alive = false;
        std::mem::take(&mut facet.outside)
    }

    /// Hands `point` to the first candidate facet it sees; otherwise it is interior.
    fn assign(&mut self, point: usize, candidates: &[usize]) {
        if let Some(&id) = candidates.iter().find(|&&id| self.sees(id, point)) {
            self.facets[id].outside.push(point);
        }
    }

    fn seed(&mut self, simplex: [usize; 4]) -> Result<(), ConvexHullConstructionError> {
        let mut ids = Vec::with_capacity(4);
        for (a, b, c, opposite) in [(0, 1, 2, 3), (0, 1, 3, 2), (0, 2, 3, 1), (1, 2, 3, 0)] {
            let mut vertices = [simplex[a], simplex[b], simplex[c]];
            let inward = orientation_3d(
                &self.points[vertices[0]],
                &self.points[vertices[1]],
                &self.points[vertices[2]],
                &self.points[simplex[opposite]],
            );
            if inward == Orientation::NEGATIVE {
                vertices.swap(1, 2);
            }
            ids.push(self.add_facet(vertices)?);
        }

        for point in 0..self.points.len() {
            if !simplex.contains(&point) {
                self.assign(point, &ids);
            }
        }
        self.pending = ids;
        Ok(())
    }

    /// The conflict point farthest beyond `facet`, lowest index on ties.
    fn farthest_outside(&self, facet: usize) -> Option<usize> {
        let [a, b, c] = self.facets[facet].vertices;
        let (pa, pb, pc) = (&self.points[a], &self.points[b], &self.points[c]);
        self.facets[facet]
            .outside
            .iter()
            .map(|&i| (i, -orient3d_value(pa, pb, pc, &self.points[i])))
            .fold(None, |best: Option<(usize, f64)>, (i, depth)| match best {
                Some((j, best_depth))
                    if best_depth > depth || (best_depth == depth && j < i) =>
                {
                    best
                }
                _ => Some((i, depth)),
            })
            .map(|(i, _)| i)
    }

    /// Flood-fills the facets visible from `eye`, starting at `start`.
    ///
    /// Returns the visible facets and the horizon as directed edges of the
    /// visible region's boundary.
    fn visible_region(
        &self,
        start: usize,
        eye: usize,
    ) -> Result<(Vec<usize>, Vec<(usize, usize)>), ConvexHullConstructionError> {
        let mut visible = vec![start];
        let mut seen: FastHashSet<usize> = FastHashSet::default();
        seen.insert(start);
        let mut stack = vec![start];
        let mut horizon = Vec::new();

        while let Some(facet) = stack.pop() {
            let [a, b, c] = self.facets[facet].vertices;
            for (u, v) in [(a, b), (b, c), (c, a)] {
                let neighbor = *self.edges.get(&(v, u)).ok_or_else(|| {
                    ConvexHullConstructionError::TopologyInconsistency {
                        message: format!("edge ({u}, {v}) has no twin"),
                    }
                })?;
                if seen.contains(&neighbor) {
                    continue;
                }
                if self.sees(neighbor, eye) {
                    seen.insert(neighbor);
                    visible.push(neighbor);
                    stack.push(neighbor);
                } else {
                    horizon.push((u, v));
                }
            }
        }
        Ok((visible, horizon))
    }

    fn expand(&mut self) -> Result<(), ConvexHullConstructionError> {
        while let Some(start) = self.pending.pop() {
            if !self.facets[start].alive {
                continue;
            }
            let Some(eye) = self.farthest_outside(start) else {
                continue;
            };

            let (visible, horizon) = self.visible_region(start, eye)?;

            let mut orphans = Vec::new();
            for id in visible {
                orphans.extend(self.retire_facet(id).into_iter().filter(|&p| p != eye));
            }

            let mut cone = Vec::with_capacity(horizon.len());
            for (u, v) in horizon {
                cone.push(self.add_facet([u, v, eye])?);
            }

            for point in orphans {
                self.assign(point, &cone);
            }
            self.pending.extend(
                cone.into_iter()
                    .filter(|&id| !self.facets[id].outside.is_empty()),
            );
        }
        Ok(())
    }

    fn finish(self) -> ConvexHull3 {
        let facets: Vec<[usize; 3]> = self
            .facets
            .into_iter()
            .filter(|f| f.alive)
            .map(|f| f.vertices)
            .collect();
        let mut vertices: Vec<usize> = facets.iter().flatten().copied().collect();
        vertices.sort_unstable();
        vertices.dedup();
        ConvexHull3 {
            facets,
            vertices,
            point_count: self.points.len(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
