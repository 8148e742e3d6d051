use std::fmt;

use crate::history::Stamps;
use crate::math::{Point3, Vector3};

use super::edge::EdgeId;
use super::vertex::VertexId;

/// Stable identifier for a polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PolygonId(pub u32);

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// A triangle of a polygon's triangulation, as corner ids.
pub type Triangle = [VertexId; 3];

/// Data associated with a polygon.
///
/// Polygons are the unit of creation and deletion: their corners and
/// edges never outlive them.
#[derive(Debug, Clone)]
pub struct PolygonData {
    /// Corners in winding order.
    pub vertices: Vec<VertexId>,
    /// `edges[i]` runs from `vertices[i]` to `vertices[i + 1]`.
    pub edges: Vec<EdgeId>,
    /// Triangulation covering the face.
    pub triangles: Vec<Triangle>,
    /// Cached unit face normal.
    pub normal: Vector3,
    /// Cached face center.
    pub center: Point3,
    pub stamps: Stamps,
}

impl PolygonData {
    /// Returns `true` if `vertex` is one of this polygon's corners.
    #[must_use]
    pub fn has_vertex(&self, vertex: VertexId) -> bool {
        self.vertices.contains(&vertex)
    }

    /// Checks that a triangulation only references this polygon's corners
    /// and has the expected triangle count.
    #[must_use]
    pub fn accepts_triangulation(&self, triangles: &[Triangle]) -> bool {
        if self.vertices.len() < 3 || triangles.len() != self.vertices.len() - 2 {
            return false;
        }
        triangles.iter().all(|tri| {
            tri.iter().all(|v| self.has_vertex(*v))
                && tri[0] != tri[1]
                && tri[1] != tri[2]
                && tri[0] != tri[2]
        })
    }
}
