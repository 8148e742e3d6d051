use std::collections::BTreeMap;
use std::fmt;

use crate::history::Stamps;
use crate::math::{Point2, Point3, Vector3};

use super::edge::EdgeId;
use super::polygon::PolygonId;

/// Stable identifier for a vertex (polygon corner).
///
/// Ids are never reused within one object, so they stay valid across
/// deletion and history-driven recreation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VertexId(pub u32);

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Texture coordinates keyed by UV set index.
pub type UvMap = BTreeMap<u8, Point2>;

/// Data associated with a polygon corner.
#[derive(Debug, Clone)]
pub struct VertexData {
    /// Position in object space.
    pub position: Point3,
    /// Displayed normal.
    pub normal: Vector3,
    /// Per-UV-set coordinates.
    pub uvs: UvMap,
    /// Owning polygon.
    pub polygon: PolygonId,
    /// Outgoing edge (towards the next corner) and incoming edge.
    pub edges: [EdgeId; 2],
    /// Row in the render buffers.
    pub row: usize,
    /// A locked normal is never re-averaged.
    pub normal_locked: bool,
    /// Edit time of the last change per tracked property.
    pub stamps: Stamps,
}
