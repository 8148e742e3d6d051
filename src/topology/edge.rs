use std::fmt;

use crate::history::Stamps;

use super::polygon::PolygonId;
use super::vertex::VertexId;

/// Stable identifier for a polygon edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub u32);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Data associated with a polygon edge.
///
/// An edge connects two consecutive corners of its polygon, in winding order.
#[derive(Debug, Clone)]
pub struct EdgeData {
    /// Start and end vertex.
    pub vertices: [VertexId; 2],
    /// Owning polygon.
    pub polygon: PolygonId,
    pub stamps: Stamps,
}
