use std::fmt;

use crate::math::{Point3, Vector3};
use crate::topology::{EdgeId, PolygonId, SubobjectLevel, Triangle, UvMap, VertexId};

use super::payload::PolygonPayload;

/// A tracked property of a mesh object.
///
/// Each property has its own chain of edit times; a restore replays the
/// chains of the requested properties independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyId {
    /// Existence of polygons (with their corners and edges).
    Subobj,
    SubobjMerge,
    SubobjTransform,
    Uvs,
    NormalLock,
    PolyTris,
    Normals,
    NormalSharing,
    Smoothing,
    SubobjSelection,
}

impl PropertyId {
    /// All properties, in the order a restore applies them.
    pub const ALL: [Self; 10] = [
        Self::Subobj,
        Self::SubobjMerge,
        Self::SubobjTransform,
        Self::Uvs,
        Self::NormalLock,
        Self::PolyTris,
        Self::Normals,
        Self::NormalSharing,
        Self::Smoothing,
        Self::SubobjSelection,
    ];
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Subobj => "subobj",
            Self::SubobjMerge => "subobj_merge",
            Self::SubobjTransform => "subobj_transform",
            Self::Uvs => "uvs",
            Self::NormalLock => "normal_lock",
            Self::PolyTris => "poly_tris",
            Self::Normals => "normals",
            Self::NormalSharing => "normal_sharing",
            Self::Smoothing => "smoothing",
            Self::SubobjSelection => "subobj_selection",
        };
        f.write_str(name)
    }
}

/// The subobject (or per-level slot) a property value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubobjKey {
    Vertex(VertexId),
    Edge(EdgeId),
    Polygon(PolygonId),
    Selection(SubobjectLevel),
}

impl fmt::Display for SubobjKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex(id) => id.fmt(f),
            Self::Edge(id) => id.fmt(f),
            Self::Polygon(id) => id.fmt(f),
            Self::Selection(level) => write!(f, "selection:{level}"),
        }
    }
}

/// A recorded property value of one subobject.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Creation payload of a polygon.
    Polygon(Box<PolygonPayload>),
    Position(Point3),
    Uvs(UvMap),
    Normal(Vector3),
    Flag(bool),
    Triangles(Vec<Triangle>),
    /// Members of the vertex group (merged vertex or shared normal) containing the key.
    VertexGroup(Vec<VertexId>),
    /// Members of the merged edge containing the key.
    EdgeGroup(Vec<EdgeId>),
    /// Member lists of every smoothing group containing the key.
    PolygonGroups(Vec<Vec<PolygonId>>),
    /// Ordered raw ids of one selection level.
    Selection(Vec<u32>),
}
