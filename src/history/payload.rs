use crate::error::TopologyError;
use crate::math::{Point3, Vector3};
use crate::topology::{
    EdgeId, PolygonId, RemovedPolygon, TopologyStore, Triangle, UvMap, VertexData, VertexId,
};

use super::time::Stamps;

/// Everything needed to recreate one corner.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexPayload {
    pub id: VertexId,
    pub position: Point3,
    pub normal: Vector3,
    pub uvs: UvMap,
    pub normal_locked: bool,
    pub stamps: Stamps,
}

impl VertexPayload {
    fn from_data(id: VertexId, data: &VertexData) -> Self {
        Self {
            id,
            position: data.position,
            normal: data.normal,
            uvs: data.uvs.clone(),
            normal_locked: data.normal_locked,
            stamps: data.stamps.clone(),
        }
    }
}

/// Everything needed to recreate one edge; its endpoints follow from its
/// position in the polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePayload {
    pub id: EdgeId,
    pub stamps: Stamps,
}

/// Self-contained description of a polygon with its corners and edges.
///
/// Stored as the creation value and as the deletion anchor of the
/// `Subobj` property.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonPayload {
    pub id: PolygonId,
    pub vertices: Vec<VertexPayload>,
    /// `edges[i]` runs from `vertices[i]` to `vertices[i + 1]`.
    pub edges: Vec<EdgePayload>,
    pub triangles: Vec<Triangle>,
    pub stamps: Stamps,
}

impl PolygonPayload {
    /// Captures the current state of a live polygon.
    ///
    /// # Errors
    ///
    /// Returns an error if the polygon or one of its subobjects is missing.
    pub fn capture(store: &TopologyStore, id: PolygonId) -> Result<Self, TopologyError> {
        let polygon = store.polygon(id)?;
        let vertices = polygon
            .vertices
            .iter()
            .map(|&v| store.vertex(v).map(|data| VertexPayload::from_data(v, data)))
            .collect::<Result<Vec<_>, _>>()?;
        let edges = polygon
            .edges
            .iter()
            .map(|&e| {
                store.edge(e).map(|data| EdgePayload {
                    id: e,
                    stamps: data.stamps.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id,
            vertices,
            edges,
            triangles: polygon.triangles.clone(),
            stamps: polygon.stamps.clone(),
        })
    }

    /// Builds a payload from records already removed from the store.
    #[must_use]
    pub fn from_removed(removed: &RemovedPolygon) -> Self {
        let vertices = removed
            .polygon
            .vertices
            .iter()
            .filter_map(|v| {
                removed
                    .vertices
                    .iter()
                    .find(|(id, _)| id == v)
                    .map(|(id, data)| VertexPayload::from_data(*id, data))
            })
            .collect();
        let edges = removed
            .edges
            .iter()
            .map(|(id, data)| EdgePayload {
                id: *id,
                stamps: data.stamps.clone(),
            })
            .collect();
        Self {
            id: removed.id,
            vertices,
            edges,
            triangles: removed.polygon.triangles.clone(),
            stamps: removed.polygon.stamps.clone(),
        }
    }

    /// Corner ids in winding order.
    #[must_use]
    pub fn vertex_ids(&self) -> Vec<VertexId> {
        self.vertices.iter().map(|v| v.id).collect()
    }

    /// Edge ids in winding order.
    #[must_use]
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges.iter().map(|e| e.id).collect()
    }

    /// Stamps of a corner or edge carried by this payload.
    #[must_use]
    pub fn vertex_stamps(&self, id: VertexId) -> Option<&Stamps> {
        self.vertices.iter().find(|v| v.id == id).map(|v| &v.stamps)
    }

    #[must_use]
    pub fn edge_stamps(&self, id: EdgeId) -> Option<&Stamps> {
        self.edges.iter().find(|e| e.id == id).map(|e| &e.stamps)
    }
}
