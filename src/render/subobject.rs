use crate::topology::{
    EdgeData, EdgeId, PolygonData, PolygonId, SubobjectLevel, TopologyStore, VertexData, VertexId,
};

/// A subobject that occupies rows of the render buffers.
pub trait Subobject {
    /// Rows holding this subobject's highlight state.
    fn row_indices(&self, store: &TopologyStore) -> Vec<usize>;
}

impl Subobject for VertexData {
    fn row_indices(&self, _store: &TopologyStore) -> Vec<usize> {
        vec![self.row]
    }
}

impl Subobject for EdgeData {
    /// An edge is drawn from the row of its start vertex.
    fn row_indices(&self, store: &TopologyStore) -> Vec<usize> {
        store
            .vertex(self.vertices[0])
            .map(|v| vec![v.row])
            .unwrap_or_default()
    }
}

impl Subobject for PolygonData {
    fn row_indices(&self, store: &TopologyStore) -> Vec<usize> {
        self.vertices
            .iter()
            .filter_map(|&v| store.vertex(v).ok().map(|data| data.row))
            .collect()
    }
}

/// Rows of the subobject with raw id `id` at `level`.
#[must_use]
pub fn level_rows(store: &TopologyStore, level: SubobjectLevel, id: u32) -> Vec<usize> {
    match level {
        SubobjectLevel::Vertex | SubobjectLevel::Normal => store
            .vertex(VertexId(id))
            .map(|v| v.row_indices(store))
            .unwrap_or_default(),
        SubobjectLevel::Edge => store
            .edge(EdgeId(id))
            .map(|e| e.row_indices(store))
            .unwrap_or_default(),
        SubobjectLevel::Polygon => store
            .polygon(PolygonId(id))
            .map(|p| p.row_indices(store))
            .unwrap_or_default(),
    }
}
