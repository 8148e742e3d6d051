pub mod edge;
pub mod level;
pub mod partition;
pub mod polygon;
pub mod vertex;

pub use edge::{EdgeData, EdgeId};
pub use level::SubobjectLevel;
pub use partition::Partition;
pub use polygon::{PolygonData, PolygonId, Triangle};
pub use vertex::{UvMap, VertexData, VertexId};

use std::collections::{BTreeMap, BTreeSet, HashMap};

use slotmap::SlotMap;

use crate::error::TopologyError;
use crate::math::polygon::{centroid, face_normal};
use crate::math::{Point3, Vector3};

slotmap::new_key_type! {
    /// Key of a group of vertices welded into one point.
    pub struct MergedVertexId;
    /// Key of a group of edges welded into one seam.
    pub struct MergedEdgeId;
    /// Key of a group of vertices displaying one averaged normal.
    pub struct SharedNormalId;
    /// Key of a smoothing group.
    pub struct SmoothingGroupId;
}

/// A set of polygons smoothed together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmoothingGroupData {
    pub polygons: BTreeSet<PolygonId>,
}

/// Records removed from the store together with one polygon.
#[derive(Debug, Clone)]
pub struct RemovedPolygon {
    pub id: PolygonId,
    pub polygon: PolygonData,
    pub vertices: Vec<(VertexId, VertexData)>,
    pub edges: Vec<(EdgeId, EdgeData)>,
}

/// Central arena that owns all subobjects of one mesh.
///
/// Vertices, edges and polygons live in id-ordered maps and reference each
/// other by id; the weld and normal aggregates are partitions over those ids.
#[derive(Debug, Clone, Default)]
pub struct TopologyStore {
    vertices: BTreeMap<VertexId, VertexData>,
    edges: BTreeMap<EdgeId, EdgeData>,
    polygons: BTreeMap<PolygonId, PolygonData>,
    merged_vertices: Partition<MergedVertexId, VertexId>,
    merged_edges: Partition<MergedEdgeId, EdgeId>,
    shared_normals: Partition<SharedNormalId, VertexId>,
    smoothing_groups: SlotMap<SmoothingGroupId, SmoothingGroupData>,
    next_vertex: u32,
    next_edge: u32,
    next_polygon: u32,
}

impl TopologyStore {
    /// Creates a new, empty topology store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Id allocation ---

    /// Allocates a fresh vertex id.
    pub fn mint_vertex_id(&mut self) -> VertexId {
        let id = VertexId(self.next_vertex);
        self.next_vertex += 1;
        id
    }

    /// Allocates a fresh edge id.
    pub fn mint_edge_id(&mut self) -> EdgeId {
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        id
    }

    /// Allocates a fresh polygon id.
    pub fn mint_polygon_id(&mut self) -> PolygonId {
        let id = PolygonId(self.next_polygon);
        self.next_polygon += 1;
        id
    }

    // --- Vertex operations ---

    /// Inserts a vertex under a known id.
    pub fn insert_vertex(&mut self, id: VertexId, data: VertexData) {
        self.next_vertex = self.next_vertex.max(id.0 + 1);
        self.vertices.insert(id, data);
    }

    /// Returns a reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex(&self, id: VertexId) -> Result<&VertexData, TopologyError> {
        self.vertices
            .get(&id)
            .ok_or_else(|| TopologyError::EntityNotFound(id.to_string()))
    }

    /// Returns a mutable reference to the vertex data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn vertex_mut(&mut self, id: VertexId) -> Result<&mut VertexData, TopologyError> {
        self.vertices
            .get_mut(&id)
            .ok_or_else(|| TopologyError::EntityNotFound(id.to_string()))
    }

    #[must_use]
    pub fn contains_vertex(&self, id: VertexId) -> bool {
        self.vertices.contains_key(&id)
    }

    /// Iterates over all vertices in ascending id order.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &VertexData)> {
        self.vertices.iter().map(|(id, v)| (*id, v))
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    // --- Edge operations ---

    /// Inserts an edge under a known id.
    pub fn insert_edge(&mut self, id: EdgeId, data: EdgeData) {
        self.next_edge = self.next_edge.max(id.0 + 1);
        self.edges.insert(id, data);
    }

    /// Returns a reference to the edge data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn edge(&self, id: EdgeId) -> Result<&EdgeData, TopologyError> {
        self.edges
            .get(&id)
            .ok_or_else(|| TopologyError::EntityNotFound(id.to_string()))
    }

    /// Returns a mutable reference to the edge data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn edge_mut(&mut self, id: EdgeId) -> Result<&mut EdgeData, TopologyError> {
        self.edges
            .get_mut(&id)
            .ok_or_else(|| TopologyError::EntityNotFound(id.to_string()))
    }

    #[must_use]
    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    /// Iterates over all edges in ascending id order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &EdgeData)> {
        self.edges.iter().map(|(id, e)| (*id, e))
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    // --- Polygon operations ---

    /// Inserts a polygon under a known id.
    pub fn insert_polygon(&mut self, id: PolygonId, data: PolygonData) {
        self.next_polygon = self.next_polygon.max(id.0 + 1);
        self.polygons.insert(id, data);
    }

    /// Returns a reference to the polygon data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn polygon(&self, id: PolygonId) -> Result<&PolygonData, TopologyError> {
        self.polygons
            .get(&id)
            .ok_or_else(|| TopologyError::EntityNotFound(id.to_string()))
    }

    /// Returns a mutable reference to the polygon data, or an error if not found.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity is not found in the store.
    pub fn polygon_mut(&mut self, id: PolygonId) -> Result<&mut PolygonData, TopologyError> {
        self.polygons
            .get_mut(&id)
            .ok_or_else(|| TopologyError::EntityNotFound(id.to_string()))
    }

    #[must_use]
    pub fn contains_polygon(&self, id: PolygonId) -> bool {
        self.polygons.contains_key(&id)
    }

    /// Iterates over all polygons in ascending id order.
    pub fn polygons(&self) -> impl Iterator<Item = (PolygonId, &PolygonData)> {
        self.polygons.iter().map(|(id, p)| (*id, p))
    }

    #[must_use]
    pub fn polygon_count(&self) -> usize {
        self.polygons.len()
    }

    /// Removes a polygon with its corners and edges from every map and
    /// aggregate. Smoothing groups left with fewer than two polygons are
    /// dropped.
    pub fn remove_polygon(&mut self, id: PolygonId) -> Option<RemovedPolygon> {
        let polygon = self.polygons.remove(&id)?;
        let mut vertices = Vec::with_capacity(polygon.vertices.len());
        for &vid in &polygon.vertices {
            self.merged_vertices.detach(vid);
            self.shared_normals.detach(vid);
            if let Some(data) = self.vertices.remove(&vid) {
                vertices.push((vid, data));
            }
        }
        let mut edges = Vec::with_capacity(polygon.edges.len());
        for &eid in &polygon.edges {
            self.merged_edges.detach(eid);
            if let Some(data) = self.edges.remove(&eid) {
                edges.push((eid, data));
            }
        }
        self.smoothing_groups.retain(|_, group| {
            group.polygons.remove(&id);
            group.polygons.len() > 1
        });
        Some(RemovedPolygon {
            id,
            polygon,
            vertices,
            edges,
        })
    }

    /// Corner positions of a polygon in winding order.
    ///
    /// # Errors
    ///
    /// Returns an error if the polygon or one of its corners is missing.
    pub fn polygon_positions(&self, id: PolygonId) -> Result<Vec<Point3>, TopologyError> {
        let polygon = self.polygon(id)?;
        polygon
            .vertices
            .iter()
            .map(|&v| self.vertex(v).map(|data| data.position))
            .collect()
    }

    /// Recomputes the cached normal and center of a polygon from its corners.
    ///
    /// # Errors
    ///
    /// Returns an error if the polygon or one of its corners is missing.
    pub fn refresh_polygon_geometry(&mut self, id: PolygonId) -> Result<(), TopologyError> {
        let points = self.polygon_positions(id)?;
        let polygon = self.polygon_mut(id)?;
        polygon.normal = face_normal(&points).unwrap_or_else(Vector3::z);
        polygon.center = centroid(&points);
        Ok(())
    }

    // --- Aggregates ---

    #[must_use]
    pub fn merged_vertices(&self) -> &Partition<MergedVertexId, VertexId> {
        &self.merged_vertices
    }

    pub fn merged_vertices_mut(&mut self) -> &mut Partition<MergedVertexId, VertexId> {
        &mut self.merged_vertices
    }

    #[must_use]
    pub fn merged_edges(&self) -> &Partition<MergedEdgeId, EdgeId> {
        &self.merged_edges
    }

    pub fn merged_edges_mut(&mut self) -> &mut Partition<MergedEdgeId, EdgeId> {
        &mut self.merged_edges
    }

    #[must_use]
    pub fn shared_normals(&self) -> &Partition<SharedNormalId, VertexId> {
        &self.shared_normals
    }

    pub fn shared_normals_mut(&mut self) -> &mut Partition<SharedNormalId, VertexId> {
        &mut self.shared_normals
    }

    #[must_use]
    pub fn smoothing_groups(&self) -> &SlotMap<SmoothingGroupId, SmoothingGroupData> {
        &self.smoothing_groups
    }

    pub fn smoothing_groups_mut(&mut self) -> &mut SlotMap<SmoothingGroupId, SmoothingGroupData> {
        &mut self.smoothing_groups
    }

    /// Maps each smoothed polygon to the groups containing it.
    #[must_use]
    pub fn smoothing_index(&self) -> HashMap<PolygonId, BTreeSet<SmoothingGroupId>> {
        let mut index: HashMap<PolygonId, BTreeSet<SmoothingGroupId>> = HashMap::new();
        for (key, group) in &self.smoothing_groups {
            for &p in &group.polygons {
                index.entry(p).or_default().insert(key);
            }
        }
        index
    }

    /// Member lists of the smoothing groups containing `polygon`.
    #[must_use]
    pub fn smoothing_groups_of(&self, polygon: PolygonId) -> Vec<Vec<PolygonId>> {
        let mut groups: Vec<Vec<PolygonId>> = self
            .smoothing_groups
            .values()
            .filter(|g| g.polygons.contains(&polygon))
            .map(|g| g.polygons.iter().copied().collect())
            .collect();
        groups.sort();
        groups
    }

    /// Smoothing groups as polygon sets, independent of key identity.
    #[must_use]
    pub fn smoothing_sets(&self) -> BTreeSet<BTreeSet<PolygonId>> {
        self.smoothing_groups
            .values()
            .map(|g| g.polygons.clone())
            .collect()
    }

    /// Unordered pair of merged vertices an edge connects.
    #[must_use]
    pub fn edge_weld_pair(&self, edge: EdgeId) -> Option<(MergedVertexId, MergedVertexId)> {
        let data = self.edges.get(&edge)?;
        let a = self.merged_vertices.group_of(data.vertices[0])?;
        let b = self.merged_vertices.group_of(data.vertices[1])?;
        Some(if a <= b { (a, b) } else { (b, a) })
    }

    /// Polygons owning the members of the merged vertex containing `vertex`.
    #[must_use]
    pub fn polygons_at(&self, vertex: VertexId) -> BTreeSet<PolygonId> {
        self.merged_vertices
            .siblings(vertex)
            .into_iter()
            .filter_map(|v| self.vertices.get(&v).map(|data| data.polygon))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::two_triangle_plane;

    #[test]
    fn plane_has_expected_counts() {
        let obj = two_triangle_plane();
        let store = obj.store();
        assert_eq!(store.vertex_count(), 6);
        assert_eq!(store.edge_count(), 6);
        assert_eq!(store.polygon_count(), 2);
        assert_eq!(store.merged_vertices().len(), 4);
        assert_eq!(store.merged_edges().len(), 5);
    }

    #[test]
    fn remove_polygon_detaches_aggregates() {
        let obj = two_triangle_plane();
        let mut store = obj.store().clone();
        let removed = store.remove_polygon(PolygonId(1)).unwrap();
        assert_eq!(removed.vertices.len(), 3);
        assert_eq!(store.vertex_count(), 3);
        assert_eq!(store.merged_vertices().item_count(), 3);
        assert_eq!(store.merged_edges().item_count(), 3);
        assert!(store.smoothing_groups().is_empty());
    }

    #[test]
    fn missing_vertex_is_reported() {
        let store = TopologyStore::new();
        assert!(matches!(
            store.vertex(VertexId(7)),
            Err(TopologyError::EntityNotFound(_))
        ));
    }

    #[test]
    fn refresh_geometry_updates_center() {
        let obj = two_triangle_plane();
        let mut store = obj.store().clone();
        store.vertex_mut(VertexId(0)).unwrap().position.z = 3.0;
        store.refresh_polygon_geometry(PolygonId(0)).unwrap();
        let center = store.polygon(PolygonId(0)).unwrap().center;
        assert!((center.z - 1.0).abs() < 1e-12);
    }
}
