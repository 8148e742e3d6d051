//! The per-mesh aggregate root.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::ops::Range;

use tracing::debug;

use crate::error::{OperationError, Result};
use crate::history::{
    ChangeTracker, EditTime, EventType, HistoryStore, PolygonPayload, PropertyId, SubobjKey,
};
use crate::math::polygon::{centroid, face_normal};
use crate::math::{Point3, Vector3};
use crate::render::RenderBuffers;
use crate::selection::SelectionState;
use crate::topology::{
    EdgeData, EdgeId, PolygonData, PolygonId, SubobjectLevel, TopologyStore, Triangle, UvMap,
    VertexData, VertexId,
};

/// Identifier of a mesh object in the host scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u32);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj{}", self.0)
    }
}

/// One editable mesh: topology, selection, render rows and pending changes.
#[derive(Debug, Clone)]
pub struct GeomDataObject {
    id: ObjectId,
    pub(crate) store: TopologyStore,
    pub(crate) selection: SelectionState,
    pub(crate) buffers: RenderBuffers,
    pub(crate) changes: ChangeTracker,
}

impl GeomDataObject {
    /// Creates an object without any geometry.
    #[must_use]
    pub fn new(id: ObjectId) -> Self {
        Self {
            id,
            store: TopologyStore::new(),
            selection: SelectionState::default(),
            buffers: RenderBuffers::new(),
            changes: ChangeTracker::default(),
        }
    }

    #[must_use]
    pub fn id(&self) -> ObjectId {
        self.id
    }

    #[must_use]
    pub fn store(&self) -> &TopologyStore {
        &self.store
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    #[must_use]
    pub fn buffers(&self) -> &RenderBuffers {
        &self.buffers
    }

    /// Mutable access for the host, to drain buffer updates.
    pub fn buffers_mut(&mut self) -> &mut RenderBuffers {
        &mut self.buffers
    }

    /// Changes not yet handed to the history store.
    #[must_use]
    pub fn changes(&self) -> &ChangeTracker {
        &self.changes
    }

    /// Records the object's full initial state at a freshly minted time.
    pub fn commit_creation(&mut self, history: &mut dyn HistoryStore) -> EditTime {
        let time = history.get_history_time();
        for (property, record) in self.get_data_to_store(EventType::Creation, None, time) {
            history.save(self.id, property, time, record);
        }
        time
    }

    /// Hands every pending change to the history store.
    ///
    /// Returns the edit time used, or `None` if nothing changed.
    pub fn commit(&mut self, history: &mut dyn HistoryStore) -> Option<EditTime> {
        if self.changes.is_empty() {
            return None;
        }
        let time = history.get_history_time();
        let records = self.get_data_to_store(EventType::PropChange, None, time);
        debug!(object = %self.id, %time, properties = records.len(), "edit committed");
        for (property, record) in records {
            history.save(self.id, property, time, record);
        }
        Some(time)
    }

    /// Inserts a polygon described by `payload` under its recorded ids.
    ///
    /// Corners and edges start out in singleton weld and normal groups;
    /// rows are appended at the end of the render buffers. Not tracked.
    pub(crate) fn attach_polygon(&mut self, payload: &PolygonPayload) -> Result<()> {
        let n = payload.vertices.len();
        if n < 3 || payload.edges.len() != n {
            return Err(OperationError::InvalidInput(format!(
                "polygon {} needs at least 3 corners and one edge per corner",
                payload.id
            ))
            .into());
        }
        if self.store.contains_polygon(payload.id) {
            return Err(OperationError::InvalidInput(format!("polygon {} already exists", payload.id)).into());
        }

        let vertex_ids = payload.vertex_ids();
        let edge_ids = payload.edge_ids();
        let positions: Vec<Point3> = payload.vertices.iter().map(|v| v.position).collect();

        for (i, v) in payload.vertices.iter().enumerate() {
            let row = self.buffers.append_row(v.id);
            self.buffers.write_position(row, v.position);
            self.buffers.write_normal(row, v.normal);
            if !v.uvs.is_empty() {
                self.buffers.write_uvs(row, &v.uvs);
            }
            self.store.insert_vertex(
                v.id,
                VertexData {
                    position: v.position,
                    normal: v.normal,
                    uvs: v.uvs.clone(),
                    polygon: payload.id,
                    edges: [edge_ids[i], edge_ids[(i + n - 1) % n]],
                    row,
                    normal_locked: v.normal_locked,
                    stamps: v.stamps.clone(),
                },
            );
            self.store.merged_vertices_mut().insert_singleton(v.id);
            self.store.shared_normals_mut().insert_singleton(v.id);
        }
        for (i, e) in payload.edges.iter().enumerate() {
            self.store.insert_edge(
                e.id,
                EdgeData {
                    vertices: [vertex_ids[i], vertex_ids[(i + 1) % n]],
                    polygon: payload.id,
                    stamps: e.stamps.clone(),
                },
            );
            self.store.merged_edges_mut().insert_singleton(e.id);
        }
        self.store.insert_polygon(
            payload.id,
            PolygonData {
                vertices: vertex_ids,
                edges: edge_ids,
                triangles: payload.triangles.clone(),
                normal: face_normal(&positions).unwrap_or_else(Vector3::z),
                center: centroid(&positions),
                stamps: payload.stamps.clone(),
            },
        );
        Ok(())
    }

    /// Removes polygons in ascending id order and compacts their rows.
    ///
    /// Row ranges are removed in descending order so no range is shifted
    /// before its own removal. With `track`, the deletion and every group
    /// membership it changes are recorded for history.
    pub(crate) fn detach_polygons(&mut self, ids: &[PolygonId], track: bool) -> Vec<PolygonPayload> {
        let mut ids: Vec<PolygonId> = ids
            .iter()
            .copied()
            .filter(|id| self.store.contains_polygon(*id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Vec::new();
        }

        if track {
            self.mark_detach_neighbours(&ids);
        }

        let mut ranges: Vec<Range<usize>> = Vec::with_capacity(ids.len());
        let mut dropped: BTreeMap<SubobjectLevel, BTreeSet<u32>> = BTreeMap::new();
        let mut payloads = Vec::with_capacity(ids.len());
        for &pid in &ids {
            let Some(removed) = self.store.remove_polygon(pid) else {
                continue;
            };
            if let Some(start) = removed.vertices.iter().map(|(_, v)| v.row).min() {
                ranges.push(start..start + removed.vertices.len());
            }
            let verts = dropped.entry(SubobjectLevel::Vertex).or_default();
            verts.extend(removed.vertices.iter().map(|(v, _)| v.0));
            dropped
                .entry(SubobjectLevel::Edge)
                .or_default()
                .extend(removed.edges.iter().map(|(e, _)| e.0));
            dropped.entry(SubobjectLevel::Polygon).or_default().insert(pid.0);
            payloads.push(PolygonPayload::from_removed(&removed));
        }
        if let Some(verts) = dropped.get(&SubobjectLevel::Vertex).cloned() {
            dropped.insert(SubobjectLevel::Normal, verts);
        }

        for (level, gone) in &dropped {
            if self.selection.forget(*level, gone) && track {
                self.changes
                    .mark(PropertyId::SubobjSelection, SubobjKey::Selection(*level));
            }
        }

        ranges.sort_by(|a, b| b.start.cmp(&a.start));
        let lowest = ranges.last().map_or(0, |r| r.start);
        for range in ranges {
            self.buffers.remove_rows(range);
        }
        self.reindex_rows(lowest);

        if track {
            for payload in &payloads {
                self.changes.mark_deleted(payload.clone());
            }
        }
        debug!(object = %self.id, polygons = payloads.len(), "polygons detached");
        payloads
    }

    /// Marks the weld, normal and smoothing memberships a deletion changes,
    /// while the polygons still exist.
    fn mark_detach_neighbours(&mut self, ids: &[PolygonId]) {
        let mut vert_keys = BTreeSet::new();
        let mut normal_keys = BTreeSet::new();
        let mut edge_keys = BTreeSet::new();
        let mut poly_keys = BTreeSet::new();
        for &pid in ids {
            let Ok(poly) = self.store.polygon(pid) else {
                continue;
            };
            for &v in &poly.vertices {
                vert_keys.extend(self.store.merged_vertices().siblings(v));
                normal_keys.extend(self.store.shared_normals().siblings(v));
            }
            for &e in &poly.edges {
                edge_keys.extend(self.store.merged_edges().siblings(e));
            }
            for group in self.store.smoothing_groups_of(pid) {
                poly_keys.extend(group);
            }
        }
        self.changes.mark_all(
            PropertyId::SubobjMerge,
            vert_keys
                .into_iter()
                .map(SubobjKey::Vertex)
                .chain(edge_keys.into_iter().map(SubobjKey::Edge)),
        );
        self.changes
            .mark_all(PropertyId::NormalSharing, normal_keys.into_iter().map(SubobjKey::Vertex));
        self.changes
            .mark_all(PropertyId::Smoothing, poly_keys.into_iter().map(SubobjKey::Polygon));
    }

    /// Re-synchronizes vertex row indices from `from` onwards.
    fn reindex_rows(&mut self, from: usize) {
        let moved: Vec<(usize, VertexId)> = self.buffers.rows_from(from).collect();
        for (row, vid) in moved {
            if let Ok(v) = self.store.vertex_mut(vid) {
                v.row = row;
            }
        }
    }

    /// Moves corners, writing their rows and refreshing the cached geometry
    /// of their polygons. Tracked.
    ///
    /// Returns the polygons whose shape changed.
    pub(crate) fn move_vertices(&mut self, moves: &BTreeMap<VertexId, Point3>) -> BTreeSet<PolygonId> {
        let mut polygons = BTreeSet::new();
        for (&v, &position) in moves {
            let Ok(data) = self.store.vertex_mut(v) else {
                continue;
            };
            if data.position == position {
                continue;
            }
            data.position = position;
            let (row, polygon) = (data.row, data.polygon);
            self.buffers.write_position(row, position);
            self.changes
                .mark(PropertyId::SubobjTransform, SubobjKey::Vertex(v));
            polygons.insert(polygon);
        }
        for &p in &polygons {
            if let Err(err) = self.store.refresh_polygon_geometry(p) {
                debug!(polygon = %p, %err, "polygon geometry not refreshed");
            }
        }
        polygons
    }

    /// Re-averages every shared normal touching the corners of `polygons`.
    pub(crate) fn relax_normals_around(&mut self, polygons: &BTreeSet<PolygonId>) {
        if polygons.is_empty() {
            return;
        }
        let corners: BTreeSet<VertexId> = polygons
            .iter()
            .filter_map(|&p| self.store.polygon(p).ok())
            .flat_map(|p| p.vertices.iter().copied())
            .collect();
        self.update_vertex_normals(Some(&corners));
    }

    /// Marks a freshly attached polygon as created, with every property of
    /// its subobjects dirty.
    pub(crate) fn track_created_polygon(&mut self, id: PolygonId) {
        let Ok(poly) = self.store.polygon(id) else {
            return;
        };
        let verts: Vec<SubobjKey> = poly.vertices.iter().map(|&v| SubobjKey::Vertex(v)).collect();
        let edges: Vec<SubobjKey> = poly.edges.iter().map(|&e| SubobjKey::Edge(e)).collect();
        self.changes.mark_created(id);
        for property in [
            PropertyId::SubobjTransform,
            PropertyId::Uvs,
            PropertyId::NormalLock,
            PropertyId::Normals,
            PropertyId::NormalSharing,
        ] {
            self.changes.mark_all(property, verts.iter().copied());
        }
        self.changes.mark_all(
            PropertyId::SubobjMerge,
            verts.iter().chain(edges.iter()).copied(),
        );
        self.changes.mark(PropertyId::PolyTris, SubobjKey::Polygon(id));
        self.changes.mark(PropertyId::Smoothing, SubobjKey::Polygon(id));
    }

    /// Copies the whole editable state, for rolling back a cancelled task.
    pub(crate) fn snapshot(&self) -> ObjectSnapshot {
        ObjectSnapshot {
            store: self.store.clone(),
            selection: self.selection.clone(),
            buffers: self.buffers.clone(),
            changes: self.changes.clone(),
        }
    }

    /// Reinstates a snapshot; the host is told to re-upload every row.
    pub(crate) fn restore_snapshot(&mut self, snapshot: ObjectSnapshot) {
        self.store = snapshot.store;
        self.selection = snapshot.selection;
        self.changes = snapshot.changes;
        self.buffers.restore_rows(&snapshot.buffers);
    }

    /// Snapshot of everything a user can observe, independent of group keys
    /// and row layout.
    #[must_use]
    pub fn observable_state(&self) -> ObservableState {
        let vertices = self
            .store
            .vertices()
            .map(|(id, v)| {
                (
                    id,
                    VertexState {
                        position: v.position,
                        normal: v.normal,
                        uvs: v.uvs.clone(),
                        normal_locked: v.normal_locked,
                        polygon: v.polygon,
                    },
                )
            })
            .collect();
        let polygons = self
            .store
            .polygons()
            .map(|(id, p)| (id, (p.vertices.clone(), p.triangles.clone())))
            .collect();
        let selection = SubobjectLevel::ALL
            .iter()
            .map(|&l| (l, self.selection.level(l).ids().to_vec()))
            .collect();
        ObservableState {
            vertices,
            polygons,
            edges: self.store.edges().map(|(id, _)| id).collect(),
            merged_vertices: self.store.merged_vertices().as_sets(),
            merged_edges: self.store.merged_edges().as_sets(),
            shared_normals: self.store.shared_normals().as_sets(),
            smoothing: self.store.smoothing_sets(),
            selection,
        }
    }
}

/// Saved editable state of one object.
#[derive(Debug, Clone)]
pub(crate) struct ObjectSnapshot {
    store: TopologyStore,
    selection: SelectionState,
    buffers: RenderBuffers,
    changes: ChangeTracker,
}

/// Observable per-corner state.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexState {
    pub position: Point3,
    pub normal: Vector3,
    pub uvs: UvMap,
    pub normal_locked: bool,
    pub polygon: PolygonId,
}

/// Key-independent snapshot of an object, used to compare states.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservableState {
    pub vertices: BTreeMap<VertexId, VertexState>,
    pub polygons: BTreeMap<PolygonId, (Vec<VertexId>, Vec<Triangle>)>,
    pub edges: BTreeSet<EdgeId>,
    pub merged_vertices: BTreeSet<BTreeSet<VertexId>>,
    pub merged_edges: BTreeSet<BTreeSet<EdgeId>>,
    pub shared_normals: BTreeSet<BTreeSet<VertexId>>,
    pub smoothing: BTreeSet<BTreeSet<PolygonId>>,
    pub selection: BTreeMap<SubobjectLevel, Vec<u32>>,
}

/// Gives the task runner mutable access to objects by id.
pub trait ObjectProvider {
    fn object_mut(&mut self, id: ObjectId) -> Option<&mut GeomDataObject>;
}

impl ObjectProvider for GeomDataObject {
    fn object_mut(&mut self, id: ObjectId) -> Option<&mut GeomDataObject> {
        (self.id == id).then_some(self)
    }
}

impl ObjectProvider for HashMap<ObjectId, GeomDataObject> {
    fn object_mut(&mut self, id: ObjectId) -> Option<&mut GeomDataObject> {
        self.get_mut(&id)
    }
}

impl ObjectProvider for BTreeMap<ObjectId, GeomDataObject> {
    fn object_mut(&mut self, id: ObjectId) -> Option<&mut GeomDataObject> {
        self.get_mut(&id)
    }
}
