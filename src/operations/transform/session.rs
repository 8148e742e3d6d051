use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::context::EditContext;
use crate::error::{OperationError, Result};
use crate::history::{PropertyId, SubobjKey};
use crate::math::{Point3, Vector3};
use crate::object::{GeomDataObject, ObjectId};
use crate::topology::{EdgeId, PolygonId, SubobjectLevel, TopologyStore, VertexId};

use super::{transform_normal, transform_point, Transform};

#[derive(Debug, Clone)]
enum Originals {
    Positions(BTreeMap<VertexId, Point3>),
    Normals(BTreeMap<VertexId, Vector3>),
}

/// An interactive transform of the current selection.
///
/// `apply` only previews into the render buffers; the topology store is
/// untouched until [`finalize`](Self::finalize). Every `apply` starts over
/// from the positions captured by [`begin`](Self::begin), so a drag can
/// feed absolute transforms frame after frame.
#[derive(Debug, Clone)]
pub struct TransformSession {
    object: ObjectId,
    originals: Originals,
    preview: BTreeMap<VertexId, (Point3, Vector3)>,
    snap: Option<f64>,
}

impl TransformSession {
    /// Captures the corners implied by the selection at `ctx.level`.
    ///
    /// Vertex, edge and polygon selections resolve to whole merged
    /// vertices and move positions; a normal selection rotates normals.
    ///
    /// # Errors
    ///
    /// Returns an error if a selected subobject no longer exists.
    pub fn begin(obj: &GeomDataObject, ctx: &EditContext) -> Result<Self> {
        let ids = obj.selection.level(ctx.level).ids();
        let originals = if ctx.level == SubobjectLevel::Normal {
            let mut normals = BTreeMap::new();
            for &id in ids {
                let v = VertexId(id);
                normals.insert(v, obj.store.vertex(v)?.normal);
            }
            Originals::Normals(normals)
        } else {
            let corners = resolve_corners(&obj.store, ctx.level, ids)?;
            let mut positions = BTreeMap::new();
            for v in corners {
                positions.insert(v, obj.store.vertex(v)?.position);
            }
            Originals::Positions(positions)
        };
        Ok(Self {
            object: obj.id(),
            originals,
            preview: BTreeMap::new(),
            snap: ctx.snap_increment,
        })
    }

    /// Corners this session acts on.
    #[must_use]
    pub fn vertices(&self) -> BTreeSet<VertexId> {
        match &self.originals {
            Originals::Positions(map) => map.keys().copied().collect(),
            Originals::Normals(map) => map.keys().copied().collect(),
        }
    }

    /// Whether the session rotates normals rather than moving corners.
    #[must_use]
    pub fn transforms_normals(&self) -> bool {
        matches!(self.originals, Originals::Normals(_))
    }

    /// Previews `transform`, relative to the state at `begin`.
    ///
    /// Translations are snapped to the context's increment. Normals that a
    /// singular matrix would collapse keep their original direction.
    pub fn apply(&mut self, obj: &mut GeomDataObject, transform: Transform) {
        let matrix = transform.snapped(self.snap).matrix();
        match &self.originals {
            Originals::Positions(map) => {
                for (&v, original) in map {
                    let Ok(data) = obj.store.vertex(v) else {
                        continue;
                    };
                    let moved = transform_point(&matrix, original);
                    obj.buffers.write_position(data.row, moved);
                    self.preview.insert(v, (moved, data.normal));
                }
            }
            Originals::Normals(map) => {
                for (&v, original) in map {
                    let Ok(data) = obj.store.vertex(v) else {
                        continue;
                    };
                    let turned = transform_normal(&matrix, original).unwrap_or(*original);
                    obj.buffers.write_normal(data.row, turned);
                    self.preview.insert(v, (data.position, turned));
                }
            }
        }
    }

    /// Commits the last preview into the topology store. Tracked.
    ///
    /// Moving corners refreshes their polygons, re-derives normal sharing
    /// around them and re-averages the affected normals. Rotated normals
    /// are stored and locked. Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// Returns an error if `obj` is not the object the session began on.
    pub fn finalize(self, obj: &mut GeomDataObject) -> Result<bool> {
        if obj.id() != self.object {
            return Err(OperationError::InvalidInput(format!(
                "transform began on {} but was finalized on {}",
                self.object,
                obj.id()
            ))
            .into());
        }
        if self.preview.is_empty() {
            return Ok(false);
        }
        match self.originals {
            Originals::Positions(_) => {
                let moves: BTreeMap<VertexId, Point3> =
                    self.preview.iter().map(|(&v, &(p, _))| (v, p)).collect();
                let polygons = obj.move_vertices(&moves);
                if polygons.is_empty() {
                    return Ok(false);
                }
                let corners: BTreeSet<VertexId> = moves.keys().copied().collect();
                obj.update_normal_sharing_from_smoothing(Some(&corners));
                obj.relax_normals_around(&polygons);
                debug!(object = %self.object, vertices = moves.len(), polygons = polygons.len(), "transform finalized");
                Ok(true)
            }
            Originals::Normals(_) => {
                let mut changed = false;
                for (&v, &(_, normal)) in &self.preview {
                    let Ok(data) = obj.store.vertex_mut(v) else {
                        continue;
                    };
                    let row = data.row;
                    if data.normal != normal {
                        data.normal = normal;
                        obj.changes.mark(PropertyId::Normals, SubobjKey::Vertex(v));
                        changed = true;
                    }
                    if !data.normal_locked {
                        data.normal_locked = true;
                        obj.changes.mark(PropertyId::NormalLock, SubobjKey::Vertex(v));
                        changed = true;
                    }
                    obj.buffers.write_normal(row, normal);
                }
                debug!(object = %self.object, normals = self.preview.len(), "normal transform finalized");
                Ok(changed)
            }
        }
    }

    /// Discards the preview, rewriting the touched rows from the store.
    pub fn cancel(self, obj: &mut GeomDataObject) {
        for &v in self.preview.keys() {
            let Ok(data) = obj.store.vertex(v) else {
                continue;
            };
            match self.originals {
                Originals::Positions(_) => obj.buffers.write_position(data.row, data.position),
                Originals::Normals(_) => obj.buffers.write_normal(data.row, data.normal),
            }
        }
    }
}

/// Corners moved by a selection at `level`, expanded to whole merged
/// vertices.
fn resolve_corners(
    store: &TopologyStore,
    level: SubobjectLevel,
    ids: &[u32],
) -> Result<BTreeSet<VertexId>> {
    let mut corners = BTreeSet::new();
    for &id in ids {
        match level {
            SubobjectLevel::Vertex | SubobjectLevel::Normal => {
                store.vertex(VertexId(id))?;
                corners.insert(VertexId(id));
            }
            SubobjectLevel::Edge => {
                corners.extend(store.edge(EdgeId(id))?.vertices);
            }
            SubobjectLevel::Polygon => {
                corners.extend(store.polygon(PolygonId(id))?.vertices.iter().copied());
            }
        }
    }
    let merged = store.merged_vertices();
    Ok(corners.iter().flat_map(|&v| merged.siblings(v)).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;
    use crate::history::{MemoryHistoryStore, RestoreType};
    use crate::selection::SelectionMode;
    use crate::testing::{quad_strip, two_triangle_plane};

    fn select(obj: &mut GeomDataObject, level: SubobjectLevel, ids: &[u32]) {
        obj.select(level, ids, SelectionMode::Replace);
    }

    #[test]
    fn polygon_selection_moves_welded_corners() {
        let mut obj = quad_strip(2);
        select(&mut obj, SubobjectLevel::Polygon, &[0]);
        let ctx = EditContext::default().with_level(SubobjectLevel::Polygon);
        let mut session = TransformSession::begin(&obj, &ctx).unwrap();
        let expected: BTreeSet<VertexId> = [0, 1, 2, 3, 4, 7].into_iter().map(VertexId).collect();
        assert_eq!(session.vertices(), expected);

        session.apply(&mut obj, Transform::Translate(Vector3::new(0.0, 0.0, 1.0)));
        assert!(session.finalize(&mut obj).unwrap());
        for v in &expected {
            assert_relative_eq!(obj.store().vertex(*v).unwrap().position.z, 1.0);
        }
        assert_relative_eq!(obj.store().vertex(VertexId(5)).unwrap().position.z, 0.0);
    }

    #[test]
    fn preview_leaves_the_store_alone() {
        let mut obj = two_triangle_plane();
        select(&mut obj, SubobjectLevel::Vertex, &[0]);
        let ctx = EditContext::default();
        let before = obj.observable_state();
        let position = obj.store().vertex(VertexId(0)).unwrap().position;
        let row = obj.store().vertex(VertexId(0)).unwrap().row;

        let mut session = TransformSession::begin(&obj, &ctx).unwrap();
        session.apply(&mut obj, Transform::Translate(Vector3::new(5.0, 0.0, 0.0)));
        assert_eq!(obj.observable_state(), before);
        assert_relative_eq!(obj.buffers().row(row).unwrap().position.x, position.x + 5.0);

        session.cancel(&mut obj);
        assert_eq!(obj.buffers().row(row).unwrap().position, position);
        assert_eq!(obj.observable_state(), before);
    }

    #[test]
    fn repeated_previews_start_from_the_original() {
        let mut obj = two_triangle_plane();
        select(&mut obj, SubobjectLevel::Vertex, &[0]);
        let position = obj.store().vertex(VertexId(0)).unwrap().position;
        let mut session = TransformSession::begin(&obj, &EditContext::default()).unwrap();
        session.apply(&mut obj, Transform::Translate(Vector3::new(1.0, 0.0, 0.0)));
        session.apply(&mut obj, Transform::Translate(Vector3::new(2.0, 0.0, 0.0)));
        session.finalize(&mut obj).unwrap();
        let moved = obj.store().vertex(VertexId(0)).unwrap().position;
        assert_relative_eq!(moved.x, position.x + 2.0);
    }

    #[test]
    fn translation_is_snapped() {
        let mut obj = two_triangle_plane();
        select(&mut obj, SubobjectLevel::Vertex, &[0]);
        let ctx = EditContext {
            snap_increment: Some(0.5),
            ..EditContext::default()
        };
        let position = obj.store().vertex(VertexId(0)).unwrap().position;
        let mut session = TransformSession::begin(&obj, &ctx).unwrap();
        session.apply(&mut obj, Transform::Translate(Vector3::new(0.3, 0.1, 0.0)));
        session.finalize(&mut obj).unwrap();
        let moved = obj.store().vertex(VertexId(0)).unwrap().position;
        assert_relative_eq!(moved.x, position.x + 0.5);
        assert_relative_eq!(moved.y, position.y);
    }

    #[test]
    fn normal_rotation_locks_normals() {
        let mut obj = two_triangle_plane();
        select(&mut obj, SubobjectLevel::Normal, &[0]);
        let ctx = EditContext::default().with_level(SubobjectLevel::Normal);
        let mut session = TransformSession::begin(&obj, &ctx).unwrap();
        assert!(session.transforms_normals());
        let targets = session.vertices();
        let rotation = Transform::rotation(Point3::origin(), Vector3::x(), FRAC_PI_2).unwrap();
        session.apply(&mut obj, rotation);
        assert!(session.finalize(&mut obj).unwrap());

        for v in targets {
            let data = obj.store().vertex(v).unwrap();
            assert!(data.normal_locked);
            assert_relative_eq!(data.normal, Vector3::new(0.0, -1.0, 0.0), epsilon = 1e-12);
        }
        let dirty = obj.changes().dirty_properties();
        assert!(dirty.contains(&PropertyId::Normals));
        assert!(dirty.contains(&PropertyId::NormalLock));
    }

    #[test]
    fn finalize_is_tracked_and_undoable() {
        let mut obj = quad_strip(2);
        let mut history = MemoryHistoryStore::new();
        obj.commit_creation(&mut history);
        history.finish_edit();
        select(&mut obj, SubobjectLevel::Edge, &[0]);
        let selected = obj.commit(&mut history).unwrap();
        history.finish_edit();
        let before = obj.observable_state();

        let ctx = EditContext::default().with_level(SubobjectLevel::Edge);
        let mut session = TransformSession::begin(&obj, &ctx).unwrap();
        session.apply(&mut obj, Transform::Translate(Vector3::new(0.0, -1.0, 0.0)));
        assert!(session.finalize(&mut obj).unwrap());
        assert!(obj
            .changes()
            .dirty_properties()
            .contains(&PropertyId::SubobjTransform));
        let moved = obj.commit(&mut history).unwrap();
        history.finish_edit();
        let after = obj.observable_state();
        assert_ne!(after, before);

        obj.restore_data(&history, &[], RestoreType::Undo, moved, selected)
            .unwrap();
        assert_eq!(obj.observable_state(), before);
        obj.restore_data(&history, &[], RestoreType::Redo, selected, moved)
            .unwrap();
        assert_eq!(obj.observable_state(), after);
    }

    #[test]
    fn finalize_on_another_object_is_rejected() {
        let mut obj = two_triangle_plane();
        select(&mut obj, SubobjectLevel::Vertex, &[0]);
        let mut session = TransformSession::begin(&obj, &EditContext::default()).unwrap();
        session.apply(&mut obj, Transform::Translate(Vector3::new(1.0, 0.0, 0.0)));
        let mut other = GeomDataObject::new(ObjectId(99));
        assert!(session.finalize(&mut other).is_err());
    }
}
