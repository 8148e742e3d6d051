use std::collections::BTreeSet;

use tracing::debug;

use crate::context::EditContext;
use crate::error::Result;
use crate::gradual::{run_to_end, GradualTask, Progress};
use crate::object::{GeomDataObject, ObjectId, ObjectSnapshot};
use crate::topology::{PolygonId, VertexId};

/// Deletes polygons together with their corners and edges.
pub struct DeletePolygons {
    polygons: Vec<PolygonId>,
}

impl DeletePolygons {
    /// Creates a new `DeletePolygons` operation.
    #[must_use]
    pub fn new(polygons: Vec<PolygonId>) -> Self {
        Self { polygons }
    }

    /// Executes the deletion, returning the number of polygons removed.
    /// Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if a batch fails; the object is then left as it was.
    pub fn execute(&self, obj: &mut GeomDataObject, ctx: &EditContext) -> Result<usize> {
        let mut task = DeletePolygonsTask::new(obj.id(), self.polygons.clone(), ctx);
        run_to_end(&mut task, obj)?;
        Ok(task.deleted)
    }
}

/// Gradual form of [`DeletePolygons`].
///
/// Polygons are removed in ascending id order, one batch per step. Once
/// the last batch is gone, normal sharing and smoothing are re-derived
/// around the surviving neighbours.
pub struct DeletePolygonsTask {
    object: ObjectId,
    pending: Vec<PolygonId>,
    batch_size: usize,
    neighbours: BTreeSet<VertexId>,
    deleted: usize,
    snapshot: Option<ObjectSnapshot>,
}

impl DeletePolygonsTask {
    #[must_use]
    pub fn new(object: ObjectId, mut polygons: Vec<PolygonId>, ctx: &EditContext) -> Self {
        polygons.sort_unstable();
        polygons.dedup();
        polygons.reverse();
        Self {
            object,
            pending: polygons,
            batch_size: ctx.batch_size.max(1),
            neighbours: BTreeSet::new(),
            deleted: 0,
            snapshot: None,
        }
    }

    /// Number of polygons removed so far.
    #[must_use]
    pub fn deleted(&self) -> usize {
        self.deleted
    }
}

impl GradualTask for DeletePolygonsTask {
    fn object_id(&self) -> ObjectId {
        self.object
    }

    fn step(&mut self, obj: &mut GeomDataObject) -> Result<Progress> {
        if self.snapshot.is_none() {
            self.snapshot = Some(obj.snapshot());
        }

        let take = self.batch_size.min(self.pending.len());
        let mut batch = self.pending.split_off(self.pending.len() - take);
        batch.reverse();

        let doomed: BTreeSet<PolygonId> = batch.iter().copied().collect();
        for &p in &batch {
            let Ok(poly) = obj.store().polygon(p) else {
                continue;
            };
            for &v in &poly.vertices {
                self.neighbours.extend(
                    obj.store()
                        .merged_vertices()
                        .siblings(v)
                        .into_iter()
                        .filter(|s| obj.store().vertex(*s).is_ok_and(|d| !doomed.contains(&d.polygon))),
                );
            }
        }
        let removed = obj.detach_polygons(&batch, true);
        self.deleted += removed.len();
        debug!(object = %self.object, polygons = removed.len(), "polygon batch deleted");

        if !self.pending.is_empty() {
            return Ok(Progress::More);
        }
        self.neighbours.retain(|&v| obj.store().contains_vertex(v));
        let neighbours = std::mem::take(&mut self.neighbours);
        obj.update_normal_sharing_from_smoothing(Some(&neighbours));
        obj.update_vertex_normals(Some(&neighbours));
        obj.update_smoothing();
        Ok(Progress::Done)
    }

    fn rollback(&mut self, obj: &mut GeomDataObject) {
        if let Some(snapshot) = self.snapshot.take() {
            debug!(object = %self.object, deleted = self.deleted, "deletion rolled back");
            obj.restore_snapshot(snapshot);
            self.deleted = 0;
        }
    }

    fn name(&self) -> &'static str {
        "delete_polygons"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::gradual::{TaskEvent, TaskRunner};
    use crate::history::PropertyId;
    use crate::testing::{quad_strip, two_triangle_plane};
    use crate::topology::SubobjectLevel;

    #[test]
    fn deleting_one_plane_triangle() {
        let mut obj = two_triangle_plane();
        let n = DeletePolygons::new(vec![PolygonId(1)])
            .execute(&mut obj, &EditContext::default())
            .unwrap();
        assert_eq!(n, 1);
        let store = obj.store();
        assert_eq!(store.vertex_count(), 3);
        assert_eq!(store.edge_count(), 3);
        assert_eq!(store.polygon_count(), 1);
        for v in [VertexId(0), VertexId(2)] {
            assert_eq!(store.merged_vertices().siblings(v), BTreeSet::from([v]));
        }
    }

    #[test]
    fn deletion_drops_selection_and_is_tracked() {
        let mut obj = two_triangle_plane();
        obj.update_selection(SubobjectLevel::Polygon, &[0, 1], &[]);
        obj.changes.clear();
        DeletePolygons::new(vec![PolygonId(0)])
            .execute(&mut obj, &EditContext::default())
            .unwrap();
        assert_eq!(obj.selection().level(SubobjectLevel::Polygon).ids(), &[1]);
        let dirty = obj.changes().dirty_properties();
        assert!(dirty.contains(&PropertyId::Subobj));
        assert!(dirty.contains(&PropertyId::SubobjSelection));
    }

    #[test]
    fn smoothing_survives_on_the_remaining_island() {
        let mut obj = quad_strip(3);
        obj.set_smooth_shaded(true);
        DeletePolygons::new(vec![PolygonId(2)])
            .execute(&mut obj, &EditContext::default())
            .unwrap();
        assert_eq!(
            obj.store().smoothing_sets(),
            BTreeSet::from([BTreeSet::from([PolygonId(0), PolygonId(1)])])
        );
    }

    #[test]
    fn cancelled_deletion_is_rolled_back() {
        let mut obj = quad_strip(4);
        let before = obj.observable_state();
        let ctx = EditContext {
            batch_size: 1,
            ..EditContext::default()
        };
        let mut runner = TaskRunner::new();
        let task = DeletePolygonsTask::new(obj.id(), vec![PolygonId(0), PolygonId(1), PolygonId(2)], &ctx);
        let (id, token) = runner.submit(Box::new(task));
        runner.tick(&mut obj);
        assert_eq!(obj.store().polygon_count(), 3);
        token.cancel();
        let events = runner.run_to_completion(&mut obj);
        assert_eq!(
            events,
            vec![TaskEvent::Cancelled {
                task: id,
                object: obj.id()
            }]
        );
        assert_eq!(obj.observable_state(), before);
        assert!(obj.changes().is_empty());
    }
}
