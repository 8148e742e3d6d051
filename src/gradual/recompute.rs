use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::context::EditContext;
use crate::error::Result;
use crate::object::{GeomDataObject, ObjectId, ObjectSnapshot};
use crate::topology::PolygonId;

use super::{GradualTask, Progress};

/// Recomputes face normals and averaged corner normals, a batch of
/// polygons at a time.
pub struct RecomputeNormalsTask {
    object: ObjectId,
    requested: Option<Vec<PolygonId>>,
    pending: Vec<PolygonId>,
    batch_size: usize,
    snapshot: Option<ObjectSnapshot>,
}

impl RecomputeNormalsTask {
    /// Creates a task over `polygons`, or over every polygon if `None`.
    #[must_use]
    pub fn new(object: ObjectId, polygons: Option<Vec<PolygonId>>, ctx: &EditContext) -> Self {
        Self {
            object,
            requested: polygons,
            pending: Vec::new(),
            batch_size: ctx.batch_size.max(1),
            snapshot: None,
        }
    }
}

impl GradualTask for RecomputeNormalsTask {
    fn object_id(&self) -> ObjectId {
        self.object
    }

    fn step(&mut self, obj: &mut GeomDataObject) -> Result<Progress> {
        if self.snapshot.is_none() {
            self.snapshot = Some(obj.snapshot());
            let mut polygons = match self.requested.take() {
                Some(ids) => ids,
                None => obj.store().polygons().map(|(id, _)| id).collect(),
            };
            polygons.sort_unstable();
            polygons.dedup();
            // Popped from the back, so reverse to keep ascending order.
            polygons.reverse();
            self.pending = polygons;
        }

        let take = self.batch_size.min(self.pending.len());
        let batch: BTreeSet<PolygonId> = self.pending.split_off(self.pending.len() - take).into_iter().collect();
        for &p in &batch {
            obj.store.refresh_polygon_geometry(p)?;
        }
        obj.relax_normals_around(&batch);
        trace!(polygons = batch.len(), left = self.pending.len(), "normals recomputed");

        Ok(if self.pending.is_empty() {
            Progress::Done
        } else {
            Progress::More
        })
    }

    fn rollback(&mut self, obj: &mut GeomDataObject) {
        if let Some(snapshot) = self.snapshot.take() {
            debug!(object = %self.object, "normal recompute rolled back");
            obj.restore_snapshot(snapshot);
        }
    }

    fn name(&self) -> &'static str {
        "recompute_normals"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::gradual::{run_to_end, TaskEvent, TaskRunner};
    use crate::math::Vector3;
    use crate::testing::quad_strip;
    use crate::topology::VertexId;

    fn tilted_strip() -> GeomDataObject {
        let mut obj = quad_strip(4);
        obj.set_smooth_shaded(true);
        obj.changes.clear();
        // Lift one corner behind the normals' back.
        obj.store.vertex_mut(VertexId(2)).unwrap().position.z = 1.0;
        obj
    }

    #[test]
    fn recompute_updates_normals() {
        let mut obj = tilted_strip();
        let ctx = EditContext {
            batch_size: 1,
            ..EditContext::default()
        };
        let mut task = RecomputeNormalsTask::new(obj.id(), None, &ctx);
        run_to_end(&mut task, &mut obj).unwrap();
        let n = obj.store().vertex(VertexId(2)).unwrap().normal;
        assert!((n - Vector3::z()).norm() > 1e-6);
    }

    #[test]
    fn cancelled_recompute_restores_normals() {
        let mut obj = tilted_strip();
        let before = obj.observable_state();
        let ctx = EditContext {
            batch_size: 1,
            ..EditContext::default()
        };
        let mut runner = TaskRunner::new();
        let (id, token) = runner.submit(Box::new(RecomputeNormalsTask::new(obj.id(), None, &ctx)));
        runner.tick(&mut obj);
        runner.tick(&mut obj);
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
        assert!(obj.buffers_mut().take_updates().rebuilt);
    }
}
