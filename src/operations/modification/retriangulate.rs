use tracing::debug;

use crate::context::EditContext;
use crate::error::{OperationError, Result};
use crate::gradual::{run_to_end, GradualTask, Progress};
use crate::history::{PropertyId, SubobjKey};
use crate::object::{GeomDataObject, ObjectId, ObjectSnapshot};
use crate::operations::creation::triangulate;
use crate::topology::{PolygonId, Triangle};

/// Replaces the triangulation of one polygon without changing its boundary.
pub struct Retriangulate {
    polygon: PolygonId,
    triangles: Vec<Triangle>,
}

impl Retriangulate {
    /// Creates a new `Retriangulate` operation.
    #[must_use]
    pub fn new(polygon: PolygonId, triangles: Vec<Triangle>) -> Self {
        Self { polygon, triangles }
    }

    /// Executes the operation, returning whether the triangulation changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the polygon does not exist, or if the triangles
    /// reference foreign corners or do not number `corners - 2`.
    pub fn execute(&self, obj: &mut GeomDataObject) -> Result<bool> {
        let polygon = obj.store.polygon(self.polygon)?;
        if !polygon.accepts_triangulation(&self.triangles) {
            return Err(OperationError::InvalidInput(format!(
                "triangulation does not fit polygon {}",
                self.polygon
            ))
            .into());
        }
        if polygon.triangles == self.triangles {
            return Ok(false);
        }
        obj.store.polygon_mut(self.polygon)?.triangles.clone_from(&self.triangles);
        obj.changes
            .mark(PropertyId::PolyTris, SubobjKey::Polygon(self.polygon));
        Ok(true)
    }
}

/// Resets polygons to their default triangulation.
pub struct AutoTriangulate {
    polygons: Option<Vec<PolygonId>>,
}

impl AutoTriangulate {
    /// Resets `polygons`, or every polygon if `None`.
    #[must_use]
    pub fn new(polygons: Option<Vec<PolygonId>>) -> Self {
        Self { polygons }
    }

    /// Executes the operation, returning the number of polygons whose
    /// triangulation changed.
    ///
    /// # Errors
    ///
    /// Returns an error if a polygon does not exist; nothing changes then.
    pub fn execute(&self, obj: &mut GeomDataObject, ctx: &EditContext) -> Result<usize> {
        let mut task = RetriangulateTask::new(obj.id(), self.polygons.clone(), ctx);
        run_to_end(&mut task, obj)?;
        Ok(task.changed)
    }
}

/// Gradual form of [`AutoTriangulate`].
pub struct RetriangulateTask {
    object: ObjectId,
    requested: Option<Vec<PolygonId>>,
    pending: Vec<PolygonId>,
    batch_size: usize,
    changed: usize,
    snapshot: Option<ObjectSnapshot>,
}

impl RetriangulateTask {
    #[must_use]
    pub fn new(object: ObjectId, polygons: Option<Vec<PolygonId>>, ctx: &EditContext) -> Self {
        Self {
            object,
            requested: polygons,
            pending: Vec::new(),
            batch_size: ctx.batch_size.max(1),
            changed: 0,
            snapshot: None,
        }
    }
}

impl GradualTask for RetriangulateTask {
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
            polygons.reverse();
            self.pending = polygons;
        }

        let take = self.batch_size.min(self.pending.len());
        let batch = self.pending.split_off(self.pending.len() - take);
        for &p in batch.iter().rev() {
            let positions = obj.store.polygon_positions(p)?;
            let polygon = obj.store.polygon_mut(p)?;
            let triangles = triangulate(&polygon.vertices, &positions);
            if triangles != polygon.triangles {
                polygon.triangles = triangles;
                obj.changes.mark(PropertyId::PolyTris, SubobjKey::Polygon(p));
                self.changed += 1;
            }
        }

        Ok(if self.pending.is_empty() {
            Progress::Done
        } else {
            Progress::More
        })
    }

    fn rollback(&mut self, obj: &mut GeomDataObject) {
        if let Some(snapshot) = self.snapshot.take() {
            debug!(object = %self.object, changed = self.changed, "retriangulation rolled back");
            obj.restore_snapshot(snapshot);
            self.changed = 0;
        }
    }

    fn name(&self) -> &'static str {
        "retriangulate"
    }
}
