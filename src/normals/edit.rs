use std::collections::BTreeSet;

use tracing::debug;

use crate::error::Result;
use crate::history::{PropertyId, SubobjKey};
use crate::object::GeomDataObject;
use crate::topology::{SubobjectLevel, VertexId};

/// Locks or unlocks the displayed normals of corners.
pub struct LockNormals {
    vertices: Vec<VertexId>,
    locked: bool,
}

impl LockNormals {
    /// Creates a new `LockNormals` operation.
    #[must_use]
    pub fn new(vertices: Vec<VertexId>, locked: bool) -> Self {
        Self { vertices, locked }
    }

    /// Executes the operation, returning whether any flag changed.
    ///
    /// Unlocked normals are re-averaged right away.
    ///
    /// # Errors
    ///
    /// Returns an error if a vertex does not exist.
    pub fn execute(&self, obj: &mut GeomDataObject) -> Result<bool> {
        for &v in &self.vertices {
            obj.store.vertex(v)?;
        }
        let mut flipped = BTreeSet::new();
        for &v in &self.vertices {
            let data = obj.store.vertex_mut(v)?;
            if data.normal_locked != self.locked {
                data.normal_locked = self.locked;
                flipped.insert(v);
            }
        }
        if flipped.is_empty() {
            return Ok(false);
        }
        obj.changes.mark_all(
            PropertyId::NormalLock,
            flipped.iter().map(|&v| SubobjKey::Vertex(v)),
        );
        if !self.locked {
            obj.update_vertex_normals(Some(&flipped));
        }
        Ok(true)
    }
}

/// Makes corners of one merged vertex share a single normal.
pub struct ShareNormals {
    vertices: Vec<VertexId>,
}

impl ShareNormals {
    /// Creates a new `ShareNormals` operation.
    #[must_use]
    pub fn new(vertices: Vec<VertexId>) -> Self {
        Self { vertices }
    }

    /// Executes the operation.
    ///
    /// Returns `false` without changing anything if the corners belong to
    /// different merged vertices or already share one normal.
    ///
    /// # Errors
    ///
    /// Returns an error if a vertex does not exist.
    pub fn execute(&self, obj: &mut GeomDataObject) -> Result<bool> {
        for &v in &self.vertices {
            obj.store.vertex(v)?;
        }
        let welds: BTreeSet<_> = self
            .vertices
            .iter()
            .filter_map(|&v| obj.store.merged_vertices().group_of(v))
            .collect();
        if welds.len() != 1 {
            debug!(corners = self.vertices.len(), "normal sharing across welds rejected");
            return Ok(false);
        }
        let groups = obj
            .store
            .shared_normals()
            .groups_of(self.vertices.iter().copied());
        if groups.len() < 2 {
            return Ok(false);
        }
        let members: BTreeSet<VertexId> = groups.into_iter().flatten().collect();
        obj.store.shared_normals_mut().set_group(members.clone());
        obj.changes.mark_all(
            PropertyId::NormalSharing,
            members.iter().map(|&v| SubobjKey::Vertex(v)),
        );
        obj.narrow_selection(SubobjectLevel::Normal);
        obj.update_vertex_normals(Some(&members));
        obj.update_smoothing();
        Ok(true)
    }
}

/// Gives corners their own normal again.
pub struct UnshareNormals {
    vertices: Vec<VertexId>,
}

impl UnshareNormals {
    /// Creates a new `UnshareNormals` operation.
    #[must_use]
    pub fn new(vertices: Vec<VertexId>) -> Self {
        Self { vertices }
    }

    /// Executes the operation, returning whether any group was split.
    ///
    /// # Errors
    ///
    /// Returns an error if a vertex does not exist.
    pub fn execute(&self, obj: &mut GeomDataObject) -> Result<bool> {
        for &v in &self.vertices {
            obj.store.vertex(v)?;
        }
        let mut touched = BTreeSet::new();
        for &v in &self.vertices {
            let old = obj.store.shared_normals().siblings(v);
            if old.len() < 2 {
                continue;
            }
            obj.store.shared_normals_mut().insert_singleton(v);
            touched.extend(old);
        }
        if touched.is_empty() {
            return Ok(false);
        }
        obj.changes.mark_all(
            PropertyId::NormalSharing,
            touched.iter().map(|&v| SubobjKey::Vertex(v)),
        );
        obj.update_vertex_normals(Some(&touched));
        obj.update_smoothing();
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::two_triangle_plane;

    #[test]
    fn share_within_weld_builds_smoothing() {
        let mut obj = two_triangle_plane();
        let shared = ShareNormals::new(vec![VertexId(0), VertexId(3)])
            .execute(&mut obj)
            .unwrap();
        assert!(shared);
        assert_eq!(obj.store().smoothing_groups().len(), 1);
    }

    #[test]
    fn share_across_welds_is_rejected() {
        let mut obj = two_triangle_plane();
        let shared = ShareNormals::new(vec![VertexId(0), VertexId(1)])
            .execute(&mut obj)
            .unwrap();
        assert!(!shared);
        assert_eq!(obj.store().shared_normals().len(), 6);
    }

    #[test]
    fn unshare_removes_smoothing() {
        let mut obj = two_triangle_plane();
        obj.set_smooth_shaded(true);
        UnshareNormals::new(vec![VertexId(0), VertexId(2)])
            .execute(&mut obj)
            .unwrap();
        assert!(obj.store().smoothing_groups().is_empty());
    }

    #[test]
    fn lock_is_tracked_once() {
        let mut obj = two_triangle_plane();
        let lock = LockNormals::new(vec![VertexId(1)], true);
        assert!(lock.execute(&mut obj).unwrap());
        assert!(!lock.execute(&mut obj).unwrap());
        assert!(obj.store().vertex(VertexId(1)).unwrap().normal_locked);
    }

    #[test]
    fn missing_vertex_is_an_error() {
        let mut obj = two_triangle_plane();
        assert!(LockNormals::new(vec![VertexId(40)], true)
            .execute(&mut obj)
            .is_err());
    }
}
