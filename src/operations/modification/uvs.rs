use crate::error::Result;
use crate::history::{PropertyId, SubobjKey};
use crate::math::Point2;
use crate::object::GeomDataObject;
use crate::topology::VertexId;

/// Assigns texture coordinates of one UV set to individual corners.
pub struct SetUvs {
    uv_set: u8,
    uvs: Vec<(VertexId, Point2)>,
}

impl SetUvs {
    /// Creates a new `SetUvs` operation.
    #[must_use]
    pub fn new(uv_set: u8, uvs: Vec<(VertexId, Point2)>) -> Self {
        Self { uv_set, uvs }
    }

    /// Executes the assignment, returning how many corners changed.
    ///
    /// # Errors
    ///
    /// Returns an error if a vertex does not exist; nothing changes then.
    pub fn execute(&self, obj: &mut GeomDataObject) -> Result<usize> {
        for (v, _) in &self.uvs {
            obj.store.vertex(*v)?;
        }
        let mut changed = 0;
        for &(v, uv) in &self.uvs {
            let data = obj.store.vertex_mut(v)?;
            if data.uvs.get(&self.uv_set) == Some(&uv) {
                continue;
            }
            data.uvs.insert(self.uv_set, uv);
            obj.buffers.write_uv(data.row, self.uv_set, uv);
            obj.changes.mark(PropertyId::Uvs, SubobjKey::Vertex(v));
            changed += 1;
        }
        Ok(changed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::two_triangle_plane;

    #[test]
    fn uvs_are_written_and_tracked() {
        let mut obj = two_triangle_plane();
        let uv = Point2::new(0.25, 0.75);
        let n = SetUvs::new(1, vec![(VertexId(2), uv), (VertexId(4), uv)])
            .execute(&mut obj)
            .unwrap();
        assert_eq!(n, 2);
        let row = obj.store().vertex(VertexId(4)).unwrap().row;
        assert_eq!(obj.buffers().row(row).unwrap().uvs.get(&1), Some(&uv));
        assert!(obj.changes().dirty_properties().contains(&PropertyId::Uvs));

        let again = SetUvs::new(1, vec![(VertexId(2), uv)]).execute(&mut obj).unwrap();
        assert_eq!(again, 0);
    }

    #[test]
    fn unknown_vertex_changes_nothing() {
        let mut obj = two_triangle_plane();
        let uv = Point2::new(1.0, 0.0);
        assert!(SetUvs::new(0, vec![(VertexId(0), uv), (VertexId(42), uv)])
            .execute(&mut obj)
            .is_err());
        assert!(obj.store().vertex(VertexId(0)).unwrap().uvs.is_empty());
    }
}
