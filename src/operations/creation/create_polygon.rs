use crate::error::{OperationError, Result};
use crate::history::{EdgePayload, PolygonPayload, Stamps, VertexPayload};
use crate::math::polygon::face_normal;
use crate::math::{Point3, Vector3};
use crate::object::GeomDataObject;
use crate::topology::{PolygonId, TopologyStore, Triangle, UvMap};

use super::triangulation::triangulate;

/// Creates a new polygon from corner positions.
///
/// The corners start out unwelded. Explicit normals are stored locked so
/// later averaging keeps them.
pub struct CreatePolygon {
    positions: Vec<Point3>,
    uvs: Vec<UvMap>,
    normals: Option<Vec<Vector3>>,
    triangles: Option<Vec<[usize; 3]>>,
}

impl CreatePolygon {
    /// Creates a new `CreatePolygon` operation.
    #[must_use]
    pub fn new(positions: Vec<Point3>) -> Self {
        Self {
            positions,
            uvs: Vec::new(),
            normals: None,
            triangles: None,
        }
    }

    /// Per-corner texture coordinates.
    #[must_use]
    pub fn with_uvs(mut self, uvs: Vec<UvMap>) -> Self {
        self.uvs = uvs;
        self
    }

    /// Per-corner normals.
    #[must_use]
    pub fn with_normals(mut self, normals: Vec<Vector3>) -> Self {
        self.normals = Some(normals);
        self
    }

    /// Triangulation as corner indices, replacing the default one.
    #[must_use]
    pub fn with_triangles(mut self, triangles: Vec<[usize; 3]>) -> Self {
        self.triangles = Some(triangles);
        self
    }

    /// Executes the creation, returning the new polygon's id.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than 3 corners, if the
    /// per-corner lists do not match the corner count, or if the given
    /// triangulation does not cover the polygon.
    pub fn execute(&self, obj: &mut GeomDataObject) -> Result<PolygonId> {
        let payload = self.build_payload(&mut obj.store)?;
        let id = payload.id;
        obj.attach_polygon(&payload)?;
        obj.track_created_polygon(id);
        Ok(id)
    }

    /// Mints ids and assembles the polygon without touching any aggregate.
    pub(crate) fn build_payload(&self, store: &mut TopologyStore) -> Result<PolygonPayload> {
        let n = self.positions.len();
        if n < 3 {
            return Err(OperationError::InvalidInput(format!(
                "polygon needs at least 3 corners, got {n}"
            ))
            .into());
        }
        if !self.uvs.is_empty() && self.uvs.len() != n {
            return Err(OperationError::InvalidInput(format!(
                "{} uv maps given for {n} corners",
                self.uvs.len()
            ))
            .into());
        }
        if let Some(normals) = &self.normals {
            if normals.len() != n {
                return Err(OperationError::InvalidInput(format!(
                    "{} normals given for {n} corners",
                    normals.len()
                ))
                .into());
            }
        }

        let face = face_normal(&self.positions).unwrap_or_else(Vector3::z);
        let id = store.mint_polygon_id();
        let vertices: Vec<VertexPayload> = (0..n)
            .map(|i| {
                let given = self.normals.as_ref().map(|normals| normals[i]);
                VertexPayload {
                    id: store.mint_vertex_id(),
                    position: self.positions[i],
                    normal: given.and_then(|v| v.try_normalize(0.0)).unwrap_or(face),
                    uvs: self.uvs.get(i).cloned().unwrap_or_default(),
                    normal_locked: given.is_some(),
                    stamps: Stamps::default(),
                }
            })
            .collect();
        let edges = (0..n)
            .map(|_| EdgePayload {
                id: store.mint_edge_id(),
                stamps: Stamps::default(),
            })
            .collect();
        let ids: Vec<_> = vertices.iter().map(|v| v.id).collect();

        let triangles: Vec<Triangle> = match &self.triangles {
            Some(tris) => {
                let mapped: Option<Vec<Triangle>> = tris
                    .iter()
                    .map(|t| Some([*ids.get(t[0])?, *ids.get(t[1])?, *ids.get(t[2])?]))
                    .collect();
                let valid = mapped.filter(|m| {
                    m.len() == n - 2 && m.iter().all(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2])
                });
                valid.ok_or_else(|| {
                    OperationError::InvalidInput("triangulation does not cover the polygon".into())
                })?
            }
            None => triangulate(&ids, &self.positions),
        };

        Ok(PolygonPayload {
            id,
            vertices,
            edges,
            triangles,
            stamps: Stamps::default(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::history::PropertyId;
    use crate::object::ObjectId;

    fn triangle() -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn creates_corners_edges_and_rows() {
        let mut obj = GeomDataObject::new(ObjectId(1));
        let id = CreatePolygon::new(triangle()).execute(&mut obj).unwrap();
        let poly = obj.store().polygon(id).unwrap();
        assert_eq!(poly.vertices.len(), 3);
        assert_eq!(poly.triangles.len(), 1);
        assert_eq!(obj.store().merged_vertices().len(), 3);
        assert_eq!(obj.buffers().len(), 3);
        assert!(obj.changes().dirty_properties().contains(&PropertyId::Subobj));
    }

    #[test]
    fn given_normals_are_locked() {
        let mut obj = GeomDataObject::new(ObjectId(1));
        let id = CreatePolygon::new(triangle())
            .with_normals(vec![Vector3::x(); 3])
            .execute(&mut obj)
            .unwrap();
        let corner = obj.store().polygon(id).unwrap().vertices[0];
        let data = obj.store().vertex(corner).unwrap();
        assert!(data.normal_locked);
        assert_eq!(data.normal, Vector3::x());
    }

    #[test]
    fn too_few_corners_is_rejected() {
        let mut obj = GeomDataObject::new(ObjectId(1));
        let result = CreatePolygon::new(triangle()[..2].to_vec()).execute(&mut obj);
        assert!(result.is_err());
        assert_eq!(obj.store().polygon_count(), 0);
    }

    #[test]
    fn bad_triangulation_is_rejected() {
        let mut obj = GeomDataObject::new(ObjectId(1));
        let result = CreatePolygon::new(triangle())
            .with_triangles(vec![[0, 1, 1]])
            .execute(&mut obj);
        assert!(result.is_err());
    }
}
