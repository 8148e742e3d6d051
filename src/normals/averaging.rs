use std::collections::BTreeSet;

use crate::history::{PropertyId, SubobjKey};
use crate::math::{Vector3, TOLERANCE};
use crate::object::GeomDataObject;
use crate::topology::VertexId;

impl GeomDataObject {
    /// Recomputes displayed normals from face normals.
    ///
    /// Each shared normal group touching `scope` (every group if `None`)
    /// gets the normalized mean of its members' face normals. Locked
    /// normals keep their stored value.
    pub(crate) fn update_vertex_normals(&mut self, scope: Option<&BTreeSet<VertexId>>) {
        let groups = match scope {
            Some(vertices) => self
                .store
                .shared_normals()
                .groups_of(vertices.iter().copied().filter(|&v| self.store.contains_vertex(v))),
            None => self
                .store
                .shared_normals()
                .iter()
                .map(|(_, members)| members.clone())
                .collect(),
        };

        for group in groups {
            let faces: Vec<(VertexId, Vector3)> = group
                .iter()
                .filter_map(|&v| {
                    let data = self.store.vertex(v).ok()?;
                    let poly = self.store.polygon(data.polygon).ok()?;
                    Some((v, poly.normal))
                })
                .collect();
            let sum: Vector3 = faces.iter().map(|(_, n)| n).sum();
            let mean = sum.try_normalize(TOLERANCE);

            for (v, face) in faces {
                let normal = mean.unwrap_or(face);
                let Ok(data) = self.store.vertex_mut(v) else {
                    continue;
                };
                if data.normal_locked || (data.normal - normal).norm() <= TOLERANCE {
                    continue;
                }
                data.normal = normal;
                let row = data.row;
                self.buffers.write_normal(row, normal);
                self.changes.mark(PropertyId::Normals, SubobjKey::Vertex(v));
            }
        }
    }
}
