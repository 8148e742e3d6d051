use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::context::WeldParams;
use crate::error::Result;
use crate::math::{Point3, Vector3, TOLERANCE};
use crate::object::{GeomDataObject, ObjectId};
use crate::topology::{EdgeId, PolygonId, TopologyStore, UvMap, VertexId};

use super::CreatePolygon;

/// Input description of one polygon.
#[derive(Debug, Clone, Default)]
pub struct PolygonDescription {
    pub positions: Vec<Point3>,
    /// Per-corner texture coordinates; empty for none.
    pub uvs: Vec<UvMap>,
    /// Per-corner normals; these are stored locked.
    pub normals: Option<Vec<Vector3>>,
    /// Triangulation as corner indices; computed if `None`.
    pub triangles: Option<Vec<[usize; 3]>>,
}

impl PolygonDescription {
    #[must_use]
    pub fn new(positions: Vec<Point3>) -> Self {
        Self {
            positions,
            ..Self::default()
        }
    }
}

/// Input description of a whole mesh, as produced by a primitive generator
/// or an importer.
#[derive(Debug, Clone, Default)]
pub struct MeshDescription {
    pub polygons: Vec<PolygonDescription>,
    /// Smoothing groups as indices into `polygons`.
    pub smoothing_groups: Vec<Vec<usize>>,
}

impl MeshDescription {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a polygon given by its corner positions.
    #[must_use]
    pub fn with_polygon(mut self, positions: Vec<Point3>) -> Self {
        self.polygons.push(PolygonDescription::new(positions));
        self
    }

    #[must_use]
    pub fn with_smoothing_group(mut self, polygons: Vec<usize>) -> Self {
        self.smoothing_groups.push(polygons);
        self
    }
}

impl GeomDataObject {
    /// Builds an object from a mesh description.
    ///
    /// Polygons get ascending ids in description order. Coincident corners
    /// of different polygons are welded, edges joining the same pair of
    /// welded corners are welded, the described smoothing groups are
    /// installed and normals are derived from them. The groups are then
    /// normalized to connected islands: overlapping groups that touch merge
    /// into one, a group whose polygons do not touch is split, and islands
    /// of a single polygon are dropped. The result has no pending changes;
    /// record it with [`GeomDataObject::commit_creation`].
    ///
    /// # Errors
    ///
    /// Returns an error if a polygon description is malformed.
    pub fn create_geometry(id: ObjectId, description: &MeshDescription, params: &WeldParams) -> Result<Self> {
        let mut obj = Self::new(id);
        let mut polygon_ids = Vec::with_capacity(description.polygons.len());
        for desc in &description.polygons {
            let mut op = CreatePolygon::new(desc.positions.clone()).with_uvs(desc.uvs.clone());
            if let Some(normals) = &desc.normals {
                op = op.with_normals(normals.clone());
            }
            if let Some(triangles) = &desc.triangles {
                op = op.with_triangles(triangles.clone());
            }
            let payload = op.build_payload(&mut obj.store)?;
            obj.attach_polygon(&payload)?;
            polygon_ids.push(payload.id);
        }

        weld_coincident_vertices(&mut obj.store, params.tolerance.max(TOLERANCE));
        weld_matching_edges(&mut obj.store);

        let groups: BTreeSet<BTreeSet<PolygonId>> = description
            .smoothing_groups
            .iter()
            .map(|group| group.iter().filter_map(|&i| polygon_ids.get(i).copied()).collect())
            .collect();
        obj.replace_smoothing_groups(groups);
        obj.update_normal_sharing_from_smoothing(None);
        if obj.update_smoothing() {
            obj.update_normal_sharing_from_smoothing(None);
        }
        obj.update_vertex_normals(None);
        obj.changes.clear();

        debug!(
            object = %id,
            polygons = obj.store.polygon_count(),
            welds = obj.store.merged_vertices().len(),
            "geometry created"
        );
        Ok(obj)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn cell_of(p: &Point3, cell_size: f64) -> (i64, i64, i64) {
    (
        (p.x / cell_size).floor() as i64,
        (p.y / cell_size).floor() as i64,
        (p.z / cell_size).floor() as i64,
    )
}

/// Welds corners closer than `tolerance` using a spatial hash.
///
/// Corners are visited in id order and join the first nearby weld group
/// that has no corner of the same polygon yet.
fn weld_coincident_vertices(store: &mut TopologyStore, tolerance: f64) {
    let cell_size = tolerance * 2.0;
    let mut grid: HashMap<(i64, i64, i64), Vec<VertexId>> = HashMap::new();
    let corners: Vec<(VertexId, Point3, PolygonId)> = store
        .vertices()
        .map(|(id, v)| (id, v.position, v.polygon))
        .collect();

    for (id, position, polygon) in corners {
        let cell = cell_of(&position, cell_size);
        let mut nearby = BTreeSet::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(candidates) = grid.get(&(cell.0 + dx, cell.1 + dy, cell.2 + dz)) else {
                        continue;
                    };
                    for &other in candidates {
                        let close = store
                            .vertex(other)
                            .is_ok_and(|v| (v.position - position).norm() < tolerance);
                        if close {
                            nearby.insert(other);
                        }
                    }
                }
            }
        }

        let target = nearby
            .into_iter()
            .filter_map(|other| store.merged_vertices().group_of(other))
            .find(|&key| {
                store.merged_vertices().members(key).is_some_and(|members| {
                    members
                        .iter()
                        .all(|&m| store.vertex(m).is_ok_and(|v| v.polygon != polygon))
                })
            });
        if let Some(key) = target {
            if let Some(members) = store.merged_vertices().members(key) {
                let mut members = members.clone();
                members.insert(id);
                store.merged_vertices_mut().set_group(members);
            }
        }
        grid.entry(cell).or_default().push(id);
    }
}

/// Welds edges of different polygons that join the same pair of merged
/// vertices. A polygon never contributes two edges to one group.
fn weld_matching_edges(store: &mut TopologyStore) {
    let mut buckets: BTreeMap<_, Vec<EdgeId>> = BTreeMap::new();
    for (id, _) in store.edges() {
        if let Some(pair) = store.edge_weld_pair(id) {
            buckets.entry(pair).or_default().push(id);
        }
    }
    for edges in buckets.into_values() {
        let mut groups: Vec<(BTreeSet<EdgeId>, BTreeSet<PolygonId>)> = Vec::new();
        for e in edges {
            let Ok(polygon) = store.edge(e).map(|data| data.polygon) else {
                continue;
            };
            match groups.iter_mut().find(|(_, polys)| !polys.contains(&polygon)) {
                Some((members, polys)) => {
                    members.insert(e);
                    polys.insert(polygon);
                }
                None => groups.push((BTreeSet::from([e]), BTreeSet::from([polygon]))),
            }
        }
        for (members, _) in groups {
            if members.len() > 1 {
                store.merged_edges_mut().set_group(members);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{cube, two_triangle_plane};

    #[test]
    fn plane_welds_the_diagonal() {
        let obj = two_triangle_plane();
        let store = obj.store();
        assert_eq!(
            store.merged_vertices().siblings(VertexId(2)),
            BTreeSet::from([VertexId(2), VertexId(4)])
        );
        assert_eq!(
            store.merged_edges().siblings(EdgeId(2)),
            BTreeSet::from([EdgeId(2), EdgeId(3)])
        );
        assert!(obj.changes().is_empty());
    }

    #[test]
    fn cube_has_eight_points_and_twelve_seams() {
        let obj = cube();
        assert_eq!(obj.store().vertex_count(), 24);
        assert_eq!(obj.store().merged_vertices().len(), 8);
        assert_eq!(obj.store().merged_edges().len(), 12);
    }

    #[test]
    fn corners_of_one_polygon_are_never_welded() {
        let p = Point3::origin();
        let desc = MeshDescription::new().with_polygon(vec![p, Point3::new(1.0, 0.0, 0.0), p + Vector3::y() * 1e-9]);
        let obj = GeomDataObject::create_geometry(ObjectId(5), &desc, &WeldParams::default()).unwrap();
        assert_eq!(obj.store().merged_vertices().len(), 3);
    }

    #[test]
    fn described_smoothing_is_installed() {
        let desc = MeshDescription::new()
            .with_polygon(vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
            ])
            .with_polygon(vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ])
            .with_smoothing_group(vec![0, 1]);
        let obj = GeomDataObject::create_geometry(ObjectId(2), &desc, &WeldParams::default()).unwrap();
        assert_eq!(obj.store().smoothing_groups().len(), 1);
        assert_eq!(obj.store().shared_normals().len(), 4);
    }

    fn strip_of_three() -> MeshDescription {
        let mut desc = MeshDescription::new();
        for i in 0..3 {
            let x = f64::from(i);
            desc = desc.with_polygon(vec![
                Point3::new(x, 0.0, 0.0),
                Point3::new(x + 1.0, 0.0, 0.0),
                Point3::new(x + 1.0, 1.0, 0.0),
                Point3::new(x, 1.0, 0.0),
            ]);
        }
        desc
    }

    #[test]
    fn group_of_polygons_that_do_not_touch_is_dropped() {
        let desc = strip_of_three().with_smoothing_group(vec![0, 2]);
        let mut obj = GeomDataObject::create_geometry(ObjectId(2), &desc, &WeldParams::default()).unwrap();
        assert!(obj.store().smoothing_sets().is_empty());
        assert_eq!(obj.store().shared_normals().len(), obj.store().vertex_count());
        assert!(!obj.update_smoothing());
    }

    #[test]
    fn overlapping_groups_merge_into_one_island() {
        let desc = strip_of_three()
            .with_smoothing_group(vec![0, 1])
            .with_smoothing_group(vec![1, 2]);
        let mut obj = GeomDataObject::create_geometry(ObjectId(2), &desc, &WeldParams::default()).unwrap();
        assert_eq!(
            obj.store().smoothing_sets(),
            BTreeSet::from([BTreeSet::from([PolygonId(0), PolygonId(1), PolygonId(2)])])
        );
        assert!(!obj.update_smoothing());
        assert!(obj.changes().is_empty());
    }

    #[test]
    fn three_groups_meeting_at_a_corner_stay_apart() {
        let rim: Vec<Point3> = (0..6)
            .map(|k| {
                let a = std::f64::consts::FRAC_PI_3 * f64::from(k);
                Point3::new(a.cos(), a.sin(), 0.0)
            })
            .collect();
        let mut desc = MeshDescription::new();
        for k in 0..6 {
            desc = desc.with_polygon(vec![Point3::origin(), rim[k], rim[(k + 1) % 6]]);
        }
        let desc = desc
            .with_smoothing_group(vec![0, 1])
            .with_smoothing_group(vec![2, 3])
            .with_smoothing_group(vec![4, 5]);
        let mut obj = GeomDataObject::create_geometry(ObjectId(2), &desc, &WeldParams::default()).unwrap();

        let expected: BTreeSet<BTreeSet<PolygonId>> = [[0, 1], [2, 3], [4, 5]]
            .into_iter()
            .map(|pair| pair.into_iter().map(PolygonId).collect())
            .collect();
        assert_eq!(obj.store().smoothing_sets(), expected);

        let centre = obj.store().merged_vertices().siblings(VertexId(0));
        assert_eq!(centre.len(), 6);
        let normals: BTreeSet<_> = centre
            .iter()
            .map(|&v| obj.store().shared_normals().group_of(v))
            .collect();
        assert_eq!(normals.len(), 3);
        assert!(!obj.update_normal_sharing_from_smoothing(None));
        assert!(!obj.update_smoothing());
    }
}
