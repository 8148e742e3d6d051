use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::error::Result;
use crate::history::{PropertyId, SubobjKey};
use crate::math::{Point3, Vector3};
use crate::object::GeomDataObject;
use crate::topology::{EdgeId, PolygonId, SubobjectLevel, VertexId};

/// Splits corners out of their merged vertices.
///
/// Every targeted corner of a group with more than one member becomes a
/// singleton. Untargeted members stay welded to each other, so breaking
/// one corner of a three-way weld leaves the other two merged rather than
/// splitting all but one apart; pass every member to dissolve a group. If
/// all members of a group are targeted, the lowest id stays behind. Merged
/// edges touching the split corners are re-partitioned.
pub struct BreakVertices {
    vertices: Vec<VertexId>,
}

impl BreakVertices {
    /// Creates a new `BreakVertices` operation.
    #[must_use]
    pub fn new(vertices: Vec<VertexId>) -> Self {
        Self { vertices }
    }

    /// Executes the break, returning whether any group was split.
    ///
    /// # Errors
    ///
    /// Returns an error if a vertex does not exist.
    pub fn execute(&self, obj: &mut GeomDataObject) -> Result<bool> {
        for &v in &self.vertices {
            obj.store.vertex(v)?;
        }
        let targets: BTreeSet<VertexId> = self.vertices.iter().copied().collect();
        let mut affected = BTreeSet::new();
        for group in obj.store.merged_vertices().groups_of(targets.iter().copied()) {
            if group.len() < 2 {
                continue;
            }
            let hit: Vec<VertexId> = group.intersection(&targets).copied().collect();
            let leaving = if hit.len() == group.len() { &hit[1..] } else { &hit[..] };
            for &v in leaving {
                obj.store.merged_vertices_mut().insert_singleton(v);
            }
            affected.extend(group);
        }
        if affected.is_empty() {
            return Ok(false);
        }

        obj.changes.mark_all(
            PropertyId::SubobjMerge,
            affected.iter().map(|&v| SubobjKey::Vertex(v)),
        );
        let edges: BTreeSet<EdgeId> = affected
            .iter()
            .filter_map(|&v| obj.store.vertex(v).ok())
            .flat_map(|data| data.edges)
            .collect();
        obj.split_edge_welds(&edges);
        obj.update_normal_sharing_from_smoothing(Some(&affected));
        obj.update_smoothing();
        debug!(object = %obj.id(), corners = affected.len(), "vertices broken");
        Ok(true)
    }
}

/// Welds corners into one merged vertex.
///
/// The merged corners move to the centroid of the joined groups. Edges
/// of different polygons that end up joining the same pair of merged
/// vertices are welded too.
pub struct MergeVertices {
    vertices: Vec<VertexId>,
}

impl MergeVertices {
    /// Creates a new `MergeVertices` operation.
    #[must_use]
    pub fn new(vertices: Vec<VertexId>) -> Self {
        Self { vertices }
    }

    /// Executes the merge.
    ///
    /// Returns `false` without changing anything if fewer than two groups
    /// are involved or if a polygon would reference the merged vertex
    /// twice.
    ///
    /// # Errors
    ///
    /// Returns an error if a vertex does not exist.
    pub fn execute(&self, obj: &mut GeomDataObject) -> Result<bool> {
        for &v in &self.vertices {
            obj.store.vertex(v)?;
        }
        let groups = obj
            .store
            .merged_vertices()
            .groups_of(self.vertices.iter().copied());
        if groups.len() < 2 {
            return Ok(false);
        }

        let union: BTreeSet<VertexId> = groups.iter().flatten().copied().collect();
        let mut owners = BTreeSet::new();
        for &v in &union {
            let polygon = obj.store.vertex(v)?.polygon;
            if !owners.insert(polygon) {
                debug!(object = %obj.id(), %polygon, "merge rejected: degenerate polygon");
                return Ok(false);
            }
        }

        let mut sum = Vector3::zeros();
        for group in &groups {
            if let Some(&first) = group.first() {
                sum += obj.store.vertex(first)?.position.coords;
            }
        }
        #[allow(clippy::cast_precision_loss)]
        let target = Point3::from(sum / groups.len() as f64);

        obj.store.merged_vertices_mut().set_group(union.clone());
        obj.changes.mark_all(
            PropertyId::SubobjMerge,
            union.iter().map(|&v| SubobjKey::Vertex(v)),
        );
        let moves: BTreeMap<VertexId, Point3> = union.iter().map(|&v| (v, target)).collect();
        let moved = obj.move_vertices(&moves);

        obj.weld_edges_at(&union);
        for level in [SubobjectLevel::Vertex, SubobjectLevel::Edge] {
            obj.narrow_selection(level);
        }
        obj.update_normal_sharing_from_smoothing(Some(&union));
        obj.relax_normals_around(&moved);
        obj.update_smoothing();
        debug!(object = %obj.id(), corners = union.len(), "vertices merged");
        Ok(true)
    }
}

impl GeomDataObject {
    /// Splits merged edges among `edges` whose members no longer join the
    /// same pair of merged vertices.
    pub(crate) fn split_edge_welds(&mut self, edges: &BTreeSet<EdgeId>) {
        for group in self.store.merged_edges().groups_of(edges.iter().copied()) {
            if group.len() < 2 {
                continue;
            }
            let mut buckets: BTreeMap<_, BTreeSet<EdgeId>> = BTreeMap::new();
            for &e in &group {
                buckets
                    .entry(self.store.edge_weld_pair(e))
                    .or_default()
                    .insert(e);
            }
            if buckets.len() < 2 {
                continue;
            }
            for bucket in buckets.into_values() {
                self.store.merged_edges_mut().set_group(bucket);
            }
            self.changes.mark_all(
                PropertyId::SubobjMerge,
                group.iter().map(|&e| SubobjKey::Edge(e)),
            );
        }
    }

    /// Welds edges touching `vertices` that join the same pair of merged
    /// vertices from different polygons.
    pub(crate) fn weld_edges_at(&mut self, vertices: &BTreeSet<VertexId>) {
        let mut buckets: BTreeMap<_, BTreeSet<EdgeId>> = BTreeMap::new();
        for &v in vertices {
            let Ok(data) = self.store.vertex(v) else {
                continue;
            };
            for e in data.edges {
                if let Some(pair) = self.store.edge_weld_pair(e) {
                    buckets.entry(pair).or_default().insert(e);
                }
            }
        }

        for edges in buckets.into_values() {
            let mut joined: Vec<(BTreeSet<EdgeId>, BTreeSet<PolygonId>)> = Vec::new();
            for group in self.store.merged_edges().groups_of(edges.iter().copied()) {
                let polygons: BTreeSet<PolygonId> = group
                    .iter()
                    .filter_map(|&e| self.store.edge(e).ok().map(|d| d.polygon))
                    .collect();
                match joined.iter_mut().find(|(_, p)| p.is_disjoint(&polygons)) {
                    Some((members, p)) => {
                        members.extend(group);
                        p.extend(polygons);
                    }
                    None => joined.push((group, polygons)),
                }
            }
            for (members, _) in joined {
                if self.store.merged_edges().groups_of(members.iter().copied()).len() < 2 {
                    continue;
                }
                self.changes.mark_all(
                    PropertyId::SubobjMerge,
                    members.iter().map(|&e| SubobjKey::Edge(e)),
                );
                self.store.merged_edges_mut().set_group(members);
            }
        }
    }
}
