use std::collections::BTreeSet;

use tracing::debug;

use crate::history::{PropertyId, SubobjKey};
use crate::object::GeomDataObject;
use crate::topology::{Partition, PolygonId, SmoothingGroupData, TopologyStore, VertexId};

slotmap::new_key_type! {
    struct IslandKey;
}

impl GeomDataObject {
    /// Re-derives smoothing groups from shared normals.
    ///
    /// Two polygons are connected when corners of theirs share a normal;
    /// every connected island of more than one polygon becomes a group.
    /// Running it twice in a row changes nothing the second time.
    ///
    /// Returns whether the groups changed.
    pub fn update_smoothing(&mut self) -> bool {
        let islands = derive_smoothing(&self.store);
        self.replace_smoothing_groups(islands)
    }

    /// Smooths or flattens the whole mesh.
    ///
    /// `true` puts every polygon in one smoothing group and shares normals
    /// across each merged vertex; `false` removes every smoothing group and
    /// gives each corner its face normal. Locked normals are left alone.
    pub fn set_smooth_shaded(&mut self, smooth: bool) -> bool {
        let groups = if smooth && self.store.polygon_count() > 1 {
            BTreeSet::from([self.store.polygons().map(|(id, _)| id).collect()])
        } else {
            BTreeSet::new()
        };
        let mut changed = self.replace_smoothing_groups(groups);
        changed |= self.update_normal_sharing_from_smoothing(None);
        self.update_vertex_normals(None);
        debug!(object = %self.id(), smooth, changed, "smooth shading set");
        changed
    }

    /// Adds `polygons` to one smoothing group, or removes them from theirs.
    ///
    /// Smoothing unions the polygons with every group already containing
    /// one of them. Normal sharing is re-derived around the polygons, then
    /// the groups are reduced to connected islands.
    pub fn smooth_polygons(&mut self, polygons: &[PolygonId], smooth: bool) -> bool {
        let targets: BTreeSet<PolygonId> = polygons
            .iter()
            .copied()
            .filter(|&p| self.store.contains_polygon(p))
            .collect();
        if targets.is_empty() {
            return false;
        }

        let current = self.store.smoothing_sets();
        let mut groups = BTreeSet::new();
        let mut joined = targets.clone();
        for group in current {
            if group.is_disjoint(&targets) {
                groups.insert(group);
            } else if smooth {
                joined.extend(group);
            } else {
                groups.insert(group.difference(&targets).copied().collect());
            }
        }
        if smooth {
            groups.insert(joined.clone());
        }

        let mut changed = self.replace_smoothing_groups(groups);
        let corners: BTreeSet<VertexId> = joined
            .iter()
            .filter_map(|&p| self.store.polygon(p).ok())
            .flat_map(|p| p.vertices.iter().copied())
            .collect();
        changed |= self.update_normal_sharing_from_smoothing(Some(&corners));
        changed |= self.update_smoothing();
        changed
    }

    /// Installs `groups` as the complete set of smoothing groups.
    ///
    /// Groups of fewer than two polygons are dropped. Every polygon of a
    /// group that appears or disappears is marked changed.
    pub(crate) fn replace_smoothing_groups(
        &mut self,
        groups: BTreeSet<BTreeSet<PolygonId>>,
    ) -> bool {
        let groups: BTreeSet<BTreeSet<PolygonId>> =
            groups.into_iter().filter(|g| g.len() > 1).collect();
        let current = self.store.smoothing_sets();
        if current == groups {
            return false;
        }
        let touched: BTreeSet<PolygonId> = current
            .symmetric_difference(&groups)
            .flat_map(|g| g.iter().copied())
            .collect();

        let arena = self.store.smoothing_groups_mut();
        arena.clear();
        for polygons in groups {
            arena.insert(SmoothingGroupData { polygons });
        }
        self.changes.mark_all(
            PropertyId::Smoothing,
            touched.into_iter().map(SubobjKey::Polygon),
        );
        true
    }
}

/// Smoothing islands implied by the shared normal partition.
fn derive_smoothing(store: &TopologyStore) -> BTreeSet<BTreeSet<PolygonId>> {
    let mut islands: Partition<IslandKey, PolygonId> = Partition::default();
    for (id, _) in store.polygons() {
        islands.insert_singleton(id);
    }
    for (_, members) in store.shared_normals().iter() {
        if members.len() < 2 {
            continue;
        }
        let keys: Vec<IslandKey> = members
            .iter()
            .filter_map(|&v| store.vertex(v).ok())
            .filter_map(|data| islands.group_of(data.polygon))
            .collect();
        islands.union(&keys);
    }
    islands
        .as_sets()
        .into_iter()
        .filter(|island| island.len() > 1)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{quad_strip, two_triangle_plane};

    #[test]
    fn smooth_shaded_plane_has_one_group() {
        let mut obj = two_triangle_plane();
        assert!(obj.set_smooth_shaded(true));
        assert_eq!(
            obj.store().smoothing_sets(),
            BTreeSet::from([BTreeSet::from([PolygonId(0), PolygonId(1)])])
        );
        assert_eq!(
            obj.store().shared_normals().siblings(VertexId(0)),
            BTreeSet::from([VertexId(0), VertexId(3)])
        );
    }

    #[test]
    fn flat_shading_clears_groups() {
        let mut obj = two_triangle_plane();
        obj.set_smooth_shaded(true);
        assert!(obj.set_smooth_shaded(false));
        assert!(obj.store().smoothing_groups().is_empty());
        assert_eq!(obj.store().shared_normals().len(), 6);
    }

    #[test]
    fn derivation_is_idempotent() {
        let mut obj = quad_strip(4);
        obj.smooth_polygons(&[PolygonId(0), PolygonId(1)], true);
        obj.smooth_polygons(&[PolygonId(3)], true);
        let before = obj.store().smoothing_sets();
        assert!(!obj.update_smoothing());
        assert!(!obj.update_smoothing());
        assert_eq!(obj.store().smoothing_sets(), before);
    }

    #[test]
    fn unsmoothing_splits_a_group() {
        let mut obj = quad_strip(3);
        obj.smooth_polygons(&[PolygonId(0), PolygonId(1), PolygonId(2)], true);
        obj.smooth_polygons(&[PolygonId(1)], false);
        assert!(obj.store().smoothing_groups().is_empty());
        assert_eq!(obj.store().shared_normals().len(), 12);
    }

    #[test]
    fn smoothing_changes_are_tracked() {
        let mut obj = two_triangle_plane();
        obj.set_smooth_shaded(true);
        let dirty = obj.changes().dirty_properties();
        assert!(dirty.contains(&PropertyId::Smoothing));
        assert!(dirty.contains(&PropertyId::NormalSharing));
    }
}
