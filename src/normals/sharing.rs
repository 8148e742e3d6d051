use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use crate::history::{PropertyId, SubobjKey};
use crate::object::GeomDataObject;
use crate::topology::{PolygonId, SmoothingGroupId, SubobjectLevel, TopologyStore, VertexId};

impl GeomDataObject {
    /// Re-derives shared normals from the smoothing groups.
    ///
    /// Within each merged vertex, corners whose polygons have intersecting
    /// sets of smoothing groups end up sharing one normal; corners of
    /// unsmoothed polygons get their own. With `scope`, only merged vertices
    /// containing one of those corners are considered. Normal selections
    /// that would straddle a new group are dropped first.
    ///
    /// Returns whether any group changed.
    pub fn update_normal_sharing_from_smoothing(
        &mut self,
        scope: Option<&BTreeSet<VertexId>>,
    ) -> bool {
        let index = self.store.smoothing_index();
        let merged = match scope {
            Some(vertices) => self
                .store
                .merged_vertices()
                .groups_of(vertices.iter().copied().filter(|&v| self.store.contains_vertex(v))),
            None => self
                .store
                .merged_vertices()
                .iter()
                .map(|(_, members)| members.clone())
                .collect(),
        };

        let mut target = Vec::new();
        let mut touched = BTreeSet::new();
        for members in merged {
            let derived = derive_sharing(&self.store, &index, &members);
            let current: BTreeSet<BTreeSet<VertexId>> = self
                .store
                .shared_normals()
                .groups_of(members.iter().copied())
                .into_iter()
                .collect();
            if current == derived {
                continue;
            }
            for group in current.iter().chain(derived.iter()) {
                touched.extend(group.iter().copied());
            }
            target.extend(derived);
        }
        if target.is_empty() {
            return false;
        }

        let selection = self.selection.level(SubobjectLevel::Normal);
        let mut straddling = BTreeSet::new();
        for group in &target {
            let selected: Vec<u32> = group
                .iter()
                .map(|v| v.0)
                .filter(|&id| selection.contains(id))
                .collect();
            if !selected.is_empty() && selected.len() < group.len() {
                straddling.extend(selected);
            }
        }
        self.deselect_exact(SubobjectLevel::Normal, &straddling);

        trace!(groups = target.len(), "normal sharing re-derived");
        for group in target {
            self.store.shared_normals_mut().set_group(group);
        }
        self.changes.mark_all(
            PropertyId::NormalSharing,
            touched.iter().map(|&v| SubobjKey::Vertex(v)),
        );
        self.update_vertex_normals(Some(&touched));
        true
    }
}

/// Shared normal groups for the members of one merged vertex.
fn derive_sharing(
    store: &TopologyStore,
    index: &HashMap<PolygonId, BTreeSet<SmoothingGroupId>>,
    members: &BTreeSet<VertexId>,
) -> BTreeSet<BTreeSet<VertexId>> {
    let mut out = BTreeSet::new();
    let mut open: Vec<(BTreeSet<VertexId>, BTreeSet<SmoothingGroupId>)> = Vec::new();

    for &v in members {
        let groups = store
            .vertex(v)
            .ok()
            .and_then(|data| index.get(&data.polygon))
            .cloned()
            .unwrap_or_default();
        if groups.is_empty() {
            out.insert(BTreeSet::from([v]));
            continue;
        }
        let mut verts = BTreeSet::from([v]);
        let mut keys = groups;
        let mut i = 0;
        while i < open.len() {
            if open[i].1.is_disjoint(&keys) {
                i += 1;
            } else {
                let (more_verts, more_keys) = open.swap_remove(i);
                verts.extend(more_verts);
                keys.extend(more_keys);
                i = 0;
            }
        }
        open.push((verts, keys));
    }
    out.extend(open.into_iter().map(|(verts, _)| verts));
    out
}
