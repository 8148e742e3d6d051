//! Per-level selection sets with minimal highlight updates.

mod convert;

pub use convert::{convert_selection, ConversionMode};

use std::collections::{BTreeSet, HashSet};

use tracing::trace;

use crate::history::{EditTime, PropertyId, SubobjKey};
use crate::object::GeomDataObject;
use crate::render::level_rows;
use crate::topology::{EdgeId, PolygonId, SubobjectLevel, TopologyStore, VertexId};

/// How a set of ids combines with the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    Add,
    Remove,
    Replace,
    Toggle,
}

/// Ordered, duplicate-free list of selected ids at one level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelSelection {
    order: Vec<u32>,
    members: HashSet<u32>,
}

impl LevelSelection {
    /// Selected ids in selection order.
    #[must_use]
    pub fn ids(&self) -> &[u32] {
        &self.order
    }

    #[must_use]
    pub fn contains(&self, id: u32) -> bool {
        self.members.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn insert(&mut self, id: u32) -> bool {
        if self.members.insert(id) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    fn remove_all(&mut self, ids: &BTreeSet<u32>) -> bool {
        let before = self.order.len();
        self.order.retain(|id| !ids.contains(id));
        self.members.retain(|id| !ids.contains(id));
        before != self.order.len()
    }
}

/// Active selection of one object, one list per level.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    levels: [LevelSelection; 4],
    stamps: [Option<EditTime>; 4],
}

impl SelectionState {
    #[must_use]
    pub fn level(&self, level: SubobjectLevel) -> &LevelSelection {
        &self.levels[level.index()]
    }

    pub(crate) fn stamp(&self, level: SubobjectLevel) -> Option<EditTime> {
        self.stamps[level.index()]
    }

    pub(crate) fn set_stamp(&mut self, level: SubobjectLevel, time: Option<EditTime>) {
        self.stamps[level.index()] = time;
    }

    /// Drops ids of removed subobjects without touching any buffer.
    pub(crate) fn forget(&mut self, level: SubobjectLevel, ids: &BTreeSet<u32>) -> bool {
        self.levels[level.index()].remove_all(ids)
    }
}

/// Expands ids to whole weld/normal groups and drops ids that do not exist.
pub(crate) fn expand_to_groups(
    store: &TopologyStore,
    level: SubobjectLevel,
    ids: &[u32],
) -> BTreeSet<u32> {
    let mut out = BTreeSet::new();
    for &id in ids {
        match level {
            SubobjectLevel::Vertex => {
                if store.contains_vertex(VertexId(id)) {
                    out.extend(store.merged_vertices().siblings(VertexId(id)).iter().map(|v| v.0));
                }
            }
            SubobjectLevel::Normal => {
                if store.contains_vertex(VertexId(id)) {
                    out.extend(store.shared_normals().siblings(VertexId(id)).iter().map(|v| v.0));
                }
            }
            SubobjectLevel::Edge => {
                if store.contains_edge(EdgeId(id)) {
                    out.extend(store.merged_edges().siblings(EdgeId(id)).iter().map(|e| e.0));
                }
            }
            SubobjectLevel::Polygon => {
                if store.contains_polygon(PolygonId(id)) {
                    out.insert(id);
                }
            }
        }
    }
    out
}

/// Raw ids of every existing subobject at `level`.
pub(crate) fn all_ids(store: &TopologyStore, level: SubobjectLevel) -> BTreeSet<u32> {
    match level {
        SubobjectLevel::Vertex | SubobjectLevel::Normal => {
            store.vertices().map(|(id, _)| id.0).collect()
        }
        SubobjectLevel::Edge => store.edges().map(|(id, _)| id.0).collect(),
        SubobjectLevel::Polygon => store.polygons().map(|(id, _)| id.0).collect(),
    }
}

impl GeomDataObject {
    /// Selects `to_select` and deselects `to_deselect` at `level`.
    ///
    /// Ids are expanded to whole merged/shared groups first. Only rows of
    /// subobjects whose state actually flips are written. Returns whether
    /// the selection changed.
    pub fn update_selection(
        &mut self,
        level: SubobjectLevel,
        to_select: &[u32],
        to_deselect: &[u32],
    ) -> bool {
        let deselect = expand_to_groups(&self.store, level, to_deselect);
        let select = expand_to_groups(&self.store, level, to_select);

        let current = self.selection.level(level).clone();
        let removed: BTreeSet<u32> = deselect
            .iter()
            .copied()
            .filter(|id| current.contains(*id) && !select.contains(id))
            .collect();
        let added: Vec<u32> = select
            .iter()
            .copied()
            .filter(|id| !current.contains(*id))
            .collect();
        if removed.is_empty() && added.is_empty() {
            return false;
        }

        let sel = &mut self.selection.levels[level.index()];
        sel.remove_all(&removed);
        for &id in &added {
            sel.insert(id);
        }
        trace!(%level, added = added.len(), removed = removed.len(), "selection updated");

        for &id in &removed {
            self.write_highlight(level, id, false);
        }
        for &id in &added {
            self.write_highlight(level, id, true);
        }
        self.changes
            .mark(PropertyId::SubobjSelection, SubobjKey::Selection(level));
        true
    }

    /// Combines `ids` with the current selection according to `mode`.
    pub fn select(&mut self, level: SubobjectLevel, ids: &[u32], mode: SelectionMode) -> bool {
        match mode {
            SelectionMode::Add => self.update_selection(level, ids, &[]),
            SelectionMode::Remove => self.update_selection(level, &[], ids),
            SelectionMode::Replace => {
                let keep = expand_to_groups(&self.store, level, ids);
                let drop: Vec<u32> = self
                    .selection
                    .level(level)
                    .ids()
                    .iter()
                    .copied()
                    .filter(|id| !keep.contains(id))
                    .collect();
                self.update_selection(level, ids, &drop)
            }
            SelectionMode::Toggle => {
                let ids = expand_to_groups(&self.store, level, ids);
                let sel = self.selection.level(level);
                let (on, off): (Vec<u32>, Vec<u32>) =
                    ids.into_iter().partition(|id| !sel.contains(*id));
                self.update_selection(level, &on, &off)
            }
        }
    }

    /// Selects everything that is unselected at `level` and vice versa.
    pub fn invert_selection(&mut self, level: SubobjectLevel) -> bool {
        let sel = self.selection.level(level);
        let (off, on): (Vec<u32>, Vec<u32>) = all_ids(&self.store, level)
            .into_iter()
            .partition(|id| sel.contains(*id));
        self.update_selection(level, &on, &off)
    }

    /// Clears the selection at `level`.
    pub fn clear_selection(&mut self, level: SubobjectLevel) -> bool {
        let ids = self.selection.level(level).ids().to_vec();
        self.update_selection(level, &[], &ids)
    }

    /// Replaces a level's list verbatim, writing highlights for the delta
    /// only. Not tracked; used by restore and rollback.
    pub(crate) fn set_selection_list(&mut self, level: SubobjectLevel, ids: &[u32]) {
        let current = self.selection.level(level).clone();
        let mut next = LevelSelection::default();
        for &id in ids {
            next.insert(id);
        }
        let removed: Vec<u32> = current
            .ids()
            .iter()
            .copied()
            .filter(|id| !next.contains(*id))
            .collect();
        let added: Vec<u32> = next
            .ids()
            .iter()
            .copied()
            .filter(|id| !current.contains(*id))
            .collect();
        self.selection.levels[level.index()] = next;
        for id in removed {
            self.write_highlight(level, id, false);
        }
        for id in added {
            self.write_highlight(level, id, true);
        }
    }

    /// Deselects every group that is only partially selected, so no group
    /// gains selected members implicitly. Returns whether anything changed.
    pub(crate) fn narrow_selection(&mut self, level: SubobjectLevel) -> bool {
        if level == SubobjectLevel::Polygon {
            return false;
        }
        let sel = self.selection.level(level);
        let partial: Vec<u32> = sel
            .ids()
            .iter()
            .copied()
            .filter(|&id| {
                expand_to_groups(&self.store, level, &[id])
                    .iter()
                    .any(|m| !sel.contains(*m))
            })
            .collect();
        let partial: BTreeSet<u32> = partial.into_iter().collect();
        self.deselect_exact(level, &partial)
    }

    /// Deselects exactly `ids`, without expanding them to groups. Tracked.
    pub(crate) fn deselect_exact(&mut self, level: SubobjectLevel, ids: &BTreeSet<u32>) -> bool {
        let present: BTreeSet<u32> = ids
            .iter()
            .copied()
            .filter(|&id| self.selection.level(level).contains(id))
            .collect();
        if present.is_empty() {
            return false;
        }
        self.selection.levels[level.index()].remove_all(&present);
        for &id in &present {
            self.write_highlight(level, id, false);
        }
        self.changes
            .mark(PropertyId::SubobjSelection, SubobjKey::Selection(level));
        true
    }

    fn write_highlight(&mut self, level: SubobjectLevel, id: u32, selected: bool) {
        for row in level_rows(&self.store, level, id) {
            self.buffers.write_highlight(row, level, selected);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::two_triangle_plane;

    #[test]
    fn selecting_a_vertex_selects_its_weld_group() {
        let mut obj = two_triangle_plane();
        assert!(obj.update_selection(SubobjectLevel::Vertex, &[0], &[]));
        assert_eq!(obj.selection().level(SubobjectLevel::Vertex).ids(), &[0, 3]);
    }

    #[test]
    fn reselecting_is_not_a_change() {
        let mut obj = two_triangle_plane();
        obj.update_selection(SubobjectLevel::Polygon, &[0], &[]);
        assert!(!obj.update_selection(SubobjectLevel::Polygon, &[0], &[]));
    }

    #[test]
    fn only_delta_rows_are_written() {
        let mut obj = two_triangle_plane();
        obj.update_selection(SubobjectLevel::Polygon, &[0], &[]);
        let before = obj.buffers().write_count();
        obj.select(SubobjectLevel::Polygon, &[0, 1], SelectionMode::Add);
        // polygon 1 has three corners; polygon 0 is untouched.
        assert_eq!(obj.buffers().write_count(), before + 3);
    }

    #[test]
    fn toggle_flips_membership() {
        let mut obj = two_triangle_plane();
        obj.update_selection(SubobjectLevel::Polygon, &[0], &[]);
        obj.select(SubobjectLevel::Polygon, &[0, 1], SelectionMode::Toggle);
        assert_eq!(obj.selection().level(SubobjectLevel::Polygon).ids(), &[1]);
    }

    #[test]
    fn replace_and_invert() {
        let mut obj = two_triangle_plane();
        obj.select(SubobjectLevel::Polygon, &[0], SelectionMode::Replace);
        obj.select(SubobjectLevel::Polygon, &[1], SelectionMode::Replace);
        assert_eq!(obj.selection().level(SubobjectLevel::Polygon).ids(), &[1]);
        obj.invert_selection(SubobjectLevel::Polygon);
        assert_eq!(obj.selection().level(SubobjectLevel::Polygon).ids(), &[0]);
    }

    #[test]
    fn selection_change_is_tracked() {
        let mut obj = two_triangle_plane();
        obj.update_selection(SubobjectLevel::Edge, &[2], &[]);
        assert!(obj
            .changes()
            .dirty_properties()
            .contains(&PropertyId::SubobjSelection));
        assert_eq!(obj.selection().level(SubobjectLevel::Edge).ids(), &[2, 3]);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut obj = two_triangle_plane();
        assert!(!obj.update_selection(SubobjectLevel::Vertex, &[99], &[]));
    }
}
