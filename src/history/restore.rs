use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::error::{HistoryError, Result};
use crate::object::GeomDataObject;
use crate::topology::{EdgeId, PolygonId, SmoothingGroupData, SubobjectLevel, VertexId};

use super::property::{PropertyId, PropertyValue, SubobjKey};
use super::record::{DeltaEntry, DeltaRecord};
use super::store::HistoryStore;
use super::time::EditTime;

/// Expected direction of a restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreType {
    /// The new time must be an ancestor of the old one.
    Undo,
    /// The new time must be a descendant of the old one.
    Redo,
    /// Any two times, possibly on different branches.
    Jump,
}

/// What a restore changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Properties that had entries to replay.
    pub properties: usize,
    /// Net number of key values applied.
    pub entries: usize,
    pub polygons_created: usize,
    pub polygons_removed: usize,
}

impl RestoreSummary {
    /// Returns `true` if nothing was replayed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

/// Net value a key is restored to, with the stamp it ends up with.
#[derive(Debug)]
struct Target {
    value: Option<PropertyValue>,
    stamp: Option<EditTime>,
}

type Plan = BTreeMap<PropertyId, BTreeMap<SubobjKey, Target>>;

impl GeomDataObject {
    /// Moves the object from its state at `old` to its state at `new`.
    ///
    /// For each property in `data_ids` (all if empty) the chains of edit
    /// times leading to `old` and to `new` are compared. Past their common
    /// prefix, the `old` side is walked backwards, fetching for each key
    /// the value current before its earliest change there, and the `new`
    /// side is walked forwards taking each change's new value. The net
    /// values are then applied in one pass. Every record is fetched before
    /// the first mutation, so an error leaves the object untouched.
    ///
    /// # Errors
    ///
    /// - [`HistoryError::TimelineGap`] if a time or record is unreachable.
    /// - [`HistoryError::MissingEntry`] if a record lacks an entry another
    ///   record points to.
    /// - [`HistoryError::DirectionMismatch`] if `restore_type` is not
    ///   [`RestoreType::Jump`] and the times are not in that order.
    /// - [`HistoryError::UnknownObject`] if neither time has any record of
    ///   this object.
    pub fn restore_data(
        &mut self,
        history: &dyn HistoryStore,
        data_ids: &[PropertyId],
        restore_type: RestoreType,
        old: EditTime,
        new: EditTime,
    ) -> Result<RestoreSummary> {
        let mut plan = Plan::new();
        let mut known = false;
        for property in PropertyId::ALL {
            if !data_ids.is_empty() && !data_ids.contains(&property) {
                continue;
            }
            let old_chain = history.load_last_from_history(self.id(), property, Some(old))?;
            let new_chain = history.load_last_from_history(self.id(), property, Some(new))?;
            known |= old_chain.is_some() || new_chain.is_some();
            let old_chain = old_chain.unwrap_or_default();
            let new_chain = new_chain.unwrap_or_default();

            let common = old_chain
                .iter()
                .zip(&new_chain)
                .take_while(|(a, b)| a == b)
                .count();
            let undo = &old_chain[common..];
            let redo = &new_chain[common..];
            match restore_type {
                RestoreType::Undo if !redo.is_empty() => {
                    return Err(HistoryError::DirectionMismatch(format!(
                        "{property}: {new} is not before {old}"
                    ))
                    .into());
                }
                RestoreType::Redo if !undo.is_empty() => {
                    return Err(HistoryError::DirectionMismatch(format!(
                        "{property}: {new} is not after {old}"
                    ))
                    .into());
                }
                _ => {}
            }

            let targets = self.plan_property(history, property, undo, redo)?;
            if !targets.is_empty() {
                plan.insert(property, targets);
            }
        }
        if !known {
            return Err(HistoryError::UnknownObject(self.id().to_string()).into());
        }

        let summary = self.apply_plan(plan);
        debug!(
            object = %self.id(),
            %old,
            %new,
            properties = summary.properties,
            entries = summary.entries,
            "history restored"
        );
        Ok(summary)
    }

    /// Restores every property from `old` to `new` in either direction.
    ///
    /// # Errors
    ///
    /// See [`GeomDataObject::restore_data`].
    pub fn restore(&mut self, history: &dyn HistoryStore, old: EditTime, new: EditTime) -> Result<RestoreSummary> {
        self.restore_data(history, &[], RestoreType::Jump, old, new)
    }

    fn plan_property(
        &self,
        history: &dyn HistoryStore,
        property: PropertyId,
        undo: &[EditTime],
        redo: &[EditTime],
    ) -> std::result::Result<BTreeMap<SubobjKey, Target>, HistoryError> {
        // Walking backwards, the earliest change of each key wins.
        let mut earliest: BTreeMap<SubobjKey, DeltaEntry> = BTreeMap::new();
        for &time in undo.iter().rev() {
            let record = history.load_from_history(self.id(), property, time)?;
            earliest.extend(record.entries);
        }

        let mut fetched: BTreeMap<EditTime, DeltaRecord> = BTreeMap::new();
        let mut targets = BTreeMap::new();
        for (key, entry) in earliest {
            let value = match (entry.anchor, entry.prev) {
                (Some(anchor), _) => Some(anchor),
                (None, Some(prev)) => {
                    let record = match fetched.entry(prev) {
                        Entry::Occupied(slot) => slot.into_mut(),
                        Entry::Vacant(slot) => {
                            slot.insert(history.load_from_history(self.id(), property, prev)?)
                        }
                    };
                    let Some(before) = record.entries.get(&key) else {
                        return Err(HistoryError::MissingEntry {
                            property: property.to_string(),
                            time: prev,
                            key: key.to_string(),
                        });
                    };
                    before.value.clone()
                }
                (None, None) => None,
            };
            targets.insert(
                key,
                Target {
                    value,
                    stamp: entry.prev,
                },
            );
        }

        for &time in redo {
            let record = history.load_from_history(self.id(), property, time)?;
            for (key, entry) in record.entries {
                targets.insert(
                    key,
                    Target {
                        value: entry.value,
                        stamp: Some(time),
                    },
                );
            }
        }
        Ok(targets)
    }

    fn apply_plan(&mut self, plan: Plan) -> RestoreSummary {
        let mut summary = RestoreSummary {
            properties: plan.len(),
            ..RestoreSummary::default()
        };
        let mut moved = BTreeSet::new();
        for (&property, targets) in &plan {
            summary.entries += targets.len();
            match property {
                PropertyId::Subobj => self.apply_existence(targets, &mut summary),
                PropertyId::SubobjMerge => self.apply_merge(targets),
                PropertyId::NormalSharing => self.apply_sharing(targets),
                PropertyId::Smoothing => self.apply_smoothing(targets),
                PropertyId::SubobjSelection => self.apply_selection(targets),
                PropertyId::SubobjTransform
                | PropertyId::Uvs
                | PropertyId::NormalLock
                | PropertyId::PolyTris
                | PropertyId::Normals => {
                    for (&key, target) in targets {
                        if let Some(value) = &target.value {
                            self.apply_value(key, value, &mut moved);
                        }
                    }
                }
            }
        }
        for polygon in moved {
            if let Err(err) = self.store.refresh_polygon_geometry(polygon) {
                warn!(%polygon, %err, "restored polygon geometry not refreshed");
            }
        }
        for (property, targets) in plan {
            for (key, target) in targets {
                self.set_stamp(property, key, target.stamp);
            }
        }
        summary
    }

    /// Removes polygons absent at the target time, then recreates missing
    /// ones from their payloads in ascending id order.
    fn apply_existence(&mut self, targets: &BTreeMap<SubobjKey, Target>, summary: &mut RestoreSummary) {
        let doomed: Vec<PolygonId> = targets
            .iter()
            .filter_map(|(key, target)| match (key, &target.value) {
                (SubobjKey::Polygon(p), None) => Some(*p),
                _ => None,
            })
            .collect();
        summary.polygons_removed = self.detach_polygons(&doomed, false).len();

        for (key, target) in targets {
            let (SubobjKey::Polygon(p), Some(PropertyValue::Polygon(payload))) = (key, &target.value) else {
                continue;
            };
            if self.store.contains_polygon(*p) {
                continue;
            }
            match self.attach_polygon(payload) {
                Ok(()) => summary.polygons_created += 1,
                Err(err) => warn!(polygon = %p, %err, "recorded polygon not recreated"),
            }
        }
    }

    fn apply_merge(&mut self, targets: &BTreeMap<SubobjKey, Target>) {
        let mut vertex_lists = Vec::new();
        let mut edge_lists = Vec::new();
        for (key, target) in targets {
            match (key, &target.value) {
                (SubobjKey::Vertex(v), Some(PropertyValue::VertexGroup(list))) => {
                    vertex_lists.push((*v, list.clone()));
                }
                (SubobjKey::Edge(e), Some(PropertyValue::EdgeGroup(list))) => {
                    edge_lists.push((*e, list.clone()));
                }
                _ => {}
            }
        }
        let vertices: BTreeSet<VertexId> = self.store.vertices().map(|(id, _)| id).collect();
        let edges: BTreeSet<EdgeId> = self.store.edges().map(|(id, _)| id).collect();
        self.store
            .merged_vertices_mut()
            .regroup(vertex_lists, |v| vertices.contains(&v));
        self.store
            .merged_edges_mut()
            .regroup(edge_lists, |e| edges.contains(&e));
    }

    fn apply_sharing(&mut self, targets: &BTreeMap<SubobjKey, Target>) {
        let lists: Vec<(VertexId, Vec<VertexId>)> = targets
            .iter()
            .filter_map(|(key, target)| match (key, &target.value) {
                (SubobjKey::Vertex(v), Some(PropertyValue::VertexGroup(list))) => Some((*v, list.clone())),
                _ => None,
            })
            .collect();
        let vertices: BTreeSet<VertexId> = self.store.vertices().map(|(id, _)| id).collect();
        self.store
            .shared_normals_mut()
            .regroup(lists, |v| vertices.contains(&v));
    }

    /// Replaces every smoothing group touching a restored polygon with the
    /// recorded groups of the restored polygons.
    fn apply_smoothing(&mut self, targets: &BTreeMap<SubobjKey, Target>) {
        let keys: BTreeSet<PolygonId> = targets
            .keys()
            .filter_map(|key| match key {
                SubobjKey::Polygon(p) => Some(*p),
                _ => None,
            })
            .collect();
        let live: BTreeSet<PolygonId> = self.store.polygons().map(|(id, _)| id).collect();
        let mut wanted: BTreeSet<BTreeSet<PolygonId>> = BTreeSet::new();
        for target in targets.values() {
            let Some(PropertyValue::PolygonGroups(groups)) = &target.value else {
                continue;
            };
            for group in groups {
                let group: BTreeSet<PolygonId> = group.iter().copied().filter(|p| live.contains(p)).collect();
                if group.len() > 1 {
                    wanted.insert(group);
                }
            }
        }

        self.store
            .smoothing_groups_mut()
            .retain(|_, group| group.polygons.is_disjoint(&keys));
        let existing = self.store.smoothing_sets();
        for polygons in wanted {
            if !existing.contains(&polygons) {
                self.store
                    .smoothing_groups_mut()
                    .insert(SmoothingGroupData { polygons });
            }
        }
    }

    fn apply_selection(&mut self, targets: &BTreeMap<SubobjKey, Target>) {
        for (key, target) in targets {
            let SubobjKey::Selection(level) = *key else {
                continue;
            };
            let ids: Vec<u32> = match &target.value {
                Some(PropertyValue::Selection(ids)) => ids
                    .iter()
                    .copied()
                    .filter(|&id| self.subobject_exists(level, id))
                    .collect(),
                _ => Vec::new(),
            };
            self.set_selection_list(level, &ids);
        }
    }

    fn subobject_exists(&self, level: SubobjectLevel, id: u32) -> bool {
        match level {
            SubobjectLevel::Vertex | SubobjectLevel::Normal => self.store.contains_vertex(VertexId(id)),
            SubobjectLevel::Edge => self.store.contains_edge(EdgeId(id)),
            SubobjectLevel::Polygon => self.store.contains_polygon(PolygonId(id)),
        }
    }

    /// Writes one per-key value, touching the buffers only if it differs.
    fn apply_value(&mut self, key: SubobjKey, value: &PropertyValue, moved: &mut BTreeSet<PolygonId>) {
        match (key, value) {
            (SubobjKey::Polygon(p), PropertyValue::Triangles(triangles)) => {
                if let Ok(polygon) = self.store.polygon_mut(p) {
                    polygon.triangles.clone_from(triangles);
                }
            }
            (SubobjKey::Vertex(v), _) => {
                let Ok(data) = self.store.vertex_mut(v) else {
                    return;
                };
                let row = data.row;
                match value {
                    PropertyValue::Position(position) if data.position != *position => {
                        data.position = *position;
                        moved.insert(data.polygon);
                        self.buffers.write_position(row, *position);
                    }
                    PropertyValue::Normal(normal) if data.normal != *normal => {
                        data.normal = *normal;
                        self.buffers.write_normal(row, *normal);
                    }
                    PropertyValue::Uvs(uvs) if data.uvs != *uvs => {
                        data.uvs.clone_from(uvs);
                        self.buffers.write_uvs(row, uvs);
                    }
                    PropertyValue::Flag(locked) => data.normal_locked = *locked,
                    _ => {}
                }
            }
            _ => {}
        }
    }
}
