use std::collections::BTreeMap;

use tracing::trace;

use crate::object::GeomDataObject;
use crate::topology::SubobjectLevel;

use super::payload::PolygonPayload;
use super::property::{PropertyId, PropertyValue, SubobjKey};
use super::record::{DeltaEntry, DeltaRecord, EventType};
use super::time::EditTime;

impl GeomDataObject {
    /// Turns pending changes into delta records stamped with `time`.
    ///
    /// With `property` set only that property is collected; the others
    /// stay pending. Every recorded key gets its stamp advanced to `time`
    /// so the next change of that key can point back here. Properties
    /// without entries are left out of the result.
    ///
    /// - [`EventType::Creation`] records every key of every property with
    ///   no previous time.
    /// - [`EventType::PropChange`] records the dirty keys, plus deletion
    ///   anchors for polygons removed since the last record.
    /// - [`EventType::Deletion`] records the current value of every key as
    ///   an anchor, so undoing the deletion recreates the object. Commit
    ///   pending changes before collecting it.
    pub fn get_data_to_store(
        &mut self,
        event: EventType,
        property: Option<PropertyId>,
        time: EditTime,
    ) -> BTreeMap<PropertyId, DeltaRecord> {
        // Polygon payloads embed the stamps of every other property.
        let mut properties: Vec<PropertyId> = PropertyId::ALL
            .iter()
            .copied()
            .filter(|p| property.is_none() || property == Some(*p))
            .collect();
        properties.sort_by_key(|p| *p == PropertyId::Subobj);

        let mut records = BTreeMap::new();
        for p in properties {
            let record = match event {
                EventType::Creation => self.collect_creation(p, time),
                EventType::PropChange => self.collect_change(p, time),
                EventType::Deletion => self.collect_deletion(p),
            };
            trace!(object = %self.id(), property = %p, entries = record.entries.len(), "delta collected");
            if !record.is_empty() {
                records.insert(p, record);
            }
        }
        records
    }

    fn collect_creation(&mut self, property: PropertyId, time: EditTime) -> DeltaRecord {
        self.discard_pending(property);
        let mut record = DeltaRecord::default();
        for key in self.keys_of(property) {
            self.set_stamp(property, key, Some(time));
            if let Some(value) = self.current_value(property, key) {
                record.insert(key, DeltaEntry::change(Some(value), None));
            }
        }
        record
    }

    fn collect_change(&mut self, property: PropertyId, time: EditTime) -> DeltaRecord {
        let mut record = DeltaRecord::default();
        if property == PropertyId::Subobj {
            let (created, deleted) = self.changes.take_existence();
            for payload in deleted.into_values() {
                let prev = payload.stamps.get(property);
                record.insert(
                    SubobjKey::Polygon(payload.id),
                    DeltaEntry::deletion(PropertyValue::Polygon(Box::new(payload)), prev),
                );
            }
            for id in created {
                let key = SubobjKey::Polygon(id);
                if !self.set_stamp(property, key, Some(time)) {
                    continue;
                }
                if let Some(value) = self.current_value(property, key) {
                    record.insert(key, DeltaEntry::change(Some(value), None));
                }
            }
            return record;
        }

        for payload in self.changes.deleted_payloads() {
            for (key, prev) in payload_keys(property, payload) {
                if prev.is_some() {
                    record.insert(key, DeltaEntry::change(None, prev));
                }
            }
        }
        for key in self.changes.take_dirty(property) {
            let Some(value) = self.current_value(property, key) else {
                continue;
            };
            let prev = self.stamp(property, key);
            self.set_stamp(property, key, Some(time));
            record.insert(key, DeltaEntry::change(Some(value), prev));
        }
        record
    }

    fn collect_deletion(&mut self, property: PropertyId) -> DeltaRecord {
        self.discard_pending(property);
        let mut record = DeltaRecord::default();
        for key in self.keys_of(property) {
            if let Some(value) = self.current_value(property, key) {
                record.insert(key, DeltaEntry::deletion(value, self.stamp(property, key)));
            }
        }
        record
    }

    fn discard_pending(&mut self, property: PropertyId) {
        self.changes.take_dirty(property);
        if property == PropertyId::Subobj {
            self.changes.take_existence();
        }
    }

    /// Every live key `property` is tracked for.
    fn keys_of(&self, property: PropertyId) -> Vec<SubobjKey> {
        let vertices = self.store.vertices().map(|(id, _)| SubobjKey::Vertex(id));
        match property {
            PropertyId::Subobj | PropertyId::PolyTris | PropertyId::Smoothing => self
                .store
                .polygons()
                .map(|(id, _)| SubobjKey::Polygon(id))
                .collect(),
            PropertyId::SubobjMerge => vertices
                .chain(self.store.edges().map(|(id, _)| SubobjKey::Edge(id)))
                .collect(),
            PropertyId::SubobjSelection => SubobjectLevel::ALL
                .iter()
                .map(|&level| SubobjKey::Selection(level))
                .collect(),
            PropertyId::SubobjTransform
            | PropertyId::Uvs
            | PropertyId::NormalLock
            | PropertyId::Normals
            | PropertyId::NormalSharing => vertices.collect(),
        }
    }

    /// Edit time of the last recorded change of `property` of a live key.
    pub(crate) fn stamp(&self, property: PropertyId, key: SubobjKey) -> Option<EditTime> {
        match key {
            SubobjKey::Vertex(v) => self.store.vertex(v).ok()?.stamps.get(property),
            SubobjKey::Edge(e) => self.store.edge(e).ok()?.stamps.get(property),
            SubobjKey::Polygon(p) => self.store.polygon(p).ok()?.stamps.get(property),
            SubobjKey::Selection(level) => self.selection.stamp(level),
        }
    }

    /// Sets a stamp; returns `false` if the key does not exist.
    pub(crate) fn set_stamp(&mut self, property: PropertyId, key: SubobjKey, time: Option<EditTime>) -> bool {
        let stamps = match key {
            SubobjKey::Vertex(v) => self.store.vertex_mut(v).map(|d| &mut d.stamps),
            SubobjKey::Edge(e) => self.store.edge_mut(e).map(|d| &mut d.stamps),
            SubobjKey::Polygon(p) => self.store.polygon_mut(p).map(|d| &mut d.stamps),
            SubobjKey::Selection(level) => {
                self.selection.set_stamp(level, time);
                return true;
            }
        };
        match stamps {
            Ok(stamps) => {
                stamps.set(property, time);
                true
            }
            Err(_) => false,
        }
    }

    /// Current value of `property` for a live key.
    pub(crate) fn current_value(&self, property: PropertyId, key: SubobjKey) -> Option<PropertyValue> {
        let store = &self.store;
        let value = match (property, key) {
            (PropertyId::Subobj, SubobjKey::Polygon(p)) => {
                PropertyValue::Polygon(Box::new(PolygonPayload::capture(store, p).ok()?))
            }
            (PropertyId::SubobjMerge, SubobjKey::Vertex(v)) if store.contains_vertex(v) => {
                PropertyValue::VertexGroup(store.merged_vertices().siblings(v).into_iter().collect())
            }
            (PropertyId::SubobjMerge, SubobjKey::Edge(e)) if store.contains_edge(e) => {
                PropertyValue::EdgeGroup(store.merged_edges().siblings(e).into_iter().collect())
            }
            (PropertyId::NormalSharing, SubobjKey::Vertex(v)) if store.contains_vertex(v) => {
                PropertyValue::VertexGroup(store.shared_normals().siblings(v).into_iter().collect())
            }
            (PropertyId::SubobjTransform, SubobjKey::Vertex(v)) => {
                PropertyValue::Position(store.vertex(v).ok()?.position)
            }
            (PropertyId::Uvs, SubobjKey::Vertex(v)) => PropertyValue::Uvs(store.vertex(v).ok()?.uvs.clone()),
            (PropertyId::NormalLock, SubobjKey::Vertex(v)) => {
                PropertyValue::Flag(store.vertex(v).ok()?.normal_locked)
            }
            (PropertyId::Normals, SubobjKey::Vertex(v)) => PropertyValue::Normal(store.vertex(v).ok()?.normal),
            (PropertyId::PolyTris, SubobjKey::Polygon(p)) => {
                PropertyValue::Triangles(store.polygon(p).ok()?.triangles.clone())
            }
            (PropertyId::Smoothing, SubobjKey::Polygon(p)) if store.contains_polygon(p) => {
                PropertyValue::PolygonGroups(store.smoothing_groups_of(p))
            }
            (PropertyId::SubobjSelection, SubobjKey::Selection(level)) => {
                PropertyValue::Selection(self.selection.level(level).ids().to_vec())
            }
            _ => return None,
        };
        Some(value)
    }
}

/// Keys of a deleted polygon tracked for `property`, with their last stamps.
fn payload_keys(property: PropertyId, payload: &PolygonPayload) -> Vec<(SubobjKey, Option<EditTime>)> {
    let vertices = payload
        .vertices
        .iter()
        .map(|v| (SubobjKey::Vertex(v.id), v.stamps.get(property)));
    match property {
        PropertyId::Subobj | PropertyId::SubobjSelection => Vec::new(),
        PropertyId::PolyTris | PropertyId::Smoothing => {
            vec![(SubobjKey::Polygon(payload.id), payload.stamps.get(property))]
        }
        PropertyId::SubobjMerge => vertices
            .chain(
                payload
                    .edges
                    .iter()
                    .map(|e| (SubobjKey::Edge(e.id), e.stamps.get(property))),
            )
            .collect(),
        PropertyId::SubobjTransform
        | PropertyId::Uvs
        | PropertyId::NormalLock
        | PropertyId::Normals
        | PropertyId::NormalSharing => vertices.collect(),
    }
}
