use std::collections::{BTreeMap, BTreeSet};

use crate::topology::PolygonId;

use super::payload::PolygonPayload;
use super::property::{PropertyId, SubobjKey};

/// Collects which properties of which subobjects changed since the last
/// record was taken.
#[derive(Debug, Clone, Default)]
pub struct ChangeTracker {
    created: BTreeSet<PolygonId>,
    deleted: BTreeMap<PolygonId, PolygonPayload>,
    dirty: BTreeMap<PropertyId, BTreeSet<SubobjKey>>,
}

impl ChangeTracker {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty() && self.dirty.is_empty()
    }

    /// Marks one property of one subobject as changed.
    pub fn mark(&mut self, property: PropertyId, key: SubobjKey) {
        self.dirty.entry(property).or_default().insert(key);
    }

    /// Marks one property of several subobjects as changed.
    pub fn mark_all<I>(&mut self, property: PropertyId, keys: I)
    where
        I: IntoIterator<Item = SubobjKey>,
    {
        let set = self.dirty.entry(property).or_default();
        set.extend(keys);
        if set.is_empty() {
            self.dirty.remove(&property);
        }
    }

    pub fn mark_created(&mut self, polygon: PolygonId) {
        self.created.insert(polygon);
    }

    /// Records the final state of a deleted polygon.
    ///
    /// A polygon created and deleted within the same edit leaves no trace.
    pub fn mark_deleted(&mut self, payload: PolygonPayload) {
        if !self.created.remove(&payload.id) {
            self.deleted.insert(payload.id, payload);
        }
    }

    /// Payload of a polygon deleted since the last record.
    #[must_use]
    pub fn deleted(&self, polygon: PolygonId) -> Option<&PolygonPayload> {
        self.deleted.get(&polygon)
    }

    /// Iterates over payloads of deleted polygons.
    pub fn deleted_payloads(&self) -> impl Iterator<Item = &PolygonPayload> {
        self.deleted.values()
    }

    /// Properties with pending changes.
    #[must_use]
    pub fn dirty_properties(&self) -> BTreeSet<PropertyId> {
        let mut props: BTreeSet<PropertyId> = self.dirty.keys().copied().collect();
        if !self.created.is_empty() || !self.deleted.is_empty() {
            props.insert(PropertyId::Subobj);
        }
        props
    }

    /// Removes and returns the dirty keys of one property.
    pub fn take_dirty(&mut self, property: PropertyId) -> BTreeSet<SubobjKey> {
        self.dirty.remove(&property).unwrap_or_default()
    }

    /// Removes and returns created ids and deleted payloads.
    pub fn take_existence(&mut self) -> (BTreeSet<PolygonId>, BTreeMap<PolygonId, PolygonPayload>) {
        (
            std::mem::take(&mut self.created),
            std::mem::take(&mut self.deleted),
        )
    }

    /// Forgets every pending change.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Stamps;

    fn payload(id: u32) -> PolygonPayload {
        PolygonPayload {
            id: PolygonId(id),
            vertices: Vec::new(),
            edges: Vec::new(),
            triangles: Vec::new(),
            stamps: Stamps::default(),
        }
    }

    #[test]
    fn created_then_deleted_cancels_out() {
        let mut tracker = ChangeTracker::default();
        tracker.mark_created(PolygonId(4));
        tracker.mark_deleted(payload(4));
        assert!(tracker.is_empty());
    }

    #[test]
    fn existence_marks_subobj_dirty() {
        let mut tracker = ChangeTracker::default();
        tracker.mark_deleted(payload(2));
        assert!(tracker.dirty_properties().contains(&PropertyId::Subobj));
        assert!(tracker.deleted(PolygonId(2)).is_some());
    }
}
