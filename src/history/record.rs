use std::collections::BTreeMap;

use super::property::{PropertyValue, SubobjKey};
use super::time::EditTime;

/// Version of the delta record layout.
pub const DELTA_FORMAT_VERSION: u16 = 1;

/// Kind of event a set of records describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// The object was created: every property of every subobject is recorded.
    Creation,
    /// Some properties changed since the last record.
    PropChange,
    /// The object was deleted: every subobject gets a final anchor.
    Deletion,
}

/// One subobject's change within a record.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaEntry {
    /// Value after the change; `None` once the subobject no longer exists.
    pub value: Option<PropertyValue>,
    /// Edit time holding the value that was current before this change.
    pub prev: Option<EditTime>,
    /// Final value of a deleted subobject, used to recreate it on undo.
    pub anchor: Option<PropertyValue>,
}

impl DeltaEntry {
    #[must_use]
    pub fn change(value: Option<PropertyValue>, prev: Option<EditTime>) -> Self {
        Self {
            value,
            prev,
            anchor: None,
        }
    }

    #[must_use]
    pub fn deletion(anchor: PropertyValue, prev: Option<EditTime>) -> Self {
        Self {
            value: None,
            prev,
            anchor: Some(anchor),
        }
    }
}

/// The delta stored for one property of one object at one edit time.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaRecord {
    pub format_version: u16,
    pub entries: BTreeMap<SubobjKey, DeltaEntry>,
}

impl Default for DeltaRecord {
    fn default() -> Self {
        Self {
            format_version: DELTA_FORMAT_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl DeltaRecord {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: SubobjKey, entry: DeltaEntry) {
        self.entries.insert(key, entry);
    }
}
