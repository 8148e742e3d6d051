use std::collections::{BTreeMap, HashMap};

use crate::error::HistoryError;
use crate::object::ObjectId;

use super::property::PropertyId;
use super::record::DeltaRecord;
use super::time::EditTime;

/// Persistent key/value time store the history engine reads and writes.
///
/// Records are keyed by `(object, property, time)`. The engine never keeps
/// the full history in memory; it only asks for the chains and records a
/// restore needs.
pub trait HistoryStore {
    /// Edit times at which `property` of `object` was recorded, on the path
    /// from the root of the timeline to `time` (the current time if `None`),
    /// oldest first.
    ///
    /// Returns `Ok(None)` if the object did not exist yet at that time.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::TimelineGap`] if `time` is unknown.
    fn load_last_from_history(
        &self,
        object: ObjectId,
        property: PropertyId,
        time: Option<EditTime>,
    ) -> Result<Option<Vec<EditTime>>, HistoryError>;

    /// The record stored for `property` of `object` at exactly `time`.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::TimelineGap`] if no such record exists.
    fn load_from_history(
        &self,
        object: ObjectId,
        property: PropertyId,
        time: EditTime,
    ) -> Result<DeltaRecord, HistoryError>;

    /// Mints (or returns the already minted) edit time of the in-progress edit.
    fn get_history_time(&mut self) -> EditTime;

    /// Stores a record for the in-progress edit.
    fn save(&mut self, object: ObjectId, property: PropertyId, time: EditTime, record: DeltaRecord);
}

/// In-memory [`HistoryStore`] with a branching timeline.
///
/// Every minted time has the current time as its parent, so editing after
/// an undo starts a new branch instead of discarding the old one.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    parents: BTreeMap<EditTime, Option<EditTime>>,
    current: Option<EditTime>,
    pending: Option<EditTime>,
    next: u64,
    records: HashMap<(ObjectId, PropertyId, EditTime), DeltaRecord>,
    created: HashMap<ObjectId, EditTime>,
}

impl MemoryHistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The time the object state currently corresponds to.
    #[must_use]
    pub fn current(&self) -> Option<EditTime> {
        self.pending.or(self.current)
    }

    /// Closes the in-progress edit, making its time current.
    pub fn finish_edit(&mut self) -> Option<EditTime> {
        if let Some(time) = self.pending.take() {
            self.current = Some(time);
        }
        self.current
    }

    /// Moves the current time (after an undo or redo).
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::TimelineGap`] if `time` was never minted.
    pub fn set_current(&mut self, time: EditTime) -> Result<(), HistoryError> {
        if !self.parents.contains_key(&time) {
            return Err(HistoryError::TimelineGap {
                property: "timeline".into(),
                time,
            });
        }
        self.pending = None;
        self.current = Some(time);
        Ok(())
    }

    /// Parent of `time` on the timeline.
    #[must_use]
    pub fn parent(&self, time: EditTime) -> Option<EditTime> {
        self.parents.get(&time).copied().flatten()
    }

    /// Drops a stored record, simulating a corrupted store.
    pub fn forget(&mut self, object: ObjectId, property: PropertyId, time: EditTime) {
        self.records.remove(&(object, property, time));
    }

    /// Times from the root to `time`, oldest first.
    fn path_to(&self, time: EditTime) -> Result<Vec<EditTime>, HistoryError> {
        let mut path = Vec::new();
        let mut cursor = Some(time);
        while let Some(t) = cursor {
            let parent = self.parents.get(&t).ok_or(HistoryError::TimelineGap {
                property: "timeline".into(),
                time: t,
            })?;
            path.push(t);
            cursor = *parent;
        }
        path.reverse();
        Ok(path)
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load_last_from_history(
        &self,
        object: ObjectId,
        property: PropertyId,
        time: Option<EditTime>,
    ) -> Result<Option<Vec<EditTime>>, HistoryError> {
        let Some(time) = time.or_else(|| self.current()) else {
            return Ok(None);
        };
        let path = self.path_to(time)?;
        let Some(created) = self.created.get(&object) else {
            return Ok(None);
        };
        if !path.contains(created) {
            return Ok(None);
        }
        Ok(Some(
            path.into_iter()
                .filter(|t| self.records.contains_key(&(object, property, *t)))
                .collect(),
        ))
    }

    fn load_from_history(
        &self,
        object: ObjectId,
        property: PropertyId,
        time: EditTime,
    ) -> Result<DeltaRecord, HistoryError> {
        self.records
            .get(&(object, property, time))
            .cloned()
            .ok_or_else(|| HistoryError::TimelineGap {
                property: property.to_string(),
                time,
            })
    }

    fn get_history_time(&mut self) -> EditTime {
        if let Some(time) = self.pending {
            return time;
        }
        self.next += 1;
        let time = EditTime(self.next);
        self.parents.insert(time, self.current);
        self.pending = Some(time);
        time
    }

    fn save(&mut self, object: ObjectId, property: PropertyId, time: EditTime, record: DeltaRecord) {
        self.created.entry(object).or_insert(time);
        self.records.insert((object, property, time), record);
    }
}
