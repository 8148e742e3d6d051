use std::collections::BTreeMap;
use std::fmt;

use super::property::PropertyId;

/// Identifier of one logical edit, increasing monotonically as edits are made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EditTime(pub u64);

impl fmt::Display for EditTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Edit time of the last change of each tracked property of one subobject.
///
/// Together with the `prev` pointers stored in delta records these form a
/// backward-linked chain per property.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stamps(BTreeMap<PropertyId, EditTime>);

impl Stamps {
    #[must_use]
    pub fn get(&self, property: PropertyId) -> Option<EditTime> {
        self.0.get(&property).copied()
    }

    pub fn set(&mut self, property: PropertyId, time: Option<EditTime>) {
        match time {
            Some(time) => {
                self.0.insert(property, time);
            }
            None => {
                self.0.remove(&property);
            }
        }
    }
}
