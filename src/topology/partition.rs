use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use slotmap::{Key, SlotMap};

/// A partition of a set of subobject ids into disjoint groups.
///
/// Backs merged vertices, merged edges and shared normals. Group keys are
/// generational and never persisted; history stores member lists instead.
#[derive(Debug, Clone)]
pub struct Partition<K: Key, T> {
    groups: SlotMap<K, BTreeSet<T>>,
    owner: HashMap<T, K>,
}

impl<K: Key, T> Default for Partition<K, T> {
    fn default() -> Self {
        Self {
            groups: SlotMap::with_key(),
            owner: HashMap::new(),
        }
    }
}

impl<K, T> Partition<K, T>
where
    K: Key,
    T: Copy + Ord + Hash,
{
    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if there are no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Group containing `item`, if any.
    #[must_use]
    pub fn group_of(&self, item: T) -> Option<K> {
        self.owner.get(&item).copied()
    }

    /// Members of a group.
    #[must_use]
    pub fn members(&self, key: K) -> Option<&BTreeSet<T>> {
        self.groups.get(key)
    }

    /// Members of the group containing `item`, or `{item}` if it is unassigned.
    #[must_use]
    pub fn siblings(&self, item: T) -> BTreeSet<T> {
        self.group_of(item)
            .and_then(|key| self.groups.get(key))
            .cloned()
            .unwrap_or_else(|| BTreeSet::from([item]))
    }

    /// Distinct groups containing any of `items`, unassigned items as
    /// singletons.
    pub fn groups_of<I>(&self, items: I) -> Vec<BTreeSet<T>>
    where
        I: IntoIterator<Item = T>,
    {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for item in items {
            if seen.contains(&item) {
                continue;
            }
            let members = self.siblings(item);
            seen.extend(members.iter().copied());
            out.push(members);
        }
        out
    }

    /// Iterates over all groups.
    pub fn iter(&self) -> impl Iterator<Item = (K, &BTreeSet<T>)> {
        self.groups.iter()
    }

    /// Number of assigned items.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.owner.len()
    }

    /// Returns `true` if `item` belongs to some group.
    #[must_use]
    pub fn contains(&self, item: T) -> bool {
        self.owner.contains_key(&item)
    }

    /// Puts `item` into a new singleton group, detaching it first.
    pub fn insert_singleton(&mut self, item: T) -> K {
        self.detach(item);
        let key = self.groups.insert(BTreeSet::from([item]));
        self.owner.insert(item, key);
        key
    }

    /// Removes `item` from its group, deleting the group once empty.
    ///
    /// Returns the former group key.
    pub fn detach(&mut self, item: T) -> Option<K> {
        let key = self.owner.remove(&item)?;
        let now_empty = self.groups.get_mut(key).is_some_and(|members| {
            members.remove(&item);
            members.is_empty()
        });
        if now_empty {
            self.groups.remove(key);
        }
        Some(key)
    }

    /// Creates a group from `members`, detaching each of them first.
    pub fn set_group(&mut self, members: BTreeSet<T>) -> Option<K> {
        if members.is_empty() {
            return None;
        }
        for &m in &members {
            self.detach(m);
        }
        let key = self.groups.insert(members.clone());
        for m in members {
            self.owner.insert(m, key);
        }
        Some(key)
    }

    /// Unions the given groups into one. Returns the surviving key.
    pub fn union(&mut self, keys: &[K]) -> Option<K> {
        let mut members = BTreeSet::new();
        for &key in keys {
            if let Some(group) = self.groups.get(key) {
                members.extend(group.iter().copied());
            }
        }
        self.set_group(members)
    }

    /// Rebuilds groups from per-item member lists.
    ///
    /// Each listed item (that passes `exists`) ends up in a group with
    /// exactly the existing members of its list. Items that are not listed
    /// keep their current group, minus any item moved out of it.
    pub fn regroup<I, F>(&mut self, lists: I, exists: F)
    where
        I: IntoIterator<Item = (T, Vec<T>)>,
        F: Fn(T) -> bool,
    {
        let mut placed = BTreeSet::new();
        for (item, list) in lists {
            if placed.contains(&item) || !exists(item) {
                continue;
            }
            let members: BTreeSet<T> = list
                .into_iter()
                .filter(|m| exists(*m) && !placed.contains(m))
                .chain(std::iter::once(item))
                .collect();
            placed.extend(members.iter().copied());
            self.set_group(members);
        }
    }

    /// All groups as sorted member sets, independent of key identity.
    #[must_use]
    pub fn as_sets(&self) -> BTreeSet<BTreeSet<T>> {
        self.groups.values().cloned().collect()
    }
}
