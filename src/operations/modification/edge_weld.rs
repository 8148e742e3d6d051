use std::collections::BTreeSet;

use tracing::debug;

use crate::error::Result;
use crate::history::{PropertyId, SubobjKey};
use crate::object::GeomDataObject;
use crate::topology::{EdgeId, SubobjectLevel};

/// Splits edges out of their merged edges, opening a seam.
///
/// Follows the same rule as breaking vertices: targeted members become
/// singletons, and a fully targeted group keeps its lowest id.
pub struct BreakEdges {
    edges: Vec<EdgeId>,
}

impl BreakEdges {
    /// Creates a new `BreakEdges` operation.
    #[must_use]
    pub fn new(edges: Vec<EdgeId>) -> Self {
        Self { edges }
    }

    /// Executes the break, returning whether any group was split.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge does not exist.
    pub fn execute(&self, obj: &mut GeomDataObject) -> Result<bool> {
        for &e in &self.edges {
            obj.store.edge(e)?;
        }
        let targets: BTreeSet<EdgeId> = self.edges.iter().copied().collect();
        let mut affected = BTreeSet::new();
        for group in obj.store.merged_edges().groups_of(targets.iter().copied()) {
            if group.len() < 2 {
                continue;
            }
            let hit: Vec<EdgeId> = group.intersection(&targets).copied().collect();
            let leaving = if hit.len() == group.len() { &hit[1..] } else { &hit[..] };
            for &e in leaving {
                obj.store.merged_edges_mut().insert_singleton(e);
            }
            affected.extend(group);
        }
        if affected.is_empty() {
            return Ok(false);
        }
        obj.changes.mark_all(
            PropertyId::SubobjMerge,
            affected.iter().map(|&e| SubobjKey::Edge(e)),
        );
        Ok(true)
    }
}

/// Welds edges into one merged edge.
pub struct MergeEdges {
    edges: Vec<EdgeId>,
}

impl MergeEdges {
    /// Creates a new `MergeEdges` operation.
    #[must_use]
    pub fn new(edges: Vec<EdgeId>) -> Self {
        Self { edges }
    }

    /// Executes the merge.
    ///
    /// Legal only when every edge of the union joins the same pair of
    /// merged vertices and no polygon contributes two edges; otherwise
    /// nothing changes and `false` is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge does not exist.
    pub fn execute(&self, obj: &mut GeomDataObject) -> Result<bool> {
        for &e in &self.edges {
            obj.store.edge(e)?;
        }
        let groups = obj.store.merged_edges().groups_of(self.edges.iter().copied());
        if groups.len() < 2 {
            return Ok(false);
        }
        let union: BTreeSet<EdgeId> = groups.into_iter().flatten().collect();

        let pairs: BTreeSet<_> = union.iter().map(|&e| obj.store.edge_weld_pair(e)).collect();
        let mut owners = BTreeSet::new();
        let distinct_owners = union
            .iter()
            .filter_map(|&e| obj.store.edge(e).ok())
            .all(|data| owners.insert(data.polygon));
        if pairs.len() != 1 || !distinct_owners {
            debug!(object = %obj.id(), edges = union.len(), "edge merge rejected");
            return Ok(false);
        }

        obj.store.merged_edges_mut().set_group(union.clone());
        obj.changes.mark_all(
            PropertyId::SubobjMerge,
            union.iter().map(|&e| SubobjKey::Edge(e)),
        );
        obj.narrow_selection(SubobjectLevel::Edge);
        Ok(true)
    }
}
