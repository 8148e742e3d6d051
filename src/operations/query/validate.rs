use std::collections::BTreeSet;
use std::fmt::Display;
use std::hash::Hash;

use slotmap::Key;

use crate::error::TopologyError;
use crate::topology::{Partition, TopologyStore};

/// Validates the structural invariants of a topology store.
///
/// Checks that every corner and edge belongs to exactly one merged group
/// and one normal group, that shared normals never span two merged
/// vertices, that merged edges connect the same pair of merged vertices,
/// and that corners, edges and smoothing groups only reference live
/// polygons.
pub struct ValidateTopology;

impl ValidateTopology {
    /// Creates a new `ValidateTopology` query.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Executes the validation.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::Inconsistency`] describing the first
    /// violation found.
    pub fn execute(&self, store: &TopologyStore) -> Result<(), TopologyError> {
        check_cover(
            "merged vertices",
            store.merged_vertices(),
            store.vertices().map(|(id, _)| id),
        )?;
        check_cover(
            "merged edges",
            store.merged_edges(),
            store.edges().map(|(id, _)| id),
        )?;
        check_cover(
            "shared normals",
            store.shared_normals(),
            store.vertices().map(|(id, _)| id),
        )?;

        for (_, members) in store.shared_normals().iter() {
            let welds: BTreeSet<_> = members
                .iter()
                .map(|&v| store.merged_vertices().group_of(v))
                .collect();
            if welds.len() > 1 {
                return Err(inconsistent(format!(
                    "shared normal {} spans {} merged vertices",
                    list(members),
                    welds.len()
                )));
            }
        }

        for (_, members) in store.merged_edges().iter() {
            let pairs: BTreeSet<_> = members.iter().map(|&e| store.edge_weld_pair(e)).collect();
            if pairs.len() > 1 {
                return Err(inconsistent(format!(
                    "merged edge {} connects different merged vertices",
                    list(members)
                )));
            }
        }

        for (id, polygon) in store.polygons() {
            for &v in &polygon.vertices {
                if store.vertex(v)?.polygon != id {
                    return Err(inconsistent(format!("corner {v} is not owned by {id}")));
                }
            }
            for &e in &polygon.edges {
                if store.edge(e)?.polygon != id {
                    return Err(inconsistent(format!("edge {e} is not owned by {id}")));
                }
            }
        }

        for group in store.smoothing_groups().values() {
            if let Some(p) = group.polygons.iter().find(|&&p| !store.contains_polygon(p)) {
                return Err(inconsistent(format!("smoothing group references missing {p}")));
            }
        }
        Ok(())
    }
}

impl Default for ValidateTopology {
    fn default() -> Self {
        Self::new()
    }
}

fn check_cover<K, T, I>(name: &str, partition: &Partition<K, T>, ids: I) -> Result<(), TopologyError>
where
    K: Key,
    T: Copy + Ord + Hash + Display,
    I: IntoIterator<Item = T>,
{
    let live: BTreeSet<T> = ids.into_iter().collect();
    if let Some(missing) = live.iter().find(|&&id| !partition.contains(id)) {
        return Err(inconsistent(format!("{missing} has no group in {name}")));
    }
    if partition.item_count() != live.len() {
        return Err(inconsistent(format!(
            "{name} hold {} members for {} live ids",
            partition.item_count(),
            live.len()
        )));
    }
    Ok(())
}

fn inconsistent(message: String) -> TopologyError {
    TopologyError::Inconsistency(message)
}

fn list<T: Display>(members: &BTreeSet<T>) -> String {
    let names: Vec<String> = members.iter().map(ToString::to_string).collect();
    format!("[{}]", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{cube, quad_strip, two_triangle_plane};
    use crate::topology::{EdgeId, PolygonId, SmoothingGroupData, VertexId};

    #[test]
    fn fixtures_are_consistent() {
        for obj in [two_triangle_plane(), quad_strip(3), cube()] {
            assert!(ValidateTopology::new().execute(obj.store()).is_ok());
        }
    }

    #[test]
    fn shared_normal_across_welds_is_reported() {
        let mut obj = two_triangle_plane();
        obj.store
            .shared_normals_mut()
            .set_group(BTreeSet::from([VertexId(0), VertexId(1)]));
        let err = ValidateTopology::new().execute(obj.store());
        assert!(matches!(err, Err(TopologyError::Inconsistency(_))));
    }

    #[test]
    fn merged_edge_with_different_ends_is_reported() {
        let mut obj = two_triangle_plane();
        obj.store
            .merged_edges_mut()
            .set_group(BTreeSet::from([EdgeId(0), EdgeId(4)]));
        assert!(ValidateTopology::new().execute(obj.store()).is_err());
    }

    #[test]
    fn ungrouped_corner_is_reported() {
        let mut obj = two_triangle_plane();
        obj.store.merged_vertices_mut().detach(VertexId(1));
        let Err(TopologyError::Inconsistency(message)) = ValidateTopology::new().execute(obj.store())
        else {
            panic!("missing group not detected");
        };
        assert!(message.contains("v1"));
    }

    #[test]
    fn dangling_smoothing_group_is_reported() {
        let mut obj = quad_strip(1);
        obj.store.smoothing_groups_mut().insert(SmoothingGroupData {
            polygons: BTreeSet::from([PolygonId(0), PolygonId(9)]),
        });
        assert!(ValidateTopology::new().execute(obj.store()).is_err());
    }
}
