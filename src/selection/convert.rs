use std::collections::BTreeSet;

use crate::object::GeomDataObject;
use crate::topology::{EdgeId, PolygonId, SubobjectLevel, TopologyStore, VertexId};

use super::expand_to_groups;

/// How a selection is projected onto another level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionMode {
    /// Everything touching the selected subobjects.
    Touching,
    /// Everything entirely contained in the selected subobjects.
    Containing,
    /// The border of the selected region.
    Bordering,
}

/// Projects the selection at `from` onto `to`.
///
/// Read-only: neither the store nor the selection is modified. The result
/// is sorted and expanded to whole groups at `to`.
#[must_use]
pub fn convert_selection(
    obj: &GeomDataObject,
    from: SubobjectLevel,
    to: SubobjectLevel,
    mode: ConversionMode,
) -> Vec<u32> {
    let store = obj.store();
    let ids = obj.selection().level(from).ids();
    let verts = source_vertices(store, from, ids);

    let raw: BTreeSet<u32> = match mode {
        ConversionMode::Touching => touching(store, to, &verts),
        ConversionMode::Containing => containing(store, to, &verts),
        ConversionMode::Bordering => {
            let polys: BTreeSet<PolygonId> = if from == SubobjectLevel::Polygon {
                ids.iter().map(|&id| PolygonId(id)).collect()
            } else {
                contained_polygons(store, &verts)
            };
            bordering(store, to, &polys)
        }
    };
    let raw: Vec<u32> = raw.into_iter().collect();
    expand_to_groups(store, to, &raw).into_iter().collect()
}

/// Vertices of the selected subobjects, expanded to merged groups.
fn source_vertices(store: &TopologyStore, level: SubobjectLevel, ids: &[u32]) -> BTreeSet<VertexId> {
    let mut corners = Vec::new();
    for &id in ids {
        match level {
            SubobjectLevel::Vertex | SubobjectLevel::Normal => corners.push(VertexId(id)),
            SubobjectLevel::Edge => {
                if let Ok(edge) = store.edge(EdgeId(id)) {
                    corners.extend(edge.vertices);
                }
            }
            SubobjectLevel::Polygon => {
                if let Ok(poly) = store.polygon(PolygonId(id)) {
                    corners.extend(poly.vertices.iter().copied());
                }
            }
        }
    }
    corners
        .into_iter()
        .flat_map(|v| store.merged_vertices().siblings(v))
        .collect()
}

fn touching(store: &TopologyStore, to: SubobjectLevel, verts: &BTreeSet<VertexId>) -> BTreeSet<u32> {
    match to {
        SubobjectLevel::Vertex | SubobjectLevel::Normal => verts.iter().map(|v| v.0).collect(),
        SubobjectLevel::Edge => store
            .edges()
            .filter(|(_, e)| e.vertices.iter().any(|v| verts.contains(v)))
            .map(|(id, _)| id.0)
            .collect(),
        SubobjectLevel::Polygon => store
            .polygons()
            .filter(|(_, p)| p.vertices.iter().any(|v| verts.contains(v)))
            .map(|(id, _)| id.0)
            .collect(),
    }
}

fn containing(store: &TopologyStore, to: SubobjectLevel, verts: &BTreeSet<VertexId>) -> BTreeSet<u32> {
    match to {
        SubobjectLevel::Vertex | SubobjectLevel::Normal => verts.iter().map(|v| v.0).collect(),
        SubobjectLevel::Edge => store
            .edges()
            .filter(|(_, e)| e.vertices.iter().all(|v| verts.contains(v)))
            .map(|(id, _)| id.0)
            .collect(),
        SubobjectLevel::Polygon => contained_polygons(store, verts)
            .into_iter()
            .map(|p| p.0)
            .collect(),
    }
}

fn contained_polygons(store: &TopologyStore, verts: &BTreeSet<VertexId>) -> BTreeSet<PolygonId> {
    store
        .polygons()
        .filter(|(_, p)| p.vertices.iter().all(|v| verts.contains(v)))
        .map(|(id, _)| id)
        .collect()
}

/// Edges of `polys` with no welded counterpart inside `polys`.
fn border_edges(store: &TopologyStore, polys: &BTreeSet<PolygonId>) -> BTreeSet<EdgeId> {
    let mut out = BTreeSet::new();
    for &pid in polys {
        let Ok(poly) = store.polygon(pid) else {
            continue;
        };
        for &eid in &poly.edges {
            let inner = store.merged_edges().siblings(eid).into_iter().any(|other| {
                other != eid
                    && store
                        .edge(other)
                        .is_ok_and(|e| polys.contains(&e.polygon))
            });
            if !inner {
                out.insert(eid);
            }
        }
    }
    out
}

fn bordering(store: &TopologyStore, to: SubobjectLevel, polys: &BTreeSet<PolygonId>) -> BTreeSet<u32> {
    let border = border_edges(store, polys);
    match to {
        SubobjectLevel::Edge => border.iter().map(|e| e.0).collect(),
        SubobjectLevel::Vertex | SubobjectLevel::Normal => border
            .iter()
            .filter_map(|&e| store.edge(e).ok())
            .flat_map(|e| e.vertices)
            .map(|v| v.0)
            .collect(),
        SubobjectLevel::Polygon => {
            let ring: BTreeSet<VertexId> = border
                .iter()
                .filter_map(|&e| store.edge(e).ok())
                .flat_map(|e| e.vertices)
                .flat_map(|v| store.merged_vertices().siblings(v))
                .collect();
            store
                .polygons()
                .filter(|(id, p)| !polys.contains(id) && p.vertices.iter().any(|v| ring.contains(v)))
                .map(|(id, _)| id.0)
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{quad_strip, two_triangle_plane};

    #[test]
    fn polygon_to_vertex_touching() {
        let mut obj = two_triangle_plane();
        obj.update_selection(SubobjectLevel::Polygon, &[0], &[]);
        let verts = convert_selection(
            &obj,
            SubobjectLevel::Polygon,
            SubobjectLevel::Vertex,
            ConversionMode::Touching,
        );
        // Corners of polygon 0 plus their welded siblings on polygon 1.
        assert_eq!(verts, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn vertex_to_polygon_containing() {
        let mut obj = two_triangle_plane();
        obj.update_selection(SubobjectLevel::Vertex, &[0, 1, 2], &[]);
        let polys = convert_selection(
            &obj,
            SubobjectLevel::Vertex,
            SubobjectLevel::Polygon,
            ConversionMode::Containing,
        );
        assert_eq!(polys, vec![0]);
    }

    #[test]
    fn both_polygons_border_excludes_shared_edge() {
        let mut obj = two_triangle_plane();
        obj.update_selection(SubobjectLevel::Polygon, &[0, 1], &[]);
        let edges = convert_selection(
            &obj,
            SubobjectLevel::Polygon,
            SubobjectLevel::Edge,
            ConversionMode::Bordering,
        );
        assert_eq!(edges, vec![0, 1, 4, 5]);
    }

    #[test]
    fn bordering_polygons_form_a_ring() {
        let mut obj = quad_strip(3);
        obj.update_selection(SubobjectLevel::Polygon, &[1], &[]);
        let ring = convert_selection(
            &obj,
            SubobjectLevel::Polygon,
            SubobjectLevel::Polygon,
            ConversionMode::Bordering,
        );
        assert_eq!(ring, vec![0, 2]);
        assert_eq!(obj.selection().level(SubobjectLevel::Polygon).ids(), &[1]);
    }
}
