use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::{FixedFaceHandle, FixedVertexHandle, InnerTag};
use spade::{ConstrainedDelaunayTriangulation, Point2 as SpadePoint2, Triangulation};

use crate::math::polygon::{centroid, face_normal, plane_basis, project_to_plane};
use crate::math::Point3;
use crate::topology::{Triangle, VertexId};

type Cdt = ConstrainedDelaunayTriangulation<SpadePoint2<f64>>;

/// Default triangulation of a polygon with the given corners.
///
/// The corners are projected onto the polygon's plane and triangulated
/// with a constrained Delaunay triangulation; concave outlines come out
/// right. Degenerate or self-intersecting outlines fall back to a fan
/// around the first corner.
#[must_use]
pub fn triangulate(ids: &[VertexId], positions: &[Point3]) -> Vec<Triangle> {
    if ids.len() < 3 || ids.len() != positions.len() {
        return Vec::new();
    }
    if ids.len() == 3 {
        return vec![[ids[0], ids[1], ids[2]]];
    }
    constrained(ids, positions).unwrap_or_else(|| fan(ids))
}

/// Fan triangulation around the first corner.
#[must_use]
pub fn fan(ids: &[VertexId]) -> Vec<Triangle> {
    (1..ids.len().saturating_sub(1))
        .map(|i| [ids[0], ids[i], ids[i + 1]])
        .collect()
}

fn constrained(ids: &[VertexId], positions: &[Point3]) -> Option<Vec<Triangle>> {
    let normal = face_normal(positions)?;
    let (u, v) = plane_basis(&normal);
    let projected = project_to_plane(positions, &centroid(positions), &u, &v);

    let mut cdt = Cdt::new();
    let mut corner_of: HashMap<FixedVertexHandle, usize> = HashMap::new();
    let mut handles = Vec::with_capacity(projected.len());
    for (i, p) in projected.iter().enumerate() {
        let handle = cdt.insert(SpadePoint2::new(p.x, p.y)).ok()?;
        if corner_of.insert(handle, i).is_some() {
            // Two corners project onto the same point.
            return None;
        }
        handles.push(handle);
    }
    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if !cdt.can_add_constraint(from, to) {
            return None;
        }
        cdt.add_constraint(from, to);
    }

    let interior = classify_interior_faces(&cdt);
    let mut triangles = Vec::with_capacity(ids.len() - 2);
    for face in cdt.inner_faces() {
        if !interior.contains(&face.fix().index()) {
            continue;
        }
        let mut tri = [ids[0]; 3];
        for (slot, vertex) in tri.iter_mut().zip(face.vertices()) {
            *slot = ids[*corner_of.get(&vertex.fix())?];
        }
        triangles.push(tri);
    }
    (triangles.len() == ids.len() - 2).then_some(triangles)
}

/// Faces inside the constraint loop, found by flood fill from the hull.
///
/// Crossing a constraint edge flips between outside and inside.
fn classify_interior_faces(cdt: &Cdt) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer = cdt.outer_face().fix();
    for edge in cdt.directed_edges() {
        if edge.face().fix() != outer {
            continue;
        }
        let Some(inner) = edge.rev().face().as_inner() else {
            continue;
        };
        let idx = inner.fix().index();
        if depth.contains_key(&idx) {
            continue;
        }
        let d = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
        depth.insert(idx, d);
        if d % 2 == 1 {
            interior.insert(idx);
        }
        queue.push_back((inner.fix(), d));
    }

    while let Some((face, d)) = queue.pop_front() {
        for edge in cdt.face(face).adjacent_edges() {
            let Some(next) = edge.rev().face().as_inner() else {
                continue;
            };
            let idx = next.fix().index();
            if depth.contains_key(&idx) {
                continue;
            }
            let nd = d + u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth.insert(idx, nd);
            if nd % 2 == 1 {
                interior.insert(idx);
            }
            queue.push_back((next.fix(), nd));
        }
    }
    interior
}
