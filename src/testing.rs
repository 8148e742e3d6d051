//! Small meshes shared by the unit tests.

use crate::context::WeldParams;
use crate::math::Point3;
use crate::object::{GeomDataObject, ObjectId};
use crate::operations::creation::MeshDescription;

fn build(description: &MeshDescription) -> GeomDataObject {
    match GeomDataObject::create_geometry(ObjectId(1), description, &WeldParams::default()) {
        Ok(mut obj) => {
            obj.changes.clear();
            obj
        }
        Err(err) => panic!("fixture mesh is invalid: {err}"),
    }
}

/// Unit square split along its diagonal into two triangles.
///
/// Corners 0 and 3 sit at the origin, 2 and 4 at (1, 1); edges 2 and 3 are
/// the shared diagonal.
pub(crate) fn two_triangle_plane() -> GeomDataObject {
    build(
        &MeshDescription::new()
            .with_polygon(vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
            ])
            .with_polygon(vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ]),
    )
}

/// `n` unit quads in a row along +X. Quad `i` owns corners `4i..4i+3`.
pub(crate) fn quad_strip(n: usize) -> GeomDataObject {
    let mut description = MeshDescription::new();
    for i in 0..n {
        #[allow(clippy::cast_precision_loss)]
        let x = i as f64;
        description = description.with_polygon(vec![
            Point3::new(x, 0.0, 0.0),
            Point3::new(x + 1.0, 0.0, 0.0),
            Point3::new(x + 1.0, 1.0, 0.0),
            Point3::new(x, 1.0, 0.0),
        ]);
    }
    build(&description)
}

/// Unit cube with outward facing quads; corner 0 is the origin.
pub(crate) fn cube() -> GeomDataObject {
    build(&cube_description())
}

pub(crate) fn cube_description() -> MeshDescription {
    let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);
    MeshDescription::new()
        // bottom
        .with_polygon(vec![p(0.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(1.0, 1.0, 0.0), p(1.0, 0.0, 0.0)])
        // top
        .with_polygon(vec![p(0.0, 0.0, 1.0), p(1.0, 0.0, 1.0), p(1.0, 1.0, 1.0), p(0.0, 1.0, 1.0)])
        // front (y = 0)
        .with_polygon(vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(1.0, 0.0, 1.0), p(0.0, 0.0, 1.0)])
        // back (y = 1)
        .with_polygon(vec![p(0.0, 1.0, 0.0), p(0.0, 1.0, 1.0), p(1.0, 1.0, 1.0), p(1.0, 1.0, 0.0)])
        // left (x = 0)
        .with_polygon(vec![p(0.0, 0.0, 0.0), p(0.0, 0.0, 1.0), p(0.0, 1.0, 1.0), p(0.0, 1.0, 0.0)])
        // right (x = 1)
        .with_polygon(vec![p(1.0, 0.0, 0.0), p(1.0, 1.0, 0.0), p(1.0, 1.0, 1.0), p(1.0, 0.0, 1.0)])
}
