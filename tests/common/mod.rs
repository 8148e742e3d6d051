#![allow(dead_code, clippy::unwrap_used)]

use editmesh::history::{EditTime, MemoryHistoryStore};
use editmesh::math::Point3;
use editmesh::operations::creation::MeshDescription;
use editmesh::{GeomDataObject, ObjectId, WeldParams};

/// Installs a subscriber honouring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn build(description: &MeshDescription) -> GeomDataObject {
    GeomDataObject::create_geometry(ObjectId(7), description, &WeldParams::default()).unwrap()
}

/// Unit square made of two triangles sharing the diagonal.
pub fn two_triangle_plane() -> GeomDataObject {
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

/// `nx` by `ny` unit quads on the XY plane, optionally all smoothed
/// together.
pub fn grid(nx: usize, ny: usize, smooth: bool) -> GeomDataObject {
    let groups = if smooth && nx * ny > 1 {
        vec![(0..nx * ny).collect()]
    } else {
        Vec::new()
    };
    grid_with_groups(nx, ny, &groups)
}

/// `nx` by `ny` unit quads with the given smoothing groups, as indices in
/// row-major order.
pub fn grid_with_groups(nx: usize, ny: usize, groups: &[Vec<usize>]) -> GeomDataObject {
    let mut description = MeshDescription::new();
    for iy in 0..ny {
        for ix in 0..nx {
            #[allow(clippy::cast_precision_loss)]
            let (x, y) = (ix as f64, iy as f64);
            description = description.with_polygon(vec![
                Point3::new(x, y, 0.0),
                Point3::new(x + 1.0, y, 0.0),
                Point3::new(x + 1.0, y + 1.0, 0.0),
                Point3::new(x, y + 1.0, 0.0),
            ]);
        }
    }
    for group in groups {
        description = description.with_smoothing_group(group.clone());
    }
    build(&description)
}

/// Records the initial state and closes the edit.
pub fn recorded(obj: &mut GeomDataObject) -> (MemoryHistoryStore, EditTime) {
    let mut history = MemoryHistoryStore::new();
    let time = obj.commit_creation(&mut history);
    history.finish_edit();
    (history, time)
}

/// Commits pending changes as one closed edit.
pub fn commit(obj: &mut GeomDataObject, history: &mut MemoryHistoryStore) -> Option<EditTime> {
    let time = obj.commit(history);
    history.finish_edit();
    time
}
