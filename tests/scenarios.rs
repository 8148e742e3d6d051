#![allow(clippy::unwrap_used)]

mod common;

use std::collections::BTreeSet;

use common::{commit, grid, grid_with_groups, init_tracing, recorded, two_triangle_plane};
use editmesh::error::{EditMeshError, HistoryError};
use editmesh::gradual::{TaskEvent, TaskRunner};
use editmesh::history::{EditTime, PropertyId, RestoreType};
use editmesh::math::{Point3, Vector3};
use editmesh::operations::modification::{DeletePolygons, DeletePolygonsTask, MergeVertices};
use editmesh::operations::query::ValidateTopology;
use editmesh::operations::transform::{Transform, TransformSession};
use editmesh::selection::SelectionMode;
use editmesh::topology::{PolygonId, SubobjectLevel, VertexId};
use editmesh::{EditContext, GeomDataObject, ObjectId};

fn move_vertex(obj: &mut GeomDataObject, v: VertexId, by: Vector3) {
    obj.select(SubobjectLevel::Vertex, &[v.0], SelectionMode::Replace);
    let mut session = TransformSession::begin(obj, &EditContext::default()).unwrap();
    session.apply(obj, Transform::Translate(by));
    assert!(session.finalize(obj).unwrap());
}

#[test]
fn smooth_shaded_strip() {
    init_tracing();
    let mut obj = grid(2, 1, false);
    assert_eq!(obj.store().merged_vertices().len(), 6);

    // The shared corners are welded by construction already.
    let shared = obj.store().merged_vertices().siblings(VertexId(1));
    assert_eq!(shared, BTreeSet::from([VertexId(1), VertexId(4)]));
    let merged = MergeVertices::new(vec![VertexId(1), VertexId(4)])
        .execute(&mut obj)
        .unwrap();
    assert!(!merged);

    obj.select(SubobjectLevel::Polygon, &[0, 1], SelectionMode::Replace);
    assert!(obj.set_smooth_shaded(true));

    let state = obj.observable_state();
    assert_eq!(
        state.smoothing,
        BTreeSet::from([BTreeSet::from([PolygonId(0), PolygonId(1)])])
    );
    let pairs: Vec<_> = state.shared_normals.iter().filter(|g| g.len() > 1).collect();
    assert_eq!(pairs.len(), 2);
    for group in pairs {
        let welds: BTreeSet<_> = group
            .iter()
            .map(|&v| obj.store().merged_vertices().group_of(v))
            .collect();
        assert_eq!(welds.len(), 1);
    }
    assert!(ValidateTopology::new().execute(obj.store()).is_ok());
}

#[test]
fn three_groups_meet_at_one_corner() {
    // Quads 0, 1, 3 and 4 meet at (1, 1); each group holds one of them.
    let mut obj = grid_with_groups(3, 3, &[vec![0, 1], vec![3, 6], vec![4, 5]]);
    let expected: BTreeSet<BTreeSet<PolygonId>> = [[0, 1], [3, 6], [4, 5]]
        .into_iter()
        .map(|pair| pair.into_iter().map(PolygonId).collect())
        .collect();
    assert_eq!(obj.store().smoothing_sets(), expected);

    let corner = obj.store().merged_vertices().siblings(VertexId(2));
    assert_eq!(corner.len(), 4);
    let normals: BTreeSet<_> = corner
        .iter()
        .map(|&v| obj.store().shared_normals().group_of(v))
        .collect();
    assert_eq!(normals.len(), 3);

    assert!(!obj.update_normal_sharing_from_smoothing(None));
    assert!(!obj.update_smoothing());
    assert_eq!(obj.store().smoothing_sets(), expected);
}

#[test]
fn deleting_one_triangle_unwelds_the_diagonal() {
    init_tracing();
    let mut obj = two_triangle_plane();
    let removed = DeletePolygons::new(vec![PolygonId(1)])
        .execute(&mut obj, &EditContext::default())
        .unwrap();
    assert_eq!(removed, 1);

    let store = obj.store();
    assert_eq!(store.vertex_count(), 3);
    assert_eq!(store.edge_count(), 3);
    assert_eq!(store.polygon_count(), 1);
    for v in [VertexId(0), VertexId(2)] {
        assert_eq!(store.merged_vertices().siblings(v), BTreeSet::from([v]));
    }
    assert!(ValidateTopology::new().execute(store).is_ok());
}

#[test]
fn move_then_delete_restores_both_ways() {
    init_tracing();
    let mut obj = two_triangle_plane();
    let (mut history, _) = recorded(&mut obj);

    // E1: move the corner of polygon 1 that is not welded to anything.
    let a = VertexId(5);
    move_vertex(&mut obj, a, Vector3::new(0.0, 0.5, 0.0));
    let e1 = commit(&mut obj, &mut history).unwrap();
    let moved_to = obj.store().vertex(a).unwrap().position;

    // E2: delete polygon 1, which owns the moved corner.
    DeletePolygons::new(vec![PolygonId(1)])
        .execute(&mut obj, &EditContext::default())
        .unwrap();
    let e2 = commit(&mut obj, &mut history).unwrap();
    let after_e2 = obj.observable_state();

    obj.restore(&history, e2, e1).unwrap();
    assert!(obj.store().contains_polygon(PolygonId(1)));
    assert_eq!(obj.store().vertex(a).unwrap().position, moved_to);
    assert_eq!(moved_to, Point3::new(0.0, 1.5, 0.0));
    assert!(ValidateTopology::new().execute(obj.store()).is_ok());

    obj.restore(&history, e1, e2).unwrap();
    assert_eq!(obj.observable_state(), after_e2);
}

#[test]
fn branching_edits_jump_between_branches() {
    let mut obj = grid(2, 1, true);
    let (mut history, start) = recorded(&mut obj);

    move_vertex(&mut obj, VertexId(2), Vector3::new(0.0, 0.0, 1.0));
    let left = commit(&mut obj, &mut history).unwrap();
    let left_state = obj.observable_state();

    obj.restore_data(&history, &[], RestoreType::Undo, left, start)
        .unwrap();
    history.set_current(start).unwrap();
    move_vertex(&mut obj, VertexId(0), Vector3::new(0.0, 0.0, -1.0));
    let right = commit(&mut obj, &mut history).unwrap();
    let right_state = obj.observable_state();
    assert_eq!(history.parent(right), Some(start));

    // Neither branch is an ancestor of the other.
    let err = obj.restore_data(&history, &[], RestoreType::Undo, right, left);
    assert!(matches!(
        err,
        Err(EditMeshError::History(HistoryError::DirectionMismatch(_)))
    ));

    obj.restore_data(&history, &[], RestoreType::Jump, right, left)
        .unwrap();
    assert_eq!(obj.observable_state(), left_state);
    obj.restore(&history, left, right).unwrap();
    assert_eq!(obj.observable_state(), right_state);
}

#[test]
fn unreachable_time_is_a_timeline_gap() {
    let mut obj = two_triangle_plane();
    let (history, start) = recorded(&mut obj);
    let before = obj.observable_state();

    let err = obj.restore(&history, start, EditTime(start.0 + 1000));
    assert!(matches!(
        err,
        Err(EditMeshError::History(HistoryError::TimelineGap { .. }))
    ));
    assert_eq!(obj.observable_state(), before);
}

#[test]
fn forgotten_record_leaves_object_untouched() {
    let mut obj = grid(2, 1, false);
    let (mut history, start) = recorded(&mut obj);
    move_vertex(&mut obj, VertexId(5), Vector3::new(1.0, 0.0, 0.0));
    let moved = commit(&mut obj, &mut history).unwrap();
    history.forget(obj.id(), PropertyId::SubobjTransform, start);

    let before = obj.observable_state();
    assert!(obj.restore(&history, moved, start).is_err());
    assert_eq!(obj.observable_state(), before);
}

#[test]
fn gradual_deletion_across_objects() {
    init_tracing();
    let mut objects = std::collections::HashMap::new();
    objects.insert(ObjectId(7), grid(3, 3, true));
    let ctx = EditContext {
        batch_size: 2,
        ..EditContext::default()
    };
    let targets: Vec<PolygonId> = (0..5).map(PolygonId).collect();
    let mut runner = TaskRunner::new();
    let (id, _token) = runner.submit(Box::new(DeletePolygonsTask::new(
        ObjectId(7),
        targets,
        &ctx,
    )));

    let mut ticks = 0;
    let mut events = Vec::new();
    while !runner.is_idle() {
        events.extend(runner.tick(&mut objects));
        ticks += 1;
    }
    assert!(ticks >= 3);
    assert_eq!(
        events,
        vec![TaskEvent::Finished {
            task: id,
            object: ObjectId(7)
        }]
    );
    let obj = &objects[&ObjectId(7)];
    assert_eq!(obj.store().polygon_count(), 4);
    assert!(ValidateTopology::new().execute(obj.store()).is_ok());
}
