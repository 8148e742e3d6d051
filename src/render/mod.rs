//! In-core mirror of the host's per-row vertex buffers.
//!
//! The core never talks to a graphics API. Every write lands here, bumps a
//! write counter and marks the row dirty; the host drains the accumulated
//! [`BufferUpdates`] once per frame and uploads them however it likes.

mod subobject;

pub use subobject::{level_rows, Subobject};

use std::collections::BTreeSet;
use std::ops::Range;

use crate::context::EditContext;
use crate::math::{Point2, Point3, Vector3};
use crate::topology::{SubobjectLevel, UvMap, VertexId};

/// Contents of one buffer row. Each polygon corner owns exactly one row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowData {
    pub vertex: VertexId,
    pub position: Point3,
    pub normal: Vector3,
    pub uvs: UvMap,
    /// Highlight state per subobject level.
    pub highlight: [bool; 4],
}

impl RowData {
    fn new(vertex: VertexId) -> Self {
        Self {
            vertex,
            position: Point3::origin(),
            normal: Vector3::z(),
            uvs: UvMap::new(),
            highlight: [false; 4],
        }
    }
}

/// Changes accumulated since the host last drained the buffers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferUpdates {
    /// Removed row ranges, in the order they were removed.
    pub removed: Vec<Range<usize>>,
    /// Rows appended at the end.
    pub appended: usize,
    /// Rows whose contents changed (indices valid after the removals).
    pub dirty_rows: BTreeSet<usize>,
    /// The whole buffer was replaced; the host must re-upload every row.
    pub rebuilt: bool,
}

/// Row storage plus row ↔ vertex bookkeeping.
#[derive(Debug, Clone, Default)]
pub struct RenderBuffers {
    rows: Vec<RowData>,
    writes: u64,
    updates: BufferUpdates,
}

impl RenderBuffers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn row(&self, row: usize) -> Option<&RowData> {
        self.rows.get(row)
    }

    /// Vertex stored in `row`.
    #[must_use]
    pub fn vertex_at(&self, row: usize) -> Option<VertexId> {
        self.rows.get(row).map(|r| r.vertex)
    }

    /// Total number of buffer writes performed so far.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Drains the accumulated updates.
    pub fn take_updates(&mut self) -> BufferUpdates {
        std::mem::take(&mut self.updates)
    }

    /// Appends a row for `vertex` and returns its index.
    pub fn append_row(&mut self, vertex: VertexId) -> usize {
        self.rows.push(RowData::new(vertex));
        self.writes += 1;
        self.updates.appended += 1;
        let row = self.rows.len() - 1;
        self.updates.dirty_rows.insert(row);
        row
    }

    /// Removes a range of rows, shifting later rows down.
    ///
    /// Callers removing several ranges in one pass must do so in descending
    /// order of `range.start`, so earlier removals never shift a range that
    /// is still to be removed.
    pub fn remove_rows(&mut self, range: Range<usize>) {
        let end = range.end.min(self.rows.len());
        let start = range.start.min(end);
        if start == end {
            return;
        }
        self.rows.drain(start..end);
        self.writes += 1;
        let len = end - start;
        self.updates.dirty_rows = self
            .updates
            .dirty_rows
            .iter()
            .filter(|r| !(start..end).contains(r))
            .map(|&r| if r >= end { r - len } else { r })
            .collect();
        self.updates.removed.push(start..end);
    }

    /// Replaces every row with the rows of `snapshot`.
    ///
    /// Used to roll back a cancelled operation. Counts as one write.
    pub fn restore_rows(&mut self, snapshot: &RenderBuffers) {
        self.rows.clone_from(&snapshot.rows);
        self.writes += 1;
        self.updates = BufferUpdates {
            dirty_rows: (0..self.rows.len()).collect(),
            rebuilt: true,
            ..BufferUpdates::default()
        };
    }

    /// Vertices occupying rows at or after `from`, with their rows.
    pub fn rows_from(&self, from: usize) -> impl Iterator<Item = (usize, VertexId)> + '_ {
        self.rows
            .iter()
            .enumerate()
            .skip(from)
            .map(|(i, r)| (i, r.vertex))
    }

    fn touch(&mut self, row: usize) -> Option<&mut RowData> {
        let data = self.rows.get_mut(row)?;
        self.writes += 1;
        self.updates.dirty_rows.insert(row);
        Some(data)
    }

    pub fn write_position(&mut self, row: usize, position: Point3) {
        if let Some(data) = self.touch(row) {
            data.position = position;
        }
    }

    pub fn write_normal(&mut self, row: usize, normal: Vector3) {
        if let Some(data) = self.touch(row) {
            data.normal = normal;
        }
    }

    pub fn write_uvs(&mut self, row: usize, uvs: &UvMap) {
        if let Some(data) = self.touch(row) {
            data.uvs.clone_from(uvs);
        }
    }

    pub fn write_uv(&mut self, row: usize, uv_set: u8, uv: Point2) {
        if let Some(data) = self.touch(row) {
            data.uvs.insert(uv_set, uv);
        }
    }

    pub fn write_highlight(&mut self, row: usize, level: SubobjectLevel, selected: bool) {
        if let Some(data) = self.touch(row) {
            data.highlight[level.index()] = selected;
        }
    }

    /// Display color of `row` at `level`, taken from the context's
    /// selection colors.
    #[must_use]
    pub fn highlight_color(&self, row: usize, level: SubobjectLevel, ctx: &EditContext) -> Option<[f32; 4]> {
        self.rows
            .get(row)
            .map(|r| ctx.colors.color(level, r.highlight[level.index()]))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::SelectionColors;

    fn buffers_with(n: u32) -> RenderBuffers {
        let mut b = RenderBuffers::new();
        for i in 0..n {
            b.append_row(VertexId(i));
        }
        b
    }

    #[test]
    fn descending_removal_keeps_ranges_valid() {
        let mut b = buffers_with(9);
        let mut ranges = vec![0..3, 6..9];
        ranges.sort_by(|a, c| c.start.cmp(&a.start));
        for r in ranges {
            b.remove_rows(r);
        }
        let left: Vec<_> = b.rows_from(0).map(|(_, v)| v).collect();
        assert_eq!(left, vec![VertexId(3), VertexId(4), VertexId(5)]);
    }

    #[test]
    fn writes_are_counted_and_drained() {
        let mut b = buffers_with(2);
        b.take_updates();
        let before = b.write_count();
        b.write_position(1, Point3::new(1.0, 2.0, 3.0));
        b.write_highlight(0, SubobjectLevel::Edge, true);
        assert_eq!(b.write_count(), before + 2);
        let updates = b.take_updates();
        assert_eq!(updates.dirty_rows, BTreeSet::from([0, 1]));
        assert!(b.take_updates().dirty_rows.is_empty());
    }

    #[test]
    fn removal_shifts_dirty_rows() {
        let mut b = buffers_with(6);
        b.take_updates();
        b.write_normal(5, Vector3::x());
        b.remove_rows(1..3);
        assert_eq!(b.take_updates().dirty_rows, BTreeSet::from([3]));
    }

    #[test]
    fn restoring_rows_flags_a_rebuild() {
        let snapshot = buffers_with(2);
        let mut b = buffers_with(4);
        b.take_updates();
        b.restore_rows(&snapshot);
        assert_eq!(b.len(), 2);
        let updates = b.take_updates();
        assert!(updates.rebuilt);
        assert_eq!(updates.dirty_rows.len(), 2);
    }

    #[test]
    fn highlight_color_follows_state() {
        let mut b = buffers_with(1);
        let ctx = EditContext::default();
        b.write_highlight(0, SubobjectLevel::Polygon, true);
        assert_eq!(
            b.highlight_color(0, SubobjectLevel::Polygon, &ctx).unwrap(),
            ctx.colors.selected[2]
        );
        assert!(b.highlight_color(1, SubobjectLevel::Polygon, &ctx).is_none());
    }

    #[test]
    fn highlight_color_uses_context_palette() {
        let mut b = buffers_with(1);
        let mut colors = SelectionColors::default();
        colors.unselected[0] = [0.0, 1.0, 0.0, 1.0];
        let ctx = EditContext {
            colors,
            ..EditContext::default()
        };
        b.write_highlight(0, SubobjectLevel::Vertex, false);
        assert_eq!(
            b.highlight_color(0, SubobjectLevel::Vertex, &ctx),
            Some([0.0, 1.0, 0.0, 1.0])
        );
    }
}
