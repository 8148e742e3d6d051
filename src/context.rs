use crate::topology::SubobjectLevel;

/// RGBA highlight colors per subobject level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionColors {
    pub selected: [[f32; 4]; 4],
    pub unselected: [[f32; 4]; 4],
}

impl Default for SelectionColors {
    fn default() -> Self {
        Self {
            selected: [
                [1.0, 0.0, 0.0, 1.0],
                [1.0, 0.0, 0.0, 1.0],
                [1.0, 0.0, 0.0, 1.0],
                [1.0, 0.0, 0.0, 1.0],
            ],
            unselected: [
                [0.5, 0.5, 1.0, 1.0],
                [0.5, 0.5, 1.0, 1.0],
                [1.0, 1.0, 1.0, 1.0],
                [0.7, 0.7, 0.0, 1.0],
            ],
        }
    }
}

impl SelectionColors {
    /// Color of a subobject at `level` in the given selection state.
    #[must_use]
    pub fn color(&self, level: SubobjectLevel, selected: bool) -> [f32; 4] {
        if selected {
            self.selected[level.index()]
        } else {
            self.unselected[level.index()]
        }
    }
}

/// Settings every editing operation receives explicitly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditContext {
    /// Subobject level selections and transforms act on.
    pub level: SubobjectLevel,
    /// Grid increment translations snap to, if any.
    pub snap_increment: Option<f64>,
    /// Highlight colors render buffers report for each selection state.
    pub colors: SelectionColors,
    /// Number of polygons (or vertex groups) a gradual task handles per step.
    pub batch_size: usize,
}

impl Default for EditContext {
    fn default() -> Self {
        Self {
            level: SubobjectLevel::Vertex,
            snap_increment: None,
            colors: SelectionColors::default(),
            batch_size: 256,
        }
    }
}

impl EditContext {
    /// Returns a copy with a different active level.
    #[must_use]
    pub fn with_level(mut self, level: SubobjectLevel) -> Self {
        self.level = level;
        self
    }
}

/// Parameters for welding coincident corners when geometry is built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeldParams {
    /// Corners closer than this are welded.
    pub tolerance: f64,
}

impl Default for WeldParams {
    fn default() -> Self {
        Self { tolerance: 1e-6 }
    }
}
