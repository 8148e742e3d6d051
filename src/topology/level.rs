use std::fmt;

/// Subobject level an edit or selection applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubobjectLevel {
    Vertex,
    Edge,
    Polygon,
    Normal,
}

impl SubobjectLevel {
    /// All levels, in a fixed order.
    pub const ALL: [Self; 4] = [Self::Vertex, Self::Edge, Self::Polygon, Self::Normal];

    /// Dense index, used for per-level arrays.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Vertex => 0,
            Self::Edge => 1,
            Self::Polygon => 2,
            Self::Normal => 3,
        }
    }
}

impl fmt::Display for SubobjectLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vertex => "vert",
            Self::Edge => "edge",
            Self::Polygon => "poly",
            Self::Normal => "normal",
        };
        f.write_str(name)
    }
}
