mod delete;
mod edge_weld;
mod retriangulate;
mod uvs;
mod weld;

pub use delete::{DeletePolygons, DeletePolygonsTask};
pub use edge_weld::{BreakEdges, MergeEdges};
pub use retriangulate::{AutoTriangulate, Retriangulate, RetriangulateTask};
pub use uvs::SetUvs;
pub use weld::{BreakVertices, MergeVertices};
