mod create_geometry;
mod create_polygon;
mod triangulation;

pub use create_geometry::{MeshDescription, PolygonDescription};
pub use create_polygon::CreatePolygon;
pub use triangulation::{fan, triangulate};
