//! Editable polygon mesh core: welded topology, shared normals and
//! smoothing groups, selection, transforms, incremental edit history and
//! gradual (frame-sliced) operations.

pub mod context;
pub mod error;
pub mod gradual;
pub mod history;
pub mod math;
pub mod normals;
pub mod object;
pub mod operations;
pub mod render;
pub mod selection;
pub mod topology;

#[cfg(test)]
mod testing;

pub use context::{EditContext, SelectionColors, WeldParams};
pub use error::{EditMeshError, Result};
pub use object::{GeomDataObject, ObjectId, ObjectProvider};
