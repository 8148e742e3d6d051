//! Incremental edit history.
//!
//! Every tracked property keeps, per subobject, the edit time of its last
//! change. A record stored at time `t` holds the new values of the keys
//! changed at `t` and, for each, the time of the change before it. Undo
//! follows those back-pointers; redo replays the new values. Records live
//! in an external [`HistoryStore`]; the object keeps only the stamps.

mod collect;
mod payload;
mod property;
mod record;
mod restore;
mod store;
mod time;
mod tracker;

pub use payload::{EdgePayload, PolygonPayload, VertexPayload};
pub use property::{PropertyId, PropertyValue, SubobjKey};
pub use record::{DeltaEntry, DeltaRecord, EventType, DELTA_FORMAT_VERSION};
pub use restore::{RestoreSummary, RestoreType};
pub use store::{HistoryStore, MemoryHistoryStore};
pub use time::{EditTime, Stamps};
pub use tracker::ChangeTracker;
