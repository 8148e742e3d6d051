use thiserror::Error;

use crate::history::EditTime;

/// Top-level error type for the mesh editing core.
#[derive(Debug, Error)]
pub enum EditMeshError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Operation(#[from] OperationError),
}

/// Errors related to the topology store.
///
/// Illegal welds are not reported through this type: they are rejected
/// locally and the operation returns `false`.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("topology inconsistency: {0}")]
    Inconsistency(String),
}

/// Errors raised while replaying edit history.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// No continuous path exists between the requested edit times.
    #[error("timeline gap: no record reachable for {property} at {time}")]
    TimelineGap { property: String, time: EditTime },

    /// A record exists but does not contain the entry its successor points to.
    #[error("history record for {property} at {time} has no entry for {key}")]
    MissingEntry {
        property: String,
        time: EditTime,
        key: String,
    },

    /// Neither edit time has any record of the object.
    #[error("object {0} has no recorded history")]
    UnknownObject(String),

    #[error("restore direction mismatch: {0}")]
    DirectionMismatch(String),
}

/// Errors related to editing operations.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("operation failed: {0}")]
    Failed(String),
}

/// Convenience type alias for results using [`EditMeshError`].
pub type Result<T> = std::result::Result<T, EditMeshError>;
