use pk_agent::AgentError;
use pk_core::{CitizenInstanceId, PathId};
use pk_spatial::SpatialError;
use thiserror::Error;

/// Misuse of the trip layer.  Domain failures (no path, no parking space)
/// never show up here; they resolve into an `ExtSoftPathState`.
#[derive(Debug, Error)]
pub enum TripError {
    #[error("agent pool: {0}")]
    Agent(#[from] AgentError),

    #[error("spatial lookup: {0}")]
    Spatial(#[from] SpatialError),

    #[error("citizen instance {0} has no path")]
    NoPath(CitizenInstanceId),

    #[error("path {0} is unknown to the path-finding engine")]
    UnknownPath(PathId),
}

pub type TripResult<T> = Result<T, TripError>;
