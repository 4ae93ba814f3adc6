use pk_core::{BuildingId, SegmentId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("segment {0} not found")]
    UnknownSegment(SegmentId),

    #[error("building {0} not found")]
    UnknownBuilding(BuildingId),

    #[error("segment {segment} has no lane {lane}")]
    UnknownLane { segment: SegmentId, lane: u8 },
}

pub type SpatialResult<T> = Result<T, SpatialError>;
