//! What a parking search returns.

use thiserror::Error;

use pk_core::{BuildingId, Rotation, SegmentId, Vec3};
use pk_spatial::PathPosition;

/// Where a chosen parking space is.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParkingSpaceLocation {
    #[default]
    None,
    /// A parking lane of this segment.
    RoadSide(SegmentId),
    /// A parking lot of this building.
    Building(BuildingId),
}

impl ParkingSpaceLocation {
    #[inline]
    pub fn is_none(self) -> bool {
        self == ParkingSpaceLocation::None
    }
}

/// A concrete parking space.  Produced by a search and consumed right away;
/// it is never stored.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParkingSpace {
    pub location:    ParkingSpaceLocation,
    pub position:    Vec3,
    pub rotation:    Rotation,
    /// Normalised lane offset: the parking lane's for roadside spaces, the
    /// pedestrian lane's for building spaces when a segment was given.
    pub lane_offset: Option<f32>,
}

/// Why no parked vehicle could be placed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ParkingError {
    #[error("parked vehicle pool limit hit")]
    LimitHit,

    #[error("no parking space found")]
    NoSpaceFound,
}

/// Input of [`ParkingSpaceFinder::find_parking_space_for_citizen`](crate::ParkingSpaceFinder::find_parking_space_for_citizen).
#[derive(Copy, Clone, Debug)]
pub struct CitizenParkingRequest {
    pub end_pos:        Vec3,
    pub info:           pk_agent::VehicleInfo,
    pub home:           BuildingId,
    pub going_home:     bool,
    pub tourist:        bool,
    pub allow_tourists: bool,
}

/// A parking space picked before starting a car path, plus the sidewalk
/// position the path should end at.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CitizenParkingPlan {
    pub space:             ParkingSpace,
    /// `None` means the path engine must work out the end position itself.
    pub end_path_position: Option<PathPosition>,
}

impl CitizenParkingPlan {
    #[inline]
    pub fn calculate_end_pos(&self) -> bool {
        self.end_path_position.is_none()
    }
}
