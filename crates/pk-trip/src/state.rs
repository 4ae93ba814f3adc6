//! Extended per-agent trip state.
//!
//! The host pools know nothing about parking.  Everything the trip state
//! machine remembers between ticks lives in side records keyed by the host
//! ids and owned by [`ExtStore`].  Records that were never written read as
//! their defaults, so a fresh instance is always in [`ExtPathMode::None`].

use rustc_hash::FxHashMap;

use pk_core::{CitizenId, CitizenInstanceId, ExtTransportMode, ExtVehicleType, PathId, VehicleId};
use pk_parking::ParkingSpaceLocation;
use pk_spatial::PathPosition;

use crate::path::{PathFinder, PathState};

// ── ExtPathMode ───────────────────────────────────────────────────────────────

/// Where a traveller is in the park-and-ride life cycle.
///
/// `Requires*` modes wait for the next path request, `Calculating*` modes
/// wait for the engine, the rest are being acted out.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExtPathMode {
    #[default]
    None,
    RequiresCarPath,
    /// Drive towards the target, allowing public transport on the way.
    RequiresMixedCarPathToTarget,
    CalculatingCarPathToTarget,
    CalculatingCarPathToKnownParkPos,
    CalculatingCarPathToAltParkPos,
    DrivingToTarget,
    DrivingToKnownParkPos,
    DrivingToAltParkPos,
    /// Arrived at the planned space and found it taken.
    ParkingFailed,
    RequiresWalkingPathToParkedCar,
    CalculatingWalkingPathToParkedCar,
    WalkingToParkedCar,
    /// Off the path, stepping straight at the car door.
    ApproachingParkedCar,
    RequiresWalkingPathToTarget,
    CalculatingWalkingPathToTarget,
    WalkingToTarget,
    TaxiToTarget,
}

/// Coarse grouping of [`ExtPathMode`]s.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TripPhase {
    Idle,
    PreparingCarTrip,
    Driving,
    Parking,
    WalkingToCar,
    WalkingToTarget,
    Taxi,
}

impl ExtPathMode {
    pub const ALL: [ExtPathMode; 18] = [
        ExtPathMode::None,
        ExtPathMode::RequiresCarPath,
        ExtPathMode::RequiresMixedCarPathToTarget,
        ExtPathMode::CalculatingCarPathToTarget,
        ExtPathMode::CalculatingCarPathToKnownParkPos,
        ExtPathMode::CalculatingCarPathToAltParkPos,
        ExtPathMode::DrivingToTarget,
        ExtPathMode::DrivingToKnownParkPos,
        ExtPathMode::DrivingToAltParkPos,
        ExtPathMode::ParkingFailed,
        ExtPathMode::RequiresWalkingPathToParkedCar,
        ExtPathMode::CalculatingWalkingPathToParkedCar,
        ExtPathMode::WalkingToParkedCar,
        ExtPathMode::ApproachingParkedCar,
        ExtPathMode::RequiresWalkingPathToTarget,
        ExtPathMode::CalculatingWalkingPathToTarget,
        ExtPathMode::WalkingToTarget,
        ExtPathMode::TaxiToTarget,
    ];

    pub fn phase(self) -> TripPhase {
        use ExtPathMode::*;
        match self {
            None => TripPhase::Idle,
            RequiresCarPath
            | RequiresMixedCarPathToTarget
            | CalculatingCarPathToTarget
            | CalculatingCarPathToKnownParkPos => TripPhase::PreparingCarTrip,
            DrivingToTarget | DrivingToKnownParkPos | DrivingToAltParkPos => TripPhase::Driving,
            ParkingFailed | CalculatingCarPathToAltParkPos => TripPhase::Parking,
            RequiresWalkingPathToParkedCar
            | CalculatingWalkingPathToParkedCar
            | WalkingToParkedCar
            | ApproachingParkedCar => TripPhase::WalkingToCar,
            RequiresWalkingPathToTarget | CalculatingWalkingPathToTarget | WalkingToTarget => {
                TripPhase::WalkingToTarget
            }
            TaxiToTarget => TripPhase::Taxi,
        }
    }

    #[inline]
    pub fn is_calculating_car_path(self) -> bool {
        matches!(
            self,
            ExtPathMode::CalculatingCarPathToTarget
                | ExtPathMode::CalculatingCarPathToKnownParkPos
                | ExtPathMode::CalculatingCarPathToAltParkPos
        )
    }

    #[inline]
    pub fn is_walking_to_car(self) -> bool {
        self.phase() == TripPhase::WalkingToCar
    }

    /// Modes in which the traveller should be sitting in a car.
    #[inline]
    pub fn requires_car(self) -> bool {
        matches!(
            self,
            ExtPathMode::RequiresCarPath
                | ExtPathMode::RequiresMixedCarPathToTarget
                | ExtPathMode::CalculatingCarPathToKnownParkPos
                | ExtPathMode::CalculatingCarPathToTarget
                | ExtPathMode::DrivingToKnownParkPos
                | ExtPathMode::DrivingToTarget
        )
    }
}

// ── Soft path state ───────────────────────────────────────────────────────────

/// Outcome of reconciling a path result with the trip state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExtSoftPathState {
    /// Still waiting for the engine.
    Calculating,
    /// Path accepted; act it out.
    Ready,
    /// Give up the trip.
    FailedHard,
    /// The stored mode says what to request next.
    FailedSoft,
    /// Handled here; the host must not touch the path.
    Ignore,
}

impl From<PathState> for ExtSoftPathState {
    fn from(state: PathState) -> Self {
        match state {
            PathState::Calculating => ExtSoftPathState::Calculating,
            PathState::Ready => ExtSoftPathState::Ready,
            PathState::None | PathState::Failed => ExtSoftPathState::FailedHard,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParkedCarApproachState {
    /// Not approaching a car this tick.
    None,
    Approaching,
    Approached,
    Failure,
}

// ── Records ───────────────────────────────────────────────────────────────────

/// Trip state of one citizen instance.  Drivers keep theirs too; a vehicle
/// finds it through [`ExtVehicle::driver_instance`].
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtCitizenInstance {
    pub path_mode:                   ExtPathMode,
    pub failed_parking_attempts:     u32,
    pub parking_space_location:      ParkingSpaceLocation,
    /// Where a car path to an alternative space has to start.
    pub parking_path_start_position: Option<PathPosition>,
    /// Walk from the planned space to the target, used to validate the plan.
    pub return_path:                 Option<PathId>,
    pub return_path_state:           PathState,
    /// Smallest squared distance to the car door seen while approaching.
    pub last_distance_to_parked_car: f32,
    /// The trip starts at a road outside connection; there is no parked car.
    pub at_outside_connection:       bool,
}

impl Default for ExtCitizenInstance {
    fn default() -> Self {
        Self {
            path_mode: ExtPathMode::None,
            failed_parking_attempts: 0,
            parking_space_location: ParkingSpaceLocation::None,
            parking_path_start_position: None,
            return_path: None,
            return_path_state: PathState::None,
            last_distance_to_parked_car: f32::MAX,
            at_outside_connection: false,
        }
    }
}

impl ExtCitizenInstance {
    /// Give the return path back to the engine.
    pub fn release_return_path<P: PathFinder + ?Sized>(&mut self, paths: &mut P) {
        if let Some(path) = self.return_path.take() {
            paths.release(path);
        }
        self.return_path_state = PathState::None;
    }

    /// Release the return path and restore every field to its default.
    pub fn reset<P: PathFinder + ?Sized>(&mut self, paths: &mut P) {
        self.release_return_path(paths);
        *self = Self::default();
    }

    /// Poll the return path unless its state is already final.
    pub fn update_return_path_state<P: PathFinder + ?Sized>(&mut self, paths: &P) {
        if self.return_path_state == PathState::Calculating {
            if let Some(path) = self.return_path {
                self.return_path_state = paths.poll(path);
            }
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtCitizen {
    /// Modes used on the trip in progress.
    pub transport_mode:      ExtTransportMode,
    /// `transport_mode` as it was when last cleared.
    pub last_transport_mode: ExtTransportMode,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtVehicle {
    pub vehicle_type:    ExtVehicleType,
    pub driver_instance: CitizenInstanceId,
}

// ── ExtStore ──────────────────────────────────────────────────────────────────

/// Side tables for all extended records.
#[derive(Default)]
pub struct ExtStore {
    instances: FxHashMap<CitizenInstanceId, ExtCitizenInstance>,
    citizens:  FxHashMap<CitizenId, ExtCitizen>,
    vehicles:  FxHashMap<VehicleId, ExtVehicle>,
}

impl ExtStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of an instance's record; unknown ids read as the default.
    pub fn instance(&self, id: CitizenInstanceId) -> ExtCitizenInstance {
        self.instances.get(&id).copied().unwrap_or_default()
    }

    pub fn set_instance(&mut self, id: CitizenInstanceId, ext: ExtCitizenInstance) {
        if ext == ExtCitizenInstance::default() {
            self.instances.remove(&id);
        } else {
            self.instances.insert(id, ext);
        }
    }

    pub fn instance_ids(&self) -> Vec<CitizenInstanceId> {
        self.instances.keys().copied().collect()
    }

    pub fn remove_instance(&mut self, id: CitizenInstanceId) -> Option<ExtCitizenInstance> {
        self.instances.remove(&id)
    }

    pub fn citizen(&self, id: CitizenId) -> ExtCitizen {
        self.citizens.get(&id).copied().unwrap_or_default()
    }

    pub fn citizen_mut(&mut self, id: CitizenId) -> &mut ExtCitizen {
        self.citizens.entry(id).or_default()
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<ExtVehicle> {
        self.vehicles.get(&id).copied()
    }

    pub fn set_vehicle(&mut self, id: VehicleId, ext: ExtVehicle) {
        self.vehicles.insert(id, ext);
    }

    pub fn remove_vehicle(&mut self, id: VehicleId) -> Option<ExtVehicle> {
        self.vehicles.remove(&id)
    }

    /// Number of instances with non-default state.
    pub fn active_instances(&self) -> usize {
        self.instances.len()
    }

    pub fn active_vehicles(&self) -> usize {
        self.vehicles.len()
    }

    /// Forget everything.  Return paths must have been released already.
    pub fn clear(&mut self) {
        self.instances.clear();
        self.citizens.clear();
        self.vehicles.clear();
    }
}
