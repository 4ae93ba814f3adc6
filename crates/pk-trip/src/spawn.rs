//! Creating and relocating parked cars.
//!
//! A citizen who wants to drive but owns no parked car gets one placed near
//! where they stand; a car left too far from its owner can be moved closer.

use tracing::{debug, trace};

use pk_agent::{AgentError, ParkedFlag, VehicleInfo};
use pk_core::{BuildingId, CitizenId, ParkedVehicleId, Vec3};
use pk_parking::{ParkingError, ParkingSpace, ParkingSpaceFinder};

use crate::world::World;
use crate::TripResult;

/// Move a parked vehicle to the best space near `ref_pos`.  Returns `false`
/// and leaves the vehicle alone when nothing is found.
pub fn try_move_parked_vehicle(
    finder:       &mut ParkingSpaceFinder,
    world:        &mut World,
    parked_id:    ParkedVehicleId,
    ref_pos:      Vec3,
    max_distance: f32,
    home:         BuildingId,
) -> TripResult<bool> {
    let info = world
        .agents
        .parked
        .get(parked_id)
        .ok_or(AgentError::StaleParkedVehicle(parked_id))?
        .info;
    let (view, rng) = world.search_parts();
    let Some(space) = finder.find_parking_space_in_vicinity(view, rng, ref_pos, Vec3::ZERO, &info, home, max_distance)
    else {
        debug!(%parked_id, %ref_pos, "no space to move parked vehicle to");
        return Ok(false);
    };
    world.agents.parked.relocate(parked_id, space.position, space.rotation)?;
    trace!(%parked_id, to = %space.position, "parked vehicle moved");
    Ok(true)
}

/// Place a new parked car for `citizen` near `ref_pos`, at the roadside or
/// on a building lot, whichever is closer.  Returns the car's position.
pub fn try_spawn_parked_passenger_car(
    finder:  &mut ParkingSpaceFinder,
    world:   &mut World,
    citizen: CitizenId,
    home:    BuildingId,
    ref_pos: Vec3,
    info:    &VehicleInfo,
) -> Result<Vec3, ParkingError> {
    let road = road_side_space(finder, world, ref_pos, info);
    let building = building_space(finder, world, home, ref_pos, info);
    let space = match (road, building) {
        (Some(r), Some(b)) => {
            if r.position.sqr_distance(ref_pos) < b.position.sqr_distance(ref_pos) { r } else { b }
        }
        (Some(r), None) => r,
        (None, Some(b)) => b,
        (None, None) => return Err(ParkingError::NoSpaceFound),
    };
    park_new_vehicle(world, citizen, info, space)
}

/// Roadside-only variant of [`try_spawn_parked_passenger_car`].
pub fn try_spawn_parked_passenger_car_road_side(
    finder:  &mut ParkingSpaceFinder,
    world:   &mut World,
    citizen: CitizenId,
    ref_pos: Vec3,
    info:    &VehicleInfo,
) -> Result<Vec3, ParkingError> {
    let space = road_side_space(finder, world, ref_pos, info).ok_or(ParkingError::NoSpaceFound)?;
    park_new_vehicle(world, citizen, info, space)
}

/// Building-lot-only variant of [`try_spawn_parked_passenger_car`].
pub fn try_spawn_parked_passenger_car_building(
    finder:  &mut ParkingSpaceFinder,
    world:   &mut World,
    citizen: CitizenId,
    home:    BuildingId,
    ref_pos: Vec3,
    info:    &VehicleInfo,
) -> Result<Vec3, ParkingError> {
    let space = building_space(finder, world, home, ref_pos, info).ok_or(ParkingError::NoSpaceFound)?;
    park_new_vehicle(world, citizen, info, space)
}

fn road_side_space(
    finder:  &mut ParkingSpaceFinder,
    world:   &mut World,
    ref_pos: Vec3,
    info:    &VehicleInfo,
) -> Option<ParkingSpace> {
    let max_distance = finder.config().max_parked_car_distance_to_building;
    let (view, rng) = world.search_parts();
    finder.find_parking_space_road_side(view, rng, None, ref_pos, info.width, info.length, max_distance)
}

fn building_space(
    finder:  &mut ParkingSpaceFinder,
    world:   &mut World,
    home:    BuildingId,
    ref_pos: Vec3,
    info:    &VehicleInfo,
) -> Option<ParkingSpace> {
    let max_distance = finder.config().max_parked_car_distance_to_building;
    let (view, rng) = world.search_parts();
    finder.find_parking_space_building(view, rng, info, home, None, None, ref_pos, max_distance, max_distance)
}

fn park_new_vehicle(
    world:   &mut World,
    citizen: CitizenId,
    info:    &VehicleInfo,
    space:   ParkingSpace,
) -> Result<Vec3, ParkingError> {
    let id = world
        .agents
        .parked
        .create(*info, space.position, space.rotation, citizen)
        .map_err(|_| ParkingError::LimitHit)?;
    if let Some(record) = world.agents.parked.get_mut(id) {
        record.flags.remove(ParkedFlag::Parking);
    }
    if let Some(c) = world.agents.citizens.get_mut(citizen) {
        c.parked_vehicle = id;
    }
    trace!(%citizen, parked = %id, position = %space.position, location = ?space.location, "parked car spawned");
    Ok(space.position)
}
