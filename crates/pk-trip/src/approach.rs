//! Per-tick steps of a pedestrian walking up to their car or their target.
//!
//! Once the sidewalk path runs out the pedestrian leaves it and heads
//! straight for the car door.  Movement here is a plain step towards the
//! door; smoothing and grid bookkeeping belong to the host.

use tracing::{debug, trace};

use pk_agent::{CitizenInstance, InstanceFlag};
use pk_core::{CitizenInstanceId, ParkingConfig};

use crate::path::PathFinder;
use crate::state::{ExtPathMode, ParkedCarApproachState};
use crate::world::World;
use crate::TripResult;

/// A door this much farther (squared) than the closest seen so far means
/// the car moved away underneath the pedestrian.
const DISTANCE_JUMP_SQR: f32 = 1024.0;

/// `true` once the pedestrian has walked past the last position of its path.
fn path_complete<P: PathFinder + ?Sized>(paths: &P, instance: &CitizenInstance) -> bool {
    if instance.path_position_index == u8::MAX {
        return false;
    }
    match instance.path.and_then(|p| paths.summary(p)) {
        Some(summary) => summary.is_complete_at(instance.path_position_index),
        None => true,
    }
}

/// Advance a pedestrian who is walking to or approaching their parked car.
///
/// Returns `Approached` once the pedestrian is close enough to switch into
/// the car (the mode is then `RequiresCarPath`), `Approaching` while still
/// on the way, and `Failure` when the car has vanished.
pub fn citizen_approaching_parked_car_step<P: PathFinder + ?Sized>(
    world:       &mut World,
    paths:       &P,
    config:      &ParkingConfig,
    instance_id: CitizenInstanceId,
) -> TripResult<ParkedCarApproachState> {
    let instance = world.agents.instance(instance_id)?;
    if instance.flags.contains(InstanceFlag::WaitingPath) {
        return Ok(ParkedCarApproachState::None);
    }
    let mut ext = world.ext.instance(instance_id);
    if !matches!(ext.path_mode, ExtPathMode::WalkingToParkedCar | ExtPathMode::ApproachingParkedCar)
        || !instance.is_character()
    {
        return Ok(ParkedCarApproachState::None);
    }

    let Some(parked) = world
        .agents
        .live_parked_vehicle(instance.citizen)
        .and_then(|id| world.agents.parked.get(id))
    else {
        debug!(%instance_id, "parked car vanished while walking to it");
        return Ok(ParkedCarApproachState::Failure);
    };
    let door = parked.info.closest_door_position(parked.position, parked.rotation, instance.position);

    if ext.path_mode == ExtPathMode::WalkingToParkedCar && path_complete(paths, instance) {
        ext.path_mode = ExtPathMode::ApproachingParkedCar;
        ext.last_distance_to_parked_car = instance.position.sqr_distance(door);
        trace!(%instance_id, "end of path reached, approaching parked car");
    }
    if ext.path_mode != ExtPathMode::ApproachingParkedCar {
        return Ok(ParkedCarApproachState::None);
    }

    let instance = world.agents.instance_mut(instance_id)?;
    let door_sqr = instance.position.sqr_distance(door);
    let state = if door_sqr <= config.max_parked_car_instance_switch_sqr_distance {
        ext.path_mode = ExtPathMode::RequiresCarPath;
        ParkedCarApproachState::Approached
    } else if door_sqr > ext.last_distance_to_parked_car + DISTANCE_JUMP_SQR {
        debug!(%instance_id, door_sqr, last = ext.last_distance_to_parked_car, "door moved away, teleporting");
        instance.position = door;
        instance.target_pos = door;
        ext.path_mode = ExtPathMode::RequiresCarPath;
        ParkedCarApproachState::Approached
    } else {
        ext.last_distance_to_parked_car = ext.last_distance_to_parked_car.min(door_sqr);
        let to_door = door - instance.position;
        let d = to_door.magnitude();
        let mut step_to = door;
        if d > 1.0 {
            let speed = (d - 5.0).max(d * 0.5);
            step_to = instance.position + to_door * (speed / d);
        }
        instance.target_pos = step_to;
        instance.position = step_to;
        ParkedCarApproachState::Approaching
    };
    world.ext.set_instance(instance_id, ext);
    Ok(state)
}

/// Finish a walking or taxi trip once its path is used up.  Returns `true`
/// when the trip state was reset.
pub fn citizen_approaching_target_step<P: PathFinder + ?Sized>(
    world:       &mut World,
    paths:       &mut P,
    instance_id: CitizenInstanceId,
) -> TripResult<bool> {
    let instance = world.agents.instance(instance_id)?;
    if instance.flags.contains(InstanceFlag::WaitingPath) || !instance.is_character() {
        return Ok(false);
    }
    let mut ext = world.ext.instance(instance_id);
    if !matches!(ext.path_mode, ExtPathMode::WalkingToTarget | ExtPathMode::TaxiToTarget) {
        return Ok(false);
    }
    if !path_complete(&*paths, instance) {
        return Ok(false);
    }
    ext.reset(paths);
    world.ext.set_instance(instance_id, ext);
    trace!(%instance_id, "target reached");
    Ok(true)
}
