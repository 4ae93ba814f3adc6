//! Turning a parked car into a live vehicle.
//!
//! The hand-over is all or nothing: until the vehicle AI has accepted the new
//! vehicle nothing outside the vehicle pool is touched, and a refused vehicle
//! is released again.

use tracing::{debug, trace};

use pk_agent::{AgentError, InstanceFlag, InstanceRef, Vehicle, VehicleFlag};
use pk_core::{CitizenInstanceId, ParkedVehicleId, VehicleId};
use pk_spatial::{PathPosition, SpatialError};

use crate::path::PathFinder;
use crate::state::ExtVehicle;
use crate::world::World;
use crate::{TripError, TripResult};

// ── VehicleSpawner trait ──────────────────────────────────────────────────────

/// The host's vehicle AI, asked to put a freshly created vehicle on the road.
///
/// # Thread safety
///
/// Spawning happens on the simulation thread only; the trait still requires
/// `Send` so the owning state machine can move between threads.
pub trait VehicleSpawner: Send {
    /// `false` refuses the vehicle; the caller then releases it.
    fn try_spawn(&mut self, id: VehicleId, vehicle: &mut Vehicle) -> bool;
}

/// Accepts every vehicle and marks it spawned.
#[derive(Copy, Clone, Debug, Default)]
pub struct AlwaysSpawn;

impl VehicleSpawner for AlwaysSpawn {
    fn try_spawn(&mut self, _id: VehicleId, vehicle: &mut Vehicle) -> bool {
        vehicle.flags.insert(VehicleFlag::Spawned);
        true
    }
}

// ── enter_parked_car ──────────────────────────────────────────────────────────

/// Put the citizen behind `instance_id` into their parked car.
///
/// The instance's path becomes the vehicle's path; its first position picks
/// the lane the vehicle pulls out onto.  Returns the new vehicle, or `None`
/// when the path has no first position, the vehicle pool is full or the
/// spawner refuses.  In every `None` case the world is left as it was.
pub fn enter_parked_car<P, S>(
    world:       &mut World,
    paths:       &P,
    spawner:     &mut S,
    instance_id: CitizenInstanceId,
    parked_id:   ParkedVehicleId,
) -> TripResult<Option<VehicleId>>
where
    P: PathFinder + ?Sized,
    S: VehicleSpawner + ?Sized,
{
    let instance = world.agents.instance(instance_id)?;
    let citizen = instance.citizen;
    let path = instance.path.ok_or(TripError::NoPath(instance_id))?;
    let parked = world
        .agents
        .parked
        .get(parked_id)
        .ok_or(AgentError::StaleParkedVehicle(parked_id))?;
    let (info, position, rotation) = (parked.info, parked.position, parked.rotation);
    // The commit below only touches records resolved here.
    world.agents.citizen(citizen)?;

    let Some(first) = paths.summary(path).and_then(|s| s.first_position()) else {
        debug!(%instance_id, %path, "path has no first position, cannot enter parked car");
        return Ok(None);
    };
    let lane = world
        .network
        .segment(first.segment)?
        .lane(first.lane)
        .ok_or(SpatialError::UnknownLane { segment: first.segment, lane: first.lane })?;
    let (lane_pos, lane_offset) = lane.closest_position(position);

    let mut vehicle = Vehicle::new(info, position, rotation);
    vehicle.target_pos = lane_pos;
    vehicle.flags.insert(VehicleFlag::Stopped);
    vehicle.path = Some(path);
    vehicle.path_position_index = 0;
    vehicle.last_path_offset = PathPosition::quantize(lane_offset);
    vehicle.transfer_citizen = citizen;

    let Some(vehicle_id) = world.agents.vehicles.insert(vehicle) else {
        debug!(%instance_id, "vehicle pool full, cannot enter parked car");
        return Ok(None);
    };
    let spawned = match world.agents.vehicles.get_mut(vehicle_id) {
        Some(v) => spawner.try_spawn(vehicle_id, v),
        None => false,
    };
    if !spawned {
        world.agents.vehicles.remove(vehicle_id);
        debug!(%instance_id, %vehicle_id, "vehicle AI refused to spawn");
        return Ok(None);
    }

    // Committed from here on.
    world
        .agents
        .registry
        .change_instance(InstanceRef::ParkedVehicle(parked_id), InstanceRef::Vehicle(vehicle_id));
    world.agents.release_parked_vehicle(parked_id)?;
    world.agents.citizen_mut(citizen)?.vehicle = vehicle_id;

    let instance = world.agents.instance_mut(instance_id)?;
    instance.path = None;
    instance.flags.remove(InstanceFlag::WaitingPath);
    instance.flags.remove(InstanceFlag::EnteringVehicle);
    instance.flags.remove(InstanceFlag::TryingSpawnVehicle);
    instance.flags.remove(InstanceFlag::BoredOfWaiting);
    instance.wait_counter = 0;
    instance.unspawn();

    world
        .ext
        .set_vehicle(vehicle_id, ExtVehicle { vehicle_type: info.ext_type, driver_instance: instance_id });
    trace!(%instance_id, %parked_id, %vehicle_id, "citizen entered parked car");
    Ok(Some(vehicle_id))
}
