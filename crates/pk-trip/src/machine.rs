//! The trip state machine.
//!
//! Path results arrive asynchronously.  Once per tick the host hands the
//! engine's state of a traveller's main path to
//! [`update_citizen_path_state`](TripStateMachine::update_citizen_path_state)
//! (pedestrians) or
//! [`update_car_path_state`](TripStateMachine::update_car_path_state)
//! (drivers).  The machine checks the optional return path, advances the
//! traveller's [`ExtPathMode`] and answers with an [`ExtSoftPathState`]:
//!
//! - `FailedSoft` means the stored mode already names the next request, and
//!   [`start_path_find`](TripStateMachine::start_path_find) will issue it.
//! - `FailedHard` means the trip is over; the extended state has been reset
//!   and the citizen's transport mode cleared.
//!
//! Domain failures never surface as `Err`.  Errors are reserved for stale
//! ids and unknown network references.

use tracing::{debug, trace};

use pk_agent::{CitizenInstance, InstanceFlag, Vehicle, VehicleInfo};
use pk_core::{
    CitizenId, CitizenInstanceId, ExtVehicleType, ParkedVehicleId, ParkingConfig, PathId, TransportFlag, Vec3,
    VehicleId,
};
use pk_parking::{CitizenParkingRequest, ParkingError, ParkingSpaceFinder, ParkingSpaceLocation};
use pk_spatial::PathPosition;

use crate::approach::{citizen_approaching_parked_car_step, citizen_approaching_target_step};
use crate::enter::{VehicleSpawner, enter_parked_car};
use crate::path::{PathFinder, PathRequest, PathState};
use crate::spawn::{try_move_parked_vehicle, try_spawn_parked_passenger_car};
use crate::state::{ExtCitizenInstance, ExtPathMode, ExtSoftPathState, ParkedCarApproachState};
use crate::world::World;
use crate::TripResult;

/// Owns the parking search and the two host collaborators.
pub struct TripStateMachine<P, S> {
    config:  ParkingConfig,
    finder:  ParkingSpaceFinder,
    paths:   P,
    spawner: S,
}

impl<P: PathFinder, S: VehicleSpawner> TripStateMachine<P, S> {
    pub fn new(config: ParkingConfig, paths: P, spawner: S) -> Self {
        let finder = ParkingSpaceFinder::new(config.clone());
        Self { config, finder, paths, spawner }
    }

    #[inline]
    pub fn config(&self) -> &ParkingConfig {
        &self.config
    }

    #[inline]
    pub fn paths(&self) -> &P {
        &self.paths
    }

    #[inline]
    pub fn paths_mut(&mut self) -> &mut P {
        &mut self.paths
    }

    #[inline]
    pub fn spawner_mut(&mut self) -> &mut S {
        &mut self.spawner
    }

    #[inline]
    pub fn finder_mut(&mut self) -> &mut ParkingSpaceFinder {
        &mut self.finder
    }

    // ── Pedestrians ───────────────────────────────────────────────────────

    /// Reconcile a pedestrian's main path state with their trip.
    pub fn update_citizen_path_state(
        &mut self,
        world:       &mut World,
        instance_id: CitizenInstanceId,
        main:        PathState,
    ) -> TripResult<ExtSoftPathState> {
        if main == PathState::Calculating {
            return Ok(ExtSoftPathState::Calculating);
        }
        let citizen = world.agents.instance(instance_id)?.citizen;
        let mut ext = world.ext.instance(instance_id);
        let before = ext.path_mode;

        let outcome = self.reconcile_citizen_path(world, instance_id, &mut ext, main);
        world.ext.set_instance(instance_id, ext);
        let state = outcome?;

        if state != ExtSoftPathState::Calculating {
            if let Ok(instance) = world.agents.instance_mut(instance_id) {
                instance.flags.remove(InstanceFlag::WaitingPath);
            }
        }
        settle(world, citizen, before, ext.path_mode, state);
        Ok(state)
    }

    fn reconcile_citizen_path(
        &mut self,
        world:       &mut World,
        instance_id: CitizenInstanceId,
        ext:         &mut ExtCitizenInstance,
        main:        PathState,
    ) -> TripResult<ExtSoftPathState> {
        match main {
            PathState::Calculating => Ok(ExtSoftPathState::Calculating),
            PathState::Failed => self.on_citizen_path_find_failure(world, instance_id, ext),
            PathState::None => Ok(self.hard_fail(ext)),
            PathState::Ready => {
                ext.update_return_path_state(&self.paths);
                match ext.return_path_state {
                    PathState::Calculating => Ok(ExtSoftPathState::Calculating),
                    PathState::Failed => {
                        ext.release_return_path(&mut self.paths);
                        self.on_citizen_path_find_failure(world, instance_id, ext)
                    }
                    PathState::None | PathState::Ready => {
                        ext.release_return_path(&mut self.paths);
                        self.on_citizen_path_find_success(world, instance_id, ext)
                    }
                }
            }
        }
    }

    fn on_citizen_path_find_success(
        &mut self,
        world:       &mut World,
        instance_id: CitizenInstanceId,
        ext:         &mut ExtCitizenInstance,
    ) -> TripResult<ExtSoftPathState> {
        let instance = world.agents.instance(instance_id)?.clone();
        if world.agents.live_vehicle(instance.citizen).is_some() {
            return Ok(self.hard_fail(ext));
        }
        if ext.path_mode == ExtPathMode::TaxiToTarget {
            self.use_public_transport(world, &instance);
            return Ok(ExtSoftPathState::Ready);
        }

        let parked = world.agents.live_parked_vehicle(instance.citizen);
        let sqr_dist_to_car = parked.and_then(|id| world.agents.parked.get(id)).map_or(0.0, |car| {
            let door = car.info.closest_door_position(car.position, car.rotation, instance.position);
            instance.position.sqr_distance(door)
        });
        let summary = instance.path.and_then(|p| self.paths.summary(p)).unwrap_or_default();
        let uses_public_transport = summary.uses_public_transport();
        let uses_car = summary.uses_car();

        // A mixed path parks near a stop, not near the target.
        if uses_public_transport
            && uses_car
            && matches!(
                ext.path_mode,
                ExtPathMode::CalculatingCarPathToKnownParkPos | ExtPathMode::CalculatingCarPathToAltParkPos
            )
        {
            ext.path_mode = ExtPathMode::CalculatingCarPathToTarget;
            ext.parking_space_location = ParkingSpaceLocation::None;
        }

        match ext.path_mode {
            ExtPathMode::CalculatingCarPathToTarget
            | ExtPathMode::CalculatingCarPathToKnownParkPos
            | ExtPathMode::CalculatingCarPathToAltParkPos => self.on_car_path_found(
                world,
                instance_id,
                &instance,
                ext,
                uses_car,
                uses_public_transport,
                parked,
                sqr_dist_to_car,
            ),
            ExtPathMode::CalculatingWalkingPathToParkedCar => {
                if parked.is_none() {
                    Ok(self.retry_walking(ext))
                } else {
                    ext.path_mode = ExtPathMode::WalkingToParkedCar;
                    Ok(ExtSoftPathState::Ready)
                }
            }
            ExtPathMode::CalculatingWalkingPathToTarget => {
                ext.path_mode = ExtPathMode::WalkingToTarget;
                Ok(ExtSoftPathState::Ready)
            }
            _ => self.on_default_path_found(world, &instance, ext, uses_car, uses_public_transport, parked),
        }
    }

    /// A car path was found for a pedestrian standing next to their car.
    #[allow(clippy::too_many_arguments)]
    fn on_car_path_found(
        &mut self,
        world:                 &mut World,
        instance_id:           CitizenInstanceId,
        instance:              &CitizenInstance,
        ext:                   &mut ExtCitizenInstance,
        uses_car:              bool,
        uses_public_transport: bool,
        parked:                Option<ParkedVehicleId>,
        sqr_dist_to_car:       f32,
    ) -> TripResult<ExtSoftPathState> {
        if !uses_car {
            if ext.path_mode != ExtPathMode::CalculatingCarPathToTarget {
                return Ok(self.retry_walking(ext));
            }
            // The path works on foot as it is.
            ext.reset(&mut self.paths);
            if uses_public_transport {
                self.use_public_transport(world, instance);
            }
            ext.path_mode = ExtPathMode::WalkingToTarget;
            return Ok(ExtSoftPathState::Ready);
        }

        if ext.at_outside_connection {
            ext.path_mode = driving_mode(ext);
            ext.at_outside_connection = false;
            return Ok(ExtSoftPathState::Ready);
        }
        let Some(parked) = parked else {
            return Ok(self.retry_walking(ext));
        };
        if sqr_dist_to_car > 4.0 * self.config.max_parked_car_instance_switch_sqr_distance {
            ext.path_mode = ExtPathMode::RequiresWalkingPathToParkedCar;
            return Ok(ExtSoftPathState::FailedSoft);
        }

        match enter_parked_car(world, &self.paths, &mut self.spawner, instance_id, parked)? {
            Some(vehicle_id) => {
                ext.path_mode = if ext.path_mode == ExtPathMode::CalculatingCarPathToTarget {
                    ExtPathMode::DrivingToTarget
                } else {
                    ExtPathMode::DrivingToKnownParkPos
                };
                world.ext.citizen_mut(instance.citizen).transport_mode.insert(TransportFlag::Car);
                trace!(%instance_id, %vehicle_id, "driving off");
                Ok(ExtSoftPathState::Ignore)
            }
            None => Ok(self.retry_walking(ext)),
        }
    }

    /// A first path for a trip that has not committed to a mode yet.
    fn on_default_path_found(
        &mut self,
        world:                 &mut World,
        instance:              &CitizenInstance,
        ext:                   &mut ExtCitizenInstance,
        uses_car:              bool,
        uses_public_transport: bool,
        parked:                Option<ParkedVehicleId>,
    ) -> TripResult<ExtSoftPathState> {
        if !uses_car {
            if uses_public_transport {
                self.use_public_transport(world, instance);
            }
            ext.path_mode = ExtPathMode::WalkingToTarget;
            return Ok(ExtSoftPathState::Ready);
        }

        let parked = match parked {
            Some(id) => Some(id),
            None => self.spawn_car_for(world, instance)?,
        };
        ext.path_mode = if parked.is_some() {
            ExtPathMode::RequiresWalkingPathToParkedCar
        } else {
            ExtPathMode::RequiresWalkingPathToTarget
        };
        Ok(ExtSoftPathState::FailedSoft)
    }

    /// Give a driving-age citizen without a car one near where they are, and
    /// feed the outcome into that building's parking demand.
    fn spawn_car_for(&mut self, world: &mut World, instance: &CitizenInstance) -> TripResult<Option<ParkedVehicleId>> {
        let citizen = world.agents.citizen(instance.citizen)?;
        if !citizen.age.can_drive() {
            return Ok(None);
        }
        let (home, current) = (citizen.home, citizen.current_building);
        let (building, ref_pos) = match world.buildings.get(current) {
            Ok(b) => (current, b.position),
            Err(_) => (instance.source_building, instance.position),
        };

        let spawned = try_spawn_parked_passenger_car(
            &mut self.finder,
            world,
            instance.citizen,
            home,
            ref_pos,
            &VehicleInfo::PASSENGER_CAR,
        );
        let c = &self.config;
        match spawned {
            Ok(park_pos) => {
                let distance = world.buildings.get(building).map_or(0.0, |b| b.position.distance(park_pos));
                if let Some(demand) = world.buildings.demand_mut(building) {
                    demand.modify_parking_space(
                        distance,
                        c.min_spawned_car_parking_space_demand_delta,
                        c.max_spawned_car_parking_space_demand_delta,
                        c.max_parked_car_distance_to_building,
                        c.max_parking_space_demand,
                    );
                }
                Ok(world.agents.live_parked_vehicle(instance.citizen))
            }
            Err(ParkingError::NoSpaceFound) => {
                if let Some(demand) = world.buildings.demand_mut(building) {
                    demand.add_parking_space(c.failed_spawn_parking_space_demand_increment, c.max_parking_space_demand);
                }
                trace!(citizen = %instance.citizen, %building, "no space to spawn a parked car");
                Ok(None)
            }
            Err(ParkingError::LimitHit) => {
                debug!(citizen = %instance.citizen, "parked vehicle pool full");
                Ok(None)
            }
        }
    }

    fn on_citizen_path_find_failure(
        &mut self,
        world:       &mut World,
        instance_id: CitizenInstanceId,
        ext:         &mut ExtCitizenInstance,
    ) -> TripResult<ExtSoftPathState> {
        let instance = world.agents.instance(instance_id)?.clone();

        if matches!(
            ext.path_mode,
            ExtPathMode::None
                | ExtPathMode::CalculatingWalkingPathToTarget
                | ExtPathMode::CalculatingWalkingPathToParkedCar
                | ExtPathMode::TaxiToTarget
        ) && !instance.flags.contains(InstanceFlag::CannotUseTransport)
        {
            let inc = self.config.public_transport_demand_increment;
            let max = self.config.max_public_transport_demand;
            if let Some(d) = world.buildings.demand_mut(instance.target_building) {
                d.add_public_transport(inc, false, max);
            }
            if let Some(d) = world.buildings.demand_mut(instance.source_building) {
                d.add_public_transport(inc, true, max);
            }
        }

        if ext.path_mode == ExtPathMode::CalculatingWalkingPathToParkedCar {
            if let Some(parked) = world.agents.live_parked_vehicle(instance.citizen) {
                let home = world.agents.citizen(instance.citizen)?.home;
                let max = self.config.max_parked_car_distance_to_home;
                let far = world
                    .agents
                    .parked
                    .get(parked)
                    .is_some_and(|car| car.position.distance(instance.position) > max);
                if far && try_move_parked_vehicle(&mut self.finder, world, parked, instance.position, max, home)? {
                    ext.path_mode = ExtPathMode::RequiresWalkingPathToParkedCar;
                    return Ok(ExtSoftPathState::FailedSoft);
                }
                world.agents.release_parked_vehicle(parked)?;
                debug!(%instance_id, %parked, "unreachable parked car released");
            }
        }

        match ext.path_mode {
            ExtPathMode::CalculatingCarPathToTarget
            | ExtPathMode::CalculatingCarPathToKnownParkPos
            | ExtPathMode::CalculatingWalkingPathToParkedCar => {
                ext.path_mode = ExtPathMode::RequiresWalkingPathToTarget;
                Ok(ExtSoftPathState::FailedSoft)
            }
            _ => Ok(self.hard_fail(ext)),
        }
    }

    // ── Drivers ───────────────────────────────────────────────────────────

    /// Reconcile a vehicle's main path state with its driver's trip.
    pub fn update_car_path_state(
        &mut self,
        world:      &mut World,
        vehicle_id: VehicleId,
        main:       PathState,
    ) -> TripResult<ExtSoftPathState> {
        if main == PathState::Calculating {
            return Ok(ExtSoftPathState::Calculating);
        }
        let Some(ext_vehicle) = world.ext.vehicle(vehicle_id) else {
            return Ok(main.into());
        };
        let driver = ext_vehicle.driver_instance;
        let Ok(citizen) = world.agents.instance(driver).map(|i| i.citizen) else {
            return Ok(main.into());
        };
        let mut ext = world.ext.instance(driver);
        let before = ext.path_mode;

        let outcome = if ext_vehicle.vehicle_type != ExtVehicleType::PassengerCar {
            ext.reset(&mut self.paths);
            Ok(main.into())
        } else {
            self.reconcile_car_path(world, vehicle_id, driver, &mut ext, main)
        };
        world.ext.set_instance(driver, ext);
        let state = outcome?;
        settle(world, citizen, before, ext.path_mode, state);
        Ok(state)
    }

    fn reconcile_car_path(
        &mut self,
        world:      &mut World,
        vehicle_id: VehicleId,
        driver:     CitizenInstanceId,
        ext:        &mut ExtCitizenInstance,
        main:       PathState,
    ) -> TripResult<ExtSoftPathState> {
        match main {
            PathState::Calculating => Ok(ExtSoftPathState::Calculating),
            PathState::Failed => {
                ext.release_return_path(&mut self.paths);
                self.on_car_path_find_failure(world, driver, ext)
            }
            PathState::None => Ok(self.hard_fail(ext)),
            PathState::Ready => {
                ext.update_return_path_state(&self.paths);
                match ext.return_path_state {
                    PathState::None => {
                        ext.path_mode = ExtPathMode::DrivingToTarget;
                        Ok(ExtSoftPathState::Ready)
                    }
                    PathState::Calculating => Ok(ExtSoftPathState::Calculating),
                    PathState::Failed => Ok(self.hard_fail(ext)),
                    PathState::Ready => {
                        ext.release_return_path(&mut self.paths);
                        let uses_public_transport = world
                            .agents
                            .vehicle(vehicle_id)?
                            .path
                            .and_then(|p| self.paths.summary(p))
                            .is_some_and(|s| s.uses_public_transport());
                        if uses_public_transport
                            && matches!(
                                ext.path_mode,
                                ExtPathMode::CalculatingCarPathToKnownParkPos
                                    | ExtPathMode::CalculatingCarPathToAltParkPos
                            )
                        {
                            ext.path_mode = ExtPathMode::CalculatingCarPathToTarget;
                            ext.parking_space_location = ParkingSpaceLocation::None;
                        }
                        ext.path_mode = driving_mode(ext);
                        Ok(ExtSoftPathState::Ready)
                    }
                }
            }
        }
    }

    fn on_car_path_find_failure(
        &mut self,
        world:  &mut World,
        driver: CitizenInstanceId,
        ext:    &mut ExtCitizenInstance,
    ) -> TripResult<ExtSoftPathState> {
        let instance = world.agents.instance(driver)?;
        let (target, cannot_use_transport) =
            (instance.target_building, instance.flags.contains(InstanceFlag::CannotUseTransport));

        if matches!(
            ext.path_mode,
            ExtPathMode::None
                | ExtPathMode::CalculatingCarPathToAltParkPos
                | ExtPathMode::CalculatingCarPathToKnownParkPos
        ) {
            if let Some(d) = world.buildings.demand_mut(target) {
                d.add_parking_space(self.config.failed_parking_space_demand_increment, self.config.max_parking_space_demand);
            }
        }

        match ext.path_mode {
            ExtPathMode::CalculatingCarPathToAltParkPos | ExtPathMode::CalculatingCarPathToKnownParkPos
                if !cannot_use_transport =>
            {
                ext.path_mode = ExtPathMode::RequiresMixedCarPathToTarget;
                Ok(ExtSoftPathState::FailedSoft)
            }
            _ => Ok(self.hard_fail(ext)),
        }
    }

    /// The driver of `vehicle_id` found the planned space taken.  The next
    /// [`start_path_find`](Self::start_path_find) looks for another one and
    /// starts the new car path at `at`.
    pub fn report_parking_failed(
        &mut self,
        world:      &mut World,
        vehicle_id: VehicleId,
        at:         Option<PathPosition>,
    ) -> TripResult<bool> {
        let Some(ext_vehicle) = world.ext.vehicle(vehicle_id) else {
            return Ok(false);
        };
        let driver = ext_vehicle.driver_instance;
        world.agents.instance(driver)?;
        let mut ext = world.ext.instance(driver);
        ext.path_mode = ExtPathMode::ParkingFailed;
        ext.parking_path_start_position = at;
        world.ext.set_instance(driver, ext);
        debug!(%vehicle_id, %driver, attempts = ext.failed_parking_attempts, "parking failed");
        Ok(true)
    }

    // ── Path requests ─────────────────────────────────────────────────────

    /// Issue the request the traveller's mode asks for and attach the new
    /// path to the instance, or to the vehicle when the citizen is driving.
    ///
    /// Returns `None` when the mode needs no request, when no alternative
    /// parking space exists (the trip is then reset) or when the engine has
    /// no free handle (retried on the next call).
    pub fn start_path_find(
        &mut self,
        world:       &mut World,
        instance_id: CitizenInstanceId,
        start:       Vec3,
        end:         Vec3,
    ) -> TripResult<Option<PathId>> {
        let instance = world.agents.instance(instance_id)?.clone();
        let citizen = world.agents.citizen(instance.citizen)?.clone();
        let allow_transport = !instance.flags.contains(InstanceFlag::CannotUseTransport);
        let with_transport = |r: PathRequest| if allow_transport { r.with_public_transport() } else { r };
        let parked_info = world
            .agents
            .live_parked_vehicle(instance.citizen)
            .and_then(|id| world.agents.parked.get(id))
            .map(|car| (car.position, car.info));

        let mut ext = world.ext.instance(instance_id);
        let before = ext.path_mode;
        let mut return_leg: Option<(Vec3, Vec3)> = None;

        let request = match ext.path_mode {
            ExtPathMode::None => with_transport(PathRequest::driving(start, end)),
            ExtPathMode::RequiresWalkingPathToParkedCar => match parked_info {
                Some((car_pos, _)) => {
                    ext.path_mode = ExtPathMode::CalculatingWalkingPathToParkedCar;
                    PathRequest::walking(start, car_pos)
                }
                None => {
                    ext.path_mode = ExtPathMode::CalculatingWalkingPathToTarget;
                    with_transport(PathRequest::walking(start, end))
                }
            },
            ExtPathMode::RequiresWalkingPathToTarget => {
                ext.path_mode = ExtPathMode::CalculatingWalkingPathToTarget;
                with_transport(PathRequest::walking(start, end))
            }
            ExtPathMode::RequiresCarPath | ExtPathMode::RequiresMixedCarPathToTarget => {
                let mut request = PathRequest::driving(start, end);
                if ext.path_mode == ExtPathMode::RequiresMixedCarPathToTarget {
                    request = with_transport(request);
                }
                let parking = CitizenParkingRequest {
                    end_pos:        end,
                    info:           parked_info.map_or(VehicleInfo::PASSENGER_CAR, |(_, info)| info),
                    home:           citizen.home,
                    going_home:     instance.target_building == citizen.home,
                    tourist:        citizen.tourist,
                    allow_tourists: true,
                };
                let (view, rng) = world.search_parts();
                match self.finder.find_parking_space_for_citizen(view, rng, &parking, &mut ext.parking_space_location) {
                    Some(plan) => {
                        ext.path_mode = ExtPathMode::CalculatingCarPathToKnownParkPos;
                        return_leg = Some((plan.space.position, end));
                        request.end = plan.space.position;
                        request.with_end_position(plan.end_path_position)
                    }
                    None => {
                        ext.path_mode = ExtPathMode::CalculatingCarPathToTarget;
                        request
                    }
                }
            }
            ExtPathMode::ParkingFailed => {
                ext.failed_parking_attempts += 1;
                let info = world
                    .agents
                    .live_vehicle(instance.citizen)
                    .and_then(|id| world.agents.vehicles.get(id))
                    .map_or(VehicleInfo::PASSENGER_CAR, |v| v.info);
                let dir = (end - start).normalized();
                let max = self.config.max_parked_car_distance_to_building;
                let (view, rng) = world.search_parts();
                let Some(space) =
                    self.finder.find_parking_space_in_vicinity(view, rng, end, dir, &info, citizen.home, max)
                else {
                    debug!(%instance_id, attempts = ext.failed_parking_attempts, "no alternative parking space");
                    ext.reset(&mut self.paths);
                    world.ext.set_instance(instance_id, ext);
                    return Ok(None);
                };
                ext.path_mode = ExtPathMode::CalculatingCarPathToAltParkPos;
                ext.parking_space_location = space.location;
                return_leg = Some((space.position, end));
                let mut request = PathRequest::driving(start, space.position)
                    .with_end_position(self.finder.find_pedestrian_path_position(world.search_view(), space.position));
                request.start_position = ext.parking_path_start_position;
                request
            }
            _ => return Ok(None),
        };

        let Some(path) = self.paths.submit(request) else {
            debug!(%instance_id, mode = ?before, "path engine has no free handle");
            return Ok(None);
        };
        if let Some((park_pos, target_pos)) = return_leg {
            self.calculate_return_path(&mut ext, park_pos, target_pos);
        }

        match world.agents.live_vehicle(instance.citizen) {
            Some(vehicle_id) => {
                let vehicle = world.agents.vehicle_mut(vehicle_id)?;
                if let Some(old) = vehicle.path.replace(path) {
                    self.paths.release(old);
                }
                vehicle.path_position_index = 0;
            }
            None => {
                let instance = world.agents.instance_mut(instance_id)?;
                if let Some(old) = instance.path.replace(path) {
                    self.paths.release(old);
                }
                instance.path_position_index = 0;
                instance.flags.insert(InstanceFlag::WaitingPath);
            }
        }
        world.ext.set_instance(instance_id, ext);
        debug!(%instance_id, %path, from = ?before, to = ?ext.path_mode, "path requested");
        Ok(Some(path))
    }

    /// Request the walk from a planned parking space to the target.  The
    /// car path is only accepted once this one succeeds too.
    pub fn calculate_return_path(&mut self, ext: &mut ExtCitizenInstance, park_pos: Vec3, target_pos: Vec3) -> bool {
        ext.release_return_path(&mut self.paths);
        match self.paths.submit(PathRequest::walking(park_pos, target_pos)) {
            Some(path) => {
                ext.return_path = Some(path);
                ext.return_path_state = PathState::Calculating;
                true
            }
            None => false,
        }
    }

    // ── Per-tick steps ────────────────────────────────────────────────────

    pub fn citizen_approaching_parked_car_step(
        &mut self,
        world:       &mut World,
        instance_id: CitizenInstanceId,
    ) -> TripResult<ParkedCarApproachState> {
        citizen_approaching_parked_car_step(world, &self.paths, &self.config, instance_id)
    }

    pub fn citizen_approaching_target_step(&mut self, world: &mut World, instance_id: CitizenInstanceId) -> TripResult<bool> {
        citizen_approaching_target_step(world, &mut self.paths, instance_id)
    }

    // ── Life cycle ────────────────────────────────────────────────────────

    /// Release a pedestrian instance together with its extended state and
    /// both of its paths.
    pub fn release_instance(&mut self, world: &mut World, instance_id: CitizenInstanceId) -> TripResult<CitizenInstance> {
        let instance = world.agents.release_instance(instance_id)?;
        self.forget_instance(world, instance_id);
        if let Some(path) = instance.path {
            self.paths.release(path);
        }
        Ok(instance)
    }

    /// Release a live vehicle, its path and its extended record.
    pub fn release_vehicle(&mut self, world: &mut World, vehicle_id: VehicleId) -> TripResult<Vehicle> {
        let vehicle = world.agents.release_vehicle(vehicle_id)?;
        world.ext.remove_vehicle(vehicle_id);
        if let Some(path) = vehicle.path {
            self.paths.release(path);
        }
        trace!(%vehicle_id, "vehicle released");
        Ok(vehicle)
    }

    fn forget_instance(&mut self, world: &mut World, instance_id: CitizenInstanceId) {
        if let Some(mut ext) = world.ext.remove_instance(instance_id) {
            ext.release_return_path(&mut self.paths);
        }
    }

    /// Parking behaviour is being switched off.  Pedestrians who are walking
    /// to a car, or who need one but are still on foot, are released since
    /// nothing would bring them anywhere.  All extended state is cleared.
    /// Returns the number of released instances.
    pub fn on_disable_feature(&mut self, world: &mut World) -> TripResult<usize> {
        let mut released = 0;
        for id in world.ext.instance_ids() {
            let mut ext = world.ext.instance(id);
            ext.release_return_path(&mut self.paths);
            let Some(instance) = world.agents.instances.get(id) else {
                continue;
            };
            let release = ext.path_mode.is_walking_to_car()
                || (ext.path_mode.requires_car() && instance.is_character());
            if release {
                let instance = world.agents.release_instance(id)?;
                if let Some(path) = instance.path {
                    self.paths.release(path);
                }
                released += 1;
            }
        }
        world.ext.clear();
        debug!(released, "parking behaviour disabled");
        Ok(released)
    }

    // ── Helpers ───────────────────────────────────────────────────────────

    fn hard_fail(&mut self, ext: &mut ExtCitizenInstance) -> ExtSoftPathState {
        ext.reset(&mut self.paths);
        ExtSoftPathState::FailedHard
    }

    fn retry_walking(&mut self, ext: &mut ExtCitizenInstance) -> ExtSoftPathState {
        ext.reset(&mut self.paths);
        ext.path_mode = ExtPathMode::RequiresWalkingPathToTarget;
        ExtSoftPathState::FailedSoft
    }

    /// Consume public transport demand at both ends and remember the mode.
    fn use_public_transport(&self, world: &mut World, instance: &CitizenInstance) {
        let dec = self.config.public_transport_demand_usage_decrement;
        if let Some(d) = world.buildings.demand_mut(instance.source_building) {
            d.remove_public_transport(dec, true);
        }
        if let Some(d) = world.buildings.demand_mut(instance.target_building) {
            d.remove_public_transport(dec, false);
        }
        world.ext.citizen_mut(instance.citizen).transport_mode.insert(TransportFlag::PublicTransport);
    }
}

/// Driving mode that follows a finished car-path calculation.
fn driving_mode(ext: &mut ExtCitizenInstance) -> ExtPathMode {
    match ext.path_mode {
        ExtPathMode::CalculatingCarPathToAltParkPos => {
            ext.parking_path_start_position = None;
            ExtPathMode::DrivingToAltParkPos
        }
        ExtPathMode::CalculatingCarPathToTarget => ExtPathMode::DrivingToTarget,
        ExtPathMode::CalculatingCarPathToKnownParkPos => ExtPathMode::DrivingToKnownParkPos,
        other => other,
    }
}

/// Bookkeeping shared by both update entry points.
fn settle(world: &mut World, citizen: CitizenId, before: ExtPathMode, after: ExtPathMode, state: ExtSoftPathState) {
    if state == ExtSoftPathState::FailedHard {
        let ext = world.ext.citizen_mut(citizen);
        ext.last_transport_mode = ext.transport_mode;
        ext.transport_mode.clear();
    }
    if before != after || state != ExtSoftPathState::Calculating {
        debug!(%citizen, from = ?before, to = ?after, ?state, "trip state updated");
    }
}
