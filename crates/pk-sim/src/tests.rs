//! Unit tests for pk-sim.
//!
//! The world is one street along the x axis with a home at z = 30 and a
//! workplace at z = -30.  Checkups run inline unless a test turns the
//! background worker on.

use std::time::{Duration, Instant};

use pk_agent::{AgentPoolsBuilder, Citizen, CitizenInstance, InstanceFlag, Vehicle, VehicleInfo};
use pk_core::{
    BuildingId, CitizenId, CitizenInstanceId, ExtVehicleType, GridSpec, ParkedVehicleId, ParkingConfig, PathId,
    Rotation, SegmentId, Tick, Vec3, VehicleId,
};
use pk_spatial::{Building, BuildingService, BuildingStore, RoadNetworkBuilder};
use pk_trip::{
    AlwaysSpawn, ExtPathMode, ExtSoftPathState, ExtVehicle, PathFinder, PathState, PathSummary, ScriptedPathFinder,
};

use crate::{CheckupOutcome, ParkingObserver, ParkingSim, ParkingSimBuilder, SimResult, TickReport};

type Sim = ParkingSim<ScriptedPathFinder, AlwaysSpawn>;

struct Fixture {
    sim:      Sim,
    street:   SegmentId,
    work:     BuildingId,
    citizen:  CitizenId,
    instance: CitizenInstanceId,
}

fn builder(paths: ScriptedPathFinder) -> ParkingSimBuilder<ScriptedPathFinder, AlwaysSpawn> {
    let mut b = RoadNetworkBuilder::new(GridSpec::SEGMENTS);
    b.add_street(Vec3::xz(-40.0, 0.0), Vec3::xz(40.0, 0.0));
    let mut buildings = BuildingStore::new(GridSpec::BUILDINGS);
    buildings.add(Building::new(BuildingService::Residential, Vec3::xz(0.0, 30.0)));
    buildings.add(Building::new(BuildingService::Commercial, Vec3::xz(0.0, -30.0)));
    let agents = AgentPoolsBuilder::new().citizens(8).instances(8).vehicles(8).parked_vehicles(8).build();
    ParkingSimBuilder::new(b.build(), buildings, agents, paths, AlwaysSpawn)
        .config(ParkingConfig::deterministic())
        .seed(7)
        .background_checkups(false)
}

fn populate(mut sim: Sim) -> Fixture {
    let street = SegmentId(0);
    let (home, work) = (BuildingId(0), BuildingId(1));
    let citizen = sim.world.agents.citizens.insert(Citizen::resident(home)).unwrap();
    let instance = sim
        .world
        .agents
        .spawn_instance(CitizenInstance::new(citizen, Vec3::xz(0.0, 12.0)).with_buildings(home, work))
        .unwrap();
    Fixture { sim, street, work, citizen, instance }
}

fn fixture() -> Fixture {
    populate(builder(ScriptedPathFinder::new()).build().unwrap())
}

fn set_mode(fx: &mut Fixture, mode: ExtPathMode) {
    let mut ext = fx.sim.world.ext.instance(fx.instance);
    ext.path_mode = mode;
    fx.sim.world.ext.set_instance(fx.instance, ext);
}

fn mode(fx: &Fixture) -> ExtPathMode {
    fx.sim.world.ext.instance(fx.instance).path_mode
}

/// Attach a path in `state` to the pedestrian and mark them as waiting.
fn wait_for(fx: &mut Fixture, state: PathState) -> PathId {
    let path = fx.sim.trips.paths_mut().insert(state, None);
    let instance = fx.sim.world.agents.instance_mut(fx.instance).unwrap();
    instance.path = Some(path);
    instance.flags.insert(InstanceFlag::WaitingPath);
    path
}

/// Put the citizen behind the wheel of a car on the street.
fn behind_the_wheel(fx: &mut Fixture) -> VehicleId {
    let id = fx
        .sim
        .world
        .agents
        .vehicles
        .insert(Vehicle::new(VehicleInfo::PASSENGER_CAR, Vec3::xz(-20.0, -2.0), Rotation::IDENTITY))
        .unwrap();
    fx.sim.world.agents.vehicle_mut(id).unwrap().transfer_citizen = fx.citizen;
    fx.sim.world.agents.citizen_mut(fx.citizen).unwrap().vehicle = id;
    fx.sim
        .world
        .ext
        .set_vehicle(id, ExtVehicle { vehicle_type: ExtVehicleType::PassengerCar, driver_instance: fx.instance });
    id
}

fn park_car(fx: &mut Fixture, position: Vec3, owned: bool) -> ParkedVehicleId {
    let id = fx
        .sim
        .world
        .agents
        .parked
        .create(VehicleInfo::PASSENGER_CAR, position, Rotation::IDENTITY, fx.citizen)
        .unwrap();
    if owned {
        fx.sim.world.agents.citizen_mut(fx.citizen).unwrap().parked_vehicle = id;
    }
    id
}

fn walk_summary(street: SegmentId) -> PathSummary {
    PathSummary {
        lane_types:    pk_core::LaneType::Pedestrian.into(),
        vehicle_types: pk_core::VehicleTypes::empty(),
        positions:     vec![pk_spatial::PathPosition::new(street, 5, 0)],
    }
}

#[derive(Default)]
struct Recorder {
    starts:   Vec<Tick>,
    states:   Vec<(CitizenInstanceId, ExtPathMode, ExtSoftPathState)>,
    checkups: Vec<(ParkedVehicleId, CheckupOutcome)>,
    ends:     Vec<TickReport>,
}

impl ParkingObserver for Recorder {
    fn on_tick_start(&mut self, tick: Tick) {
        self.starts.push(tick);
    }

    fn on_path_state(&mut self, instance: CitizenInstanceId, mode: ExtPathMode, state: ExtSoftPathState) {
        self.states.push((instance, mode, state));
    }

    fn on_checkup(&mut self, id: ParkedVehicleId, outcome: CheckupOutcome) {
        self.checkups.push((id, outcome));
    }

    fn on_tick_end(&mut self, _tick: Tick, report: &TickReport) {
        self.ends.push(*report);
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;
    use crate::SimError;

    #[test]
    fn builds_with_defaults() {
        let sim = builder(ScriptedPathFinder::new()).build().unwrap();
        assert_eq!(sim.now(), Tick::ZERO);
        assert!(!sim.has_background_checkups());
        assert_eq!(sim.trips.config(), &ParkingConfig::deterministic());
        assert_eq!(sim.shutdown().unwrap(), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ParkingConfig { max_parked_car_distance_to_home: 0.0, ..ParkingConfig::default() };
        let result = builder(ScriptedPathFinder::new()).config(config).build();
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn grid_mismatch_is_rejected() {
        let agents = AgentPoolsBuilder::new()
            .parked_vehicles(4)
            .parked_grid(GridSpec { cell_size: 16.0, resolution: 100 })
            .build();
        let result = ParkingSimBuilder::new(
            RoadNetworkBuilder::new(GridSpec::SEGMENTS).build(),
            BuildingStore::new(GridSpec::BUILDINGS),
            agents,
            ScriptedPathFinder::new(),
            AlwaysSpawn,
        )
        .background_checkups(false)
        .build();
        match result {
            Err(SimError::GridMismatch { what, expected_cells, got_cells, .. }) => {
                assert_eq!(what, "parked vehicle");
                assert_eq!(expected_cells, 540);
                assert_eq!(got_cells, 100);
            }
            _ => panic!("expected a grid mismatch"),
        }
    }
}

// ── Tick ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tick {
    use super::*;

    #[test]
    fn calculating_paths_are_left_alone() {
        let mut fx = fixture();
        set_mode(&mut fx, ExtPathMode::CalculatingWalkingPathToTarget);
        wait_for(&mut fx, PathState::Calculating);

        let report = fx.sim.tick(&mut crate::NoopObserver).unwrap();
        assert_eq!(report, TickReport::default());
        assert_eq!(fx.sim.now(), Tick(1));
        assert_eq!(mode(&fx), ExtPathMode::CalculatingWalkingPathToTarget);
        assert_eq!(fx.sim.pending_pathfinds(), 1);
    }

    #[test]
    fn finished_walking_path_is_accepted_once() {
        let mut fx = fixture();
        set_mode(&mut fx, ExtPathMode::CalculatingWalkingPathToTarget);
        let path = wait_for(&mut fx, PathState::Calculating);
        fx.sim.trips.paths_mut().complete(path, walk_summary(fx.street));

        let mut rec = Recorder::default();
        let report = fx.sim.tick(&mut rec).unwrap();
        assert_eq!(report.reconciled, 1);
        assert_eq!(report.ready, 1);
        assert_eq!(mode(&fx), ExtPathMode::WalkingToTarget);
        assert_eq!(rec.states, vec![(fx.instance, ExtPathMode::WalkingToTarget, ExtSoftPathState::Ready)]);

        // No longer waiting, so the next tick does not see it again.
        let report = fx.sim.tick(&mut rec).unwrap();
        assert_eq!(report.reconciled, 0);
        assert_eq!(rec.starts, vec![Tick(0), Tick(1)]);
        assert_eq!(rec.ends.len(), 2);
    }

    #[test]
    fn soft_failure_issues_the_walking_request() {
        let mut fx = fixture();
        set_mode(&mut fx, ExtPathMode::CalculatingCarPathToKnownParkPos);
        let failed = wait_for(&mut fx, PathState::Failed);

        let mut rec = Recorder::default();
        let report = fx.sim.tick(&mut rec).unwrap();
        assert_eq!(report.failed_soft, 1);
        assert_eq!(report.reissued, 1);
        assert_eq!(
            rec.states,
            vec![(fx.instance, ExtPathMode::RequiresWalkingPathToTarget, ExtSoftPathState::FailedSoft)]
        );

        assert_eq!(mode(&fx), ExtPathMode::CalculatingWalkingPathToTarget);
        let instance = fx.sim.world.agents.instance(fx.instance).unwrap();
        let path = instance.path.unwrap();
        assert_ne!(path, failed);
        assert!(instance.flags.contains(InstanceFlag::WaitingPath));
        assert!(fx.sim.trips.paths().is_released(failed));
        let work_pos = fx.sim.world.buildings.get(fx.work).unwrap().position;
        assert_eq!(fx.sim.trips.paths().request(path).unwrap().end, work_pos);

        // The new request completes on a later tick.
        fx.sim.trips.paths_mut().complete(path, walk_summary(fx.street));
        let report = fx.sim.tick(&mut rec).unwrap();
        assert_eq!(report.ready, 1);
        assert_eq!(mode(&fx), ExtPathMode::WalkingToTarget);
    }

    #[test]
    fn hard_failure_ends_the_trip() {
        let mut fx = fixture();
        set_mode(&mut fx, ExtPathMode::CalculatingWalkingPathToTarget);
        wait_for(&mut fx, PathState::Failed);

        let report = fx.sim.tick(&mut crate::NoopObserver).unwrap();
        assert_eq!(report.failed_hard, 1);
        assert_eq!(report.reissued, 0);
        assert_eq!(mode(&fx), ExtPathMode::None);
        assert!(fx.sim.world.ext.citizen(fx.citizen).transport_mode.is_empty());
    }

    #[test]
    fn full_engine_retries_next_tick() {
        let mut fx = populate(builder(ScriptedPathFinder::with_capacity(1)).build().unwrap());
        set_mode(&mut fx, ExtPathMode::CalculatingCarPathToKnownParkPos);
        let failed = wait_for(&mut fx, PathState::Failed);

        let report = fx.sim.tick(&mut crate::NoopObserver).unwrap();
        assert_eq!(report.failed_soft, 1);
        assert_eq!(report.reissued, 0);
        assert_eq!(mode(&fx), ExtPathMode::RequiresWalkingPathToTarget);

        fx.sim.trips.paths_mut().release(failed);
        let report = fx.sim.tick(&mut crate::NoopObserver).unwrap();
        assert_eq!(report.reissued, 1);
        assert_eq!(mode(&fx), ExtPathMode::CalculatingWalkingPathToTarget);

        let report = fx.sim.tick(&mut crate::NoopObserver).unwrap();
        assert_eq!(report.reissued, 0);
    }

    #[test]
    fn failed_car_path_switches_to_mixed_and_requests_again() {
        let mut fx = fixture();
        let vehicle = behind_the_wheel(&mut fx);
        set_mode(&mut fx, ExtPathMode::CalculatingCarPathToKnownParkPos);
        let failed = fx.sim.trips.paths_mut().insert(PathState::Failed, None);
        fx.sim.world.agents.vehicle_mut(vehicle).unwrap().path = Some(failed);

        let mut rec = Recorder::default();
        let report = fx.sim.tick(&mut rec).unwrap();
        assert_eq!(report.failed_soft, 1);
        assert_eq!(report.reissued, 1);
        assert_eq!(
            rec.states,
            vec![(fx.instance, ExtPathMode::RequiresMixedCarPathToTarget, ExtSoftPathState::FailedSoft)]
        );
        assert!(mode(&fx).is_calculating_car_path());
        let path = fx.sim.world.agents.vehicle(vehicle).unwrap().path.unwrap();
        assert_ne!(path, failed);
        assert!(!fx.sim.world.agents.instance(fx.instance).unwrap().flags.contains(InstanceFlag::WaitingPath));
    }

    #[test]
    fn drivers_not_calculating_are_not_polled() {
        let mut fx = fixture();
        let vehicle = behind_the_wheel(&mut fx);
        set_mode(&mut fx, ExtPathMode::DrivingToTarget);
        let path = fx.sim.trips.paths_mut().insert(PathState::Failed, None);
        fx.sim.world.agents.vehicle_mut(vehicle).unwrap().path = Some(path);

        assert_eq!(fx.sim.pending_pathfinds(), 0);
        let report = fx.sim.tick(&mut crate::NoopObserver).unwrap();
        assert_eq!(report.reconciled, 0);
        assert_eq!(mode(&fx), ExtPathMode::DrivingToTarget);
    }

    #[test]
    fn parking_failure_requests_an_alternative_at_once() {
        let mut fx = fixture();
        let vehicle = behind_the_wheel(&mut fx);
        let at = pk_spatial::PathPosition::new(fx.street, 2, 64);

        assert!(fx.sim.report_parking_failed(vehicle, Some(at)).unwrap());
        let ext = fx.sim.world.ext.instance(fx.instance);
        assert_eq!(ext.path_mode, ExtPathMode::CalculatingCarPathToAltParkPos);
        assert_eq!(ext.failed_parking_attempts, 1);
        let path = fx.sim.world.agents.vehicle(vehicle).unwrap().path.unwrap();
        assert_eq!(fx.sim.trips.paths().request(path).unwrap().start_position, Some(at));
        assert_eq!(fx.sim.pending_pathfinds(), 1);
    }

    #[test]
    fn parking_failure_of_untracked_vehicle_is_ignored() {
        let mut fx = fixture();
        assert!(!fx.sim.report_parking_failed(VehicleId::new(5, 0), None).unwrap());
    }

    #[test]
    fn released_instance_is_not_retried() {
        let mut fx = populate(builder(ScriptedPathFinder::with_capacity(1)).build().unwrap());
        set_mode(&mut fx, ExtPathMode::CalculatingCarPathToKnownParkPos);
        let failed = wait_for(&mut fx, PathState::Failed);
        fx.sim.tick(&mut crate::NoopObserver).unwrap();
        assert_eq!(mode(&fx), ExtPathMode::RequiresWalkingPathToTarget);

        fx.sim.release_instance(fx.instance).unwrap();
        assert!(fx.sim.trips.paths().is_released(failed));
        assert_eq!(fx.sim.world.ext.active_instances(), 0);
        let report = fx.sim.tick(&mut crate::NoopObserver).unwrap();
        assert_eq!(report.reissued, 0);
        assert_eq!(fx.sim.trips.paths().live_count(), 0);
    }

    #[test]
    fn released_vehicle_leaves_no_extended_record() {
        let mut fx = fixture();
        let vehicle = behind_the_wheel(&mut fx);
        assert_eq!(fx.sim.world.ext.active_vehicles(), 1);

        fx.sim.release_vehicle(vehicle).unwrap();
        assert_eq!(fx.sim.world.ext.active_vehicles(), 0);
        assert_eq!(fx.sim.pending_pathfinds(), 0);
        assert!(fx.sim.release_vehicle(vehicle).is_err());
    }

    #[test]
    fn run_ticks_sums_reports() {
        let mut fx = fixture();
        set_mode(&mut fx, ExtPathMode::CalculatingWalkingPathToTarget);
        wait_for(&mut fx, PathState::Failed);

        let total = fx.sim.run_ticks(3, &mut crate::NoopObserver).unwrap();
        assert_eq!(total.failed_hard, 1);
        assert_eq!(total.reconciled, 1);
        assert_eq!(fx.sim.now(), Tick(3));
    }
}

// ── Checkups ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod checkups {
    use pk_agent::ParkedFlag;

    use super::*;

    #[test]
    fn viewport_queues_parked_vehicles_once() {
        let mut fx = fixture();
        let car = park_car(&mut fx, Vec3::xz(0.0, 5.0), true);

        assert_eq!(fx.sim.update_parked_vehicles(-50.0, -50.0, 50.0, 50.0), 1);
        assert!(fx.sim.world.agents.parked.get(car).unwrap().flags.contains(ParkedFlag::Updating));
        assert_eq!(fx.sim.update_parked_vehicles(-50.0, -50.0, 50.0, 50.0), 0);
        assert_eq!(fx.sim.checkup_queue().depth(), 1);
        assert_eq!(fx.sim.stats_label(), "0 pathfinds; 1 parking checkups");

        let mut rec = Recorder::default();
        let report = fx.sim.tick(&mut rec).unwrap();
        assert_eq!(report.checkups, 1);
        assert_eq!(rec.checkups, vec![(car, CheckupOutcome::Refreshed)]);
        assert!(!fx.sim.world.agents.parked.get(car).unwrap().flags.contains(ParkedFlag::Updating));
        assert!(fx.sim.checkup_queue().is_empty());
    }

    #[test]
    fn viewport_margin_reaches_the_neighbouring_cell() {
        let mut fx = fixture();
        park_car(&mut fx, Vec3::xz(31.0, 5.0), true);
        assert_eq!(fx.sim.update_parked_vehicles(40.0, -50.0, 100.0, 50.0), 1);
    }

    #[test]
    fn far_viewport_queues_nothing() {
        let mut fx = fixture();
        park_car(&mut fx, Vec3::xz(0.0, 5.0), true);
        assert_eq!(fx.sim.update_parked_vehicles(1000.0, 1000.0, 1100.0, 1100.0), 0);
        assert_eq!(fx.sim.drain_checkups().unwrap(), 0);
    }

    #[test]
    fn orphaned_vehicle_is_released() {
        let mut fx = fixture();
        let car = park_car(&mut fx, Vec3::xz(0.0, 5.0), false);
        assert_eq!(fx.sim.update_parked_vehicle(car).unwrap(), CheckupOutcome::ReleasedOrphan);
        assert!(fx.sim.world.agents.parked.is_empty());
    }

    #[test]
    fn vehicle_being_parked_is_not_an_orphan() {
        let mut fx = fixture();
        let car = park_car(&mut fx, Vec3::xz(0.0, 5.0), false);
        fx.sim.world.agents.parked.get_mut(car).unwrap().flags.insert(ParkedFlag::Parking);
        assert_eq!(fx.sim.update_parked_vehicle(car).unwrap(), CheckupOutcome::Refreshed);
        assert!(fx.sim.world.agents.parked.contains(car));
    }

    #[test]
    fn moved_vehicle_is_regridded() {
        let mut fx = fixture();
        let car = park_car(&mut fx, Vec3::xz(0.0, 5.0), true);
        let target = Vec3::xz(200.0, 200.0);
        fx.sim.world.agents.parked.get_mut(car).unwrap().position = target;

        assert_eq!(fx.sim.update_parked_vehicle(car).unwrap(), CheckupOutcome::Regridded);
        let parked = &fx.sim.world.agents.parked;
        assert_eq!(parked.get(car).unwrap().cell(), parked.grid().cell_at(target));
        assert_eq!(parked.ids_near(target, 1.0), vec![car]);
    }

    #[test]
    fn released_vehicle_is_stale() {
        let mut fx = fixture();
        let car = park_car(&mut fx, Vec3::xz(0.0, 5.0), true);
        fx.sim.world.agents.release_parked_vehicle(car).unwrap();
        assert_eq!(fx.sim.update_parked_vehicle(car).unwrap(), CheckupOutcome::Stale);
    }

    #[test]
    fn background_worker_forwards_checkups() {
        let config =
            ParkingConfig { checkup_idle_backoff: Duration::from_millis(1), ..ParkingConfig::deterministic() };
        let sim = builder(ScriptedPathFinder::new()).config(config).background_checkups(true).build().unwrap();
        let mut fx = populate(sim);
        assert!(fx.sim.has_background_checkups());
        let car = park_car(&mut fx, Vec3::xz(0.0, 5.0), true);
        fx.sim.update_parked_vehicles(-50.0, -50.0, 50.0, 50.0);

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut applied = 0;
        while applied == 0 && Instant::now() < deadline {
            applied += fx.sim.drain_checkups().unwrap();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(applied, 1);
        assert!(!fx.sim.world.agents.parked.get(car).unwrap().flags.contains(ParkedFlag::Updating));
        assert_eq!(fx.sim.shutdown().unwrap(), 1);
    }

    #[test]
    fn disabling_parking_drops_queued_checkups() -> SimResult<()> {
        let mut fx = fixture();
        park_car(&mut fx, Vec3::xz(0.0, 5.0), true);
        fx.sim.update_parked_vehicles(-50.0, -50.0, 50.0, 50.0);

        assert_eq!(fx.sim.disable_parking()?, 0);
        assert!(fx.sim.checkup_queue().is_empty());
        assert_eq!(fx.sim.drain_checkups()?, 0);
        Ok(())
    }
}

// ── Stats and logging ─────────────────────────────────────────────────────────

#[cfg(test)]
mod reporting {
    use pk_checkup::Rgb;
    use tracing::Level;

    use super::*;
    use crate::SimError;
    use crate::logging::{init_std_out_logging, init_std_out_logging_thread_local};

    #[test]
    fn label_counts_waiting_pedestrians() {
        let mut fx = fixture();
        wait_for(&mut fx, PathState::Calculating);
        assert_eq!(fx.sim.stats_label(), "1 pathfinds; 0 parking checkups");
        assert_eq!(fx.sim.stats_color(), Rgb::GREEN);
    }

    #[test]
    fn thread_local_logging_captures_tick_events() {
        let _guard = init_std_out_logging_thread_local();
        let mut fx = fixture();
        park_car(&mut fx, Vec3::xz(0.0, 5.0), false);
        fx.sim.update_parked_vehicles(-50.0, -50.0, 50.0, 50.0);
        assert_eq!(fx.sim.drain_checkups().unwrap(), 1);
    }

    #[test]
    fn global_logging_installs_once() {
        let _ = init_std_out_logging(Level::WARN);
        assert!(matches!(init_std_out_logging(Level::WARN), Err(SimError::Logging(_))));
    }
}
