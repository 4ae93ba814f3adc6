//! The `ParkingSim` context and its tick.

use std::sync::mpsc::Receiver;

use tracing::{debug, trace};

use pk_agent::{InstanceFlag, ParkedFlag};
use pk_checkup::{CheckupWorker, DeferredCheckupQueue, Rgb, load_color, stats_label};
use pk_core::{CitizenInstanceId, ParkedVehicleId, PathId, Tick, VehicleId};
use pk_spatial::PathPosition;
use pk_trip::{ExtPathMode, ExtSoftPathState, PathFinder, PathState, TripStateMachine, VehicleSpawner, World};

use crate::{ParkingObserver, SimResult};

/// Margin around the viewport whose parked vehicles are checked too.
pub const VIEWPORT_MARGIN: f32 = 10.0;

// ── Reports ───────────────────────────────────────────────────────────────────

/// What happened to one parked vehicle during a checkup.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CheckupOutcome {
    /// Still valid; nothing changed.
    Refreshed,
    /// Its position had been edited in place; it moved to another grid cell.
    Regridded,
    /// Its owner no longer references it, so it was released.
    ReleasedOrphan,
    /// Released before the checkup reached it.
    Stale,
}

/// Counters for one tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Path results reconciled (pedestrians and drivers).
    pub reconciled:  usize,
    pub ready:       usize,
    pub failed_soft: usize,
    pub failed_hard: usize,
    /// Follow-up path requests issued after a soft failure.
    pub reissued:    usize,
    /// Parked-vehicle checkups applied.
    pub checkups:    usize,
}

impl TickReport {
    fn count(&mut self, state: ExtSoftPathState) {
        self.reconciled += 1;
        match state {
            ExtSoftPathState::Ready => self.ready += 1,
            ExtSoftPathState::FailedSoft => self.failed_soft += 1,
            ExtSoftPathState::FailedHard => self.failed_hard += 1,
            ExtSoftPathState::Calculating | ExtSoftPathState::Ignore => {}
        }
    }
}

/// A path whose state is read this tick.
#[derive(Copy, Clone)]
enum Pending {
    Pedestrian(CitizenInstanceId, PathId),
    Driver(VehicleId, PathId),
}

impl Pending {
    fn path(self) -> PathId {
        match self {
            Pending::Pedestrian(_, p) | Pending::Driver(_, p) => p,
        }
    }
}

// ── ParkingSim ────────────────────────────────────────────────────────────────

/// Owns the world, the trip state machine and the checkup machinery, and
/// drives them once per tick:
///
/// 1. **Poll**: read the engine state of every pedestrian waiting for a path
///    and of every car whose driver is calculating a car path (parallel with
///    the `parallel` feature).
/// 2. **Reconcile**: hand each finished result to the state machine in
///    ascending id order.  A soft failure immediately issues the follow-up
///    request the stored mode names.
/// 3. **Checkups**: apply the parked-vehicle checkups the worker forwarded.
///
/// Create via [`ParkingSimBuilder`][crate::ParkingSimBuilder].
pub struct ParkingSim<P: PathFinder, S: VehicleSpawner> {
    pub world: World,
    pub trips: TripStateMachine<P, S>,
    pub(crate) queue:  DeferredCheckupQueue,
    pub(crate) worker: Option<CheckupWorker>,
    pub(crate) inbox:  Receiver<ParkedVehicleId>,
    pub(crate) retry:  Vec<CitizenInstanceId>,
    pub(crate) now:    Tick,
}

impl<P: PathFinder, S: VehicleSpawner> ParkingSim<P, S> {
    // ── Public API ────────────────────────────────────────────────────────

    #[inline]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Handle to the checkup queue, e.g. for a renderer thread.
    #[inline]
    pub fn checkup_queue(&self) -> &DeferredCheckupQueue {
        &self.queue
    }

    pub fn has_background_checkups(&self) -> bool {
        self.worker.as_ref().is_some_and(CheckupWorker::is_running)
    }

    /// Run one tick.
    pub fn tick<O: ParkingObserver>(&mut self, observer: &mut O) -> SimResult<TickReport> {
        let now = self.now;
        observer.on_tick_start(now);

        let mut report = TickReport::default();
        self.retry_requests(&mut report)?;
        let pending = self.pending_paths();
        for (item, state) in self.poll(&pending) {
            match item {
                Pending::Pedestrian(id, _) => self.reconcile_pedestrian(id, state, &mut report, observer)?,
                Pending::Driver(id, _) => self.reconcile_driver(id, state, &mut report, observer)?,
            }
        }
        report.checkups = self.drain_checkups_into(observer)?;

        observer.on_tick_end(now, &report);
        self.now = now.next();
        Ok(report)
    }

    /// Run `n` ticks and return the summed report.
    pub fn run_ticks<O: ParkingObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<TickReport> {
        let mut total = TickReport::default();
        for _ in 0..n {
            let r = self.tick(observer)?;
            total.reconciled += r.reconciled;
            total.ready += r.ready;
            total.failed_soft += r.failed_soft;
            total.failed_hard += r.failed_hard;
            total.reissued += r.reissued;
            total.checkups += r.checkups;
        }
        Ok(total)
    }

    /// Queue checkups for every parked vehicle in the parked-grid cells
    /// covering the rectangle plus [`VIEWPORT_MARGIN`].  Returns how many
    /// were newly queued.
    pub fn update_parked_vehicles(&mut self, min_x: f32, min_z: f32, max_x: f32, max_z: f32) -> usize {
        let parked = &mut self.world.agents.parked;
        let spec = parked.grid().spec();
        let (r0, c0) = spec.clamped_cell_of(min_x - VIEWPORT_MARGIN, min_z - VIEWPORT_MARGIN);
        let (r1, c1) = spec.clamped_cell_of(max_x + VIEWPORT_MARGIN, max_z + VIEWPORT_MARGIN);
        let ids = parked.ids_in_cells(r0..=r1, c0..=c1);
        for &id in &ids {
            if let Some(record) = parked.get_mut(id) {
                record.flags.insert(ParkedFlag::Updating);
            }
        }
        let added = self.queue.enqueue(ids.iter().copied());
        debug!(found = ids.len(), added, "parked vehicle checkups requested");
        added
    }

    /// Apply every checkup that is ready.  Without a background worker the
    /// queue is drained on this thread.
    pub fn drain_checkups(&mut self) -> SimResult<usize> {
        self.drain_checkups_into(&mut crate::NoopObserver)
    }

    /// Refresh one parked vehicle: release it if its owner no longer
    /// references it, otherwise re-link it into the grid cell of its current
    /// position.  The `Updating` flag is cleared either way.
    pub fn update_parked_vehicle(&mut self, id: ParkedVehicleId) -> SimResult<CheckupOutcome> {
        let agents = &mut self.world.agents;
        let Some(record) = agents.parked.get(id) else {
            return Ok(CheckupOutcome::Stale);
        };
        let owner = record.owner;
        let parking = record.flags.contains(ParkedFlag::Parking);
        let orphan = !parking && agents.citizens.get(owner).is_none_or(|c| c.parked_vehicle != id);
        if orphan {
            agents.release_parked_vehicle(id)?;
            debug!(%id, %owner, "orphaned parked vehicle released");
            return Ok(CheckupOutcome::ReleasedOrphan);
        }

        let moved = agents.parked.regrid(id)?;
        if let Some(record) = agents.parked.get_mut(id) {
            record.flags.remove(ParkedFlag::Updating);
        }
        trace!(%id, moved, "parked vehicle checked");
        Ok(if moved { CheckupOutcome::Regridded } else { CheckupOutcome::Refreshed })
    }

    /// Number of pedestrians and cars waiting for the path-finding engine.
    pub fn pending_pathfinds(&self) -> usize {
        self.pending_paths().len()
    }

    /// `"{pathfinds} pathfinds; {checkups} parking checkups"`.
    pub fn stats_label(&self) -> String {
        stats_label(self.pending_pathfinds(), self.queue.depth())
    }

    pub fn stats_color(&self) -> Rgb {
        load_color(self.pending_pathfinds(), self.queue.depth())
    }

    /// The driver of `vehicle_id` found its planned space taken.  Looks for
    /// another one right away and requests the path there, starting at `at`.
    /// Returns `false` for vehicles without a tracked driver.
    pub fn report_parking_failed(&mut self, vehicle_id: VehicleId, at: Option<PathPosition>) -> SimResult<bool> {
        if !self.trips.report_parking_failed(&mut self.world, vehicle_id, at)? {
            return Ok(false);
        }
        if let Some(driver) = self.world.ext.vehicle(vehicle_id).map(|e| e.driver_instance) {
            self.reissue(driver, &mut TickReport::default())?;
        }
        Ok(true)
    }

    /// Switch parking behaviour off: release travellers who depend on it and
    /// drop all queued checkups.  Returns the number of released instances.
    pub fn disable_parking(&mut self) -> SimResult<usize> {
        self.queue.clear();
        self.retry.clear();
        Ok(self.trips.on_disable_feature(&mut self.world)?)
    }

    /// The host is removing a pedestrian: release it with its paths and
    /// extended state, and drop any pending retry.
    pub fn release_instance(&mut self, id: CitizenInstanceId) -> SimResult<()> {
        self.trips.release_instance(&mut self.world, id)?;
        self.retry.retain(|&r| r != id);
        Ok(())
    }

    /// The host is removing a live vehicle, e.g. once it has parked.
    pub fn release_vehicle(&mut self, id: VehicleId) -> SimResult<()> {
        self.trips.release_vehicle(&mut self.world, id)?;
        Ok(())
    }

    /// Stop the checkup worker and return the number of checkups it handled.
    pub fn shutdown(mut self) -> SimResult<u64> {
        match self.worker.take() {
            Some(worker) => Ok(worker.shutdown()?),
            None => Ok(0),
        }
    }

    // ── Poll phase ────────────────────────────────────────────────────────

    /// Paths to read this tick, pedestrians first, each group by ascending id.
    fn pending_paths(&self) -> Vec<Pending> {
        let agents = &self.world.agents;
        let mut pending: Vec<Pending> = agents
            .instances
            .iter()
            .filter(|(_, i)| i.flags.contains(InstanceFlag::WaitingPath))
            .filter_map(|(id, i)| i.path.map(|p| Pending::Pedestrian(id, p)))
            .collect();

        let ext = &self.world.ext;
        pending.extend(agents.vehicles.iter().filter_map(|(id, v)| {
            let path = v.path?;
            let driver = ext.vehicle(id)?.driver_instance;
            ext.instance(driver).path_mode.is_calculating_car_path().then_some(Pending::Driver(id, path))
        }));
        pending
    }

    #[cfg(not(feature = "parallel"))]
    fn poll(&self, pending: &[Pending]) -> Vec<(Pending, PathState)> {
        let paths = self.trips.paths();
        pending.iter().map(|&item| (item, paths.poll(item.path()))).collect()
    }

    #[cfg(feature = "parallel")]
    fn poll(&self, pending: &[Pending]) -> Vec<(Pending, PathState)> {
        use rayon::prelude::*;

        let paths = self.trips.paths();
        // `collect` on an indexed parallel iterator keeps the input order.
        pending.par_iter().map(|&item| (item, paths.poll(item.path()))).collect()
    }

    // ── Reconcile phase ───────────────────────────────────────────────────

    fn reconcile_pedestrian<O: ParkingObserver>(
        &mut self,
        id:       CitizenInstanceId,
        main:     PathState,
        report:   &mut TickReport,
        observer: &mut O,
    ) -> SimResult<()> {
        let state = self.trips.update_citizen_path_state(&mut self.world, id, main)?;
        if state == ExtSoftPathState::Calculating {
            return Ok(());
        }
        report.count(state);
        observer.on_path_state(id, self.world.ext.instance(id).path_mode, state);
        if state == ExtSoftPathState::FailedSoft {
            self.reissue(id, report)?;
        }
        Ok(())
    }

    fn reconcile_driver<O: ParkingObserver>(
        &mut self,
        id:       VehicleId,
        main:     PathState,
        report:   &mut TickReport,
        observer: &mut O,
    ) -> SimResult<()> {
        let state = self.trips.update_car_path_state(&mut self.world, id, main)?;
        if state == ExtSoftPathState::Calculating {
            return Ok(());
        }
        report.count(state);
        let Some(driver) = self.world.ext.vehicle(id).map(|e| e.driver_instance) else {
            return Ok(());
        };
        observer.on_path_state(driver, self.world.ext.instance(driver).path_mode, state);
        if state == ExtSoftPathState::FailedSoft {
            self.reissue(driver, report)?;
        }
        Ok(())
    }

    /// Issue the request a soft failure left in the stored mode, from the
    /// traveller's car if one is on the road, towards the target building
    /// (or the instance's target position without one).  A request the
    /// engine has no handle for is retried next tick.
    fn reissue(&mut self, id: CitizenInstanceId, report: &mut TickReport) -> SimResult<()> {
        let instance = self.world.agents.instance(id)?;
        let start = self
            .world
            .agents
            .live_vehicle(instance.citizen)
            .and_then(|v| self.world.agents.vehicles.get(v))
            .map_or(instance.position, |v| v.position);
        let end = self
            .world
            .buildings
            .get(instance.target_building)
            .map_or(instance.target_pos, |b| b.position);
        let before = self.world.ext.instance(id).path_mode;
        match self.trips.start_path_find(&mut self.world, id, start, end)? {
            Some(_) => report.reissued += 1,
            None if self.world.ext.instance(id).path_mode == before && issues_request(before) => {
                self.retry.push(id);
            }
            None => {}
        }
        Ok(())
    }

    fn retry_requests(&mut self, report: &mut TickReport) -> SimResult<()> {
        for id in std::mem::take(&mut self.retry) {
            if self.world.agents.instances.contains(id) {
                self.reissue(id, report)?;
            }
        }
        Ok(())
    }

    // ── Checkups ──────────────────────────────────────────────────────────

    fn drain_checkups_into<O: ParkingObserver>(&mut self, observer: &mut O) -> SimResult<usize> {
        let mut ids: Vec<ParkedVehicleId> = self.inbox.try_iter().collect();
        if !self.has_background_checkups() {
            while let Some(id) = self.queue.pop() {
                ids.push(id);
            }
        }
        for &id in &ids {
            let outcome = self.update_parked_vehicle(id)?;
            observer.on_checkup(id, outcome);
        }
        Ok(ids.len())
    }
}

/// Modes for which `start_path_find` submits a request.
fn issues_request(mode: ExtPathMode) -> bool {
    matches!(
        mode,
        ExtPathMode::None
            | ExtPathMode::RequiresCarPath
            | ExtPathMode::RequiresMixedCarPathToTarget
            | ExtPathMode::RequiresWalkingPathToParkedCar
            | ExtPathMode::RequiresWalkingPathToTarget
            | ExtPathMode::ParkingFailed
    )
}
