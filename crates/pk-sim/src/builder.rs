//! Fluent builder for constructing a [`ParkingSim`].

use std::sync::mpsc;

use pk_agent::AgentPools;
use pk_checkup::{CheckupError, CheckupWorker, DeferredCheckupQueue, ThreadSleeper};
use pk_core::{GridSpec, ParkedVehicleId, ParkingConfig, Tick};
use pk_spatial::{BuildingStore, RoadNetwork};
use pk_trip::{PathFinder, TripStateMachine, VehicleSpawner, World};

use crate::{ParkingSim, SimError, SimResult};

/// Fluent builder for [`ParkingSim<P, S>`].
///
/// # Required inputs
///
/// - [`RoadNetwork`], [`BuildingStore`], [`AgentPools`]: the world
/// - `P: PathFinder`: the path-finding engine
/// - `S: VehicleSpawner`: places vehicles on the road when a car is entered
///
/// # Optional inputs (have defaults)
///
/// | Method                     | Default                      |
/// |----------------------------|------------------------------|
/// | `.config(c)`               | `ParkingConfig::default()`   |
/// | `.seed(s)`                 | `0`                          |
/// | `.background_checkups(b)`  | `true`                       |
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = ParkingSimBuilder::new(network, buildings, agents, engine, spawner)
///     .config(config)
///     .seed(42)
///     .build()?;
/// sim.run_ticks(100, &mut NoopObserver)?;
/// ```
pub struct ParkingSimBuilder<P: PathFinder, S: VehicleSpawner> {
    network:    RoadNetwork,
    buildings:  BuildingStore,
    agents:     AgentPools,
    paths:      P,
    spawner:    S,
    config:     Option<ParkingConfig>,
    seed:       u64,
    background: bool,
}

impl<P: PathFinder, S: VehicleSpawner> ParkingSimBuilder<P, S> {
    /// Create a builder with all required inputs.
    pub fn new(
        network:   RoadNetwork,
        buildings: BuildingStore,
        agents:    AgentPools,
        paths:     P,
        spawner:   S,
    ) -> Self {
        Self {
            network,
            buildings,
            agents,
            paths,
            spawner,
            config:     None,
            seed:       0,
            background: true,
        }
    }

    pub fn config(mut self, config: ParkingConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Seed of the simulation randomizer.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Whether checkups run on the `ParkedVehicleCheckups` thread.
    ///
    /// When off, queued checkups are applied on the calling thread during
    /// [`ParkingSim::drain_checkups`], which keeps runs deterministic.
    pub fn background_checkups(mut self, enabled: bool) -> Self {
        self.background = enabled;
        self
    }

    /// Validate the configuration against the world's grids, start the
    /// checkup worker and return a ready-to-run [`ParkingSim`].
    pub fn build(self) -> SimResult<ParkingSim<P, S>> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        check_grid("segment", config.segment_grid, self.network.grid().spec())?;
        check_grid("building", config.building_grid, self.buildings.grid().spec())?;
        check_grid("parked vehicle", config.parked_grid, self.agents.parked.grid().spec())?;

        let queue = DeferredCheckupQueue::new();
        let (tx, inbox) = mpsc::channel::<ParkedVehicleId>();
        let worker = if self.background {
            let handler = move |id: ParkedVehicleId| tx.send(id).map_err(|_| CheckupError::Disconnected);
            Some(CheckupWorker::spawn(queue.clone(), handler, ThreadSleeper, config.checkup_idle_backoff)?)
        } else {
            None
        };

        Ok(ParkingSim {
            world: World::new(self.network, self.buildings, self.agents, self.seed),
            trips: TripStateMachine::new(config, self.paths, self.spawner),
            queue,
            worker,
            inbox,
            retry: Vec::new(),
            now:   Tick::ZERO,
        })
    }
}

fn check_grid(what: &'static str, expected: GridSpec, got: GridSpec) -> SimResult<()> {
    if expected == got {
        return Ok(());
    }
    Err(SimError::GridMismatch {
        what,
        expected_cells: expected.resolution,
        expected_size:  expected.cell_size,
        got_cells:      got.resolution,
        got_size:       got.cell_size,
    })
}
