//! Observer hooks for progress reporting and data collection.

use pk_core::{CitizenInstanceId, ParkedVehicleId, Tick};
use pk_trip::{ExtPathMode, ExtSoftPathState};

use crate::{CheckupOutcome, TickReport};

/// Callbacks invoked by [`ParkingSim::tick`][crate::ParkingSim::tick].
///
/// All methods default to no-ops.
///
/// # Example
///
/// ```rust,ignore
/// struct HardFailures(usize);
///
/// impl ParkingObserver for HardFailures {
///     fn on_path_state(&mut self, _: CitizenInstanceId, _: ExtPathMode, state: ExtSoftPathState) {
///         if state == ExtSoftPathState::FailedHard {
///             self.0 += 1;
///         }
///     }
/// }
/// ```
pub trait ParkingObserver {
    /// Called before any processing of `tick`.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called after a traveller's path result was reconciled.  `mode` is the
    /// stored mode afterwards; for drivers `instance` is the driver.
    fn on_path_state(&mut self, _instance: CitizenInstanceId, _mode: ExtPathMode, _state: ExtSoftPathState) {}

    /// Called for every applied parked-vehicle checkup.
    fn on_checkup(&mut self, _id: ParkedVehicleId, _outcome: CheckupOutcome) {}

    /// Called at the end of each tick.
    fn on_tick_end(&mut self, _tick: Tick, _report: &TickReport) {}
}

/// A [`ParkingObserver`] that does nothing.
pub struct NoopObserver;

impl ParkingObserver for NoopObserver {}
