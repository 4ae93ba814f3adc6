//! `pk-sim` — owning context that drives the parking layer once per tick.
//!
//! # Tick
//!
//! ```text
//! ① Retry   — re-issue path requests the engine had no handle for.
//! ② Poll    — read the engine state of pedestrians waiting for a path and
//!             of cars whose driver is calculating a car path
//!             (parallel with the `parallel` feature).
//! ③ Apply   — reconcile each result in ascending id order; a soft failure
//!             issues the follow-up request the stored mode names.
//! ④ Checkup — apply parked-vehicle checkups forwarded by the
//!             `ParkedVehicleCheckups` worker thread.
//! ```
//!
//! The worker never touches parked-vehicle records.  It only forwards ids
//! into an inbox that the tick drains, so all writes stay on the tick thread.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                  |
//! |--------------|-----------------------------------------------------------|
//! | [`sim`]      | `ParkingSim`, `TickReport`, `CheckupOutcome`              |
//! | [`builder`]  | `ParkingSimBuilder`                                       |
//! | [`observer`] | `ParkingObserver`, `NoopObserver`                         |
//! | [`logging`]  | stdout subscriber initialisers                            |
//! | [`error`]    | `SimError`, `SimResult<T>`                                |
//!
//! # Cargo features
//!
//! | Feature    | Effect                                                  |
//! |------------|---------------------------------------------------------|
//! | `parallel` | Runs the poll phase on Rayon's thread pool.             |
//! | `fx-hash`  | FxHash for the checkup queue's membership set.          |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use pk_sim::{NoopObserver, ParkingSimBuilder};
//!
//! let mut sim = ParkingSimBuilder::new(network, buildings, agents, engine, spawner)
//!     .seed(42)
//!     .build()?;
//! sim.update_parked_vehicles(-500.0, -500.0, 500.0, 500.0);
//! sim.run_ticks(60, &mut NoopObserver)?;
//! println!("{}", sim.stats_label());
//! sim.shutdown()?;
//! ```

pub mod builder;
pub mod error;
pub mod logging;
pub mod observer;
pub mod sim;

#[cfg(test)]
mod tests;

pub use builder::ParkingSimBuilder;
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, ParkingObserver};
pub use sim::{CheckupOutcome, ParkingSim, TickReport, VIEWPORT_MARGIN};
