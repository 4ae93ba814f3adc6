//! `pk-core` — foundational types for the `pk` parking workspace.
//!
//! Every other `pk-*` crate depends on this one.  It has no `pk-*`
//! dependencies and few external ones (`rand`, `thiserror`, `enumset`, plus
//! optional `serde`).
//!
//! # What lives here
//!
//! | Module        | Contents                                                   |
//! |---------------|------------------------------------------------------------|
//! | [`ids`]       | `SegmentId`, `BuildingId`, `PathId`, generational pool ids  |
//! | [`geo`]       | `Vec3`, `Rotation`, segment projection                      |
//! | [`rng`]       | `SimRng` (simulation randomizer)                            |
//! | [`flags`]     | lane, vehicle and transport-mode flag sets                  |
//! | [`config`]    | `ParkingConfig`, `GridSpec`                                 |
//! | [`time`]      | `Tick`                                                      |
//! | [`error`]     | `CoreError`, `CoreResult`                                   |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod config;
pub mod error;
pub mod flags;
pub mod geo;
pub mod ids;
pub mod rng;
pub mod time;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{GridSpec, ParkingConfig};
pub use error::{CoreError, CoreResult};
pub use flags::{
    ExtTransportMode, ExtVehicleType, ExtVehicleTypes, LaneType, LaneTypes, TransportFlag,
    VehicleType, VehicleTypes,
};
pub use geo::{Rotation, Vec3};
pub use ids::{
    BuildingId, CitizenId, CitizenInstanceId, ParkedVehicleId, PathId, PoolId, SegmentId,
    VehicleId,
};
pub use rng::SimRng;
pub use time::Tick;
