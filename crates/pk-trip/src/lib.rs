//! `pk-trip` — parking-aware trips for citizens who own a car.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                           |
//! |----------------|--------------------------------------------------------------------|
//! | [`state`]      | `ExtPathMode`, `ExtSoftPathState`, extended records, `ExtStore`    |
//! | [`path`]       | `PathFinder` trait, `PathRequest`, `PathSummary`, scripted engine  |
//! | [`world`]      | `World` (network, buildings, pools, extended state, randomizer)    |
//! | [`machine`]    | `TripStateMachine` (path-result reconciliation, path requests)    |
//! | [`enter`]      | `enter_parked_car`, `VehicleSpawner`                               |
//! | [`spawn`]      | spawning and moving parked cars                                    |
//! | [`approach`]   | per-tick walk up to the car or the target                          |
//! | [`status`]     | status labels for citizens and cars                                |
//! | [`error`]      | `TripError`, `TripResult<T>`                                       |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on the extended records. |

pub mod approach;
pub mod enter;
pub mod error;
pub mod machine;
pub mod path;
pub mod spawn;
pub mod state;
pub mod status;
pub mod world;


pub use enter::{AlwaysSpawn, VehicleSpawner, enter_parked_car};
pub use error::{TripError, TripResult};
pub use machine::TripStateMachine;
pub use path::{PathFinder, PathRequest, PathState, PathSummary, ScriptedPathFinder};
pub use spawn::{
    try_move_parked_vehicle, try_spawn_parked_passenger_car, try_spawn_parked_passenger_car_building,
    try_spawn_parked_passenger_car_road_side,
};
pub use state::{
    ExtCitizen, ExtCitizenInstance, ExtPathMode, ExtSoftPathState, ExtStore, ExtVehicle, ParkedCarApproachState,
    TripPhase,
};
pub use status::{car_status_label, citizen_status_label, enrich_car_status, enrich_citizen_status};
pub use world::World;
