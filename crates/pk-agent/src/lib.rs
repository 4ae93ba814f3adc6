//! `pk-agent` — agent pools for the `pk` parking workspace.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                       |
//! |----------------|----------------------------------------------------------------|
//! | [`arena`]      | `Arena<K, T>` (fixed capacity, free list, generational ids)    |
//! | [`citizen`]    | `Citizen`, `CitizenInstance`, `InstanceFlag`, `AgeGroup`       |
//! | [`vehicle`]    | `Vehicle`, `VehicleInfo`, `VehicleFlag`                        |
//! | [`parked`]     | `ParkedVehicleRegistry` (records + parked-vehicle grid)        |
//! | [`instance`]   | `InstanceRef`, `InstanceRegistry`                              |
//! | [`pools`]      | `AgentPools`, `AgentPoolsBuilder`                              |
//! | [`error`]      | `AgentError`, `AgentResult<T>`                                 |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                   |
//! |---------|----------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public value types. |

pub mod arena;
pub mod citizen;
pub mod error;
pub mod instance;
pub mod parked;
pub mod pools;
pub mod vehicle;


pub use arena::Arena;
pub use citizen::{AgeGroup, Citizen, CitizenInstance, InstanceFlag};
pub use error::{AgentError, AgentResult};
pub use instance::{InstanceRef, InstanceRegistry};
pub use parked::{ParkedFlag, ParkedVehicle, ParkedVehicleRegistry};
pub use pools::{AgentPools, AgentPoolsBuilder};
pub use vehicle::{Vehicle, VehicleFlag, VehicleInfo};
