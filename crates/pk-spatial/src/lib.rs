//! `pk-spatial` — the static world the parking layer searches.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                       |
//! |----------------|----------------------------------------------------------------|
//! | [`grid`]       | `LinkedGrid` (cell heads + intrusive next links, capped walks) |
//! | [`spiral`]     | `spiral_coords`, `SpiralCache`                                 |
//! | [`network`]    | `RoadNetwork`, `Segment`, `Lane`, `PathPosition`, builder      |
//! | [`buildings`]  | `BuildingStore`, `Building`, `ParkingSpot`, demand counters     |
//! | [`error`]      | `SpatialError`, `SpatialResult<T>`                             |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                       |
//! |---------|--------------------------------------------------------------|
//! | `serde` | Derives `Serialize`/`Deserialize` on public value types.     |

pub mod buildings;
pub mod error;
pub mod grid;
pub mod network;
pub mod spiral;


pub use buildings::{
    Building, BuildingDemand, BuildingFlag, BuildingService, BuildingStore, DemandView, ParkingSpot,
};
pub use error::{SpatialError, SpatialResult};
pub use grid::{CellIter, LinkedGrid};
pub use network::{
    Lane, LaneDirection, LanePosition, PathPosition, RoadNetwork, RoadNetworkBuilder, Segment,
};
pub use spiral::{SpiralCache, spiral_coords};
