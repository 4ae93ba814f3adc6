//! `pk-parking` — finding a place to leave a car.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                         |
//! |----------------|------------------------------------------------------------------|
//! | [`finder`]     | `ParkingSpaceFinder`, `SearchWorld`                               |
//! | [`result`]     | `ParkingSpace`, `ParkingSpaceLocation`, `ParkingError`, citizen plan |
//! | `roadside`     | slot search along parking lanes                                  |
//! | `building`     | closest free spot on a building lot                              |
//!
//! Searches only read the world.  Placing a parked vehicle at the result is
//! the caller's job.

mod building;
pub mod finder;
pub mod result;
mod roadside;


pub use finder::{ParkingSpaceFinder, SearchWorld};
pub use result::{
    CitizenParkingPlan, CitizenParkingRequest, ParkingError, ParkingSpace, ParkingSpaceLocation,
};
