//! Parking tunables and grid geometry.
//!
//! Everything the state machine and the search read from configuration lives
//! in [`ParkingConfig`].  Loading it from a file is the host's business; with
//! the `serde` feature the struct can be deserialized directly, and
//! [`ParkingConfig::validate`] rejects values the algorithms cannot work with.

use std::time::Duration;

use crate::{CoreError, CoreResult};

/// Geometry of a square spatial grid centred on the world origin.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridSpec {
    /// Edge length of one cell in world units.
    pub cell_size: f32,
    /// Number of cells along each axis.
    pub resolution: u32,
}

impl GridSpec {
    /// Segment grid of the host network.
    pub const SEGMENTS: GridSpec = GridSpec { cell_size: 64.0, resolution: 270 };
    /// Building grid of the host network.
    pub const BUILDINGS: GridSpec = GridSpec { cell_size: 64.0, resolution: 270 };
    /// Finer grid used for parked vehicles.
    pub const PARKED: GridSpec = GridSpec { cell_size: 32.0, resolution: 540 };

    pub fn cell_count(&self) -> usize {
        (self.resolution as usize) * (self.resolution as usize)
    }

    /// Unclamped `(row, col)` of the cell containing `(x, z)`: row follows `z`,
    /// column follows `x`.
    #[inline]
    pub fn cell_of(&self, x: f32, z: f32) -> (i32, i32) {
        let half = self.resolution as f32 / 2.0;
        (
            (z / self.cell_size + half) as i32,
            (x / self.cell_size + half) as i32,
        )
    }

    /// Like [`cell_of`](Self::cell_of) but clamped into the grid.
    #[inline]
    pub fn clamped_cell_of(&self, x: f32, z: f32) -> (u32, u32) {
        let (i, j) = self.cell_of(x, z);
        let max = self.resolution as i32 - 1;
        (i.clamp(0, max) as u32, j.clamp(0, max) as u32)
    }

    #[inline]
    pub fn contains(&self, i: i32, j: i32) -> bool {
        let r = self.resolution as i32;
        i >= 0 && i < r && j >= 0 && j < r
    }

    /// Spiral radius whose square of cells covers `max_distance` around the
    /// centre cell.
    #[inline]
    pub fn search_radius(&self, max_distance: f32) -> u32 {
        ((max_distance / (self.cell_size / 2.0)) as u32 + 1).max(1)
    }
}

/// All tunables of the parking layer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParkingConfig {
    /// Max distance between a parked car and its owner's home.
    pub max_parked_car_distance_to_home: f32,
    /// Max distance between a parked car and the building it serves.
    pub max_parked_car_distance_to_building: f32,
    /// Squared distance at which a pedestrian switches into their car.
    pub max_parked_car_instance_switch_sqr_distance: f32,
    /// Max distance from a building to the pedestrian lane used to reach it.
    pub max_building_to_pedestrian_lane_distance: f32,
    /// Modulus of the "keep scanning / prefer building" coin flip.
    pub vicinity_parking_space_selection_rand: u32,
    /// Spread of the jitter applied to a segment centre before lane lookup.
    pub parking_space_position_rand: u32,
    /// Modulus of the reckless-driver roll.  A foreign residential building
    /// is used only when the roll is zero, so `0` and `1` make every driver
    /// reckless.
    pub reckless_driver_modulo: u32,
    /// Offset along the search direction applied to a vicinity search target.
    pub vicinity_search_offset: f32,

    pub public_transport_demand_increment: u32,
    pub public_transport_demand_usage_decrement: u32,
    pub failed_parking_space_demand_increment: u32,
    pub failed_spawn_parking_space_demand_increment: u32,
    pub min_spawned_car_parking_space_demand_delta: i32,
    pub max_spawned_car_parking_space_demand_delta: i32,
    pub max_parking_space_demand: u32,
    pub max_public_transport_demand: u32,

    /// Idle sleep of the checkup worker when its queue is empty.
    pub checkup_idle_backoff: Duration,

    pub segment_grid: GridSpec,
    pub building_grid: GridSpec,
    pub parked_grid: GridSpec,
}

impl Default for ParkingConfig {
    fn default() -> Self {
        Self {
            max_parked_car_distance_to_home:              256.0,
            max_parked_car_distance_to_building:          512.0,
            max_parked_car_instance_switch_sqr_distance:  6.0,
            max_building_to_pedestrian_lane_distance:     96.0,
            vicinity_parking_space_selection_rand:        50,
            parking_space_position_rand:                  32,
            reckless_driver_modulo:                       20,
            vicinity_search_offset:                       16.0,
            public_transport_demand_increment:            10,
            public_transport_demand_usage_decrement:      3,
            failed_parking_space_demand_increment:        5,
            failed_spawn_parking_space_demand_increment:  10,
            min_spawned_car_parking_space_demand_delta:   -5,
            max_spawned_car_parking_space_demand_delta:   3,
            max_parking_space_demand:                     100,
            max_public_transport_demand:                  100,
            checkup_idle_backoff:                         Duration::from_millis(500),
            segment_grid:                                 GridSpec::SEGMENTS,
            building_grid:                                GridSpec::BUILDINGS,
            parked_grid:                                  GridSpec::PARKED,
        }
    }
}

impl ParkingConfig {
    /// Deterministic variant for tests and replays: no jitter, no "keep
    /// scanning" coin flips, every driver reckless.
    pub fn deterministic() -> Self {
        Self {
            vicinity_parking_space_selection_rand: 0,
            parking_space_position_rand: 0,
            reckless_driver_modulo: 0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> CoreResult<()> {
        let distances = [
            ("max_parked_car_distance_to_home", self.max_parked_car_distance_to_home),
            ("max_parked_car_distance_to_building", self.max_parked_car_distance_to_building),
            ("max_parked_car_instance_switch_sqr_distance", self.max_parked_car_instance_switch_sqr_distance),
            ("max_building_to_pedestrian_lane_distance", self.max_building_to_pedestrian_lane_distance),
        ];
        for (name, value) in distances {
            if !(value.is_finite() && value > 0.0) {
                return Err(CoreError::Config(format!("{name} must be positive, got {value}")));
            }
        }
        if self.min_spawned_car_parking_space_demand_delta
            > self.max_spawned_car_parking_space_demand_delta
        {
            return Err(CoreError::Config(format!(
                "spawned car demand delta range is empty: {}..{}",
                self.min_spawned_car_parking_space_demand_delta,
                self.max_spawned_car_parking_space_demand_delta,
            )));
        }
        for (name, grid) in [
            ("segment_grid", self.segment_grid),
            ("building_grid", self.building_grid),
            ("parked_grid", self.parked_grid),
        ] {
            if grid.resolution == 0 || !(grid.cell_size > 0.0) {
                return Err(CoreError::Config(format!("{name} has an empty extent")));
            }
        }
        Ok(())
    }
}
