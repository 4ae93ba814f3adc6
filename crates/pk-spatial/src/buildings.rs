//! Buildings, their parking lots, and the demand counters the parking layer
//! feeds.
//!
//! Demand counters are the only output of this crate consumed elsewhere: an
//! economic model reads them to decide where to grow parking or transit.  All
//! counters saturate at zero and at the configured maximum.

use enumset::{EnumSet, EnumSetType};
use tracing::trace;

use pk_core::{BuildingId, GridSpec, Rotation, Vec3};

use crate::{LinkedGrid, SpatialError, SpatialResult};

#[derive(EnumSetType, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BuildingFlag {
    Created,
    Collapsed,
    TurnedOff,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BuildingService {
    Residential,
    Commercial,
    Industrial,
    Office,
    #[default]
    Other,
}

/// One marked parking space on a building lot, in world coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParkingSpot {
    pub position: Vec3,
    pub rotation: Rotation,
    pub width:    f32,
    pub length:   f32,
}

impl ParkingSpot {
    pub fn new(position: Vec3, rotation: Rotation) -> Self {
        Self { position, rotation, width: 2.5, length: 5.5 }
    }

    #[inline]
    pub fn fits(&self, width: f32, length: f32) -> bool {
        width <= self.width && length <= self.length
    }
}

/// Which counter a demand view reads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DemandView {
    ParkingSpace,
    IncomingPublicTransport,
    OutgoingPublicTransport,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildingDemand {
    pub parking_space:              u32,
    pub incoming_public_transport:  u32,
    pub outgoing_public_transport:  u32,
}

impl BuildingDemand {
    pub fn add_parking_space(&mut self, delta: u32, max: u32) {
        self.parking_space = self.parking_space.saturating_add(delta).min(max);
    }

    pub fn remove_parking_space(&mut self, delta: u32) {
        self.parking_space = self.parking_space.saturating_sub(delta);
    }

    /// Adjust parking demand by a delta interpolated between `min_delta` (the
    /// car parked right at the building) and `max_delta` (parked at
    /// `max_distance` or farther).
    pub fn modify_parking_space(
        &mut self,
        distance:     f32,
        min_delta:    i32,
        max_delta:    i32,
        max_distance: f32,
        max:          u32,
    ) {
        let frac = if max_distance > 0.0 { (distance / max_distance).clamp(0.0, 1.0) } else { 1.0 };
        let delta = (min_delta as f32 + (max_delta - min_delta) as f32 * frac).round() as i64;
        let next = (self.parking_space as i64 + delta).clamp(0, max as i64);
        self.parking_space = next as u32;
    }

    pub fn add_public_transport(&mut self, delta: u32, outgoing: bool, max: u32) {
        let counter = self.public_transport_mut(outgoing);
        *counter = counter.saturating_add(delta).min(max);
    }

    pub fn remove_public_transport(&mut self, delta: u32, outgoing: bool) {
        let counter = self.public_transport_mut(outgoing);
        *counter = counter.saturating_sub(delta);
    }

    fn public_transport_mut(&mut self, outgoing: bool) -> &mut u32 {
        if outgoing {
            &mut self.outgoing_public_transport
        } else {
            &mut self.incoming_public_transport
        }
    }

    /// Counter scaled into `[0, 1]` (100 = saturated), the input of an
    /// info-view colour ramp.
    pub fn level(&self, view: DemandView) -> f32 {
        let raw = match view {
            DemandView::ParkingSpace            => self.parking_space,
            DemandView::IncomingPublicTransport => self.incoming_public_transport,
            DemandView::OutgoingPublicTransport => self.outgoing_public_transport,
        };
        (raw as f32 * 0.01).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Building {
    pub flags:            EnumSet<BuildingFlag>,
    pub service:          BuildingService,
    pub position:         Vec3,
    /// Where vehicles and pedestrians appear when leaving the building.
    pub unspawn_position: Vec3,
    pub parking_spots:    Vec<ParkingSpot>,
    pub demand:           BuildingDemand,
}

impl Building {
    pub fn new(service: BuildingService, position: Vec3) -> Self {
        Self {
            flags: BuildingFlag::Created.into(),
            service,
            position,
            unspawn_position: position,
            parking_spots: Vec::new(),
            demand: BuildingDemand::default(),
        }
    }

    pub fn with_parking(mut self, spots: Vec<ParkingSpot>) -> Self {
        self.parking_spots = spots;
        self
    }

    pub fn with_unspawn_position(mut self, pos: Vec3) -> Self {
        self.unspawn_position = pos;
        self
    }

    /// Created, standing and switched on.
    #[inline]
    pub fn is_operational(&self) -> bool {
        self.flags.contains(BuildingFlag::Created)
            && !self.flags.contains(BuildingFlag::Collapsed)
            && !self.flags.contains(BuildingFlag::TurnedOff)
    }

    #[inline]
    pub fn is_residential(&self) -> bool {
        self.service == BuildingService::Residential
    }
}

/// All buildings plus the building grid.
pub struct BuildingStore {
    buildings: Vec<Building>,
    grid:      LinkedGrid,
}

impl BuildingStore {
    pub fn new(spec: GridSpec) -> Self {
        Self { buildings: Vec::new(), grid: LinkedGrid::new(spec) }
    }

    pub fn add(&mut self, building: Building) -> BuildingId {
        let id = BuildingId(self.buildings.len() as u32);
        self.grid.insert_at(id.0, building.position);
        self.buildings.push(building);
        id
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn get(&self, id: BuildingId) -> SpatialResult<&Building> {
        self.buildings.get(id.index()).ok_or(SpatialError::UnknownBuilding(id))
    }

    pub fn get_mut(&mut self, id: BuildingId) -> SpatialResult<&mut Building> {
        self.buildings.get_mut(id.index()).ok_or(SpatialError::UnknownBuilding(id))
    }

    #[inline]
    pub fn grid(&self) -> &LinkedGrid {
        &self.grid
    }

    pub fn iter(&self) -> impl Iterator<Item = (BuildingId, &Building)> + '_ {
        self.buildings.iter().enumerate().map(|(i, b)| (BuildingId(i as u32), b))
    }

    /// Demand counters of `id`, or `None` for `BuildingId::INVALID` and
    /// unknown ids.  Demand signals are best-effort, so callers skip missing
    /// buildings instead of failing.
    pub fn demand_mut(&mut self, id: BuildingId) -> Option<&mut BuildingDemand> {
        let demand = self.buildings.get_mut(id.index()).map(|b| &mut b.demand);
        if demand.is_none() && id.is_valid() {
            trace!(%id, "demand signal for unknown building dropped");
        }
        demand
    }

    /// Demand level of `id` for an info view; `None` for unknown buildings.
    pub fn demand_level(&self, id: BuildingId, view: DemandView) -> Option<f32> {
        self.buildings.get(id.index()).map(|b| b.demand.level(view))
    }
}
