//! Parked vehicles and the parked-vehicle grid.
//!
//! The registry is the only writer of the grid: every position change goes
//! through [`ParkedVehicleRegistry::relocate`] or
//! [`ParkedVehicleRegistry::regrid`], which unlink the record from its old
//! cell before linking it into the new one.  A record is therefore in exactly
//! one cell while it exists and in none after [`release`](ParkedVehicleRegistry::release).

use enumset::{EnumSet, EnumSetType};
use tracing::{debug, trace};

use pk_core::{CitizenId, GridSpec, ParkedVehicleId, Rotation, Vec3};
use pk_spatial::LinkedGrid;

use crate::{AgentError, AgentResult, Arena, VehicleInfo};

#[derive(EnumSetType, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParkedFlag {
    Created,
    /// Being parked or unparked right now.
    Parking,
    /// Queued for a deferred checkup.
    Updating,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParkedVehicle {
    pub info:     VehicleInfo,
    pub position: Vec3,
    pub rotation: Rotation,
    pub owner:    CitizenId,
    pub flags:    EnumSet<ParkedFlag>,
    cell:         (u32, u32),
}

impl ParkedVehicle {
    /// Grid cell the record is currently linked into.
    #[inline]
    pub fn cell(&self) -> (u32, u32) {
        self.cell
    }
}

pub struct ParkedVehicleRegistry {
    arena: Arena<ParkedVehicleId, ParkedVehicle>,
    grid:  LinkedGrid,
}

impl ParkedVehicleRegistry {
    pub fn new(spec: GridSpec, capacity: usize) -> Self {
        Self {
            arena: Arena::with_capacity(capacity),
            grid: LinkedGrid::with_slots(spec, capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    #[inline]
    pub fn grid(&self) -> &LinkedGrid {
        &self.grid
    }

    #[inline]
    pub fn get(&self, id: ParkedVehicleId) -> Option<&ParkedVehicle> {
        self.arena.get(id)
    }

    /// Mutable access to a record.  Moving it this way leaves the grid stale
    /// until [`regrid`](Self::regrid) runs.
    #[inline]
    pub fn get_mut(&mut self, id: ParkedVehicleId) -> Option<&mut ParkedVehicle> {
        self.arena.get_mut(id)
    }

    #[inline]
    pub fn contains(&self, id: ParkedVehicleId) -> bool {
        self.arena.contains(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParkedVehicleId, &ParkedVehicle)> + '_ {
        self.arena.iter()
    }

    /// Park a new vehicle and link it into the grid.
    pub fn create(
        &mut self,
        info:     VehicleInfo,
        position: Vec3,
        rotation: Rotation,
        owner:    CitizenId,
    ) -> AgentResult<ParkedVehicleId> {
        let cell = self.grid.cell_at(position);
        let record = ParkedVehicle {
            info,
            position,
            rotation,
            owner,
            flags: ParkedFlag::Created.into(),
            cell,
        };
        let id = self.arena.insert(record).ok_or(AgentError::PoolExhausted {
            pool: "parked vehicles",
            capacity: self.arena.capacity(),
        })?;
        self.grid.insert(id.slot, cell.0, cell.1);
        trace!(%id, %position, "parked vehicle created");
        Ok(id)
    }

    /// Unlink from the grid, clear owner and flags, then recycle the slot.
    pub fn release(&mut self, id: ParkedVehicleId) -> AgentResult<ParkedVehicle> {
        let cell = self.arena.get(id).ok_or(AgentError::StaleParkedVehicle(id))?.cell;
        self.grid.remove(id.slot, cell.0, cell.1);
        if let Some(record) = self.arena.get_mut(id) {
            record.owner = CitizenId::INVALID;
            record.flags = EnumSet::empty();
        }
        let record = self.arena.remove(id).ok_or(AgentError::StaleParkedVehicle(id))?;
        debug!(%id, "parked vehicle released");
        Ok(record)
    }

    /// Move a record and keep the grid consistent.
    pub fn relocate(&mut self, id: ParkedVehicleId, position: Vec3, rotation: Rotation) -> AgentResult<()> {
        let record = self.arena.get_mut(id).ok_or(AgentError::StaleParkedVehicle(id))?;
        let old = record.cell;
        let new = self.grid.cell_at(position);
        record.position = position;
        record.rotation = rotation;
        record.cell = new;
        self.grid.remove(id.slot, old.0, old.1);
        self.grid.insert(id.slot, new.0, new.1);
        Ok(())
    }

    /// Re-link a record whose position was edited in place.  Returns `true`
    /// if it changed cells.
    pub fn regrid(&mut self, id: ParkedVehicleId) -> AgentResult<bool> {
        let record = self.arena.get_mut(id).ok_or(AgentError::StaleParkedVehicle(id))?;
        let new = self.grid.cell_at(record.position);
        let old = record.cell;
        if old == new {
            return Ok(false);
        }
        record.cell = new;
        self.grid.remove(id.slot, old.0, old.1);
        self.grid.insert(id.slot, new.0, new.1);
        Ok(true)
    }

    /// Ids linked into the inclusive cell rectangle.
    pub fn ids_in_cells(
        &self,
        rows: std::ops::RangeInclusive<u32>,
        cols: std::ops::RangeInclusive<u32>,
    ) -> Vec<ParkedVehicleId> {
        self.grid
            .cells_in(rows, cols)
            .filter_map(|slot| self.arena.id_at_slot(slot))
            .collect()
    }

    /// Parked vehicles whose position lies within `radius` of `pos`.
    pub fn ids_near(&self, pos: Vec3, radius: f32) -> Vec<ParkedVehicleId> {
        let spec = self.grid.spec();
        let (r0, c0) = spec.clamped_cell_of(pos.x - radius, pos.z - radius);
        let (r1, c1) = spec.clamped_cell_of(pos.x + radius, pos.z + radius);
        let r2 = radius * radius;
        self.ids_in_cells(r0..=r1, c0..=c1)
            .into_iter()
            .filter(|&id| self.arena.get(id).is_some_and(|p| p.position.sqr_distance(pos) <= r2))
            .collect()
    }

    /// `true` if no parked vehicle other than `ignore` stands within
    /// `clearance` of `pos`.
    pub fn is_space_free(&self, pos: Vec3, clearance: f32, ignore: Option<ParkedVehicleId>) -> bool {
        self.ids_near(pos, clearance).into_iter().all(|id| Some(id) == ignore)
    }
}
