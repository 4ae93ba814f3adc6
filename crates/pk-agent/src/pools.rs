//! All agent pools behind one owner.

use tracing::debug;

use pk_core::{CitizenId, CitizenInstanceId, GridSpec, ParkedVehicleId, VehicleId};

use crate::{
    AgentError, AgentResult, Arena, Citizen, CitizenInstance, InstanceRef, InstanceRegistry,
    ParkedVehicle, ParkedVehicleRegistry, Vehicle,
};

/// Citizens, their instances, live and parked vehicles, and the instance
/// registry.  Fields are public so callers can borrow pools disjointly.
pub struct AgentPools {
    pub citizens:  Arena<CitizenId, Citizen>,
    pub instances: Arena<CitizenInstanceId, CitizenInstance>,
    pub vehicles:  Arena<VehicleId, Vehicle>,
    pub parked:    ParkedVehicleRegistry,
    pub registry:  InstanceRegistry,
}

impl AgentPools {
    pub fn citizen(&self, id: CitizenId) -> AgentResult<&Citizen> {
        self.citizens.get(id).ok_or(AgentError::StaleCitizen(id))
    }

    pub fn citizen_mut(&mut self, id: CitizenId) -> AgentResult<&mut Citizen> {
        self.citizens.get_mut(id).ok_or(AgentError::StaleCitizen(id))
    }

    pub fn instance(&self, id: CitizenInstanceId) -> AgentResult<&CitizenInstance> {
        self.instances.get(id).ok_or(AgentError::StaleInstance(id))
    }

    pub fn instance_mut(&mut self, id: CitizenInstanceId) -> AgentResult<&mut CitizenInstance> {
        self.instances.get_mut(id).ok_or(AgentError::StaleInstance(id))
    }

    pub fn vehicle(&self, id: VehicleId) -> AgentResult<&Vehicle> {
        self.vehicles.get(id).ok_or(AgentError::StaleVehicle(id))
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> AgentResult<&mut Vehicle> {
        self.vehicles.get_mut(id).ok_or(AgentError::StaleVehicle(id))
    }

    /// Spawn a pedestrian instance for `citizen` and link it back.
    pub fn spawn_instance(&mut self, instance: CitizenInstance) -> AgentResult<CitizenInstanceId> {
        let citizen = instance.citizen;
        if !self.citizens.contains(citizen) {
            return Err(AgentError::StaleCitizen(citizen));
        }
        let id = self.instances.insert(instance).ok_or(AgentError::PoolExhausted {
            pool: "citizen instances",
            capacity: self.instances.capacity(),
        })?;
        if let Some(c) = self.citizens.get_mut(citizen) {
            c.instance = id;
        }
        Ok(id)
    }

    /// Remove a pedestrian instance and clear the citizen's back link.
    pub fn release_instance(&mut self, id: CitizenInstanceId) -> AgentResult<CitizenInstance> {
        let instance = self.instances.remove(id).ok_or(AgentError::StaleInstance(id))?;
        if let Some(c) = self.citizens.get_mut(instance.citizen) {
            if c.instance == id {
                c.instance = CitizenInstanceId::INVALID;
            }
        }
        self.registry.release_instance(InstanceRef::Citizen(id));
        debug!(%id, "citizen instance released");
        Ok(instance)
    }

    /// Remove a live vehicle.  The driving citizen's back link is cleared.
    pub fn release_vehicle(&mut self, id: VehicleId) -> AgentResult<Vehicle> {
        let vehicle = self.vehicles.remove(id).ok_or(AgentError::StaleVehicle(id))?;
        if let Some(c) = self.citizens.get_mut(vehicle.transfer_citizen) {
            if c.vehicle == id {
                c.vehicle = VehicleId::INVALID;
            }
        }
        self.registry.release_instance(InstanceRef::Vehicle(id));
        Ok(vehicle)
    }

    /// Release a parked vehicle and clear its owner's back link.
    pub fn release_parked_vehicle(&mut self, id: ParkedVehicleId) -> AgentResult<ParkedVehicle> {
        let owner = self.parked.get(id).ok_or(AgentError::StaleParkedVehicle(id))?.owner;
        if let Some(c) = self.citizens.get_mut(owner) {
            if c.parked_vehicle == id {
                c.parked_vehicle = ParkedVehicleId::INVALID;
            }
        }
        self.registry.release_instance(InstanceRef::ParkedVehicle(id));
        self.parked.release(id)
    }

    /// `citizen`'s parked vehicle if it is still live.
    pub fn live_parked_vehicle(&self, citizen: CitizenId) -> Option<ParkedVehicleId> {
        let id = self.citizens.get(citizen)?.parked_vehicle;
        self.parked.contains(id).then_some(id)
    }

    /// `citizen`'s live vehicle, if any.
    pub fn live_vehicle(&self, citizen: CitizenId) -> Option<VehicleId> {
        let id = self.citizens.get(citizen)?.vehicle;
        self.vehicles.contains(id).then_some(id)
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Fluent construction of [`AgentPools`].
///
/// ```
/// use pk_agent::AgentPoolsBuilder;
///
/// let pools = AgentPoolsBuilder::new().vehicles(64).parked_vehicles(128).build();
/// assert_eq!(pools.vehicles.capacity(), 64);
/// assert_eq!(pools.parked.capacity(), 128);
/// ```
pub struct AgentPoolsBuilder {
    citizens:        usize,
    instances:       usize,
    vehicles:        usize,
    parked_vehicles: usize,
    parked_grid:     GridSpec,
}

impl Default for AgentPoolsBuilder {
    fn default() -> Self {
        Self {
            citizens: 1 << 20,
            instances: 1 << 16,
            vehicles: 1 << 14,
            parked_vehicles: 1 << 15,
            parked_grid: GridSpec::PARKED,
        }
    }
}

impl AgentPoolsBuilder {
    /// Host-sized pool capacities.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn citizens(mut self, capacity: usize) -> Self {
        self.citizens = capacity;
        self
    }

    pub fn instances(mut self, capacity: usize) -> Self {
        self.instances = capacity;
        self
    }

    pub fn vehicles(mut self, capacity: usize) -> Self {
        self.vehicles = capacity;
        self
    }

    pub fn parked_vehicles(mut self, capacity: usize) -> Self {
        self.parked_vehicles = capacity;
        self
    }

    pub fn parked_grid(mut self, spec: GridSpec) -> Self {
        self.parked_grid = spec;
        self
    }

    pub fn build(self) -> AgentPools {
        AgentPools {
            citizens: Arena::with_capacity(self.citizens),
            instances: Arena::with_capacity(self.instances),
            vehicles: Arena::with_capacity(self.vehicles),
            parked: ParkedVehicleRegistry::new(self.parked_grid, self.parked_vehicles),
            registry: InstanceRegistry::new(),
        }
    }
}
