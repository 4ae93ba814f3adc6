//! Identity of simulated things as seen from outside the pools.
//!
//! A camera follow target or a selection refers to "whatever is currently
//! simulating this person's car".  When a parked car becomes a live vehicle
//! the reference has to move along with it.

use rustc_hash::FxHashSet;
use tracing::trace;

use pk_core::{CitizenInstanceId, ParkedVehicleId, VehicleId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstanceRef {
    Citizen(CitizenInstanceId),
    Vehicle(VehicleId),
    ParkedVehicle(ParkedVehicleId),
}

/// The set of instances something outside the simulation tracks.
#[derive(Default)]
pub struct InstanceRegistry {
    tracked: FxHashSet<InstanceRef>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, instance: InstanceRef) {
        self.tracked.insert(instance);
    }

    #[inline]
    pub fn is_tracked(&self, instance: InstanceRef) -> bool {
        self.tracked.contains(&instance)
    }

    /// Move tracking from `old` to `new`.  Returns `true` if `old` was tracked.
    pub fn change_instance(&mut self, old: InstanceRef, new: InstanceRef) -> bool {
        if self.tracked.remove(&old) {
            self.tracked.insert(new);
            trace!(?old, ?new, "tracked instance changed");
            true
        } else {
            false
        }
    }

    /// Forget an instance that no longer exists.
    pub fn release_instance(&mut self, instance: InstanceRef) {
        self.tracked.remove(&instance);
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }
}
