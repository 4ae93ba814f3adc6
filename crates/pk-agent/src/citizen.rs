//! Citizens and their pedestrian instances.

use enumset::{EnumSet, EnumSetType};

use pk_core::{BuildingId, CitizenId, ParkedVehicleId, PathId, Vec3, VehicleId, CitizenInstanceId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AgeGroup {
    Child,
    Teen,
    YoungAdult,
    #[default]
    Adult,
    Senior,
}

impl AgeGroup {
    /// Children and teens never get a car spawned for them.
    #[inline]
    pub fn can_drive(self) -> bool {
        matches!(self, AgeGroup::YoungAdult | AgeGroup::Adult | AgeGroup::Senior)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Citizen {
    pub tourist:        bool,
    pub age:            AgeGroup,
    pub home:           BuildingId,
    /// Building the citizen is inside right now, if any.
    pub current_building: BuildingId,
    /// Live vehicle the citizen is driving, if any.
    pub vehicle:        VehicleId,
    pub parked_vehicle: ParkedVehicleId,
    pub instance:       CitizenInstanceId,
}

impl Citizen {
    pub fn resident(home: BuildingId) -> Self {
        Self {
            tourist: false,
            age: AgeGroup::Adult,
            home,
            current_building: home,
            vehicle: VehicleId::INVALID,
            parked_vehicle: ParkedVehicleId::INVALID,
            instance: CitizenInstanceId::INVALID,
        }
    }

    pub fn tourist() -> Self {
        Self { tourist: true, ..Self::resident(BuildingId::INVALID) }
    }

    pub fn at_building(mut self, building: BuildingId) -> Self {
        self.current_building = building;
        self
    }

    pub fn with_age(mut self, age: AgeGroup) -> Self {
        self.age = age;
        self
    }
}

#[derive(EnumSetType, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstanceFlag {
    /// Simulated as a walking pedestrian.
    Character,
    WaitingPath,
    EnteringVehicle,
    TryingSpawnVehicle,
    BoredOfWaiting,
    /// The citizen may not fall back to public transport.
    CannotUseTransport,
}

/// A live pedestrian instance of a citizen.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CitizenInstance {
    pub citizen:             CitizenId,
    pub flags:               EnumSet<InstanceFlag>,
    pub position:            Vec3,
    pub target_pos:          Vec3,
    /// Main path handle; owned by the instance until handed to a vehicle.
    pub path:                Option<PathId>,
    /// Index of the next path position the pedestrian will reach.
    pub path_position_index: u8,
    pub source_building:     BuildingId,
    pub target_building:     BuildingId,
    pub wait_counter:        u8,
}

impl CitizenInstance {
    /// A walking pedestrian at `position`.
    pub fn new(citizen: CitizenId, position: Vec3) -> Self {
        Self {
            citizen,
            flags: InstanceFlag::Character.into(),
            position,
            target_pos: position,
            path: None,
            path_position_index: 0,
            source_building: BuildingId::INVALID,
            target_building: BuildingId::INVALID,
            wait_counter: 0,
        }
    }

    pub fn with_buildings(mut self, source: BuildingId, target: BuildingId) -> Self {
        self.source_building = source;
        self.target_building = target;
        self
    }

    #[inline]
    pub fn is_character(&self) -> bool {
        self.flags.contains(InstanceFlag::Character)
    }

    /// Stop simulating the pedestrian body.  The instance record stays.
    pub fn unspawn(&mut self) {
        self.flags.remove(InstanceFlag::Character);
    }
}
