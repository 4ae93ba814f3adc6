//! Live vehicles and their static description.

use enumset::{EnumSet, EnumSetType};

use pk_core::{CitizenId, ExtVehicleType, PathId, Rotation, Vec3};

/// Footprint and role of a vehicle model.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VehicleInfo {
    pub width:    f32,
    pub length:   f32,
    pub ext_type: ExtVehicleType,
}

impl VehicleInfo {
    pub const PASSENGER_CAR: VehicleInfo = VehicleInfo {
        width: 1.8,
        length: 4.5,
        ext_type: ExtVehicleType::PassengerCar,
    };

    #[inline]
    pub fn is_passenger_car(&self) -> bool {
        self.ext_type == ExtVehicleType::PassengerCar
    }

    /// The side door of a vehicle at `position`/`rotation` nearer to `from`.
    pub fn closest_door_position(&self, position: Vec3, rotation: Rotation, from: Vec3) -> Vec3 {
        let side = rotation.right() * (self.width * 0.5);
        let right = position + side;
        let left = position + -side;
        if right.sqr_distance(from) <= left.sqr_distance(from) { right } else { left }
    }
}

impl Default for VehicleInfo {
    fn default() -> Self {
        Self::PASSENGER_CAR
    }
}

#[derive(EnumSetType, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleFlag {
    Created,
    Spawned,
    Stopped,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vehicle {
    pub info:                VehicleInfo,
    pub flags:               EnumSet<VehicleFlag>,
    pub position:            Vec3,
    pub rotation:            Rotation,
    pub target_pos:          Vec3,
    pub path:                Option<PathId>,
    pub path_position_index: u8,
    pub last_path_offset:    u8,
    /// Citizen riding along as the driver.
    pub transfer_citizen:    CitizenId,
}

impl Vehicle {
    pub fn new(info: VehicleInfo, position: Vec3, rotation: Rotation) -> Self {
        Self {
            info,
            flags: VehicleFlag::Created.into(),
            position,
            rotation,
            target_pos: position,
            path: None,
            path_position_index: 0,
            last_path_offset: 0,
            transfer_citizen: CitizenId::INVALID,
        }
    }

    #[inline]
    pub fn is_spawned(&self) -> bool {
        self.flags.contains(VehicleFlag::Spawned)
    }
}
