//! Flag sets describing lanes, vehicles and a citizen's chosen transport.
//!
//! Each flag enum derives [`EnumSetType`] so a combination is a plain
//! `EnumSet<_>` bitset: `LaneType::Vehicle | LaneType::Parking` builds a
//! [`LaneTypes`] value and `set.contains(LaneType::Parking)` tests it.

use enumset::{EnumSet, EnumSetType};

// ── Lanes ─────────────────────────────────────────────────────────────────────

/// What a lane carries.
#[derive(EnumSetType, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LaneType {
    Vehicle,
    Pedestrian,
    Parking,
    PublicTransport,
    TransportVehicle,
}

pub type LaneTypes = EnumSet<LaneType>;

/// Physical vehicle classes a lane can carry.
#[derive(EnumSetType, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VehicleType {
    Car,
    Bicycle,
    Tram,
    Metro,
    Train,
    Ship,
}

pub type VehicleTypes = EnumSet<VehicleType>;

// ── Vehicle roles ─────────────────────────────────────────────────────────────

/// Role of a vehicle as seen by lane restrictions and the parking layer.
/// Only `PassengerCar` is handled by the trip state machine; every other role
/// bypasses it.
#[derive(EnumSetType, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExtVehicleType {
    PassengerCar,
    Bus,
    Taxi,
    CargoTruck,
    Service,
    Emergency,
    Bicycle,
}

pub type ExtVehicleTypes = EnumSet<ExtVehicleType>;

// ── Transport mode ────────────────────────────────────────────────────────────

/// Modes a citizen has used on the current trip.
#[derive(EnumSetType, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransportFlag {
    Car,
    PublicTransport,
}

/// Set of [`TransportFlag`]s; the empty set is "none".
pub type ExtTransportMode = EnumSet<TransportFlag>;

impl TransportFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportFlag::Car             => "car",
            TransportFlag::PublicTransport => "public transport",
        }
    }
}

impl std::fmt::Display for TransportFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
