//! Strongly typed identifier wrappers.
//!
//! Two families live here:
//!
//! - **Static ids** (`SegmentId`, `BuildingId`, `PathId`) index records that
//!   are never recycled while the simulation runs.  They wrap a bare `u32`.
//! - **Pool ids** (`CitizenId`, `CitizenInstanceId`, `VehicleId`,
//!   `ParkedVehicleId`) index slots of a recycling arena.  They carry a
//!   generation counter next to the slot index so a handle kept past its
//!   record's release is rejected instead of silently aliasing the slot's
//!   next occupant.

use std::fmt;
use std::hash::Hash;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

/// Implemented by every generational pool id so arenas can be generic over
/// the key type.
pub trait PoolId: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static {
    fn from_parts(slot: u32, generation: u32) -> Self;
    fn slot(self) -> u32;
    fn generation(self) -> u32;
}

/// Generate a `(slot, generation)` handle for a recycling pool.
macro_rules! pool_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name {
            pub slot:       u32,
            pub generation: u32,
        }

        impl $name {
            /// Sentinel meaning "no record".
            pub const INVALID: $name = $name { slot: u32::MAX, generation: u32::MAX };

            #[inline(always)]
            pub const fn new(slot: u32, generation: u32) -> Self {
                Self { slot, generation }
            }

            #[inline(always)]
            pub fn index(self) -> usize {
                self.slot as usize
            }

            #[inline(always)]
            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl Default for $name {
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}v{})", stringify!($name), self.slot, self.generation)
            }
        }

        impl PoolId for $name {
            #[inline(always)]
            fn from_parts(slot: u32, generation: u32) -> Self {
                Self { slot, generation }
            }

            #[inline(always)]
            fn slot(self) -> u32 {
                self.slot
            }

            #[inline(always)]
            fn generation(self) -> u32 {
                self.generation
            }
        }
    };
}

typed_id! {
    /// Index of a road segment in the network.
    pub struct SegmentId(u32);
}

typed_id! {
    /// Index of a building.
    pub struct BuildingId(u32);
}

typed_id! {
    /// Opaque handle of a path-finding request issued to the external engine.
    pub struct PathId(u32);
}

pool_id! {
    /// A resident or tourist, independent of whether they are currently
    /// simulated as a pedestrian.
    pub struct CitizenId;
}

pool_id! {
    /// A live pedestrian instance of a citizen.
    pub struct CitizenInstanceId;
}

pool_id! {
    /// A live, moving vehicle.
    pub struct VehicleId;
}

pool_id! {
    /// A vehicle standing in a parking space.
    pub struct ParkedVehicleId;
}
