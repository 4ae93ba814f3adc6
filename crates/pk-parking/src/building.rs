//! Parking lots attached to buildings.

use pk_agent::{ParkedVehicleRegistry, VehicleInfo};
use pk_core::{ParkedVehicleId, SimRng, Vec3};
use pk_spatial::{Building, ParkingSpot};

/// Nothing is ever this far away; the starting minimum of a lot scan.
pub(crate) const NO_SPOT_DISTANCE: f32 = 9999.0;

/// Closest free spot on `building`'s lot that fits `info`, with its distance
/// to `ref_pos`.
///
/// With `randomize`, the scan may stop early at a spot already within
/// `max_distance` when the `selection_rand` roll comes up zero.
pub(crate) fn closest_free_spot<'b>(
    building:       &'b Building,
    parked:         &ParkedVehicleRegistry,
    ignore:         Option<ParkedVehicleId>,
    info:           &VehicleInfo,
    ref_pos:        Vec3,
    max_distance:   f32,
    randomize:      bool,
    selection_rand: u32,
    rng:            &mut SimRng,
) -> Option<(&'b ParkingSpot, f32)> {
    let mut min = NO_SPOT_DISTANCE;
    let mut best = None;

    for spot in &building.parking_spots {
        if !spot.fits(info.width, info.length) {
            continue;
        }
        if !parked.is_space_free(spot.position, info.length * 0.5, ignore) {
            continue;
        }
        let d = spot.position.distance(ref_pos);
        if d < min {
            min = d;
            best = Some(spot);
            if randomize && min <= max_distance && rng.int32(selection_rand) == 0 {
                break;
            }
        }
    }
    best.map(|spot| (spot, min))
}
