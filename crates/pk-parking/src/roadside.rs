//! Slot search along a parking lane.
//!
//! A lane of length `L` is cut into `floor(L / (length + gap))` slots.  The
//! search starts at the slot nearest to the requested point and works outward
//! until it finds one whose centre is clear of every parked vehicle by half
//! the summed lengths.

use pk_agent::ParkedVehicleRegistry;
use pk_core::{ParkedVehicleId, Rotation, Vec3};
use pk_spatial::Lane;

/// Clearance between consecutive parking slots.
const PARKING_GAP: f32 = 1.0;

/// A free slot on `lane` for a `width` × `length` footprint, nearest to
/// `near`.  Returns the slot centre, the lane heading and the normalised
/// offset of the slot.
pub(crate) fn find_slot_on_lane(
    lane:   &Lane,
    parked: &ParkedVehicleRegistry,
    ignore: Option<ParkedVehicleId>,
    near:   Vec3,
    width:  f32,
    length: f32,
) -> Option<(Vec3, Rotation, f32)> {
    if lane.width < width {
        return None;
    }
    let lane_len = lane.length();
    let pitch = length + PARKING_GAP;
    let slots = (lane_len / pitch) as u32;
    if slots == 0 {
        return None;
    }

    let (_, t) = lane.closest_position(near);
    let along = t * lane_len;
    let centre = |k: u32| (k as f32 + 0.5) * pitch;

    let mut order: Vec<u32> = (0..slots).collect();
    order.sort_by(|&a, &b| (centre(a) - along).abs().total_cmp(&(centre(b) - along).abs()));

    order.into_iter().find_map(|k| {
        let offset = centre(k) / lane_len;
        let pos = lane.position_at(offset);
        slot_is_free(parked, ignore, pos, length).then(|| (pos, lane.heading(), offset))
    })
}

fn slot_is_free(parked: &ParkedVehicleRegistry, ignore: Option<ParkedVehicleId>, pos: Vec3, length: f32) -> bool {
    parked
        .ids_near(pos, length * 2.0)
        .into_iter()
        .filter(|&id| Some(id) != ignore)
        .all(|id| {
            parked
                .get(id)
                .is_none_or(|p| p.position.distance(pos) >= (length + p.info.length) * 0.5)
        })
}
