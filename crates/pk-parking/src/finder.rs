//! Parking-space search over the segment and building grids.
//!
//! # Search shape
//!
//! Both searches start from the grid cell containing the reference point and
//! walk [`spiral_coords`](pk_spatial::spiral_coords) offsets out to a radius
//! whose square of cells covers `max_distance`.  Every visited cell's linked
//! list is scanned; out-of-range cells are skipped and corrupt lists are
//! truncated by the grid itself.
//!
//! The first accepted candidate ends the scan, except that in randomized
//! mode a `vicinity_parking_space_selection_rand` roll of zero keeps it going
//! to look for a closer one.

use tracing::trace;

use pk_agent::{ParkedVehicleRegistry, VehicleInfo};
use pk_core::{
    BuildingId, ExtVehicleType, LaneType, ParkedVehicleId, ParkingConfig, SegmentId, SimRng, Vec3,
    VehicleType, VehicleTypes,
};
use pk_spatial::{BuildingStore, PathPosition, RoadNetwork, SpiralCache};

use crate::building::closest_free_spot;
use crate::roadside::find_slot_on_lane;
use crate::{CitizenParkingPlan, CitizenParkingRequest, ParkingSpace, ParkingSpaceLocation};

/// Read-only view of everything a search looks at.
#[derive(Copy, Clone)]
pub struct SearchWorld<'a> {
    pub network:   &'a RoadNetwork,
    pub buildings: &'a BuildingStore,
    pub parked:    &'a ParkedVehicleRegistry,
}

pub struct ParkingSpaceFinder {
    config: ParkingConfig,
    spiral: SpiralCache,
}

impl ParkingSpaceFinder {
    pub fn new(config: ParkingConfig) -> Self {
        Self { config, spiral: SpiralCache::new() }
    }

    #[inline]
    pub fn config(&self) -> &ParkingConfig {
        &self.config
    }

    // ── Vicinity ──────────────────────────────────────────────────────────

    /// Best roadside or building space near `target`.
    ///
    /// Both searches run from `target + search_dir × vicinity_search_offset`.
    /// When both succeed the roadside space wins only if it is strictly
    /// closer to `target` and a `vicinity_parking_space_selection_rand` roll
    /// is non-zero.
    pub fn find_parking_space_in_vicinity(
        &mut self,
        world:        SearchWorld<'_>,
        rng:          &mut SimRng,
        target:       Vec3,
        search_dir:   Vec3,
        info:         &VehicleInfo,
        home:         BuildingId,
        max_distance: f32,
    ) -> Option<ParkingSpace> {
        let ref_pos = target + search_dir * self.config.vicinity_search_offset;

        let road = self.road_side_search(world, rng, None, ref_pos, info.width, info.length, max_distance, true);
        let building = self.building_search(world, rng, info, home, None, None, ref_pos, max_distance, max_distance, true);

        let chosen = match (road, building) {
            (Some(r), Some(b)) => {
                let road_closer = r.position.distance(target) < b.position.distance(target);
                if road_closer && rng.int32(self.config.vicinity_parking_space_selection_rand) != 0 {
                    Some(r)
                } else {
                    Some(b)
                }
            }
            (r, b) => r.or(b),
        };

        match chosen {
            Some(space) => trace!(location = ?space.location, position = %space.position, "vicinity parking space found"),
            None => trace!(%target, "no roadside or building parking space in vicinity"),
        }
        chosen
    }

    /// Deterministic roadside search (no "keep scanning" rolls).
    pub fn find_parking_space_road_side(
        &mut self,
        world:        SearchWorld<'_>,
        rng:          &mut SimRng,
        ignore:       Option<ParkedVehicleId>,
        ref_pos:      Vec3,
        width:        f32,
        length:       f32,
        max_distance: f32,
    ) -> Option<ParkingSpace> {
        self.road_side_search(world, rng, ignore, ref_pos, width, length, max_distance, false)
    }

    /// Deterministic building search (no "keep scanning" rolls).
    #[allow(clippy::too_many_arguments)]
    pub fn find_parking_space_building(
        &mut self,
        world:                   SearchWorld<'_>,
        rng:                     &mut SimRng,
        info:                    &VehicleInfo,
        home:                    BuildingId,
        ignore:                  Option<ParkedVehicleId>,
        segment:                 Option<SegmentId>,
        ref_pos:                 Vec3,
        max_building_distance:   f32,
        max_space_distance:      f32,
    ) -> Option<ParkingSpace> {
        self.building_search(
            world, rng, info, home, ignore, segment, ref_pos, max_building_distance, max_space_distance, false,
        )
    }

    // ── Roadside ──────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn road_side_search(
        &mut self,
        world:        SearchWorld<'_>,
        rng:          &mut SimRng,
        ignore:       Option<ParkedVehicleId>,
        ref_pos:      Vec3,
        width:        f32,
        length:       f32,
        max_distance: f32,
        randomize:    bool,
    ) -> Option<ParkingSpace> {
        let spec = world.network.grid().spec();
        let (ci, cj) = spec.cell_of(ref_pos.x, ref_pos.z);
        let radius = spec.search_radius(max_distance);
        let position_rand = self.config.parking_space_position_rand;
        let selection_rand = self.config.vicinity_parking_space_selection_rand;

        let mut found: Option<ParkingSpace> = None;
        let mut best_distance = f32::MAX;

        'spiral: for &(di, dj) in self.spiral.coords(radius) {
            for slot in world.network.grid().cell(ci + di, cj + dj) {
                let id = SegmentId(slot);
                let Ok(segment) = world.network.segment(id) else {
                    continue;
                };
                if !segment.created {
                    continue;
                }

                let mut sample = segment.center();
                sample.x += rng.jitter(position_rand);
                sample.z += rng.jitter(position_rand);

                let Some(hit) = segment.closest_lane_position(sample, LaneType::Parking.into(), VehicleType::Car.into())
                else {
                    continue;
                };
                let Some(lane) = segment.lane(hit.lane_index) else {
                    continue;
                };
                if !segment.is_parking_allowed(lane.direction) {
                    trace!(%id, lane = hit.lane_index, "parking forbidden in lane direction");
                    continue;
                }
                if !lane.admits(ExtVehicleType::PassengerCar) {
                    trace!(%id, lane = hit.lane_index, "lane does not admit passenger cars");
                    continue;
                }
                let Some((position, rotation, offset)) =
                    find_slot_on_lane(lane, world.parked, ignore, hit.position, width, length)
                else {
                    continue;
                };

                let d = position.distance(ref_pos);
                if d > max_distance || d >= best_distance {
                    continue;
                }
                best_distance = d;
                found = Some(ParkingSpace {
                    location: ParkingSpaceLocation::RoadSide(id),
                    position,
                    rotation,
                    lane_offset: Some(offset),
                });
                trace!(%id, %position, "roadside parking space found");

                if !randomize || rng.int32(selection_rand) != 0 {
                    break 'spiral;
                }
            }
        }
        found
    }

    /// Single-segment roadside search near a vehicle's position.  Returns the
    /// space and the parking lane index.
    pub fn find_parking_space_road_side_for_vehicle_pos(
        &self,
        world:   SearchWorld<'_>,
        info:    &VehicleInfo,
        ignore:  Option<ParkedVehicleId>,
        segment: SegmentId,
        ref_pos: Vec3,
    ) -> Option<(ParkingSpace, u8)> {
        let seg = world.network.segment(segment).ok().filter(|s| s.created)?;
        let hit = seg.closest_lane_position(ref_pos, LaneType::Parking.into(), VehicleType::Car.into())?;
        let lane = seg.lane(hit.lane_index)?;
        if !seg.is_parking_allowed(lane.direction) {
            return None;
        }
        let (position, rotation, offset) =
            find_slot_on_lane(lane, world.parked, ignore, hit.position, info.width, info.length)?;
        let space = ParkingSpace {
            location: ParkingSpaceLocation::RoadSide(segment),
            position,
            rotation,
            lane_offset: Some(offset),
        };
        Some((space, hit.lane_index))
    }

    // ── Buildings ─────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn building_search(
        &mut self,
        world:                 SearchWorld<'_>,
        rng:                   &mut SimRng,
        info:                  &VehicleInfo,
        home:                  BuildingId,
        ignore:                Option<ParkedVehicleId>,
        segment:               Option<SegmentId>,
        ref_pos:               Vec3,
        max_building_distance: f32,
        max_space_distance:    f32,
        randomize:             bool,
    ) -> Option<ParkingSpace> {
        let spec = world.buildings.grid().spec();
        let (ci, cj) = spec.cell_of(ref_pos.x, ref_pos.z);
        let radius = spec.search_radius(max_building_distance);
        let selection_rand = self.config.vicinity_parking_space_selection_rand;
        let mut max_space_distance = max_space_distance;
        let mut found = None;

        'spiral: for &(di, dj) in self.spiral.coords(radius) {
            for slot in world.buildings.grid().cell(ci + di, cj + dj) {
                let id = BuildingId(slot);
                let hit = Self::prop_at_building(
                    &self.config, world, rng, info, home, ignore, id, segment, ref_pos,
                    &mut max_space_distance, randomize,
                );
                if let Some(space) = hit {
                    found = Some(space);
                    if !randomize || rng.int32(selection_rand) != 0 {
                        break 'spiral;
                    }
                }
            }
        }
        found
    }

    /// Closest admissible spot on one building's lot within `max_distance`.
    /// On success `max_distance` shrinks to the spot's distance so later
    /// candidates must be closer.
    #[allow(clippy::too_many_arguments)]
    pub fn find_parking_space_prop_at_building(
        &self,
        world:        SearchWorld<'_>,
        rng:          &mut SimRng,
        info:         &VehicleInfo,
        home:         BuildingId,
        ignore:       Option<ParkedVehicleId>,
        building:     BuildingId,
        segment:      Option<SegmentId>,
        ref_pos:      Vec3,
        max_distance: &mut f32,
        randomize:    bool,
    ) -> Option<ParkingSpace> {
        Self::prop_at_building(
            &self.config, world, rng, info, home, ignore, building, segment, ref_pos, max_distance, randomize,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn prop_at_building(
        config:       &ParkingConfig,
        world:        SearchWorld<'_>,
        rng:          &mut SimRng,
        info:         &VehicleInfo,
        home:         BuildingId,
        ignore:       Option<ParkedVehicleId>,
        id:           BuildingId,
        segment:      Option<SegmentId>,
        ref_pos:      Vec3,
        max_distance: &mut f32,
        randomize:    bool,
    ) -> Option<ParkingSpace> {
        let building = world.buildings.get(id).ok()?;
        if !building.is_operational() {
            trace!(%id, flags = ?building.flags, "refusing to park at building");
            return None;
        }
        if building.is_residential() && id != home && rng.int32(config.reckless_driver_modulo) != 0 {
            return None;
        }

        let (spot, distance) = closest_free_spot(
            building,
            world.parked,
            ignore,
            info,
            ref_pos,
            *max_distance,
            randomize,
            config.vicinity_parking_space_selection_rand,
            rng,
        )?;
        if distance > *max_distance {
            trace!(%id, distance, max = *max_distance, "building parking space out of range");
            return None;
        }
        *max_distance = distance;

        let lane_offset = segment
            .and_then(|s| world.network.segment(s).ok())
            .and_then(|seg| {
                seg.closest_lane_position(building.unspawn_position, LaneType::Pedestrian.into(), VehicleTypes::empty())
            })
            .map(|hit| hit.offset);

        Some(ParkingSpace {
            location: ParkingSpaceLocation::Building(id),
            position: spot.position,
            rotation: spot.rotation,
            lane_offset,
        })
    }

    // ── Citizens ──────────────────────────────────────────────────────────

    /// Nearest sidewalk position within `max_building_to_pedestrian_lane_distance`.
    pub fn find_pedestrian_path_position(&self, world: SearchWorld<'_>, pos: Vec3) -> Option<PathPosition> {
        world
            .network
            .closest_pedestrian_position(pos, self.config.max_building_to_pedestrian_lane_distance)
            .map(|(path_pos, _)| path_pos)
    }

    /// Pick a parking space near `request.end_pos` before a car path is
    /// requested.
    ///
    /// `location` receives the search outcome even when no usable plan comes
    /// out of it; it is left alone when the tourist gate refuses the request.
    pub fn find_parking_space_for_citizen(
        &mut self,
        world:    SearchWorld<'_>,
        rng:      &mut SimRng,
        request:  &CitizenParkingRequest,
        location: &mut ParkingSpaceLocation,
    ) -> Option<CitizenParkingPlan> {
        if !request.allow_tourists && request.tourist {
            return None;
        }
        let max_distance = if request.going_home {
            self.config.max_parked_car_distance_to_home
        } else {
            self.config.max_parked_car_distance_to_building
        };

        let found = self.find_parking_space_in_vicinity(
            world,
            rng,
            request.end_pos,
            Vec3::ZERO,
            &request.info,
            request.home,
            max_distance,
        );
        *location = found.map_or(ParkingSpaceLocation::None, |s| s.location);
        let space = found?;

        match space.location {
            ParkingSpaceLocation::RoadSide(segment) => {
                let seg = world.network.segment(segment).ok()?;
                let sidewalk =
                    seg.closest_lane_position(space.position, LaneType::Pedestrian.into(), VehicleTypes::empty())?;
                let offset = (space.lane_offset.unwrap_or(0.0).clamp(0.0, 1.0) * 255.0) as u8;
                Some(CitizenParkingPlan {
                    space,
                    end_path_position: Some(PathPosition::new(segment, sidewalk.lane_index, offset)),
                })
            }
            ParkingSpaceLocation::Building(_) => Some(CitizenParkingPlan {
                space,
                end_path_position: self.find_pedestrian_path_position(world, space.position),
            }),
            ParkingSpaceLocation::None => None,
        }
    }
}
