//! Road segments, their lanes, and the segment grid.
//!
//! # Spatial indexes
//!
//! Two indexes sit over the same segments:
//!
//! - a [`LinkedGrid`] keyed by each segment's bounds centre, walked in spiral
//!   order by the roadside parking search;
//! - an R-tree (via `rstar`) over pedestrian lane polylines, used to snap an
//!   arbitrary position (a parking lot, a building door) to the nearest
//!   sidewalk.

use enumset::{EnumSet, EnumSetType};
use rstar::{AABB, PointDistance, RTree, RTreeObject};

use pk_core::{
    ExtVehicleType, ExtVehicleTypes, GridSpec, LaneType, LaneTypes, Rotation, SegmentId, Vec3,
    VehicleType, VehicleTypes,
};

use crate::{LinkedGrid, SpatialError, SpatialResult};

// ── Lanes ─────────────────────────────────────────────────────────────────────

/// Final travel direction of a lane relative to its segment.
#[derive(EnumSetType, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LaneDirection {
    Forward,
    Backward,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lane {
    pub lane_type:     LaneType,
    pub vehicle_types: VehicleTypes,
    /// Vehicle roles the lane's restrictions admit.
    pub allowed_vehicles: ExtVehicleTypes,
    pub direction:     LaneDirection,
    pub start:         Vec3,
    pub end:           Vec3,
    pub width:         f32,
}

impl Lane {
    pub fn parking(start: Vec3, end: Vec3, width: f32, direction: LaneDirection) -> Self {
        Self {
            lane_type: LaneType::Parking,
            vehicle_types: VehicleType::Car.into(),
            allowed_vehicles: EnumSet::all(),
            direction,
            start,
            end,
            width,
        }
    }

    pub fn pedestrian(start: Vec3, end: Vec3, width: f32) -> Self {
        Self {
            lane_type: LaneType::Pedestrian,
            vehicle_types: VehicleTypes::empty(),
            allowed_vehicles: ExtVehicleTypes::empty(),
            direction: LaneDirection::Forward,
            start,
            end,
            width,
        }
    }

    pub fn vehicle(start: Vec3, end: Vec3, width: f32, direction: LaneDirection) -> Self {
        Self {
            lane_type: LaneType::Vehicle,
            vehicle_types: VehicleType::Car | VehicleType::Bicycle,
            allowed_vehicles: EnumSet::all(),
            direction,
            start,
            end,
            width,
        }
    }

    /// Restrict the vehicle roles allowed on this lane.
    pub fn with_allowed(mut self, allowed: ExtVehicleTypes) -> Self {
        self.allowed_vehicles = allowed;
        self
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }

    /// Point at normalised offset `t` along the lane.
    #[inline]
    pub fn position_at(&self, t: f32) -> Vec3 {
        self.start.lerp(self.end, t.clamp(0.0, 1.0))
    }

    /// Closest point on the lane to `pos` and its normalised offset.
    #[inline]
    pub fn closest_position(&self, pos: Vec3) -> (Vec3, f32) {
        pos.project_on_segment(self.start, self.end)
    }

    /// Heading of traffic on the lane.
    pub fn heading(&self) -> Rotation {
        let along = self.end - self.start;
        match self.direction {
            LaneDirection::Forward  => Rotation::look_along(along),
            LaneDirection::Backward => Rotation::look_along(-along),
        }
    }

    /// `true` if the lane is one of `lane_types` and, when `vehicle_types`
    /// is non-empty, carries at least one of them.
    #[inline]
    pub fn matches(&self, lane_types: LaneTypes, vehicle_types: VehicleTypes) -> bool {
        lane_types.contains(self.lane_type)
            && (vehicle_types.is_empty() || !self.vehicle_types.is_disjoint(vehicle_types))
    }

    #[inline]
    pub fn admits(&self, role: ExtVehicleType) -> bool {
        self.allowed_vehicles.contains(role)
    }
}

/// A lane hit returned by [`Segment::closest_lane_position`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LanePosition {
    pub lane_index: u8,
    pub position:   Vec3,
    /// Normalised offset along the lane.
    pub offset:     f32,
}

/// A position on the network as the path-finding engine encodes it: segment,
/// lane index and an offset quantised to `0..=255`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathPosition {
    pub segment: SegmentId,
    pub lane:    u8,
    pub offset:  u8,
}

impl PathPosition {
    pub fn new(segment: SegmentId, lane: u8, offset: u8) -> Self {
        Self { segment, lane, offset }
    }

    /// Quantise a normalised offset the way path positions store it.
    #[inline]
    pub fn quantize(offset: f32) -> u8 {
        (offset * 255.0).round().clamp(0.0, 255.0) as u8
    }

    #[inline]
    pub fn offset_fraction(self) -> f32 {
        self.offset as f32 / 255.0
    }
}

// ── Segments ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    pub created:    bool,
    pub lanes:      Vec<Lane>,
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
    /// Lane directions along which parking is forbidden.
    pub parking_forbidden: EnumSet<LaneDirection>,
}

impl Segment {
    /// A created segment whose bounds enclose all lane endpoints.
    pub fn new(lanes: Vec<Lane>) -> Self {
        let mut min = Vec3::new(f32::MAX, f32::MAX, f32::MAX);
        let mut max = Vec3::new(f32::MIN, f32::MIN, f32::MIN);
        for p in lanes.iter().flat_map(|l| [l.start, l.end]) {
            min = Vec3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
            max = Vec3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
        }
        if lanes.is_empty() {
            min = Vec3::ZERO;
            max = Vec3::ZERO;
        }
        Self {
            created: true,
            lanes,
            bounds_min: min,
            bounds_max: max,
            parking_forbidden: EnumSet::empty(),
        }
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        Vec3::center_of(self.bounds_min, self.bounds_max)
    }

    #[inline]
    pub fn lane(&self, index: u8) -> Option<&Lane> {
        self.lanes.get(index as usize)
    }

    #[inline]
    pub fn is_parking_allowed(&self, direction: LaneDirection) -> bool {
        !self.parking_forbidden.contains(direction)
    }

    /// Nearest lane of the requested kind to `pos`.
    pub fn closest_lane_position(
        &self,
        pos:           Vec3,
        lane_types:    LaneTypes,
        vehicle_types: VehicleTypes,
    ) -> Option<LanePosition> {
        let mut best: Option<(f32, LanePosition)> = None;
        for (i, lane) in self.lanes.iter().enumerate() {
            if !lane.matches(lane_types, vehicle_types) {
                continue;
            }
            let (position, offset) = lane.closest_position(pos);
            let d = position.sqr_distance(pos);
            if best.is_none_or(|(bd, _)| d < bd) {
                best = Some((d, LanePosition { lane_index: i as u8, position, offset }));
            }
        }
        best.map(|(_, hit)| hit)
    }
}

// ── R-tree lane entry ─────────────────────────────────────────────────────────

/// A pedestrian lane stored in the R-tree as a 2-D `[x, z]` line segment.
#[derive(Clone)]
struct LaneEntry {
    a:       [f32; 2],
    b:       [f32; 2],
    segment: SegmentId,
    lane:    u8,
}

impl RTreeObject for LaneEntry {
    type Envelope = AABB<[f32; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.a, self.b)
    }
}

impl PointDistance for LaneEntry {
    /// Squared distance from `point` to the closest point of the line.
    fn distance_2(&self, point: &[f32; 2]) -> f32 {
        let p = Vec3::xz(point[0], point[1]);
        let (hit, _) = p.project_on_segment(Vec3::xz(self.a[0], self.a[1]), Vec3::xz(self.b[0], self.b[1]));
        hit.sqr_distance(p)
    }
}

// ── RoadNetwork ───────────────────────────────────────────────────────────────

/// All road segments plus the segment grid and sidewalk index.
///
/// Segments are never removed from the vector; releasing one clears its
/// `created` flag and unlinks it from the grid so ids stay stable.
pub struct RoadNetwork {
    segments:       Vec<Segment>,
    grid:           LinkedGrid,
    pedestrian_idx: RTree<LaneEntry>,
}

impl RoadNetwork {
    pub fn empty(spec: GridSpec) -> Self {
        RoadNetworkBuilder::new(spec).build()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segment(&self, id: SegmentId) -> SpatialResult<&Segment> {
        self.segments.get(id.index()).ok_or(SpatialError::UnknownSegment(id))
    }

    pub fn segment_mut(&mut self, id: SegmentId) -> SpatialResult<&mut Segment> {
        self.segments.get_mut(id.index()).ok_or(SpatialError::UnknownSegment(id))
    }

    pub fn segments(&self) -> impl Iterator<Item = (SegmentId, &Segment)> + '_ {
        self.segments.iter().enumerate().map(|(i, s)| (SegmentId(i as u32), s))
    }

    #[inline]
    pub fn grid(&self) -> &LinkedGrid {
        &self.grid
    }

    /// Allow or forbid parking along `direction` on a segment.
    pub fn set_parking_allowed(
        &mut self,
        id:        SegmentId,
        direction: LaneDirection,
        allowed:   bool,
    ) -> SpatialResult<()> {
        let seg = self.segment_mut(id)?;
        if allowed {
            seg.parking_forbidden.remove(direction);
        } else {
            seg.parking_forbidden.insert(direction);
        }
        Ok(())
    }

    /// Mark a segment as demolished and drop it from the segment grid.
    pub fn release_segment(&mut self, id: SegmentId) -> SpatialResult<()> {
        let center = {
            let seg = self.segment_mut(id)?;
            if !seg.created {
                return Ok(());
            }
            seg.created = false;
            seg.center()
        };
        self.grid.remove_at(id.0, center);
        Ok(())
    }

    /// World position encoded by a path position.
    pub fn resolve(&self, pos: PathPosition) -> SpatialResult<Vec3> {
        let lane = self
            .segment(pos.segment)?
            .lane(pos.lane)
            .ok_or(SpatialError::UnknownLane { segment: pos.segment, lane: pos.lane })?;
        Ok(lane.position_at(pos.offset_fraction()))
    }

    /// Nearest sidewalk position to `pos` within `max_distance`, skipping
    /// demolished segments.
    pub fn closest_pedestrian_position(
        &self,
        pos:          Vec3,
        max_distance: f32,
    ) -> Option<(PathPosition, Vec3)> {
        let max_d2 = max_distance * max_distance;
        self.pedestrian_idx
            .nearest_neighbor_iter_with_distance_2(&[pos.x, pos.z])
            .take_while(|(_, d2)| *d2 <= max_d2)
            .find(|(e, _)| self.segments[e.segment.index()].created)
            .and_then(|(e, _)| {
                let lane = self.segments[e.segment.index()].lane(e.lane)?;
                let (hit, offset) = lane.closest_position(pos);
                Some((PathPosition::new(e.segment, e.lane, PathPosition::quantize(offset)), hit))
            })
    }
}

// ── RoadNetworkBuilder ────────────────────────────────────────────────────────

/// Construct a [`RoadNetwork`] incrementally, then call [`build`](Self::build).
///
/// # Example
///
/// ```
/// use pk_core::{GridSpec, Vec3};
/// use pk_spatial::RoadNetworkBuilder;
///
/// let mut b = RoadNetworkBuilder::new(GridSpec::SEGMENTS);
/// let s = b.add_street(Vec3::xz(0.0, 0.0), Vec3::xz(100.0, 0.0));
/// let net = b.build();
/// assert_eq!(net.segment_count(), 1);
/// assert_eq!(net.segment(s).unwrap().lanes.len(), 6);
/// ```
pub struct RoadNetworkBuilder {
    spec:     GridSpec,
    segments: Vec<Segment>,
}

/// Lateral offsets of the lanes `add_street` lays out, right of centre.
const SIDEWALK_OFFSET: f32 = 8.0;
const PARKING_OFFSET:  f32 = 5.0;
const DRIVING_OFFSET:  f32 = 2.0;

impl RoadNetworkBuilder {
    pub fn new(spec: GridSpec) -> Self {
        Self { spec, segments: Vec::new() }
    }

    pub fn add_segment(&mut self, segment: Segment) -> SegmentId {
        let id = SegmentId(self.segments.len() as u32);
        self.segments.push(segment);
        id
    }

    /// Two-way street from `a` to `b`: per side one sidewalk, one parking
    /// lane and one driving lane.  Lane order is
    /// `[sidewalk R, parking R, driving R, driving L, parking L, sidewalk L]`.
    pub fn add_street(&mut self, a: Vec3, b: Vec3) -> SegmentId {
        let right = Rotation::look_along(b - a).right();
        let side = |d: f32| (a + right * d, b + right * d);

        let (sr0, sr1) = side(SIDEWALK_OFFSET);
        let (pr0, pr1) = side(PARKING_OFFSET);
        let (dr0, dr1) = side(DRIVING_OFFSET);
        let (dl0, dl1) = side(-DRIVING_OFFSET);
        let (pl0, pl1) = side(-PARKING_OFFSET);
        let (sl0, sl1) = side(-SIDEWALK_OFFSET);

        self.add_segment(Segment::new(vec![
            Lane::pedestrian(sr0, sr1, 3.0),
            Lane::parking(pr0, pr1, 2.5, LaneDirection::Forward),
            Lane::vehicle(dr0, dr1, 3.0, LaneDirection::Forward),
            Lane::vehicle(dl0, dl1, 3.0, LaneDirection::Backward),
            Lane::parking(pl0, pl1, 2.5, LaneDirection::Backward),
            Lane::pedestrian(sl0, sl1, 3.0),
        ]))
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Link segments into the grid and bulk-load the sidewalk R-tree.
    pub fn build(self) -> RoadNetwork {
        let mut grid = LinkedGrid::with_slots(self.spec, self.segments.len());
        let mut entries = Vec::new();

        for (i, seg) in self.segments.iter().enumerate() {
            let id = SegmentId(i as u32);
            if seg.created {
                grid.insert_at(id.0, seg.center());
            }
            for (li, lane) in seg.lanes.iter().enumerate() {
                if lane.lane_type == LaneType::Pedestrian {
                    entries.push(LaneEntry {
                        a: [lane.start.x, lane.start.z],
                        b: [lane.end.x, lane.end.z],
                        segment: id,
                        lane: li as u8,
                    });
                }
            }
        }

        RoadNetwork {
            segments: self.segments,
            grid,
            pedestrian_idx: RTree::bulk_load(entries),
        }
    }
}
