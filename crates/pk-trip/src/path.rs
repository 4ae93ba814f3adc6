//! The path-finding collaborator.
//!
//! Path-finding runs outside this workspace.  The trip layer only submits
//! requests, polls their state once per tick, reads a finished path's
//! summary and releases handles it no longer needs.  There is no
//! cancellation: abandoning a request means releasing its handle.

use rustc_hash::FxHashMap;
use tracing::trace;

use pk_core::{LaneType, LaneTypes, PathId, Vec3, VehicleType, VehicleTypes};
use pk_spatial::PathPosition;

/// State of one path request as the engine reports it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathState {
    /// No request, or the engine forgot it.
    #[default]
    None,
    Calculating,
    Failed,
    Ready,
}

/// What to search for.
#[derive(Clone, Debug, PartialEq)]
pub struct PathRequest {
    pub start:          Vec3,
    pub end:            Vec3,
    /// Exact start position; `None` lets the engine snap `start`.
    pub start_position: Option<PathPosition>,
    /// Exact end position; `None` lets the engine snap `end`.
    pub end_position:   Option<PathPosition>,
    pub lane_types:     LaneTypes,
    pub vehicle_types:  VehicleTypes,
}

impl PathRequest {
    /// Sidewalks only.
    pub fn walking(start: Vec3, end: Vec3) -> Self {
        Self {
            start,
            end,
            start_position: None,
            end_position: None,
            lane_types: LaneType::Pedestrian.into(),
            vehicle_types: VehicleTypes::empty(),
        }
    }

    /// Sidewalks plus car lanes.
    pub fn driving(start: Vec3, end: Vec3) -> Self {
        Self {
            lane_types: LaneType::Pedestrian | LaneType::Vehicle,
            vehicle_types: VehicleType::Car.into(),
            ..Self::walking(start, end)
        }
    }

    /// Also allow public transport lanes.
    pub fn with_public_transport(mut self) -> Self {
        self.lane_types.insert(LaneType::PublicTransport);
        self
    }

    pub fn with_end_position(mut self, pos: Option<PathPosition>) -> Self {
        self.end_position = pos;
        self
    }
}

/// Shape of a finished path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathSummary {
    /// Union of the lane types the path runs on.
    pub lane_types:    LaneTypes,
    /// Union of the vehicle types of those lanes.
    pub vehicle_types: VehicleTypes,
    pub positions:     Vec<PathPosition>,
}

impl PathSummary {
    #[inline]
    pub fn first_position(&self) -> Option<PathPosition> {
        self.positions.first().copied()
    }

    #[inline]
    pub fn uses_public_transport(&self) -> bool {
        self.lane_types.contains(LaneType::PublicTransport)
    }

    /// Runs on a car-carrying vehicle lane somewhere.
    #[inline]
    pub fn uses_car(&self) -> bool {
        !self.lane_types.is_disjoint(LaneType::Vehicle | LaneType::TransportVehicle)
            && self.vehicle_types.contains(VehicleType::Car)
    }

    /// `true` once a walker whose next position index is `index` has run
    /// off the end of the path.  `255` means "not started".
    #[inline]
    pub fn is_complete_at(&self, index: u8) -> bool {
        index != u8::MAX && (index >> 1) as usize >= self.positions.len()
    }
}

// ── PathFinder trait ──────────────────────────────────────────────────────────

/// Asynchronous path-finding engine.
///
/// # Thread safety
///
/// `poll` and `summary` take `&self` and the trait requires `Send + Sync`,
/// so a tick may poll many handles in parallel.
pub trait PathFinder: Send + Sync {
    /// Queue a request.  `None` when the engine has no free handle.
    fn submit(&mut self, request: PathRequest) -> Option<PathId>;

    fn poll(&self, path: PathId) -> PathState;

    /// Shape of a `Ready` path.
    fn summary(&self, path: PathId) -> Option<PathSummary>;

    /// Give a handle back.  Releasing an unknown handle is a no-op.
    fn release(&mut self, path: PathId);
}

// ── ScriptedPathFinder ────────────────────────────────────────────────────────

struct ScriptedPath {
    request: PathRequest,
    state:   PathState,
    summary: Option<PathSummary>,
}

/// In-memory engine whose results are set by hand.
///
/// Every submitted request starts `Calculating`; callers finish it with
/// [`complete`](Self::complete) or [`fail`](Self::fail).
#[derive(Default)]
pub struct ScriptedPathFinder {
    paths:    FxHashMap<PathId, ScriptedPath>,
    next:     u32,
    capacity: Option<usize>,
    released: Vec<PathId>,
}

impl ScriptedPathFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse submissions once `capacity` handles are live.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { capacity: Some(capacity), ..Self::default() }
    }

    /// Register a handle directly, bypassing `submit`.
    pub fn insert(&mut self, state: PathState, summary: Option<PathSummary>) -> PathId {
        let id = self.next_id();
        let request = PathRequest::walking(Vec3::ZERO, Vec3::ZERO);
        self.paths.insert(id, ScriptedPath { request, state, summary });
        id
    }

    pub fn complete(&mut self, path: PathId, summary: PathSummary) {
        if let Some(p) = self.paths.get_mut(&path) {
            p.state = PathState::Ready;
            p.summary = Some(summary);
        }
    }

    pub fn fail(&mut self, path: PathId) {
        if let Some(p) = self.paths.get_mut(&path) {
            p.state = PathState::Failed;
            p.summary = None;
        }
    }

    pub fn request(&self, path: PathId) -> Option<&PathRequest> {
        self.paths.get(&path).map(|p| &p.request)
    }

    pub fn live_count(&self) -> usize {
        self.paths.len()
    }

    pub fn is_released(&self, path: PathId) -> bool {
        self.released.contains(&path)
    }

    fn next_id(&mut self) -> PathId {
        self.next += 1;
        PathId(self.next)
    }
}

impl PathFinder for ScriptedPathFinder {
    fn submit(&mut self, request: PathRequest) -> Option<PathId> {
        if self.capacity.is_some_and(|cap| self.paths.len() >= cap) {
            trace!("scripted path finder is full");
            return None;
        }
        let id = self.next_id();
        self.paths.insert(id, ScriptedPath { request, state: PathState::Calculating, summary: None });
        Some(id)
    }

    fn poll(&self, path: PathId) -> PathState {
        self.paths.get(&path).map_or(PathState::None, |p| p.state)
    }

    fn summary(&self, path: PathId) -> Option<PathSummary> {
        self.paths.get(&path).filter(|p| p.state == PathState::Ready)?.summary.clone()
    }

    fn release(&mut self, path: PathId) {
        if self.paths.remove(&path).is_some() {
            self.released.push(path);
        }
    }
}
