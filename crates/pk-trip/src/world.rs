//! Everything a trip decision reads or writes, in one place.

use pk_agent::AgentPools;
use pk_core::SimRng;
use pk_parking::SearchWorld;
use pk_spatial::{BuildingStore, RoadNetwork};

use crate::state::ExtStore;

/// The simulated world as the trip layer sees it.  Fields are public so
/// callers can borrow them disjointly.
pub struct World {
    pub network:   RoadNetwork,
    pub buildings: BuildingStore,
    pub agents:    AgentPools,
    pub ext:       ExtStore,
    pub rng:       SimRng,
}

impl World {
    pub fn new(network: RoadNetwork, buildings: BuildingStore, agents: AgentPools, seed: u64) -> Self {
        Self { network, buildings, agents, ext: ExtStore::new(), rng: SimRng::new(seed) }
    }

    /// Read-only search view plus the randomizer, borrowed together.
    #[inline]
    pub fn search_parts(&mut self) -> (SearchWorld<'_>, &mut SimRng) {
        let view = SearchWorld {
            network: &self.network,
            buildings: &self.buildings,
            parked: &self.agents.parked,
        };
        (view, &mut self.rng)
    }

    #[inline]
    pub fn search_view(&self) -> SearchWorld<'_> {
        SearchWorld { network: &self.network, buildings: &self.buildings, parked: &self.agents.parked }
    }
}
