//! Shared test fixture: a fleet wired to the in-memory collaborators.

use std::sync::Arc;

use super::Collaborators;
use crate::models::Topology;
use crate::services::{BlockClaimLedger, CategoryProcessabilityChecker, GraphRouter, InMemoryFleet};

pub(crate) struct Fixture {
    pub fleet: Arc<InMemoryFleet>,
    pub claims: Arc<BlockClaimLedger>,
    pub collab: Collaborators,
}

impl Fixture {
    pub fn new(topology: Topology) -> Self {
        let topology = Arc::new(topology);
        let fleet = Arc::new(InMemoryFleet::new(topology.clone()));
        let claims = Arc::new(BlockClaimLedger::new(topology.clone()));
        let collab = Collaborators::new(
            fleet.clone(),
            Arc::new(GraphRouter::new(topology)),
            claims.clone(),
            Arc::new(CategoryProcessabilityChecker),
        );
        Self {
            fleet,
            claims,
            collab,
        }
    }
}
