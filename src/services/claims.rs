//! Resource claims.
//!
//! The claim service is the only authority on who holds which resource.
//! Claims are granted or denied immediately; a denied request is queued
//! and re-evaluated, first come first served, whenever resources are
//! released.
//!
//! # Exclusivity rules
//!
//! - A resource has at most one holder.
//! - A `SingleVehicleOnly` block admits one vehicle across all members.
//! - A `SameDirectionOnly` block admits several vehicles only if every
//!   occupant's claim carries the same heading label.
//!
//! A resource in several blocks must satisfy all of them.

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::models::{BlockType, Topology};

/// A request to hold a set of resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimRequest {
    /// Requesting vehicle.
    pub vehicle: String,
    /// Resources to hold.
    pub resources: BTreeSet<String>,
    /// Travel direction label checked against `SameDirectionOnly` blocks.
    pub heading: Option<String>,
}

impl ClaimRequest {
    /// Creates a request without heading.
    pub fn new<I, S>(vehicle: impl Into<String>, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vehicle: vehicle.into(),
            resources: resources.into_iter().map(Into::into).collect(),
            heading: None,
        }
    }

    /// Sets the heading label.
    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = Some(heading.into());
        self
    }

    /// Sets an optional heading label.
    pub fn with_heading_opt(mut self, heading: Option<String>) -> Self {
        self.heading = heading;
        self
    }
}

/// Result of a claim attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// All resources are now held by the requester.
    Granted,
    /// Nothing was granted.
    Denied {
        /// Why the request could not be granted.
        conflicts: Vec<ClaimConflict>,
    },
}

impl ClaimOutcome {
    /// Whether the claim was granted.
    pub fn is_granted(&self) -> bool {
        matches!(self, ClaimOutcome::Granted)
    }
}

/// Reason a claim was denied.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ClaimConflict {
    /// The resource is not part of the topology.
    UnknownResource(String),
    /// Another vehicle holds the resource.
    ResourceHeld { resource: String, holder: String },
    /// Another vehicle occupies a `SingleVehicleOnly` block.
    BlockOccupied { block: String, occupant: String },
    /// Another vehicle occupies a `SameDirectionOnly` block with a different heading.
    OpposingDirection { block: String, occupant: String },
}

/// Grants and tracks resource claims.
pub trait ClaimService: Send + Sync {
    /// Attempts to hold all requested resources at once. Never blocks.
    fn try_claim(&self, request: ClaimRequest) -> ClaimOutcome;

    /// Releases resources held by `vehicle`.
    ///
    /// Returns the queued requests that were granted as a consequence.
    fn release(&self, vehicle: &str, resources: &BTreeSet<String>) -> Vec<ClaimRequest>;

    /// Releases everything held by `vehicle` and drops its queued requests.
    fn release_all(&self, vehicle: &str) -> Vec<ClaimRequest>;

    /// Current holder of `resource`.
    fn holder(&self, resource: &str) -> Option<String>;

    /// Resources currently held by `vehicle`.
    fn claimed_by(&self, vehicle: &str) -> BTreeSet<String>;

    /// Whether `resource` is unheld or held by `vehicle` itself.
    fn is_free_for(&self, resource: &str, vehicle: &str) -> bool {
        self.holder(resource).map_or(true, |h| h == vehicle)
    }
}

#[derive(Debug, Clone)]
struct Holding {
    vehicle: String,
    heading: Option<String>,
}

#[derive(Debug, Default)]
struct LedgerState {
    holdings: HashMap<String, Holding>,
    waiting: VecDeque<ClaimRequest>,
}

/// In-memory claim service enforcing block exclusivity.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use u_fleet::models::{Block, Resource, Topology};
/// use u_fleet::services::{BlockClaimLedger, ClaimRequest, ClaimService};
///
/// let topology = Topology::new()
///     .with_resource(Resource::halt("A"))
///     .with_resource(Resource::halt("B"))
///     .with_block(Block::new("X").with_members(["A", "B"]));
/// let ledger = BlockClaimLedger::new(Arc::new(topology));
///
/// assert!(ledger.try_claim(ClaimRequest::new("V1", ["A"])).is_granted());
/// assert!(!ledger.try_claim(ClaimRequest::new("V2", ["B"])).is_granted());
/// ```
#[derive(Debug)]
pub struct BlockClaimLedger {
    topology: Arc<Topology>,
    state: Mutex<LedgerState>,
}

impl BlockClaimLedger {
    /// Creates an empty ledger over `topology`.
    pub fn new(topology: Arc<Topology>) -> Self {
        Self {
            topology,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Vehicles (with heading) holding members of `block`, sorted by vehicle.
    pub fn occupants(&self, block: &str) -> Vec<(String, Option<String>)> {
        let Some(block) = self.topology.block(block) else {
            return Vec::new();
        };
        let state = self.state.lock();
        let mut occupants: Vec<(String, Option<String>)> = block
            .members()
            .iter()
            .filter_map(|m| state.holdings.get(m))
            .map(|h| (h.vehicle.clone(), h.heading.clone()))
            .collect();
        occupants.sort();
        occupants.dedup();
        occupants
    }

    /// Number of queued requests.
    pub fn waiting_count(&self) -> usize {
        self.state.lock().waiting.len()
    }

    fn conflicts(&self, state: &LedgerState, request: &ClaimRequest) -> Vec<ClaimConflict> {
        let mut conflicts = BTreeSet::new();
        let mut blocks = BTreeSet::new();

        for resource in &request.resources {
            if self.topology.resource(resource).is_none() {
                conflicts.insert(ClaimConflict::UnknownResource(resource.clone()));
                continue;
            }
            if let Some(h) = state.holdings.get(resource) {
                if h.vehicle != request.vehicle {
                    conflicts.insert(ClaimConflict::ResourceHeld {
                        resource: resource.clone(),
                        holder: h.vehicle.clone(),
                    });
                }
            }
            blocks.extend(self.topology.blocks_of(resource).map(|b| b.name()));
        }

        for name in blocks {
            let Some(block) = self.topology.block(name) else {
                continue;
            };
            for member in block.members() {
                let Some(h) = state.holdings.get(member) else {
                    continue;
                };
                if h.vehicle == request.vehicle {
                    continue;
                }
                match block.block_type() {
                    BlockType::SingleVehicleOnly => {
                        conflicts.insert(ClaimConflict::BlockOccupied {
                            block: name.to_string(),
                            occupant: h.vehicle.clone(),
                        });
                    }
                    BlockType::SameDirectionOnly => {
                        let same = match (&h.heading, &request.heading) {
                            (Some(a), Some(b)) => a == b,
                            _ => false,
                        };
                        if !same {
                            conflicts.insert(ClaimConflict::OpposingDirection {
                                block: name.to_string(),
                                occupant: h.vehicle.clone(),
                            });
                        }
                    }
                }
            }
        }

        conflicts.into_iter().collect()
    }

    fn grant(state: &mut LedgerState, request: &ClaimRequest) {
        for resource in &request.resources {
            state.holdings.insert(
                resource.clone(),
                Holding {
                    vehicle: request.vehicle.clone(),
                    heading: request.heading.clone(),
                },
            );
        }
        state.waiting.retain(|w| w != request);
    }

    /// Grants queued requests in arrival order wherever admissible.
    fn drain_waiting(&self, state: &mut LedgerState) -> Vec<ClaimRequest> {
        let mut granted = Vec::new();
        let mut index = 0;
        while index < state.waiting.len() {
            let request = state.waiting[index].clone();
            if self.conflicts(state, &request).is_empty() {
                Self::grant(state, &request);
                debug!(vehicle = %request.vehicle, resources = ?request.resources, "Granted queued claim");
                granted.push(request);
            } else {
                index += 1;
            }
        }
        granted
    }
}

impl ClaimService for BlockClaimLedger {
    fn try_claim(&self, request: ClaimRequest) -> ClaimOutcome {
        let mut state = self.state.lock();
        let conflicts = self.conflicts(&state, &request);

        if conflicts.is_empty() {
            Self::grant(&mut state, &request);
            trace!(vehicle = %request.vehicle, resources = ?request.resources, "Claim granted");
            return ClaimOutcome::Granted;
        }

        debug!(
            vehicle = %request.vehicle,
            resources = ?request.resources,
            conflicts = ?conflicts,
            "Claim denied"
        );
        let satisfiable = !conflicts
            .iter()
            .any(|c| matches!(c, ClaimConflict::UnknownResource(_)));
        if satisfiable && !state.waiting.contains(&request) {
            state.waiting.push_back(request);
        }
        ClaimOutcome::Denied { conflicts }
    }

    fn release(&self, vehicle: &str, resources: &BTreeSet<String>) -> Vec<ClaimRequest> {
        let mut state = self.state.lock();
        for resource in resources {
            if state
                .holdings
                .get(resource)
                .is_some_and(|h| h.vehicle == vehicle)
            {
                state.holdings.remove(resource);
            }
        }
        trace!(vehicle = %vehicle, resources = ?resources, "Released resources");
        self.drain_waiting(&mut state)
    }

    fn release_all(&self, vehicle: &str) -> Vec<ClaimRequest> {
        let mut state = self.state.lock();
        state.holdings.retain(|_, h| h.vehicle != vehicle);
        state.waiting.retain(|w| w.vehicle != vehicle);
        debug!(vehicle = %vehicle, "Released all resources");
        self.drain_waiting(&mut state)
    }

    fn holder(&self, resource: &str) -> Option<String> {
        self.state
            .lock()
            .holdings
            .get(resource)
            .map(|h| h.vehicle.clone())
    }

    fn claimed_by(&self, vehicle: &str) -> BTreeSet<String> {
        self.state
            .lock()
            .holdings
            .iter()
            .filter(|(_, h)| h.vehicle == vehicle)
            .map(|(r, _)| r.clone())
            .collect()
    }
}
