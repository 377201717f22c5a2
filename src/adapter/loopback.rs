//! Simulated vehicle driven by adapter commands.
//!
//! The loopback vehicle executes its assigned order one route step per
//! `Trigger`: it claims the next resource through the claim service,
//! releases the one it leaves, and reports progress and position back to
//! the fleet. A denied claim leaves the vehicle where it is; the claim
//! service queues the request and grants it once the resource frees up.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{AdapterCommand, CommandKind, CommandRegistry};
use crate::models::{Order, OrderKind, OrderState};
use crate::services::{
    ClaimConflict, ClaimOutcome, ClaimRequest, ClaimService, InMemoryFleet, OrderService,
    ServiceError,
};

/// Resource attribute naming the travel direction of a path. Defaults to
/// the path name.
pub const DIRECTION_ATTRIBUTE: &str = "direction";

/// Loopback adapter error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    #[error("Fleet error: {0}")]
    Service(#[from] ServiceError),

    #[error("Position {position} is not available: {conflicts:?}")]
    PositionUnavailable {
        position: String,
        conflicts: Vec<ClaimConflict>,
    },
}

/// What one step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The vehicle has no order.
    Idle,
    /// The vehicle moved onto `resource`.
    Moved { resource: String },
    /// The next resource could not be claimed.
    Blocked {
        resource: String,
        conflicts: Vec<ClaimConflict>,
    },
    /// The order reached its final step and was finished.
    Finished { order: String },
}

/// A simulated vehicle.
pub struct LoopbackVehicle {
    id: String,
    fleet: Arc<InMemoryFleet>,
    claims: Arc<dyn ClaimService>,
}

impl std::fmt::Debug for LoopbackVehicle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackVehicle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl LoopbackVehicle {
    /// Creates the adapter for fleet vehicle `id`.
    pub fn new(id: impl Into<String>, fleet: Arc<InMemoryFleet>, claims: Arc<dyn ClaimService>) -> Self {
        Self {
            id: id.into(),
            fleet,
            claims,
        }
    }

    /// The vehicle ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Registers this vehicle's handlers for every command kind.
    pub fn register(self: &Arc<Self>, registry: &CommandRegistry) {
        let vehicle = Arc::clone(self);
        registry.register(CommandKind::InitPosition, move |cmd| {
            if let AdapterCommand::InitPosition { position } = cmd {
                if let Err(e) = vehicle.init_position(position) {
                    warn!(vehicle = %vehicle.id, position = %position, error = %e, "Position initialization failed");
                }
            }
        });

        let vehicle = Arc::clone(self);
        registry.register(CommandKind::Trigger, move |_| {
            if let Err(e) = vehicle.step() {
                warn!(vehicle = %vehicle.id, error = %e, "Step failed");
            }
        });
    }

    /// Places the vehicle at `position`, dropping all its previous claims.
    pub fn init_position(&self, position: &str) -> Result<(), AdapterError> {
        if self.fleet.fetch_resource(position).is_none() {
            return Err(ServiceError::UnknownResource(position.to_string()).into());
        }

        self.claims.release_all(&self.id);
        if let ClaimOutcome::Denied { conflicts } =
            self.claims.try_claim(ClaimRequest::new(&self.id, [position]))
        {
            // Drop the queued request again; initialization does not wait.
            self.claims.release_all(&self.id);
            return Err(AdapterError::PositionUnavailable {
                position: position.to_string(),
                conflicts,
            });
        }

        self.fleet.update_position(&self.id, Some(position.to_string()))?;
        info!(vehicle = %self.id, position = %position, "Position initialized");
        Ok(())
    }

    /// Advances the assigned order by one route step.
    pub fn step(&self) -> Result<StepOutcome, AdapterError> {
        let vehicle = self
            .fleet
            .fetch_vehicle(&self.id)
            .ok_or_else(|| ServiceError::UnknownVehicle(self.id.clone()))?;
        let Some(order_id) = vehicle.order else {
            self.release_stale_claims(vehicle.position.as_deref());
            return Ok(StepOutcome::Idle);
        };
        let mut order = self
            .fleet
            .fetch_order(&order_id)
            .ok_or_else(|| ServiceError::UnknownOrder(order_id.clone()))?;
        if order.state == OrderState::Active {
            order = self.fleet.start_processing(&order_id)?;
        }

        let steps = order.route.as_ref().map(|r| r.steps.clone()).unwrap_or_default();
        let next_index = order.progress + 1;
        let Some(next) = steps.get(next_index) else {
            return self.finish(&order);
        };

        if self.claims.holder(next).as_deref() != Some(self.id.as_str()) {
            let request = ClaimRequest::new(&self.id, [next.as_str()])
                .with_heading_opt(self.heading(&steps, next_index));
            if let ClaimOutcome::Denied { conflicts } = self.claims.try_claim(request) {
                debug!(vehicle = %self.id, resource = %next, "Waiting for resource");
                return Ok(StepOutcome::Blocked {
                    resource: next.clone(),
                    conflicts,
                });
            }
        }

        if let Some(left) = steps.get(order.progress) {
            let granted = self.claims.release(&self.id, &BTreeSet::from([left.clone()]));
            for request in granted {
                debug!(vehicle = %request.vehicle, resources = ?request.resources, "Waiting claim granted");
            }
        }
        self.fleet.advance_order(&order_id, next_index)?;
        if self
            .fleet
            .fetch_resource(next)
            .is_some_and(|r| r.is_point())
        {
            self.fleet.update_position(&self.id, Some(next.clone()))?;
        }
        debug!(vehicle = %self.id, resource = %next, "Moved");

        if next_index + 1 == steps.len() {
            return self.finish(&order);
        }
        Ok(StepOutcome::Moved {
            resource: next.clone(),
        })
    }

    /// Releases everything an order-free vehicle still holds except its
    /// position, e.g. the route claims of a withdrawn order.
    fn release_stale_claims(&self, position: Option<&str>) {
        let stale: BTreeSet<String> = self
            .claims
            .claimed_by(&self.id)
            .into_iter()
            .filter(|r| Some(r.as_str()) != position)
            .collect();
        if stale.is_empty() {
            return;
        }

        for request in self.claims.release(&self.id, &stale) {
            debug!(vehicle = %request.vehicle, resources = ?request.resources, "Waiting claim granted");
        }
        info!(vehicle = %self.id, released = ?stale, "Released claims without order");

        let Some(position) = position else {
            return;
        };
        if self.claims.holder(position).as_deref() != Some(self.id.as_str()) {
            if let ClaimOutcome::Denied { conflicts } =
                self.claims.try_claim(ClaimRequest::new(&self.id, [position]))
            {
                warn!(vehicle = %self.id, position = %position, ?conflicts, "Position held by another vehicle");
            }
        }
    }

    /// Heading label for claiming `steps[index]`: the direction of the
    /// path being entered or left.
    fn heading(&self, steps: &[String], index: usize) -> Option<String> {
        let path = [index, index.wrapping_sub(1)]
            .into_iter()
            .filter_map(|i| steps.get(i))
            .filter_map(|name| self.fleet.fetch_resource(name))
            .find(|r| r.path_spec().is_some())?;
        Some(
            path.attributes
                .get(DIRECTION_ATTRIBUTE)
                .cloned()
                .unwrap_or(path.name),
        )
    }

    fn finish(&self, order: &Order) -> Result<StepOutcome, AdapterError> {
        if order.kind == OrderKind::Recharge {
            self.fleet.update_energy(&self.id, 100)?;
        }
        self.fleet.finish_order(&order.id)?;
        info!(vehicle = %self.id, order = %order.id, "Order finished");
        Ok(StepOutcome::Finished {
            order: order.id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::CommandSink;
    use crate::config::DispatcherConfig;
    use crate::dispatching::{DispatchTrigger, Dispatcher};
    use crate::models::{Block, BlockType, OrderSpec, ProcState, Resource, Topology, Vehicle};
    use crate::phase::fixtures::Fixture;
    use crate::services::BlockClaimLedger;

    fn loopback(fx: &Fixture, id: &str) -> Arc<LoopbackVehicle> {
        fx.fleet.add_vehicle(Vehicle::new(id));
        Arc::new(LoopbackVehicle::new(id, fx.fleet.clone(), fx.claims.clone()))
    }

    fn line() -> Topology {
        Topology::new()
            .with_resource(Resource::halt("A"))
            .with_resource(Resource::halt("B"))
            .with_resource(Resource::halt("C"))
            .with_resource(Resource::park("K"))
            .with_resource(Resource::recharge("Q"))
            .with_bidirectional_path("A", "B", 2)
            .with_bidirectional_path("B", "C", 2)
            .with_bidirectional_path("C", "K", 1)
            .with_bidirectional_path("A", "Q", 1)
    }

    #[test]
    fn test_init_position_claims() {
        let fx = Fixture::new(line());
        let v1 = loopback(&fx, "V1");
        let v2 = loopback(&fx, "V2");

        v1.init_position("A").unwrap();
        assert_eq!(fx.claims.holder("A").as_deref(), Some("V1"));
        assert_eq!(fx.fleet.fetch_vehicle("V1").unwrap().position.as_deref(), Some("A"));

        let err = v2.init_position("A").unwrap_err();
        assert!(matches!(err, AdapterError::PositionUnavailable { .. }));
        assert_eq!(fx.claims.waiting_count(), 0);

        v1.init_position("B").unwrap();
        assert_eq!(fx.claims.holder("A"), None);
        assert!(matches!(
            v1.init_position("nowhere"),
            Err(AdapterError::Service(ServiceError::UnknownResource(_)))
        ));
    }

    #[test]
    fn test_steps_through_route() {
        let fx = Fixture::new(line());
        let v = loopback(&fx, "V1");
        v.init_position("A").unwrap();
        assert_eq!(v.step().unwrap(), StepOutcome::Idle);

        fx.fleet
            .create_order(OrderSpec::transport(["C"]).with_id("O"))
            .unwrap();
        Dispatcher::from_config(&DispatcherConfig::default(), fx.collab.clone())
            .unwrap()
            .trigger(DispatchTrigger::OrderCreated("O".into()));

        let mut outcomes = Vec::new();
        loop {
            let outcome = v.step().unwrap();
            let done = matches!(outcome, StepOutcome::Finished { .. });
            outcomes.push(outcome);
            if done {
                break;
            }
        }

        assert_eq!(outcomes.len(), 4); // A--B, B, B--C, C
        assert_eq!(fx.fleet.fetch_order("O").unwrap().state, OrderState::Finished);
        let vehicle = fx.fleet.fetch_vehicle("V1").unwrap();
        assert_eq!(vehicle.position.as_deref(), Some("C"));
        assert_eq!(vehicle.state, ProcState::Idle);
        assert!(vehicle.order.is_none());
        assert_eq!(fx.claims.claimed_by("V1"), BTreeSet::from(["C".to_string()]));
    }

    #[test]
    fn test_withdrawn_order_releases_route_claims() {
        let fx = Fixture::new(line());
        let v = loopback(&fx, "V1");
        v.init_position("A").unwrap();
        fx.fleet
            .create_order(OrderSpec::transport(["C"]).with_id("O"))
            .unwrap();
        Dispatcher::from_config(&DispatcherConfig::default(), fx.collab.clone())
            .unwrap()
            .trigger(DispatchTrigger::OrderCreated("O".into()));
        assert_eq!(v.step().unwrap(), StepOutcome::Moved { resource: "A--B".into() });
        assert_eq!(fx.claims.holder("A--B").as_deref(), Some("V1"));

        fx.fleet.withdraw_order("O").unwrap();
        assert_eq!(v.step().unwrap(), StepOutcome::Idle);

        assert_eq!(fx.claims.holder("A--B"), None);
        assert_eq!(fx.claims.claimed_by("V1"), BTreeSet::from(["A".to_string()]));
        assert_eq!(v.step().unwrap(), StepOutcome::Idle);
        assert_eq!(fx.claims.claimed_by("V1"), BTreeSet::from(["A".to_string()]));
    }

    #[test]
    fn test_recharge_restores_energy() {
        let fx = Fixture::new(line());
        fx.fleet.add_vehicle(Vehicle::new("V1").with_energy_level(20));
        let v = Arc::new(LoopbackVehicle::new("V1", fx.fleet.clone(), fx.claims.clone()));
        v.init_position("A").unwrap();

        let dispatcher = Dispatcher::from_config(&DispatcherConfig::default(), fx.collab.clone()).unwrap();
        dispatcher.trigger(DispatchTrigger::VehicleIdle("V1".into()));
        while !matches!(v.step().unwrap(), StepOutcome::Finished { .. }) {}

        let vehicle = fx.fleet.fetch_vehicle("V1").unwrap();
        assert_eq!(vehicle.position.as_deref(), Some("Q"));
        assert_eq!(vehicle.energy_level, 100);
    }

    #[test]
    fn test_block_contention() {
        // Two corridors sharing one single-vehicle block
        let topology = Topology::new()
            .with_resource(Resource::halt("A"))
            .with_resource(Resource::halt("X1"))
            .with_resource(Resource::halt("C"))
            .with_resource(Resource::halt("D"))
            .with_resource(Resource::halt("X2"))
            .with_resource(Resource::halt("E"))
            .with_bidirectional_path("A", "X1", 1)
            .with_bidirectional_path("X1", "C", 1)
            .with_bidirectional_path("D", "X2", 1)
            .with_bidirectional_path("X2", "E", 1)
            .with_block(
                Block::new("crossing")
                    .with_type(BlockType::SingleVehicleOnly)
                    .with_members(["X1", "X2"]),
            );
        let fx = Fixture::new(topology);
        let v1 = loopback(&fx, "V1");
        let v2 = loopback(&fx, "V2");
        v1.init_position("A").unwrap();
        v2.init_position("D").unwrap();
        fx.fleet
            .create_order(OrderSpec::transport(["C"]).with_id("O1").with_intended_vehicle("V1"))
            .unwrap();
        fx.fleet
            .create_order(OrderSpec::transport(["E"]).with_id("O2").with_intended_vehicle("V2"))
            .unwrap();
        Dispatcher::from_config(&DispatcherConfig::default(), fx.collab.clone())
            .unwrap()
            .trigger(DispatchTrigger::Manual);

        // V1: A--X1, X1
        v1.step().unwrap();
        assert_eq!(v1.step().unwrap(), StepOutcome::Moved { resource: "X1".into() });
        // V2: D--X2, then X2 is denied
        v2.step().unwrap();
        let blocked = v2.step().unwrap();
        assert!(matches!(
            blocked,
            StepOutcome::Blocked { ref resource, ref conflicts }
                if resource == "X2"
                    && conflicts.contains(&ClaimConflict::BlockOccupied {
                        block: "crossing".into(),
                        occupant: "V1".into(),
                    })
        ));

        // V1 leaves X1: the queued claim for X2 is granted
        v1.step().unwrap();
        assert_eq!(fx.claims.holder("X2").as_deref(), Some("V2"));
        assert_eq!(v2.step().unwrap(), StepOutcome::Moved { resource: "X2".into() });
    }

    #[test]
    fn test_same_direction_block() {
        // One-way corridor: both vehicles head the same way through it
        let topology = Topology::new()
            .with_resource(Resource::halt("S1"))
            .with_resource(Resource::halt("S2"))
            .with_resource(Resource::halt("M"))
            .with_resource(Resource::halt("T"))
            .with_resource(Resource::path("S1-M", "S1", "M", 1).with_attribute(DIRECTION_ATTRIBUTE, "east"))
            .with_resource(Resource::path("S2-M", "S2", "M", 1).with_attribute(DIRECTION_ATTRIBUTE, "east"))
            .with_resource(Resource::path("M-T", "M", "T", 1).with_attribute(DIRECTION_ATTRIBUTE, "east"))
            .with_block(
                Block::new("corridor")
                    .with_type(BlockType::SameDirectionOnly)
                    .with_members(["S1-M", "S2-M", "M-T"]),
            );
        let fx = Fixture::new(topology);
        let v1 = loopback(&fx, "V1");
        let v2 = loopback(&fx, "V2");
        v1.init_position("S1").unwrap();
        v2.init_position("S2").unwrap();
        fx.fleet
            .create_order(OrderSpec::transport(["T"]).with_id("O1").with_intended_vehicle("V1"))
            .unwrap();
        fx.fleet
            .create_order(OrderSpec::transport(["M"]).with_id("O2").with_intended_vehicle("V2"))
            .unwrap();
        Dispatcher::from_config(&DispatcherConfig::default(), fx.collab.clone())
            .unwrap()
            .trigger(DispatchTrigger::Manual);

        assert_eq!(v1.step().unwrap(), StepOutcome::Moved { resource: "S1-M".into() });
        assert_eq!(v2.step().unwrap(), StepOutcome::Moved { resource: "S2-M".into() });
    }

    #[test]
    fn test_registry_drives_vehicle() {
        let fx = Fixture::new(line());
        let v = loopback(&fx, "V1");
        let registry = CommandRegistry::new();
        v.register(&registry);

        registry.execute(&AdapterCommand::init_position("B"));
        assert_eq!(fx.fleet.fetch_vehicle("V1").unwrap().position.as_deref(), Some("B"));

        fx.fleet
            .create_order(OrderSpec::transport(["A"]).with_id("O"))
            .unwrap();
        Dispatcher::from_config(&DispatcherConfig::default(), fx.collab.clone())
            .unwrap()
            .trigger(DispatchTrigger::Manual);
        registry.execute(&AdapterCommand::Trigger);
        registry.execute(&AdapterCommand::Trigger);

        assert_eq!(fx.fleet.fetch_order("O").unwrap().state, OrderState::Finished);
    }

    #[test]
    fn test_ledger_shared_between_fleet_and_adapter() {
        let fx = Fixture::new(line());
        let ledger: Arc<BlockClaimLedger> = fx.claims.clone();
        let v = loopback(&fx, "V1");
        v.init_position("C").unwrap();
        assert_eq!(ledger.claimed_by("V1").len(), 1);
    }
}
