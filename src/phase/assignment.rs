//! Transport order assignment.
//!
//! # Algorithm
//! For each vehicle that passes the vehicle filter:
//! 1. Collect unassigned orders passing the order filter.
//! 2. Route the vehicle through each order's destinations; unroutable
//!    orders are dropped.
//! 3. Rank the remaining candidates (configured keys, then order ID).
//! 4. Try `assign_order` best-first. An assignment conflict (another
//!    cycle got there first) moves on to the next order; any other
//!    failure ends the attempt for this vehicle.

use tracing::{debug, info, warn};

use super::{isolate, Collaborators, Phase};
use crate::config::DispatcherConfig;
use crate::models::Vehicle;
use crate::selection::rules::order_ranking;
use crate::selection::{
    CompositeOrderFilter, CompositeVehicleFilter, EnergySufficient, HasNoOrder, IntendedFor,
    IsIdle, IsUnassignedTransport, OrderCandidate, OrderFilter, PositionKnown, Processable,
    RankingEngine, VehicleFilter,
};

/// Assigns unassigned transport orders to idle vehicles.
#[derive(Debug)]
pub struct AssignOrdersPhase {
    collab: Collaborators,
    enabled: bool,
    vehicle_filter: CompositeVehicleFilter,
    order_filter: CompositeOrderFilter,
    ranking: RankingEngine<OrderCandidate>,
}

impl AssignOrdersPhase {
    /// Creates the phase from the dispatcher configuration.
    pub fn new(collab: Collaborators, config: &DispatcherConfig) -> Self {
        let order_filter = CompositeOrderFilter::new()
            .with(IsUnassignedTransport)
            .with(IntendedFor)
            .with(Processable::new(collab.checker.clone()));
        Self {
            collab,
            enabled: config.assign_orders,
            vehicle_filter: CompositeVehicleFilter::new()
                .with(IsIdle)
                .with(HasNoOrder)
                .with(PositionKnown)
                .with(EnergySufficient),
            order_filter,
            ranking: order_ranking(&config.order_candidate_priorities),
        }
    }

    /// Replaces the order ranking.
    pub fn with_ranking(mut self, ranking: RankingEngine<OrderCandidate>) -> Self {
        self.ranking = ranking;
        self
    }

    fn candidates(&self, vehicle: &Vehicle) -> Vec<OrderCandidate> {
        let Some(from) = vehicle.position.as_deref() else {
            return Vec::new();
        };
        let ctx = self.collab.context();

        self.collab
            .orders
            .fetch_orders(&|o| o.is_assignable())
            .into_iter()
            .filter(|o| self.order_filter.accepts(vehicle, o, &ctx))
            .filter_map(|order| {
                match self
                    .collab
                    .router
                    .compute_route_through(vehicle, from, &order.destinations)
                {
                    Ok(route) => Some(OrderCandidate { order, route }),
                    Err(e) => {
                        debug!(vehicle = %vehicle.id, order = %order.id, error = %e, "Order unroutable");
                        None
                    }
                }
            })
            .collect()
    }

    fn assign(&self, vehicle: &Vehicle) {
        let candidates = self.candidates(vehicle);
        if candidates.is_empty() {
            debug!(vehicle = %vehicle.id, "No assignable order");
            return;
        }

        for candidate in self.ranking.rank(candidates) {
            let order_id = candidate.order.id;
            match self
                .collab
                .orders
                .assign_order(&order_id, &vehicle.id, candidate.route)
            {
                Ok(order) => {
                    info!(
                        vehicle = %vehicle.id,
                        order = %order.id,
                        cost = order.route.as_ref().map_or(0, |r| r.cost),
                        "Transport order assigned"
                    );
                    return;
                }
                Err(e) if e.is_claim_conflict() => {
                    debug!(vehicle = %vehicle.id, order = %order_id, error = %e, "Order claimed concurrently");
                }
                Err(e) => {
                    warn!(vehicle = %vehicle.id, order = %order_id, error = %e, "Order assignment failed");
                    return;
                }
            }
        }
    }
}

impl Phase for AssignOrdersPhase {
    fn name(&self) -> &'static str {
        "assign_orders"
    }

    fn run(&self) {
        if !self.enabled {
            debug!("Order assignment disabled");
            return;
        }

        let ids: Vec<String> = self
            .collab
            .orders
            .fetch_vehicles(&|v| v.is_idle() && v.order.is_none())
            .into_iter()
            .map(|v| v.id)
            .collect();

        for id in ids {
            // Re-read: an earlier iteration may have changed the fleet.
            let Some(vehicle) = self.collab.orders.fetch_vehicle(&id) else {
                continue;
            };
            let reasons = self.vehicle_filter.reasons(&vehicle, &self.collab.context());
            if !reasons.is_empty() {
                debug!(vehicle = %id, ?reasons, "Vehicle not eligible for orders");
                continue;
            }
            isolate(self.name(), &id, || self.assign(&vehicle));
        }
    }
}
