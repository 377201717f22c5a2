//! Target position suppliers for parking and recharge phases.

use tracing::{debug, info, warn};

use super::Collaborators;
use crate::models::{Order, OrderSpec, Vehicle};
use crate::selection::rules::{nearest_position_ranking, prioritized_position_ranking};
use crate::selection::{
    BetterPriorityThanCurrent, CompositePositionFilter, DispatchContext, HasParkingPriority,
    IsFreeFor, IsNotCurrentPosition, IsParkingPosition, IsRechargePosition, PositionCandidate,
    PositionFilter, RankingEngine,
};

/// Suggests target positions for a vehicle, best first.
///
/// Candidates must pass the position filter and be reachable from the
/// vehicle's position; unreachable positions are dropped before ranking.
#[derive(Debug, Clone)]
pub struct PositionSupplier {
    filter: CompositePositionFilter,
    ranking: RankingEngine<PositionCandidate>,
}

impl PositionSupplier {
    /// Creates a supplier from a filter and a ranking.
    pub fn new(filter: CompositePositionFilter, ranking: RankingEngine<PositionCandidate>) -> Self {
        Self { filter, ranking }
    }

    /// Nearest free parking position other than the current one.
    pub fn nearest_parking() -> Self {
        Self::new(
            CompositePositionFilter::new()
                .with(IsParkingPosition)
                .with(IsFreeFor)
                .with(IsNotCurrentPosition),
            nearest_position_ranking(),
        )
    }

    /// Best-priority free parking position that beats the current one.
    pub fn prioritized_parking() -> Self {
        Self::new(
            CompositePositionFilter::new()
                .with(IsParkingPosition)
                .with(IsFreeFor)
                .with(IsNotCurrentPosition)
                .with(HasParkingPriority)
                .with(BetterPriorityThanCurrent),
            prioritized_position_ranking(),
        )
    }

    /// Nearest free recharge position. The vehicle's own position counts
    /// as free, so it may charge in place.
    pub fn nearest_recharge() -> Self {
        Self::new(
            CompositePositionFilter::new()
                .with(IsRechargePosition)
                .with(IsFreeFor),
            nearest_position_ranking(),
        )
    }

    /// Ranked, reachable candidates for `vehicle`.
    pub fn suggest(
        &self,
        vehicle: &Vehicle,
        ctx: &DispatchContext,
        collab: &Collaborators,
    ) -> Vec<PositionCandidate> {
        let Some(from) = vehicle.position.as_deref() else {
            return Vec::new();
        };

        let candidates: Vec<PositionCandidate> = ctx
            .resources
            .values()
            .filter(|r| self.filter.accepts(vehicle, r, ctx))
            .filter_map(|r| match collab.router.compute_route(vehicle, from, &r.name) {
                Ok(route) => Some(PositionCandidate {
                    position: r.clone(),
                    route,
                }),
                Err(e) => {
                    debug!(vehicle = %vehicle.id, position = %r.name, error = %e, "Position unreachable");
                    None
                }
            })
            .collect();

        self.ranking.rank(candidates)
    }
}

/// Sends `vehicle` to the best position `supplier` suggests.
///
/// The order is drafted with `make_spec`, checked for processability and
/// committed through `create_and_assign_order`. On an assignment conflict
/// the next position is tried. Returns whether an order was committed.
pub(crate) fn send_to_position(
    phase: &'static str,
    collab: &Collaborators,
    vehicle: &Vehicle,
    supplier: &PositionSupplier,
    make_spec: fn(&str, &str) -> OrderSpec,
) -> bool {
    let ctx = collab.context();
    let candidates = supplier.suggest(vehicle, &ctx, collab);
    if candidates.is_empty() {
        debug!(phase, vehicle = %vehicle.id, "No target position");
        return false;
    }

    for candidate in candidates {
        let spec = make_spec(&vehicle.id, &candidate.position.name);
        let draft = Order::from_spec("draft", spec.clone(), 0);
        if !collab.checker.can_process(vehicle, &draft) {
            debug!(phase, vehicle = %vehicle.id, category = %draft.category, "Vehicle cannot process order");
            return false;
        }

        match collab
            .orders
            .create_and_assign_order(spec, &vehicle.id, candidate.route)
        {
            Ok(order) => {
                info!(
                    phase,
                    vehicle = %vehicle.id,
                    order = %order.id,
                    position = %candidate.position.name,
                    "Vehicle dispatched to position"
                );
                return true;
            }
            Err(e) if e.is_claim_conflict() => {
                debug!(phase, vehicle = %vehicle.id, position = %candidate.position.name, error = %e, "Position claimed concurrently");
            }
            Err(e) => {
                warn!(phase, vehicle = %vehicle.id, error = %e, "Order creation failed");
                return false;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Resource, Topology};
    use crate::phase::fixtures::Fixture;
    use crate::services::OrderService;

    fn topology() -> Topology {
        Topology::new()
            .with_resource(Resource::halt("H"))
            .with_resource(Resource::park("K1").with_parking_priority(1))
            .with_resource(Resource::park("K2").with_parking_priority(2))
            .with_resource(Resource::park("K3"))
            .with_resource(Resource::park("K4"))
            .with_resource(Resource::recharge("C"))
            .with_bidirectional_path("H", "K1", 9)
            .with_bidirectional_path("H", "K2", 5)
            .with_bidirectional_path("H", "K3", 2)
            .with_bidirectional_path("H", "C", 4)
    }

    #[test]
    fn test_nearest_parking_skips_unreachable() {
        let fx = Fixture::new(topology());
        let v = Vehicle::new("V1").at("H");
        fx.fleet.add_vehicle(v.clone());

        let names: Vec<String> = PositionSupplier::nearest_parking()
            .suggest(&v, &fx.collab.context(), &fx.collab)
            .into_iter()
            .map(|c| c.position.name)
            .collect();
        // K4 has no path
        assert_eq!(names, vec!["K3", "K2", "K1"]);
    }

    #[test]
    fn test_prioritized_parking_order() {
        let fx = Fixture::new(topology());
        let v = Vehicle::new("V1").at("H");
        fx.fleet.add_vehicle(v.clone());

        let names: Vec<String> = PositionSupplier::prioritized_parking()
            .suggest(&v, &fx.collab.context(), &fx.collab)
            .into_iter()
            .map(|c| c.position.name)
            .collect();
        assert_eq!(names, vec!["K1", "K2"]);
    }

    #[test]
    fn test_recharge_in_place() {
        let fx = Fixture::new(topology());
        let v = Vehicle::new("V1").at("C");
        fx.fleet.add_vehicle(v.clone());

        let best = PositionSupplier::nearest_recharge().suggest(&v, &fx.collab.context(), &fx.collab);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].position.name, "C");
        assert_eq!(best[0].route.cost, 0);
    }

    #[test]
    fn test_send_rejected_by_processability() {
        let fx = Fixture::new(topology());
        let v = Vehicle::new("V1").at("H").with_categories(["tote"]);
        fx.fleet.add_vehicle(v.clone());

        let sent = send_to_position(
            "test",
            &fx.collab,
            &v,
            &PositionSupplier::nearest_parking(),
            |v, p| OrderSpec::parking(v, p),
        );
        assert!(!sent);
        assert!(fx.fleet.fetch_orders(&|_| true).is_empty());
    }
}
