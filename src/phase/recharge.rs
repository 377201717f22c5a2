//! Recharging of idle vehicles.

use tracing::debug;

use super::positions::send_to_position;
use super::{isolate, Collaborators, Phase, PositionSupplier};
use crate::config::DispatcherConfig;
use crate::models::OrderSpec;
use crate::selection::{
    CompositeVehicleFilter, EnergyDegraded, HasNoOrder, IsIdle, PositionKnown, VehicleFilter,
};

/// Sends idle vehicles whose energy is at or below their "good"
/// threshold to the nearest free recharge position.
#[derive(Debug)]
pub struct RechargeIdleVehiclesPhase {
    collab: Collaborators,
    enabled: bool,
    filter: CompositeVehicleFilter,
    supplier: PositionSupplier,
}

impl RechargeIdleVehiclesPhase {
    /// Creates the phase from the dispatcher configuration.
    pub fn new(collab: Collaborators, config: &DispatcherConfig) -> Self {
        Self {
            collab,
            enabled: config.recharge_idle_vehicles,
            filter: CompositeVehicleFilter::new()
                .with(IsIdle)
                .with(HasNoOrder)
                .with(PositionKnown)
                .with(EnergyDegraded),
            supplier: PositionSupplier::nearest_recharge(),
        }
    }
}

impl Phase for RechargeIdleVehiclesPhase {
    fn name(&self) -> &'static str {
        "recharge_idle_vehicles"
    }

    fn run(&self) {
        if !self.enabled {
            debug!("Recharging disabled");
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
            let Some(vehicle) = self.collab.orders.fetch_vehicle(&id) else {
                continue;
            };
            let reasons = self.filter.reasons(&vehicle, &self.collab.context());
            if !reasons.is_empty() {
                debug!(vehicle = %id, ?reasons, "Vehicle needs no recharge");
                continue;
            }
            isolate(self.name(), &id, || {
                send_to_position(self.name(), &self.collab, &vehicle, &self.supplier, |v, p| {
                    OrderSpec::recharge(v, p)
                });
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Order, OrderKind, Resource, Topology, Vehicle};
    use crate::phase::fixtures::Fixture;
    use crate::services::OrderService;

    fn topology() -> Topology {
        Topology::new()
            .with_resource(Resource::halt("H"))
            .with_resource(Resource::recharge("C1"))
            .with_resource(Resource::recharge("C2"))
            .with_bidirectional_path("H", "C1", 3)
            .with_bidirectional_path("H", "C2", 7)
    }

    fn recharge_orders(fx: &Fixture) -> Vec<Order> {
        fx.fleet.fetch_orders(&|o| o.kind == OrderKind::Recharge)
    }

    #[test]
    fn test_degraded_vehicle_sent_to_nearest_charger() {
        let fx = Fixture::new(topology());
        fx.fleet
            .add_vehicle(Vehicle::new("V1").at("H").with_energy_level(40));

        RechargeIdleVehiclesPhase::new(fx.collab.clone(), &DispatcherConfig::default()).run();

        let orders = recharge_orders(&fx);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].destinations, vec!["C1"]);
        assert_eq!(orders[0].processing_vehicle.as_deref(), Some("V1"));
    }

    #[test]
    fn test_occupied_charger_skipped() {
        let fx = Fixture::new(topology());
        fx.fleet.add_vehicle(Vehicle::new("V0").at("C1"));
        fx.fleet
            .add_vehicle(Vehicle::new("V1").at("H").with_energy_level(40));

        RechargeIdleVehiclesPhase::new(fx.collab.clone(), &DispatcherConfig::default()).run();

        assert_eq!(recharge_orders(&fx)[0].destinations, vec!["C2"]);
    }

    #[test]
    fn test_charges_in_place() {
        let fx = Fixture::new(topology());
        fx.fleet
            .add_vehicle(Vehicle::new("V1").at("C2").with_energy_level(40));

        RechargeIdleVehiclesPhase::new(fx.collab.clone(), &DispatcherConfig::default()).run();

        let orders = recharge_orders(&fx);
        assert_eq!(orders[0].destinations, vec!["C2"]);
        assert_eq!(orders[0].route.as_ref().unwrap().cost, 0);
    }

    #[test]
    fn test_healthy_vehicle_ignored() {
        let fx = Fixture::new(topology());
        fx.fleet.add_vehicle(Vehicle::new("V1").at("H"));

        RechargeIdleVehiclesPhase::new(fx.collab.clone(), &DispatcherConfig::default()).run();

        assert!(recharge_orders(&fx).is_empty());
    }

    #[test]
    fn test_disabled() {
        let fx = Fixture::new(topology());
        fx.fleet
            .add_vehicle(Vehicle::new("V1").at("H").with_energy_level(10));
        let config = DispatcherConfig::default().with_recharge_idle_vehicles(false);

        RechargeIdleVehiclesPhase::new(fx.collab.clone(), &config).run();

        assert!(recharge_orders(&fx).is_empty());
    }
}
