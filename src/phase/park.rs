//! Parking of idle vehicles.

use tracing::debug;

use super::positions::send_to_position;
use super::{isolate, Collaborators, Phase, PositionSupplier};
use crate::config::DispatcherConfig;
use crate::models::OrderSpec;
use crate::selection::{
    CompositeVehicleFilter, HasNoOrder, IsIdle, IsNotParked, PositionKnown, VehicleFilter,
};

/// Vehicles a parking phase considers: idle, order-free, located and
/// not already standing on a parking position.
fn parkable() -> CompositeVehicleFilter {
    CompositeVehicleFilter::new()
        .with(IsIdle)
        .with(HasNoOrder)
        .with(PositionKnown)
        .with(IsNotParked)
}

fn park_vehicles(
    phase: &'static str,
    collab: &Collaborators,
    filter: &CompositeVehicleFilter,
    supplier: &PositionSupplier,
) {
    let ids: Vec<String> = collab
        .orders
        .fetch_vehicles(&|v| v.is_idle() && v.order.is_none())
        .into_iter()
        .map(|v| v.id)
        .collect();

    for id in ids {
        let Some(vehicle) = collab.orders.fetch_vehicle(&id) else {
            continue;
        };
        let reasons = filter.reasons(&vehicle, &collab.context());
        if !reasons.is_empty() {
            debug!(phase, vehicle = %id, ?reasons, "Vehicle not parkable");
            continue;
        }
        isolate(phase, &id, || {
            send_to_position(phase, collab, &vehicle, supplier, |v, p| {
                OrderSpec::parking(v, p)
            });
        });
    }
}

/// Sends idle vehicles to the nearest free parking position.
///
/// Parking position priorities are ignored here; see
/// [`PrioritizedParkingPhase`].
#[derive(Debug)]
pub struct ParkIdleVehiclesPhase {
    collab: Collaborators,
    enabled: bool,
    filter: CompositeVehicleFilter,
    supplier: PositionSupplier,
}

impl ParkIdleVehiclesPhase {
    /// Creates the phase from the dispatcher configuration.
    pub fn new(collab: Collaborators, config: &DispatcherConfig) -> Self {
        Self {
            collab,
            enabled: config.park_idle_vehicles,
            filter: parkable(),
            supplier: PositionSupplier::nearest_parking(),
        }
    }
}

impl Phase for ParkIdleVehiclesPhase {
    fn name(&self) -> &'static str {
        "park_idle_vehicles"
    }

    fn run(&self) {
        if !self.enabled {
            debug!("Parking disabled");
            return;
        }
        park_vehicles(self.name(), &self.collab, &self.filter, &self.supplier);
    }
}

/// Sends idle vehicles to the best-priority free parking position.
///
/// Runs only when parking and parking position priorities are both
/// enabled. Vehicles for which no prioritized position is free are left
/// to [`ParkIdleVehiclesPhase`].
#[derive(Debug)]
pub struct PrioritizedParkingPhase {
    collab: Collaborators,
    enabled: bool,
    filter: CompositeVehicleFilter,
    supplier: PositionSupplier,
}

impl PrioritizedParkingPhase {
    /// Creates the phase from the dispatcher configuration.
    pub fn new(collab: Collaborators, config: &DispatcherConfig) -> Self {
        Self {
            collab,
            enabled: config.prioritized_parking_enabled(),
            filter: parkable(),
            supplier: PositionSupplier::prioritized_parking(),
        }
    }
}

impl Phase for PrioritizedParkingPhase {
    fn name(&self) -> &'static str {
        "prioritized_parking"
    }

    fn run(&self) {
        if !self.enabled {
            debug!("Prioritized parking disabled");
            return;
        }
        park_vehicles(self.name(), &self.collab, &self.filter, &self.supplier);
    }
}
