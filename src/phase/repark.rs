//! Reparking of parked vehicles to better parking positions.
//!
//! # Algorithm
//! 1. Select idle, order-free vehicles standing on a parking position
//!    while a free position of strictly higher priority exists.
//! 2. Sort them worst-parked first (stable; positions without a priority
//!    count as worst).
//! 3. For each, re-check eligibility against the current fleet state and
//!    send it to the best free prioritized position.
//!
//! Sorting worst-first gives the most suboptimally parked vehicle the
//! first claim on a newly freed high-priority position.

use std::cmp::Ordering;

use tracing::debug;

use super::positions::send_to_position;
use super::{isolate, Collaborators, Phase, PositionSupplier};
use crate::config::DispatcherConfig;
use crate::models::{OrderSpec, ParkingPriorityComparator, Vehicle};
use crate::selection::{
    CompositeVehicleFilter, DispatchContext, HasNoOrder, IsIdle, IsParked,
    ParkedBelowAvailablePriority, PositionKnown, VehicleFilter,
};

/// Moves parked vehicles to free parking positions of higher priority.
///
/// Runs only if parking, parking position priorities and reparking are
/// all enabled.
#[derive(Debug)]
pub struct PrioritizedReparkPhase {
    collab: Collaborators,
    enabled: bool,
    filter: CompositeVehicleFilter,
    supplier: PositionSupplier,
    comparator: ParkingPriorityComparator,
}

impl PrioritizedReparkPhase {
    /// Creates the phase from the dispatcher configuration.
    pub fn new(collab: Collaborators, config: &DispatcherConfig) -> Self {
        Self {
            collab,
            enabled: config.repark_enabled(),
            filter: CompositeVehicleFilter::new()
                .with(IsIdle)
                .with(HasNoOrder)
                .with(PositionKnown)
                .with(IsParked)
                .with(ParkedBelowAvailablePriority),
            supplier: PositionSupplier::prioritized_parking(),
            comparator: ParkingPriorityComparator,
        }
    }

    /// Worst-parked first.
    fn compare_worst_first(&self, a: &Vehicle, b: &Vehicle, ctx: &DispatchContext) -> Ordering {
        match (ctx.position_of(&a.id), ctx.position_of(&b.id)) {
            (Some(pa), Some(pb)) => self.comparator.compare(pb, pa),
            _ => Ordering::Equal,
        }
    }
}

impl Phase for PrioritizedReparkPhase {
    fn name(&self) -> &'static str {
        "prioritized_repark"
    }

    fn run(&self) {
        if !self.enabled {
            debug!("Reparking disabled");
            return;
        }

        let ctx = self.collab.context();
        let mut candidates = self
            .collab
            .orders
            .fetch_vehicles(&|v| self.filter.accepts(v, &ctx));
        if candidates.is_empty() {
            debug!("No vehicle to repark");
            return;
        }
        candidates.sort_by(|a, b| self.compare_worst_first(a, b, &ctx));

        for candidate in candidates {
            let Some(vehicle) = self.collab.orders.fetch_vehicle(&candidate.id) else {
                continue;
            };
            // Earlier reparks may have taken the better positions.
            let reasons = self.filter.reasons(&vehicle, &self.collab.context());
            if !reasons.is_empty() {
                debug!(vehicle = %vehicle.id, ?reasons, "Vehicle no longer reparkable");
                continue;
            }
            isolate(self.name(), &vehicle.id, || {
                send_to_position(self.name(), &self.collab, &vehicle, &self.supplier, |v, p| {
                    OrderSpec::parking(v, p)
                });
            });
        }
    }
}
