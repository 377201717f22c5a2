//! Selection filters.
//!
//! A filter returns the set of reasons a candidate is ineligible; an
//! empty set means eligible. Composites evaluate every child (no
//! short-circuit) and report the union of their reasons.
//!
//! # Filter kinds
//!
//! - **Vehicle**: is this vehicle a candidate for the phase at all?
//! - **Order**: may this vehicle take this order?
//! - **Position**: may this vehicle be sent to this position?

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

use super::DispatchContext;
use crate::models::{compare_priorities, Order, OrderKind, Resource, Vehicle};
use crate::services::ProcessabilityChecker;

/// Reasons a candidate was rejected. Empty = eligible.
pub type Reasons = BTreeSet<String>;

fn reason(text: impl Into<String>) -> Reasons {
    BTreeSet::from([text.into()])
}

fn reason_if(rejected: bool, text: &str) -> Reasons {
    if rejected {
        reason(text)
    } else {
        Reasons::new()
    }
}

/// Predicate over vehicles.
pub trait VehicleFilter: Send + Sync + Debug {
    /// Filter name.
    fn name(&self) -> &'static str;

    /// Reasons `vehicle` is not eligible.
    fn reasons(&self, vehicle: &Vehicle, ctx: &DispatchContext) -> Reasons;

    /// Whether `vehicle` is eligible.
    fn accepts(&self, vehicle: &Vehicle, ctx: &DispatchContext) -> bool {
        self.reasons(vehicle, ctx).is_empty()
    }
}

/// Predicate over (vehicle, order) pairs.
pub trait OrderFilter: Send + Sync + Debug {
    /// Filter name.
    fn name(&self) -> &'static str;

    /// Reasons `vehicle` may not take `order`.
    fn reasons(&self, vehicle: &Vehicle, order: &Order, ctx: &DispatchContext) -> Reasons;

    /// Whether `vehicle` may take `order`.
    fn accepts(&self, vehicle: &Vehicle, order: &Order, ctx: &DispatchContext) -> bool {
        self.reasons(vehicle, order, ctx).is_empty()
    }
}

/// Predicate over (vehicle, position) pairs.
pub trait PositionFilter: Send + Sync + Debug {
    /// Filter name.
    fn name(&self) -> &'static str;

    /// Reasons `vehicle` may not be sent to `position`.
    fn reasons(&self, vehicle: &Vehicle, position: &Resource, ctx: &DispatchContext) -> Reasons;

    /// Whether `vehicle` may be sent to `position`.
    fn accepts(&self, vehicle: &Vehicle, position: &Resource, ctx: &DispatchContext) -> bool {
        self.reasons(vehicle, position, ctx).is_empty()
    }
}

/// A conjunction of filters.
///
/// Children are evaluated in insertion order.
#[derive(Debug)]
pub struct Composite<F: ?Sized> {
    filters: Vec<Arc<F>>,
}

/// Composite over vehicle filters.
pub type CompositeVehicleFilter = Composite<dyn VehicleFilter>;
/// Composite over order filters.
pub type CompositeOrderFilter = Composite<dyn OrderFilter>;
/// Composite over position filters.
pub type CompositePositionFilter = Composite<dyn PositionFilter>;

impl<F: ?Sized> Composite<F> {
    /// Creates an empty composite (accepts everything).
    pub fn new() -> Self {
        Self {
            filters: Vec::new(),
        }
    }

    /// Adds a shared child filter.
    pub fn with_shared(mut self, filter: Arc<F>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Number of child filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether the composite has no children.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl<F: ?Sized> Default for Composite<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> Clone for Composite<F> {
    fn clone(&self) -> Self {
        Self {
            filters: self.filters.clone(),
        }
    }
}

impl Composite<dyn VehicleFilter> {
    /// Adds a child filter.
    pub fn with<T: VehicleFilter + 'static>(self, filter: T) -> Self {
        self.with_shared(Arc::new(filter))
    }
}

impl Composite<dyn OrderFilter> {
    /// Adds a child filter.
    pub fn with<T: OrderFilter + 'static>(self, filter: T) -> Self {
        self.with_shared(Arc::new(filter))
    }
}

impl Composite<dyn PositionFilter> {
    /// Adds a child filter.
    pub fn with<T: PositionFilter + 'static>(self, filter: T) -> Self {
        self.with_shared(Arc::new(filter))
    }
}

impl VehicleFilter for Composite<dyn VehicleFilter> {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn reasons(&self, vehicle: &Vehicle, ctx: &DispatchContext) -> Reasons {
        self.filters
            .iter()
            .flat_map(|f| f.reasons(vehicle, ctx))
            .collect()
    }
}

impl OrderFilter for Composite<dyn OrderFilter> {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn reasons(&self, vehicle: &Vehicle, order: &Order, ctx: &DispatchContext) -> Reasons {
        self.filters
            .iter()
            .flat_map(|f| f.reasons(vehicle, order, ctx))
            .collect()
    }
}

impl PositionFilter for Composite<dyn PositionFilter> {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn reasons(&self, vehicle: &Vehicle, position: &Resource, ctx: &DispatchContext) -> Reasons {
        self.filters
            .iter()
            .flat_map(|f| f.reasons(vehicle, position, ctx))
            .collect()
    }
}

// ======================== Vehicle filters ========================

/// Vehicle is in processing state `Idle`.
#[derive(Debug, Clone, Copy)]
pub struct IsIdle;

impl VehicleFilter for IsIdle {
    fn name(&self) -> &'static str {
        "is_idle"
    }

    fn reasons(&self, vehicle: &Vehicle, _ctx: &DispatchContext) -> Reasons {
        reason_if(!vehicle.is_idle(), "not idle")
    }
}

/// Vehicle holds no order.
#[derive(Debug, Clone, Copy)]
pub struct HasNoOrder;

impl VehicleFilter for HasNoOrder {
    fn name(&self) -> &'static str {
        "has_no_order"
    }

    fn reasons(&self, vehicle: &Vehicle, _ctx: &DispatchContext) -> Reasons {
        reason_if(vehicle.order.is_some(), "has order")
    }
}

/// Vehicle position is known and part of the topology.
#[derive(Debug, Clone, Copy)]
pub struct PositionKnown;

impl VehicleFilter for PositionKnown {
    fn name(&self) -> &'static str {
        "position_known"
    }

    fn reasons(&self, vehicle: &Vehicle, ctx: &DispatchContext) -> Reasons {
        match &vehicle.position {
            None => reason("position unknown"),
            Some(p) if ctx.resource(p).is_none() => reason("position not in topology"),
            Some(_) => Reasons::new(),
        }
    }
}

/// Vehicle stands on a parking position.
#[derive(Debug, Clone, Copy)]
pub struct IsParked;

impl VehicleFilter for IsParked {
    fn name(&self) -> &'static str {
        "is_parked"
    }

    fn reasons(&self, vehicle: &Vehicle, ctx: &DispatchContext) -> Reasons {
        let parked = vehicle
            .position
            .as_deref()
            .and_then(|p| ctx.resource(p))
            .is_some_and(Resource::is_parking_position);
        reason_if(!parked, "not parked")
    }
}

/// Vehicle does not stand on a parking position.
#[derive(Debug, Clone, Copy)]
pub struct IsNotParked;

impl VehicleFilter for IsNotParked {
    fn name(&self) -> &'static str {
        "is_not_parked"
    }

    fn reasons(&self, vehicle: &Vehicle, ctx: &DispatchContext) -> Reasons {
        reason_if(IsParked.accepts(vehicle, ctx), "already parked")
    }
}

/// Vehicle energy is at or below its "good" threshold.
#[derive(Debug, Clone, Copy)]
pub struct EnergyDegraded;

impl VehicleFilter for EnergyDegraded {
    fn name(&self) -> &'static str {
        "energy_degraded"
    }

    fn reasons(&self, vehicle: &Vehicle, _ctx: &DispatchContext) -> Reasons {
        reason_if(!vehicle.is_energy_degraded(), "energy level good")
    }
}

/// Vehicle energy is not critical.
#[derive(Debug, Clone, Copy)]
pub struct EnergySufficient;

impl VehicleFilter for EnergySufficient {
    fn name(&self) -> &'static str {
        "energy_sufficient"
    }

    fn reasons(&self, vehicle: &Vehicle, _ctx: &DispatchContext) -> Reasons {
        reason_if(vehicle.is_energy_critical(), "energy level critical")
    }
}

/// A free parking position of strictly higher priority than the
/// vehicle's current one exists.
#[derive(Debug, Clone, Copy)]
pub struct ParkedBelowAvailablePriority;

impl VehicleFilter for ParkedBelowAvailablePriority {
    fn name(&self) -> &'static str {
        "parked_below_available_priority"
    }

    fn reasons(&self, vehicle: &Vehicle, ctx: &DispatchContext) -> Reasons {
        let current = ctx.position_of(&vehicle.id).and_then(|p| p.parking_priority);
        let better_exists = ctx.free_parking_positions(&vehicle.id).any(|p| {
            p.parking_priority.is_some()
                && compare_priorities(p.parking_priority, current).is_lt()
        });
        reason_if(!better_exists, "no better parking position available")
    }
}

// ======================== Order filters ========================

/// Order is an unassigned transport order.
#[derive(Debug, Clone, Copy)]
pub struct IsUnassignedTransport;

impl OrderFilter for IsUnassignedTransport {
    fn name(&self) -> &'static str {
        "is_unassigned_transport"
    }

    fn reasons(&self, _vehicle: &Vehicle, order: &Order, _ctx: &DispatchContext) -> Reasons {
        let mut reasons = Reasons::new();
        if order.kind != OrderKind::Transport {
            reasons.insert("not a transport order".into());
        }
        if !order.is_assignable() {
            reasons.insert("not assignable".into());
        }
        reasons
    }
}

/// Order is not reserved for a different vehicle.
#[derive(Debug, Clone, Copy)]
pub struct IntendedFor;

impl OrderFilter for IntendedFor {
    fn name(&self) -> &'static str {
        "intended_for"
    }

    fn reasons(&self, vehicle: &Vehicle, order: &Order, _ctx: &DispatchContext) -> Reasons {
        let foreign = order
            .intended_vehicle
            .as_deref()
            .is_some_and(|iv| iv != vehicle.id);
        reason_if(foreign, "reserved for another vehicle")
    }
}

/// Vehicle is equipped for the order.
#[derive(Clone)]
pub struct Processable {
    checker: Arc<dyn ProcessabilityChecker>,
}

impl Processable {
    /// Wraps a processability checker.
    pub fn new(checker: Arc<dyn ProcessabilityChecker>) -> Self {
        Self { checker }
    }
}

impl Debug for Processable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Processable").finish_non_exhaustive()
    }
}

impl OrderFilter for Processable {
    fn name(&self) -> &'static str {
        "processable"
    }

    fn reasons(&self, vehicle: &Vehicle, order: &Order, _ctx: &DispatchContext) -> Reasons {
        reason_if(!self.checker.can_process(vehicle, order), "not processable")
    }
}

// ======================== Position filters ========================

/// Position is a parking position.
#[derive(Debug, Clone, Copy)]
pub struct IsParkingPosition;

impl PositionFilter for IsParkingPosition {
    fn name(&self) -> &'static str {
        "is_parking_position"
    }

    fn reasons(&self, _vehicle: &Vehicle, position: &Resource, _ctx: &DispatchContext) -> Reasons {
        reason_if(!position.is_parking_position(), "not a parking position")
    }
}

/// Position is a recharge position.
#[derive(Debug, Clone, Copy)]
pub struct IsRechargePosition;

impl PositionFilter for IsRechargePosition {
    fn name(&self) -> &'static str {
        "is_recharge_position"
    }

    fn reasons(&self, _vehicle: &Vehicle, position: &Resource, _ctx: &DispatchContext) -> Reasons {
        reason_if(!position.is_recharge_position(), "not a recharge position")
    }
}

/// Position is neither occupied nor targeted by another vehicle.
#[derive(Debug, Clone, Copy)]
pub struct IsFreeFor;

impl PositionFilter for IsFreeFor {
    fn name(&self) -> &'static str {
        "is_free_for"
    }

    fn reasons(&self, vehicle: &Vehicle, position: &Resource, ctx: &DispatchContext) -> Reasons {
        reason_if(!ctx.is_free_for(&position.name, &vehicle.id), "occupied or reserved")
    }
}

/// Position differs from where the vehicle stands.
#[derive(Debug, Clone, Copy)]
pub struct IsNotCurrentPosition;

impl PositionFilter for IsNotCurrentPosition {
    fn name(&self) -> &'static str {
        "is_not_current_position"
    }

    fn reasons(&self, vehicle: &Vehicle, position: &Resource, _ctx: &DispatchContext) -> Reasons {
        reason_if(
            vehicle.position.as_deref() == Some(position.name.as_str()),
            "current position",
        )
    }
}

/// Position carries a parking priority.
#[derive(Debug, Clone, Copy)]
pub struct HasParkingPriority;

impl PositionFilter for HasParkingPriority {
    fn name(&self) -> &'static str {
        "has_parking_priority"
    }

    fn reasons(&self, _vehicle: &Vehicle, position: &Resource, _ctx: &DispatchContext) -> Reasons {
        reason_if(position.parking_priority.is_none(), "no parking priority")
    }
}

/// Position ranks strictly better than the vehicle's current position.
///
/// A vehicle not standing on a parking position has no priority, so any
/// prioritized position beats it.
#[derive(Debug, Clone, Copy)]
pub struct BetterPriorityThanCurrent;

impl PositionFilter for BetterPriorityThanCurrent {
    fn name(&self) -> &'static str {
        "better_priority_than_current"
    }

    fn reasons(&self, vehicle: &Vehicle, position: &Resource, ctx: &DispatchContext) -> Reasons {
        let current = ctx
            .position_of(&vehicle.id)
            .filter(|p| p.is_parking_position())
            .and_then(|p| p.parking_priority);
        let better = compare_priorities(position.parking_priority, current).is_lt();
        reason_if(!better, "priority not better than current")
    }
}
