//! Order service.
//!
//! The order service owns vehicles and orders. Phases read consistent
//! snapshots through it and commit through its atomic operations; they
//! never mutate fleet state directly.
//!
//! `InMemoryFleet` keeps everything behind one `RwLock`, so every call
//! observes a consistent state and `assign_order` is a single
//! check-and-set.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{
    Order, OrderKind, OrderSpec, OrderState, ProcState, Resource, Route, Topology, Vehicle,
};

/// Order service error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Unknown vehicle: {0}")]
    UnknownVehicle(String),

    #[error("Unknown order: {0}")]
    UnknownOrder(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Order already exists: {0}")]
    DuplicateOrder(String),

    #[error("Order {0} has no destinations")]
    EmptyOrder(String),

    #[error("Order {order} is already assigned to {vehicle}")]
    OrderAlreadyAssigned { order: String, vehicle: String },

    #[error("Vehicle {vehicle} already holds order {order}")]
    VehicleBusy { vehicle: String, order: String },

    #[error("Order {order} is reserved for another vehicle than {vehicle}")]
    NotIntendedFor { order: String, vehicle: String },

    #[error("Order {order} is in state {state:?}")]
    InvalidState { order: String, state: OrderState },

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl ServiceError {
    /// Whether the error means another party took the order first.
    ///
    /// Such errors are expected under concurrent dispatching; the caller
    /// should move on to its next candidate.
    pub fn is_claim_conflict(&self) -> bool {
        matches!(
            self,
            ServiceError::OrderAlreadyAssigned { .. }
                | ServiceError::InvalidState { .. }
                | ServiceError::NotIntendedFor { .. }
        )
    }
}

/// Read and commit access to vehicles and orders.
pub trait OrderService: Send + Sync {
    /// Vehicles accepted by `filter`, ordered by ID.
    fn fetch_vehicles(&self, filter: &dyn Fn(&Vehicle) -> bool) -> Vec<Vehicle>;

    /// A single vehicle.
    fn fetch_vehicle(&self, id: &str) -> Option<Vehicle>;

    /// Orders accepted by `filter`, ordered by ID.
    fn fetch_orders(&self, filter: &dyn Fn(&Order) -> bool) -> Vec<Order>;

    /// A single order.
    fn fetch_order(&self, id: &str) -> Option<Order>;

    /// A single resource.
    fn fetch_resource(&self, name: &str) -> Option<Resource>;

    /// Resources accepted by `filter`, ordered by name.
    fn fetch_resources(&self, filter: &dyn Fn(&Resource) -> bool) -> Vec<Resource>;

    /// Creates a raw order.
    fn create_order(&self, spec: OrderSpec) -> Result<Order, ServiceError>;

    /// Atomically assigns an unassigned order to an order-free vehicle.
    fn assign_order(&self, order: &str, vehicle: &str, route: Route) -> Result<Order, ServiceError>;

    /// Withdraws a live order and frees its vehicle.
    fn withdraw_order(&self, order: &str) -> Result<Order, ServiceError>;

    /// Creates an order and assigns it in one step.
    ///
    /// If the assignment fails the created order is withdrawn again.
    fn create_and_assign_order(
        &self,
        spec: OrderSpec,
        vehicle: &str,
        route: Route,
    ) -> Result<Order, ServiceError> {
        let order = self.create_order(spec)?;
        match self.assign_order(&order.id, vehicle, route) {
            Ok(order) => Ok(order),
            Err(e) => {
                if let Err(rollback) = self.withdraw_order(&order.id) {
                    warn!(order = %order.id, error = %rollback, "Rollback withdraw failed");
                }
                Err(e)
            }
        }
    }
}

#[derive(Debug, Default)]
struct FleetState {
    vehicles: BTreeMap<String, Vehicle>,
    orders: BTreeMap<String, Order>,
    next_seq: u64,
}

/// In-memory order service.
///
/// Besides the [`OrderService`] contract it exposes the execution-side
/// mutators a vehicle driver needs (`start_processing`, `advance_order`,
/// `finish_order`, ...).
#[derive(Debug)]
pub struct InMemoryFleet {
    topology: Arc<Topology>,
    state: RwLock<FleetState>,
}

impl InMemoryFleet {
    /// Creates an empty fleet over `topology`.
    pub fn new(topology: Arc<Topology>) -> Self {
        Self {
            topology,
            state: RwLock::new(FleetState::default()),
        }
    }

    /// The topology the fleet operates on.
    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    /// Adds (or replaces) a vehicle.
    pub fn add_vehicle(&self, vehicle: Vehicle) {
        debug!(vehicle = %vehicle.id, position = ?vehicle.position, "Vehicle added");
        self.state.write().vehicles.insert(vehicle.id.clone(), vehicle);
    }

    /// Updates the reported position of a vehicle.
    pub fn update_position(&self, vehicle: &str, position: Option<String>) -> Result<(), ServiceError> {
        if let Some(p) = &position {
            if self.topology.resource(p).is_none() {
                return Err(ServiceError::UnknownResource(p.clone()));
            }
        }
        self.with_vehicle(vehicle, |v| v.position = position)
    }

    /// Updates the processing state of a vehicle.
    pub fn set_proc_state(&self, vehicle: &str, state: ProcState) -> Result<(), ServiceError> {
        self.with_vehicle(vehicle, |v| v.state = state)
    }

    /// Updates the energy level of a vehicle.
    pub fn update_energy(&self, vehicle: &str, level: u8) -> Result<(), ServiceError> {
        self.with_vehicle(vehicle, |v| v.energy_level = level.min(100))
    }

    /// Moves an active order to `BeingProcessed` and its vehicle to `Executing`.
    pub fn start_processing(&self, order: &str) -> Result<Order, ServiceError> {
        let mut state = self.state.write();
        let o = state
            .orders
            .get_mut(order)
            .ok_or_else(|| ServiceError::UnknownOrder(order.to_string()))?;
        if o.state != OrderState::Active {
            return Err(ServiceError::InvalidState {
                order: order.to_string(),
                state: o.state,
            });
        }
        o.state = OrderState::BeingProcessed;
        let snapshot = o.clone();
        if let Some(v) = snapshot
            .processing_vehicle
            .as_ref()
            .and_then(|id| state.vehicles.get_mut(id))
        {
            v.state = ProcState::Executing;
        }
        Ok(snapshot)
    }

    /// Records that the vehicle reached route step `progress`.
    pub fn advance_order(&self, order: &str, progress: usize) -> Result<(), ServiceError> {
        let mut state = self.state.write();
        let o = state
            .orders
            .get_mut(order)
            .ok_or_else(|| ServiceError::UnknownOrder(order.to_string()))?;
        o.progress = progress;
        Ok(())
    }

    /// Finishes an order; its vehicle becomes idle and order-free.
    pub fn finish_order(&self, order: &str) -> Result<Order, ServiceError> {
        self.close_order(order, OrderState::Finished)
    }

    /// Fails an order; its vehicle becomes idle and order-free.
    pub fn fail_order(&self, order: &str) -> Result<Order, ServiceError> {
        self.close_order(order, OrderState::Failed)
    }

    fn close_order(&self, order: &str, final_state: OrderState) -> Result<Order, ServiceError> {
        let mut state = self.state.write();
        let o = state
            .orders
            .get_mut(order)
            .ok_or_else(|| ServiceError::UnknownOrder(order.to_string()))?;
        if o.state.is_final() {
            return Err(ServiceError::InvalidState {
                order: order.to_string(),
                state: o.state,
            });
        }
        o.state = final_state;
        let snapshot = o.clone();
        if let Some(v) = snapshot
            .processing_vehicle
            .as_ref()
            .and_then(|id| state.vehicles.get_mut(id))
        {
            if v.order.as_deref() == Some(order) {
                v.order = None;
            }
            v.state = ProcState::Idle;
        }
        info!(order = %order, state = ?final_state, "Order closed");
        Ok(snapshot)
    }

    fn with_vehicle(&self, id: &str, f: impl FnOnce(&mut Vehicle)) -> Result<(), ServiceError> {
        let mut state = self.state.write();
        let v = state
            .vehicles
            .get_mut(id)
            .ok_or_else(|| ServiceError::UnknownVehicle(id.to_string()))?;
        f(v);
        Ok(())
    }
}

fn id_prefix(kind: OrderKind) -> &'static str {
    match kind {
        OrderKind::Transport => "TOrder",
        OrderKind::Parking => "Park",
        OrderKind::Recharge => "Recharge",
    }
}

impl OrderService for InMemoryFleet {
    fn fetch_vehicles(&self, filter: &dyn Fn(&Vehicle) -> bool) -> Vec<Vehicle> {
        self.state
            .read()
            .vehicles
            .values()
            .filter(|v| filter(*v))
            .cloned()
            .collect()
    }

    fn fetch_vehicle(&self, id: &str) -> Option<Vehicle> {
        self.state.read().vehicles.get(id).cloned()
    }

    fn fetch_orders(&self, filter: &dyn Fn(&Order) -> bool) -> Vec<Order> {
        self.state
            .read()
            .orders
            .values()
            .filter(|o| filter(*o))
            .cloned()
            .collect()
    }

    fn fetch_order(&self, id: &str) -> Option<Order> {
        self.state.read().orders.get(id).cloned()
    }

    fn fetch_resource(&self, name: &str) -> Option<Resource> {
        self.topology.resource(name).cloned()
    }

    fn fetch_resources(&self, filter: &dyn Fn(&Resource) -> bool) -> Vec<Resource> {
        self.topology
            .resources()
            .filter(|r| filter(*r))
            .cloned()
            .collect()
    }

    fn create_order(&self, spec: OrderSpec) -> Result<Order, ServiceError> {
        let mut state = self.state.write();
        let id = match &spec.id {
            Some(id) => id.clone(),
            // Skip numbers taken by explicitly named orders.
            None => loop {
                let candidate = format!("{}-{:04}", id_prefix(spec.kind), state.next_seq);
                if !state.orders.contains_key(&candidate) {
                    break candidate;
                }
                state.next_seq += 1;
            },
        };
        let seq = state.next_seq;

        if state.orders.contains_key(&id) {
            return Err(ServiceError::DuplicateOrder(id));
        }
        if spec.destinations.is_empty() {
            return Err(ServiceError::EmptyOrder(id));
        }
        if let Some(unknown) = spec
            .destinations
            .iter()
            .find(|d| self.topology.resource(d).is_none())
        {
            return Err(ServiceError::UnknownResource(unknown.clone()));
        }

        state.next_seq += 1;
        let order = Order::from_spec(id.clone(), spec, seq);
        state.orders.insert(id.clone(), order.clone());
        debug!(order = %id, kind = ?order.kind, "Order created");
        Ok(order)
    }

    fn assign_order(&self, order: &str, vehicle: &str, route: Route) -> Result<Order, ServiceError> {
        let mut state = self.state.write();

        let o = state
            .orders
            .get(order)
            .ok_or_else(|| ServiceError::UnknownOrder(order.to_string()))?;
        if let Some(holder) = &o.processing_vehicle {
            return Err(ServiceError::OrderAlreadyAssigned {
                order: order.to_string(),
                vehicle: holder.clone(),
            });
        }
        if o.state != OrderState::Raw {
            return Err(ServiceError::InvalidState {
                order: order.to_string(),
                state: o.state,
            });
        }
        if o.intended_vehicle.as_deref().is_some_and(|iv| iv != vehicle) {
            return Err(ServiceError::NotIntendedFor {
                order: order.to_string(),
                vehicle: vehicle.to_string(),
            });
        }

        let v = state
            .vehicles
            .get_mut(vehicle)
            .ok_or_else(|| ServiceError::UnknownVehicle(vehicle.to_string()))?;
        if let Some(held) = &v.order {
            return Err(ServiceError::VehicleBusy {
                vehicle: vehicle.to_string(),
                order: held.clone(),
            });
        }
        v.order = Some(order.to_string());

        let o = state
            .orders
            .get_mut(order)
            .ok_or_else(|| ServiceError::UnknownOrder(order.to_string()))?;
        o.state = OrderState::Active;
        o.processing_vehicle = Some(vehicle.to_string());
        o.route = Some(route);
        o.progress = 0;
        info!(order = %order, vehicle = %vehicle, "Order assigned");
        Ok(o.clone())
    }

    fn withdraw_order(&self, order: &str) -> Result<Order, ServiceError> {
        let mut state = self.state.write();
        let o = state
            .orders
            .get_mut(order)
            .ok_or_else(|| ServiceError::UnknownOrder(order.to_string()))?;
        if o.state.is_final() {
            return Err(ServiceError::InvalidState {
                order: order.to_string(),
                state: o.state,
            });
        }
        o.state = OrderState::Withdrawn;
        let snapshot = o.clone();
        if let Some(v) = snapshot
            .processing_vehicle
            .as_ref()
            .and_then(|id| state.vehicles.get_mut(id))
        {
            if v.order.as_deref() == Some(order) {
                v.order = None;
                v.state = ProcState::Idle;
            }
        }
        info!(order = %order, "Order withdrawn");
        Ok(snapshot)
    }
}
