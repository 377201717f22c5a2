//! Capability matching between vehicles and orders.

use crate::models::{Order, Vehicle};

/// Decides whether a vehicle is equipped to process an order.
pub trait ProcessabilityChecker: Send + Sync {
    /// Whether `vehicle` can process `order`.
    fn can_process(&self, vehicle: &Vehicle, order: &Order) -> bool;
}

/// Matches the order category against the vehicle's processable categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct CategoryProcessabilityChecker;

impl ProcessabilityChecker for CategoryProcessabilityChecker {
    fn can_process(&self, vehicle: &Vehicle, order: &Order) -> bool {
        vehicle.processes_category(&order.category)
    }
}
