//! Dispatch context for filter evaluation.

use std::collections::{BTreeMap, HashMap};

use crate::models::Resource;
use crate::services::{ClaimService, OrderService};

/// Snapshot of the fleet state consulted by selection filters.
///
/// Captured from the collaborators at the start of each decision; a
/// filter never infers occupancy from the block model on its own.
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    /// Resources by name.
    pub resources: BTreeMap<String, Resource>,
    /// Resource name → vehicle holding it (claim service) or standing on it.
    pub occupants: HashMap<String, String>,
    /// Destination name → vehicle whose live order targets it.
    pub targeted_by: HashMap<String, String>,
    /// Vehicle ID → current position.
    pub positions: HashMap<String, String>,
}

impl DispatchContext {
    /// Captures a snapshot from the order and claim services.
    pub fn capture(orders: &dyn OrderService, claims: &dyn ClaimService) -> Self {
        let mut ctx = Self::default();

        for resource in orders.fetch_resources(&|_| true) {
            if let Some(holder) = claims.holder(&resource.name) {
                ctx.occupants.insert(resource.name.clone(), holder);
            }
            ctx.resources.insert(resource.name.clone(), resource);
        }

        for vehicle in orders.fetch_vehicles(&|_| true) {
            if let Some(position) = vehicle.position {
                ctx.occupants
                    .entry(position.clone())
                    .or_insert_with(|| vehicle.id.clone());
                ctx.positions.insert(vehicle.id, position);
            }
        }

        for order in orders.fetch_orders(&|o| o.is_live() && o.processing_vehicle.is_some()) {
            let Some(vehicle) = order.processing_vehicle else {
                continue;
            };
            for dest in order.destinations {
                ctx.targeted_by.insert(dest, vehicle.clone());
            }
        }

        ctx
    }

    /// Adds a resource.
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.insert(resource.name.clone(), resource);
        self
    }

    /// Records `vehicle` as occupying `resource`.
    pub fn with_occupant(mut self, resource: impl Into<String>, vehicle: impl Into<String>) -> Self {
        self.occupants.insert(resource.into(), vehicle.into());
        self
    }

    /// Records `resource` as targeted by `vehicle`'s order.
    pub fn with_target(mut self, resource: impl Into<String>, vehicle: impl Into<String>) -> Self {
        self.targeted_by.insert(resource.into(), vehicle.into());
        self
    }

    /// Records the position of a vehicle (and its occupancy).
    pub fn with_position(mut self, vehicle: impl Into<String>, resource: impl Into<String>) -> Self {
        let vehicle = vehicle.into();
        let resource = resource.into();
        self.occupants
            .entry(resource.clone())
            .or_insert_with(|| vehicle.clone());
        self.positions.insert(vehicle, resource);
        self
    }

    /// Looks up a resource.
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    /// Position resource of a vehicle.
    pub fn position_of(&self, vehicle: &str) -> Option<&Resource> {
        self.positions.get(vehicle).and_then(|p| self.resources.get(p))
    }

    /// Whether `resource` is neither occupied nor targeted by another vehicle.
    pub fn is_free_for(&self, resource: &str, vehicle: &str) -> bool {
        let unoccupied = self.occupants.get(resource).map_or(true, |v| v == vehicle);
        let untargeted = self.targeted_by.get(resource).map_or(true, |v| v == vehicle);
        unoccupied && untargeted
    }

    /// Free parking positions for `vehicle`, ordered by name.
    pub fn free_parking_positions<'a>(
        &'a self,
        vehicle: &'a str,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources
            .values()
            .filter(move |r| r.is_parking_position() && self.is_free_for(&r.name, vehicle))
    }
}
