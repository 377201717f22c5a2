//! Vehicle model.
//!
//! Vehicles are read-only snapshots from the dispatcher's point of view;
//! the order service owns the live state and hands out copies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Category wildcard: a vehicle listing it can process any order.
pub const ANY_CATEGORY: &str = "*";

/// A vehicle of the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Unique vehicle identifier.
    pub id: String,
    /// Resource the vehicle currently stands on. `None` = unknown.
    pub position: Option<String>,
    /// Processing state.
    pub state: ProcState,
    /// Energy level in percent (0..=100).
    pub energy_level: u8,
    /// Energy thresholds steering the recharge phase.
    pub energy: EnergyThresholds,
    /// Order currently assigned to this vehicle.
    pub order: Option<String>,
    /// Order categories this vehicle can process.
    pub processable_categories: BTreeSet<String>,
}

/// Processing state of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProcState {
    /// Waiting for work.
    #[default]
    Idle,
    /// Working on an order.
    Executing,
    /// Failed and awaiting operator attention.
    Error,
    /// Not available for dispatching.
    Unavailable,
}

/// Energy thresholds in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyThresholds {
    /// Below this level the vehicle must recharge before accepting work.
    pub critical: u8,
    /// At or below this level an idle vehicle should recharge.
    pub good: u8,
    /// Level considered sufficient to accept orders again.
    pub sufficiently_recharged: u8,
    /// Level considered full.
    pub fully_recharged: u8,
}

impl Default for EnergyThresholds {
    fn default() -> Self {
        Self {
            critical: 30,
            good: 90,
            sufficiently_recharged: 30,
            fully_recharged: 90,
        }
    }
}

impl Vehicle {
    /// Creates an idle, fully charged vehicle that can process any order.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            position: None,
            state: ProcState::Idle,
            energy_level: 100,
            energy: EnergyThresholds::default(),
            order: None,
            processable_categories: BTreeSet::from([ANY_CATEGORY.to_string()]),
        }
    }

    /// Sets the current position.
    pub fn at(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }

    /// Sets the processing state.
    pub fn with_state(mut self, state: ProcState) -> Self {
        self.state = state;
        self
    }

    /// Sets the energy level (clamped to 100).
    pub fn with_energy_level(mut self, level: u8) -> Self {
        self.energy_level = level.min(100);
        self
    }

    /// Sets the energy thresholds.
    pub fn with_energy_thresholds(mut self, thresholds: EnergyThresholds) -> Self {
        self.energy = thresholds;
        self
    }

    /// Replaces the processable categories.
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.processable_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the vehicle is idle.
    pub fn is_idle(&self) -> bool {
        self.state == ProcState::Idle
    }

    /// Whether the energy level is at or below the "good" threshold.
    pub fn is_energy_degraded(&self) -> bool {
        self.energy_level <= self.energy.good
    }

    /// Whether the energy level is below the critical threshold.
    pub fn is_energy_critical(&self) -> bool {
        self.energy_level < self.energy.critical
    }

    /// Whether the vehicle can take orders of `category`.
    pub fn processes_category(&self, category: &str) -> bool {
        self.processable_categories.contains(ANY_CATEGORY)
            || self.processable_categories.contains(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vehicle_builder() {
        let v = Vehicle::new("V1")
            .at("P1")
            .with_energy_level(150)
            .with_categories(["tote"]);

        assert_eq!(v.id, "V1");
        assert_eq!(v.position.as_deref(), Some("P1"));
        assert_eq!(v.energy_level, 100);
        assert!(v.is_idle());
        assert!(v.order.is_none());
        assert!(v.processes_category("tote"));
        assert!(!v.processes_category("pallet"));
    }

    #[test]
    fn test_wildcard_category() {
        let v = Vehicle::new("V1");
        assert!(v.processes_category("anything"));
    }

    #[test]
    fn test_energy_levels() {
        let v = Vehicle::new("V1").with_energy_level(50);
        assert!(v.is_energy_degraded());
        assert!(!v.is_energy_critical());

        let low = v.clone().with_energy_level(10);
        assert!(low.is_energy_critical());

        let full = v.with_energy_level(95);
        assert!(!full.is_energy_degraded());
    }
}
