//! Dispatcher configuration.
//!
//! Every flag has a default, so a configuration document only needs to
//! name what it changes:
//!
//! ```
//! use u_fleet::config::DispatcherConfig;
//!
//! let config = DispatcherConfig::from_json_str(r#"{ "park_idle_vehicles": false }"#).unwrap();
//! assert!(!config.park_idle_vehicles);
//! assert!(config.recharge_idle_vehicles);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Keys the order-assignment phase ranks candidate orders by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderRankingKey {
    /// Higher order priority first.
    ByPriority,
    /// Cheaper route from the vehicle first.
    ByRouteCost,
    /// Earlier deadline first.
    ByDeadline,
    /// Older order first.
    ByAge,
}

/// Switches and rankings consulted by the dispatch phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Assign transport orders to idle vehicles.
    pub assign_orders: bool,
    /// Send idle vehicles with degraded energy to recharge positions.
    pub recharge_idle_vehicles: bool,
    /// Send idle vehicles to parking positions.
    pub park_idle_vehicles: bool,
    /// Prefer parking positions by their priority.
    pub consider_parking_position_priorities: bool,
    /// Move parked vehicles to free positions of higher priority.
    pub repark_vehicles_to_higher_priority_positions: bool,
    /// Ranking keys for candidate orders, most significant first.
    pub order_candidate_priorities: Vec<OrderRankingKey>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            assign_orders: true,
            recharge_idle_vehicles: true,
            park_idle_vehicles: true,
            consider_parking_position_priorities: false,
            repark_vehicles_to_higher_priority_positions: false,
            order_candidate_priorities: vec![
                OrderRankingKey::ByPriority,
                OrderRankingKey::ByRouteCost,
                OrderRankingKey::ByAge,
            ],
        }
    }
}

impl DispatcherConfig {
    /// Parses a JSON document; absent fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to pretty JSON.
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.order_candidate_priorities.is_empty() {
            return Err(ConfigError::Invalid(
                "order_candidate_priorities must name at least one key".into(),
            ));
        }
        let mut seen = HashSet::new();
        for key in &self.order_candidate_priorities {
            if !seen.insert(key) {
                return Err(ConfigError::Invalid(format!(
                    "order_candidate_priorities lists {key:?} twice"
                )));
            }
        }
        Ok(())
    }

    /// Whether the prioritized repark phase may run.
    pub fn repark_enabled(&self) -> bool {
        self.park_idle_vehicles
            && self.consider_parking_position_priorities
            && self.repark_vehicles_to_higher_priority_positions
    }

    /// Whether the prioritized parking phase may run.
    pub fn prioritized_parking_enabled(&self) -> bool {
        self.park_idle_vehicles && self.consider_parking_position_priorities
    }

    /// Sets `assign_orders`.
    pub fn with_assign_orders(mut self, enabled: bool) -> Self {
        self.assign_orders = enabled;
        self
    }

    /// Sets `recharge_idle_vehicles`.
    pub fn with_recharge_idle_vehicles(mut self, enabled: bool) -> Self {
        self.recharge_idle_vehicles = enabled;
        self
    }

    /// Sets `park_idle_vehicles`.
    pub fn with_park_idle_vehicles(mut self, enabled: bool) -> Self {
        self.park_idle_vehicles = enabled;
        self
    }

    /// Sets `consider_parking_position_priorities`.
    pub fn with_parking_position_priorities(mut self, enabled: bool) -> Self {
        self.consider_parking_position_priorities = enabled;
        self
    }

    /// Sets `repark_vehicles_to_higher_priority_positions`.
    pub fn with_repark_to_higher_priority(mut self, enabled: bool) -> Self {
        self.repark_vehicles_to_higher_priority_positions = enabled;
        self
    }

    /// Sets the order ranking keys.
    pub fn with_order_priorities(mut self, keys: Vec<OrderRankingKey>) -> Self {
        self.order_candidate_priorities = keys;
        self
    }
}
