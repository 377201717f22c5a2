//! Dispatch pipeline and cycle driver.
//!
//! A [`DispatchPipeline`] is the ordered list of phases built from the
//! configuration at startup. The [`Dispatcher`] runs it once per fleet
//! event, never two cycles at a time.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use u_fleet::config::DispatcherConfig;
//! use u_fleet::dispatching::{DispatchTrigger, Dispatcher, TriggerOutcome};
//! use u_fleet::models::{Resource, Topology, Vehicle};
//! use u_fleet::phase::Collaborators;
//! use u_fleet::services::{
//!     BlockClaimLedger, CategoryProcessabilityChecker, GraphRouter, InMemoryFleet,
//! };
//!
//! let topology = Arc::new(
//!     Topology::new()
//!         .with_resource(Resource::halt("A"))
//!         .with_resource(Resource::park("K"))
//!         .with_bidirectional_path("A", "K", 1),
//! );
//! let fleet = Arc::new(InMemoryFleet::new(topology.clone()));
//! fleet.add_vehicle(Vehicle::new("V1").at("A"));
//!
//! let collab = Collaborators::new(
//!     fleet.clone(),
//!     Arc::new(GraphRouter::new(topology.clone())),
//!     Arc::new(BlockClaimLedger::new(topology)),
//!     Arc::new(CategoryProcessabilityChecker),
//! );
//! let dispatcher = Dispatcher::from_config(&DispatcherConfig::default(), collab).unwrap();
//!
//! let outcome = dispatcher.trigger(DispatchTrigger::VehicleIdle("V1".into()));
//! assert_eq!(outcome, TriggerOutcome::Completed { cycles: 1 });
//! ```

mod driver;
mod pipeline;

pub use driver::{DispatchTrigger, Dispatcher, TriggerOutcome};
pub use pipeline::{CycleReport, DispatchPipeline};
