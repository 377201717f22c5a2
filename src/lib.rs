//! Fleet-control dispatch kernel.
//!
//! Decides, in repeated dispatch cycles, which vehicle processes which
//! transport order, and sends idle vehicles to parking or recharge
//! positions. Vehicles share a driving course made of named resources;
//! blocks restrict how many vehicles may occupy groups of them.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Resource`, `Block`, `Topology`, `Vehicle`,
//!   `Order`, `OrderSpec`
//! - **`validation`**: Structural checks of a topology and fleet snapshot
//! - **`config`**: `DispatcherConfig` with JSON loading and validation
//! - **`services`**: Collaborator traits (orders, routing, claims,
//!   processability) with in-memory implementations
//! - **`selection`**: Vehicle/order/position filters and the `RankingEngine`
//! - **`phase`**: The `Phase` trait and the concrete dispatch phases
//! - **`dispatching`**: `DispatchPipeline` and the cycle driver `Dispatcher`
//! - **`adapter`**: Vehicle adapter commands and a loopback vehicle
//!
//! # Architecture
//!
//! A cycle runs the configured phases in a fixed order on one thread.
//! Each phase snapshots the fleet, filters and ranks candidates, and
//! commits through the order service. Commits are atomic; a phase that
//! loses a race moves on to its next candidate. Phases never propagate
//! errors out of a cycle.
//!
//! # References
//!
//! - Le-Anh & De Koster (2006), "A review of design and control of
//!   automated guided vehicle systems"
//! - Vis (2006), "Survey of research in the design and control of
//!   automated guided vehicle systems"

pub mod adapter;
pub mod config;
pub mod dispatching;
pub mod models;
pub mod phase;
pub mod selection;
pub mod services;
pub mod validation;
