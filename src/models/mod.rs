//! Fleet domain models.
//!
//! Provides the data types the dispatcher reasons about: the driving
//! course (resources, blocks), the fleet (vehicles) and the work
//! (orders, routes).
//!
//! # Domain Mappings
//!
//! | u-fleet | Intralogistics | Yard | Warehouse |
//! |---------|----------------|------|-----------|
//! | Resource | Point/Path | Lane/Slot | Aisle/Station |
//! | Block | Crossing/Corridor | Gate | Narrow aisle |
//! | Vehicle | AGV | Tractor | AMR |
//! | Order | Transport order | Move | Pick task |

mod block;
mod order;
mod resource;
mod topology;
mod vehicle;

pub use block::{Block, BlockType};
pub use order::{
    Order, OrderKind, OrderSpec, OrderState, Route, DEFAULT_CATEGORY, PARK_CATEGORY,
    RECHARGE_CATEGORY,
};
pub use resource::{
    compare_priorities, ParkingPriorityComparator, PathSpec, PointType, Resource, ResourceKind,
};
pub use topology::Topology;
pub use vehicle::{EnergyThresholds, ProcState, Vehicle, ANY_CATEGORY};
