//! Collaborators consumed by the dispatch phases.
//!
//! Each concern is a trait so kernels can plug in their own
//! implementations; the in-memory implementations here are complete
//! enough to run a fleet in tests and simulations.
//!
//! | Trait | Reference implementation |
//! |-------|--------------------------|
//! | [`OrderService`] | [`InMemoryFleet`] |
//! | [`ClaimService`] | [`BlockClaimLedger`] |
//! | [`Router`] | [`GraphRouter`] |
//! | [`ProcessabilityChecker`] | [`CategoryProcessabilityChecker`] |

mod claims;
mod orders;
mod processability;
mod routing;

pub use claims::{BlockClaimLedger, ClaimConflict, ClaimOutcome, ClaimRequest, ClaimService};
pub use orders::{InMemoryFleet, OrderService, ServiceError};
pub use processability::{CategoryProcessabilityChecker, ProcessabilityChecker};
pub use routing::{GraphRouter, Router, RoutingError};
