//! Dispatch phases.
//!
//! A phase is one self-contained decision step of a dispatch cycle. It
//! reads the fleet through the collaborators, decides, and commits
//! through the order service's atomic operations.
//!
//! # Contract
//! - `run` never fails. "Nothing to do" and disabled-by-configuration are
//!   silent (debug-level) returns.
//! - A collaborator failure for one candidate is logged and the phase
//!   moves on to the next candidate. A panic while handling one vehicle
//!   is contained to that vehicle.
//! - A phase keeps no state between runs; each vehicle is re-read right
//!   before it is evaluated, so commits made earlier in the same cycle are
//!   always visible.
//!
//! # Phases
//!
//! | Phase | Gate | Commits |
//! |-------|------|---------|
//! | [`AssignOrdersPhase`] | `assign_orders` | transport order assignment |
//! | [`RechargeIdleVehiclesPhase`] | `recharge_idle_vehicles` | recharge order |
//! | [`PrioritizedReparkPhase`] | park + priorities + repark | parking order |
//! | [`PrioritizedParkingPhase`] | park + priorities | parking order |
//! | [`ParkIdleVehiclesPhase`] | `park_idle_vehicles` | parking order |

mod assignment;
mod park;
mod positions;
mod recharge;
mod repark;

#[cfg(test)]
pub(crate) mod fixtures;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

pub use assignment::AssignOrdersPhase;
pub use park::{ParkIdleVehiclesPhase, PrioritizedParkingPhase};
pub use positions::PositionSupplier;
pub use recharge::RechargeIdleVehiclesPhase;
pub use repark::PrioritizedReparkPhase;

use crate::selection::DispatchContext;
use crate::services::{ClaimService, OrderService, ProcessabilityChecker, Router};

/// One decision step of a dispatch cycle.
pub trait Phase: Send + Sync {
    /// Phase name (for logging).
    fn name(&self) -> &'static str;

    /// Runs the phase once.
    fn run(&self);
}

/// The services a phase reads from and commits through.
#[derive(Clone)]
pub struct Collaborators {
    /// Vehicles, orders and resources.
    pub orders: Arc<dyn OrderService>,
    /// Route computation.
    pub router: Arc<dyn Router>,
    /// Resource occupancy.
    pub claims: Arc<dyn ClaimService>,
    /// Vehicle/order capability matching.
    pub checker: Arc<dyn ProcessabilityChecker>,
}

impl Collaborators {
    /// Bundles the collaborators.
    pub fn new(
        orders: Arc<dyn OrderService>,
        router: Arc<dyn Router>,
        claims: Arc<dyn ClaimService>,
        checker: Arc<dyn ProcessabilityChecker>,
    ) -> Self {
        Self {
            orders,
            router,
            claims,
            checker,
        }
    }

    /// Captures a fresh selection context.
    pub fn context(&self) -> DispatchContext {
        DispatchContext::capture(self.orders.as_ref(), self.claims.as_ref())
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Runs the work for one vehicle. A panic is logged and swallowed so the
/// phase can continue with the next vehicle.
pub(crate) fn isolate(phase: &'static str, vehicle: &str, work: impl FnOnce()) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(work)) {
        error!(phase, vehicle, cause = %panic_message(payload.as_ref()), "Vehicle dispatch panicked");
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
