//! Order model.
//!
//! Transport orders arrive from outside; parking and recharge orders are
//! synthesized by dispatch phases. The order service owns the lifecycle:
//!
//! ```text
//! Raw ──assign──▶ Active ──start──▶ BeingProcessed ──▶ Finished | Failed
//!  └──────────────┴──withdraw──▶ Withdrawn
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Category assigned to synthesized parking orders.
pub const PARK_CATEGORY: &str = "park";
/// Category assigned to synthesized recharge orders.
pub const RECHARGE_CATEGORY: &str = "recharge";
/// Category of transport orders created without an explicit one.
pub const DEFAULT_CATEGORY: &str = "-";

/// What an order is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Externally created work order.
    Transport,
    /// Move an idle vehicle to a parking position.
    Parking,
    /// Move an idle vehicle to a recharge position.
    Recharge,
}

/// Lifecycle state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderState {
    /// Known to the kernel, not yet assigned.
    Raw,
    /// Assigned to a vehicle, not yet started.
    Active,
    /// The vehicle is executing it.
    BeingProcessed,
    /// Completed successfully.
    Finished,
    /// Aborted with an error.
    Failed,
    /// Withdrawn before completion.
    Withdrawn,
}

impl OrderState {
    /// Whether the order reached a terminal state.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            OrderState::Finished | OrderState::Failed | OrderState::Withdrawn
        )
    }
}

/// Cost and resource sequence produced by the router.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Route {
    /// Total travel cost.
    pub cost: u64,
    /// Resources to traverse, starting with the source point.
    pub steps: Vec<String>,
}

impl Route {
    /// Route of a vehicle staying where it is.
    pub fn stay(position: impl Into<String>) -> Self {
        Self {
            cost: 0,
            steps: vec![position.into()],
        }
    }

    /// Final resource of the route.
    pub fn destination(&self) -> Option<&str> {
        self.steps.last().map(String::as_str)
    }

    /// Appends another leg whose first step equals this route's last step.
    pub fn extend(&mut self, leg: Route) {
        self.cost += leg.cost;
        let skip = usize::from(self.destination() == leg.steps.first().map(String::as_str));
        self.steps.extend(leg.steps.into_iter().skip(skip));
    }
}

/// Request to create an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Order identifier. `None` lets the order service name it.
    pub id: Option<String>,
    /// What the order is for.
    pub kind: OrderKind,
    /// Destination resources, visited in sequence.
    pub destinations: Vec<String>,
    /// Category matched against vehicle capabilities.
    pub category: String,
    /// Dispatch priority (higher = more important).
    pub priority: i32,
    /// Latest completion time (ms). `None` = no deadline.
    pub deadline: Option<i64>,
    /// Vehicle the order is reserved for.
    pub intended_vehicle: Option<String>,
}

impl OrderSpec {
    /// Creates a transport order request.
    pub fn transport<I, S>(destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            kind: OrderKind::Transport,
            destinations: destinations.into_iter().map(Into::into).collect(),
            category: DEFAULT_CATEGORY.to_string(),
            priority: 0,
            deadline: None,
            intended_vehicle: None,
        }
    }

    /// Creates a parking order request for `vehicle`.
    pub fn parking(vehicle: impl Into<String>, position: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: OrderKind::Parking,
            destinations: vec![position.into()],
            category: PARK_CATEGORY.to_string(),
            priority: 0,
            deadline: None,
            intended_vehicle: Some(vehicle.into()),
        }
    }

    /// Creates a recharge order request for `vehicle`.
    pub fn recharge(vehicle: impl Into<String>, position: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: OrderKind::Recharge,
            destinations: vec![position.into()],
            category: RECHARGE_CATEGORY.to_string(),
            priority: 0,
            deadline: None,
            intended_vehicle: Some(vehicle.into()),
        }
    }

    /// Sets the order identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the deadline.
    pub fn with_deadline(mut self, deadline_ms: i64) -> Self {
        self.deadline = Some(deadline_ms);
        self
    }

    /// Reserves the order for a vehicle.
    pub fn with_intended_vehicle(mut self, vehicle: impl Into<String>) -> Self {
        self.intended_vehicle = Some(vehicle.into());
        self
    }
}

/// An order known to the order service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier.
    pub id: String,
    /// What the order is for.
    pub kind: OrderKind,
    /// Destination resources, visited in sequence.
    pub destinations: Vec<String>,
    /// Lifecycle state.
    pub state: OrderState,
    /// Category matched against vehicle capabilities.
    pub category: String,
    /// Dispatch priority (higher = more important).
    pub priority: i32,
    /// Latest completion time (ms).
    pub deadline: Option<i64>,
    /// Creation sequence number (FIFO key).
    pub created_seq: u64,
    /// Vehicle the order is reserved for.
    pub intended_vehicle: Option<String>,
    /// Vehicle holding the order.
    pub processing_vehicle: Option<String>,
    /// Route computed at assignment.
    pub route: Option<Route>,
    /// Index into `route.steps` of the step the vehicle stands on.
    pub progress: usize,
    /// Domain-specific metadata.
    pub attributes: HashMap<String, String>,
}

impl Order {
    /// Materializes a spec into a raw order.
    pub fn from_spec(id: impl Into<String>, spec: OrderSpec, created_seq: u64) -> Self {
        Self {
            id: id.into(),
            kind: spec.kind,
            destinations: spec.destinations,
            state: OrderState::Raw,
            category: spec.category,
            priority: spec.priority,
            deadline: spec.deadline,
            created_seq,
            intended_vehicle: spec.intended_vehicle,
            processing_vehicle: None,
            route: None,
            progress: 0,
            attributes: HashMap::new(),
        }
    }

    /// Final destination.
    pub fn final_destination(&self) -> Option<&str> {
        self.destinations.last().map(String::as_str)
    }

    /// Whether the order is still live (not in a terminal state).
    pub fn is_live(&self) -> bool {
        !self.state.is_final()
    }

    /// Whether a vehicle may still pick this order up.
    pub fn is_assignable(&self) -> bool {
        self.state == OrderState::Raw && self.processing_vehicle.is_none()
    }
}
