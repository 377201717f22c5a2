//! Candidate selection.
//!
//! Phases pick vehicles, orders and positions in two steps: filters
//! decide eligibility (with reasons for rejection), then a
//! [`RankingEngine`] orders the eligible candidates best-first.
//!
//! # Score Convention
//! Ranking rules return lower scores for better candidates.
//!
//! # Reference
//! Blackstone et al. (1982), "A State-of-the-Art Survey of Dispatching Rules"

mod context;
mod filters;
mod ranking;
pub mod rules;

pub use context::DispatchContext;
pub use filters::{
    BetterPriorityThanCurrent, Composite, CompositeOrderFilter, CompositePositionFilter,
    CompositeVehicleFilter, EnergyDegraded, EnergySufficient, HasNoOrder, HasParkingPriority,
    IntendedFor, IsFreeFor, IsIdle, IsNotCurrentPosition, IsNotParked, IsParked,
    IsParkingPosition, IsRechargePosition, IsUnassignedTransport, OrderFilter,
    ParkedBelowAvailablePriority, PositionFilter, PositionKnown, Processable, Reasons,
    VehicleFilter,
};
pub use ranking::{EvaluationMode, Ranked, RankingEngine, RankingRule, RuleScore, TieBreaker};
pub use rules::{OrderCandidate, PositionCandidate};
