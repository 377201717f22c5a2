//! Built-in ranking rules.
//!
//! # Categories
//!
//! - **Order candidates**: priority, route cost, deadline, age
//! - **Position candidates**: parking priority, route cost
//!
//! # Score Convention
//! All rules return lower scores for better candidates.

use super::{RankingEngine, RankingRule, Ranked, RuleScore, TieBreaker};
use crate::config::OrderRankingKey;
use crate::models::{Order, Resource, Route};

/// A transport order together with the route the vehicle would drive.
#[derive(Debug, Clone)]
pub struct OrderCandidate {
    /// The order.
    pub order: Order,
    /// Route from the vehicle position through all destinations.
    pub route: Route,
}

impl Ranked for OrderCandidate {
    fn ranking_id(&self) -> &str {
        &self.order.id
    }
}

/// A destination position together with the route to it.
#[derive(Debug, Clone)]
pub struct PositionCandidate {
    /// The position.
    pub position: Resource,
    /// Route from the vehicle position.
    pub route: Route,
}

impl Ranked for PositionCandidate {
    fn ranking_id(&self) -> &str {
        &self.position.name
    }
}

// ======================== Order rules ========================

/// Higher order priority first.
#[derive(Debug, Clone, Copy)]
pub struct ByOrderPriority;

impl RankingRule<OrderCandidate> for ByOrderPriority {
    fn name(&self) -> &'static str {
        "PRIORITY"
    }

    fn evaluate(&self, candidate: &OrderCandidate) -> RuleScore {
        -(candidate.order.priority as f64)
    }

    fn description(&self) -> &'static str {
        "Highest order priority"
    }
}

/// Cheapest route from the vehicle first.
#[derive(Debug, Clone, Copy)]
pub struct ByRouteCost;

impl RankingRule<OrderCandidate> for ByRouteCost {
    fn name(&self) -> &'static str {
        "COST"
    }

    fn evaluate(&self, candidate: &OrderCandidate) -> RuleScore {
        candidate.route.cost as f64
    }

    fn description(&self) -> &'static str {
        "Cheapest route"
    }
}

/// Earliest Due Date.
///
/// Orders without a deadline rank last.
#[derive(Debug, Clone, Copy)]
pub struct ByDeadline;

impl RankingRule<OrderCandidate> for ByDeadline {
    fn name(&self) -> &'static str {
        "EDD"
    }

    fn evaluate(&self, candidate: &OrderCandidate) -> RuleScore {
        candidate.order.deadline.map_or(f64::MAX, |d| d as f64)
    }

    fn description(&self) -> &'static str {
        "Earliest Due Date"
    }
}

/// First In First Out (by creation sequence).
#[derive(Debug, Clone, Copy)]
pub struct ByAge;

impl RankingRule<OrderCandidate> for ByAge {
    fn name(&self) -> &'static str {
        "FIFO"
    }

    fn evaluate(&self, candidate: &OrderCandidate) -> RuleScore {
        candidate.order.created_seq as f64
    }

    fn description(&self) -> &'static str {
        "First In First Out"
    }
}

// ======================== Position rules ========================

/// Best parking priority first; positions without one rank last.
#[derive(Debug, Clone, Copy)]
pub struct ByPositionPriority;

impl RankingRule<PositionCandidate> for ByPositionPriority {
    fn name(&self) -> &'static str {
        "PARKING_PRIORITY"
    }

    fn evaluate(&self, candidate: &PositionCandidate) -> RuleScore {
        match candidate.position.parking_priority {
            Some(p) => p as f64,
            None => f64::MAX,
        }
    }

    fn description(&self) -> &'static str {
        "Best parking priority"
    }
}

/// Nearest position first.
#[derive(Debug, Clone, Copy)]
pub struct ByPositionCost;

impl RankingRule<PositionCandidate> for ByPositionCost {
    fn name(&self) -> &'static str {
        "DISTANCE"
    }

    fn evaluate(&self, candidate: &PositionCandidate) -> RuleScore {
        candidate.route.cost as f64
    }

    fn description(&self) -> &'static str {
        "Nearest position"
    }
}

/// Builds the order ranking for the configured keys.
///
/// Fully tied candidates fall back to order ID.
pub fn order_ranking(keys: &[OrderRankingKey]) -> RankingEngine<OrderCandidate> {
    keys.iter()
        .fold(RankingEngine::new(), |engine, key| match key {
            OrderRankingKey::ByPriority => engine.with_rule(ByOrderPriority),
            OrderRankingKey::ByRouteCost => engine.with_rule(ByRouteCost),
            OrderRankingKey::ByDeadline => engine.with_rule(ByDeadline),
            OrderRankingKey::ByAge => engine.with_rule(ByAge),
        })
        .with_final_tie_breaker(TieBreaker::ById)
}

/// Nearest position first, then by name.
pub fn nearest_position_ranking() -> RankingEngine<PositionCandidate> {
    RankingEngine::new()
        .with_rule(ByPositionCost)
        .with_final_tie_breaker(TieBreaker::ById)
}

/// Best parking priority first, nearest among equals, then by name.
pub fn prioritized_position_ranking() -> RankingEngine<PositionCandidate> {
    RankingEngine::new()
        .with_rule(ByPositionPriority)
        .with_rule(ByPositionCost)
        .with_final_tie_breaker(TieBreaker::ById)
}
