//! Rule engine for multi-criteria candidate ranking.
//!
//! Composes ranking rules with configurable evaluation modes and
//! tie-breaking strategies. Used both for ordering transport orders and
//! for ordering candidate positions.
//!
//! # Reference
//! Haupt (1989), "A Survey of Priority Rule-Based Scheduling"

use std::cmp::Ordering;
use std::sync::Arc;

/// Score produced by a rule. Lower = better.
pub type RuleScore = f64;

/// A single ranking criterion over candidates of type `C`.
pub trait RankingRule<C>: Send + Sync {
    /// Rule name (for debugging and logging).
    fn name(&self) -> &'static str;

    /// Scores a candidate. Lower scores rank first.
    fn evaluate(&self, candidate: &C) -> RuleScore;

    /// Human-readable description.
    fn description(&self) -> &'static str {
        self.name()
    }
}

/// Candidates with a stable identity, used by [`TieBreaker::ById`].
pub trait Ranked {
    /// Identifier compared lexicographically on full ties.
    fn ranking_id(&self) -> &str;
}

/// How multiple rules are combined.
#[derive(Debug, Clone, Default)]
pub enum EvaluationMode {
    /// Apply rules in sequence; use next rule only on ties.
    #[default]
    Sequential,
    /// Compute weighted sum of all rule scores.
    Weighted,
}

/// How ties are broken after all rules are exhausted.
#[derive(Debug, Clone, Default)]
pub enum TieBreaker {
    /// Keep input order (the sort is stable).
    #[default]
    InputOrder,
    /// Deterministic by candidate ID (lexicographic).
    ById,
}

struct WeightedRule<C> {
    rule: Arc<dyn RankingRule<C>>,
    weight: f64,
}

impl<C> Clone for WeightedRule<C> {
    fn clone(&self) -> Self {
        Self {
            rule: Arc::clone(&self.rule),
            weight: self.weight,
        }
    }
}

/// A composable ranking engine.
///
/// Supports sequential multi-layer evaluation (primary rule → tie-breaker)
/// and weighted combination modes.
///
/// # Example
/// ```
/// use u_fleet::selection::{rules, OrderCandidate, RankingEngine, TieBreaker};
///
/// let engine: RankingEngine<OrderCandidate> = RankingEngine::new()
///     .with_rule(rules::ByOrderPriority)
///     .with_rule(rules::ByRouteCost)
///     .with_final_tie_breaker(TieBreaker::ById);
/// assert_eq!(engine.rule_count(), 2);
/// ```
pub struct RankingEngine<C> {
    rules: Vec<WeightedRule<C>>,
    mode: EvaluationMode,
    tie_breaker: TieBreaker,
    epsilon: f64,
}

impl<C> RankingEngine<C> {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            mode: EvaluationMode::Sequential,
            tie_breaker: TieBreaker::InputOrder,
            epsilon: 1e-9,
        }
    }

    /// Adds a primary rule (weight 1.0).
    pub fn with_rule<R: RankingRule<C> + 'static>(self, rule: R) -> Self {
        self.with_weighted_rule(rule, 1.0)
    }

    /// Adds a weighted rule.
    pub fn with_weighted_rule<R: RankingRule<C> + 'static>(mut self, rule: R, weight: f64) -> Self {
        self.rules.push(WeightedRule {
            rule: Arc::new(rule),
            weight,
        });
        self
    }

    /// Adds a tie-breaking rule (weight 0.0, used only in Sequential mode).
    pub fn with_tie_breaker<R: RankingRule<C> + 'static>(self, rule: R) -> Self {
        self.with_weighted_rule(rule, 0.0)
    }

    /// Sets the evaluation mode.
    pub fn with_mode(mut self, mode: EvaluationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the final tie-breaking strategy.
    pub fn with_final_tie_breaker(mut self, tie_breaker: TieBreaker) -> Self {
        self.tie_breaker = tie_breaker;
        self
    }

    /// Number of configured rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Evaluates a single candidate and returns scores from each rule.
    pub fn evaluate(&self, candidate: &C) -> Vec<RuleScore> {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(candidate) * wr.weight)
            .collect()
    }

    fn weighted_score(&self, candidate: &C) -> f64 {
        self.rules
            .iter()
            .map(|wr| wr.rule.evaluate(candidate) * wr.weight)
            .sum()
    }

    fn compare_scores(&self, a: &[RuleScore], b: &[RuleScore]) -> Ordering {
        for (sa, sb) in a.iter().zip(b) {
            if (sa - sb).abs() > self.epsilon {
                return sa.partial_cmp(sb).unwrap_or(Ordering::Equal);
            }
        }
        Ordering::Equal
    }
}

impl<C: Ranked> RankingEngine<C> {
    /// Sorts candidates best-first.
    ///
    /// Returns indices into the original slice. The sort is stable, so
    /// fully tied candidates keep their input order under
    /// [`TieBreaker::InputOrder`].
    pub fn sort_indices(&self, candidates: &[C]) -> Vec<usize> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut indices: Vec<usize> = (0..candidates.len()).collect();

        match &self.mode {
            EvaluationMode::Sequential => {
                // Raw scores; weights only matter in Weighted mode.
                let scores: Vec<Vec<RuleScore>> = candidates
                    .iter()
                    .map(|c| self.rules.iter().map(|wr| wr.rule.evaluate(c)).collect())
                    .collect();
                indices.sort_by(|&a, &b| {
                    self.compare_scores(&scores[a], &scores[b])
                        .then_with(|| self.break_tie(&candidates[a], &candidates[b]))
                });
            }
            EvaluationMode::Weighted => {
                let scores: Vec<f64> = candidates.iter().map(|c| self.weighted_score(c)).collect();
                indices.sort_by(|&a, &b| {
                    scores[a]
                        .partial_cmp(&scores[b])
                        .unwrap_or(Ordering::Equal)
                        .then_with(|| self.break_tie(&candidates[a], &candidates[b]))
                });
            }
        }

        indices
    }

    /// Returns the index of the best candidate.
    pub fn select_best(&self, candidates: &[C]) -> Option<usize> {
        self.sort_indices(candidates).first().copied()
    }

    /// Consumes `candidates` and returns them best-first.
    pub fn rank(&self, candidates: Vec<C>) -> Vec<C> {
        let order = self.sort_indices(&candidates);
        let mut slots: Vec<Option<C>> = candidates.into_iter().map(Some).collect();
        order
            .into_iter()
            .filter_map(|i| slots[i].take())
            .collect()
    }

    fn break_tie(&self, a: &C, b: &C) -> Ordering {
        match &self.tie_breaker {
            TieBreaker::InputOrder => Ordering::Equal,
            TieBreaker::ById => a.ranking_id().cmp(b.ranking_id()),
        }
    }
}

impl<C> Default for RankingEngine<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for RankingEngine<C> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            mode: self.mode.clone(),
            tie_breaker: self.tie_breaker.clone(),
            epsilon: self.epsilon,
        }
    }
}

impl<C> std::fmt::Debug for RankingEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankingEngine")
            .field(
                "rules",
                &self
                    .rules
                    .iter()
                    .map(|r| format!("{}(w={})", r.rule.name(), r.weight))
                    .collect::<Vec<_>>(),
            )
            .field("mode", &self.mode)
            .field("tie_breaker", &self.tie_breaker)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Item {
        id: &'static str,
        cost: f64,
        urgency: f64,
    }

    impl Ranked for Item {
        fn ranking_id(&self) -> &str {
            self.id
        }
    }

    struct ByCost;
    impl RankingRule<Item> for ByCost {
        fn name(&self) -> &'static str {
            "cost"
        }
        fn evaluate(&self, c: &Item) -> RuleScore {
            c.cost
        }
    }

    struct ByUrgency;
    impl RankingRule<Item> for ByUrgency {
        fn name(&self) -> &'static str {
            "urgency"
        }
        fn evaluate(&self, c: &Item) -> RuleScore {
            c.urgency
        }
    }

    fn item(id: &'static str, cost: f64, urgency: f64) -> Item {
        Item { id, cost, urgency }
    }

    #[test]
    fn test_single_rule_ordering() {
        let items = vec![item("long", 50.0, 0.0), item("short", 10.0, 0.0), item("mid", 30.0, 0.0)];
        let engine = RankingEngine::new().with_rule(ByCost);
        let idx = engine.sort_indices(&items);
        assert_eq!(idx, vec![1, 2, 0]);
    }

    #[test]
    fn test_sequential_with_tie_breaker() {
        let items = vec![item("A", 10.0, 5.0), item("B", 10.0, 1.0)];
        let engine = RankingEngine::new().with_rule(ByCost).with_tie_breaker(ByUrgency);
        // Cost ties → urgency breaks it → B first
        assert_eq!(engine.select_best(&items), Some(1));
    }

    #[test]
    fn test_weighted_mode() {
        let items = vec![item("A", 10.0, 50.0), item("B", 50.0, 10.0)];
        let engine = RankingEngine::new()
            .with_mode(EvaluationMode::Weighted)
            .with_weighted_rule(ByCost, 0.9)
            .with_weighted_rule(ByUrgency, 0.1);
        // A: 9 + 5 = 14; B: 45 + 1 = 46
        assert_eq!(engine.select_best(&items), Some(0));
    }

    #[test]
    fn test_input_order_is_stable() {
        let items = vec![item("B", 1.0, 0.0), item("A", 1.0, 0.0), item("C", 1.0, 0.0)];
        let engine = RankingEngine::new().with_rule(ByCost);
        assert_eq!(engine.sort_indices(&items), vec![0, 1, 2]);
    }

    #[test]
    fn test_by_id_tie_breaker() {
        let items = vec![item("B", 1.0, 0.0), item("A", 1.0, 0.0)];
        let engine = RankingEngine::new()
            .with_rule(ByCost)
            .with_final_tie_breaker(TieBreaker::ById);
        let ranked = engine.rank(items);
        assert_eq!(ranked[0].id, "A");
        assert_eq!(ranked[1].id, "B");
    }

    #[test]
    fn test_empty_candidates() {
        let engine: RankingEngine<Item> = RankingEngine::new().with_rule(ByCost);
        assert!(engine.sort_indices(&[]).is_empty());
        assert!(engine.select_best(&[]).is_none());
        assert!(engine.rank(Vec::new()).is_empty());
    }

    #[test]
    fn test_evaluate_scores() {
        let engine = RankingEngine::new().with_rule(ByCost).with_tie_breaker(ByUrgency);
        let scores = engine.evaluate(&item("T", 3.0, 7.0));
        assert_eq!(scores.len(), 2);
        assert!((scores[0] - 3.0).abs() < 1e-10);
        assert!(scores[1].abs() < 1e-10); // tie-breaker weight is zero
    }
}
