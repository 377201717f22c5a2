//! Ordered phase pipeline.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::config::DispatcherConfig;
use crate::phase::{
    panic_message, AssignOrdersPhase, Collaborators, ParkIdleVehiclesPhase, Phase,
    PrioritizedParkingPhase, PrioritizedReparkPhase, RechargeIdleVehiclesPhase,
};

/// Result of one pass over the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Phases that ran to completion, in execution order.
    pub completed: Vec<&'static str>,
    /// Phases that panicked. The cycle continued past each of them.
    pub panicked: Vec<&'static str>,
    /// Wall-clock duration of the cycle.
    pub elapsed: Duration,
}

impl CycleReport {
    /// Whether every phase completed.
    pub fn is_clean(&self) -> bool {
        self.panicked.is_empty()
    }
}

/// A fixed, ordered sequence of phases.
///
/// Phases run sequentially on the calling thread; each one observes the
/// commits of the phases before it.
#[derive(Default)]
pub struct DispatchPipeline {
    phases: Vec<Box<dyn Phase>>,
}

impl DispatchPipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self { phases: Vec::new() }
    }

    /// Builds the standard pipeline.
    ///
    /// Order: assign orders, recharge, repark, prioritized parking, park.
    /// Every phase is present; each checks its own configuration gate.
    pub fn from_config(config: &DispatcherConfig, collab: Collaborators) -> Self {
        Self::new()
            .with_phase(AssignOrdersPhase::new(collab.clone(), config))
            .with_phase(RechargeIdleVehiclesPhase::new(collab.clone(), config))
            .with_phase(PrioritizedReparkPhase::new(collab.clone(), config))
            .with_phase(PrioritizedParkingPhase::new(collab.clone(), config))
            .with_phase(ParkIdleVehiclesPhase::new(collab, config))
    }

    /// Appends a phase.
    pub fn with_phase<P: Phase + 'static>(mut self, phase: P) -> Self {
        self.phases.push(Box::new(phase));
        self
    }

    /// Names of the phases in execution order.
    pub fn phase_names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|p| p.name()).collect()
    }

    /// Number of phases.
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Whether the pipeline has no phases.
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Runs every phase once, in order.
    ///
    /// A panicking phase is contained and logged; the remaining phases
    /// still run.
    pub fn run_cycle(&self) -> CycleReport {
        let start = Instant::now();
        let mut report = CycleReport::default();

        for phase in &self.phases {
            let name = phase.name();
            match catch_unwind(AssertUnwindSafe(|| phase.run())) {
                Ok(()) => {
                    debug!(phase = name, "Phase finished");
                    report.completed.push(name);
                }
                Err(payload) => {
                    error!(phase = name, cause = %panic_message(payload.as_ref()), "Phase panicked");
                    report.panicked.push(name);
                }
            }
        }

        report.elapsed = start.elapsed();
        report
    }
}

impl std::fmt::Debug for DispatchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchPipeline")
            .field("phases", &self.phase_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    use crate::models::{OrderKind, OrderSpec, OrderState, Resource, Topology, Vehicle};
    use crate::phase::fixtures::Fixture;
    use crate::services::OrderService;

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Phase for Recording {
        fn name(&self) -> &'static str {
            self.name
        }
        fn run(&self) {
            self.log.lock().push(self.name);
        }
    }

    struct Exploding;

    impl Phase for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }
        fn run(&self) {
            panic!("collaborator vanished");
        }
    }

    #[test]
    fn test_standard_phase_order() {
        let fx = Fixture::new(Topology::new());
        let pipeline = DispatchPipeline::from_config(&DispatcherConfig::default(), fx.collab);
        assert_eq!(
            pipeline.phase_names(),
            vec![
                "assign_orders",
                "recharge_idle_vehicles",
                "prioritized_repark",
                "prioritized_parking",
                "park_idle_vehicles",
            ]
        );
    }

    #[test]
    fn test_phases_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = DispatchPipeline::new()
            .with_phase(Recording { name: "first", log: log.clone() })
            .with_phase(Recording { name: "second", log: log.clone() });

        let report = pipeline.run_cycle();

        assert_eq!(*log.lock(), vec!["first", "second"]);
        assert_eq!(report.completed, vec!["first", "second"]);
        assert!(report.is_clean());
    }

    #[test]
    fn test_panicking_phase_is_contained() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipeline = DispatchPipeline::new()
            .with_phase(Exploding)
            .with_phase(Recording { name: "after", log: log.clone() });

        let report = pipeline.run_cycle();

        assert_eq!(report.panicked, vec!["exploding"]);
        assert_eq!(report.completed, vec!["after"]);
        assert_eq!(*log.lock(), vec!["after"]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_earlier_commits_visible_to_later_phases() {
        let topology = Topology::new()
            .with_resource(Resource::halt("A"))
            .with_resource(Resource::halt("B"))
            .with_resource(Resource::park("K"))
            .with_bidirectional_path("A", "B", 4)
            .with_bidirectional_path("A", "K", 1);
        let fx = Fixture::new(topology);
        fx.fleet.add_vehicle(Vehicle::new("V1").at("A"));
        fx.fleet
            .create_order(OrderSpec::transport(["B"]).with_id("O"))
            .unwrap();

        let pipeline = DispatchPipeline::from_config(&DispatcherConfig::default(), fx.collab.clone());
        let report = pipeline.run_cycle();

        assert!(report.is_clean());
        assert_eq!(fx.fleet.fetch_order("O").unwrap().state, OrderState::Active);
        // Parking ran after assignment and saw the vehicle busy
        assert!(fx
            .fleet
            .fetch_orders(&|o| o.kind == OrderKind::Parking)
            .is_empty());
    }
}
