//! Dispatch cycle driver.

use parking_lot::Mutex;
use tracing::{debug, info};

use super::{CycleReport, DispatchPipeline};
use crate::config::{ConfigError, DispatcherConfig};
use crate::phase::Collaborators;

/// Fleet event that asks for a dispatch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchTrigger {
    /// A vehicle became idle.
    VehicleIdle(String),
    /// A transport order was created.
    OrderCreated(String),
    /// An order was withdrawn.
    OrderWithdrawn(String),
    /// An order finished or failed.
    OrderFinished(String),
    /// A vehicle released resources.
    ResourcesReleased(String),
    /// The dispatcher configuration changed.
    ConfigurationChanged,
    /// Explicit request.
    Manual,
}

/// What a call to [`Dispatcher::trigger`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The calling thread ran `cycles` cycles (the requested one plus
    /// follow-ups for triggers that arrived meanwhile).
    Completed { cycles: u32 },
    /// A cycle was already running; it will run one follow-up cycle.
    Deferred,
}

#[derive(Debug, Default)]
struct DriverState {
    running: bool,
    pending: bool,
    cycles_completed: u64,
    last_report: Option<CycleReport>,
}

/// Serializes dispatch cycles.
///
/// At most one cycle runs at a time. A trigger arriving while a cycle
/// runs does not interrupt it; all such triggers are coalesced into a
/// single follow-up cycle run by the thread that owns the current one.
#[derive(Debug)]
pub struct Dispatcher {
    pipeline: DispatchPipeline,
    state: Mutex<DriverState>,
}

impl Dispatcher {
    /// Creates a dispatcher over `pipeline`.
    pub fn new(pipeline: DispatchPipeline) -> Self {
        Self {
            pipeline,
            state: Mutex::new(DriverState::default()),
        }
    }

    /// Validates `config` and builds the standard pipeline.
    pub fn from_config(config: &DispatcherConfig, collab: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::new(DispatchPipeline::from_config(config, collab)))
    }

    /// Requests a dispatch cycle.
    pub fn trigger(&self, trigger: DispatchTrigger) -> TriggerOutcome {
        {
            let mut state = self.state.lock();
            if state.running {
                state.pending = true;
                debug!(?trigger, "Cycle running, trigger deferred");
                return TriggerOutcome::Deferred;
            }
            state.running = true;
        }

        debug!(?trigger, "Dispatch cycle started");
        let mut cycles = 0;
        loop {
            let report = self.pipeline.run_cycle();
            cycles += 1;

            let mut state = self.state.lock();
            state.cycles_completed += 1;
            info!(
                cycle = state.cycles_completed,
                elapsed_us = report.elapsed.as_micros() as u64,
                panicked = report.panicked.len(),
                "Dispatch cycle finished"
            );
            state.last_report = Some(report);
            if state.pending {
                state.pending = false;
                continue;
            }
            state.running = false;
            break;
        }

        TriggerOutcome::Completed { cycles }
    }

    /// Number of cycles run so far.
    pub fn cycles_completed(&self) -> u64 {
        self.state.lock().cycles_completed
    }

    /// Report of the most recent cycle.
    pub fn last_report(&self) -> Option<CycleReport> {
        self.state.lock().last_report.clone()
    }

    /// The pipeline this dispatcher runs.
    pub fn pipeline(&self) -> &DispatchPipeline {
        &self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier, OnceLock, Weak};
    use std::thread;
    use std::time::Duration;

    use crate::config::OrderRankingKey;
    use crate::models::{OrderSpec, OrderState, Resource, Topology, Vehicle};
    use crate::phase::fixtures::Fixture;
    use crate::phase::Phase;
    use crate::services::OrderService;

    /// Triggers its own dispatcher from inside the first cycle.
    struct Reentrant {
        dispatcher: Arc<OnceLock<Weak<Dispatcher>>>,
        runs: Arc<AtomicUsize>,
        inner_outcome: Arc<parking_lot::Mutex<Option<TriggerOutcome>>>,
    }

    impl Phase for Reentrant {
        fn name(&self) -> &'static str {
            "reentrant"
        }
        fn run(&self) {
            if self.runs.fetch_add(1, Ordering::SeqCst) == 0 {
                if let Some(d) = self.dispatcher.get().and_then(Weak::upgrade) {
                    *self.inner_outcome.lock() = Some(d.trigger(DispatchTrigger::Manual));
                }
            }
        }
    }

    #[test]
    fn test_trigger_during_cycle_is_deferred() {
        let cell = Arc::new(OnceLock::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let inner = Arc::new(parking_lot::Mutex::new(None));
        let dispatcher = Arc::new(Dispatcher::new(DispatchPipeline::new().with_phase(
            Reentrant {
                dispatcher: cell.clone(),
                runs: runs.clone(),
                inner_outcome: inner.clone(),
            },
        )));
        cell.set(Arc::downgrade(&dispatcher)).unwrap();

        let outcome = dispatcher.trigger(DispatchTrigger::VehicleIdle("V1".into()));

        assert_eq!(*inner.lock(), Some(TriggerOutcome::Deferred));
        assert_eq!(outcome, TriggerOutcome::Completed { cycles: 2 });
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(dispatcher.cycles_completed(), 2);
    }

    /// Records the maximum number of concurrent runs.
    struct Overlap {
        active: Arc<AtomicUsize>,
        max: Arc<AtomicUsize>,
    }

    impl Phase for Overlap {
        fn name(&self) -> &'static str {
            "overlap"
        }
        fn run(&self) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(2));
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_cycles_never_overlap() {
        let active = Arc::new(AtomicUsize::new(0));
        let max = Arc::new(AtomicUsize::new(0));
        let dispatcher = Arc::new(Dispatcher::new(DispatchPipeline::new().with_phase(Overlap {
            active: active.clone(),
            max: max.clone(),
        })));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let d = dispatcher.clone();
                let b = barrier.clone();
                thread::spawn(move || {
                    b.wait();
                    for _ in 0..5 {
                        d.trigger(DispatchTrigger::Manual);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(max.load(Ordering::SeqCst), 1);
        assert!(dispatcher.cycles_completed() >= 1);
        assert!(dispatcher.cycles_completed() <= 40);
        // Idle again: the next trigger runs on this thread
        assert_eq!(
            dispatcher.trigger(DispatchTrigger::Manual),
            TriggerOutcome::Completed { cycles: 1 }
        );
    }

    #[test]
    fn test_panic_in_phase_does_not_wedge_driver() {
        struct Boom;
        impl Phase for Boom {
            fn name(&self) -> &'static str {
                "boom"
            }
            fn run(&self) {
                panic!("boom");
            }
        }

        let dispatcher = Dispatcher::new(DispatchPipeline::new().with_phase(Boom));
        assert_eq!(
            dispatcher.trigger(DispatchTrigger::Manual),
            TriggerOutcome::Completed { cycles: 1 }
        );
        assert_eq!(
            dispatcher.trigger(DispatchTrigger::Manual),
            TriggerOutcome::Completed { cycles: 1 }
        );
        assert_eq!(dispatcher.last_report().unwrap().panicked, vec!["boom"]);
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let fx = Fixture::new(Topology::new());
        let config = DispatcherConfig::default().with_order_priorities(vec![
            OrderRankingKey::ByAge,
            OrderRankingKey::ByAge,
        ]);
        assert!(Dispatcher::from_config(&config, fx.collab).is_err());
    }

    #[test]
    fn test_full_cycle_assigns_and_parks() {
        let topology = Topology::new()
            .with_resource(Resource::halt("A"))
            .with_resource(Resource::halt("B"))
            .with_resource(Resource::park("K"))
            .with_bidirectional_path("A", "B", 5)
            .with_bidirectional_path("A", "K", 1);
        let fx = Fixture::new(topology);
        fx.fleet.add_vehicle(Vehicle::new("V1").at("A"));
        fx.fleet.add_vehicle(Vehicle::new("V2").at("B"));
        fx.fleet
            .create_order(OrderSpec::transport(["B"]).with_id("O"))
            .unwrap();

        let dispatcher = Dispatcher::from_config(&DispatcherConfig::default(), fx.collab.clone()).unwrap();
        dispatcher.trigger(DispatchTrigger::OrderCreated("O".into()));

        let order = fx.fleet.fetch_order("O").unwrap();
        assert_eq!(order.state, OrderState::Active);
        assert_eq!(order.processing_vehicle.as_deref(), Some("V1"));
        // V2 found no order and was parked in the same cycle
        let v2 = fx.fleet.fetch_vehicle("V2").unwrap();
        let parking = fx.fleet.fetch_order(v2.order.as_deref().unwrap()).unwrap();
        assert_eq!(parking.destinations, vec!["K"]);
        assert_eq!(dispatcher.cycles_completed(), 1);
    }
}
