//! Sequential benchmark runner.
//!
//! Cases run one after another in catalogue order. Each goes through
//! `Idle -> SettingUp -> Warmup -> Measuring -> Reporting -> Idle`; an error or
//! panic in any phase jumps straight to `Reporting` with a failed result and the
//! runner moves on to the next case.
//!
//! Panics raised inside a case are caught and logged at debug level instead of
//! being printed by the default panic hook.

use std::cell::Cell;
use std::hint::black_box;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::alloc::AllocationCounter;
use crate::case::BenchmarkCase;
use crate::config::RunnerConfig;
use crate::error::{Error, Result};
use crate::measurement::{MeasurementResult, Phase};

/// Run every case in order with default options.
///
/// Equivalent to a [`BenchmarkRunner`] with [`RunnerConfig::default`] and the
/// given warm-up flag, without allocation tracking.
#[must_use]
pub fn run_all(cases: &mut [BenchmarkCase], warmup: bool) -> Vec<MeasurementResult> {
    BenchmarkRunner::new(RunnerConfig::default().with_warmup(warmup)).run_all(cases)
}

/// Executes benchmark cases and measures them.
pub struct BenchmarkRunner {
    config: RunnerConfig,
    allocations: Option<&'static dyn AllocationCounter>,
}

impl BenchmarkRunner {
    #[must_use]
    pub const fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            allocations: None,
        }
    }

    /// Sample `counter` around each timed window.
    ///
    /// Ignored when allocation tracking is disabled in the config or the
    /// counter reports itself inactive.
    #[must_use]
    pub fn with_allocation_counter(mut self, counter: &'static dyn AllocationCounter) -> Self {
        self.allocations = Some(counter);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Whether results will carry allocation figures.
    #[must_use]
    pub fn tracks_allocations(&self) -> bool {
        self.active_counter().is_some()
    }

    /// Run every case in order and collect the results.
    pub fn run_all(&self, cases: &mut [BenchmarkCase]) -> Vec<MeasurementResult> {
        let mut results = Vec::with_capacity(cases.len());
        self.run_all_with(cases, |result| results.push(result.clone()));
        results
    }

    /// Run every case in order, handing each result to `observer` as soon as
    /// the case finishes.
    pub fn run_all_with<F>(&self, cases: &mut [BenchmarkCase], mut observer: F)
    where
        F: FnMut(&MeasurementResult),
    {
        info!(
            cases = cases.len(),
            warmup = self.config.warmup(),
            "Running catalogue"
        );

        let mut failed = 0_usize;
        for case in cases.iter_mut() {
            let result = self.run_case(case);
            if !result.is_success() {
                failed = failed.saturating_add(1);
            }
            observer(&result);
            transition(case.name(), Phase::Reporting, Phase::Idle);
        }

        info!(cases = cases.len(), failed, "Catalogue finished");
    }

    /// Set up `cases` and run their warm-up invocations without timing them.
    ///
    /// Used for a separate, usually smaller, warm-up catalogue ahead of the
    /// measured run. Failures are logged and skipped. Returns the number of
    /// cases that warmed up cleanly.
    pub fn warm_up(&self, cases: &mut [BenchmarkCase]) -> usize {
        let invocations = self.config.warmup_iterations().max(1);
        let mut warmed = 0_usize;
        for case in cases.iter_mut() {
            let outcome = contained(|| case.prepare()).and_then(|()| {
                (0..invocations).try_for_each(|_| contained(|| case.invoke()).map(drop))
            });
            match outcome {
                Ok(()) => warmed = warmed.saturating_add(1),
                Err(e) => warn!(case = %case.name(), error = %e, "Warm-up failed"),
            }
        }

        info!(cases = cases.len(), warmed, invocations, "Warm-up pass finished");
        warmed
    }

    /// Run a single case through setup, warm-up and measurement.
    pub fn run_case(&self, case: &mut BenchmarkCase) -> MeasurementResult {
        let name = case.name().to_string();
        let workload = case.workload_label().map(str::to_string);
        let fail = |phase: Phase, iteration: Option<u64>, error: &Error| {
            warn!(case = %name, %phase, ?iteration, error = %error, "Case failed");
            transition(&name, phase, Phase::Reporting);
            MeasurementResult::failed(
                name.clone(),
                workload.clone(),
                phase,
                iteration,
                error.to_string(),
            )
        };

        transition(&name, Phase::Idle, Phase::SettingUp);
        if let Err(e) = contained(|| case.prepare()) {
            return fail(Phase::SettingUp, None, &e);
        }

        let mut phase = Phase::SettingUp;
        let warmup_iterations = self.config.warmup_iterations();
        if warmup_iterations > 0 {
            transition(&name, phase, Phase::Warmup);
            phase = Phase::Warmup;
            for iteration in 0..warmup_iterations {
                if let Err(e) = contained(|| case.invoke()) {
                    return fail(Phase::Warmup, Some(iteration), &e);
                }
            }
        }

        transition(&name, phase, Phase::Measuring);
        let iterations = case.iteration_count();
        let counter = self.active_counter();
        let mut checksum = 0_u64;

        let allocated_before = counter.map(|c| c.allocated_bytes());
        let start = Instant::now();
        for iteration in 0..iterations {
            match contained(|| case.invoke()) {
                Ok(value) => checksum = black_box(value),
                Err(e) => return fail(Phase::Measuring, Some(iteration), &e),
            }
        }
        let elapsed = start.elapsed();
        let allocated = counter
            .zip(allocated_before)
            .map(|(c, before)| c.allocated_bytes().saturating_sub(before));

        transition(&name, Phase::Measuring, Phase::Reporting);
        debug!(
            case = %name,
            iterations,
            ?elapsed,
            ?allocated,
            "Case measured"
        );

        MeasurementResult::completed(name, workload, iterations, elapsed, allocated, checksum)
    }

    fn active_counter(&self) -> Option<&'static dyn AllocationCounter> {
        self.allocations
            .filter(|counter| self.config.track_allocations() && counter.is_active())
    }
}

impl Default for BenchmarkRunner {
    fn default() -> Self {
        Self::new(RunnerConfig::default())
    }
}

fn transition(case: &str, from: Phase, to: Phase) {
    debug!(case, %from, %to, "Case phase transitioned");
}

thread_local! {
    static CONTAINING: Cell<bool> = const { Cell::new(false) };
}

static PANIC_HOOK: Once = Once::new();

/// Route panics raised inside [`contained`] to tracing; every other panic
/// still reaches the previously installed hook.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CONTAINING.with(Cell::get) {
                debug!(location = ?info.location(), "Contained panic in case");
            } else {
                previous(info);
            }
        }));
    });
}

/// Run `f`, turning a panic into [`Error::Panicked`].
fn contained<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    install_panic_hook();
    let outer = CONTAINING.with(|flag| flag.replace(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(f));
    CONTAINING.with(|flag| flag.set(outer));

    outcome.unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Err(Error::panicked(message))
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::indexing_slicing)]
    #![allow(clippy::arithmetic_side_effects)]

    use super::*;
    use crate::measurement::CaseStatus;
    use std::cell::{Cell, RefCell};
    use std::fmt;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Event fields the runner tests look at.
    #[derive(Debug, Default, Clone, PartialEq, Eq)]
    struct Recorded {
        message: String,
        from: Option<String>,
        to: Option<String>,
    }

    impl Visit for Recorded {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            let value = format!("{value:?}");
            match field.name() {
                "message" => self.message = value,
                "from" => self.from = Some(value),
                "to" => self.to = Some(value),
                _ => {}
            }
        }
    }

    /// Layer that keeps every event emitted on the current thread.
    #[derive(Clone, Default)]
    struct EventLog(Arc<Mutex<Vec<Recorded>>>);

    impl<S: tracing::Subscriber> Layer<S> for EventLog {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut recorded = Recorded::default();
            event.record(&mut recorded);
            self.0.lock().unwrap().push(recorded);
        }
    }

    impl EventLog {
        fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
            let subscriber = tracing_subscriber::registry().with(self.clone());
            tracing::subscriber::with_default(subscriber, f)
        }

        fn transitions(&self) -> Vec<(String, String)> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter_map(|event| event.from.clone().zip(event.to.clone()))
                .collect()
        }

        fn messages(&self) -> Vec<String> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .map(|event| event.message.clone())
                .collect()
        }
    }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
            .collect()
    }

    /// Counter that advances by a fixed step each time it is sampled.
    struct SteppingCounter {
        total: AtomicU64,
        step: u64,
    }

    impl AllocationCounter for SteppingCounter {
        fn allocated_bytes(&self) -> u64 {
            self.total.fetch_add(self.step, Ordering::Relaxed)
        }
    }

    struct InactiveCounter;

    impl AllocationCounter for InactiveCounter {
        fn allocated_bytes(&self) -> u64 {
            0
        }

        fn is_active(&self) -> bool {
            false
        }
    }

    static STEPPING: SteppingCounter = SteppingCounter {
        total: AtomicU64::new(0),
        step: 512,
    };

    static INACTIVE: InactiveCounter = InactiveCounter;

    #[test]
    fn test_setup_excluded_from_elapsed() {
        let mut cases = vec![
            BenchmarkCase::with_setup(
                "slow setup",
                || {
                    std::thread::sleep(Duration::from_millis(300));
                    Ok(7_u64)
                },
                |value: &mut u64| Ok(*value),
            )
            .iterations(3),
        ];

        let results = run_all(&mut cases, false);
        assert_eq!(results.len(), 1);
        assert!(results[0].is_success());
        assert!(results[0].elapsed() < Duration::from_millis(150));
        assert_eq!(results[0].checksum(), Some(7));
    }

    #[test]
    fn test_setup_runs_once_before_first_invocation() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let setup_events = Rc::clone(&events);
        let body_events = Rc::clone(&events);
        let mut cases = vec![
            BenchmarkCase::with_setup(
                "ordered",
                move || {
                    setup_events.borrow_mut().push("setup");
                    Ok(())
                },
                move |_: &mut ()| {
                    body_events.borrow_mut().push("body");
                    Ok(0)
                },
            )
            .iterations(2),
        ];

        let _ = run_all(&mut cases, true);
        assert_eq!(*events.borrow(), vec!["setup", "body", "body", "body"]);
    }

    #[test]
    fn test_warmup_invocations_are_discarded() {
        let calls = Rc::new(Cell::new(0_u64));
        let counter = Rc::clone(&calls);
        let mut cases = vec![
            BenchmarkCase::new("counted", move || {
                counter.set(counter.get() + 1);
                Ok(counter.get())
            })
            .iterations(2),
        ];

        let runner = BenchmarkRunner::new(RunnerConfig::new(true, 3, false).unwrap());
        let results = runner.run_all(&mut cases);
        assert_eq!(calls.get(), 5);
        assert_eq!(results[0].iterations(), 2);
        assert_eq!(results[0].checksum(), Some(5));
    }

    #[test]
    fn test_catalogue_order_preserved() {
        let mut cases: Vec<_> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|name| BenchmarkCase::new(name, || Ok(1)))
            .collect();
        let names: Vec<String> = run_all(&mut cases, false)
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_body_failure_does_not_stop_catalogue() {
        let calls = Rc::new(Cell::new(0_u64));
        let counter = Rc::clone(&calls);
        let mut cases = vec![
            BenchmarkCase::new("first", || Ok(1)),
            BenchmarkCase::new("failing", move || {
                counter.set(counter.get() + 1);
                if counter.get() == 2 {
                    Err(Error::workload_failed("injected"))
                } else {
                    Ok(0)
                }
            })
            .iterations(5),
            BenchmarkCase::new("last", || Ok(3)),
        ];

        let results = run_all(&mut cases, false);
        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert!(results[2].is_success());
        assert_eq!(calls.get(), 2);
        assert_eq!(
            results[1].status(),
            &CaseStatus::Failed {
                phase: Phase::Measuring,
                iteration: Some(1),
                reason: "workload failed: injected".to_string(),
            }
        );
    }

    #[test]
    fn test_setup_failure_skips_body() {
        let invoked = Rc::new(Cell::new(false));
        let flag = Rc::clone(&invoked);
        let mut cases = vec![
            BenchmarkCase::with_setup(
                "bad setup",
                || Err::<(), _>(Error::workload_failed("missing fixture")),
                move |_: &mut ()| {
                    flag.set(true);
                    Ok(0)
                },
            ),
            BenchmarkCase::new("next", || Ok(1)),
        ];

        let results = run_all(&mut cases, true);
        assert!(!invoked.get());
        assert!(matches!(
            results[0].status(),
            CaseStatus::Failed {
                phase: Phase::SettingUp,
                iteration: None,
                ..
            }
        ));
        assert!(results[1].is_success());
    }

    #[test]
    fn test_warmup_failure_reported_in_warmup_phase() {
        let mut cases = vec![BenchmarkCase::new("cold", || {
            Err(Error::workload_failed("always"))
        })];
        let results = run_all(&mut cases, true);
        assert!(matches!(
            results[0].status(),
            CaseStatus::Failed {
                phase: Phase::Warmup,
                iteration: Some(0),
                ..
            }
        ));
    }

    #[test]
    fn test_panicking_body_is_contained() {
        let mut cases = vec![
            BenchmarkCase::new("panics", || panic!("index blew up")),
            BenchmarkCase::new("after", || Ok(2)),
        ];
        let results = run_all(&mut cases, false);
        assert_eq!(results[0].failure_reason(), Some("panicked: index blew up"));
        assert!(results[1].is_success());
    }

    #[test]
    fn test_allocation_delta_from_counter() {
        let runner = BenchmarkRunner::default().with_allocation_counter(&STEPPING);
        assert!(runner.tracks_allocations());
        let mut case = BenchmarkCase::new("alloc", || Ok(0)).iterations(2);
        let result = runner.run_case(&mut case);
        // One sample before and one after: exactly one step apart
        assert_eq!(result.allocated_bytes(), Some(512));
        assert_eq!(result.allocated_per_iteration(), Some(256));
    }

    #[test]
    fn test_allocation_tracking_disabled() {
        let config = RunnerConfig::default().with_allocation_tracking(false);
        let runner = BenchmarkRunner::new(config).with_allocation_counter(&STEPPING);
        assert!(!runner.tracks_allocations());
        let mut case = BenchmarkCase::new("alloc", || Ok(0));
        assert_eq!(runner.run_case(&mut case).allocated_bytes(), None);
    }

    #[test]
    fn test_inactive_counter_ignored() {
        let runner = BenchmarkRunner::default().with_allocation_counter(&INACTIVE);
        let mut case = BenchmarkCase::new("alloc", || Ok(0));
        assert_eq!(runner.run_case(&mut case).allocated_bytes(), None);
    }

    #[test]
    fn test_observer_sees_each_result_in_order() {
        let mut cases = vec![
            BenchmarkCase::new("one", || Ok(1)),
            BenchmarkCase::new("two", || Err(Error::workload_failed("x"))),
            BenchmarkCase::new("three", || Ok(3)),
        ];
        let mut seen = Vec::new();
        BenchmarkRunner::default().run_all_with(&mut cases, |result| {
            seen.push((result.name().to_string(), result.is_success()));
        });
        assert_eq!(
            seen,
            vec![
                ("one".to_string(), true),
                ("two".to_string(), false),
                ("three".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_completed_case_walks_every_phase() {
        let log = EventLog::default();
        let mut cases = vec![BenchmarkCase::new("fine", || Ok(1))];
        let _ = log.capture(|| run_all(&mut cases, true));
        assert_eq!(
            log.transitions(),
            pairs(&[
                ("idle", "setting-up"),
                ("setting-up", "warmup"),
                ("warmup", "measuring"),
                ("measuring", "reporting"),
                ("reporting", "idle"),
            ])
        );
    }

    #[test]
    fn test_failed_case_transitions_through_reporting() {
        let log = EventLog::default();
        let mut cases = vec![
            BenchmarkCase::with_setup(
                "bad setup",
                || Err::<(), _>(Error::workload_failed("missing fixture")),
                |_: &mut ()| Ok(0),
            ),
            BenchmarkCase::new("bad body", || Err(Error::workload_failed("always"))),
        ];
        let _ = log.capture(|| run_all(&mut cases, false));
        assert_eq!(
            log.transitions(),
            pairs(&[
                ("idle", "setting-up"),
                ("setting-up", "reporting"),
                ("reporting", "idle"),
                ("idle", "setting-up"),
                ("setting-up", "measuring"),
                ("measuring", "reporting"),
                ("reporting", "idle"),
            ])
        );
    }

    #[test]
    fn test_contained_panic_goes_to_tracing() {
        let log = EventLog::default();
        let result = log.capture(|| contained::<u64>(|| panic!("quiet please")));
        assert!(matches!(result, Err(Error::Panicked { .. })));
        assert!(
            log.messages()
                .iter()
                .any(|message| message == "Contained panic in case")
        );
        assert!(!CONTAINING.with(Cell::get));
    }

    #[test]
    fn test_warm_up_prepares_and_discards() {
        let calls = Rc::new(Cell::new(0_u64));
        let counter = Rc::clone(&calls);
        let mut cases = vec![
            BenchmarkCase::new("counted", move || {
                counter.set(counter.get() + 1);
                Ok(0)
            }),
            BenchmarkCase::new("broken", || Err(Error::workload_failed("cold"))),
            BenchmarkCase::new("panics", || panic!("warm-up blew up")),
        ];

        let runner = BenchmarkRunner::new(RunnerConfig::new(true, 2, false).unwrap());
        assert_eq!(runner.warm_up(&mut cases), 1);
        assert_eq!(calls.get(), 2);
    }
}
