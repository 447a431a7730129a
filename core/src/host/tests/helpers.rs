//! Test helpers for host tests

use crate::clock::ManualClock;
use crate::host::{
    CollectingReporter, ContinuationId, DrainPolicy, Outcome, ScriptHost, TickReport,
};
use crate::script::Val;

pub const SOURCE: &str = "test.cds";

/// An initialized host on a hand-driven clock, with its reports collected
pub struct TestHost {
    pub host: ScriptHost,
    pub clock: ManualClock,
    pub reports: CollectingReporter,
}

impl TestHost {
    pub fn new() -> Self {
        Self::with_policy(DrainPolicy::AllDue)
    }

    pub fn with_policy(policy: DrainPolicy) -> Self {
        let clock = ManualClock::new();
        let reports = CollectingReporter::new();
        let mut host = ScriptHost::builder()
            .clock(clock.clone())
            .reporter(reports.clone())
            .drain_policy(policy)
            .build();
        host.init();
        Self {
            host,
            clock,
            reports,
        }
    }

    /// Load `source` and insist its top level finished cleanly
    pub fn load(&mut self, source: &str) {
        let outcome = self.host.run_source(SOURCE, source);
        assert!(
            outcome.is_finished(),
            "Load failed: {:?} / {:?}",
            outcome,
            self.reports.reports()
        );
    }

    /// `do_call` that returns the id of the new continuation as well
    pub fn call(&mut self, entry: &str, args: Vec<Val>) -> (ContinuationId, Outcome) {
        let outcome = self.host.do_call(entry, args);
        let id = self
            .host
            .last_continuation()
            .expect("No continuation was started");
        (id, outcome)
    }

    pub fn tick_n(&mut self, n: usize) -> Vec<TickReport> {
        (0..n).map(|_| self.host.tick()).collect()
    }
}

pub fn num(n: f64) -> Val {
    Val::Num(n)
}

/// Error code of an errored outcome, or a panic describing what happened instead
pub fn errored_code(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Errored(info) => info.code.clone(),
        other => panic!("Expected errored outcome, got {:?}", other),
    }
}

/// Global list `name` as a vector of its items
pub fn global_list(host: &ScriptHost, name: &str) -> Vec<Val> {
    match host.global(name) {
        Some(Val::List(items)) => items.borrow().clone(),
        other => panic!("Expected global list '{}', got {:?}", name, other),
    }
}
