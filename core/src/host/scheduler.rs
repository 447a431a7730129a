//! The per-frame scheduler tick

use tracing::trace;

use super::continuation::{ContinuationId, Outcome, Pending};
use super::ScriptHost;
use crate::clock::WakeMode;
use crate::script::Val;

/// What one tick resumed, in resume order
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Frame counter after the tick advanced it
    pub frame: u64,
    pub resumed: Vec<(ContinuationId, Outcome)>,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.resumed.is_empty()
    }

    pub fn outcome(&self, id: ContinuationId) -> Option<&Outcome> {
        self.resumed
            .iter()
            .find(|(resumed, _)| *resumed == id)
            .map(|(_, outcome)| outcome)
    }
}

impl ScriptHost {
    /// Advance the frame counter and resume whatever has come due
    ///
    /// Queues are inspected in frame, simulation, real order, each against
    /// its clock reading at inspection time. Which entries the tick releases
    /// is fixed before any of them runs, so a continuation that suspends
    /// again during this tick waits for a later one.
    pub fn tick(&mut self) -> TickReport {
        self.frame += 1;

        let mut due: Vec<(ContinuationId, f64)> = Vec::new();
        for mode in WakeMode::ALL {
            let now = self.reading(mode);
            let released = self.queues.get_mut(mode).take_due(now, self.drain_policy);
            due.extend(released.into_iter().map(|id| (id, now)));
        }

        let mut resumed = Vec::with_capacity(due.len());
        for (id, now) in due {
            if let Some(cont) = self.registry.get_mut(id) {
                cont.pending = Pending::Resume(Val::Num(now));
            }
            trace!(target: "cadence::scheduler", %id, frame = self.frame, "resuming continuation");
            let outcome = self.resume_state(id);
            resumed.push((id, outcome));
        }

        TickReport {
            frame: self.frame,
            resumed,
        }
    }
}
