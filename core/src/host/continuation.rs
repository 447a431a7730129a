//! Continuations: one top-level script call and its resumption state

use std::fmt;

use crate::clock::WakeMode;
use crate::script::{ErrorInfo, Val, VM};

/// Opaque registry handle of a continuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContinuationId(pub u64);

impl fmt::Display for ContinuationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "co#{}", self.0)
    }
}

/// Where a continuation is in its life
#[derive(Debug, Clone, PartialEq)]
pub enum ContinuationState {
    /// Created; the entry call has not started yet
    Ready,
    /// Being driven by the resume engine
    Running,
    /// Parked in the suspension queue for `mode`
    Suspended { mode: WakeMode, wake_value: f64 },
    /// Returned normally; about to be released
    Finished,
    /// Raised an unrecovered error; about to be released
    Errored,
}

/// Result of driving a continuation once
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Finished(Val),
    Errored(ErrorInfo),
    Yielded,
}

impl Outcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, Outcome::Finished(_))
    }

    pub fn is_errored(&self) -> bool {
        matches!(self, Outcome::Errored(_))
    }

    pub fn is_yielded(&self) -> bool {
        matches!(self, Outcome::Yielded)
    }
}

/// Input waiting to be handed to a continuation on its next resume
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Pending {
    /// Start the entry call with these arguments
    Start(Vec<Val>),
    /// Deliver this value as the result of `suspend(...)`
    Resume(Val),
    Nothing,
}

#[derive(Debug)]
pub struct Continuation {
    pub id: ContinuationId,
    /// Name of the global function the call was started on
    pub entry: String,
    pub state: ContinuationState,
    pub(crate) vm: VM,
    pub(crate) pending: Pending,
}

impl Continuation {
    pub(crate) fn new(id: ContinuationId, entry: &str, args: Vec<Val>, max_call_depth: usize) -> Self {
        Self {
            id,
            entry: entry.to_string(),
            state: ContinuationState::Ready,
            vm: VM::new(max_call_depth),
            pending: Pending::Start(args),
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.state, ContinuationState::Suspended { .. })
    }
}
