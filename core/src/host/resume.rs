//! The resume/yield engine
//!
//! `resume_state` is the only place a continuation is driven forward, and the
//! only place its registry entry and queue placement change.

use tracing::{debug, trace, warn};

use super::continuation::{ContinuationId, ContinuationState, Outcome, Pending};
use super::reporter::ErrorReport;
use super::ScriptHost;
use crate::clock::{ClockReadings, WakeRequest};
use crate::script::errors::{self, ErrorInfo};
use crate::script::vm::error_info_of;
use crate::script::{run_until_done, Control, ExecEnv, NativeCtx, Traceback, Val, VmFault, VM};

/// How a VM run stopped
#[derive(Debug)]
pub(crate) enum RunEnd {
    Returned(Val),
    Threw(ErrorInfo, Option<Traceback>),
    Suspended(WakeRequest),
    /// Internal fault, with the operand stack as it was
    Faulted(VmFault, Vec<Val>),
}

impl RunEnd {
    pub(crate) fn classify(vm: &mut VM, result: Result<(), VmFault>) -> Self {
        if let Err(fault) = result {
            return RunEnd::Faulted(fault, std::mem::take(&mut vm.stack));
        }
        match &vm.control {
            Control::Return(v) => RunEnd::Returned(v.clone()),
            Control::Throw(v) => RunEnd::Threw(error_info_of(v), vm.traceback.take()),
            // Stays in place so the VM can be resumed later
            Control::Suspend(request) => RunEnd::Suspended(*request),
            Control::None => RunEnd::Faulted(VmFault::NoFrame, std::mem::take(&mut vm.stack)),
        }
    }
}

impl ScriptHost {
    /// Drive continuation `id` until it finishes, fails or suspends again
    ///
    /// Any pending input (entry arguments, or the value `suspend(...)` should
    /// return) is handed over first. A finished or failed continuation is
    /// released; a suspended one is filed into the queue for its clock.
    pub fn resume_state(&mut self, id: ContinuationId) -> Outcome {
        let readings = self.readings();

        let Some(cont) = self.registry.get_mut(id) else {
            warn!(target: "cadence::scheduler", %id, "resume of unregistered continuation ignored");
            return Outcome::Errored(ErrorInfo::new(
                errors::PANIC,
                format!("{} is not registered", id),
            ));
        };
        cont.state = ContinuationState::Running;

        let mut env = ExecEnv {
            globals: &mut self.globals,
            natives: &self.natives,
            ctx: NativeCtx::new(readings, true),
        };

        let started = match std::mem::replace(&mut cont.pending, Pending::Nothing) {
            Pending::Start(args) => {
                let callee = env.globals.get(&cont.entry).cloned();
                match callee {
                    Some(callee) => cont.vm.start_call(callee, args, &mut env).map(|_| ()),
                    None => cont
                        .vm
                        .raise(ErrorInfo::new(
                            errors::UNDEFINED_VARIABLE,
                            format!("entry function '{}' is not defined", cont.entry),
                        ))
                        .map(|_| ()),
                }
            }
            Pending::Resume(value) => {
                cont.vm.resume(value);
                Ok(())
            }
            Pending::Nothing => Ok(()),
        };
        let result = started.and_then(|_| run_until_done(&mut cont.vm, &mut env));

        match RunEnd::classify(&mut cont.vm, result) {
            RunEnd::Suspended(request) => {
                // Clocks may have moved while the script ran
                let at_suspend = ClockReadings {
                    frame: self.frame,
                    simulation: self.clock.simulation_time(),
                    real: self.clock.real_time(),
                };
                let wake_value = request.wake_value(&at_suspend);
                cont.state = ContinuationState::Suspended {
                    mode: request.mode,
                    wake_value,
                };
                self.queues.get_mut(request.mode).push(wake_value, id);
                trace!(
                    target: "cadence::scheduler",
                    %id,
                    mode = %request.mode,
                    wake_value,
                    "continuation suspended"
                );
                Outcome::Yielded
            }
            RunEnd::Returned(value) => {
                cont.state = ContinuationState::Finished;
                self.registry.release(id);
                debug!(target: "cadence::host", %id, "continuation finished");
                Outcome::Finished(value)
            }
            RunEnd::Threw(info, traceback) => {
                cont.state = ContinuationState::Errored;
                self.registry.release(id);
                self.reporter
                    .report(&ErrorReport::runtime(&info, traceback, Some(id)));
                Outcome::Errored(info)
            }
            RunEnd::Faulted(fault, stack) => {
                cont.state = ContinuationState::Errored;
                self.registry.release(id);
                self.reporter
                    .report(&ErrorReport::panic(&fault, &stack, Some(id)));
                Outcome::Errored(ErrorInfo::new(errors::PANIC, fault.to_string()))
            }
        }
    }
}
