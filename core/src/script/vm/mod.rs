//! # Resumable stack VM
//!
//! ## Core Principles
//!
//! 1. **Stack-driven execution**: all state lives in `frames`, `stack` and
//!    `handlers`; the interpreter never recurses on the Rust call stack
//! 2. **Instruction-level stepping**: `step()` executes exactly one instruction
//! 3. **Centralized control flow**: [`Control`] records return, throw and suspend
//! 4. **Pure executor**: no clocks, no queues; a VM just runs until it
//!    finishes, throws or suspends, and can then be resumed later
//!
//! Because a suspended VM is plain data, a continuation is simply a parked VM.

pub mod exec_loop;
pub mod ops;
pub mod traceback;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

use super::bytecode::Proto;
use super::errors::{self, ErrorInfo};
use super::native::{NativeCtx, NativeRegistry};
use super::values::Val;
use crate::clock::WakeRequest;

pub use exec_loop::{run_until_done, step};
pub use traceback::{TraceFrame, Traceback};

/// Default bound on nested script calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 200;

/* ===================== Control Flow ===================== */

/// Control flow state
///
/// Anything other than `None` stops the VM. `Suspend` is the only state a VM
/// can be resumed from.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    None,
    Return(Val),
    Throw(Val),
    Suspend(WakeRequest),
}

/// Result of executing one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Continue to next step
    Continue,
    /// Execution stopped; inspect `vm.control`
    Done,
}

/// Internal invariant violation
///
/// These never come from script mistakes; they mean the bytecode or the VM
/// state is corrupt. They are returned, never raised with `panic!`, so the
/// host can report them and keep running.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmFault {
    #[error("operand stack underflow in '{function}' at pc {pc}")]
    StackUnderflow { function: String, pc: usize },

    #[error("invalid local slot {slot} in '{function}'")]
    BadLocal { function: String, slot: usize },

    #[error("program counter {pc} out of range in '{function}'")]
    BadJump { function: String, pc: usize },

    #[error("exception handler refers to a frame that no longer exists")]
    BadHandler,

    #[error("no active frame and no result")]
    NoFrame,
}

/* ===================== Frames ===================== */

/// One active script function call
#[derive(Debug, Clone)]
pub struct Frame {
    pub proto: Rc<Proto>,
    /// Index of the next instruction
    pub pc: usize,
    /// Stack index of local slot 0; the callee sits at `base - 1`
    pub base: usize,
}

/// An installed `catch` target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handler {
    /// Number of frames alive when the handler was installed
    pub frame_depth: usize,
    /// Operand stack height to restore before entering the catch block
    pub stack_len: usize,
    pub catch_pc: usize,
}

/* ===================== Execution Environment ===================== */

/// Everything outside the VM an instruction may touch
pub struct ExecEnv<'a> {
    pub globals: &'a mut HashMap<String, Val>,
    pub natives: &'a NativeRegistry,
    pub ctx: NativeCtx,
}

/* ===================== VM ===================== */

/// Virtual Machine state
#[derive(Debug, Clone)]
pub struct VM {
    /// Stack of active calls
    pub frames: Vec<Frame>,

    /// Operand stack (locals and temporaries of every frame)
    pub stack: Vec<Val>,

    /// Installed exception handlers, innermost last
    pub handlers: Vec<Handler>,

    /// Current control flow state
    pub control: Control,

    /// Call stack captured when an error escaped every handler
    pub traceback: Option<Traceback>,

    pub max_call_depth: usize,
}

impl Default for VM {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALL_DEPTH)
    }
}

impl VM {
    pub fn new(max_call_depth: usize) -> Self {
        VM {
            frames: Vec::new(),
            stack: Vec::new(),
            handlers: Vec::new(),
            control: Control::None,
            traceback: None,
            max_call_depth,
        }
    }

    /// Begin calling `callee` with `args`
    ///
    /// A script function gets a frame and runs on the next `step()`. A native
    /// runs immediately; its outcome is reflected in `control`.
    pub fn start_call(
        &mut self,
        callee: Val,
        args: Vec<Val>,
        env: &mut ExecEnv<'_>,
    ) -> Result<Step, VmFault> {
        let argc = args.len();
        self.stack.push(callee);
        self.stack.extend(args);
        exec_loop::call_value(self, env, argc)
    }

    /// Resume a suspended VM
    ///
    /// `value` becomes the result of the `suspend(...)` call that parked it.
    /// Returns false (and changes nothing) if the VM is not suspended.
    pub fn resume(&mut self, value: Val) -> bool {
        if !matches!(self.control, Control::Suspend(_)) {
            return false;
        }
        self.control = Control::None;
        exec_loop::push_result(self, value);
        true
    }

    /// Raise `error` as if the current instruction had thrown it
    pub fn raise(&mut self, error: ErrorInfo) -> Result<Step, VmFault> {
        exec_loop::throw(self, Val::Error(error))
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self.control, Control::Suspend(_))
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.control, Control::Return(_) | Control::Throw(_))
    }
}

/// Error info for any thrown value
///
/// Errors raised by the runtime already carry a code; other thrown values
/// (`throw "boom"`) are reported under the generic user error code.
pub fn error_info_of(thrown: &Val) -> ErrorInfo {
    match thrown {
        Val::Error(info) => info.clone(),
        other => ErrorInfo::new(errors::USER_ERROR, other.to_string()),
    }
}
