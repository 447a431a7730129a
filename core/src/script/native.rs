//! Host-provided (native) functions
//!
//! Natives receive an explicit [`NativeCtx`] on every call instead of looking
//! up a process-wide engine pointer. Any state a plugin needs is captured by
//! the closure it registers.

use std::collections::BTreeMap;
use std::rc::Rc;

use super::errors::{self, ErrorInfo};
use super::values::Val;
use crate::clock::{ClockReadings, WakeRequest};

/// Per-call context handed to every native function
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NativeCtx {
    /// Clock readings for the tick the call runs in
    pub readings: ClockReadings,
    /// Whether the caller runs inside a continuation that may suspend
    pub suspendable: bool,
}

impl NativeCtx {
    pub fn new(readings: ClockReadings, suspendable: bool) -> Self {
        Self {
            readings,
            suspendable,
        }
    }
}

/// Result of calling a native function
#[derive(Debug, Clone, PartialEq)]
pub enum NativeResult {
    /// Returned normally
    Value(Val),
    /// Asked the scheduler to park the calling continuation
    Suspend(WakeRequest),
    /// Raised an error into the calling script
    Throw(ErrorInfo),
}

impl NativeResult {
    pub fn throw(code: &str, message: impl Into<String>) -> Self {
        NativeResult::Throw(ErrorInfo::new(code, message))
    }
}

pub type NativeFn = Rc<dyn Fn(&mut NativeCtx, &[Val]) -> NativeResult>;

/// Table of native functions, keyed by their script-visible name
///
/// Names of the form `table.name` are exposed as members of a global object
/// `table` rather than as globals of their own.
#[derive(Clone, Default)]
pub struct NativeRegistry {
    fns: BTreeMap<String, NativeFn>,
}

impl std::fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeRegistry")
            .field("names", &self.fns.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a global native function
    pub fn register<F>(&mut self, name: &str, f: F)
    where
        F: Fn(&mut NativeCtx, &[Val]) -> NativeResult + 'static,
    {
        self.fns.insert(name.to_string(), Rc::new(f));
    }

    /// Register a native as a member of the global object `table`
    pub fn register_in<F>(&mut self, table: &str, name: &str, f: F)
    where
        F: Fn(&mut NativeCtx, &[Val]) -> NativeResult + 'static,
    {
        self.register(&format!("{}.{}", table, name), f);
    }

    pub fn get(&self, name: &str) -> Option<NativeFn> {
        self.fns.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fns.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fns.is_empty()
    }

    pub fn clear(&mut self) {
        self.fns.clear();
    }

    /// Bind every registered native into `globals`
    ///
    /// Plain names become `Val::Native` globals; `table.name` entries are
    /// inserted into (or create) the global object `table`.
    pub fn bind_globals(&self, globals: &mut std::collections::HashMap<String, Val>) {
        for name in self.fns.keys() {
            match name.split_once('.') {
                None => {
                    globals.insert(name.clone(), Val::Native(name.clone()));
                }
                Some((table, member)) => {
                    let entry = globals
                        .entry(table.to_string())
                        .or_insert_with(|| Val::obj(BTreeMap::new()));
                    if !matches!(entry, Val::Obj(_)) {
                        *entry = Val::obj(BTreeMap::new());
                    }
                    if let Val::Obj(fields) = entry {
                        fields
                            .borrow_mut()
                            .insert(member.to_string(), Val::Native(name.clone()));
                    }
                }
            }
        }
    }
}

/* ===================== Argument Helpers ===================== */

/// Fetch argument `idx` as a number or produce the standard type error
pub fn arg_num(args: &[Val], idx: usize, fname: &str) -> Result<f64, ErrorInfo> {
    match args.get(idx) {
        Some(Val::Num(n)) => Ok(*n),
        Some(other) => Err(ErrorInfo::new(
            errors::WRONG_ARG_TYPE,
            format!(
                "bad argument #{} to '{}' (number expected, got {})",
                idx + 1,
                fname,
                other.type_name()
            ),
        )),
        None => Err(ErrorInfo::new(
            errors::WRONG_ARG_COUNT,
            format!("bad argument #{} to '{}' (number expected, got no value)", idx + 1, fname),
        )),
    }
}
