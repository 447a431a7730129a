//! Error reporting
//!
//! Every unrecovered failure ends up here as an [`ErrorReport`]. Reporting is
//! purely observational: the host keeps running whatever is reported.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::error;

use super::continuation::ContinuationId;
use super::error::LoadError;
use crate::script::errors::{self, ErrorInfo};
use crate::script::{Traceback, Val, VmFault};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Script source could not be read, parsed or compiled
    Load,
    /// A script raised an error no handler caught
    Runtime,
    /// The VM hit an internal invariant violation
    Panic,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportKind::Load => write!(f, "load"),
            ReportKind::Runtime => write!(f, "runtime"),
            ReportKind::Panic => write!(f, "panic"),
        }
    }
}

/// One operand stack slot, as it appears in a panic dump
#[derive(Debug, Clone, PartialEq)]
pub struct SlotDump {
    pub index: usize,
    pub type_name: &'static str,
    pub value: String,
}

impl SlotDump {
    pub fn of(index: usize, val: &Val) -> Self {
        Self {
            index,
            type_name: val.type_name(),
            value: val.to_string(),
        }
    }

    pub fn dump(stack: &[Val]) -> Vec<SlotDump> {
        stack
            .iter()
            .enumerate()
            .map(|(i, v)| SlotDump::of(i, v))
            .collect()
    }
}

impl fmt::Display for SlotDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_name {
            "string" => write!(f, "{}: string: '{}'", self.index, self.value),
            "boolean" => write!(f, "{}: boolean {}", self.index, self.value),
            "number" => write!(f, "{}: number: {}", self.index, self.value),
            other => write!(f, "{}: {}", self.index, other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub kind: ReportKind,
    pub code: String,
    pub message: String,
    /// Continuation the failure happened in, if any
    pub continuation: Option<ContinuationId>,
    pub traceback: Option<Traceback>,
    /// Operand stack at the time of a panic, bottom first
    pub stack_dump: Vec<SlotDump>,
}

impl ErrorReport {
    pub fn load(err: &LoadError) -> Self {
        Self {
            kind: ReportKind::Load,
            code: errors::LOAD_ERROR.to_string(),
            message: err.to_string(),
            continuation: None,
            traceback: None,
            stack_dump: Vec::new(),
        }
    }

    pub fn runtime(
        info: &ErrorInfo,
        traceback: Option<Traceback>,
        continuation: Option<ContinuationId>,
    ) -> Self {
        Self {
            kind: ReportKind::Runtime,
            code: info.code.clone(),
            message: info.message.clone(),
            continuation,
            traceback,
            stack_dump: Vec::new(),
        }
    }

    pub fn panic(fault: &VmFault, stack: &[Val], continuation: Option<ContinuationId>) -> Self {
        Self {
            kind: ReportKind::Panic,
            code: errors::PANIC.to_string(),
            message: fault.to_string(),
            continuation,
            traceback: None,
            stack_dump: SlotDump::dump(stack),
        }
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.code, self.message)?;
        if let Some(id) = self.continuation {
            write!(f, " (in {})", id)?;
        }
        if let Some(traceback) = self.traceback.as_ref().filter(|t| !t.is_empty()) {
            write!(f, "\n{}", traceback)?;
        }
        if !self.stack_dump.is_empty() {
            write!(f, "\nstack dump:")?;
            for slot in &self.stack_dump {
                write!(f, "\n\t{}", slot)?;
            }
        }
        Ok(())
    }
}

/* ===================== Reporters ===================== */

pub trait ErrorReporter {
    fn report(&self, report: &ErrorReport);
}

/// Logs every report at error level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, report: &ErrorReport) {
        error!(
            target: "cadence::host",
            kind = %report.kind,
            code = %report.code,
            "{}",
            report
        );
    }
}

/// Keeps reports in memory; clones share the same list
#[derive(Debug, Clone, Default)]
pub struct CollectingReporter {
    reports: Rc<RefCell<Vec<ErrorReport>>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<ErrorReport> {
        self.reports.borrow().clone()
    }

    pub fn take(&self) -> Vec<ErrorReport> {
        std::mem::take(&mut *self.reports.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.reports.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, report: &ErrorReport) {
        self.reports.borrow_mut().push(report.clone());
    }
}
