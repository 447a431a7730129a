//! # Script host
//!
//! Owns one script runtime (globals and natives), the continuation registry
//! and the three suspension queues, and drives them from the host's frame
//! loop.
//!
//! ```text
//! do_call(entry, args) ──► new Continuation ──► resume_state ──┬─► Finished / Errored (released)
//!                                                              └─► Yielded (filed in a queue)
//! tick() ──► frame += 1 ──► due entries of each queue ──► resume_state ──► ...
//! ```
//!
//! Everything runs on the caller's thread. Nothing here ever panics on script
//! failure: errors go to the [`ErrorReporter`] and come back as
//! [`Outcome::Errored`].

pub mod continuation;
pub mod error;
pub mod plugin;
pub mod queue;
pub mod registry;
pub mod reporter;
pub mod resume;
pub mod scheduler;
pub mod suspend;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};

use crate::clock::{ClockReadings, HostClock, SystemClock, WakeMode};
use crate::config::Config;
use crate::script::errors;
use crate::script::vm::DEFAULT_MAX_CALL_DEPTH;
use crate::script::{
    compile_script, parse_script, run_until_done, stdlib, CompiledScript, ErrorInfo, ExecEnv,
    NativeCtx, NativeRegistry, Val, VM,
};

pub use continuation::{ContinuationId, ContinuationState, Outcome};
pub use error::LoadError;
pub use plugin::{HostEvent, ScriptPlugin};
pub use queue::{DrainPolicy, SuspensionQueue, SuspensionQueues};
pub use registry::ContinuationRegistry;
pub use reporter::{
    CollectingReporter, ErrorReport, ErrorReporter, ReportKind, SlotDump, TracingReporter,
};
pub use scheduler::TickReport;

use continuation::Continuation;
use resume::RunEnd;

/// File extension of script files picked up from directories
pub const SCRIPT_EXTENSION: &str = "cds";

/// Parse and compile one script
pub fn compile_source(name: &str, text: &str) -> Result<CompiledScript, LoadError> {
    let script = parse_script(text).map_err(|source| LoadError::Parse {
        name: name.to_string(),
        source,
    })?;
    compile_script(&script, name).map_err(|source| LoadError::Compile {
        name: name.to_string(),
        source,
    })
}

/// Expand directories into their script files, sorted by path
pub fn collect_script_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, LoadError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let entries = std::fs::read_dir(path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
            let mut found: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| {
                    p.is_file() && p.extension().is_some_and(|ext| ext == SCRIPT_EXTENSION)
                })
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

/* ===================== Builder ===================== */

pub struct HostBuilder {
    clock: Option<Box<dyn HostClock>>,
    reporter: Option<Box<dyn ErrorReporter>>,
    drain_policy: DrainPolicy,
    max_call_depth: usize,
    plugins: Vec<Box<dyn ScriptPlugin>>,
}

impl HostBuilder {
    pub fn new() -> Self {
        Self {
            clock: None,
            reporter: None,
            drain_policy: DrainPolicy::default(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            plugins: Vec::new(),
        }
    }

    /// Time source for simulation and real time (default: [`SystemClock`])
    pub fn clock(mut self, clock: impl HostClock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Where unrecovered errors go (default: [`TracingReporter`])
    pub fn reporter(mut self, reporter: impl ErrorReporter + 'static) -> Self {
        self.reporter = Some(Box::new(reporter));
        self
    }

    pub fn drain_policy(mut self, policy: DrainPolicy) -> Self {
        self.drain_policy = policy;
        self
    }

    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn plugin(mut self, plugin: impl ScriptPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn build(self) -> ScriptHost {
        ScriptHost {
            globals: HashMap::new(),
            natives: NativeRegistry::new(),
            registry: ContinuationRegistry::new(),
            queues: SuspensionQueues::new(),
            frame: 0,
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock::new())),
            reporter: self.reporter.unwrap_or_else(|| Box::new(TracingReporter)),
            plugins: self.plugins,
            drain_policy: self.drain_policy,
            max_call_depth: self.max_call_depth,
            initialized: false,
            last_continuation: None,
        }
    }
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/* ===================== Host ===================== */

pub struct ScriptHost {
    globals: HashMap<String, Val>,
    natives: NativeRegistry,
    registry: ContinuationRegistry,
    queues: SuspensionQueues,
    /// Logical frame counter, advanced once per tick
    frame: u64,
    clock: Box<dyn HostClock>,
    reporter: Box<dyn ErrorReporter>,
    plugins: Vec<Box<dyn ScriptPlugin>>,
    drain_policy: DrainPolicy,
    max_call_depth: usize,
    initialized: bool,
    last_continuation: Option<ContinuationId>,
}

impl ScriptHost {
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    /// Host with a system clock and tracing reporter, tuned by `config`
    pub fn from_config(config: &Config) -> Self {
        HostBuilder::new()
            .clock(SystemClock::with_time_scale(config.driver.time_scale))
            .drain_policy(config.scheduler.drain_policy)
            .max_call_depth(config.scheduler.max_call_depth)
            .build()
    }

    /// Attach a plugin; its functions are registered by the next `init()`
    pub fn add_plugin(&mut self, plugin: impl ScriptPlugin + 'static) {
        if self.initialized {
            warn!(
                target: "cadence::host",
                plugin = plugin.name(),
                "plugin added after init(); its functions are registered on the next init()"
            );
        }
        self.plugins.push(Box::new(plugin));
    }

    /// Register the standard library, `suspend` and every plugin's functions
    pub fn init(&mut self) {
        if self.initialized {
            warn!(target: "cadence::host", "init() called again; re-registering natives");
        }

        self.natives.clear();
        stdlib::install(&mut self.natives);
        self.natives.register(suspend::SUSPEND_FN, suspend::suspend);
        for plugin in &mut self.plugins {
            plugin.register_functions(&mut self.natives);
            debug!(target: "cadence::host", plugin = plugin.name(), "plugin registered");
        }
        self.natives.bind_globals(&mut self.globals);
        self.initialized = true;

        debug!(
            target: "cadence::host",
            natives = self.natives.len(),
            plugins = self.plugins.len(),
            "script host initialized"
        );
    }

    /* ---------- loading ---------- */

    /// Load and run a script file's top level
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Outcome {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => self.run_source(&path.display().to_string(), &text),
            Err(source) => self.fail_load(LoadError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Compile `text`, bind its functions and run its top level
    ///
    /// The top level runs to completion immediately; it is not a
    /// continuation, so `suspend` there throws.
    pub fn run_source(&mut self, name: &str, text: &str) -> Outcome {
        if !self.initialized {
            return self.fail_load(LoadError::NotInitialized);
        }
        let compiled = match compile_source(name, text) {
            Ok(compiled) => compiled,
            Err(err) => return self.fail_load(err),
        };

        for proto in &compiled.functions {
            self.globals
                .insert(proto.name.clone(), Val::Func(Rc::clone(proto)));
        }
        debug!(
            target: "cadence::host",
            script = name,
            functions = compiled.functions.len(),
            "script loaded"
        );

        let readings = self.readings();
        let mut vm = VM::new(self.max_call_depth);
        let mut env = ExecEnv {
            globals: &mut self.globals,
            natives: &self.natives,
            ctx: NativeCtx::new(readings, false),
        };
        let result = vm
            .start_call(Val::Func(compiled.main), Vec::new(), &mut env)
            .and_then(|_| run_until_done(&mut vm, &mut env));

        match RunEnd::classify(&mut vm, result) {
            RunEnd::Returned(v) => Outcome::Finished(v),
            RunEnd::Threw(info, traceback) => {
                self.reporter
                    .report(&ErrorReport::runtime(&info, traceback, None));
                Outcome::Errored(info)
            }
            RunEnd::Faulted(fault, stack) => {
                self.reporter
                    .report(&ErrorReport::panic(&fault, &stack, None));
                Outcome::Errored(ErrorInfo::new(errors::PANIC, fault.to_string()))
            }
            // Not suspendable, so the VM throws instead of stopping here
            RunEnd::Suspended(_) => Outcome::Errored(ErrorInfo::new(
                errors::SUSPEND_OUTSIDE_CONTINUATION,
                "attempt to suspend outside of a continuation",
            )),
        }
    }

    /// Run every script under `paths` (files, or directories of `.cds`
    /// files in sorted order); returns how many ran to completion
    pub fn load_scripts(&mut self, paths: &[PathBuf]) -> usize {
        let files = match collect_script_files(paths) {
            Ok(files) => files,
            Err(err) => {
                self.fail_load(err);
                return 0;
            }
        };
        files
            .iter()
            .filter(|file| self.run_file(file).is_finished())
            .count()
    }

    fn fail_load(&mut self, err: LoadError) -> Outcome {
        let report = ErrorReport::load(&err);
        self.reporter.report(&report);
        Outcome::Errored(ErrorInfo::new(errors::LOAD_ERROR, err.to_string()))
    }

    /* ---------- calls ---------- */

    /// Start a continuation on global function `entry` and resume it once
    pub fn do_call(&mut self, entry: &str, args: Vec<Val>) -> Outcome {
        if !self.initialized {
            return self.fail_load(LoadError::NotInitialized);
        }

        let id = self.registry.allocate_id();
        self.registry
            .insert(Continuation::new(id, entry, args, self.max_call_depth));
        self.last_continuation = Some(id);
        debug!(target: "cadence::host", %id, entry, "continuation started");

        self.resume_state(id)
    }

    /// Forward an input event to every plugin; true if any consumed it
    pub fn on_event(&mut self, event: &HostEvent) -> bool {
        let mut consumed = false;
        for plugin in &mut self.plugins {
            consumed |= plugin.on_event(event);
        }
        consumed
    }

    /* ---------- state ---------- */

    pub fn set_global(&mut self, name: &str, value: Val) {
        self.globals.insert(name.to_string(), value);
    }

    pub fn global(&self, name: &str) -> Option<Val> {
        self.globals.get(name).cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    pub fn drain_policy(&self) -> DrainPolicy {
        self.drain_policy
    }

    /// Live continuations (running or suspended)
    pub fn registered_count(&self) -> usize {
        self.registry.len()
    }

    pub fn is_registered(&self, id: ContinuationId) -> bool {
        self.registry.contains(id)
    }

    pub fn queue_len(&self, mode: WakeMode) -> usize {
        self.queues.get(mode).len()
    }

    pub fn queues(&self) -> &SuspensionQueues {
        &self.queues
    }

    /// State of a live continuation; `None` once it has been released
    pub fn continuation_state(&self, id: ContinuationId) -> Option<ContinuationState> {
        self.registry.state(id).cloned()
    }

    /// Id of the most recently started continuation
    pub fn last_continuation(&self) -> Option<ContinuationId> {
        self.last_continuation
    }

    pub fn natives(&self) -> &NativeRegistry {
        &self.natives
    }

    /// Current readings of all three clocks
    pub fn readings(&self) -> ClockReadings {
        ClockReadings {
            frame: self.frame,
            simulation: self.clock.simulation_time(),
            real: self.clock.real_time(),
        }
    }

    fn reading(&self, mode: WakeMode) -> f64 {
        match mode {
            WakeMode::FrameCount => self.frame as f64,
            WakeMode::SimulationTime => self.clock.simulation_time(),
            WakeMode::RealTime => self.clock.real_time(),
        }
    }
}
