//! Clock domains and host clock sources
//!
//! The scheduler owns exactly one piece of time state, the frame counter.
//! Simulation time and real time are read from a [`HostClock`] on demand.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

/* ===================== Wake Modes ===================== */

/// The clock domain a suspended continuation waits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WakeMode {
    /// Logical frame counter, advanced once per tick
    FrameCount,
    /// Host simulation ("game") time in milliseconds
    SimulationTime,
    /// Host wall-clock time in milliseconds
    RealTime,
}

impl WakeMode {
    /// All modes, in the order the scheduler inspects their queues
    pub const ALL: [WakeMode; 3] = [
        WakeMode::FrameCount,
        WakeMode::SimulationTime,
        WakeMode::RealTime,
    ];

    /// Parse the script-facing mode string (`"f"`, `"g"` or `"r"`)
    pub fn from_script(mode: &str) -> Option<Self> {
        match mode {
            "f" => Some(WakeMode::FrameCount),
            "g" => Some(WakeMode::SimulationTime),
            "r" => Some(WakeMode::RealTime),
            _ => None,
        }
    }

    pub fn as_script(&self) -> &'static str {
        match self {
            WakeMode::FrameCount => "f",
            WakeMode::SimulationTime => "g",
            WakeMode::RealTime => "r",
        }
    }
}

impl fmt::Display for WakeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WakeMode::FrameCount => write!(f, "frame"),
            WakeMode::SimulationTime => write!(f, "simulation"),
            WakeMode::RealTime => write!(f, "real"),
        }
    }
}

/// A relative suspension request produced by the `suspend` native
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WakeRequest {
    pub mode: WakeMode,
    pub duration: f64,
}

impl WakeRequest {
    pub fn new(mode: WakeMode, duration: f64) -> Self {
        Self { mode, duration }
    }

    /// Absolute wake value for this request given the current readings
    pub fn wake_value(&self, readings: &ClockReadings) -> f64 {
        readings.reading(self.mode) + self.duration
    }
}

/* ===================== Readings ===================== */

/// Snapshot of all three clocks
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClockReadings {
    pub frame: u64,
    pub simulation: f64,
    pub real: f64,
}

impl ClockReadings {
    pub fn reading(&self, mode: WakeMode) -> f64 {
        match mode {
            WakeMode::FrameCount => self.frame as f64,
            WakeMode::SimulationTime => self.simulation,
            WakeMode::RealTime => self.real,
        }
    }
}

/* ===================== Host Clocks ===================== */

/// External time source supplied by the host application
pub trait HostClock {
    /// Current simulation time in milliseconds
    fn simulation_time(&self) -> f64;

    /// Current real time in milliseconds
    fn real_time(&self) -> f64;
}

/// Monotonic clock backed by [`Instant`]
///
/// Simulation time runs at `time_scale` times real speed and stops advancing
/// while paused.
#[derive(Debug)]
pub struct SystemClock {
    start: Instant,
    time_scale: f64,
    /// Simulation time accumulated before the current segment began
    sim_base: Cell<f64>,
    /// Real time at which the current simulation segment began
    segment_start: Cell<f64>,
    paused: Cell<bool>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::with_time_scale(1.0)
    }

    pub fn with_time_scale(time_scale: f64) -> Self {
        Self {
            start: Instant::now(),
            time_scale,
            sim_base: Cell::new(0.0),
            segment_start: Cell::new(0.0),
            paused: Cell::new(false),
        }
    }

    pub fn pause(&self) {
        if self.paused.get() {
            return;
        }
        self.sim_base.set(self.simulation_time());
        self.paused.set(true);
    }

    pub fn unpause(&self) {
        if !self.paused.get() {
            return;
        }
        self.segment_start.set(self.real_time());
        self.paused.set(false);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.get()
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for SystemClock {
    fn simulation_time(&self) -> f64 {
        if self.paused.get() {
            return self.sim_base.get();
        }
        self.sim_base.get() + (self.real_time() - self.segment_start.get()) * self.time_scale
    }

    fn real_time(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock
///
/// Clones share the same underlying readings, so a test (or a replay driver)
/// can keep one handle while the host owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    simulation: Rc<Cell<f64>>,
    real: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_simulation(&self, ms: f64) {
        self.simulation.set(ms);
    }

    pub fn set_real(&self, ms: f64) {
        self.real.set(ms);
    }

    pub fn advance_simulation(&self, ms: f64) {
        self.simulation.set(self.simulation.get() + ms);
    }

    pub fn advance_real(&self, ms: f64) {
        self.real.set(self.real.get() + ms);
    }
}

impl HostClock for ManualClock {
    fn simulation_time(&self) -> f64 {
        self.simulation.get()
    }

    fn real_time(&self) -> f64 {
        self.real.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wake_mode_from_script() {
        assert_eq!(WakeMode::from_script("f"), Some(WakeMode::FrameCount));
        assert_eq!(WakeMode::from_script("g"), Some(WakeMode::SimulationTime));
        assert_eq!(WakeMode::from_script("r"), Some(WakeMode::RealTime));
        assert_eq!(WakeMode::from_script("x"), None);
        assert_eq!(WakeMode::from_script("frames"), None);
        assert_eq!(WakeMode::from_script(""), None);
    }

    #[test]
    fn test_wake_value_uses_matching_reading() {
        let readings = ClockReadings {
            frame: 10,
            simulation: 500.0,
            real: 9000.0,
        };

        assert_eq!(
            WakeRequest::new(WakeMode::FrameCount, 3.0).wake_value(&readings),
            13.0
        );
        assert_eq!(
            WakeRequest::new(WakeMode::SimulationTime, 100.0).wake_value(&readings),
            600.0
        );
        assert_eq!(
            WakeRequest::new(WakeMode::RealTime, 1.0).wake_value(&readings),
            9001.0
        );
    }

    #[test]
    fn test_manual_clock_handles_share_state() {
        let clock = ManualClock::new();
        let handle = clock.clone();

        handle.advance_simulation(250.0);
        handle.set_real(42.0);

        assert_eq!(clock.simulation_time(), 250.0);
        assert_eq!(clock.real_time(), 42.0);
    }

    #[test]
    fn test_system_clock_pause_freezes_simulation() {
        let clock = SystemClock::with_time_scale(2.0);
        clock.pause();
        let frozen = clock.simulation_time();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(clock.simulation_time(), frozen);
        assert!(clock.is_paused());

        clock.unpause();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(clock.simulation_time() > frozen);
    }
}
