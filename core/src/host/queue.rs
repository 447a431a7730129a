//! Suspension queues, one per clock domain
//!
//! Entries are ordered by wake value, then by insertion sequence, so entries
//! with equal wake values come out in the order they were filed.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::continuation::ContinuationId;
use crate::clock::WakeMode;

/* ===================== Drain Policy ===================== */

/// How many due entries a queue releases per tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainPolicy {
    /// Every entry due when the queue is inspected
    #[default]
    AllDue,
    /// Only the earliest entry, if it is due; the rest wait for later ticks
    OnePerTick,
}

impl fmt::Display for DrainPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrainPolicy::AllDue => write!(f, "all_due"),
            DrainPolicy::OnePerTick => write!(f, "one_per_tick"),
        }
    }
}

impl FromStr for DrainPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all_due" | "all-due" => Ok(DrainPolicy::AllDue),
            "one_per_tick" | "one-per-tick" => Ok(DrainPolicy::OnePerTick),
            other => Err(format!(
                "unknown drain policy '{}' (expected all_due or one_per_tick)",
                other
            )),
        }
    }
}

/* ===================== Queue ===================== */

/// Totally ordered wake value
#[derive(Debug, Clone, Copy)]
struct WakeKey(f64);

impl PartialEq for WakeKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for WakeKey {}

impl PartialOrd for WakeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WakeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug)]
pub struct SuspensionQueue {
    mode: WakeMode,
    entries: BTreeMap<(WakeKey, u64), ContinuationId>,
    next_seq: u64,
}

impl SuspensionQueue {
    pub fn new(mode: WakeMode) -> Self {
        Self {
            mode,
            entries: BTreeMap::new(),
            next_seq: 0,
        }
    }

    pub fn mode(&self) -> WakeMode {
        self.mode
    }

    pub fn push(&mut self, wake_value: f64, id: ContinuationId) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert((WakeKey(wake_value), seq), id);
    }

    /// Earliest entry as `(wake_value, id)`
    pub fn peek(&self) -> Option<(f64, ContinuationId)> {
        self.entries
            .first_key_value()
            .map(|(&(WakeKey(wake), _), &id)| (wake, id))
    }

    /// Remove the earliest entry if its wake value has been reached
    pub fn pop_due(&mut self, now: f64) -> Option<ContinuationId> {
        match self.peek() {
            Some((wake, _)) if wake <= now => self.entries.pop_first().map(|(_, id)| id),
            _ => None,
        }
    }

    /// Remove the entries `policy` releases at reading `now`, earliest first
    pub fn take_due(&mut self, now: f64, policy: DrainPolicy) -> Vec<ContinuationId> {
        let mut due = Vec::new();
        while let Some(id) = self.pop_due(now) {
            due.push(id);
            if policy == DrainPolicy::OnePerTick {
                break;
            }
        }
        due
    }

    pub fn contains(&self, id: ContinuationId) -> bool {
        self.entries.values().any(|&queued| queued == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The three queues of a host
#[derive(Debug)]
pub struct SuspensionQueues {
    frame: SuspensionQueue,
    simulation: SuspensionQueue,
    real: SuspensionQueue,
}

impl Default for SuspensionQueues {
    fn default() -> Self {
        Self::new()
    }
}

impl SuspensionQueues {
    pub fn new() -> Self {
        Self {
            frame: SuspensionQueue::new(WakeMode::FrameCount),
            simulation: SuspensionQueue::new(WakeMode::SimulationTime),
            real: SuspensionQueue::new(WakeMode::RealTime),
        }
    }

    pub fn get(&self, mode: WakeMode) -> &SuspensionQueue {
        match mode {
            WakeMode::FrameCount => &self.frame,
            WakeMode::SimulationTime => &self.simulation,
            WakeMode::RealTime => &self.real,
        }
    }

    pub fn get_mut(&mut self, mode: WakeMode) -> &mut SuspensionQueue {
        match mode {
            WakeMode::FrameCount => &mut self.frame,
            WakeMode::SimulationTime => &mut self.simulation,
            WakeMode::RealTime => &mut self.real,
        }
    }

    /// Total entries across all queues
    pub fn len(&self) -> usize {
        self.frame.len() + self.simulation.len() + self.real.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queues currently holding `id`
    pub fn modes_holding(&self, id: ContinuationId) -> Vec<WakeMode> {
        WakeMode::ALL
            .into_iter()
            .filter(|&mode| self.get(mode).contains(id))
            .collect()
    }
}
