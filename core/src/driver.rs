//! Frame driver
//!
//! Calls [`ScriptHost::tick`] at a fixed frame rate on the current task until
//! a frame limit is hit, nothing is left to run, or Ctrl-C arrives. The host
//! is not `Send`, so the loop runs where it is awaited.

use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::DriverConfig;
use crate::host::{Outcome, ScriptHost};

#[derive(Debug, Clone, PartialEq)]
pub struct DriverOptions {
    pub frame_rate: u32,
    pub max_frames: Option<u64>,
    pub exit_when_idle: bool,
    /// Stop on Ctrl-C
    pub handle_ctrl_c: bool,
}

impl DriverOptions {
    pub fn from_config(config: &DriverConfig) -> Self {
        Self {
            frame_rate: config.frame_rate,
            max_frames: config.max_frames,
            exit_when_idle: config.exit_when_idle,
            handle_ctrl_c: true,
        }
    }

    fn frame_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self::from_config(&DriverConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    MaxFrames,
    Idle,
    Interrupted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::MaxFrames => write!(f, "frame limit reached"),
            StopReason::Idle => write!(f, "no continuations left"),
            StopReason::Interrupted => write!(f, "interrupted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverSummary {
    /// Ticks run by this driver
    pub frames: u64,
    /// Continuation resumes across all ticks
    pub resumed: usize,
    pub finished: usize,
    pub errored: usize,
    pub stop: StopReason,
}

/// Resolves when `signal` fires; a signal that fails to install never resolves
async fn interrupt_from<F>(signal: F)
where
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!(
            target: "cadence::host",
            error = %e,
            "failed to listen for Ctrl-C, driver runs uninterruptible"
        );
        std::future::pending::<()>().await;
    }
}

pub async fn run_frames(host: &mut ScriptHost, options: DriverOptions) -> DriverSummary {
    let mut interval = tokio::time::interval(options.frame_period());
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let ctrl_c = async {
        if options.handle_ctrl_c {
            interrupt_from(tokio::signal::ctrl_c()).await;
        } else {
            std::future::pending::<()>().await;
        }
    };
    tokio::pin!(ctrl_c);

    let mut summary = DriverSummary {
        frames: 0,
        resumed: 0,
        finished: 0,
        errored: 0,
        stop: StopReason::Idle,
    };

    debug!(
        target: "cadence::scheduler",
        frame_rate = options.frame_rate,
        max_frames = ?options.max_frames,
        "frame driver started"
    );

    loop {
        if options.exit_when_idle && host.registered_count() == 0 {
            summary.stop = StopReason::Idle;
            break;
        }
        if options.max_frames.is_some_and(|max| summary.frames >= max) {
            summary.stop = StopReason::MaxFrames;
            break;
        }

        tokio::select! {
            _ = interval.tick() => {
                let report = host.tick();
                summary.frames += 1;
                summary.resumed += report.resumed.len();
                for (_, outcome) in &report.resumed {
                    match outcome {
                        Outcome::Finished(_) => summary.finished += 1,
                        Outcome::Errored(_) => summary.errored += 1,
                        Outcome::Yielded => {}
                    }
                }
            }
            _ = &mut ctrl_c => {
                info!(target: "cadence::host", "Received Ctrl+C, stopping frame driver");
                summary.stop = StopReason::Interrupted;
                break;
            }
        }
    }

    debug!(
        target: "cadence::scheduler",
        frames = summary.frames,
        stop = %summary.stop,
        "frame driver stopped"
    );
    summary
}
