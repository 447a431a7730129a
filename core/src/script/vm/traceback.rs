//! Call-stack snapshots for error reports

use std::fmt;

use super::Frame;
use crate::script::compiler::MAIN_CHUNK;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub function: String,
    pub source: String,
    pub line: usize,
}

/// Frames of a failed call, innermost first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Traceback {
    pub frames: Vec<TraceFrame>,
}

impl Traceback {
    /// Snapshot the active frames
    ///
    /// Every frame's `pc` already points past the instruction it is executing,
    /// so the reported line is that of `pc - 1`.
    pub fn capture(frames: &[Frame]) -> Self {
        let frames = frames
            .iter()
            .rev()
            .map(|frame| TraceFrame {
                function: frame.proto.name.clone(),
                source: frame.proto.source.clone(),
                line: frame.proto.line_at(frame.pc.saturating_sub(1)),
            })
            .collect();
        Self { frames }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Innermost frame, where the error was raised
    pub fn origin(&self) -> Option<&TraceFrame> {
        self.frames.first()
    }
}

impl fmt::Display for Traceback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stack traceback:")?;
        for frame in &self.frames {
            if frame.function == MAIN_CHUNK {
                write!(f, "\n\t{}:{}: in main chunk", frame.source, frame.line)?;
            } else {
                write!(
                    f,
                    "\n\t{}:{}: in function '{}'",
                    frame.source, frame.line, frame.function
                )?;
            }
        }
        Ok(())
    }
}
