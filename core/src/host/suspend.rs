//! The script-facing `suspend` native
//!
//! Call shapes:
//!
//! - `suspend()` waits one frame
//! - `suspend(n)` waits `n` frames
//! - `suspend(mode, n)` waits `n` units of clock `mode` (`"f"`, `"g"` or `"r"`)
//!
//! Malformed calls throw `ArgumentError` into the script before anything is
//! queued. A resumed `suspend(...)` evaluates to its clock's reading.

use crate::clock::{WakeMode, WakeRequest};
use crate::script::errors::{self, ErrorInfo};
use crate::script::{NativeCtx, NativeResult, Val};

pub const SUSPEND_FN: &str = "suspend";

pub fn suspend(_: &mut NativeCtx, args: &[Val]) -> NativeResult {
    match parse_suspend_args(args) {
        Ok(request) => NativeResult::Suspend(request),
        Err(e) => NativeResult::Throw(e),
    }
}

fn argument_error(message: String) -> ErrorInfo {
    ErrorInfo::new(errors::ARGUMENT_ERROR, message)
}

fn duration(arg: &Val, position: usize) -> Result<f64, ErrorInfo> {
    match arg {
        Val::Num(n) if n.is_finite() => Ok(*n),
        Val::Num(n) => Err(argument_error(format!(
            "bad argument #{} to 'suspend' (finite duration expected, got {})",
            position, n
        ))),
        other => Err(argument_error(format!(
            "bad argument #{} to 'suspend' (number expected, got {})",
            position,
            other.type_name()
        ))),
    }
}

pub fn parse_suspend_args(args: &[Val]) -> Result<WakeRequest, ErrorInfo> {
    match args {
        [] => Ok(WakeRequest::new(WakeMode::FrameCount, 1.0)),
        [d] => Ok(WakeRequest::new(WakeMode::FrameCount, duration(d, 1)?)),
        [mode, d] => {
            let mode = match mode {
                Val::Str(s) => WakeMode::from_script(s).ok_or_else(|| {
                    argument_error(format!(
                        "bad argument #1 to 'suspend' (invalid mode '{}', expected \"f\", \"g\" or \"r\")",
                        s
                    ))
                })?,
                other => {
                    return Err(argument_error(format!(
                        "bad argument #1 to 'suspend' (mode string expected, got {})",
                        other.type_name()
                    )));
                }
            };
            Ok(WakeRequest::new(mode, duration(d, 2)?))
        }
        _ => Err(argument_error(format!(
            "'suspend' expects 0, 1 or 2 arguments, got {}",
            args.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_shapes() {
        assert_eq!(
            parse_suspend_args(&[]),
            Ok(WakeRequest::new(WakeMode::FrameCount, 1.0))
        );
        assert_eq!(
            parse_suspend_args(&[Val::Num(4.0)]),
            Ok(WakeRequest::new(WakeMode::FrameCount, 4.0))
        );
        assert_eq!(
            parse_suspend_args(&[Val::str("g"), Val::Num(100.0)]),
            Ok(WakeRequest::new(WakeMode::SimulationTime, 100.0))
        );
        assert_eq!(
            parse_suspend_args(&[Val::str("r"), Val::Num(-2.0)]),
            Ok(WakeRequest::new(WakeMode::RealTime, -2.0))
        );
    }

    #[test]
    fn test_rejects_too_many_arguments() {
        let err = parse_suspend_args(&[Val::str("f"), Val::Num(1.0), Val::Num(2.0)]).unwrap_err();
        assert_eq!(err.code, errors::ARGUMENT_ERROR);
        assert_eq!(err.message, "'suspend' expects 0, 1 or 2 arguments, got 3");
    }

    #[test]
    fn test_rejects_unknown_mode() {
        for mode in ["x", "F", "frames", ""] {
            let err = parse_suspend_args(&[Val::str(mode), Val::Num(1.0)]).unwrap_err();
            assert_eq!(err.code, errors::ARGUMENT_ERROR, "mode {:?}", mode);
        }
        let err = parse_suspend_args(&[Val::Num(1.0), Val::Num(1.0)]).unwrap_err();
        assert_eq!(err.code, errors::ARGUMENT_ERROR);
    }

    #[test]
    fn test_rejects_bad_durations() {
        for bad in [Val::Num(f64::NAN), Val::Num(f64::INFINITY), Val::str("3"), Val::Null] {
            let err = parse_suspend_args(&[bad]).unwrap_err();
            assert_eq!(err.code, errors::ARGUMENT_ERROR);
        }
    }
}
