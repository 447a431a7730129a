//! Math stdlib functions

use crate::script::errors;
use crate::script::native::{arg_num, NativeCtx, NativeResult};
use crate::script::values::Val;

fn unary(args: &[Val], fname: &str, f: impl Fn(f64) -> f64) -> NativeResult {
    match arg_num(args, 0, fname) {
        Ok(n) => NativeResult::Value(Val::Num(f(n))),
        Err(e) => NativeResult::Throw(e),
    }
}

/// Math.floor(x)
pub fn floor(_: &mut NativeCtx, args: &[Val]) -> NativeResult {
    unary(args, "Math.floor", f64::floor)
}

/// Math.ceil(x)
pub fn ceil(_: &mut NativeCtx, args: &[Val]) -> NativeResult {
    unary(args, "Math.ceil", f64::ceil)
}

/// Math.abs(x)
pub fn abs(_: &mut NativeCtx, args: &[Val]) -> NativeResult {
    unary(args, "Math.abs", f64::abs)
}

/// Math.round(x), rounding halves up (`-2.5` becomes `-2`)
pub fn round(_: &mut NativeCtx, args: &[Val]) -> NativeResult {
    unary(args, "Math.round", |n| (n + 0.5).floor())
}

/// Math.sqrt(x)
pub fn sqrt(_: &mut NativeCtx, args: &[Val]) -> NativeResult {
    unary(args, "Math.sqrt", f64::sqrt)
}

fn fold(args: &[Val], fname: &str, f: impl Fn(f64, f64) -> f64) -> NativeResult {
    if args.is_empty() {
        return NativeResult::throw(
            errors::WRONG_ARG_COUNT,
            format!("'{}' expects at least 1 argument", fname),
        );
    }
    let mut acc = match arg_num(args, 0, fname) {
        Ok(n) => n,
        Err(e) => return NativeResult::Throw(e),
    };
    for idx in 1..args.len() {
        match arg_num(args, idx, fname) {
            Ok(n) => acc = f(acc, n),
            Err(e) => return NativeResult::Throw(e),
        }
    }
    NativeResult::Value(Val::Num(acc))
}

/// Math.min(a, ...)
pub fn min(_: &mut NativeCtx, args: &[Val]) -> NativeResult {
    fold(args, "Math.min", f64::min)
}

/// Math.max(a, ...)
pub fn max(_: &mut NativeCtx, args: &[Val]) -> NativeResult {
    fold(args, "Math.max", f64::max)
}
