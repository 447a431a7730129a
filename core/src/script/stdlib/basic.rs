//! Core stdlib functions: printing, inspection and collections

use std::collections::BTreeMap;
use tracing::info;

use crate::script::errors;
use crate::script::native::{NativeCtx, NativeResult};
use crate::script::values::Val;

fn expect_args(args: &[Val], n: usize, fname: &str) -> Result<(), NativeResult> {
    if args.len() == n {
        Ok(())
    } else {
        Err(NativeResult::throw(
            errors::WRONG_ARG_COUNT,
            format!("'{}' expects {} argument(s), got {}", fname, n, args.len()),
        ))
    }
}

/// print(...) - log the arguments, space separated
pub fn print(_: &mut NativeCtx, args: &[Val]) -> NativeResult {
    let line = args
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    info!(target: "cadence::script", "{}", line);
    NativeResult::Value(Val::Null)
}

/// type(v) - name of the value's type
pub fn type_of(_: &mut NativeCtx, args: &[Val]) -> NativeResult {
    if let Err(e) = expect_args(args, 1, "type") {
        return e;
    }
    NativeResult::Value(Val::str(args[0].type_name()))
}

/// str(v) - display form of a value
pub fn to_str(_: &mut NativeCtx, args: &[Val]) -> NativeResult {
    if let Err(e) = expect_args(args, 1, "str") {
        return e;
    }
    NativeResult::Value(Val::str(args[0].to_string()))
}

/// len(v) - length of a list, string or object
pub fn len(_: &mut NativeCtx, args: &[Val]) -> NativeResult {
    if let Err(e) = expect_args(args, 1, "len") {
        return e;
    }
    let n = match &args[0] {
        Val::List(items) => items.borrow().len(),
        Val::Obj(fields) => fields.borrow().len(),
        Val::Str(s) => s.chars().count(),
        other => {
            return NativeResult::throw(
                errors::WRONG_ARG_TYPE,
                format!("'len' expects a list, object or string, got {}", other.type_name()),
            );
        }
    };
    NativeResult::Value(Val::Num(n as f64))
}

/// push(list, v) - append in place, returns the new length
pub fn push(_: &mut NativeCtx, args: &[Val]) -> NativeResult {
    if let Err(e) = expect_args(args, 2, "push") {
        return e;
    }
    match &args[0] {
        Val::List(items) => {
            let mut items = items.borrow_mut();
            items.push(args[1].clone());
            NativeResult::Value(Val::Num(items.len() as f64))
        }
        other => NativeResult::throw(
            errors::WRONG_ARG_TYPE,
            format!("'push' expects a list, got {}", other.type_name()),
        ),
    }
}

/// keys(obj) - sorted list of an object's keys
pub fn keys(_: &mut NativeCtx, args: &[Val]) -> NativeResult {
    if let Err(e) = expect_args(args, 1, "keys") {
        return e;
    }
    match &args[0] {
        Val::Obj(fields) => NativeResult::Value(Val::list(
            fields.borrow().keys().map(|k| Val::str(k.clone())).collect(),
        )),
        other => NativeResult::throw(
            errors::WRONG_ARG_TYPE,
            format!("'keys' expects an object, got {}", other.type_name()),
        ),
    }
}

/// clock() - `{frame, simulation, real}` readings for the current tick
pub fn clock(ctx: &mut NativeCtx, _: &[Val]) -> NativeResult {
    let mut fields = BTreeMap::new();
    fields.insert("frame".to_string(), Val::Num(ctx.readings.frame as f64));
    fields.insert("simulation".to_string(), Val::Num(ctx.readings.simulation));
    fields.insert("real".to_string(), Val::Num(ctx.readings.real));
    NativeResult::Value(Val::obj(fields))
}
