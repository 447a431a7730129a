//! Operator and property semantics

use std::rc::Rc;

use crate::script::ast::{BinaryOp, UnaryOp};
use crate::script::errors::{self, ErrorInfo};
use crate::script::values::Val;

type OpResult = Result<Val, ErrorInfo>;

fn type_error(message: String) -> ErrorInfo {
    ErrorInfo::new(errors::TYPE_ERROR, message)
}

pub fn unary(op: UnaryOp, v: &Val) -> OpResult {
    match op {
        UnaryOp::Not => Ok(Val::Bool(!v.is_truthy())),
        UnaryOp::Neg => match v {
            Val::Num(n) => Ok(Val::Num(-n)),
            other => Err(type_error(format!(
                "attempt to negate a {} value",
                other.type_name()
            ))),
        },
    }
}

pub fn binary(op: BinaryOp, left: &Val, right: &Val) -> OpResult {
    match op {
        BinaryOp::Add => match (left, right) {
            (Val::Num(a), Val::Num(b)) => Ok(Val::Num(a + b)),
            (Val::Str(_), _) | (_, Val::Str(_)) => Ok(Val::Str(format!("{}{}", left, right))),
            _ => Err(arith_error("add", left, right)),
        },
        BinaryOp::Sub => arith(left, right, "subtract", |a, b| a - b),
        BinaryOp::Mul => arith(left, right, "multiply", |a, b| a * b),
        BinaryOp::Div => arith(left, right, "divide", |a, b| a / b),
        BinaryOp::Mod => arith(left, right, "take the remainder of", |a, b| a % b),
        BinaryOp::Eq => Ok(Val::Bool(script_eq(left, right))),
        BinaryOp::Ne => Ok(Val::Bool(!script_eq(left, right))),
        BinaryOp::Lt => compare(left, right, |o| o.is_lt()),
        BinaryOp::Lte => compare(left, right, |o| o.is_le()),
        BinaryOp::Gt => compare(left, right, |o| o.is_gt()),
        BinaryOp::Gte => compare(left, right, |o| o.is_ge()),
    }
}

fn arith(left: &Val, right: &Val, verb: &str, f: impl Fn(f64, f64) -> f64) -> OpResult {
    match (left, right) {
        (Val::Num(a), Val::Num(b)) => Ok(Val::Num(f(*a, *b))),
        _ => Err(arith_error(verb, left, right)),
    }
}

fn arith_error(verb: &str, left: &Val, right: &Val) -> ErrorInfo {
    type_error(format!(
        "attempt to {} a {} and a {} value",
        verb,
        left.type_name(),
        right.type_name()
    ))
}

fn compare(left: &Val, right: &Val, test: impl Fn(std::cmp::Ordering) -> bool) -> OpResult {
    let ordering = match (left, right) {
        (Val::Num(a), Val::Num(b)) => a.partial_cmp(b),
        (Val::Str(a), Val::Str(b)) => Some(a.cmp(b)),
        _ => {
            return Err(type_error(format!(
                "attempt to compare {} with {}",
                left.type_name(),
                right.type_name()
            )));
        }
    };
    // NaN compares false against everything
    Ok(Val::Bool(ordering.is_some_and(test)))
}

/// Equality as scripts see it: lists, objects and functions compare by identity
pub fn script_eq(left: &Val, right: &Val) -> bool {
    match (left, right) {
        (Val::List(a), Val::List(b)) => Rc::ptr_eq(a, b),
        (Val::Obj(a), Val::Obj(b)) => Rc::ptr_eq(a, b),
        (Val::Func(a), Val::Func(b)) => Rc::ptr_eq(a, b),
        _ => left == right,
    }
}

/* ===================== Properties ===================== */

pub fn get_member(obj: &Val, name: &str) -> OpResult {
    match (obj, name) {
        (Val::Obj(fields), _) => fields.borrow().get(name).cloned().ok_or_else(|| {
            ErrorInfo::new(
                errors::PROPERTY_NOT_FOUND,
                format!("property '{}' not found", name),
            )
        }),
        (Val::Error(info), "code") => Ok(Val::str(info.code.clone())),
        (Val::Error(info), "message") => Ok(Val::str(info.message.clone())),
        (Val::List(items), "length") => Ok(Val::Num(items.borrow().len() as f64)),
        (Val::Str(s), "length") => Ok(Val::Num(s.chars().count() as f64)),
        _ => Err(type_error(format!(
            "cannot access property '{}' on a {} value",
            name,
            obj.type_name()
        ))),
    }
}

pub fn set_member(obj: &Val, name: &str, value: Val) -> Result<(), ErrorInfo> {
    match obj {
        Val::Obj(fields) => {
            fields.borrow_mut().insert(name.to_string(), value);
            Ok(())
        }
        other => Err(type_error(format!(
            "cannot set property '{}' on a {} value",
            name,
            other.type_name()
        ))),
    }
}

/// Integer list position, if `index` is one
fn position(index: &Val) -> Option<usize> {
    match index {
        Val::Num(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
        _ => None,
    }
}

fn out_of_range(index: &Val, len: usize) -> ErrorInfo {
    ErrorInfo::new(
        errors::INDEX_OUT_OF_RANGE,
        format!("index {} out of range for length {}", index, len),
    )
}

pub fn get_index(obj: &Val, index: &Val) -> OpResult {
    match (obj, index) {
        (Val::List(items), Val::Num(_)) => {
            let items = items.borrow();
            position(index)
                .and_then(|i| items.get(i).cloned())
                .ok_or_else(|| out_of_range(index, items.len()))
        }
        (Val::Str(s), Val::Num(_)) => position(index)
            .and_then(|i| s.chars().nth(i))
            .map(|c| Val::Str(c.to_string()))
            .ok_or_else(|| out_of_range(index, s.chars().count())),
        (Val::Obj(_), Val::Str(key)) => get_member(obj, key),
        _ => Err(type_error(format!(
            "cannot index a {} value with a {} value",
            obj.type_name(),
            index.type_name()
        ))),
    }
}

/// Assign `obj[index] = value`; writing one past the end of a list appends
pub fn set_index(obj: &Val, index: &Val, value: Val) -> Result<(), ErrorInfo> {
    match (obj, index) {
        (Val::List(items), Val::Num(_)) => {
            let mut items = items.borrow_mut();
            let len = items.len();
            match position(index) {
                Some(i) if i < len => {
                    items[i] = value;
                    Ok(())
                }
                Some(i) if i == len => {
                    items.push(value);
                    Ok(())
                }
                _ => Err(out_of_range(index, len)),
            }
        }
        (Val::Obj(_), Val::Str(key)) => set_member(obj, key, value),
        _ => Err(type_error(format!(
            "cannot index a {} value with a {} value",
            obj.type_name(),
            index.type_name()
        ))),
    }
}
