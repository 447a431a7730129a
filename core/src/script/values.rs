//! Runtime value types

use super::bytecode::Proto;
use super::errors::ErrorInfo;
use serde_json::Value as JsonValue;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

pub type ListRef = Rc<RefCell<Vec<Val>>>;
pub type ObjRef = Rc<RefCell<BTreeMap<String, Val>>>;

/// Runtime value type
///
/// Lists and objects are shared references: assigning one to another variable
/// aliases it, like tables in most embedded scripting languages.
#[derive(Debug, Clone, PartialEq)]
pub enum Val {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(ListRef),
    Obj(ObjRef),
    /// Script-defined function
    Func(Rc<Proto>),
    /// Host-provided function, looked up by its registered name
    Native(String),
    /// Error value with code and message
    Error(ErrorInfo),
}

impl Val {
    pub fn list(items: Vec<Val>) -> Self {
        Val::List(Rc::new(RefCell::new(items)))
    }

    pub fn obj(fields: BTreeMap<String, Val>) -> Self {
        Val::Obj(Rc::new(RefCell::new(fields)))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Val::Str(s.into())
    }

    /// Check if value is truthy (for conditionals)
    pub fn is_truthy(&self) -> bool {
        match self {
            Val::Bool(b) => *b,
            Val::Null => false,
            _ => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Null => "null",
            Val::Bool(_) => "boolean",
            Val::Num(_) => "number",
            Val::Str(_) => "string",
            Val::List(_) => "list",
            Val::Obj(_) => "object",
            Val::Func(_) | Val::Native(_) => "function",
            Val::Error(_) => "error",
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Val::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::Str(s) => Some(s),
            _ => None,
        }
    }
}

fn fmt_num(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{}", n)
    }
}

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Null => write!(f, "null"),
            Val::Bool(b) => write!(f, "{}", b),
            Val::Num(n) => fmt_num(*n, f),
            Val::Str(s) => write!(f, "{}", s),
            Val::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Val::Obj(fields) => {
                write!(f, "{{")?;
                for (i, (key, value)) in fields.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Val::Func(proto) => write!(f, "<function {}>", proto.name),
            Val::Native(name) => write!(f, "<native {}>", name),
            Val::Error(err) => write!(f, "{}", err),
        }
    }
}

/* ===================== JSON Conversion ===================== */

/// Convert a JSON value (e.g. a CLI argument) into a script value
pub fn json_to_val(json: &JsonValue) -> Val {
    match json {
        JsonValue::Null => Val::Null,
        JsonValue::Bool(b) => Val::Bool(*b),
        JsonValue::Number(n) => Val::Num(n.as_f64().unwrap_or(f64::NAN)),
        JsonValue::String(s) => Val::Str(s.clone()),
        JsonValue::Array(items) => Val::list(items.iter().map(json_to_val).collect()),
        JsonValue::Object(fields) => Val::obj(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), json_to_val(v)))
                .collect(),
        ),
    }
}

/// Convert a script value into JSON
///
/// Functions have no JSON form and become their display string. Errors become
/// `{"code": .., "message": ..}`.
pub fn val_to_json(val: &Val) -> JsonValue {
    match val {
        Val::Null => JsonValue::Null,
        Val::Bool(b) => JsonValue::Bool(*b),
        Val::Num(n) => serde_json::Number::from_f64(*n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Val::Str(s) => JsonValue::String(s.clone()),
        Val::List(items) => JsonValue::Array(items.borrow().iter().map(val_to_json).collect()),
        Val::Obj(fields) => JsonValue::Object(
            fields
                .borrow()
                .iter()
                .map(|(k, v)| (k.clone(), val_to_json(v)))
                .collect(),
        ),
        Val::Func(_) | Val::Native(_) => JsonValue::String(val.to_string()),
        Val::Error(err) => serde_json::json!({ "code": err.code, "message": err.message }),
    }
}
