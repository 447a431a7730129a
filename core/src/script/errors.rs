//! Script error values and error codes
//!
//! Runtime errors are ordinary script values (`Val::Error`) so that `try/catch`
//! can inspect them. Codes are stable strings.

use std::fmt;

pub const TYPE_ERROR: &str = "TypeError";
pub const UNDEFINED_VARIABLE: &str = "UndefinedVariable";
pub const PROPERTY_NOT_FOUND: &str = "PropertyNotFound";
pub const INDEX_OUT_OF_RANGE: &str = "IndexOutOfRange";
pub const NOT_CALLABLE: &str = "NotCallable";
pub const ARGUMENT_ERROR: &str = "ArgumentError";
pub const WRONG_ARG_COUNT: &str = "WrongArgumentCount";
pub const WRONG_ARG_TYPE: &str = "WrongArgumentType";
pub const STACK_OVERFLOW: &str = "StackOverflow";
pub const SUSPEND_OUTSIDE_CONTINUATION: &str = "SuspendOutsideContinuation";
pub const USER_ERROR: &str = "Error";
pub const LOAD_ERROR: &str = "LoadError";
pub const PANIC: &str = "Panic";

/// Error payload carried by `Val::Error`
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
