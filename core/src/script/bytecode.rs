//! Bytecode for the stack VM
//!
//! Each compiled function is a [`Proto`]: a flat instruction list with a
//! parallel line table. Locals live in the operand stack at `frame.base + slot`.

use super::ast::{BinaryOp, UnaryOp};
use super::values::Val;

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// Push a constant
    Push(Val),
    Pop,
    /// Pop `n` values (leaving scope, breaking out of loops)
    PopN(usize),

    GetLocal(usize),
    /// Pop into a local slot
    SetLocal(usize),
    GetGlobal(String),
    /// Pop into a global
    SetGlobal(String),

    /// Pop `n` values into a new list
    MakeList(usize),
    /// Pop one value per key into a new object
    MakeObj(Vec<String>),
    /// `[obj] -> [obj.name]`
    GetMember(String),
    /// `[obj, value] -> []`
    SetMember(String),
    /// `[obj, index] -> [obj[index]]`
    GetIndex,
    /// `[obj, index, value] -> []`
    SetIndex,

    Unary(UnaryOp),
    Binary(BinaryOp),

    Jump(usize),
    /// Pop the condition and jump if it is falsy
    JumpIfFalse(usize),
    /// Short-circuit `&&`: keep a falsy left operand and jump, else pop it
    JumpIfFalseKeep(usize),
    /// Short-circuit `||`: keep a truthy left operand and jump, else pop it
    JumpIfTrueKeep(usize),

    /// `[callee, arg1..argN] -> [result]`
    Call(usize),
    /// Pop the return value and leave the current frame
    Return,

    /// `for-of` step: push `list[index]` and advance, or jump to `exit`
    IterNext {
        list: usize,
        index: usize,
        exit: usize,
    },

    /// Install a `catch` target for the current frame
    PushHandler(usize),
    PopHandler,
    /// Pop a value and raise it
    Throw,
}

/// A compiled function
#[derive(Debug, Clone, PartialEq)]
pub struct Proto {
    pub name: String,
    /// Script the function was loaded from (for tracebacks)
    pub source: String,
    pub arity: usize,
    pub code: Vec<Op>,
    /// Source line of each instruction
    pub lines: Vec<usize>,
}

impl Proto {
    pub fn line_at(&self, pc: usize) -> usize {
        self.lines.get(pc).copied().unwrap_or(0)
    }
}
