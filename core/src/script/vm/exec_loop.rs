//! The instruction loop
//!
//! `step()` fetches one instruction from the top frame, advances `pc` and
//! executes it. Script errors become `Control::Throw` (or jump to a handler);
//! only corrupt VM state surfaces as `Err(VmFault)`.

use super::ops;
use super::{Control, ExecEnv, Handler, Step, Traceback, VmFault, VM};
use crate::script::bytecode::Op;
use crate::script::errors::{self, ErrorInfo};
use crate::script::native::NativeResult;
use crate::script::values::Val;

/// Execute one instruction
pub fn step(vm: &mut VM, env: &mut ExecEnv<'_>) -> Result<Step, VmFault> {
    if vm.control != Control::None {
        return Ok(Step::Done);
    }

    let Some(frame) = vm.frames.last_mut() else {
        return Err(VmFault::NoFrame);
    };
    let proto = frame.proto.clone();
    let pc = frame.pc;
    let base = frame.base;
    let Some(op) = proto.code.get(pc) else {
        return Err(VmFault::BadJump {
            function: proto.name.clone(),
            pc,
        });
    };
    frame.pc += 1;

    let underflow = || VmFault::StackUnderflow {
        function: proto.name.clone(),
        pc,
    };
    let bad_local = |slot: usize| VmFault::BadLocal {
        function: proto.name.clone(),
        slot,
    };

    match op {
        Op::Push(v) => vm.stack.push(v.clone()),

        Op::Pop => {
            vm.stack.pop().ok_or_else(underflow)?;
        }

        Op::PopN(n) => {
            let keep = vm.stack.len().checked_sub(*n).ok_or_else(underflow)?;
            vm.stack.truncate(keep);
        }

        Op::GetLocal(slot) => {
            let v = vm
                .stack
                .get(base + slot)
                .cloned()
                .ok_or_else(|| bad_local(*slot))?;
            vm.stack.push(v);
        }

        Op::SetLocal(slot) => {
            let v = vm.stack.pop().ok_or_else(underflow)?;
            let target = vm
                .stack
                .get_mut(base + slot)
                .ok_or_else(|| bad_local(*slot))?;
            *target = v;
        }

        Op::GetGlobal(name) => match env.globals.get(name) {
            Some(v) => vm.stack.push(v.clone()),
            None => {
                return throw(
                    vm,
                    error(errors::UNDEFINED_VARIABLE, format!("undefined variable '{}'", name)),
                );
            }
        },

        Op::SetGlobal(name) => {
            let v = vm.stack.pop().ok_or_else(underflow)?;
            env.globals.insert(name.clone(), v);
        }

        Op::MakeList(n) => {
            let start = vm.stack.len().checked_sub(*n).ok_or_else(underflow)?;
            let items = vm.stack.split_off(start);
            vm.stack.push(Val::list(items));
        }

        Op::MakeObj(keys) => {
            let start = vm
                .stack
                .len()
                .checked_sub(keys.len())
                .ok_or_else(underflow)?;
            let values = vm.stack.split_off(start);
            let fields = keys.iter().cloned().zip(values).collect();
            vm.stack.push(Val::obj(fields));
        }

        Op::GetMember(name) => {
            let obj = vm.stack.pop().ok_or_else(underflow)?;
            match ops::get_member(&obj, name) {
                Ok(v) => vm.stack.push(v),
                Err(e) => return throw(vm, Val::Error(e)),
            }
        }

        Op::SetMember(name) => {
            let value = vm.stack.pop().ok_or_else(underflow)?;
            let obj = vm.stack.pop().ok_or_else(underflow)?;
            if let Err(e) = ops::set_member(&obj, name, value) {
                return throw(vm, Val::Error(e));
            }
        }

        Op::GetIndex => {
            let index = vm.stack.pop().ok_or_else(underflow)?;
            let obj = vm.stack.pop().ok_or_else(underflow)?;
            match ops::get_index(&obj, &index) {
                Ok(v) => vm.stack.push(v),
                Err(e) => return throw(vm, Val::Error(e)),
            }
        }

        Op::SetIndex => {
            let value = vm.stack.pop().ok_or_else(underflow)?;
            let index = vm.stack.pop().ok_or_else(underflow)?;
            let obj = vm.stack.pop().ok_or_else(underflow)?;
            if let Err(e) = ops::set_index(&obj, &index, value) {
                return throw(vm, Val::Error(e));
            }
        }

        Op::Unary(op) => {
            let v = vm.stack.pop().ok_or_else(underflow)?;
            match ops::unary(*op, &v) {
                Ok(r) => vm.stack.push(r),
                Err(e) => return throw(vm, Val::Error(e)),
            }
        }

        Op::Binary(op) => {
            let right = vm.stack.pop().ok_or_else(underflow)?;
            let left = vm.stack.pop().ok_or_else(underflow)?;
            match ops::binary(*op, &left, &right) {
                Ok(r) => vm.stack.push(r),
                Err(e) => return throw(vm, Val::Error(e)),
            }
        }

        Op::Jump(target) => jump(vm, *target),

        Op::JumpIfFalse(target) => {
            let cond = vm.stack.pop().ok_or_else(underflow)?;
            if !cond.is_truthy() {
                jump(vm, *target);
            }
        }

        Op::JumpIfFalseKeep(target) => {
            let keep = !vm.stack.last().ok_or_else(underflow)?.is_truthy();
            if keep {
                jump(vm, *target);
            } else {
                vm.stack.pop();
            }
        }

        Op::JumpIfTrueKeep(target) => {
            let keep = vm.stack.last().ok_or_else(underflow)?.is_truthy();
            if keep {
                jump(vm, *target);
            } else {
                vm.stack.pop();
            }
        }

        Op::Call(argc) => return call_value(vm, env, *argc),

        Op::Return => {
            let value = vm.stack.pop().ok_or_else(underflow)?;
            vm.frames.pop();
            let depth = vm.frames.len();
            vm.handlers.retain(|h| h.frame_depth <= depth);
            let callee_slot = base.checked_sub(1).ok_or_else(underflow)?;
            vm.stack.truncate(callee_slot);
            return Ok(push_result(vm, value));
        }

        Op::IterNext { list, index, exit } => {
            let list_val = vm
                .stack
                .get(base + list)
                .cloned()
                .ok_or_else(|| bad_local(*list))?;
            let i = match vm.stack.get(base + index) {
                Some(Val::Num(n)) => *n as usize,
                _ => return Err(bad_local(*index)),
            };
            let items = match list_val {
                Val::List(items) => items,
                other => {
                    return throw(
                        vm,
                        error(
                            errors::TYPE_ERROR,
                            format!("cannot iterate over a {} value", other.type_name()),
                        ),
                    );
                }
            };
            let next = items.borrow().get(i).cloned();
            match next {
                Some(item) => {
                    vm.stack[base + index] = Val::Num((i + 1) as f64);
                    vm.stack.push(item);
                }
                None => jump(vm, *exit),
            }
        }

        Op::PushHandler(catch_pc) => {
            vm.handlers.push(Handler {
                frame_depth: vm.frames.len(),
                stack_len: vm.stack.len(),
                catch_pc: *catch_pc,
            });
        }

        Op::PopHandler => {
            vm.handlers.pop();
        }

        Op::Throw => {
            let v = vm.stack.pop().ok_or_else(underflow)?;
            return throw(vm, v);
        }
    }

    Ok(Step::Continue)
}

/// Step until the VM returns, throws or suspends
pub fn run_until_done(vm: &mut VM, env: &mut ExecEnv<'_>) -> Result<(), VmFault> {
    loop {
        match step(vm, env)? {
            Step::Continue => continue,
            Step::Done => return Ok(()),
        }
    }
}

fn error(code: &str, message: String) -> Val {
    Val::Error(ErrorInfo::new(code, message))
}

fn jump(vm: &mut VM, target: usize) {
    if let Some(frame) = vm.frames.last_mut() {
        frame.pc = target;
    }
}

/// Deliver a call result to the caller, or finish if no caller is left
pub(super) fn push_result(vm: &mut VM, value: Val) -> Step {
    if vm.frames.is_empty() {
        vm.control = Control::Return(value);
        Step::Done
    } else {
        vm.stack.push(value);
        Step::Continue
    }
}

/// Raise `value`, unwinding to the innermost handler
///
/// With no handler left the VM stops in `Control::Throw` and keeps a
/// traceback of the frames the error escaped from.
pub(super) fn throw(vm: &mut VM, value: Val) -> Result<Step, VmFault> {
    match vm.handlers.pop() {
        Some(handler) => {
            if handler.frame_depth == 0 || handler.frame_depth > vm.frames.len() {
                return Err(VmFault::BadHandler);
            }
            vm.frames.truncate(handler.frame_depth);
            vm.stack.truncate(handler.stack_len);
            vm.stack.push(value);
            jump(vm, handler.catch_pc);
            Ok(Step::Continue)
        }
        None => {
            vm.traceback = Some(Traceback::capture(&vm.frames));
            vm.frames.clear();
            vm.stack.clear();
            vm.control = Control::Throw(value);
            Ok(Step::Done)
        }
    }
}

/// Call the value sitting below `argc` arguments on the stack
pub(super) fn call_value(vm: &mut VM, env: &mut ExecEnv<'_>, argc: usize) -> Result<Step, VmFault> {
    let callee_slot = vm
        .stack
        .len()
        .checked_sub(argc + 1)
        .ok_or_else(|| VmFault::StackUnderflow {
            function: current_function(vm),
            pc: vm.frames.last().map(|f| f.pc).unwrap_or(0),
        })?;
    let callee = vm.stack[callee_slot].clone();

    match callee {
        Val::Func(proto) => {
            if vm.frames.len() >= vm.max_call_depth {
                return throw(
                    vm,
                    error(
                        errors::STACK_OVERFLOW,
                        format!("stack overflow calling '{}'", proto.name),
                    ),
                );
            }
            // Missing arguments are null, extra ones are dropped
            let wanted = callee_slot + 1 + proto.arity;
            if vm.stack.len() > wanted {
                vm.stack.truncate(wanted);
            }
            while vm.stack.len() < wanted {
                vm.stack.push(Val::Null);
            }
            vm.frames.push(super::Frame {
                proto,
                pc: 0,
                base: callee_slot + 1,
            });
            Ok(Step::Continue)
        }

        Val::Native(name) => {
            let Some(native) = env.natives.get(&name) else {
                return throw(
                    vm,
                    error(
                        errors::NOT_CALLABLE,
                        format!("native function '{}' is not registered", name),
                    ),
                );
            };
            let args = vm.stack.split_off(callee_slot + 1);
            vm.stack.truncate(callee_slot);

            match native(&mut env.ctx, &args) {
                NativeResult::Value(v) => Ok(push_result(vm, v)),
                NativeResult::Throw(e) => throw(vm, Val::Error(e)),
                NativeResult::Suspend(request) => {
                    if !env.ctx.suspendable {
                        return throw(
                            vm,
                            error(
                                errors::SUSPEND_OUTSIDE_CONTINUATION,
                                "attempt to suspend outside of a continuation".to_string(),
                            ),
                        );
                    }
                    vm.control = Control::Suspend(request);
                    Ok(Step::Done)
                }
            }
        }

        other => throw(
            vm,
            error(
                errors::NOT_CALLABLE,
                format!("attempt to call a {} value", other.type_name()),
            ),
        ),
    }
}

fn current_function(vm: &VM) -> String {
    vm.frames
        .last()
        .map(|f| f.proto.name.clone())
        .unwrap_or_default()
}
