//! AST to bytecode compiler
//!
//! Invariant maintained between statements: the operand stack above a frame's
//! base holds exactly its declared locals, in declaration order. Expression
//! temporaries only ever sit above them.

use std::rc::Rc;
use thiserror::Error;

use super::ast::{AssignTarget, Expr, FunctionDecl, LogicalOp, Script, Stmt, StmtKind};
use super::bytecode::{Op, Proto};
use super::values::Val;

/// Name given to a file's top-level code
pub const MAIN_CHUNK: &str = "<main>";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("line {line}: 'break' outside of a loop")]
    BreakOutsideLoop { line: usize },

    #[error("line {line}: 'continue' outside of a loop")]
    ContinueOutsideLoop { line: usize },

    #[error("line {line}: function '{name}' is declared more than once")]
    DuplicateFunction { name: String, line: usize },
}

/// Output of compiling one script file
#[derive(Debug, Clone)]
pub struct CompiledScript {
    /// Top-level statements
    pub main: Rc<Proto>,
    /// Declared functions, bound as globals before `main` runs
    pub functions: Vec<Rc<Proto>>,
}

pub fn compile_script(script: &Script, source: &str) -> Result<CompiledScript, CompileError> {
    let mut functions: Vec<Rc<Proto>> = Vec::with_capacity(script.functions.len());

    for decl in &script.functions {
        if functions.iter().any(|f| f.name == decl.name) {
            return Err(CompileError::DuplicateFunction {
                name: decl.name.clone(),
                line: decl.line,
            });
        }
        functions.push(Rc::new(compile_function(decl, source)?));
    }

    let mut main = FnCompiler::new(MAIN_CHUNK, source, 0, 0);
    for stmt in &script.body {
        main.compile_stmt(stmt)?;
    }

    Ok(CompiledScript {
        main: Rc::new(main.finish()),
        functions,
    })
}

fn compile_function(decl: &FunctionDecl, source: &str) -> Result<Proto, CompileError> {
    let mut compiler = FnCompiler::new(&decl.name, source, decl.params.len(), 1);
    compiler.line = decl.line;
    for param in &decl.params {
        compiler.declare(param);
    }
    for stmt in &decl.body {
        compiler.compile_stmt(stmt)?;
    }
    Ok(compiler.finish())
}

/* ===================== Function Compiler ===================== */

struct Local {
    name: String,
    depth: usize,
}

struct LoopCtx {
    /// Jump target for `continue`
    start: usize,
    /// Jumps to patch with the loop exit
    breaks: Vec<usize>,
    /// Locals alive when the loop body began
    locals: usize,
    /// Handlers installed when the loop began
    handlers: usize,
}

struct FnCompiler {
    proto: Proto,
    locals: Vec<Local>,
    /// Scope depth; 0 only for a file's top level, where `let` defines globals
    depth: usize,
    loops: Vec<LoopCtx>,
    handlers: usize,
    line: usize,
}

impl FnCompiler {
    fn new(name: &str, source: &str, arity: usize, depth: usize) -> Self {
        Self {
            proto: Proto {
                name: name.to_string(),
                source: source.to_string(),
                arity,
                code: Vec::new(),
                lines: Vec::new(),
            },
            locals: Vec::new(),
            depth,
            loops: Vec::new(),
            handlers: 0,
            line: 1,
        }
    }

    fn finish(mut self) -> Proto {
        self.emit(Op::Push(Val::Null));
        self.emit(Op::Return);
        self.proto
    }

    /* ---------- emission ---------- */

    fn emit(&mut self, op: Op) -> usize {
        self.proto.code.push(op);
        self.proto.lines.push(self.line);
        self.proto.code.len() - 1
    }

    fn here(&self) -> usize {
        self.proto.code.len()
    }

    /// Point a previously emitted jump at the current position
    fn patch(&mut self, at: usize) {
        let target = self.here();
        match &mut self.proto.code[at] {
            Op::Jump(t)
            | Op::JumpIfFalse(t)
            | Op::JumpIfFalseKeep(t)
            | Op::JumpIfTrueKeep(t)
            | Op::PushHandler(t) => *t = target,
            Op::IterNext { exit, .. } => *exit = target,
            _ => {}
        }
    }

    /* ---------- scopes ---------- */

    fn declare(&mut self, name: &str) -> usize {
        self.locals.push(Local {
            name: name.to_string(),
            depth: self.depth,
        });
        self.locals.len() - 1
    }

    fn resolve(&self, name: &str) -> Option<usize> {
        self.locals.iter().rposition(|l| l.name == name)
    }

    fn begin_scope(&mut self) {
        self.depth += 1;
    }

    fn end_scope(&mut self) {
        self.depth -= 1;
        let mut popped = 0;
        while self.locals.last().is_some_and(|l| l.depth > self.depth) {
            self.locals.pop();
            popped += 1;
        }
        if popped > 0 {
            self.emit(Op::PopN(popped));
        }
    }

    fn compile_scoped(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        self.begin_scope();
        self.compile_stmt(stmt)?;
        self.end_scope();
        Ok(())
    }

    /// Discard locals and handlers down to the innermost loop's entry state
    fn unwind_to_loop(&mut self, line: usize, is_break: bool) -> Result<usize, CompileError> {
        let Some(loop_idx) = self.loops.len().checked_sub(1) else {
            return Err(if is_break {
                CompileError::BreakOutsideLoop { line }
            } else {
                CompileError::ContinueOutsideLoop { line }
            });
        };

        let (locals, handlers) = {
            let ctx = &self.loops[loop_idx];
            (ctx.locals, ctx.handlers)
        };
        let extra = self.locals.len() - locals;
        if extra > 0 {
            self.emit(Op::PopN(extra));
        }
        for _ in handlers..self.handlers {
            self.emit(Op::PopHandler);
        }
        Ok(loop_idx)
    }

    /* ---------- statements ---------- */

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        self.line = stmt.line;

        match &stmt.kind {
            StmtKind::Block { body } => {
                self.begin_scope();
                for s in body {
                    self.compile_stmt(s)?;
                }
                self.end_scope();
            }

            StmtKind::Let { name, init } => {
                match init {
                    Some(expr) => self.compile_expr(expr)?,
                    None => {
                        self.emit(Op::Push(Val::Null));
                    }
                }
                if self.depth == 0 {
                    self.emit(Op::SetGlobal(name.clone()));
                } else {
                    self.declare(name);
                }
            }

            StmtKind::Assign { target, value } => match target {
                AssignTarget::Ident { name } => {
                    self.compile_expr(value)?;
                    match self.resolve(name) {
                        Some(slot) => self.emit(Op::SetLocal(slot)),
                        None => self.emit(Op::SetGlobal(name.clone())),
                    };
                }
                AssignTarget::Member { object, property } => {
                    self.compile_expr(object)?;
                    self.compile_expr(value)?;
                    self.emit(Op::SetMember(property.clone()));
                }
                AssignTarget::Index { object, index } => {
                    self.compile_expr(object)?;
                    self.compile_expr(index)?;
                    self.compile_expr(value)?;
                    self.emit(Op::SetIndex);
                }
            },

            StmtKind::If {
                test,
                then_s,
                else_s,
            } => {
                self.compile_expr(test)?;
                let to_else = self.emit(Op::JumpIfFalse(0));
                self.compile_scoped(then_s)?;
                match else_s {
                    Some(else_s) => {
                        let to_end = self.emit(Op::Jump(0));
                        self.patch(to_else);
                        self.compile_scoped(else_s)?;
                        self.patch(to_end);
                    }
                    None => self.patch(to_else),
                }
            }

            StmtKind::While { test, body } => {
                let start = self.here();
                self.compile_expr(test)?;
                let to_exit = self.emit(Op::JumpIfFalse(0));
                self.loops.push(LoopCtx {
                    start,
                    breaks: Vec::new(),
                    locals: self.locals.len(),
                    handlers: self.handlers,
                });
                self.compile_scoped(body)?;
                self.emit(Op::Jump(start));
                self.patch(to_exit);
                self.close_loop();
            }

            StmtKind::ForOf {
                binding,
                iterable,
                body,
            } => {
                self.begin_scope();
                self.compile_expr(iterable)?;
                let list = self.declare("(for list)");
                self.emit(Op::Push(Val::Num(0.0)));
                let index = self.declare("(for index)");

                let start = self.emit(Op::IterNext {
                    list,
                    index,
                    exit: 0,
                });
                self.loops.push(LoopCtx {
                    start,
                    breaks: Vec::new(),
                    locals: self.locals.len(),
                    handlers: self.handlers,
                });

                self.begin_scope();
                self.declare(binding);
                self.compile_scoped(body)?;
                self.end_scope();
                self.emit(Op::Jump(start));

                self.patch(start);
                self.close_loop();
                self.end_scope();
            }

            StmtKind::Try {
                body,
                catch_var,
                handler,
            } => {
                let to_catch = self.emit(Op::PushHandler(0));
                self.handlers += 1;
                self.begin_scope();
                for s in body {
                    self.compile_stmt(s)?;
                }
                self.end_scope();
                self.emit(Op::PopHandler);
                self.handlers -= 1;
                let to_end = self.emit(Op::Jump(0));

                // The VM pushes the caught value where the next local lives
                self.patch(to_catch);
                self.begin_scope();
                self.declare(catch_var);
                for s in handler {
                    self.compile_stmt(s)?;
                }
                self.end_scope();
                self.patch(to_end);
            }

            StmtKind::Return { value } => {
                match value {
                    Some(expr) => self.compile_expr(expr)?,
                    None => {
                        self.emit(Op::Push(Val::Null));
                    }
                }
                self.emit(Op::Return);
            }

            StmtKind::Throw { value } => {
                self.compile_expr(value)?;
                self.emit(Op::Throw);
            }

            StmtKind::Break => {
                let loop_idx = self.unwind_to_loop(stmt.line, true)?;
                let jump = self.emit(Op::Jump(0));
                self.loops[loop_idx].breaks.push(jump);
            }

            StmtKind::Continue => {
                let loop_idx = self.unwind_to_loop(stmt.line, false)?;
                let start = self.loops[loop_idx].start;
                self.emit(Op::Jump(start));
            }

            StmtKind::Expr { expr } => {
                self.compile_expr(expr)?;
                self.emit(Op::Pop);
            }
        }

        Ok(())
    }

    fn close_loop(&mut self) {
        if let Some(ctx) = self.loops.pop() {
            for jump in ctx.breaks {
                self.patch(jump);
            }
        }
    }

    /* ---------- expressions ---------- */

    fn compile_expr(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::LitNull => {
                self.emit(Op::Push(Val::Null));
            }
            Expr::LitBool { v } => {
                self.emit(Op::Push(Val::Bool(*v)));
            }
            Expr::LitNum { v } => {
                self.emit(Op::Push(Val::Num(*v)));
            }
            Expr::LitStr { v } => {
                self.emit(Op::Push(Val::Str(v.clone())));
            }
            Expr::List { items } => {
                for item in items {
                    self.compile_expr(item)?;
                }
                self.emit(Op::MakeList(items.len()));
            }
            Expr::Obj { props } => {
                for (_, value) in props {
                    self.compile_expr(value)?;
                }
                self.emit(Op::MakeObj(props.iter().map(|(k, _)| k.clone()).collect()));
            }
            Expr::Ident { name } => {
                match self.resolve(name) {
                    Some(slot) => self.emit(Op::GetLocal(slot)),
                    None => self.emit(Op::GetGlobal(name.clone())),
                };
            }
            Expr::Member { object, property } => {
                self.compile_expr(object)?;
                self.emit(Op::GetMember(property.clone()));
            }
            Expr::Index { object, index } => {
                self.compile_expr(object)?;
                self.compile_expr(index)?;
                self.emit(Op::GetIndex);
            }
            Expr::Call { callee, args, line } => {
                self.compile_expr(callee)?;
                for arg in args {
                    self.compile_expr(arg)?;
                }
                let saved = self.line;
                self.line = *line;
                self.emit(Op::Call(args.len()));
                self.line = saved;
            }
            Expr::Unary { op, operand } => {
                self.compile_expr(operand)?;
                self.emit(Op::Unary(*op));
            }
            Expr::Binary { op, left, right } => {
                self.compile_expr(left)?;
                self.compile_expr(right)?;
                self.emit(Op::Binary(*op));
            }
            Expr::Logical { op, left, right } => {
                self.compile_expr(left)?;
                let jump = match op {
                    LogicalOp::And => self.emit(Op::JumpIfFalseKeep(0)),
                    LogicalOp::Or => self.emit(Op::JumpIfTrueKeep(0)),
                };
                self.compile_expr(right)?;
                self.patch(jump);
            }
        }
        Ok(())
    }
}
