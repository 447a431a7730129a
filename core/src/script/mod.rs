//! The embedded script language
//!
//! Source text goes through [`parser`] into an [`ast::Script`], is compiled to
//! [`bytecode`] by [`compiler`], and runs on the resumable [`vm`].

pub mod ast;
pub mod bytecode;
pub mod compiler;
pub mod errors;
pub mod native;
pub mod parser;
pub mod stdlib;
pub mod values;
pub mod vm;

pub use compiler::{compile_script, CompileError, CompiledScript};
pub use errors::ErrorInfo;
pub use native::{NativeCtx, NativeFn, NativeRegistry, NativeResult};
pub use parser::{parse_script, ParseError};
pub use values::{json_to_val, val_to_json, Val};
pub use vm::{run_until_done, step, Control, ExecEnv, Step, TraceFrame, Traceback, VmFault, VM};
