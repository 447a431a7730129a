//! Test helpers for VM tests
//!
//! A `Rig` owns the globals and natives a VM runs against, so tests can load a
//! script, call into it and resume it without a full host.

use std::collections::HashMap;
use std::rc::Rc;

use crate::clock::{ClockReadings, WakeMode, WakeRequest};
use crate::script::compiler::compile_script;
use crate::script::native::{NativeCtx, NativeRegistry, NativeResult};
use crate::script::parser::parse_script;
use crate::script::stdlib;
use crate::script::vm::{run_until_done, Control, ExecEnv, VM};
use crate::script::Val;

pub const SOURCE: &str = "test.cds";

pub struct Rig {
    pub globals: HashMap<String, Val>,
    pub natives: NativeRegistry,
    pub max_call_depth: usize,
}

impl Rig {
    /// Stdlib plus a `wait(n)` native that suspends on the frame clock
    pub fn new() -> Self {
        let mut natives = NativeRegistry::new();
        stdlib::install(&mut natives);
        natives.register("wait", |_: &mut NativeCtx, args: &[Val]| {
            let frames = args.first().and_then(Val::as_num).unwrap_or(1.0);
            NativeResult::Suspend(WakeRequest::new(WakeMode::FrameCount, frames))
        });

        let mut globals = HashMap::new();
        natives.bind_globals(&mut globals);

        Self {
            globals,
            natives,
            max_call_depth: crate::script::vm::DEFAULT_MAX_CALL_DEPTH,
        }
    }

    fn env(&mut self, suspendable: bool) -> ExecEnv<'_> {
        ExecEnv {
            globals: &mut self.globals,
            natives: &self.natives,
            ctx: NativeCtx::new(ClockReadings::default(), suspendable),
        }
    }

    /// Parse, compile, bind functions and run the top level to completion
    pub fn load(&mut self, source: &str) -> VM {
        let script = parse_script(source).expect("Parse failed");
        let compiled = compile_script(&script, SOURCE).expect("Compile failed");
        for proto in &compiled.functions {
            self.globals
                .insert(proto.name.clone(), Val::Func(Rc::clone(proto)));
        }

        let mut vm = VM::new(self.max_call_depth);
        let mut env = self.env(false);
        vm.start_call(Val::Func(compiled.main), Vec::new(), &mut env)
            .expect("Start failed");
        run_until_done(&mut vm, &mut env).expect("VM fault");
        vm
    }

    /// Call a global function inside a suspendable context
    pub fn call(&mut self, name: &str, args: Vec<Val>) -> VM {
        let callee = self
            .globals
            .get(name)
            .cloned()
            .unwrap_or_else(|| panic!("No global named {}", name));
        let mut vm = VM::new(self.max_call_depth);
        let mut env = self.env(true);
        vm.start_call(callee, args, &mut env).expect("Start failed");
        run_until_done(&mut vm, &mut env).expect("VM fault");
        vm
    }

    /// Resume a suspended VM with `value` and run it until it stops again
    pub fn resume(&mut self, vm: &mut VM, value: Val) {
        assert!(vm.resume(value), "VM was not suspended: {:?}", vm.control);
        let mut env = self.env(true);
        run_until_done(vm, &mut env).expect("VM fault");
    }
}

/// Load `source` and return the result of calling its `main()`
pub fn run_main(source: &str) -> Control {
    let mut rig = Rig::new();
    rig.load(source);
    rig.call("main", Vec::new()).control
}

/// Thrown error code, or a panic describing what happened instead
pub fn thrown_code(control: &Control) -> String {
    match control {
        Control::Throw(Val::Error(info)) => info.code.clone(),
        other => panic!("Expected thrown error, got {:?}", other),
    }
}

pub fn num(n: f64) -> Val {
    Val::Num(n)
}
