//! Tests for values, variables and calls

use super::helpers::{num, run_main, Rig};
use crate::script::vm::Control;
use crate::script::Val;

#[test]
fn test_return_arithmetic() {
    let control = run_main("function main() { return 1 + 2 * 3 - 8 / 4 }");
    assert_eq!(control, Control::Return(num(5.0)));
}

#[test]
fn test_modulo_and_negation() {
    let control = run_main("function main() { let x = 7\n return -(x % 4) }");
    assert_eq!(control, Control::Return(num(-3.0)));
}

#[test]
fn test_string_concatenation() {
    let control = run_main(r#"function main() { return "hp: " + 10 + "/" + 12.5 }"#);
    assert_eq!(control, Control::Return(Val::str("hp: 10/12.5")));
}

#[test]
fn test_missing_return_yields_null() {
    let control = run_main("function main() { let a = 1 }");
    assert_eq!(control, Control::Return(Val::Null));
}

#[test]
fn test_top_level_let_defines_global() {
    let mut rig = Rig::new();
    rig.load("let speed = 4\nlet name = \"bat\"");
    assert_eq!(rig.globals["speed"], num(4.0));
    assert_eq!(rig.globals["name"], Val::str("bat"));
}

#[test]
fn test_functions_are_hoisted() {
    let mut rig = Rig::new();
    rig.load("let answer = compute()\nfunction compute() { return 42 }");
    assert_eq!(rig.globals["answer"], num(42.0));
}

#[test]
fn test_assignment_to_undeclared_name_writes_global() {
    let mut rig = Rig::new();
    rig.load("function bump() { counter = 3 }");
    rig.call("bump", vec![]);
    assert_eq!(rig.globals["counter"], num(3.0));
}

#[test]
fn test_block_scoping_shadows_and_restores() {
    let control = run_main(
        r#"
        function main() {
            let x = 1
            {
                let x = 2
                x = x + 10
            }
            return x
        }
        "#,
    );
    assert_eq!(control, Control::Return(num(1.0)));
}

#[test]
fn test_arguments_are_padded_and_truncated() {
    let mut rig = Rig::new();
    rig.load("function pair(a, b) { return [a, b] }");

    let vm = rig.call("pair", vec![num(1.0)]);
    assert_eq!(vm.control, Control::Return(Val::list(vec![num(1.0), Val::Null])));

    let vm = rig.call("pair", vec![num(1.0), num(2.0), num(3.0)]);
    assert_eq!(vm.control, Control::Return(Val::list(vec![num(1.0), num(2.0)])));
}

#[test]
fn test_recursion() {
    let control = run_main(
        r#"
        function fib(n) {
            if (n < 2) { return n }
            return fib(n - 1) + fib(n - 2)
        }
        function main() { return fib(15) }
        "#,
    );
    assert_eq!(control, Control::Return(num(610.0)));
}

#[test]
fn test_lists_and_objects_are_shared() {
    let control = run_main(
        r#"
        function grow(list) { push(list, 3) }
        function main() {
            let a = [1, 2]
            let b = a
            grow(b)
            let o = {hp: 10}
            let p = o
            p.hp = p.hp - 4
            return [a.length, o.hp, a == b, a == [1, 2, 3]]
        }
        "#,
    );
    assert_eq!(
        control,
        Control::Return(Val::list(vec![
            num(3.0),
            num(6.0),
            Val::Bool(true),
            Val::Bool(false)
        ]))
    );
}

#[test]
fn test_index_read_and_write() {
    let control = run_main(
        r#"
        function main() {
            let grid = [[0, 0], [0, 0]]
            grid[1][0] = 5
            grid[1][2] = 6
            let o = {}
            o["key"] = "v"
            return [grid[1], o.key, "abc"[1]]
        }
        "#,
    );
    assert_eq!(
        control,
        Control::Return(Val::list(vec![
            Val::list(vec![num(5.0), num(0.0), num(6.0)]),
            Val::str("v"),
            Val::str("b"),
        ]))
    );
}

#[test]
fn test_functions_are_values() {
    let control = run_main(
        r#"
        function double(x) { return x * 2 }
        function apply(f, v) { return f(v) }
        function main() { return apply(double, 21) }
        "#,
    );
    assert_eq!(control, Control::Return(num(42.0)));
}

#[test]
fn test_native_table_members_are_callable() {
    let control = run_main("function main() { let m = Math\n return m.max(1, 9, 4) }");
    assert_eq!(control, Control::Return(num(9.0)));
}
