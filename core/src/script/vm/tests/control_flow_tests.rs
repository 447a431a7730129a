//! Tests for branches, loops and short-circuit operators

use super::helpers::{num, run_main, Rig};
use crate::script::vm::Control;
use crate::script::Val;

#[test]
fn test_if_else() {
    let mut rig = Rig::new();
    rig.load(
        r#"
        function classify(n) {
            if (n < 0) return "neg"
            else if (n == 0) { return "zero" }
            else { return "pos" }
        }
        "#,
    );
    for (n, expected) in [(-1.0, "neg"), (0.0, "zero"), (3.0, "pos")] {
        let vm = rig.call("classify", vec![num(n)]);
        assert_eq!(vm.control, Control::Return(Val::str(expected)));
    }
}

#[test]
fn test_while_with_break_and_continue() {
    let control = run_main(
        r#"
        function main() {
            let i = 0
            let sum = 0
            while (true) {
                i = i + 1
                if (i > 10) { break }
                let odd = i % 2 == 1
                if (odd) { continue }
                sum = sum + i
            }
            return sum
        }
        "#,
    );
    assert_eq!(control, Control::Return(num(30.0)));
}

#[test]
fn test_for_of_sums_list() {
    let control = run_main(
        r#"
        function main() {
            let total = 0
            for (let n of [1, 2, 3, 4]) {
                let scaled = n * 10
                total = total + scaled
            }
            return total
        }
        "#,
    );
    assert_eq!(control, Control::Return(num(100.0)));
}

#[test]
fn test_for_of_break_and_continue() {
    let control = run_main(
        r#"
        function main() {
            let seen = []
            for (let n of [1, 2, 3, 4, 5, 6]) {
                if (n == 2) continue
                if (n == 5) break
                push(seen, n)
            }
            return seen
        }
        "#,
    );
    assert_eq!(
        control,
        Control::Return(Val::list(vec![num(1.0), num(3.0), num(4.0)]))
    );
}

#[test]
fn test_nested_loops_keep_stack_balanced() {
    let control = run_main(
        r#"
        function main() {
            let pairs = 0
            for (let a of [1, 2, 3]) {
                let b = 0
                while (b < 3) {
                    b = b + 1
                    if (b == a) continue
                    pairs = pairs + 1
                }
            }
            return pairs
        }
        "#,
    );
    assert_eq!(control, Control::Return(num(6.0)));
}

#[test]
fn test_for_of_over_non_list_throws() {
    let control = run_main("function main() { for (let x of 5) {} }");
    assert_eq!(super::helpers::thrown_code(&control), "TypeError");
}

#[test]
fn test_logical_operators_short_circuit() {
    let mut rig = Rig::new();
    rig.load(
        r#"
        let calls = 0
        function touch(v) { calls = calls + 1
            return v }
        function main() {
            let a = false && touch(true)
            let b = true || touch(false)
            let c = null || touch("fallback")
            let d = 1 && touch(2)
            return [a, b, c, d]
        }
        "#,
    );
    let vm = rig.call("main", vec![]);
    assert_eq!(
        vm.control,
        Control::Return(Val::list(vec![
            Val::Bool(false),
            Val::Bool(true),
            Val::str("fallback"),
            num(2.0),
        ]))
    );
    assert_eq!(rig.globals["calls"], num(2.0));
}

#[test]
fn test_top_level_control_flow() {
    let mut rig = Rig::new();
    rig.load(
        r#"
        let total = 0
        for (let n of [1, 2, 3]) { total = total + n }
        if (total == 6) { let note = "ok"
            result = note }
        "#,
    );
    assert_eq!(rig.globals["total"], num(6.0));
    assert_eq!(rig.globals["result"], Val::str("ok"));
    assert!(!rig.globals.contains_key("note"));
}
