//! Tests for standard library functions

use super::helpers::{num, run_main, thrown_code};
use crate::script::errors;
use crate::script::vm::Control;
use crate::script::Val;

/* ===================== Math Tests ===================== */

#[test]
fn test_math_rounding() {
    let control = run_main(
        r#"
        function main() {
            return [Math.floor(3.7), Math.floor(-3.2), Math.ceil(3.2), Math.round(2.5), Math.round(-2.5), Math.abs(-7)]
        }
        "#,
    );
    assert_eq!(
        control,
        Control::Return(Val::list(vec![
            num(3.0),
            num(-4.0),
            num(4.0),
            num(3.0),
            num(-2.0),
            num(7.0),
        ]))
    );
}

#[test]
fn test_math_min_max_sqrt() {
    let control = run_main("function main() { return [Math.min(4, -1, 2), Math.max(4, 9), Math.sqrt(16)] }");
    assert_eq!(
        control,
        Control::Return(Val::list(vec![num(-1.0), num(9.0), num(4.0)]))
    );
}

#[test]
fn test_math_rejects_non_numbers() {
    let control = run_main(r#"function main() { return Math.floor("3") }"#);
    assert_eq!(thrown_code(&control), errors::WRONG_ARG_TYPE);

    let control = run_main("function main() { return Math.max() }");
    assert_eq!(thrown_code(&control), errors::WRONG_ARG_COUNT);
}

/* ===================== Core Function Tests ===================== */

#[test]
fn test_type_and_str() {
    let control = run_main(
        r#"
        function f() {}
        function main() {
            return [type(1), type("s"), type(null), type([]), type({}), type(f), type(print), str(12) + str(true)]
        }
        "#,
    );
    assert_eq!(
        control,
        Control::Return(Val::list(vec![
            Val::str("number"),
            Val::str("string"),
            Val::str("null"),
            Val::str("list"),
            Val::str("object"),
            Val::str("function"),
            Val::str("function"),
            Val::str("12true"),
        ]))
    );
}

#[test]
fn test_len_push_keys() {
    let control = run_main(
        r#"
        function main() {
            let l = [1]
            let n = push(l, 2)
            return [n, len(l), len("héllo"), len({a: 1, b: 2}), keys({b: 1, a: 2})]
        }
        "#,
    );
    assert_eq!(
        control,
        Control::Return(Val::list(vec![
            num(2.0),
            num(2.0),
            num(5.0),
            num(2.0),
            Val::list(vec![Val::str("a"), Val::str("b")]),
        ]))
    );
}

#[test]
fn test_len_rejects_numbers() {
    let control = run_main("function main() { return len(3) }");
    assert_eq!(thrown_code(&control), errors::WRONG_ARG_TYPE);
}

#[test]
fn test_print_returns_null() {
    let control = run_main(r#"function main() { return print("hello", 1, [2]) }"#);
    assert_eq!(control, Control::Return(Val::Null));
}

#[test]
fn test_clock_reports_readings() {
    let control = run_main("function main() { let c = clock()\n return [c.frame, c.simulation, c.real] }");
    assert_eq!(
        control,
        Control::Return(Val::list(vec![num(0.0), num(0.0), num(0.0)]))
    );
}
