//! Parser tests: statement and expression shapes

use super::*;

fn parse_ok(source: &str) -> Script {
    parse_script(source).unwrap_or_else(|e| panic!("Parse failed: {}", e))
}

fn single_stmt(source: &str) -> StmtKind {
    let mut script = parse_ok(source);
    assert_eq!(script.body.len(), 1, "Expected one statement in {:?}", source);
    script.body.remove(0).kind
}

/* ===================== Program Structure ===================== */

#[test]
fn test_empty_program() {
    let script = parse_ok("");
    assert!(script.functions.is_empty());
    assert!(script.body.is_empty());

    let script = parse_ok("// nothing here\n/* or here */\n");
    assert!(script.body.is_empty());
}

#[test]
fn test_functions_and_statements_are_split() {
    let script = parse_ok(
        r#"
        let speed = 2
        function main(a, b) {
            suspend(3)
            return a + b
        }
        function idle() {}
        print("loaded")
        "#,
    );

    assert_eq!(script.functions.len(), 2);
    assert_eq!(script.functions[0].name, "main");
    assert_eq!(script.functions[0].params, vec!["a", "b"]);
    assert_eq!(script.functions[0].body.len(), 2);
    assert_eq!(script.functions[0].line, 3);
    assert_eq!(script.functions[1].name, "idle");
    assert!(script.functions[1].params.is_empty());
    assert_eq!(script.body.len(), 2);
}

#[test]
fn test_statement_lines() {
    let script = parse_ok("let a = 1\n\nlet b = 2;\nb = a");
    let lines: Vec<usize> = script.body.iter().map(|s| s.line).collect();
    assert_eq!(lines, vec![1, 3, 4]);
}

#[test]
fn test_duplicate_parameter_rejected() {
    let err = parse_script("function f(a, a) {}").unwrap_err();
    assert!(matches!(err, ParseError::BuildError { .. }));
    assert!(err.message().contains("duplicate parameter 'a'"));
}

#[test]
fn test_build_error_display() {
    let err = parse_script("function f(a, a) {}").unwrap_err();

    let text = err.to_string();
    assert!(text.starts_with("line 1: "), "{}", text);
    assert!(text.ends_with(err.message()));

    let source: &dyn std::error::Error = &err;
    assert!(source.source().is_none());
}

#[test]
fn test_syntax_error_reports_line() {
    let err = parse_script("let a = 1\nlet = 2").unwrap_err();
    assert!(matches!(err, ParseError::PestError { .. }));
    assert_eq!(err.line(), 2);
}

/* ===================== Statements ===================== */

#[test]
fn test_let_without_initializer() {
    match single_stmt("let x") {
        StmtKind::Let { name, init } => {
            assert_eq!(name, "x");
            assert!(init.is_none());
        }
        other => panic!("Expected Let, got {:?}", other),
    }
}

#[test]
fn test_keyword_prefixed_identifiers() {
    match single_stmt("letter = returned") {
        StmtKind::Assign {
            target: AssignTarget::Ident { name },
            value: Expr::Ident { name: value },
        } => {
            assert_eq!(name, "letter");
            assert_eq!(value, "returned");
        }
        other => panic!("Expected Assign, got {:?}", other),
    }
}

#[test]
fn test_member_and_index_assignment() {
    match single_stmt("enemy.pos[1] = 5") {
        StmtKind::Assign {
            target: AssignTarget::Index { object, index },
            value: Expr::LitNum { v },
        } => {
            assert!(matches!(object, Expr::Member { ref property, .. } if property == "pos"));
            assert!(matches!(index, Expr::LitNum { v } if v == 1.0));
            assert_eq!(v, 5.0);
        }
        other => panic!("Expected index assignment, got {:?}", other),
    }

    match single_stmt("door.open = true") {
        StmtKind::Assign {
            target: AssignTarget::Member { object, property },
            ..
        } => {
            assert!(matches!(object, Expr::Ident { ref name } if name == "door"));
            assert_eq!(property, "open");
        }
        other => panic!("Expected member assignment, got {:?}", other),
    }
}

#[test]
fn test_equality_is_not_assignment() {
    match single_stmt("x == 1") {
        StmtKind::Expr {
            expr: Expr::Binary { op, .. },
        } => assert_eq!(op, BinaryOp::Eq),
        other => panic!("Expected comparison, got {:?}", other),
    }
}

#[test]
fn test_if_else_chain() {
    match single_stmt("if (a) { b() } else if (c) d() else { e() }") {
        StmtKind::If { then_s, else_s, .. } => {
            assert!(matches!(then_s.kind, StmtKind::Block { .. }));
            let else_s = else_s.expect("Expected else branch");
            match else_s.kind {
                StmtKind::If { else_s, .. } => assert!(else_s.is_some()),
                other => panic!("Expected nested if, got {:?}", other),
            }
        }
        other => panic!("Expected If, got {:?}", other),
    }
}

#[test]
fn test_for_of() {
    match single_stmt("for (let item of items) { print(item) }") {
        StmtKind::ForOf {
            binding, iterable, ..
        } => {
            assert_eq!(binding, "item");
            assert!(matches!(iterable, Expr::Ident { ref name } if name == "items"));
        }
        other => panic!("Expected ForOf, got {:?}", other),
    }
}

#[test]
fn test_try_catch() {
    match single_stmt("try { risky() } catch (err) { print(err.message) }") {
        StmtKind::Try {
            body,
            catch_var,
            handler,
        } => {
            assert_eq!(body.len(), 1);
            assert_eq!(catch_var, "err");
            assert_eq!(handler.len(), 1);
        }
        other => panic!("Expected Try, got {:?}", other),
    }
}

#[test]
fn test_loop_control_and_return() {
    let script = parse_ok("function f() { while (true) { break; continue } return }");
    let body = &script.functions[0].body;
    match &body[0].kind {
        StmtKind::While { body, .. } => match &body.kind {
            StmtKind::Block { body } => {
                assert!(matches!(body[0].kind, StmtKind::Break));
                assert!(matches!(body[1].kind, StmtKind::Continue));
            }
            other => panic!("Expected block, got {:?}", other),
        },
        other => panic!("Expected While, got {:?}", other),
    }
    assert!(matches!(body[1].kind, StmtKind::Return { value: None }));
}

/* ===================== Expressions ===================== */

#[test]
fn test_precedence() {
    // 1 + 2 * 3 == 7 && !done
    let expr = parse_expression("1 + 2 * 3 == 7 && !done").unwrap();
    let Expr::Logical { op, left, right } = expr else {
        panic!("Expected logical and");
    };
    assert_eq!(op, LogicalOp::And);
    assert!(matches!(*right, Expr::Unary { op: UnaryOp::Not, .. }));
    let Expr::Binary { op, left, .. } = *left else {
        panic!("Expected equality");
    };
    assert_eq!(op, BinaryOp::Eq);
    let Expr::Binary { op, right, .. } = *left else {
        panic!("Expected addition");
    };
    assert_eq!(op, BinaryOp::Add);
    assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
}

#[test]
fn test_left_associative_subtraction() {
    let expr = parse_expression("10 - 4 - 3").unwrap();
    let Expr::Binary { op, left, right } = expr else {
        panic!("Expected subtraction");
    };
    assert_eq!(op, BinaryOp::Sub);
    assert!(matches!(*right, Expr::LitNum { v } if v == 3.0));
    assert!(matches!(*left, Expr::Binary { op: BinaryOp::Sub, .. }));
}

#[test]
fn test_negative_literal_is_folded() {
    assert!(matches!(
        parse_expression("-2.5").unwrap(),
        Expr::LitNum { v } if v == -2.5
    ));
    assert!(matches!(
        parse_expression("-x").unwrap(),
        Expr::Unary { op: UnaryOp::Neg, .. }
    ));
}

#[test]
fn test_call_chain() {
    let expr = parse_expression("Gui.find(\"ok\").show()").unwrap();
    let Expr::Call { callee, args, .. } = expr else {
        panic!("Expected call");
    };
    assert!(args.is_empty());
    let Expr::Member { object, property } = *callee else {
        panic!("Expected member callee");
    };
    assert_eq!(property, "show");
    assert!(matches!(*object, Expr::Call { ref args, .. } if args.len() == 1));
}

#[test]
fn test_string_escapes() {
    assert!(matches!(
        parse_expression(r#""a\"b\\c\nd""#).unwrap(),
        Expr::LitStr { v } if v == "a\"b\\c\nd"
    ));
    assert!(matches!(
        parse_expression(r#""""#).unwrap(),
        Expr::LitStr { v } if v.is_empty()
    ));
}

#[test]
fn test_list_and_object_literals() {
    let Expr::List { items } = parse_expression("[1, \"two\", [3],]").unwrap() else {
        panic!("Expected list");
    };
    assert_eq!(items.len(), 3);

    let script = parse_ok(r#"let o = {x: 1, "y z": null, nested: {}}"#);
    let StmtKind::Let {
        init: Some(Expr::Obj { props }),
        ..
    } = &script.body[0].kind
    else {
        panic!("Expected object literal");
    };
    let keys: Vec<&str> = props.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["x", "y z", "nested"]);
}

#[test]
fn test_ast_serializes_to_json() {
    let script = parse_ok("let a = [1]");
    let json = serde_json::to_value(&script).unwrap();
    assert_eq!(json["body"][0]["t"], "Let");
    assert_eq!(json["body"][0]["name"], "a");
    assert_eq!(json["body"][0]["line"], 1);
}
