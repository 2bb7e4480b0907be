// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use super::*;
use crate::ast::{AssignOp, BinaryOp, Expr, UnaryOp};
use crate::common::ErrorCode;
use crate::token::LexerType;

fn parse_eq(input: &str) -> Result<Option<Expr>, EquationError> {
    parse(input, LexerType::Equation)
}

fn parse_lems(input: &str) -> Result<Option<Expr>, EquationError> {
    parse(input, LexerType::Lems)
}

fn num(n: f64) -> Expr {
    Expr::Const(format!("{n}"), n, Loc::default())
}

fn var(id: &str) -> Expr {
    Expr::Var(id.to_owned(), Loc::default())
}

fn op2(op: BinaryOp, l: Expr, r: Expr) -> Expr {
    Expr::Op2(op, Box::new(l), Box::new(r), Loc::default())
}

fn op1(op: UnaryOp, r: Expr) -> Expr {
    Expr::Op1(op, Box::new(r), Loc::default())
}

// ============================================================================
// Atom parsing tests
// ============================================================================

#[test]
fn test_parse_number() {
    let ast = parse_eq("42").unwrap().unwrap();
    assert!(matches!(ast, Expr::Const(s, n, _) if s == "42" && n == 42.0));
}

#[test]
fn test_parse_trailing_dot() {
    let ast = parse_eq("10.").unwrap().unwrap();
    assert!(matches!(ast, Expr::Const(s, n, _) if s == "10." && n == 10.0));
}

#[test]
fn test_parse_scientific_notation() {
    let ast = parse_eq("1e-3").unwrap().unwrap();
    assert!(matches!(ast, Expr::Const(s, n, _) if s == "1e-3" && n == 1e-3));
}

#[test]
fn test_parse_identifier() {
    let ast = parse_eq("v_rest").unwrap().unwrap();
    assert!(matches!(ast, Expr::Var(id, _) if id == "v_rest"));
}

#[test]
fn test_parse_parenthesized() {
    let ast = parse_eq("(42)").unwrap().unwrap().strip_loc();
    assert_eq!(Expr::Const("42".to_owned(), 42.0, Loc::default()), ast);
}

#[test]
fn test_parse_empty() {
    assert!(parse_eq("").unwrap().is_none());
    assert!(parse_eq("   ").unwrap().is_none());
    assert!(parse_eq("# nothing here").unwrap().is_none());
    assert!(parse_eq("\n\n").unwrap().is_none());
}

// ============================================================================
// Operator precedence tests
// ============================================================================

#[test]
fn test_parse_arithmetic_precedence() {
    let ast = parse_eq("a + b * c").unwrap().unwrap().strip_loc();
    let expected = op2(
        BinaryOp::Add,
        var("a"),
        op2(BinaryOp::Mul, var("b"), var("c")),
    );
    assert_eq!(expected, ast);

    let ast = parse_eq("a - b - c").unwrap().unwrap().strip_loc();
    let expected = op2(
        BinaryOp::Sub,
        op2(BinaryOp::Sub, var("a"), var("b")),
        var("c"),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_power_right_associative() {
    let ast = parse_eq("a ** b ** c").unwrap().unwrap().strip_loc();
    let expected = op2(
        BinaryOp::Exp,
        var("a"),
        op2(BinaryOp::Exp, var("b"), var("c")),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_power_binds_tighter_than_negation() {
    let ast = parse_eq("-x ** 2").unwrap().unwrap();
    let expected = op1(
        UnaryOp::Negative,
        op2(BinaryOp::Exp, var("x"), Expr::Const("2".to_owned(), 2.0, Loc::default())),
    );
    assert_eq!(expected, ast.strip_loc());

    let ast = parse_eq("2 ** -1").unwrap().unwrap().strip_loc();
    let expected = op2(
        BinaryOp::Exp,
        Expr::Const("2".to_owned(), 2.0, Loc::default()),
        op1(
            UnaryOp::Negative,
            Expr::Const("1".to_owned(), 1.0, Loc::default()),
        ),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_not_binds_looser_than_comparison() {
    let ast = parse_eq("not a < b").unwrap().unwrap().strip_loc();
    let expected = op1(UnaryOp::Not, op2(BinaryOp::Lt, var("a"), var("b")));
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_chained_comparison() {
    let ast = parse_eq("0 < x <= 1").unwrap().unwrap().strip_loc();
    let expected = op2(
        BinaryOp::And,
        op2(BinaryOp::Lt, num(0.0), var("x")),
        op2(BinaryOp::Lte, var("x"), num(1.0)),
    );
    assert_eq!(expected, ast);

    let ast = parse_eq("a < b < c == d").unwrap().unwrap().strip_loc();
    let expected = op2(
        BinaryOp::And,
        op2(
            BinaryOp::And,
            op2(BinaryOp::Lt, var("a"), var("b")),
            op2(BinaryOp::Lt, var("b"), var("c")),
        ),
        op2(BinaryOp::Eq, var("c"), var("d")),
    );
    assert_eq!(expected, ast);

    let ast = parse_lems("0 .lt. x .le. 1").unwrap().unwrap().strip_loc();
    let expected = op2(
        BinaryOp::And,
        op2(BinaryOp::Lt, num(0.0), var("x")),
        op2(BinaryOp::Lte, var("x"), num(1.0)),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_boolean_precedence() {
    let ast = parse_eq("a or b and not c").unwrap().unwrap().strip_loc();
    let expected = op2(
        BinaryOp::Or,
        var("a"),
        op2(BinaryOp::And, var("b"), op1(UnaryOp::Not, var("c"))),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_threshold() {
    let ast = parse_eq("v > -50*mV").unwrap().unwrap();
    assert_eq!(Loc::new(0, 10), ast.get_loc());
    let expected = op2(
        BinaryOp::Gt,
        var("v"),
        op2(
            BinaryOp::Mul,
            op1(UnaryOp::Negative, num(50.0)),
            var("mV"),
        ),
    );
    assert_eq!(expected, ast.strip_loc());
}

#[test]
fn test_parse_function_call() {
    let ast = parse_eq("exp(-t/tau) + rand()").unwrap().unwrap().strip_loc();
    let expected = op2(
        BinaryOp::Add,
        Expr::App(
            "exp".to_owned(),
            vec![op2(
                BinaryOp::Div,
                op1(UnaryOp::Negative, var("t")),
                var("tau"),
            )],
            Loc::default(),
        ),
        Expr::App("rand".to_owned(), vec![], Loc::default()),
    );
    assert_eq!(expected, ast);
}

#[test]
fn test_parse_lems_grammar() {
    let ast = parse_lems("t .gt. ( lastspike + 5 * ms )")
        .unwrap()
        .unwrap()
        .strip_loc();
    let expected = op2(
        BinaryOp::Gt,
        var("t"),
        op2(
            BinaryOp::Add,
            var("lastspike"),
            op2(BinaryOp::Mul, num(5.0), var("ms")),
        ),
    );
    assert_eq!(expected, ast);

    let ast = parse_lems("x^2 .and. .not. (y .le. 1)")
        .unwrap()
        .unwrap()
        .strip_loc();
    let expected = op2(
        BinaryOp::And,
        op2(BinaryOp::Exp, var("x"), num(2.0)),
        op1(UnaryOp::Not, op2(BinaryOp::Lte, var("y"), num(1.0))),
    );
    assert_eq!(expected, ast);
}

// ============================================================================
// Error tests
// ============================================================================

#[test]
fn test_parse_errors() {
    let err = parse_eq("a +").unwrap_err();
    assert_eq!(ErrorCode::UnrecognizedEof, err.code);
    assert_eq!(3, err.start);

    let err = parse_eq("a b").unwrap_err();
    assert_eq!(ErrorCode::ExtraToken, err.code);
    assert_eq!((2, 3), (err.start, err.end));

    let err = parse_eq("(a + b").unwrap_err();
    assert_eq!(ErrorCode::UnrecognizedEof, err.code);

    let err = parse_eq("a * )").unwrap_err();
    assert_eq!(ErrorCode::UnrecognizedToken, err.code);

    let err = parse_eq("a % b").unwrap_err();
    assert_eq!(ErrorCode::UnrecognizedToken, err.code);

    // two statements are not an expression
    let err = parse_eq("a\nb").unwrap_err();
    assert_eq!(ErrorCode::ExtraToken, err.code);
}

// ============================================================================
// Statement tests
// ============================================================================

#[test]
fn test_parse_statements() {
    let stmts = parse_statements("v = v_r\nw += b # adaptation\n\n").unwrap();
    assert_eq!(2, stmts.len());

    assert_eq!("v", stmts[0].target);
    assert_eq!(AssignOp::Assign, stmts[0].op);
    assert_eq!(var("v_r"), stmts[0].value.clone().strip_loc());
    assert_eq!(Loc::new(0, 7), stmts[0].loc);

    assert_eq!("w", stmts[1].target);
    assert_eq!(AssignOp::AddAssign, stmts[1].op);
    assert_eq!(var("b"), stmts[1].value.clone().strip_loc());
}

#[test]
fn test_parse_statements_semicolons() {
    let stmts = parse_statements("x -= 1; y *= 2; z /= 3").unwrap();
    let ops: Vec<AssignOp> = stmts.iter().map(|s| s.op).collect();
    assert_eq!(
        vec![AssignOp::SubAssign, AssignOp::MulAssign, AssignOp::DivAssign],
        ops
    );
}

#[test]
fn test_parse_statements_empty() {
    assert!(parse_statements("").unwrap().is_empty());
    assert!(parse_statements("# just a comment").unwrap().is_empty());
}

#[test]
fn test_parse_statements_errors() {
    let err = parse_statements("v == 1").unwrap_err();
    assert_eq!(ErrorCode::BadAssignment, err.code);
    assert_eq!((2, 4), (err.start, err.end));

    let err = parse_statements("1 = v").unwrap_err();
    assert_eq!(ErrorCode::BadAssignment, err.code);

    let err = parse_statements("v = 1 w = 2").unwrap_err();
    assert_eq!(ErrorCode::ExtraToken, err.code);

    let err = parse_statements("v").unwrap_err();
    assert_eq!(ErrorCode::UnrecognizedEof, err.code);
}
