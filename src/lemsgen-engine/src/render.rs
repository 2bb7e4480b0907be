// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! LEMS expression formatter.
//!
//! Converts model-equation ASTs into LEMS expression strings:
//! - Operator translation (`**` to `^`, `<` to `.lt.`, `and` to `.and.`)
//! - A fixed function whitelist with a handful of renames
//! - Number formatting using %g style
//! - Minimal parenthesization with spaced binary operators

use std::collections::BTreeMap;

use crate::ast::{Assignment, BinaryOp, Expr, UnaryOp};
use crate::common::Result;
use crate::expr_err;
use crate::parser::{parse, parse_statements};
use crate::token::LexerType;

/// Functions LEMS understands under the same name.
const PASSTHROUGH_FUNCTIONS: &[&str] = &[
    "sin",
    "cos",
    "tan",
    "sinh",
    "cosh",
    "tanh",
    "exp",
    "sqrt",
    "ceil",
    "abs",
    "sum",
    "product",
    "factorial",
];

/// Functions spelled differently in LEMS.
const RENAMED_FUNCTIONS: &[(&str, &str)] = &[
    ("log", "ln"),
    ("log10", "log"),
    ("rand", "random"),
    ("sign", "H"),
];

/// Binding strength of leaves: variables, numbers and calls never need
/// parentheses.
const ATOM_PRECEDENCE: u8 = 9;

/// Look up the LEMS name for a model-equation function.
pub fn lems_function_name(name: &str) -> Option<&'static str> {
    if let Some(func) = PASSTHROUGH_FUNCTIONS.iter().find(|&&f| f == name) {
        return Some(func);
    }
    RENAMED_FUNCTIONS
        .iter()
        .find(|&&(from, _)| from == name)
        .map(|&(_, to)| to)
}

/// Formats model-equation expressions as LEMS expression strings.
#[derive(Clone, Debug, Default)]
pub struct LemsFormatter {
    /// identifiers replaced verbatim on output, e.g. `i` -> `index`
    substitutions: BTreeMap<String, String>,
}

impl LemsFormatter {
    pub fn new() -> Self {
        LemsFormatter {
            substitutions: BTreeMap::new(),
        }
    }

    /// Replace every occurrence of the identifier `from` with `to`.
    pub fn with_substitution(mut self, from: &str, to: &str) -> Self {
        self.substitutions.insert(from.to_owned(), to.to_owned());
        self
    }

    /// Parse a model-equation string and format it for LEMS.
    pub fn render(&self, source: &str) -> Result<String> {
        let expr = parse_source(source)?;
        self.format_expr(&expr)
    }

    /// Format an expression. Fails with `UnsupportedFunction` on the first
    /// call outside the whitelist; nothing is returned in that case.
    pub fn format_expr(&self, expr: &Expr) -> Result<String> {
        let mut out = String::new();
        self.format_into(expr, &mut out)?;
        Ok(out)
    }

    /// Format a statement's right-hand side. Augmented assignments expand
    /// to `target op (value)`.
    pub fn format_assignment(&self, stmt: &Assignment) -> Result<String> {
        let value = self.format_expr(&stmt.value)?;
        match stmt.op.binary_op() {
            None => Ok(value),
            Some(op) => Ok(format!(
                "{} {} ({})",
                self.format_name(&stmt.target),
                op_str(op),
                value
            )),
        }
    }

    fn format_into(&self, expr: &Expr, out: &mut String) -> Result<()> {
        match expr {
            Expr::Const(_, n, _) => out.push_str(&format_number(*n)),
            Expr::Var(id, _) => out.push_str(&self.format_name(id)),
            Expr::App(func, args, _) => {
                let name = match lems_function_name(func) {
                    Some(name) => name,
                    None => return expr_err!(UnsupportedFunction, func.clone()),
                };
                out.push_str(name);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.format_into(arg, out)?;
                }
                out.push(')');
            }
            Expr::Op1(op, inner, _) => self.format_unary(*op, inner, out)?,
            Expr::Op2(op, left, right, _) => self.format_binary(*op, left, right, out)?,
        }
        Ok(())
    }

    fn format_name(&self, name: &str) -> String {
        match self.substitutions.get(name) {
            Some(replacement) => replacement.clone(),
            None => name.to_owned(),
        }
    }

    fn format_unary(&self, op: UnaryOp, inner: &Expr, out: &mut String) -> Result<()> {
        match op {
            UnaryOp::Positive => out.push('+'),
            UnaryOp::Negative => out.push('-'),
            UnaryOp::Not => out.push_str(".not. "),
        }
        let wrap = op == UnaryOp::Not || precedence(inner) != ATOM_PRECEDENCE;
        self.format_child(inner, wrap, out)
    }

    fn format_binary(&self, op: BinaryOp, left: &Expr, right: &Expr, out: &mut String) -> Result<()> {
        let prec = op.precedence();

        // exponentiation groups to the right, everything else to the left
        let wrap_left = if op == BinaryOp::Exp {
            precedence(left) <= prec
        } else {
            precedence(left) < prec
        };
        let wrap_right = precedence(right) <= prec;

        self.format_child(left, wrap_left, out)?;
        out.push(' ');
        out.push_str(op_str(op));
        out.push(' ');
        self.format_child(right, wrap_right, out)
    }

    fn format_child(&self, expr: &Expr, wrap: bool, out: &mut String) -> Result<()> {
        if wrap {
            out.push('(');
        }
        self.format_into(expr, out)?;
        if wrap {
            out.push(')');
        }
        Ok(())
    }
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Op1(op, _, _) => op.precedence(),
        Expr::Op2(op, _, _, _) => op.precedence(),
        Expr::Const(_, _, _) | Expr::Var(_, _) | Expr::App(_, _, _) => ATOM_PRECEDENCE,
    }
}

fn op_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Exp => "^",
        BinaryOp::Lt => ".lt.",
        BinaryOp::Gt => ".gt.",
        BinaryOp::Lte => ".le.",
        BinaryOp::Gte => ".ge.",
        BinaryOp::Eq => ".eq.",
        BinaryOp::Neq => ".ne.",
        BinaryOp::And => ".and.",
        BinaryOp::Or => ".or.",
    }
}

/// Parse a single model-equation expression, treating empty input as an
/// error.
pub fn parse_source(source: &str) -> Result<Expr> {
    match parse(source, LexerType::Equation) {
        Ok(Some(expr)) => Ok(expr),
        Ok(None) => expr_err!(EmptyEquation, format!("`{source}`")),
        Err(err) => Err(err.in_equation(source)),
    }
}

/// Parse model statements, attaching the source text to any error.
pub fn parse_code(source: &str) -> Result<Vec<Assignment>> {
    parse_statements(source).map_err(|err| err.in_equation(source))
}

/// Render a model-equation expression as a LEMS expression.
pub fn render(source: &str) -> Result<String> {
    LemsFormatter::new().render(source)
}

/// Format a number using %g-style formatting.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    let abs = value.abs();
    if (1e-4..1e6).contains(&abs) {
        // Display gives the shortest round-trip decimal, which never has
        // trailing zeros after the point
        format!("{value}")
    } else {
        format!("{value:e}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{ErrorCode, ErrorKind};

    #[test]
    fn test_format_number() {
        assert_eq!("0", format_number(0.0));
        assert_eq!("42", format_number(42.0));
        assert_eq!("10", format_number(10.0));
        assert_eq!("-0.065", format_number(-0.065));
        assert_eq!("0.001", format_number(1e-3));
        assert_eq!("1e6", format_number(1e6));
        assert_eq!("2.5e-7", format_number(2.5e-7));
    }

    #[test]
    fn test_render_operators() {
        assert_eq!("x ^ 2", render("x**2").unwrap());
        assert_eq!("a .lt. b", render("a < b").unwrap());
        assert_eq!("a .le. b", render("a <= b").unwrap());
        assert_eq!("a .gt. b", render("a>b").unwrap());
        assert_eq!("a .ge. b", render("a >= b").unwrap());
        assert_eq!("a .eq. b", render("a == b").unwrap());
        assert_eq!("a .ne. b", render("a != b").unwrap());
        assert_eq!("a .and. b", render("a and b").unwrap());
        assert_eq!("a .or. b", render("a or b").unwrap());
        assert_eq!(".not. (a)", render("not a").unwrap());
        assert_eq!("0 .lt. x .and. x .le. 1", render("0 < x <= 1").unwrap());
    }

    #[test]
    fn test_render_function_renames() {
        assert_eq!("random() + log(x)", render("rand() + log10(x)").unwrap());
        assert_eq!("sin(x)", render("sin(x)").unwrap());
        assert_eq!("ln(x)", render("log(x)").unwrap());
        assert_eq!("H(v)", render("sign(v)").unwrap());
        assert_eq!("exp(-t / tau)", render("exp(-t/tau)").unwrap());
    }

    #[test]
    fn test_render_unsupported_function() {
        let err = render("1 + foobar(x)").unwrap_err();
        assert_eq!(ErrorCode::UnsupportedFunction, err.code);
        assert_eq!(ErrorKind::Expression, err.kind);
        assert_eq!(Some("foobar".to_owned()), err.get_details());

        // nested inside an allowed call
        let err = render("exp(clip(v, 0, 1))").unwrap_err();
        assert_eq!(ErrorCode::UnsupportedFunction, err.code);
        assert_eq!(Some("clip".to_owned()), err.get_details());
    }

    #[test]
    fn test_render_parens() {
        assert_eq!("(1 - v) / tau", render("(1 - v) / tau").unwrap());
        assert_eq!("a - (b - c)", render("a - (b - c)").unwrap());
        assert_eq!("a - b - c", render("(a - b) - c").unwrap());
        assert_eq!("a * b + c", render("(a * b) + c").unwrap());
        assert_eq!("-(a + b)", render("-(a + b)").unwrap());
        assert_eq!("(-x) ^ 2", render("(-x)**2").unwrap());
        assert_eq!("-(x ^ 2)", render("-x**2").unwrap());
        assert_eq!("a ^ (b ^ c)", render("a ** b ** c").unwrap());
        assert_eq!("(a ^ b) ^ c", render("(a ** b) ** c").unwrap());
        assert_eq!("2 ^ (-1)", render("2 ** -1").unwrap());
        assert_eq!("(a .or. b) .and. c", render("(a or b) and c").unwrap());
        assert_eq!(".not. (v .gt. 1)", render("not v > 1").unwrap());
    }

    #[test]
    fn test_render_numbers() {
        assert_eq!("10 * ms", render("10. * ms").unwrap());
        assert_eq!("0.001 * second", render("1e-3 * second").unwrap());
    }

    #[test]
    fn test_render_substitution() {
        let formatter = LemsFormatter::new().with_substitution("i", "index");
        assert_eq!(
            "20 * mV * index / (N - 1)",
            formatter.render("20*mV*i/(N-1)").unwrap()
        );

        let formatter = LemsFormatter::new()
            .with_substitution("i", "0")
            .with_substitution("N", "1");
        assert_eq!("v0 + 0 * dv / 1", formatter.render("v0 + i*dv/N").unwrap());
    }

    #[test]
    fn test_render_errors() {
        let err = render("").unwrap_err();
        assert_eq!(ErrorCode::EmptyEquation, err.code);

        let err = render("a +").unwrap_err();
        assert_eq!(ErrorCode::UnrecognizedEof, err.code);
        assert!(err.get_details().unwrap().contains("a +"));
    }

    #[test]
    fn test_format_assignment() {
        let formatter = LemsFormatter::new();
        let stmts = parse_code("v = v_r; w += b*2; g *= 0.5").unwrap();
        let rendered: Vec<String> = stmts
            .iter()
            .map(|s| formatter.format_assignment(s).unwrap())
            .collect();
        assert_eq!(vec!["v_r", "w + (b * 2)", "g * (0.5)"], rendered);
    }

    #[test]
    fn test_render_round_trip() {
        let cases = [
            "(1 - v) / tau",
            "v > -50*mV and not (w <= 2) or x != 3",
            "-x**2 + 2**-1 - a ** b ** c",
            "exp(-(t - t0)/tau) * sin(2*x) / (a - (b - c))",
            "log10(x) + rand() * sign(y - 1)",
        ];
        for case in cases.iter() {
            let src = parse_source(case).unwrap();
            let rendered = render(case).unwrap();
            let reparsed = parse(&rendered, LexerType::Lems).unwrap().unwrap();
            // function renames change names, so compare the renamed source
            let expected = rename_functions(src).strip_loc();
            assert_eq!(expected, reparsed.strip_loc(), "round trip of {case}");
        }
    }

    fn rename_functions(expr: Expr) -> Expr {
        match expr {
            Expr::App(func, args, loc) => Expr::App(
                lems_function_name(&func).unwrap().to_owned(),
                args.into_iter().map(rename_functions).collect(),
                loc,
            ),
            Expr::Op1(op, r, loc) => Expr::Op1(op, Box::new(rename_functions(*r)), loc),
            Expr::Op2(op, l, r, loc) => Expr::Op2(
                op,
                Box::new(rename_functions(*l)),
                Box::new(rename_functions(*r)),
                loc,
            ),
            other => other,
        }
    }
}
