// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Rendered expressions must parse back under the LEMS grammar to the
//! same tree, modulo function renames.

use lemsgen_engine::ast::Expr;
use lemsgen_engine::parser::parse;
use lemsgen_engine::render::{lems_function_name, parse_source, render};
use lemsgen_engine::token::LexerType;

/// A location-free prefix form of `expr`. Calls are named as LEMS names
/// them when `rename` is set.
fn shape(expr: &Expr, rename: bool) -> String {
    match expr {
        Expr::Const(_, n, _) => format!("{n}"),
        Expr::Var(id, _) => id.clone(),
        Expr::App(func, args, _) => {
            let name = if rename {
                lems_function_name(func).unwrap_or(func.as_str())
            } else {
                func.as_str()
            };
            let args: Vec<String> = args.iter().map(|arg| shape(arg, rename)).collect();
            format!("{name}({})", args.join(", "))
        }
        Expr::Op1(op, r, _) => format!("({op:?} {})", shape(r, rename)),
        Expr::Op2(op, l, r, _) => format!("({op:?} {} {})", shape(l, rename), shape(r, rename)),
    }
}

const SOURCES: &[&str] = &[
    "(v_rest - v) / tau",
    "a - (b - c)",
    "a / (b * c)",
    "a ** b ** c",
    "(a ** b) ** c",
    "-x ** 2",
    "exp(-v / (2 * sigma ** 2))",
    "log(x) + log10(y) * sign(z)",
    "rand() < 0.5",
    "v > 1 and not w <= 2",
    "a == b or a != c",
    "x >= 3 and (y < 1 or z > 2)",
    "not (a > b)",
    "0 < x <= 1",
    "sqrt(abs(v)) - tanh(u) + cosh(0.25)",
];

#[test]
fn rendered_expressions_parse_back() {
    for source in SOURCES.iter() {
        let original = parse_source(source).unwrap();
        let rendered = render(source).unwrap();
        let reparsed = parse(&rendered, LexerType::Lems)
            .unwrap_or_else(|err| panic!("`{rendered}` does not parse: {err:?}"))
            .unwrap_or_else(|| panic!("`{rendered}` is empty"));
        assert_eq!(
            shape(&original, true),
            shape(&reparsed, false),
            "{source} rendered as {rendered}"
        );
    }
}

#[test]
fn rendered_expressions_use_lems_tokens() {
    for source in SOURCES.iter() {
        let rendered = render(source).unwrap();
        for token in ["**", "<", ">", "==", "!=", " and ", " or ", "not "] {
            assert!(!rendered.contains(token), "{token} in {rendered}");
        }
    }
}
