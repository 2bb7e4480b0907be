// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::collections::BTreeSet;
use std::fmt;

/// Loc describes a location in an equation by the starting point and ending point.
/// Equations are short strings written for a single variable -- u16 is long enough.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default, Hash)]
pub struct Loc {
    pub start: u16,
    pub end: u16,
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

impl Loc {
    pub fn new(start: usize, end: usize) -> Self {
        Loc {
            start: start as u16,
            end: end as u16,
        }
    }

    /// union takes a second Loc and returns the inclusive range from the
    /// start of the earlier token to the end of the later token.
    pub fn union(&self, rhs: &Self) -> Self {
        Loc {
            start: self.start.min(rhs.start),
            end: self.end.max(rhs.end),
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum BinaryOp {
    Add,
    Sub,
    Exp,
    Mul,
    Div,
    Gt,
    Lt,
    Gte,
    Lte,
    Eq,
    Neq,
    And,
    Or,
}

impl BinaryOp {
    /// Binding strength in the target grammar; larger binds tighter.
    pub(crate) fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Gt
            | BinaryOp::Lt
            | BinaryOp::Gte
            | BinaryOp::Lte
            | BinaryOp::Eq
            | BinaryOp::Neq => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div => 6,
            BinaryOp::Exp => 8,
        }
    }

    pub fn is_boolean(self) -> bool {
        self.precedence() <= 4
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum UnaryOp {
    Positive,
    Negative,
    Not,
}

impl UnaryOp {
    pub(crate) fn precedence(self) -> u8 {
        match self {
            UnaryOp::Not => 3,
            UnaryOp::Positive | UnaryOp::Negative => 7,
        }
    }
}

/// Expr is a parsed expression in either grammar. Function names are kept
/// as written; the renderer decides whether they are allowed.
#[derive(PartialEq, Clone, Debug)]
pub enum Expr {
    Const(String, f64, Loc),
    Var(String, Loc),
    App(String, Vec<Expr>, Loc),
    Op1(UnaryOp, Box<Expr>, Loc),
    Op2(BinaryOp, Box<Expr>, Box<Expr>, Loc),
}

impl Expr {
    pub fn get_loc(&self) -> Loc {
        match self {
            Expr::Const(_, _, loc) => *loc,
            Expr::Var(_, loc) => *loc,
            Expr::App(_, _, loc) => *loc,
            Expr::Op1(_, _, loc) => *loc,
            Expr::Op2(_, _, _, loc) => *loc,
        }
    }

    /// true when the outermost operation produces a truth value
    pub fn is_boolean(&self) -> bool {
        match self {
            Expr::Op1(UnaryOp::Not, _, _) => true,
            Expr::Op2(op, _, _, _) => op.is_boolean(),
            _ => false,
        }
    }

    /// Every variable name referenced by the expression, excluding the
    /// names of called functions.
    pub fn identifiers(&self) -> BTreeSet<String> {
        let mut idents = BTreeSet::new();
        self.collect_identifiers(&mut idents);
        idents
    }

    fn collect_identifiers(&self, idents: &mut BTreeSet<String>) {
        match self {
            Expr::Const(_, _, _) => {}
            Expr::Var(id, _) => {
                idents.insert(id.clone());
            }
            Expr::App(_, args, _) => {
                for arg in args.iter() {
                    arg.collect_identifiers(idents);
                }
            }
            Expr::Op1(_, r, _) => r.collect_identifiers(idents),
            Expr::Op2(_, l, r, _) => {
                l.collect_identifiers(idents);
                r.collect_identifiers(idents);
            }
        }
    }

    pub fn references(&self, ident: &str) -> bool {
        match self {
            Expr::Const(_, _, _) => false,
            Expr::Var(id, _) => id == ident,
            Expr::App(_, args, _) => args.iter().any(|arg| arg.references(ident)),
            Expr::Op1(_, r, _) => r.references(ident),
            Expr::Op2(_, l, r, _) => l.references(ident) || r.references(ident),
        }
    }

    #[cfg(test)]
    pub(crate) fn strip_loc(self) -> Self {
        let loc = Loc::default();
        match self {
            Expr::Const(s, n, _loc) => Expr::Const(s, n, loc),
            Expr::Var(v, _loc) => Expr::Var(v, loc),
            Expr::App(func, args, _loc) => {
                Expr::App(func, args.into_iter().map(|arg| arg.strip_loc()).collect(), loc)
            }
            Expr::Op1(op, r, _loc) => Expr::Op1(op, Box::new(r.strip_loc()), loc),
            Expr::Op2(op, l, r, _loc) => {
                Expr::Op2(op, Box::new(l.strip_loc()), Box::new(r.strip_loc()), loc)
            }
        }
    }
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl AssignOp {
    /// The arithmetic operator an augmented assignment expands to.
    pub fn binary_op(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinaryOp::Add),
            AssignOp::SubAssign => Some(BinaryOp::Sub),
            AssignOp::MulAssign => Some(BinaryOp::Mul),
            AssignOp::DivAssign => Some(BinaryOp::Div),
        }
    }
}

/// A single `target op value` statement from reset or initializer code.
#[derive(PartialEq, Clone, Debug)]
pub struct Assignment {
    pub target: String,
    pub op: AssignOp,
    pub value: Expr,
    pub loc: Loc,
}

#[test]
fn test_loc_basics() {
    let a = Loc::new(3, 7);
    let b = Loc::new(5, 11);
    assert_eq!(Loc::new(3, 11), a.union(&b));
    assert_eq!("3:7", format!("{a}"));
}

#[test]
fn test_identifiers_skip_function_names() {
    let expr = Expr::App(
        "exp".to_owned(),
        vec![Expr::Op2(
            BinaryOp::Div,
            Box::new(Expr::Var("v".to_owned(), Loc::default())),
            Box::new(Expr::Var("tau".to_owned(), Loc::default())),
            Loc::default(),
        )],
        Loc::default(),
    );
    let idents: Vec<String> = expr.identifiers().into_iter().collect();
    assert_eq!(vec!["tau".to_owned(), "v".to_owned()], idents);
    assert!(expr.references("tau"));
    assert!(!expr.references("exp"));
    assert!(!expr.is_boolean());
}
