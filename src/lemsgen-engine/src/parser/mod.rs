// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Hand-written recursive descent parser for model equations and LEMS
//! expressions.
//!
//! Both grammars share one precedence ladder, from loosest to tightest:
//! `or`, `and`, `not`, comparisons, `+ -`, `* /`, unary `+ -`, `**`.
//! Exponentiation is right associative and its right operand may carry
//! a unary sign (`2 ** -1`).

use crate::ast::{AssignOp, Assignment, BinaryOp, Expr, Loc, UnaryOp};
use crate::common::{EquationError, ErrorCode};
use crate::token::{Lexer, LexerType, Spanned, Token};

#[cfg(test)]
mod tests;

/// TokenKind discriminant for efficient peek comparisons without payload matching
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TokenKind {
    Eq,
    Neq,
    Not,
    Exp,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Plus,
    Minus,
    Mul,
    Div,
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    LParen,
    RParen,
    Comma,
    Newline,
    Ident,
    Num,
}

impl<'a> From<&Token<'a>> for TokenKind {
    fn from(token: &Token<'a>) -> Self {
        match token {
            Token::Eq => TokenKind::Eq,
            Token::Neq => TokenKind::Neq,
            Token::Not => TokenKind::Not,
            Token::Exp => TokenKind::Exp,
            Token::Lt => TokenKind::Lt,
            Token::Lte => TokenKind::Lte,
            Token::Gt => TokenKind::Gt,
            Token::Gte => TokenKind::Gte,
            Token::And => TokenKind::And,
            Token::Or => TokenKind::Or,
            Token::Plus => TokenKind::Plus,
            Token::Minus => TokenKind::Minus,
            Token::Mul => TokenKind::Mul,
            Token::Div => TokenKind::Div,
            Token::Assign => TokenKind::Assign,
            Token::AddAssign => TokenKind::AddAssign,
            Token::SubAssign => TokenKind::SubAssign,
            Token::MulAssign => TokenKind::MulAssign,
            Token::DivAssign => TokenKind::DivAssign,
            Token::LParen => TokenKind::LParen,
            Token::RParen => TokenKind::RParen,
            Token::Comma => TokenKind::Comma,
            Token::Newline => TokenKind::Newline,
            Token::Ident(_) => TokenKind::Ident,
            Token::Num(_) => TokenKind::Num,
        }
    }
}

/// Parser state holding tokenized input
struct Parser<'input> {
    tokens: Vec<Spanned<Token<'input>>>,
    pos: usize,
}

impl<'input> Parser<'input> {
    /// Create a new parser from a lexer, collecting all tokens up front.
    /// Returns an error if the lexer produces any errors.
    fn new(lexer: Lexer<'input>) -> Result<Self, EquationError> {
        let tokens = lexer.collect::<Result<Vec<_>, _>>()?;
        Ok(Parser { tokens, pos: 0 })
    }

    /// Peek at the current token without consuming it
    fn peek(&self) -> Option<&Spanned<Token<'input>>> {
        self.tokens.get(self.pos)
    }

    /// Peek at the kind of the current token
    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|(_, tok, _)| TokenKind::from(tok))
    }

    fn peek_kind_at(&self, offset: usize) -> Option<TokenKind> {
        self.tokens
            .get(self.pos + offset)
            .map(|(_, tok, _)| TokenKind::from(tok))
    }

    /// Consume and return the current token, failing at end of input.
    fn advance(&mut self) -> Result<Spanned<Token<'input>>, EquationError> {
        match self.tokens.get(self.pos) {
            Some(tok) => {
                self.pos += 1;
                Ok(*tok)
            }
            None => Err(self.eof_error()),
        }
    }

    /// Expect the current token to match the expected kind, returning an error if not
    fn expect(&mut self, expected: TokenKind) -> Result<Spanned<Token<'input>>, EquationError> {
        match self.peek() {
            Some(_) if self.peek_kind() == Some(expected) => self.advance(),
            Some(&(start, _, end)) => Err(EquationError {
                start: start as u16,
                end: end as u16,
                code: ErrorCode::UnrecognizedToken,
            }),
            None => Err(self.eof_error()),
        }
    }

    fn eof_error(&self) -> EquationError {
        let pos = self.eof_position();
        EquationError {
            start: pos as u16,
            end: (pos + 1) as u16,
            code: ErrorCode::UnrecognizedEof,
        }
    }

    /// Get the position for EOF errors
    fn eof_position(&self) -> usize {
        if let Some((_, _, end)) = self.tokens.last() {
            *end
        } else {
            0
        }
    }

    /// Check if we've consumed all tokens
    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn skip_newlines(&mut self) {
        while self.peek_kind() == Some(TokenKind::Newline) {
            self.pos += 1;
        }
    }

    fn extra_token_error(&self) -> Option<EquationError> {
        self.peek().map(|&(start, _, end)| EquationError {
            start: start as u16,
            end: end as u16,
            code: ErrorCode::ExtraToken,
        })
    }

    /// Parse a single expression from the token stream.
    /// Returns Ok(None) for empty or comment-only input.
    fn parse_equation(&mut self) -> Result<Option<Expr>, EquationError> {
        self.skip_newlines();
        if self.is_at_end() {
            return Ok(None);
        }

        let expr = self.parse_expr()?;

        self.skip_newlines();
        if let Some(err) = self.extra_token_error() {
            return Err(err);
        }

        Ok(Some(expr))
    }

    /// Parse newline or semicolon separated assignment statements.
    fn parse_statements(&mut self) -> Result<Vec<Assignment>, EquationError> {
        let mut stmts = Vec::new();

        loop {
            self.skip_newlines();
            if self.is_at_end() {
                break;
            }

            stmts.push(self.parse_assignment()?);

            if self.peek_kind() != Some(TokenKind::Newline) {
                if let Some(err) = self.extra_token_error() {
                    return Err(err);
                }
            }
        }

        Ok(stmts)
    }

    fn parse_assignment(&mut self) -> Result<Assignment, EquationError> {
        let (lpos, tok, rpos) = self.advance()?;
        let target = match tok {
            Token::Ident(id) => id.to_owned(),
            _ => {
                return Err(EquationError {
                    start: lpos as u16,
                    end: rpos as u16,
                    code: ErrorCode::BadAssignment,
                });
            }
        };

        let (op_start, op_tok, op_end) = self.advance()?;
        let op = match op_tok {
            Token::Assign => AssignOp::Assign,
            Token::AddAssign => AssignOp::AddAssign,
            Token::SubAssign => AssignOp::SubAssign,
            Token::MulAssign => AssignOp::MulAssign,
            Token::DivAssign => AssignOp::DivAssign,
            _ => {
                return Err(EquationError {
                    start: op_start as u16,
                    end: op_end as u16,
                    code: ErrorCode::BadAssignment,
                });
            }
        };

        let value = self.parse_expr()?;
        let loc = Loc::new(lpos, value.get_loc().end as usize);

        Ok(Assignment {
            target,
            op,
            value,
            loc,
        })
    }

    /// Parse a top-level expression
    fn parse_expr(&mut self) -> Result<Expr, EquationError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, EquationError> {
        let mut left = self.parse_and()?;

        while self.peek_kind() == Some(TokenKind::Or) {
            self.advance()?;
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, EquationError> {
        let mut left = self.parse_not()?;

        while self.peek_kind() == Some(TokenKind::And) {
            self.advance()?;
            let right = self.parse_not()?;
            left = binary(BinaryOp::And, left, right);
        }

        Ok(left)
    }

    /// `not` binds looser than comparisons: `not a < b` is `not (a < b)`
    fn parse_not(&mut self) -> Result<Expr, EquationError> {
        if self.peek_kind() == Some(TokenKind::Not) {
            let (lpos, _, _) = self.advance()?;
            let operand = self.parse_not()?;
            let rpos = operand.get_loc().end as usize;
            return Ok(Expr::Op1(
                UnaryOp::Not,
                Box::new(operand),
                Loc::new(lpos, rpos),
            ));
        }

        self.parse_comparison()
    }

    /// Parse comparison and equality operators (<, <=, >, >=, ==, !=).
    /// Chains expand pairwise: `a < b <= c` is `a < b and b <= c`.
    fn parse_comparison(&mut self) -> Result<Expr, EquationError> {
        let mut left = self.parse_additive()?;
        let mut chain: Option<Expr> = None;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Lt) => BinaryOp::Lt,
                Some(TokenKind::Lte) => BinaryOp::Lte,
                Some(TokenKind::Gt) => BinaryOp::Gt,
                Some(TokenKind::Gte) => BinaryOp::Gte,
                Some(TokenKind::Eq) => BinaryOp::Eq,
                Some(TokenKind::Neq) => BinaryOp::Neq,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive()?;
            let comparison = binary(op, left, right.clone());
            chain = Some(match chain {
                Some(prev) => binary(BinaryOp::And, prev, comparison),
                None => comparison,
            });
            left = right;
        }

        Ok(chain.unwrap_or(left))
    }

    /// Parse additive operators (+, -)
    fn parse_additive(&mut self) -> Result<Expr, EquationError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse multiplicative operators (*, /)
    fn parse_multiplicative(&mut self) -> Result<Expr, EquationError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Mul) => BinaryOp::Mul,
                Some(TokenKind::Div) => BinaryOp::Div,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }

        Ok(left)
    }

    /// Parse unary sign operators (+, -)
    fn parse_unary(&mut self) -> Result<Expr, EquationError> {
        let op = match self.peek_kind() {
            Some(TokenKind::Plus) => UnaryOp::Positive,
            Some(TokenKind::Minus) => UnaryOp::Negative,
            _ => return self.parse_power(),
        };
        let (lpos, _, _) = self.advance()?;
        let operand = self.parse_unary()?;
        let rpos = operand.get_loc().end as usize;
        Ok(Expr::Op1(op, Box::new(operand), Loc::new(lpos, rpos)))
    }

    /// Parse exponentiation, right associative: `a ** b ** c` is `a ** (b ** c)`
    fn parse_power(&mut self) -> Result<Expr, EquationError> {
        let base = self.parse_app()?;

        if self.peek_kind() == Some(TokenKind::Exp) {
            self.advance()?;
            let exponent = self.parse_unary()?;
            return Ok(binary(BinaryOp::Exp, base, exponent));
        }

        Ok(base)
    }

    /// Parse function application: id(args)
    fn parse_app(&mut self) -> Result<Expr, EquationError> {
        if self.peek_kind() == Some(TokenKind::Ident)
            && self.peek_kind_at(1) == Some(TokenKind::LParen)
        {
            let (lpos, tok, _) = self.advance()?;
            let name = match tok {
                Token::Ident(s) => s.to_owned(),
                _ => unreachable!(),
            };

            self.advance()?; // consume '('
            let args = self.parse_comma_separated_exprs()?;
            let (_, _, rpos) = self.expect(TokenKind::RParen)?;

            return Ok(Expr::App(name, args, Loc::new(lpos, rpos)));
        }

        self.parse_atom()
    }

    /// Parse an atomic expression (number, identifier, parenthesized expression)
    fn parse_atom(&mut self) -> Result<Expr, EquationError> {
        let (lpos, tok, rpos) = self.advance()?;
        match tok {
            Token::Num(s) => match s.parse::<f64>() {
                Ok(n) => Ok(Expr::Const(s.to_owned(), n, Loc::new(lpos, rpos))),
                Err(_) => Err(EquationError {
                    start: lpos as u16,
                    end: rpos as u16,
                    code: ErrorCode::ExpectedNumber,
                }),
            },
            Token::Ident(s) => Ok(Expr::Var(s.to_owned(), Loc::new(lpos, rpos))),
            Token::LParen => {
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            _ => Err(EquationError {
                start: lpos as u16,
                end: rpos as u16,
                code: ErrorCode::UnrecognizedToken,
            }),
        }
    }

    /// Parse comma-separated expressions (for function arguments)
    fn parse_comma_separated_exprs(&mut self) -> Result<Vec<Expr>, EquationError> {
        let mut exprs = Vec::new();

        // Handle empty list
        if self.peek_kind() == Some(TokenKind::RParen) {
            return Ok(exprs);
        }

        exprs.push(self.parse_expr()?);

        while self.peek_kind() == Some(TokenKind::Comma) {
            self.advance()?; // consume ','

            // Handle trailing comma
            if self.peek_kind() == Some(TokenKind::RParen) {
                break;
            }

            exprs.push(self.parse_expr()?);
        }

        Ok(exprs)
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let loc = left.get_loc().union(&right.get_loc());
    Expr::Op2(op, Box::new(left), Box::new(right), loc)
}

/// Parse an expression string into an AST.
///
/// Returns:
/// - `Ok(Some(expr))` for valid expressions
/// - `Ok(None)` for empty or comment-only input
/// - `Err(error)` for lexing and parse errors
pub fn parse(input: &str, lexer_type: LexerType) -> Result<Option<Expr>, EquationError> {
    let mut parser = Parser::new(Lexer::new(input, lexer_type))?;
    parser.parse_equation()
}

/// Parse model statements such as reset code (`v = v_r; w += b`).
pub fn parse_statements(input: &str) -> Result<Vec<Assignment>, EquationError> {
    let mut parser = Parser::new(Lexer::new(input, LexerType::Equation))?;
    parser.parse_statements()
}
