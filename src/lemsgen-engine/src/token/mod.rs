// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

// derived from both the LALRPOP whitespace tokenizer, and LALRPOP's
// internal tokenizer

use std::str::CharIndices;

use lazy_static::lazy_static;
use unicode_xid::UnicodeXID;

use self::Token::*;
use crate::common::ErrorCode::*;
use crate::common::{EquationError, ErrorCode};


/// Which grammar the input is written in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LexerType {
    /// Python-flavored model equations: `**`, `<=`, `and`, `not`, `v += 1`
    Equation,
    /// Unit expressions like `metre ** 2` or `mV^2`
    Units,
    /// LEMS expressions: `^`, `.gt.`, `.and.`
    Lems,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Token<'input> {
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
    Ident(&'input str),
    Num(&'input str),
}

fn error<T>(code: ErrorCode, start: usize, end: usize) -> Result<T, EquationError> {
    Err(EquationError {
        start: start as u16,
        end: end as u16,
        code,
    })
}

pub type Spanned<T> = (usize, T, usize);

pub struct Lexer<'input> {
    text: &'input str,
    chars: CharIndices<'input>,
    lookahead: Option<(usize, char)>,
    lexer_type: LexerType,
}

const KEYWORDS: &[(&str, Token<'static>)] = &[("and", And), ("or", Or), ("not", Not)];

const DOTTED_OPERATORS: &[(&str, Token<'static>)] = &[
    ("gt", Gt),
    ("ge", Gte),
    ("lt", Lt),
    ("le", Lte),
    ("eq", Eq),
    ("ne", Neq),
    ("and", And),
    ("or", Or),
    ("not", Not),
];

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str, lexer_type: LexerType) -> Self {
        let mut t = Lexer {
            text: input,
            chars: input.char_indices(),
            lookahead: None,
            lexer_type,
        };
        t.bump();
        t
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        self.bump_n(1)
    }

    fn bump_n(&mut self, n: usize) -> Option<(usize, char)> {
        assert!(n > 0);
        self.lookahead = self.chars.nth(n - 1);
        self.lookahead
    }

    fn word(&mut self, idx0: usize) -> Spanned<&'input str> {
        match self.take_while(is_identifier_continue) {
            Some(end) => (idx0, &self.text[idx0..end], end),
            None => (idx0, &self.text[idx0..], self.text.len()),
        }
    }

    fn take_while<F>(&mut self, mut keep_going: F) -> Option<usize>
    where
        F: FnMut(char) -> bool,
    {
        self.take_until(|c| !keep_going(c))
    }

    fn take_until<F>(&mut self, mut terminate: F) -> Option<usize>
    where
        F: FnMut(char) -> bool,
    {
        loop {
            match self.lookahead {
                None => {
                    return None;
                }
                Some((idx1, c)) => {
                    if terminate(c) {
                        return Some(idx1);
                    } else {
                        self.bump();
                    }
                }
            }
        }
    }

    fn identifierish(&mut self, idx0: usize) -> Spanned<Token<'input>> {
        let (start, word, end) = self.word(idx0);

        // keywords are case-sensitive, and only the model equation
        // grammar spells its boolean operators as words
        let tok = if self.lexer_type == LexerType::Equation {
            KEYWORDS
                .iter()
                .filter(|&&(w, _)| w == word)
                .map(|(_, t)| *t)
                .next()
                .unwrap_or(Ident(word))
        } else {
            Ident(word)
        };

        (start, tok, end)
    }

    fn number(&mut self, idx0: usize) -> Result<Spanned<Token<'input>>, EquationError> {
        use regex::Regex;

        lazy_static! {
            static ref NUMBER_RE: Regex =
                Regex::new(r"^\d*(\.\d*)?([eE][-+]?\d+)?").unwrap();
        }

        let len = match NUMBER_RE.find(&self.text[idx0..]) {
            Some(m) if m.end() > 0 => m.end(),
            _ => return error(ExpectedNumber, idx0, idx0 + 1),
        };

        self.bump_n(len);

        let end = idx0 + len;
        Ok((idx0, Num(&self.text[idx0..end]), end))
    }

    /// LEMS spells comparison and boolean operators as `.gt.`, `.and.`, ...
    fn dotted_operator(&mut self, idx0: usize) -> Result<Spanned<Token<'input>>, EquationError> {
        // eat the opening '.'
        self.bump();
        let word_end = match self.take_while(|c| c.is_ascii_alphabetic()) {
            Some(end) => end,
            None => return error(UnrecognizedToken, idx0, self.text.len()),
        };
        if !matches!(self.lookahead, Some((_, '.'))) {
            return error(UnrecognizedToken, idx0, word_end);
        }
        // eat the closing '.'
        self.bump();

        let word = &self.text[idx0 + 1..word_end];
        match DOTTED_OPERATORS.iter().find(|&&(w, _)| w == word) {
            Some((_, tok)) => Ok((idx0, *tok, word_end + 1)),
            None => error(UnrecognizedToken, idx0, word_end + 1),
        }
    }

    fn comment_end(&mut self) {
        // a '#' comment runs to the end of the line; the newline itself
        // still terminates the statement
        self.take_until(|c| c == '\n');
    }

    #[allow(clippy::unnecessary_wraps)]
    fn consume(
        &mut self,
        i: usize,
        tok: Token<'input>,
        len: usize,
    ) -> Option<Result<Spanned<Token<'input>>, EquationError>> {
        self.bump();
        Some(Ok((i, tok, i + len)))
    }

    fn is_lems(&self) -> bool {
        self.lexer_type == LexerType::Lems
    }

    fn is_equation(&self) -> bool {
        self.lexer_type == LexerType::Equation
    }
}

impl<'input> Iterator for Lexer<'input> {
    type Item = Result<Spanned<Token<'input>>, EquationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            return match self.lookahead {
                Some((i, '=')) => {
                    match self.bump() {
                        Some((_, '=')) => self.consume(i, Eq, 2),
                        // we've already bumped, don't consume
                        _ => Some(Ok((i, Assign, i + 1))),
                    }
                }
                Some((i, '!')) => match self.bump() {
                    Some((_, '=')) => self.consume(i, Neq, 2),
                    _ => Some(error(UnrecognizedToken, i, i + 1)),
                },
                Some((i, '<')) => {
                    match self.bump() {
                        Some((_, '=')) => self.consume(i, Lte, 2),
                        // we've already bumped, don't consume
                        _ => Some(Ok((i, Lt, i + 1))),
                    }
                }
                Some((i, '>')) => {
                    match self.bump() {
                        Some((_, '=')) => self.consume(i, Gte, 2),
                        // we've already bumped, don't consume
                        _ => Some(Ok((i, Gt, i + 1))),
                    }
                }
                Some((i, '*')) => match self.bump() {
                    Some((_, '*')) => self.consume(i, Exp, 2),
                    Some((_, '=')) => self.consume(i, MulAssign, 2),
                    _ => Some(Ok((i, Mul, i + 1))),
                },
                Some((i, '/')) => match self.bump() {
                    Some((_, '=')) => self.consume(i, DivAssign, 2),
                    Some((_, '/')) => Some(error(UnrecognizedToken, i, i + 2)),
                    _ => Some(Ok((i, Div, i + 1))),
                },
                Some((i, '+')) => match self.bump() {
                    Some((_, '=')) => self.consume(i, AddAssign, 2),
                    _ => Some(Ok((i, Plus, i + 1))),
                },
                Some((i, '-')) => match self.bump() {
                    Some((_, '=')) => self.consume(i, SubAssign, 2),
                    _ => Some(Ok((i, Minus, i + 1))),
                },
                Some((i, '^')) if !self.is_equation() => self.consume(i, Exp, 1),
                Some((i, '(')) => self.consume(i, LParen, 1),
                Some((i, ')')) => self.consume(i, RParen, 1),
                Some((i, ',')) => self.consume(i, Comma, 1),
                Some((i, ';')) if self.is_equation() => self.consume(i, Newline, 1),
                Some((i, '\n')) if self.is_equation() => self.consume(i, Newline, 1),
                Some((_, '#')) if self.is_equation() => {
                    self.comment_end();
                    continue;
                }
                Some((i, '.'))
                    if self.is_lems()
                        && self.text[i + 1..].starts_with(|c: char| c.is_ascii_alphabetic()) =>
                {
                    Some(self.dotted_operator(i))
                }
                Some((i, c)) if is_identifier_start(c) => Some(Ok(self.identifierish(i))),
                Some((i, c)) if is_number_start(c) => Some(self.number(i)),
                Some((_, c)) if c.is_whitespace() => {
                    self.bump();
                    continue;
                }
                Some((i, _)) => {
                    self.bump(); // eat whatever is killing us
                    let end = match self.lookahead {
                        Some((end, _)) => end,
                        None => self.text.len(),
                    };
                    Some(error(UnrecognizedToken, i, end))
                }
                None => None,
            };
        }
    }
}

fn is_number_start(c: char) -> bool {
    is_digit(c) || c == '.'
}

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_identifier_start(c: char) -> bool {
    UnicodeXID::is_xid_start(c) || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    UnicodeXID::is_xid_continue(c)
}
