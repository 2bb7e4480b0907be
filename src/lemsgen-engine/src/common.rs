// Copyright 2026 The Lemsgen Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError,      // will never be produced
    DoesNotExist, // the named entity doesn't exist
    Generic,
    // input decoding
    InputDeserialization,
    NoRuns,
    MultipleRuns,
    UnknownComponentKind,
    BadQuantity,
    // expressions
    InvalidToken,
    UnrecognizedEof,
    UnrecognizedToken,
    ExtraToken,
    ExpectedNumber,
    ExpectedInteger,
    EmptyEquation,
    UnsupportedFunction,
    BadAssignment,
    // units and dimensions
    UnknownUnit,
    UnknownDimension,
    DimensionMismatch,
    BadCatalogue,
    // model configuration
    BadRefractory,
    MultipleRefractoryEvents,
    BadInitializer,
    UnsupportedInitializer,
    SynapsesNotSupported,
    UnsupportedComponent,
    BadPopulationSize,
    BadRecordIndex,
    DuplicateName,
    // output
    XmlSerialization,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            DoesNotExist => "does_not_exist",
            Generic => "generic",
            InputDeserialization => "input_deserialization",
            NoRuns => "no_runs",
            MultipleRuns => "multiple_runs",
            UnknownComponentKind => "unknown_component_kind",
            BadQuantity => "bad_quantity",
            InvalidToken => "invalid_token",
            UnrecognizedEof => "unrecognized_eof",
            UnrecognizedToken => "unrecognized_token",
            ExtraToken => "extra_token",
            ExpectedNumber => "expected_number",
            ExpectedInteger => "expected_integer",
            EmptyEquation => "empty_equation",
            UnsupportedFunction => "unsupported_function",
            BadAssignment => "bad_assignment",
            UnknownUnit => "unknown_unit",
            UnknownDimension => "unknown_dimension",
            DimensionMismatch => "dimension_mismatch",
            BadCatalogue => "bad_catalogue",
            BadRefractory => "bad_refractory",
            MultipleRefractoryEvents => "multiple_refractory_events",
            BadInitializer => "bad_initializer",
            UnsupportedInitializer => "unsupported_initializer",
            SynapsesNotSupported => "synapses_not_supported",
            UnsupportedComponent => "unsupported_component",
            BadPopulationSize => "bad_population_size",
            BadRecordIndex => "bad_record_index",
            DuplicateName => "duplicate_name",
            XmlSerialization => "xml_serialization",
        };

        write!(f, "{name}")
    }
}

/// A lexing or parsing failure, located by byte offsets into the
/// equation text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EquationError {
    pub start: u16,
    pub end: u16,
    pub code: ErrorCode,
}

impl fmt::Display for EquationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.end, self.code)
    }
}

impl EquationError {
    /// Attach the offending source text, producing a top-level error.
    pub fn in_equation(self, eqn: &str) -> Error {
        Error::new(
            ErrorKind::Expression,
            self.code,
            Some(format!("{}:{} in `{}`", self.start, self.end, eqn)),
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Import,
    Model,
    Expression,
    Export,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Import => "ImportError",
            ErrorKind::Model => "ModelError",
            ErrorKind::Expression => "ExpressionError",
            ErrorKind::Export => "ExportError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;
pub type EquationResult<T> = result::Result<T, EquationError>;

#[macro_export]
macro_rules! eqn_err(
    ($code:tt, $start:expr, $end:expr) => {{
        use $crate::common::{EquationError, ErrorCode};
        Err(EquationError{ start: $start as u16, end: $end as u16, code: ErrorCode::$code})
    }}
);

#[macro_export]
macro_rules! model_err(
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::Model,
            ErrorCode::$code,
            Some($str),
        ))
    }}
);

#[macro_export]
macro_rules! expr_err {
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(
            ErrorKind::Expression,
            ErrorCode::$code,
            Some($str),
        ))
    }};
    ($code:tt) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Expression, ErrorCode::$code, None))
    }};
}

#[macro_export]
macro_rules! import_err(
    ($code:tt, $str:expr) => {{
        use $crate::common::{Error, ErrorCode, ErrorKind};
        Err(Error::new(ErrorKind::Import, ErrorCode::$code, Some($str)))
    }}
);

#[test]
fn test_error_display() {
    let err = Error::new(
        ErrorKind::Expression,
        ErrorCode::UnsupportedFunction,
        Some("foobar".to_owned()),
    );
    assert_eq!("ExpressionError{unsupported_function: foobar}", format!("{err}"));

    let err = Error::new(ErrorKind::Model, ErrorCode::MultipleRuns, None);
    assert_eq!("ModelError{multiple_runs}", format!("{err}"));
}

#[test]
fn test_equation_error_context() {
    let err = EquationError {
        start: 0,
        end: 6,
        code: ErrorCode::UnsupportedFunction,
    }
    .in_equation("foobar(x)");
    assert_eq!(ErrorKind::Expression, err.kind);
    assert_eq!(ErrorCode::UnsupportedFunction, err.code);
    assert!(err.get_details().unwrap().contains("foobar(x)"));
}
