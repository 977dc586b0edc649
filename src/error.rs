// ABOUTME: Error types for read and evaluation failures in the Lisp interpreter
//! Error types for the reader and the evaluator.
//!
//! Kept as two enums rather than one: a [`ReadError`] never reaches the
//! evaluator, and an [`EvalError`] never originates in the tokenizer. The
//! driver wraps both in [`InterpreterError`] so the top-level loop has a
//! single type to match on when choosing between the `error: ` and
//! `Bad expression: ` reporting styles.

use std::path::PathBuf;
use thiserror::Error;

pub const ARITY_AT_LEAST_ONE: &str = "at least 1";
pub const ARITY_ONE: &str = "1";
pub const ARITY_TWO: &str = "2";

#[derive(Error, Debug, Clone)]
pub enum ReadError {
    #[error("malformed number: {0}")]
    MalformedNumber(String),

    #[error("unterminated list: reached end of input before a matching ')'")]
    UnterminatedList,

    #[error("quote with nothing following it")]
    DanglingQuote,

    #[error("unexpected ')'")]
    UnexpectedCloseParen,

    #[error("unexpected end of input")]
    UnexpectedEnd,
}

#[derive(Error, Debug, Clone)]
pub enum EvalError {
    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    #[error("{function}: expected {expected} argument{}, got {actual}", if expected.as_str() == "1" { "" } else { "s" })]
    ArityMismatch {
        function: String,
        expected: String,
        actual: usize,
    },

    #[error("{function}: expected {expected}, got {actual}")]
    TypeMismatch {
        function: String,
        expected: String,
        actual: String,
    },

    #[error("value is not callable")]
    NotCallable,

    #[error("quote with nothing following it")]
    DanglingQuote,

    #[error("lambda requires a parameter list and a body")]
    MalformedLambda,

    #[error("define requires a name (or sugared call form) and a value")]
    MalformedDefine,

    #[error("let binding must be a (name value) pair")]
    MalformedLet,

    #[error("cond clause must be a (test expr) pair")]
    MalformedCond,

    #[error("'else' is only valid as the final clause of 'cond'")]
    ElseNotLast,

    #[error("cond fell through with no matching clause and no 'else'")]
    CondFellThrough,

    #[error("failed to include {path}: {source}")]
    Include {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("include requires a filename")]
    MalformedInclude,

    #[error(transparent)]
    Read(#[from] ReadError),
}

impl EvalError {
    pub fn arity(function: &str, expected: impl Into<String>, actual: usize) -> Self {
        EvalError::ArityMismatch {
            function: function.to_string(),
            expected: expected.into(),
            actual,
        }
    }

    pub fn type_mismatch(function: &str, expected: &str, actual: &str) -> Self {
        EvalError::TypeMismatch {
            function: function.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

/// Either half of the interpreter's two error kinds, for callers that
/// need one type spanning both the reader and the evaluator.
#[derive(Error, Debug, Clone)]
pub enum InterpreterError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}
