//! The crate-wide error type shared by the lexer, parser, and evaluator.

use thiserror::Error;

/// Everything that can go wrong compiling or evaluating a filter expression.
///
/// Missing data is *not* an error: it is modelled inside the evaluator's
/// value domain (an empty value slot) and never surfaces as a `FilterError`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// Malformed expression text: unterminated quote, unbalanced parens,
    /// an operator the lexer doesn't recognise, or a non-literal operand
    /// where `%TYPE`/`%FILTER` require one.
    #[error("syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    /// A tag referenced in the expression has no matching entry in the
    /// schema, or was used without a required `[i]` subscript.
    #[error("name error: {0}")]
    Name(String),

    /// An operator was applied to operand types it doesn't support
    /// (string vs numeric, or mismatched-length string vectors).
    #[error("type error: {0}")]
    Type(String),

    /// The RPN program under- or over-flowed the evaluation stack.
    /// Only reachable via a hand-crafted malformed program; a program
    /// produced by the parser never triggers this.
    #[error("arity error: {0}")]
    Arity(String),
}

pub type Result<T> = std::result::Result<T, FilterError>;
