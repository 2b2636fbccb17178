//! Shared lexer types

use crate::stencil::cst::Span;
use crate::stencil::token::Token;
use std::fmt;

/// A token paired with its source span.
pub type SpannedToken = (Token, Span);

/// Errors that can occur during lexing.
///
/// The shipped pipeline is total and never constructs one of these; the type
/// exists for transformations added by embedders, which may be fallible.
#[derive(Debug, Clone)]
pub enum LexError {
    /// Error during a transformation phase.
    Transformation(String),
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::Transformation(msg) => write!(f, "transformation error: {}", msg),
        }
    }
}

impl std::error::Error for LexError {}
