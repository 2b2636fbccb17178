//! Concrete syntax tree for template documents
//!
//!     The parser produces a CST, not an AST: the tree keeps every byte of the
//!     source addressable, because the walker must reproduce unrecognized and
//!     malformed fragments verbatim. Nodes store half-open byte spans into the
//!     pre-processed input rather than owned text; the input string itself is
//!     the single source of truth for content.
//!
//!     The one piece of parser-to-walker communication that is not a span is
//!     the close delimiter: [`CloseDelimiter::Synthetic`] marks an invocation
//!     whose `}}` was missing and recovery-inserted. The walker flattens such
//!     invocations back to plaintext while keeping their well-formed nested
//!     invocations alive.

pub mod nodes;
pub mod range;

pub use nodes::{
    Argument, CloseDelimiter, Document, DocumentItem, IdentToken, Invocation, Piece,
};
pub use range::{Position, SourceLocation, Span};
