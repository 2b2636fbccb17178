//! Core token types shared across the lexer, parser, and tooling.
//!
//!     The template grammar is small: two-character delimiters, a double-colon
//!     argument separator, identifiers, and everything else. The token set
//!     mirrors that. Tokens always carry enough text to reproduce their exact
//!     source bytes, which is what keeps the pipeline lossless end to end:
//!     any token stream can be detokenized back into the string it came from.
//!
//! Token Layers
//!
//!     Core Tokens:
//!         Character/word level tokens produced by the logos lexer. See
//!         [core](core) for the complete list.
//!
//!     Demoted Tokens:
//!         The delimiter demotion transformation rewrites an `Open` token that
//!         is not immediately followed by an identifier into a `Text` token
//!         with the literal `{{` payload. Demoted tokens are not produced by
//!         the logos lexer itself; they are created by the lexing pipeline so
//!         that the parser only ever sees an `Open` that starts a plausible
//!         invocation.

pub mod core;

pub use core::Token;
