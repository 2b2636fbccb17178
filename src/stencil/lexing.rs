//! Lexer
//!
//!     This module orchestrates the tokenization pipeline for template input.
//!     Lexing runs transformations over tokens: first the core tokens are
//!     produced by the logos lexer, then transformations run one by one, each
//!     receiving a token stream and returning a token stream.
//!
//! Source Preservation
//!
//!     Every token carries the half-open byte range of its source text, and
//!     variable-width tokens carry their lexeme. This information is not used
//!     for classification at all, but it has to be perfectly preserved for the
//!     walker, which reconstructs unrecognized fragments byte-for-byte from
//!     token spans. It is critical that no transformation changes a span.
//!
//! The Lexing Pipeline
//!
//!     1. Core tokenization using the logos lexer. See
//!        [base_tokenization](base_tokenization). The grammar is total: every
//!        byte of input lands in exactly one token.
//!
//!     2. Delimiter demotion. See
//!        [delimiter_demotion](transformations::delimiter_demotion).
//!        An `Open` token that is not immediately followed by an identifier
//!        cannot start an invocation; it is rewritten to literal text and a
//!        syntax issue is recorded. After this stage the parser can assume
//!        that every `Open` is followed by an `Ident`.
//!
//!     Keeping context rules out of the logos grammar keeps the base lexer
//!     vanilla; the demotion stage is where `{{{{char}}` stops being an empty
//!     open delimiter and `{{ hehe` stops being an invocation at all.

pub mod base_tokenization;
pub mod common;
pub mod transformations;

pub use base_tokenization::tokenize;
pub use common::{LexError, SpannedToken};

use crate::stencil::cst::SourceLocation;
use crate::stencil::diagnostics::SyntaxIssue;
use transformations::delimiter_demotion::demote_orphan_opens;

/// Output of the complete lexing pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct LexOutput {
    pub tokens: Vec<SpannedToken>,
    pub issues: Vec<SyntaxIssue>,
}

/// Run the full lexing pipeline over a source string.
///
/// Never fails: the token grammar is total and the transformations only
/// rewrite token kinds, so any input produces a token stream covering every
/// byte. Issues describe the rewrites that were necessary.
pub fn lex(source: &str) -> LexOutput {
    let locations = SourceLocation::new(source);
    let tokens = tokenize(source);
    let (tokens, issues) = demote_orphan_opens(tokens, &locations);
    LexOutput { tokens, issues }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::token::Token;

    #[test]
    fn test_pipeline_keeps_valid_open() {
        let output = lex("{{user}}");
        assert_eq!(output.tokens[0].0, Token::Open);
        assert!(output.issues.is_empty());
    }

    #[test]
    fn test_pipeline_demotes_orphan_open() {
        let output = lex("{{ hehe");
        assert_eq!(output.tokens[0].0, Token::Text("{{".to_string()));
        assert_eq!(output.tokens[0].1, 0..2);
        assert_eq!(output.issues.len(), 1);
    }

    #[test]
    fn test_tokens_cover_every_byte() {
        let source = "a {{reverse::{{user}} }} b \\{ : } end";
        let output = lex(source);
        let mut cursor = 0;
        for (_, span) in &output.tokens {
            assert_eq!(span.start, cursor, "gap in token coverage");
            cursor = span.end;
        }
        assert_eq!(cursor, source.len());
    }
}
