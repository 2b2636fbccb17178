//! Base tokenization for the template lexer
//!
//! This module provides the raw tokenization using the logos lexer library.
//! This is NOT a transformation - transformations operate on token streams.
//! This is the source that creates the initial token stream from a string.

use crate::stencil::lexing::common::SpannedToken;
use crate::stencil::token::Token;
use logos::Logos;

/// Tokenize source text with location information.
///
/// The token grammar is total, so this cannot drop input. Should logos ever
/// report an unmatched slice anyway, the slice is preserved as a text token so
/// downstream losslessness holds.
pub fn tokenize(source: &str) -> Vec<SpannedToken> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let token = match result {
            Ok(token) => token,
            Err(()) => Token::Text(lexer.slice().to_string()),
        };
        tokens.push((token, lexer.span()));
    }

    tokens
}
