//! Output formats for tokens and CSTs
//!
//! Debugging and tooling surfaces: JSON serialization of token streams and
//! documents, and detokenization back to source text. Detokenization is also
//! the losslessness check the test suites lean on: for any input,
//! `detokenize(lex(input).tokens) == input`.

use crate::stencil::cst::Document;
use crate::stencil::lexing::SpannedToken;

/// Reconstruct the exact source string from a token stream.
pub fn detokenize(tokens: &[SpannedToken]) -> String {
    tokens
        .iter()
        .map(|(token, _)| token.lexeme())
        .collect()
}

/// Serialize a token stream as JSON.
pub fn tokens_to_json(tokens: &[SpannedToken]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(tokens)
}

/// Serialize a document CST as JSON.
pub fn document_to_json(document: &Document) -> serde_json::Result<String> {
    serde_json::to_string_pretty(document)
}
