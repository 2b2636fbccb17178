//! Delimiter demotion transformation
//!
//! An open delimiter only starts an invocation when an identifier immediately
//! follows it. Everything else - `{{ ` with leading whitespace, `{{{{` where
//! another delimiter follows, `{{123` where the next character cannot start an
//! identifier - is literal text the author gets back verbatim.
//!
//! The transformation rewrites such `Open` tokens to `Text("{{")` in place,
//! keeping the span, and records one syntax issue per demotion. The issue is
//! what surfaces the `{{ hehe {{user}}` class of author mistakes as a syntax
//! warning while the document still renders.

use crate::stencil::cst::SourceLocation;
use crate::stencil::diagnostics::SyntaxIssue;
use crate::stencil::lexing::common::SpannedToken;
use crate::stencil::token::Token;

/// Demote every `Open` token not immediately followed by an identifier.
pub fn demote_orphan_opens(
    mut tokens: Vec<SpannedToken>,
    locations: &SourceLocation,
) -> (Vec<SpannedToken>, Vec<SyntaxIssue>) {
    let mut issues = Vec::new();

    for index in 0..tokens.len() {
        if tokens[index].0 != Token::Open {
            continue;
        }
        let followed_by_ident = tokens
            .get(index + 1)
            .map(|(token, _)| token.is_ident())
            .unwrap_or(false);
        if followed_by_ident {
            continue;
        }

        let span = tokens[index].1.clone();
        let position = locations.position(span.start);
        issues.push(SyntaxIssue {
            message: "open delimiter is not followed by an identifier".to_string(),
            line: position.line,
            column: position.column,
            length: span.len(),
            span: span.clone(),
        });
        tokens[index].0 = Token::Text("{{".to_string());
    }

    (tokens, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::lexing::base_tokenization::tokenize;

    fn demote(source: &str) -> (Vec<SpannedToken>, Vec<SyntaxIssue>) {
        let locations = SourceLocation::new(source);
        demote_orphan_opens(tokenize(source), &locations)
    }

    #[test]
    fn test_open_before_ident_is_kept() {
        let (tokens, issues) = demote("{{char}}");
        assert_eq!(tokens[0].0, Token::Open);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_open_before_open_is_demoted() {
        // {{{{char}} - the first pair can never open an invocation.
        let (tokens, issues) = demote("{{{{char}}");
        assert_eq!(tokens[0].0, Token::Text("{{".to_string()));
        assert_eq!(tokens[0].1, 0..2);
        assert_eq!(tokens[1].0, Token::Open);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].span, 0..2);
        assert_eq!(issues[0].line, 0);
        assert_eq!(issues[0].column, 0);
    }

    #[test]
    fn test_open_before_whitespace_is_demoted() {
        let (tokens, issues) = demote("Test {{ hehe {{user}}");
        assert_eq!(tokens[2].0, Token::Text("{{".to_string()));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].column, 5);
    }

    #[test]
    fn test_open_at_end_of_input_is_demoted() {
        let (tokens, issues) = demote("tail{{");
        assert_eq!(tokens[1].0, Token::Text("{{".to_string()));
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_open_before_digit_is_demoted() {
        let (tokens, issues) = demote("{{9lives}}");
        assert_eq!(tokens[0].0, Token::Text("{{".to_string()));
        assert_eq!(issues.len(), 1);
    }
}
