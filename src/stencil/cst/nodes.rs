//! CST node types
//!
//! Grammar the tree encodes:
//!
//!     document   := item*
//!     item       := plaintext | invocation
//!     invocation := OPEN IDENT head? (SEP argument)* CLOSE
//!     argument   := (text | invocation)*
//!
//! The `head` is not part of the published grammar: it holds whatever sits
//! between the identifier and the first `::` separator (or the close). In a
//! well-formed modern invocation it is empty; the legacy single-colon and
//! whitespace-delimited argument forms live there, as does arbitrary junk the
//! parser refused to die on.

use super::range::Span;
use serde::{Deserialize, Serialize};

/// An ordered sequence of document items covering the whole input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub items: Vec<DocumentItem>,
}

/// A top-level item: a plaintext run or an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentItem {
    Plaintext(Span),
    Invocation(Invocation),
}

/// The identifier token of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentToken {
    pub text: String,
    pub span: Span,
}

/// The close delimiter of an invocation.
///
/// `Synthetic` is the recovery marker: the parser inserted it because the real
/// `}}` was missing, and the walker flattens the invocation back to plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseDelimiter {
    Real(Span),
    Synthetic { at: usize },
}

impl CloseDelimiter {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, CloseDelimiter::Synthetic { .. })
    }

    /// Byte offset where the inner text ends.
    pub fn inner_end(&self) -> usize {
        match self {
            CloseDelimiter::Real(span) => span.start,
            CloseDelimiter::Synthetic { at } => *at,
        }
    }

    /// Byte offset where the invocation ends (exclusive).
    pub fn outer_end(&self) -> usize {
        match self {
            CloseDelimiter::Real(span) => span.end,
            CloseDelimiter::Synthetic { at } => *at,
        }
    }
}

/// One `::`-separated argument: the separator that introduced it plus the
/// mixed text/invocation pieces that form its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub sep: Span,
    pub pieces: Vec<Piece>,
}

impl Argument {
    /// The span covering this argument's value. Empty arguments collapse to a
    /// zero-width span at the insertion point after the separator.
    pub fn value_span(&self) -> Span {
        match (self.pieces.first(), self.pieces.last()) {
            (Some(first), Some(last)) => first.span().start..last.span().end,
            _ => self.sep.end..self.sep.end,
        }
    }

    /// Whether any piece is a nested invocation.
    pub fn has_nested(&self) -> bool {
        self.pieces.iter().any(|p| matches!(p, Piece::Invocation(_)))
    }
}

/// A fragment of an argument or head: raw text or a nested invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Piece {
    Text(Span),
    Invocation(Invocation),
}

impl Piece {
    pub fn span(&self) -> Span {
        match self {
            Piece::Text(span) => span.clone(),
            Piece::Invocation(inv) => inv.span(),
        }
    }
}

/// A `{{...}}` invocation node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub open: Span,
    pub ident: IdentToken,
    /// Pieces between the identifier and the first separator. Carries the
    /// legacy single-colon and whitespace-delimited argument payloads.
    pub head: Vec<Piece>,
    pub args: Vec<Argument>,
    pub close: CloseDelimiter,
}

impl Invocation {
    /// The canonical invocation span, open delimiter through close delimiter.
    pub fn span(&self) -> Span {
        self.open.start..self.close.outer_end()
    }

    /// The span of the inner text, between the delimiters.
    pub fn inner_span(&self) -> Span {
        self.open.end..self.close.inner_end()
    }

    /// The span covering the head pieces, if any.
    pub fn head_span(&self) -> Option<Span> {
        match (self.head.first(), self.head.last()) {
            (Some(first), Some(last)) => Some(first.span().start..last.span().end),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(text: &str, span: Span) -> IdentToken {
        IdentToken {
            text: text.to_string(),
            span,
        }
    }

    #[test]
    fn test_invocation_spans() {
        // {{user}}
        let inv = Invocation {
            open: 0..2,
            ident: ident("user", 2..6),
            head: vec![],
            args: vec![],
            close: CloseDelimiter::Real(6..8),
        };
        assert_eq!(inv.span(), 0..8);
        assert_eq!(inv.inner_span(), 2..6);
        assert_eq!(inv.head_span(), None);
    }

    #[test]
    fn test_synthetic_close_spans() {
        // {{user  (unterminated, input is 6 bytes long)
        let inv = Invocation {
            open: 0..2,
            ident: ident("user", 2..6),
            head: vec![],
            args: vec![],
            close: CloseDelimiter::Synthetic { at: 6 },
        };
        assert!(inv.close.is_synthetic());
        assert_eq!(inv.span(), 0..6);
        assert_eq!(inv.inner_span(), 2..6);
    }

    #[test]
    fn test_empty_argument_value_span() {
        let arg = Argument {
            sep: 6..8,
            pieces: vec![],
        };
        assert_eq!(arg.value_span(), 8..8);
    }

    #[test]
    fn test_argument_value_span_covers_pieces() {
        let arg = Argument {
            sep: 6..8,
            pieces: vec![Piece::Text(8..11), Piece::Text(11..14)],
        };
        assert_eq!(arg.value_span(), 8..14);
        assert!(!arg.has_nested());
    }
}
