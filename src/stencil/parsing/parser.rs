//! Recursive-descent parser with error recovery
//!
//! Grammar:
//!
//!     document   := item*
//!     item       := plaintext | invocation
//!     invocation := OPEN IDENT head? (SEP argument)* CLOSE
//!     argument   := (text | invocation)*
//!
//! After delimiter demotion every `Open` token is followed by an `Ident`, so
//! the parser commits to an invocation on `Open` and recovers only from one
//! malformation: a missing close delimiter, which synthesizes
//! [`CloseDelimiter::Synthetic`] at the end of input. Nothing here throws;
//! malformed fragments become head/argument text pieces and the walker
//! reproduces them byte-for-byte.

use crate::stencil::cst::{
    Argument, CloseDelimiter, Document, DocumentItem, IdentToken, Invocation, Piece,
    SourceLocation, Span,
};
use crate::stencil::diagnostics::SyntaxIssue;
use crate::stencil::lexing::SpannedToken;
use crate::stencil::token::Token;

/// Maximum invocation nesting depth. Opens beyond this depth are treated as
/// argument text, which bounds both parser recursion and walker recursion.
pub const MAX_NESTING_DEPTH: usize = 64;

pub struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
    input_len: usize,
    locations: &'a SourceLocation,
    issues: Vec<SyntaxIssue>,
}

impl<'a> Parser<'a> {
    pub fn new(
        tokens: &'a [SpannedToken],
        input_len: usize,
        locations: &'a SourceLocation,
    ) -> Self {
        Self {
            tokens,
            pos: 0,
            input_len,
            locations,
            issues: Vec::new(),
        }
    }

    /// Parse the whole token stream into a document.
    pub fn parse_document(mut self) -> (Document, Vec<SyntaxIssue>) {
        let mut items = Vec::new();
        let mut plain: Option<Span> = None;

        while let Some((token, span)) = self.peek().cloned() {
            if token == Token::Open && self.next_is_ident() {
                if let Some(run) = plain.take() {
                    items.push(DocumentItem::Plaintext(run));
                }
                let invocation = self.parse_invocation(0);
                items.push(DocumentItem::Invocation(invocation));
            } else {
                plain = Some(match plain {
                    Some(run) => run.start..span.end,
                    None => span,
                });
                self.advance();
            }
        }
        if let Some(run) = plain {
            items.push(DocumentItem::Plaintext(run));
        }

        (Document { items }, self.issues)
    }

    /// Parse one invocation starting at the current `Open` token.
    fn parse_invocation(&mut self, depth: usize) -> Invocation {
        let open = self.advance().expect("caller checked Open").1;
        let (ident_token, ident_span) = self.advance().expect("caller checked Ident");
        let ident = IdentToken {
            text: match ident_token {
                Token::Ident(text) => text,
                // Unreachable after demotion; preserve the lexeme regardless.
                other => other.lexeme().into_owned(),
            },
            span: ident_span,
        };

        let mut head: Vec<Piece> = Vec::new();
        let mut args: Vec<Argument> = Vec::new();
        let mut current: Option<Argument> = None;
        let close;

        loop {
            match self.peek().cloned() {
                None => {
                    self.issue(&open, "unterminated invocation, close delimiter inserted");
                    close = CloseDelimiter::Synthetic { at: self.input_len };
                    break;
                }
                Some((Token::Close, span)) => {
                    close = CloseDelimiter::Real(span);
                    self.advance();
                    break;
                }
                Some((Token::Sep, span)) => {
                    self.advance();
                    if let Some(arg) = current.take() {
                        args.push(arg);
                    }
                    current = Some(Argument {
                        sep: span,
                        pieces: Vec::new(),
                    });
                }
                Some((Token::Open, span)) if self.next_is_ident() => {
                    if depth + 1 >= MAX_NESTING_DEPTH {
                        self.issue(&span, "nesting depth limit reached, treating as text");
                        Self::push_text(&mut head, &mut current, span);
                        self.advance();
                    } else {
                        let nested = self.parse_invocation(depth + 1);
                        Self::push_piece(&mut head, &mut current, Piece::Invocation(nested));
                    }
                }
                Some((_, span)) => {
                    Self::push_text(&mut head, &mut current, span);
                    self.advance();
                }
            }
        }

        if let Some(arg) = current.take() {
            args.push(arg);
        }

        Invocation {
            open,
            ident,
            head,
            args,
            close,
        }
    }

    /// Append a text span to the active collector, coalescing adjacent runs.
    fn push_text(head: &mut Vec<Piece>, current: &mut Option<Argument>, span: Span) {
        let pieces = match current {
            Some(arg) => &mut arg.pieces,
            None => head,
        };
        if let Some(Piece::Text(run)) = pieces.last_mut() {
            if run.end == span.start {
                run.end = span.end;
                return;
            }
        }
        pieces.push(Piece::Text(span));
    }

    fn push_piece(head: &mut Vec<Piece>, current: &mut Option<Argument>, piece: Piece) {
        match current {
            Some(arg) => arg.pieces.push(piece),
            None => head.push(piece),
        }
    }

    fn issue(&mut self, span: &Span, message: &str) {
        let position = self.locations.position(span.start);
        self.issues.push(SyntaxIssue {
            message: message.to_string(),
            line: position.line,
            column: position.column,
            length: span.len(),
            span: span.clone(),
        });
    }

    fn peek(&self) -> Option<&SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn next_is_ident(&self) -> bool {
        self.tokens
            .get(self.pos + 1)
            .map(|(token, _)| token.is_ident())
            .unwrap_or(false)
    }

    fn advance(&mut self) -> Option<SpannedToken> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }
}
