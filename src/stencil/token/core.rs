//! Core token definitions for the template lexer.
//!
//! The grammar the lexer has to honor:
//!
//!     OPEN  ::= "{{"
//!     CLOSE ::= "}}"
//!     SEP   ::= "::"
//!     IDENT ::= [A-Za-z_/][A-Za-z0-9_/\-]*
//!
//! Everything else is text. Escaped braces (`\{`, `\}`) get their own token so
//! that `\{\{` can never form an open delimiter; the post-processing stage
//! unescapes them after evaluation. Single braces and colons that do not pair
//! up into a delimiter are tokenized individually so the stream stays total:
//! every byte of the input belongs to exactly one token.

use logos::Logos;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// A core token produced by the logos lexer.
///
/// Variants that cover variable-width text carry their lexeme so the stream
/// can be detokenized back into the exact source string.
#[derive(Logos, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    /// Open delimiter `{{`
    #[token("{{")]
    Open,

    /// Close delimiter `}}`
    #[token("}}")]
    Close,

    /// Argument separator `::`
    #[token("::")]
    Sep,

    /// Invocation identifier. The leading `/` admits the `//` comment name.
    #[regex(r"[A-Za-z_/][A-Za-z0-9_/\-]*", |lex| lex.slice().to_string(), priority = 3)]
    Ident(String),

    /// An escaped brace, `\{` or `\}`. Never forms a delimiter.
    #[regex(r"\\[{}]", |lex| lex.slice().to_string())]
    EscapedBrace(String),

    /// A single `{` that did not pair into an open delimiter.
    #[token("{")]
    LBrace,

    /// A single `}` that did not pair into a close delimiter.
    #[token("}")]
    RBrace,

    /// A single `:` that did not pair into a separator.
    #[token(":")]
    Colon,

    /// A backslash not followed by a brace.
    #[token("\\")]
    Backslash,

    /// A run of spaces and tabs.
    #[regex(r"[ \t]+", |lex| lex.slice().to_string())]
    Whitespace(String),

    /// A line break, `\n` or `\r\n`.
    #[regex(r"\r?\n", |lex| lex.slice().to_string())]
    Newline(String),

    /// Any other run of characters.
    #[regex(r"[^{}:\\ \t\r\n]+", |lex| lex.slice().to_string())]
    Text(String),
}

impl Token {
    /// The exact source text this token stands for.
    pub fn lexeme(&self) -> Cow<'_, str> {
        match self {
            Token::Open => Cow::Borrowed("{{"),
            Token::Close => Cow::Borrowed("}}"),
            Token::Sep => Cow::Borrowed("::"),
            Token::LBrace => Cow::Borrowed("{"),
            Token::RBrace => Cow::Borrowed("}"),
            Token::Colon => Cow::Borrowed(":"),
            Token::Backslash => Cow::Borrowed("\\"),
            Token::Ident(s)
            | Token::EscapedBrace(s)
            | Token::Whitespace(s)
            | Token::Newline(s)
            | Token::Text(s) => Cow::Borrowed(s),
        }
    }

    /// Whether this token is an identifier.
    pub fn is_ident(&self) -> bool {
        matches!(self, Token::Ident(_))
    }
}
