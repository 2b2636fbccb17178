//! Structured diagnostics for the template engine
//!
//! Errors are data, not control flow: above the single handler boundary the
//! engine never fails a document, it reports. This module provides the four
//! reporting channels and the sink they are addressed to:
//!
//! - **Syntax warnings**: lexing/parsing issues. The parser recovers; the
//!   issues describe what it recovered from.
//! - **Runtime warnings**: user-authored mistakes: arity and type
//!   violations, invalid macro input. Unknown macros are deliberately not
//!   reported; they are preserved verbatim in the output instead.
//! - **Internal errors**: definition or engine bugs: a handler returned an
//!   internal failure, a post-process hook failed, a provider threw.
//! - **Registration warnings**: suspicious but non-fatal registry mutations.
//!   Fatal registration problems are `RegistrationError` values returned from
//!   `register`, not sink events.
//!
//! The default sink writes formatted lines to stderr. Tests use the capturing
//! sink from the [testing module](crate::stencil::testing).

use crate::stencil::cst::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single lexing or parsing issue with its location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxIssue {
    pub message: String,
    /// Zero-indexed line of the issue.
    pub line: usize,
    /// Zero-indexed byte column within the line.
    pub column: usize,
    /// Byte length of the offending span.
    pub length: usize,
    pub span: Span,
}

/// The pipeline phase a syntax report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyntaxPhase {
    Lexing,
    Parsing,
}

impl fmt::Display for SyntaxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxPhase::Lexing => write!(f, "lexing"),
            SyntaxPhase::Parsing => write!(f, "parsing"),
        }
    }
}

/// Payload for the syntax warning channel.
#[derive(Debug, Clone)]
pub struct SyntaxReport<'a> {
    pub phase: SyntaxPhase,
    pub issues: &'a [SyntaxIssue],
    pub input: &'a str,
}

/// Payload for the runtime warning channel.
#[derive(Debug, Clone)]
pub struct RuntimeReport<'a> {
    pub macro_name: &'a str,
    pub range: Span,
    pub raw: &'a str,
    pub message: String,
}

/// Payload for the internal error channel.
#[derive(Debug, Clone)]
pub struct InternalReport<'a> {
    pub macro_name: Option<&'a str>,
    pub message: String,
    pub detail: Option<String>,
}

/// Payload for the registration warning channel.
#[derive(Debug, Clone)]
pub struct RegistrationReport<'a> {
    pub name: &'a str,
    pub message: String,
}

/// Receiver for the four diagnostic channels.
pub trait DiagnosticSink: Send + Sync {
    fn syntax_warning(&self, report: &SyntaxReport<'_>);
    fn runtime_warning(&self, report: &RuntimeReport<'_>);
    fn internal_error(&self, report: &InternalReport<'_>);
    fn registration_warning(&self, report: &RegistrationReport<'_>);
}

/// The default sink: formatted lines on stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl DiagnosticSink for ConsoleSink {
    fn syntax_warning(&self, report: &SyntaxReport<'_>) {
        eprintln!(
            "warning [stencil]: {} recovered from {} issue(s)",
            report.phase,
            report.issues.len()
        );
        for issue in report.issues {
            eprintln!(
                "    {}:{} ({} byte(s)): {}",
                issue.line + 1,
                issue.column + 1,
                issue.length,
                issue.message
            );
        }
    }

    fn runtime_warning(&self, report: &RuntimeReport<'_>) {
        eprintln!(
            "warning [stencil]: {{{{{}}}}} at {}..{}: {} (raw: {})",
            report.macro_name, report.range.start, report.range.end, report.message, report.raw
        );
    }

    fn internal_error(&self, report: &InternalReport<'_>) {
        match (report.macro_name, &report.detail) {
            (Some(name), Some(detail)) => eprintln!(
                "error [stencil]: {{{{{}}}}}: {}: {}",
                name, report.message, detail
            ),
            (Some(name), None) => {
                eprintln!("error [stencil]: {{{{{}}}}}: {}", name, report.message)
            }
            (None, Some(detail)) => {
                eprintln!("error [stencil]: {}: {}", report.message, detail)
            }
            (None, None) => eprintln!("error [stencil]: {}", report.message),
        }
    }

    fn registration_warning(&self, report: &RegistrationReport<'_>) {
        eprintln!(
            "warning [stencil]: registering '{}': {}",
            report.name, report.message
        );
    }
}
