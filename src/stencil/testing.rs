//! Testing utilities
//!
//!     Shared fixtures for the unit and integration suites. Test rules for
//!     this crate:
//!
//!         1. Evaluation tests go through [`expand`]/[`expand_traced`] so
//!            every test runs the same builtin registry and the same
//!            User/Character environment; scenario inputs stay comparable
//!            across suites.
//!         2. Diagnostics are asserted through [`CaptureSink`], never by
//!            scraping stderr.
//!
//!     Token-level tests can use the [`mk_tokens`] factory to state expected
//!     streams compactly.

use crate::stencil::diagnostics::{
    DiagnosticSink, InternalReport, RegistrationReport, RuntimeReport, SyntaxIssue, SyntaxPhase,
    SyntaxReport,
};
use crate::stencil::engine::Engine;
use crate::stencil::env::{EnvBuilder, Environment, RawEnv};
use crate::stencil::lexing::SpannedToken;
use crate::stencil::registry::{builtins, Registry};
use crate::stencil::token::Token;
use std::sync::{Arc, Mutex, PoisonError};

/// One captured diagnostic event, owned.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Syntax {
        phase: SyntaxPhase,
        issues: Vec<SyntaxIssue>,
        input: String,
    },
    Runtime {
        macro_name: String,
        message: String,
    },
    Internal {
        message: String,
        detail: Option<String>,
    },
    Registration {
        name: String,
        message: String,
    },
}

/// A sink that stores every event for later assertions.
#[derive(Debug, Default)]
pub struct CaptureSink {
    events: Mutex<Vec<Event>>,
}

impl CaptureSink {
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The captured syntax reports, as (phase, issue count) pairs.
    pub fn syntax_reports(&self) -> Vec<(SyntaxPhase, usize)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Syntax { phase, issues, .. } => Some((phase, issues.len())),
                _ => None,
            })
            .collect()
    }

    /// The captured runtime warning messages.
    pub fn runtime_warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Runtime { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    /// The captured internal error messages, detail appended when present.
    pub fn internal_errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Internal { message, detail } => Some(match detail {
                    Some(detail) => format!("{message}: {detail}"),
                    None => message,
                }),
                _ => None,
            })
            .collect()
    }

    /// The captured registration warning messages.
    pub fn registration_warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Registration { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl DiagnosticSink for CaptureSink {
    fn syntax_warning(&self, report: &SyntaxReport<'_>) {
        self.push(Event::Syntax {
            phase: report.phase,
            issues: report.issues.to_vec(),
            input: report.input.to_string(),
        });
    }

    fn runtime_warning(&self, report: &RuntimeReport<'_>) {
        self.push(Event::Runtime {
            macro_name: report.macro_name.to_string(),
            message: report.message.clone(),
        });
    }

    fn internal_error(&self, report: &InternalReport<'_>) {
        self.push(Event::Internal {
            message: report.message.clone(),
            detail: report.detail.clone(),
        });
    }

    fn registration_warning(&self, report: &RegistrationReport<'_>) {
        self.push(Event::Registration {
            name: report.name.to_string(),
            message: report.message.clone(),
        });
    }
}

/// Build spanned tokens from compact (token, start, end) triples.
pub fn mk_tokens(specs: &[(Token, usize, usize)]) -> Vec<SpannedToken> {
    specs
        .iter()
        .map(|(token, start, end)| (token.clone(), *start..*end))
        .collect()
}

/// A registry with the builtin definitions installed.
pub fn test_registry() -> Registry {
    let mut registry = Registry::new();
    builtins::install(&mut registry);
    registry
}

/// The standard test environment: `names.user = "User"`,
/// `names.char = "Character"`, solo mode.
pub fn test_env(content: &str) -> Environment {
    let sink = CaptureSink::default();
    EnvBuilder::new().build(
        &RawEnv {
            content: content.to_string(),
            name1: "User".to_string(),
            name2: "Character".to_string(),
            model: "test-model".to_string(),
            ..RawEnv::default()
        },
        &sink,
    )
}

/// Expand one input with the builtin registry, the standard environment, and
/// a capturing sink; returns the output and the sink for assertions.
pub fn expand_traced(input: &str) -> (String, Arc<CaptureSink>) {
    let registry = test_registry();
    let env = test_env(input);
    let sink = Arc::new(CaptureSink::default());
    let engine = Engine::new().with_sink(sink.clone());
    let output = engine.evaluate(&registry, input, &env);
    (output, sink)
}

/// Expand one input, diagnostics discarded.
pub fn expand(input: &str) -> String {
    expand_traced(input).0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_sink_collects_in_order() {
        let sink = CaptureSink::default();
        sink.runtime_warning(&RuntimeReport {
            macro_name: "a",
            range: 0..1,
            raw: "{{a}}",
            message: "first".to_string(),
        });
        sink.internal_error(&InternalReport {
            macro_name: None,
            message: "second".to_string(),
            detail: None,
        });
        assert_eq!(sink.runtime_warnings(), vec!["first".to_string()]);
        assert_eq!(sink.internal_errors(), vec!["second".to_string()]);
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_expand_uses_standard_names() {
        assert_eq!(expand("{{user}} meets {{char}}"), "User meets Character");
    }
}
