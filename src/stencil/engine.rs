//! Evaluation engine
//!
//!     The engine is the glue over the pipeline: it applies the ordered
//!     pre-processors (legacy rewrites), drives lex -> parse -> walk with a
//!     resolver that dispatches through the registry and the environment's
//!     dynamic macros, then applies the ordered post-processors (escape
//!     unescaping, trim-context removal).
//!
//! Failure model
//!
//!     The engine never fails the document. Syntax problems are reported and
//!     recovered from; unknown invocations are preserved verbatim with their
//!     nested invocations expanded; handler failures keep the invocation raw.
//!     The worst case for any input is the input itself.
//!
//! Trim
//!
//!     `{{trim}}` is deliberately not a registered macro: its semantics reach
//!     across its own bounds (it removes the newline runs around itself), so
//!     it cannot be resolved by the walker, which only ever replaces the
//!     invocation span. It survives walking as an unknown invocation and the
//!     post-processor removes it together with the surrounding newlines.

pub mod postprocess;
pub mod preprocess;

use crate::stencil::diagnostics::{
    ConsoleSink, DiagnosticSink, InternalReport, SyntaxPhase, SyntaxReport,
};
use crate::stencil::env::Environment;
use crate::stencil::parsing;
use crate::stencil::registry::{self, Call, Definition, Execution, MacroValue, Registry};
use crate::stencil::walking::Walker;
use std::sync::{Arc, PoisonError};

/// An ordered text transformation applied before or after evaluation.
pub type Processor = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Drives one `evaluate` call end to end.
pub struct Engine {
    pre: Vec<Processor>,
    post: Vec<Processor>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Engine {
    /// An engine with the required processor chains and the console sink.
    pub fn new() -> Self {
        Self {
            pre: vec![
                Box::new(|input| preprocess::rewrite_utc_time(input)),
                Box::new(|input| preprocess::rewrite_bare_markers(input)),
            ],
            post: vec![
                Box::new(|input| postprocess::unescape_braces(input)),
                Box::new(|input| postprocess::collapse_trim(input)),
            ],
            sink: Arc::new(ConsoleSink),
        }
    }

    /// Replace the diagnostic sink.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Append a pre-processor after the required ones.
    pub fn add_preprocessor(&mut self, processor: Processor) {
        self.pre.push(processor);
    }

    /// Append a post-processor after the required ones.
    pub fn add_postprocessor(&mut self, processor: Processor) {
        self.post.push(processor);
    }

    /// Expand every recognized invocation in `input`.
    pub fn evaluate(&self, registry: &Registry, input: &str, env: &Environment) -> String {
        if input.is_empty() {
            return String::new();
        }

        let mut text = input.to_string();
        for processor in &self.pre {
            text = processor(&text);
        }

        let parsed = parsing::parse(&text);
        if !parsed.lex_issues.is_empty() {
            self.sink.syntax_warning(&SyntaxReport {
                phase: SyntaxPhase::Lexing,
                issues: &parsed.lex_issues,
                input: &text,
            });
        }
        if !parsed.parse_issues.is_empty() {
            self.sink.syntax_warning(&SyntaxReport {
                phase: SyntaxPhase::Parsing,
                issues: &parsed.parse_issues,
                input: &text,
            });
        }

        let mut walker = Walker::new(&text, env, self.sink.as_ref(), |call: &Call<'_>| {
            self.resolve_macro(registry, call)
        });
        let mut output = walker.walk(&parsed.document);
        drop(walker);

        for processor in &self.post {
            output = processor(&output);
        }
        output
    }

    /// Decide one invocation's value.
    ///
    /// Dynamic macros win over the registry; a name starting with `//` that
    /// misses an exact lookup dispatches to the `//` comment definition; an
    /// unknown name keeps the invocation raw (with nested values already
    /// substituted) and is deliberately not reported.
    fn resolve_macro(&self, registry: &Registry, call: &Call<'_>) -> String {
        let raw = call.raw_preserved();
        if call.name.is_empty() {
            return raw;
        }

        let execution = if let Some(dynamic) = call.env.dynamic_macros.get(&call.name) {
            let def = Definition::dynamic(&call.name, dynamic);
            registry.execute_macro(call, Some(&def), self.sink.as_ref())
        } else {
            let resolved = registry.get(&call.name).or_else(|| {
                call.name
                    .starts_with("//")
                    .then(|| registry.get("//"))
                    .flatten()
            });
            match resolved {
                Some(resolved) => {
                    registry.execute_macro(call, Some(resolved.def.as_ref()), self.sink.as_ref())
                }
                None => return raw,
            }
        };

        match execution {
            Execution::Replaced(value) => self.apply_env_post_process(call, value),
            Execution::Raw | Execution::Unknown => raw,
        }
    }

    /// Run the environment's per-evaluation post-process hook, if any.
    /// Failures are internal errors; the value is used unchanged.
    fn apply_env_post_process(&self, call: &Call<'_>, value: String) -> String {
        let Some(hook) = &call.env.functions.post_process else {
            return value;
        };
        match hook(&value) {
            Ok(processed) => processed,
            Err(message) => {
                self.sink.internal_error(&InternalReport {
                    macro_name: Some(&call.name),
                    message: "post-process hook failed".to_string(),
                    detail: Some(message),
                });
                value
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a handler value to its final output string.
pub fn normalize(value: &MacroValue) -> String {
    value.normalize()
}

/// Evaluate against the process-wide registry with a default engine.
pub fn evaluate(input: &str, env: &Environment) -> String {
    let registry = registry::global()
        .read()
        .unwrap_or_else(PoisonError::into_inner);
    Engine::new().evaluate(&registry, input, env)
}
