//! Invocation-time dispatch
//!
//! `execute_macro` is the contract-checked path between a walked invocation
//! and its handler:
//!
//!     1. resolve the definition (override first, then lookup)
//!     2. validate arity against the positional schema and list bounds
//!     3. apply defaults for missing optional positionals
//!     4. type-check the caller-supplied positionals
//!     5. split into fixed positionals and the variadic tail
//!     6. invoke the handler
//!     7. normalize the returned value
//!
//! Violations are reported as runtime warnings. Under `strict_args` a
//! violation suppresses execution and the invocation stays raw; otherwise
//! execution proceeds anyway.

use crate::stencil::diagnostics::{DiagnosticSink, InternalReport, RuntimeReport};
use crate::stencil::registry::definition::{Call, Definition, HandlerOutcome, MacroContext};
use crate::stencil::registry::{Registry, ResolvedMacro};

/// What dispatch decided for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    /// The handler ran; this is the normalized value.
    Replaced(String),
    /// The invocation must stay raw in the output.
    Raw,
    /// No definition exists for the name.
    Unknown,
}

impl Registry {
    /// Dispatch one call through its definition contract.
    ///
    /// `def_override` short-circuits the lookup; the engine uses it for
    /// dynamic macros and for comment-prefix dispatch.
    pub fn execute_macro(
        &self,
        call: &Call<'_>,
        def_override: Option<&Definition>,
        sink: &dyn DiagnosticSink,
    ) -> Execution {
        let looked_up: Option<ResolvedMacro>;
        let def: &Definition = match def_override {
            Some(def) => def,
            None => {
                looked_up = self.get(&call.name);
                match looked_up.as_ref() {
                    Some(resolved) => resolved.def.as_ref(),
                    None => return Execution::Unknown,
                }
            }
        };

        let n = call.args.len();
        let required = def.min_args();
        let positional = def.max_args();
        let (list_min, list_max) = match &def.list {
            Some(spec) => (spec.min, spec.max.unwrap_or(usize::MAX)),
            None => (0, 0),
        };
        let max_total = positional.saturating_add(list_max);
        let arity_ok =
            n >= required && n <= max_total && (n <= positional || n >= positional + list_min);
        if !arity_ok {
            sink.runtime_warning(&RuntimeReport {
                macro_name: &call.name,
                range: call.range.clone(),
                raw: &call.raw_with_braces,
                message: arity_message(required, positional, &def.list, n),
            });
            if def.strict_args {
                return Execution::Raw;
            }
        }

        let mut args = call.args.clone();
        for index in n..positional {
            let spec = &def.unnamed_arg_defs[index];
            args.push(spec.default_value.clone().unwrap_or_default());
        }

        for index in 0..n.min(positional) {
            let spec = &def.unnamed_arg_defs[index];
            if !spec.ty.accepts(&args[index]) {
                sink.runtime_warning(&RuntimeReport {
                    macro_name: &call.name,
                    range: call.range.clone(),
                    raw: &call.raw_with_braces,
                    message: format!(
                        "argument '{}' is '{}', expected type {}",
                        spec.name, args[index], spec.ty
                    ),
                });
                if def.strict_args {
                    return Execution::Raw;
                }
            }
        }

        let list: Vec<String> = if args.len() > positional {
            if def.list.is_some() {
                args.split_off(positional)
            } else {
                // Excess without a list policy already warned above.
                args.truncate(positional);
                Vec::new()
            }
        } else {
            Vec::new()
        };

        let ctx = MacroContext {
            unnamed_args: &args,
            list: &list,
            env: call.env,
            call,
            range: call.range.clone(),
        };
        match (def.handler)(&ctx) {
            HandlerOutcome::Value(value) => Execution::Replaced(value.normalize()),
            HandlerOutcome::RuntimeError(message) => {
                sink.runtime_warning(&RuntimeReport {
                    macro_name: &call.name,
                    range: call.range.clone(),
                    raw: &call.raw_with_braces,
                    message,
                });
                Execution::Raw
            }
            HandlerOutcome::InternalError(message) => {
                sink.internal_error(&InternalReport {
                    macro_name: Some(&call.name),
                    message: "handler failed".to_string(),
                    detail: Some(message),
                });
                Execution::Raw
            }
        }
    }
}

fn arity_message(
    required: usize,
    positional: usize,
    list: &Option<crate::stencil::registry::ListSpec>,
    n: usize,
) -> String {
    match list {
        Some(spec) if spec.max.is_none() => format!(
            "expected at least {} argument(s), got {}",
            required, n
        ),
        Some(spec) => format!(
            "expected between {} and {} argument(s), got {}",
            required,
            positional + spec.max.unwrap_or(0),
            n
        ),
        None => {
            if required == positional {
                format!("expected {} argument(s), got {}", required, n)
            } else {
                format!(
                    "expected between {} and {} argument(s), got {}",
                    required, positional, n
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::cst::{CloseDelimiter, IdentToken, Invocation};
    use crate::stencil::env::Environment;
    use crate::stencil::registry::{
        ArgSpec, ArgType, HandlerOutcome, ListSchema, MacroOptions,
    };
    use crate::stencil::testing::CaptureSink;

    fn probe_invocation() -> Invocation {
        Invocation {
            open: 0..2,
            ident: IdentToken {
                text: "probe".to_string(),
                span: 2..7,
            },
            head: vec![],
            args: vec![],
            close: CloseDelimiter::Real(7..9),
        }
    }

    fn call<'a>(env: &'a Environment, node: &'a Invocation, args: &[&str]) -> Call<'a> {
        Call {
            name: "probe".to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            raw_inner: "probe".to_string(),
            raw_with_braces: "{{probe}}".to_string(),
            range: 0..9,
            node,
            env,
        }
    }

    fn registry_with(options: MacroOptions) -> Registry {
        let mut registry = Registry::new();
        registry.register("probe", options).unwrap();
        registry
    }

    #[test]
    fn test_unknown_signalled() {
        let registry = Registry::new();
        let env = Environment::default();
        let node = probe_invocation();
        let sink = CaptureSink::default();
        assert_eq!(
            registry.execute_macro(&call(&env, &node, &[]), None, &sink),
            Execution::Unknown
        );
        // Unknown macros are not a warning.
        assert!(sink.runtime_warnings().is_empty());
    }

    #[test]
    fn test_echo_arguments() {
        let registry = registry_with(
            MacroOptions::new(|ctx| HandlerOutcome::text(ctx.unnamed_args.join("+")))
                .with_unnamed_args(2),
        );
        let env = Environment::default();
        let node = probe_invocation();
        let sink = CaptureSink::default();
        assert_eq!(
            registry.execute_macro(&call(&env, &node, &["a", "b"]), None, &sink),
            Execution::Replaced("a+b".to_string())
        );
    }

    #[test]
    fn test_strict_arity_keeps_raw() {
        let registry = registry_with(
            MacroOptions::new(|_| HandlerOutcome::text("ran"))
                .with_unnamed_args(1)
                .strict(),
        );
        let env = Environment::default();
        let node = probe_invocation();
        let sink = CaptureSink::default();
        assert_eq!(
            registry.execute_macro(&call(&env, &node, &[]), None, &sink),
            Execution::Raw
        );
        assert_eq!(sink.runtime_warnings().len(), 1);
    }

    #[test]
    fn test_lenient_arity_executes_with_warning() {
        let registry = registry_with(
            MacroOptions::new(|ctx| HandlerOutcome::text(format!("got {}", ctx.unnamed_args[0])))
                .with_unnamed_args(1),
        );
        let env = Environment::default();
        let node = probe_invocation();
        let sink = CaptureSink::default();
        assert_eq!(
            registry.execute_macro(&call(&env, &node, &[]), None, &sink),
            Execution::Replaced("got ".to_string())
        );
        assert_eq!(sink.runtime_warnings().len(), 1);
    }

    #[test]
    fn test_optional_default_applied() {
        let registry = registry_with(
            MacroOptions::new(|ctx| HandlerOutcome::text(ctx.unnamed_args.join(",")))
                .with_unnamed_args(vec![
                    ArgSpec::required("first"),
                    ArgSpec::optional("second", "fallback"),
                ]),
        );
        let env = Environment::default();
        let node = probe_invocation();
        let sink = CaptureSink::default();
        assert_eq!(
            registry.execute_macro(&call(&env, &node, &["x"]), None, &sink),
            Execution::Replaced("x,fallback".to_string())
        );
        assert!(sink.runtime_warnings().is_empty());
    }

    #[test]
    fn test_strict_type_mismatch_keeps_raw() {
        let registry = registry_with(
            MacroOptions::new(|_| HandlerOutcome::text("ran"))
                .with_unnamed_args(vec![
                    ArgSpec::required("count").with_type(ArgType::Integer)
                ])
                .strict(),
        );
        let env = Environment::default();
        let node = probe_invocation();
        let sink = CaptureSink::default();
        assert_eq!(
            registry.execute_macro(&call(&env, &node, &["abc"]), None, &sink),
            Execution::Raw
        );
        let warnings = sink.runtime_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("expected type integer"));
    }

    #[test]
    fn test_list_split() {
        let registry = registry_with(
            MacroOptions::new(|ctx| {
                HandlerOutcome::text(format!(
                    "{}|{}",
                    ctx.unnamed_args.join(","),
                    ctx.list.join(",")
                ))
            })
            .with_unnamed_args(1)
            .with_list(true),
        );
        let env = Environment::default();
        let node = probe_invocation();
        let sink = CaptureSink::default();
        assert_eq!(
            registry.execute_macro(&call(&env, &node, &["a", "b", "c"]), None, &sink),
            Execution::Replaced("a|b,c".to_string())
        );
    }

    #[test]
    fn test_list_minimum_enforced() {
        // One positional plus a tail of at least two.
        let registry = registry_with(
            MacroOptions::new(|_| HandlerOutcome::text("ran"))
                .with_unnamed_args(1)
                .with_list(ListSchema::Bounds {
                    min: 2,
                    max: Some(4),
                })
                .strict(),
        );
        let env = Environment::default();
        let node = probe_invocation();
        let sink = CaptureSink::default();
        // Two args: more than positional but under positional + list min.
        assert_eq!(
            registry.execute_macro(&call(&env, &node, &["a", "b"]), None, &sink),
            Execution::Raw
        );
        // One arg: exactly the positional count is fine.
        assert_eq!(
            registry.execute_macro(&call(&env, &node, &["a"]), None, &sink),
            Execution::Replaced("ran".to_string())
        );
        // Three args: positional + list min satisfied.
        assert_eq!(
            registry.execute_macro(&call(&env, &node, &["a", "b", "c"]), None, &sink),
            Execution::Replaced("ran".to_string())
        );
    }

    #[test]
    fn test_handler_runtime_error_keeps_raw() {
        let registry = registry_with(MacroOptions::new(|_| {
            HandlerOutcome::RuntimeError("bad input".to_string())
        }));
        let env = Environment::default();
        let node = probe_invocation();
        let sink = CaptureSink::default();
        assert_eq!(
            registry.execute_macro(&call(&env, &node, &[]), None, &sink),
            Execution::Raw
        );
        assert!(sink.runtime_warnings().iter().any(|m| m.contains("bad input")));
    }

    #[test]
    fn test_handler_internal_error_keeps_raw() {
        let registry = registry_with(MacroOptions::new(|_| {
            HandlerOutcome::InternalError("index out of range".to_string())
        }));
        let env = Environment::default();
        let node = probe_invocation();
        let sink = CaptureSink::default();
        assert_eq!(
            registry.execute_macro(&call(&env, &node, &[]), None, &sink),
            Execution::Raw
        );
        assert_eq!(sink.internal_errors().len(), 1);
    }
}
