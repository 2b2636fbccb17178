//! Registration and dispatch contracts
//!
//! Exercises the registry through its public API the way an extension
//! author would: registration validation, alias behavior, strictness, and
//! the visibility guarantees around mutation.

use std::sync::{Arc, Mutex};
use stencil::stencil::engine::Engine;
use stencil::stencil::registry::{
    AliasSpec, ArgSchema, ArgSpec, ArgType, HandlerOutcome, ListSchema, MacroOptions,
    RegistrationError, Registry,
};
use stencil::stencil::testing::{test_env, test_registry, CaptureSink};

fn fixed(value: &'static str) -> MacroOptions {
    MacroOptions::new(move |_| HandlerOutcome::text(value))
}

#[test]
fn test_registration_is_immediately_visible() {
    let mut registry = test_registry();
    registry.register("fresh", fixed("fresh value")).unwrap();

    let engine = Engine::new();
    let env = test_env("{{fresh}}");
    assert_eq!(engine.evaluate(&registry, "{{fresh}}", &env), "fresh value");
}

#[test]
fn test_rejected_registration_leaves_no_state() {
    let mut registry = test_registry();
    // "newline" is a builtin; the whole registration must be refused,
    // including the innocent alias.
    let result = registry.register(
        "newline",
        fixed("shadow").with_alias(AliasSpec::new("br")),
    );
    assert!(matches!(result, Err(RegistrationError::NameCollision { .. })));
    assert!(!registry.has("br"));

    let engine = Engine::new();
    let env = test_env("{{newline}}");
    assert_eq!(engine.evaluate(&registry, "{{newline}}", &env), "\n");
}

#[test]
fn test_unregister_then_reregister_is_equivalent() {
    let mut registry = test_registry();
    let options = || {
        fixed("probe value")
            .with_unnamed_args(ArgSchema::Count(0))
            .with_alias(AliasSpec::new("probe-alias"))
    };
    registry.register("probe", options()).unwrap();
    let before = registry.get("probe").unwrap();

    assert!(registry.unregister("probe"));
    assert!(!registry.has("probe"));
    assert!(!registry.has("probe-alias"));

    registry.register("probe", options()).unwrap();
    let after = registry.get("probe").unwrap();

    assert_eq!(before.def.name, after.def.name);
    assert_eq!(before.def.max_args(), after.def.max_args());
    assert_eq!(before.def.strict_args, after.def.strict_args);
    assert!(registry.has("probe-alias"));

    let engine = Engine::new();
    let env = test_env("{{probe-alias}}");
    assert_eq!(engine.evaluate(&registry, "{{probe-alias}}", &env), "probe value");
}

#[test]
fn test_strict_integer_argument_scenario() {
    let mut registry = test_registry();
    registry
        .register(
            "test-int-strict",
            MacroOptions::new(|_| HandlerOutcome::text("ran"))
                .with_unnamed_args(vec![ArgSpec::required("value").with_type(ArgType::Integer)])
                .strict(),
        )
        .unwrap();

    let sink = Arc::new(CaptureSink::default());
    let engine = Engine::new().with_sink(sink.clone());
    let input = "Value: {{test-int-strict::abc}}";
    let env = test_env(input);
    assert_eq!(engine.evaluate(&registry, input, &env), input);
    assert!(sink
        .runtime_warnings()
        .iter()
        .any(|message| message.contains("expected type integer")));

    // A valid value executes.
    let input = "Value: {{test-int-strict::42}}";
    let env = test_env(input);
    assert_eq!(engine.evaluate(&registry, input, &env), "Value: ran");
}

#[test]
fn test_non_strict_type_mismatch_runs_anyway() {
    let mut registry = test_registry();
    registry
        .register(
            "lenient-int",
            MacroOptions::new(|ctx| HandlerOutcome::text(format!("got {}", ctx.unnamed_args[0])))
                .with_unnamed_args(vec![ArgSpec::required("value").with_type(ArgType::Integer)]),
        )
        .unwrap();

    let sink = Arc::new(CaptureSink::default());
    let engine = Engine::new().with_sink(sink.clone());
    let env = test_env("{{lenient-int::abc}}");
    assert_eq!(
        engine.evaluate(&registry, "{{lenient-int::abc}}", &env),
        "got abc"
    );
    assert_eq!(sink.runtime_warnings().len(), 1);
}

#[test]
fn test_variadic_list_reaches_handler() {
    let mut registry = test_registry();
    registry
        .register(
            "join",
            MacroOptions::new(|ctx| HandlerOutcome::text(ctx.list.join(&ctx.unnamed_args[0])))
                .with_unnamed_args(1)
                .with_list(ListSchema::Bounds { min: 1, max: None }),
        )
        .unwrap();

    let engine = Engine::new();
    let env = test_env("{{join::-::a::b::c}}");
    assert_eq!(
        engine.evaluate(&registry, "{{join::-::a::b::c}}", &env),
        "a-b-c"
    );
}

#[test]
fn test_unlexable_name_warns_on_registration() {
    let mut registry = Registry::new();
    let sink = CaptureSink::default();
    registry
        .register_with("has space", fixed("x"), &sink)
        .unwrap();
    assert!(registry.has("has space"));
    assert_eq!(sink.registration_warnings().len(), 1);
}

#[test]
fn test_handler_sees_call_metadata() {
    let seen: Arc<Mutex<Vec<(String, String)>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    let mut registry = test_registry();
    registry
        .register(
            "record",
            MacroOptions::new(move |ctx| {
                recorded
                    .lock()
                    .unwrap()
                    .push((ctx.call.raw_inner.clone(), ctx.call.raw_with_braces.clone()));
                HandlerOutcome::empty()
            })
            .with_unnamed_args(1),
        )
        .unwrap();

    let engine = Engine::new();
    let input = "{{record::{{user}}}}";
    let env = test_env(input);
    engine.evaluate(&registry, input, &env);

    let calls = seen.lock().unwrap();
    assert_eq!(calls.len(), 1);
    // raw_inner carries the expanded nested value; raw_with_braces carries
    // the original bytes.
    assert_eq!(calls[0].0, "record::User");
    assert_eq!(calls[0].1, "{{record::{{user}}}}");
}
