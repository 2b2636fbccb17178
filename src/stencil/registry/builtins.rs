//! Builtin definitions
//!
//! The small definition library the engine ships with: participant names,
//! the comment form, time, the per-evaluation variable store, and a few
//! string utilities. Everything else is expected to come from embedders via
//! `register`.
//!
//! `trim` is intentionally absent: its semantics are handled by the engine's
//! post-processor, and registering it would make the walker resolve it before
//! the surrounding newlines can be seen.

use crate::stencil::registry::{
    AliasSpec, ArgSpec, Category, DefinitionSource, HandlerOutcome, MacroContext, MacroOptions,
    Registry,
};
use chrono::{FixedOffset, Local, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static UTC_OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^UTC([+-]\d{1,2})$").expect("valid pattern"));

/// Install every builtin definition into a registry.
pub fn install(registry: &mut Registry) {
    let mut add = |name: &str, options: MacroOptions| {
        registry
            .register(name, options.with_source(DefinitionSource::Builtin))
            .expect("builtin definitions are valid");
    };

    add(
        "user",
        MacroOptions::new(|ctx| HandlerOutcome::text(ctx.env.names.user.clone()))
            .with_category(Category::Names)
            .with_returns("the user's name"),
    );
    add(
        "char",
        MacroOptions::new(|ctx| HandlerOutcome::text(ctx.env.names.char_name.clone()))
            .with_category(Category::Names)
            .with_returns("the character's name"),
    );
    add(
        "group",
        MacroOptions::new(|ctx| HandlerOutcome::text(ctx.env.names.group.clone()))
            .with_category(Category::Names)
            .with_alias(AliasSpec::new("charIfNotGroup"))
            .with_returns("the group name, or the character's name in solo chats"),
    );
    add(
        "groupNotMuted",
        MacroOptions::new(|ctx| HandlerOutcome::text(ctx.env.names.group_not_muted.clone()))
            .with_category(Category::Names),
    );
    add(
        "notChar",
        MacroOptions::new(|ctx| HandlerOutcome::text(ctx.env.names.not_char.clone()))
            .with_category(Category::Names),
    );
    add(
        "model",
        MacroOptions::new(|ctx| HandlerOutcome::text(ctx.env.system.model.clone()))
            .with_category(Category::Utility),
    );

    add(
        "newline",
        MacroOptions::new(|_ctx| HandlerOutcome::text("\n"))
            .with_category(Category::Utility)
            .with_returns("a line break"),
    );

    add(
        "//",
        MacroOptions::new(|_ctx| HandlerOutcome::empty())
            .with_category(Category::Utility)
            .with_unnamed_args(vec![ArgSpec::optional("body", "")])
            .with_list(true)
            .with_alias(AliasSpec::new("comment").with_description("comment form"))
            .with_returns("nothing; the body is discarded")
            .with_example("{{// note to self}}"),
    );

    add(
        "time",
        MacroOptions::new(time_handler)
            .with_category(Category::Time)
            .with_unnamed_args(vec![ArgSpec::optional("offset", "")
                .with_description("UTC offset, e.g. UTC+2")
                .with_sample("UTC+2")])
            .with_returns("the current wall-clock time"),
    );

    add(
        "reverse",
        MacroOptions::new(|ctx: &MacroContext<'_>| {
            HandlerOutcome::text(ctx.unnamed_args[0].chars().rev().collect::<String>())
        })
        .with_category(Category::Utility)
        .with_unnamed_args(vec![ArgSpec::required("text")])
        .with_example("{{reverse::abc}}"),
    );

    add(
        "setvar",
        MacroOptions::new(|ctx: &MacroContext<'_>| {
            ctx.env.set_variable(&ctx.unnamed_args[0], &ctx.unnamed_args[1]);
            HandlerOutcome::empty()
        })
        .with_category(Category::Variable)
        .with_unnamed_args(vec![ArgSpec::required("name"), ArgSpec::required("value")])
        .with_returns("nothing; stores the value for this evaluation"),
    );
    add(
        "getvar",
        MacroOptions::new(|ctx: &MacroContext<'_>| {
            HandlerOutcome::text(ctx.env.get_variable(&ctx.unnamed_args[0]).unwrap_or_default())
        })
        .with_category(Category::Variable)
        .with_unnamed_args(vec![ArgSpec::required("name")]),
    );

    add(
        "original",
        MacroOptions::new(|ctx| HandlerOutcome::text(ctx.env.functions.take_original()))
            .with_category(Category::State)
            .with_returns("the seeded original text, once"),
    );

    add("description", character_field(|c| &c.description));
    add("personality", character_field(|c| &c.personality));
    add("scenario", character_field(|c| &c.scenario));
    add("persona", character_field(|c| &c.persona));
}

fn character_field(
    field: impl Fn(&crate::stencil::env::CharacterFields) -> &String + Send + Sync + 'static,
) -> MacroOptions {
    MacroOptions::new(move |ctx| {
        HandlerOutcome::text(
            ctx.env
                .character
                .as_ref()
                .map(|character| field(character).clone())
                .unwrap_or_default(),
        )
    })
    .with_category(Category::State)
}

/// Current time, optionally shifted by a `UTC±N` offset argument.
fn time_handler(ctx: &MacroContext<'_>) -> HandlerOutcome {
    let offset_arg = &ctx.unnamed_args[0];
    if offset_arg.is_empty() {
        return HandlerOutcome::text(Local::now().format("%H:%M").to_string());
    }
    let Some(capture) = UTC_OFFSET.captures(offset_arg) else {
        return HandlerOutcome::RuntimeError(format!("invalid UTC offset '{offset_arg}'"));
    };
    let hours: i32 = match capture[1].parse() {
        Ok(hours) => hours,
        Err(_) => {
            return HandlerOutcome::RuntimeError(format!("invalid UTC offset '{offset_arg}'"))
        }
    };
    let Some(offset) = FixedOffset::east_opt(hours * 3600) else {
        return HandlerOutcome::RuntimeError(format!("UTC offset '{offset_arg}' is out of range"));
    };
    HandlerOutcome::text(Utc::now().with_timezone(&offset).format("%H:%M").to_string())
}
