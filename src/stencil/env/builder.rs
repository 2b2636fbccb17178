//! Environment construction
//!
//!     The environment is assembled by an ordered provider chain. Providers
//!     register into one of three buckets - EARLY, NORMAL, LATE - and run in
//!     bucket order over a shared mutable environment. Each provider runs
//!     inside an isolated failure boundary: a failing provider is reported on
//!     the internal channel and construction continues, so one broken
//!     extension cannot take the whole evaluation down.
//!
//!     Dynamic macros from the context are overlaid after every provider has
//!     run, so they win over anything a provider set up.

use super::{CharacterFields, DynamicMacro, EnvFunctions, Environment, PostProcessFn};
use crate::stencil::diagnostics::{DiagnosticSink, InternalReport};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The raw context an embedder hands to the builder.
#[derive(Clone, Default)]
pub struct RawEnv {
    /// The input text about to be evaluated.
    pub content: String,
    /// Global user name.
    pub name1: String,
    /// Global character name.
    pub name2: String,
    pub name1_override: Option<String>,
    pub name2_override: Option<String>,
    /// The active group name, when a group is selected.
    pub group: Option<String>,
    pub group_override: Option<String>,
    pub model: String,
    /// When set, character card fields are exposed to handlers.
    pub replace_character_card: bool,
    pub character: Option<CharacterFields>,
    pub dynamic_macros: HashMap<String, DynamicMacro>,
    /// Seed for the one-shot `original` helper.
    pub original: Option<String>,
    pub post_process: Option<PostProcessFn>,
}

/// Ordering bucket for environment providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderBucket {
    Early,
    Normal,
    Late,
}

/// A provider mutates the environment under construction. Errors are reported
/// and skipped, never propagated.
pub type Provider = Arc<dyn Fn(&RawEnv, &mut Environment) -> Result<(), String> + Send + Sync>;

/// Assembles environments from raw contexts via the provider chain.
pub struct EnvBuilder {
    early: Vec<Provider>,
    normal: Vec<Provider>,
    late: Vec<Provider>,
}

impl EnvBuilder {
    /// An empty builder with no providers.
    pub fn empty() -> Self {
        Self {
            early: Vec::new(),
            normal: Vec::new(),
            late: Vec::new(),
        }
    }

    /// A builder with the core providers installed: names and content hash
    /// (EARLY), system info and character fields (NORMAL), helper functions
    /// (LATE).
    pub fn new() -> Self {
        let mut builder = Self::empty();
        builder.register(ProviderBucket::Early, Arc::new(identity_provider));
        builder.register(ProviderBucket::Normal, Arc::new(system_provider));
        builder.register(ProviderBucket::Normal, Arc::new(character_provider));
        builder.register(ProviderBucket::Late, Arc::new(functions_provider));
        builder
    }

    /// Register a provider into a bucket.
    pub fn register(&mut self, bucket: ProviderBucket, provider: Provider) {
        match bucket {
            ProviderBucket::Early => self.early.push(provider),
            ProviderBucket::Normal => self.normal.push(provider),
            ProviderBucket::Late => self.late.push(provider),
        }
    }

    /// Build an environment from a raw context.
    ///
    /// Providers run EARLY -> NORMAL -> LATE; a provider error is reported on
    /// the internal channel and the chain continues. The context's dynamic
    /// macros are overlaid last.
    pub fn build(&self, ctx: &RawEnv, sink: &dyn DiagnosticSink) -> Environment {
        let mut env = Environment {
            content: ctx.content.clone(),
            ..Environment::default()
        };

        for provider in self
            .early
            .iter()
            .chain(self.normal.iter())
            .chain(self.late.iter())
        {
            if let Err(message) = provider(ctx, &mut env) {
                sink.internal_error(&InternalReport {
                    macro_name: None,
                    message: "environment provider failed".to_string(),
                    detail: Some(message),
                });
            }
        }

        env.dynamic_macros.extend(
            ctx.dynamic_macros
                .iter()
                .map(|(name, value)| (name.clone(), value.clone())),
        );
        env
    }
}

impl Default for EnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Names and content hash.
///
/// User and char honor their overrides. With a group selected, `group`,
/// `group_not_muted`, and `not_char` all resolve to the group name (or its
/// override); in solo mode `group` and `group_not_muted` fall back to the
/// char name and `not_char` to the user name.
fn identity_provider(ctx: &RawEnv, env: &mut Environment) -> Result<(), String> {
    let mut hasher = DefaultHasher::new();
    ctx.content.hash(&mut hasher);
    env.content_hash = hasher.finish();

    let user = ctx.name1_override.clone().unwrap_or_else(|| ctx.name1.clone());
    let char_name = ctx.name2_override.clone().unwrap_or_else(|| ctx.name2.clone());

    let (group, group_not_muted, not_char) = match &ctx.group {
        Some(group_name) => {
            let name = ctx
                .group_override
                .clone()
                .unwrap_or_else(|| group_name.clone());
            (name.clone(), name.clone(), name)
        }
        None => (char_name.clone(), char_name.clone(), user.clone()),
    };

    env.names.user = user;
    env.names.char_name = char_name;
    env.names.group = group;
    env.names.group_not_muted = group_not_muted;
    env.names.not_char = not_char;
    Ok(())
}

fn system_provider(ctx: &RawEnv, env: &mut Environment) -> Result<(), String> {
    env.system.model = ctx.model.clone();
    Ok(())
}

/// Character fields are exposed only when the context asks for replacement.
fn character_provider(ctx: &RawEnv, env: &mut Environment) -> Result<(), String> {
    if ctx.replace_character_card {
        env.character = Some(ctx.character.clone().unwrap_or_default());
    }
    Ok(())
}

fn functions_provider(ctx: &RawEnv, env: &mut Environment) -> Result<(), String> {
    env.functions = EnvFunctions::new(ctx.post_process.clone(), ctx.original.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::testing::CaptureSink;

    fn raw(name1: &str, name2: &str) -> RawEnv {
        RawEnv {
            name1: name1.to_string(),
            name2: name2.to_string(),
            ..RawEnv::default()
        }
    }

    #[test]
    fn test_solo_name_semantics() {
        let sink = CaptureSink::default();
        let env = EnvBuilder::new().build(&raw("User", "Character"), &sink);
        assert_eq!(env.names.user, "User");
        assert_eq!(env.names.char_name, "Character");
        assert_eq!(env.names.group, "Character");
        assert_eq!(env.names.group_not_muted, "Character");
        assert_eq!(env.names.not_char, "User");
    }

    #[test]
    fn test_group_name_semantics() {
        let sink = CaptureSink::default();
        let mut ctx = raw("User", "Character");
        ctx.group = Some("The Party".to_string());
        let env = EnvBuilder::new().build(&ctx, &sink);
        assert_eq!(env.names.group, "The Party");
        assert_eq!(env.names.group_not_muted, "The Party");
        assert_eq!(env.names.not_char, "The Party");
    }

    #[test]
    fn test_overrides_win() {
        let sink = CaptureSink::default();
        let mut ctx = raw("User", "Character");
        ctx.name1_override = Some("Override".to_string());
        ctx.group = Some("The Party".to_string());
        ctx.group_override = Some("Subset".to_string());
        let env = EnvBuilder::new().build(&ctx, &sink);
        assert_eq!(env.names.user, "Override");
        assert_eq!(env.names.group, "Subset");
    }

    #[test]
    fn test_character_fields_gated_by_flag() {
        let sink = CaptureSink::default();
        let mut ctx = raw("User", "Character");
        ctx.character = Some(CharacterFields {
            description: "A test character".to_string(),
            ..CharacterFields::default()
        });
        let env = EnvBuilder::new().build(&ctx, &sink);
        assert!(env.character.is_none());

        ctx.replace_character_card = true;
        let env = EnvBuilder::new().build(&ctx, &sink);
        assert_eq!(
            env.character.as_ref().map(|c| c.description.as_str()),
            Some("A test character")
        );
    }

    #[test]
    fn test_failing_provider_is_isolated() {
        let sink = CaptureSink::default();
        let mut builder = EnvBuilder::new();
        builder.register(
            ProviderBucket::Early,
            Arc::new(|_ctx: &RawEnv, _env: &mut Environment| Err("broken provider".to_string())),
        );
        let env = builder.build(&raw("User", "Character"), &sink);
        // The chain continued past the failure.
        assert_eq!(env.names.user, "User");
        assert_eq!(sink.internal_errors().len(), 1);
    }

    #[test]
    fn test_dynamic_macros_overlaid() {
        let sink = CaptureSink::default();
        let mut ctx = raw("User", "Character");
        ctx.dynamic_macros.insert(
            "inline".to_string(),
            DynamicMacro::Value("value".to_string()),
        );
        let env = EnvBuilder::new().build(&ctx, &sink);
        assert!(env.dynamic_macros.contains_key("inline"));
    }
}
