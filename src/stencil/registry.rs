//! Macro registry
//!
//!     The registry is the mapping from invocation name (and alias) to a
//!     [`Definition`]: argument schema, list policy, strictness, and handler.
//!     It validates registration up front and invocation-time contracts at
//!     dispatch. Registration is total: either the definition is installed
//!     and immediately visible to lookup and execution, or it is rejected
//!     with a structured error and no partial state remains.
//!
//! Aliases
//!
//!     Aliases are stored as pointers to the primary definition. Looking up
//!     an alias returns the primary definition with `alias_of` set and any
//!     alias-specific description applied. Unregistering a primary removes
//!     its aliases; unregistering an alias removes only that alias.
//!
//! Process-wide holder
//!
//!     The registry is an explicit value owned by the application; engine
//!     operations take a registry reference. For the common case a lazily
//!     initialized process-wide holder, guarded by a read-write lock and
//!     seeded with the builtin definitions, is available via [`global`].

pub mod builtins;
pub mod definition;
pub mod errors;
pub mod execution;

pub use definition::{
    AliasSpec, ArgSchema, ArgSpec, ArgType, Call, Category, Definition, DefinitionSource, Handler,
    HandlerOutcome, ListSchema, ListSpec, MacroContext, MacroOptions, MacroValue,
};
pub use errors::RegistrationError;
pub use execution::Execution;

use crate::stencil::diagnostics::{ConsoleSink, DiagnosticSink, RegistrationReport};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

static LEXABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_/][A-Za-z0-9_/\-]*$").expect("valid pattern"));

#[derive(Debug, Clone)]
struct AliasEntry {
    primary: String,
    description: Option<String>,
    hidden: bool,
}

/// The result of an alias-aware lookup.
#[derive(Debug, Clone)]
pub struct ResolvedMacro {
    pub def: Arc<Definition>,
    /// Set when the lookup went through an alias.
    pub alias_of: Option<String>,
    /// Alias-specific description, when one was declared.
    pub description: Option<String>,
}

/// A listing entry for UI consumption.
#[derive(Debug, Clone, Serialize)]
pub struct MacroListing {
    pub name: String,
    pub alias_of: Option<String>,
    pub category: Category,
    pub description: Option<String>,
    pub hidden: bool,
    pub min_args: usize,
    pub max_args: usize,
    pub strict_args: bool,
    pub source: DefinitionSource,
}

/// The name-to-definition mapping.
#[derive(Default)]
pub struct Registry {
    defs: HashMap<String, Arc<Definition>>,
    aliases: HashMap<String, AliasEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and install a definition under `name`.
    ///
    /// Suspicious but non-fatal conditions go to the default console sink;
    /// use [`register_with`](Self::register_with) to direct them elsewhere.
    pub fn register(&mut self, name: &str, options: MacroOptions) -> Result<(), RegistrationError> {
        self.register_with(name, options, &ConsoleSink)
    }

    /// Validate and install a definition under `name`, reporting warnings to
    /// the given sink.
    ///
    /// All validation happens before any mutation, so a rejected registration
    /// leaves the registry exactly as it was.
    pub fn register_with(
        &mut self,
        name: &str,
        options: MacroOptions,
        sink: &dyn DiagnosticSink,
    ) -> Result<(), RegistrationError> {
        if name.is_empty() {
            return Err(RegistrationError::EmptyName);
        }

        let unnamed_arg_defs = options.unnamed_args.into_specs();
        let mut seen_optional = None;
        for (index, spec) in unnamed_arg_defs.iter().enumerate() {
            if spec.optional {
                seen_optional.get_or_insert(index);
            } else if let Some(optional_index) = seen_optional {
                return Err(RegistrationError::OptionalBeforeRequired {
                    index: optional_index,
                });
            }
            if has_empty_union(&spec.ty) {
                return Err(RegistrationError::EmptyUnion { index });
            }
        }

        let list = options.list.into_spec();
        if let Some(spec) = &list {
            if let Some(max) = spec.max {
                if max < spec.min {
                    return Err(RegistrationError::InvalidList { min: spec.min, max });
                }
            }
        }

        let mut candidates = vec![name.to_string()];
        candidates.extend(options.aliases.iter().map(|alias| alias.name.clone()));
        for (index, candidate) in candidates.iter().enumerate() {
            if candidates[..index].contains(candidate) {
                return Err(RegistrationError::NameCollision {
                    name: candidate.clone(),
                    existing: name.to_string(),
                });
            }
            if let Some(existing) = self.primary_for(candidate) {
                return Err(RegistrationError::NameCollision {
                    name: candidate.clone(),
                    existing,
                });
            }
        }

        for candidate in &candidates {
            if !LEXABLE_NAME.is_match(candidate) {
                sink.registration_warning(&RegistrationReport {
                    name: candidate,
                    message: "name is not a lexable identifier and can never be invoked"
                        .to_string(),
                });
            }
        }

        let definition = Arc::new(Definition {
            name: name.to_string(),
            aliases: options.aliases.clone(),
            category: options.category,
            unnamed_arg_defs,
            list,
            strict_args: options.strict_args,
            returns: options.returns,
            return_type: options.return_type,
            example_usage: options.example_usage,
            display_override: options.display_override,
            handler: options.handler,
            source: options.source,
        });
        for alias in &options.aliases {
            self.aliases.insert(
                alias.name.clone(),
                AliasEntry {
                    primary: name.to_string(),
                    description: alias.description.clone(),
                    hidden: alias.hidden,
                },
            );
        }
        self.defs.insert(name.to_string(), definition);
        Ok(())
    }

    /// Remove a name from the registry.
    ///
    /// Removing a primary also removes all of its aliases; removing an alias
    /// removes only that alias. Returns whether anything was removed.
    pub fn unregister(&mut self, name: &str) -> bool {
        if self.defs.remove(name).is_some() {
            self.aliases.retain(|_, entry| entry.primary != name);
            return true;
        }
        self.aliases.remove(name).is_some()
    }

    /// Alias-aware lookup.
    pub fn get(&self, name: &str) -> Option<ResolvedMacro> {
        if let Some(def) = self.defs.get(name) {
            return Some(ResolvedMacro {
                def: Arc::clone(def),
                alias_of: None,
                description: None,
            });
        }
        let entry = self.aliases.get(name)?;
        let def = self.defs.get(&entry.primary)?;
        Some(ResolvedMacro {
            def: Arc::clone(def),
            alias_of: Some(entry.primary.clone()),
            description: entry.description.clone(),
        })
    }

    /// Whether a name or alias is registered.
    pub fn has(&self, name: &str) -> bool {
        self.defs.contains_key(name) || self.aliases.contains_key(name)
    }

    /// Enumerate definitions and aliases for UI.
    pub fn list(&self, include_hidden: bool) -> Vec<MacroListing> {
        let mut listings: Vec<MacroListing> = self
            .defs
            .values()
            .map(|def| MacroListing {
                name: def.name.clone(),
                alias_of: None,
                category: def.category.clone(),
                description: def.display_override.clone(),
                hidden: false,
                min_args: def.min_args(),
                max_args: def.max_args(),
                strict_args: def.strict_args,
                source: def.source,
            })
            .collect();
        for (alias, entry) in &self.aliases {
            if entry.hidden && !include_hidden {
                continue;
            }
            if let Some(def) = self.defs.get(&entry.primary) {
                listings.push(MacroListing {
                    name: alias.clone(),
                    alias_of: Some(entry.primary.clone()),
                    category: def.category.clone(),
                    description: entry.description.clone(),
                    hidden: entry.hidden,
                    min_args: def.min_args(),
                    max_args: def.max_args(),
                    strict_args: def.strict_args,
                    source: def.source,
                });
            }
        }
        listings.sort_by(|a, b| a.name.cmp(&b.name));
        listings
    }

    /// The primary name a candidate would collide with, if any.
    fn primary_for(&self, name: &str) -> Option<String> {
        if self.defs.contains_key(name) {
            return Some(name.to_string());
        }
        self.aliases.get(name).map(|entry| entry.primary.clone())
    }
}

static GLOBAL: Lazy<RwLock<Registry>> = Lazy::new(|| {
    let mut registry = Registry::new();
    builtins::install(&mut registry);
    RwLock::new(registry)
});

/// The process-wide registry, seeded with the builtin definitions on first
/// use. Mutation takes the write lock; evaluation takes the read lock.
pub fn global() -> &'static RwLock<Registry> {
    &GLOBAL
}

fn has_empty_union(ty: &ArgType) -> bool {
    match ty {
        ArgType::Union(members) => {
            members.is_empty() || members.iter().any(has_empty_union)
        }
        _ => false,
    }
}
