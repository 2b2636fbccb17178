//! Evaluation environment
//!
//!     The environment is the record threaded through one top-level
//!     evaluation: names, system info, character data, dynamic inline
//!     definitions, helper functions, and free-form provider scratch. It is
//!     built once per `evaluate` call by the [builder](builder) provider
//!     chain and passed by shared reference to every handler.
//!
//!     Handlers treat the environment as immutable. The two deliberate
//!     exceptions use interior mutability: the per-evaluation variable store
//!     (the `setvar`/`getvar` builtins) and the one-shot `original` helper.
//!     Handlers that mutate anything else observe undefined ordering relative
//!     to sibling invocations.

pub mod builder;

pub use builder::{EnvBuilder, ProviderBucket, RawEnv};

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Participant names resolved for this evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Names {
    pub user: String,
    pub char_name: String,
    pub group: String,
    pub group_not_muted: String,
    pub not_char: String,
}

/// System info exposed to handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInfo {
    pub model: String,
}

/// Character card fields, populated only when the builder context asks for
/// character replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterFields {
    pub char_prompt: String,
    pub char_instruction: String,
    pub description: String,
    pub personality: String,
    pub scenario: String,
    pub persona: String,
    pub mes_examples_raw: String,
    pub version: String,
    pub char_depth_prompt: String,
    pub creator_notes: String,
}

/// An ad-hoc per-evaluation definition: a fixed value or a zero-arg closure.
///
/// Dynamic macros override registry definitions for the duration of one
/// evaluation and have strict arity zero.
#[derive(Clone)]
pub enum DynamicMacro {
    Value(String),
    Fn(Arc<dyn Fn() -> String + Send + Sync>),
}

impl DynamicMacro {
    pub fn resolve(&self) -> String {
        match self {
            DynamicMacro::Value(value) => value.clone(),
            DynamicMacro::Fn(f) => f(),
        }
    }
}

impl fmt::Debug for DynamicMacro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicMacro::Value(value) => f.debug_tuple("Value").field(value).finish(),
            DynamicMacro::Fn(_) => f.debug_tuple("Fn").field(&"<closure>").finish(),
        }
    }
}

/// A fallible transformation applied to every resolved macro value.
pub type PostProcessFn = Arc<dyn Fn(&str) -> Result<String, String> + Send + Sync>;

/// Helper functions carried by the environment.
pub struct EnvFunctions {
    /// Applied to each successfully executed macro value. Failures are logged
    /// as internal errors and the value is used unchanged.
    pub post_process: Option<PostProcessFn>,
    original: Mutex<Option<String>>,
}

impl EnvFunctions {
    pub fn new(post_process: Option<PostProcessFn>, original: Option<String>) -> Self {
        Self {
            post_process,
            original: Mutex::new(original),
        }
    }

    /// The one-shot original text: the seeded string on first call, empty on
    /// every subsequent call within the same environment.
    pub fn take_original(&self) -> String {
        self.original
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default()
    }
}

impl Default for EnvFunctions {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl fmt::Debug for EnvFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvFunctions")
            .field("post_process", &self.post_process.as_ref().map(|_| "<fn>"))
            .finish_non_exhaustive()
    }
}

/// The evaluation environment.
#[derive(Debug, Default)]
pub struct Environment {
    /// The original input text of this evaluation.
    pub content: String,
    pub content_hash: u64,
    pub names: Names,
    pub character: Option<CharacterFields>,
    pub system: SystemInfo,
    /// Per-evaluation definitions overriding the registry.
    pub dynamic_macros: HashMap<String, DynamicMacro>,
    pub functions: EnvFunctions,
    variables: Mutex<HashMap<String, String>>,
    /// Free-form provider scratch.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Environment {
    /// Read a variable from the per-evaluation store.
    pub fn get_variable(&self, name: &str) -> Option<String> {
        self.variables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Write a variable into the per-evaluation store.
    pub fn set_variable(&self, name: &str, value: &str) {
        self.variables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), value.to_string());
    }
}
