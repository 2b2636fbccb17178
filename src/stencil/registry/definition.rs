//! Definition records and the handler contract
//!
//! A [`Definition`] describes one invocation name: its argument schema, list
//! policy, strictness, presentation fields, and handler. Handlers receive a
//! [`MacroContext`] and return a [`HandlerOutcome`]; failure is a variant, not
//! an exception, and the dispatch layer matches on it.

use crate::stencil::cst::{Invocation, Span};
use crate::stencil::env::{DynamicMacro, Environment};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?[0-9]+$").expect("valid pattern"));

/// Argument type constraint, checked against the string value an argument
/// expands to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgType {
    String,
    Integer,
    Number,
    Boolean,
    /// Passes when any member passes.
    Union(Vec<ArgType>),
}

impl ArgType {
    /// Check a post-expansion string value against this type.
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            ArgType::String => true,
            ArgType::Integer => INTEGER.is_match(value),
            ArgType::Number => value.parse::<f64>().map(|n| n.is_finite()).unwrap_or(false),
            ArgType::Boolean => matches!(
                value.to_ascii_lowercase().as_str(),
                "true" | "false" | "1" | "0" | "yes" | "no"
            ),
            ArgType::Union(members) => members.iter().any(|member| member.accepts(value)),
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgType::String => write!(f, "string"),
            ArgType::Integer => write!(f, "integer"),
            ArgType::Number => write!(f, "number"),
            ArgType::Boolean => write!(f, "boolean"),
            ArgType::Union(members) => {
                let mut first = true;
                for member in members {
                    if !first {
                        write!(f, "|")?;
                    }
                    write!(f, "{}", member)?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

/// Descriptor for one positional argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    pub ty: ArgType,
    pub optional: bool,
    pub default_value: Option<String>,
    pub sample_value: Option<String>,
    pub description: Option<String>,
}

impl ArgSpec {
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: ArgType::String,
            optional: false,
            default_value: None,
            sample_value: None,
            description: None,
        }
    }

    pub fn optional(name: &str, default_value: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: ArgType::String,
            optional: true,
            default_value: Some(default_value.to_string()),
            sample_value: None,
            description: None,
        }
    }

    pub fn with_type(mut self, ty: ArgType) -> Self {
        self.ty = ty;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_sample(mut self, sample: &str) -> Self {
        self.sample_value = Some(sample.to_string());
        self
    }
}

/// Bounds of the trailing variadic tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSpec {
    pub min: usize,
    /// `None` means unbounded.
    pub max: Option<usize>,
}

/// Registration shorthand for the argument schema: a count of required
/// untyped arguments, or explicit descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgSchema {
    Count(usize),
    Specs(Vec<ArgSpec>),
}

impl ArgSchema {
    pub(crate) fn into_specs(self) -> Vec<ArgSpec> {
        match self {
            ArgSchema::Count(count) => (1..=count)
                .map(|index| ArgSpec::required(&format!("arg{index}")))
                .collect(),
            ArgSchema::Specs(specs) => specs,
        }
    }
}

impl From<usize> for ArgSchema {
    fn from(count: usize) -> Self {
        ArgSchema::Count(count)
    }
}

impl From<Vec<ArgSpec>> for ArgSchema {
    fn from(specs: Vec<ArgSpec>) -> Self {
        ArgSchema::Specs(specs)
    }
}

/// Registration shorthand for the list policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSchema {
    Absent,
    /// Equivalent to bounds `{min: 0, max: unbounded}`.
    Unbounded,
    Bounds { min: usize, max: Option<usize> },
}

impl From<bool> for ListSchema {
    fn from(enabled: bool) -> Self {
        if enabled {
            ListSchema::Unbounded
        } else {
            ListSchema::Absent
        }
    }
}

impl ListSchema {
    pub(crate) fn into_spec(self) -> Option<ListSpec> {
        match self {
            ListSchema::Absent => None,
            ListSchema::Unbounded => Some(ListSpec { min: 0, max: None }),
            ListSchema::Bounds { min, max } => Some(ListSpec { min, max }),
        }
    }
}

/// Grouping tag for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Utility,
    State,
    Random,
    Variable,
    Time,
    Names,
    Other(String),
}

/// Provenance of a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefinitionSource {
    Builtin,
    Extension,
    ThirdParty,
}

/// A secondary name resolving to the same definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasSpec {
    pub name: String,
    pub description: Option<String>,
    pub hidden: bool,
}

impl AliasSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            hidden: false,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

/// A value returned by a handler, prior to normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroValue {
    Null,
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl MacroValue {
    /// Normalize to the final output string: null becomes empty, timestamps
    /// become ISO-8601, structured values become JSON.
    pub fn normalize(&self) -> String {
        match self {
            MacroValue::Null => String::new(),
            MacroValue::Str(s) => s.clone(),
            MacroValue::Int(n) => n.to_string(),
            MacroValue::Float(n) => n.to_string(),
            MacroValue::Bool(b) => b.to_string(),
            MacroValue::Timestamp(t) => t.to_rfc3339(),
            MacroValue::Json(v) => serde_json::to_string(v).unwrap_or_else(|_| v.to_string()),
        }
    }
}

/// What a handler produced. Failure is data; the dispatch layer decides what
/// the document sees.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    Value(MacroValue),
    /// A user-facing problem: reported as a runtime warning, invocation kept
    /// raw.
    RuntimeError(String),
    /// A definition bug: reported as an internal error, invocation kept raw.
    InternalError(String),
}

impl HandlerOutcome {
    pub fn text(value: impl Into<String>) -> Self {
        HandlerOutcome::Value(MacroValue::Str(value.into()))
    }

    pub fn empty() -> Self {
        HandlerOutcome::Value(MacroValue::Str(String::new()))
    }
}

/// A runtime invocation, created by the walker immediately prior to dispatch.
#[derive(Debug)]
pub struct Call<'a> {
    pub name: String,
    /// Evaluated argument values, nested invocations already expanded.
    pub args: Vec<String>,
    /// The inner text with nested values substituted, separators and
    /// whitespace preserved.
    pub raw_inner: String,
    /// The original invocation bytes, braces included.
    pub raw_with_braces: String,
    pub range: Span,
    pub node: &'a Invocation,
    pub env: &'a Environment,
}

impl Call<'_> {
    /// The invocation with braces, nested values substituted. This is what
    /// "keep it raw" means everywhere in the engine: unknown and failed
    /// invocations are preserved, but their nested expansions stick.
    pub fn raw_preserved(&self) -> String {
        format!("{{{{{}}}}}", self.raw_inner)
    }
}

/// Everything a handler gets to see.
pub struct MacroContext<'c> {
    /// The fixed positional arguments, defaults applied.
    pub unnamed_args: &'c [String],
    /// The variadic tail.
    pub list: &'c [String],
    pub env: &'c Environment,
    pub call: &'c Call<'c>,
    pub range: Span,
}

/// The handler contract: a uniform call signature over the context.
pub type Handler = Box<dyn Fn(&MacroContext<'_>) -> HandlerOutcome + Send + Sync>;

/// The contract describing one invocation name.
pub struct Definition {
    pub name: String,
    pub aliases: Vec<AliasSpec>,
    pub category: Category,
    pub unnamed_arg_defs: Vec<ArgSpec>,
    pub list: Option<ListSpec>,
    pub strict_args: bool,
    pub returns: Option<String>,
    pub return_type: Option<String>,
    pub example_usage: Option<String>,
    pub display_override: Option<String>,
    pub handler: Handler,
    pub source: DefinitionSource,
}

impl Definition {
    /// Count of leading required positional arguments.
    pub fn min_args(&self) -> usize {
        self.unnamed_arg_defs
            .iter()
            .take_while(|spec| !spec.optional)
            .count()
    }

    /// Total count of positional arguments.
    pub fn max_args(&self) -> usize {
        self.unnamed_arg_defs.len()
    }

    /// A one-shot definition for a dynamic macro: strict arity zero, handler
    /// resolves the dynamic value.
    pub fn dynamic(name: &str, dynamic: &DynamicMacro) -> Self {
        let value = dynamic.clone();
        Definition {
            name: name.to_string(),
            aliases: Vec::new(),
            category: Category::Other("dynamic".to_string()),
            unnamed_arg_defs: Vec::new(),
            list: None,
            strict_args: true,
            returns: None,
            return_type: None,
            example_usage: None,
            display_override: None,
            handler: Box::new(move |_ctx| HandlerOutcome::text(value.resolve())),
            source: DefinitionSource::Extension,
        }
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("category", &self.category)
            .field("unnamed_arg_defs", &self.unnamed_arg_defs)
            .field("list", &self.list)
            .field("strict_args", &self.strict_args)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Registration options for one name. The handler is a constructor argument,
/// so a definition without one cannot be expressed.
pub struct MacroOptions {
    pub(crate) category: Category,
    pub(crate) unnamed_args: ArgSchema,
    pub(crate) list: ListSchema,
    pub(crate) strict_args: bool,
    pub(crate) aliases: Vec<AliasSpec>,
    pub(crate) returns: Option<String>,
    pub(crate) return_type: Option<String>,
    pub(crate) example_usage: Option<String>,
    pub(crate) display_override: Option<String>,
    pub(crate) source: DefinitionSource,
    pub(crate) handler: Handler,
}

impl MacroOptions {
    pub fn new(
        handler: impl Fn(&MacroContext<'_>) -> HandlerOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            category: Category::Utility,
            unnamed_args: ArgSchema::Specs(Vec::new()),
            list: ListSchema::Absent,
            strict_args: false,
            aliases: Vec::new(),
            returns: None,
            return_type: None,
            example_usage: None,
            display_override: None,
            source: DefinitionSource::Extension,
            handler: Box::new(handler),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_unnamed_args(mut self, schema: impl Into<ArgSchema>) -> Self {
        self.unnamed_args = schema.into();
        self
    }

    pub fn with_list(mut self, list: impl Into<ListSchema>) -> Self {
        self.list = list.into();
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict_args = true;
        self
    }

    pub fn with_alias(mut self, alias: AliasSpec) -> Self {
        self.aliases.push(alias);
        self
    }

    pub fn with_returns(mut self, returns: &str) -> Self {
        self.returns = Some(returns.to_string());
        self
    }

    pub fn with_return_type(mut self, return_type: &str) -> Self {
        self.return_type = Some(return_type.to_string());
        self
    }

    pub fn with_example(mut self, example: &str) -> Self {
        self.example_usage = Some(example.to_string());
        self
    }

    pub fn with_display(mut self, display: &str) -> Self {
        self.display_override = Some(display.to_string());
        self
    }

    pub fn with_source(mut self, source: DefinitionSource) -> Self {
        self.source = source;
        self
    }
}
