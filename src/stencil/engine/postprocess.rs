//! Required post-processors
//!
//! Transformations applied to the walked output, in order: escape unescaping
//! first, then trim-context removal. The order matters to authors who escape
//! a literal `{{trim}}`: the unescaped form is subject to trim removal, which
//! matches the legacy behavior.

use once_cell::sync::Lazy;
use regex::Regex;

static TRIM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\r?\n)*\{\{trim\}\}(?:\r?\n)*").expect("valid pattern"));

/// Turn `\{` and `\}` back into literal braces.
pub fn unescape_braces(input: &str) -> String {
    input.replace(r"\{", "{").replace(r"\}", "}")
}

/// Remove every `{{trim}}` marker together with the newline runs immediately
/// surrounding it on both sides.
pub fn collapse_trim(input: &str) -> String {
    TRIM.replace_all(input, "").into_owned()
}
