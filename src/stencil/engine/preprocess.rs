//! Required pre-processors
//!
//! Legacy rewrites that run over the raw text before lexing. Offsets
//! everywhere downstream refer to the rewritten text, never the original.

use once_cell::sync::Lazy;
use regex::Regex;

static UTC_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{time_UTC([+-]\d+)\}\}").expect("valid pattern"));

static USER_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<user>").expect("valid pattern"));

static CHAR_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(?:bot|char)>").expect("valid pattern"));

static GROUP_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(?:group|charifnotgroup)>").expect("valid pattern"));

/// Rewrite the legacy `{{time_UTC±N}}` spelling to `{{time::UTC±N}}`.
pub fn rewrite_utc_time(input: &str) -> String {
    UTC_TIME.replace_all(input, "{{time::UTC$1}}").into_owned()
}

/// Rewrite the case-insensitive bare markers `<USER>`, `<BOT>`, `<CHAR>`,
/// `<GROUP>`, `<CHARIFNOTGROUP>` to their invocation forms.
///
/// `<CHARIFNOTGROUP>` maps to `{{group}}`: in solo mode the group name
/// resolves to the char name, which is exactly "char if not group".
pub fn rewrite_bare_markers(input: &str) -> String {
    let output = USER_MARKER.replace_all(input, "{{user}}");
    let output = CHAR_MARKER.replace_all(&output, "{{char}}");
    GROUP_MARKER.replace_all(&output, "{{group}}").into_owned()
}
