//! Template substitution — a pure string transform.
//!
//! Tokens look like `$Name` or `$global.path.to.leaf`.  Recognized tokens
//! are replaced with their value; everything else passes through untouched,
//! so a missing variable is fail-soft, never an error.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::vars::{lookup_path, GLOBAL_PREFIX};

/// `$` followed by ASCII letters, digits, underscores, or dots, optionally
/// prefixed `global.`.  The class is spelled out because `\w` in this crate
/// is Unicode-aware; token names are ASCII only (labels are sanitized to
/// ASCII alphanumerics), so a token must end at the first non-ASCII char.
fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(r"\$((?:global\.)?[0-9A-Za-z_.]+)").expect("valid token pattern")
    })
}

/// Substitute variable tokens in `text`.
///
/// - `$global.path` resolves against `globals` with safe nested lookup and
///   substitutes only string/number/bool leaves, written in canonical
///   string form.  Missing paths and object/array leaves leave the token
///   text unmodified.
/// - Bare `$name` resolves against `locals`; unknown names pass through.
/// - Empty input short-circuits to empty output.
pub fn substitute(text: &str, locals: &HashMap<String, String>, globals: &Value) -> String {
    if text.is_empty() {
        return String::new();
    }

    token_regex()
        .replace_all(text, |caps: &Captures<'_>| {
            let token = &caps[1];
            if let Some(path) = token.strip_prefix(GLOBAL_PREFIX) {
                match lookup_path(globals, path) {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    Some(Value::Bool(b)) => b.to_string(),
                    // Objects, arrays, null, and missing paths all fall
                    // through to the original token text.
                    _ => caps[0].to_string(),
                }
            } else {
                match locals.get(token) {
                    Some(value) => value.clone(),
                    None => caps[0].to_string(),
                }
            }
        })
        .into_owned()
}
