//! `{{placeholder}}` substitution for card templates
//!
//! Bindings map a placeholder name to an envelope field. A binding only
//! applies when its field is present; whatever is still unresolved after all
//! bindings ran is stripped. Matching is exact and case-sensitive, with no
//! recursive expansion.

use crate::engine::{Field, OutputEnvelope};
use regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{.*?\}\}").expect("placeholder pattern is valid"));

/// Placeholder name bound to an envelope field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub placeholder: &'static str,
    pub field: Field,
}

/// Shorthand for building a [`Binding`]
pub const fn bind(placeholder: &'static str, field: Field) -> Binding {
    Binding { placeholder, field }
}

/// The literal token for a placeholder name
pub fn token(placeholder: &str) -> String {
    format!("{{{{{}}}}}", placeholder)
}

/// Replace every `{{placeholder}}` with `value`
///
/// Returns whether the token occurred.
pub fn substitute(template: &mut String, placeholder: &str, value: &str) -> bool {
    let token = token(placeholder);
    if !template.contains(&token) {
        return false;
    }
    *template = template.replace(&token, value);
    true
}

/// Apply one binding; returns whether it substituted anything
pub fn apply_binding(
    template: &mut String,
    envelope: Option<&OutputEnvelope>,
    binding: Binding,
) -> bool {
    match envelope.and_then(|env| env.field(binding.field)) {
        Some(value) => substitute(template, binding.placeholder, &value),
        None => false,
    }
}

/// Remove every remaining `{{...}}` token
pub fn strip_unresolved(template: &str) -> String {
    PLACEHOLDER.replace_all(template, "").into_owned()
}

/// Apply `bindings` in order, then strip what is left
pub fn resolve(template: &str, envelope: Option<&OutputEnvelope>, bindings: &[Binding]) -> String {
    let mut rendered = template.to_string();
    for binding in bindings {
        apply_binding(&mut rendered, envelope, *binding);
    }
    strip_unresolved(&rendered)
}
