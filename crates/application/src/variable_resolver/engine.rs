//! Variable resolution engine
//!
//! Resolves `{{expr}}` placeholders against precedence-ordered groups.
//! A group's own values may only reference that group and lower-precedence
//! groups; recursion stops one level short of re-entering a token that is
//! already being expanded.

use std::collections::{HashMap, HashSet};

use relay_domain::environment::{FlatScope, VariableScope, VariableScopes};

use super::parser::{has_placeholders, parse_placeholders};

/// Options for a resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpolationOptions {
    /// Escape substituted values for use inside JSON string literals.
    ///
    /// Values that are themselves JSON objects or arrays are inserted verbatim.
    pub escape_json_strings: bool,
}

impl InterpolationOptions {
    /// Options used for JSON bodies.
    #[must_use]
    pub const fn json() -> Self {
        Self {
            escape_json_strings: true,
        }
    }
}

/// Result of resolving one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    /// The resolved string.
    pub resolved: String,

    /// Expressions that were left verbatim, in order of first appearance.
    pub unresolved: Vec<String>,
}

impl ResolutionResult {
    /// Creates a result for input that needed no work.
    #[must_use]
    pub fn unchanged(input: &str) -> Self {
        Self {
            resolved: input.to_string(),
            unresolved: Vec::new(),
        }
    }

    /// Whether every placeholder was substituted.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Per-call memo and cycle guard, shared by every match of one top-level call.
#[derive(Default)]
struct Pass {
    memo: HashMap<String, String>,
    visited: HashSet<String>,
    unresolved: Vec<String>,
}

/// Resolver over a snapshot of the variable groups.
///
/// Flattening happens once in `new`, so one resolver can be reused for every
/// field of a request.
pub struct VariableResolver {
    groups: Vec<(VariableScope, FlatScope)>,
}

impl VariableResolver {
    /// Flattens `scopes` into precedence-ordered groups, skipping empty ones.
    #[must_use]
    pub fn new(scopes: &VariableScopes) -> Self {
        let groups = scopes
            .flattened_groups()
            .into_iter()
            .filter(|(_, flat)| !flat.is_empty())
            .collect();
        Self { groups }
    }

    /// Returns true when no group holds a variable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Resolves `template` with default options.
    #[must_use]
    pub fn resolve(&self, template: &str) -> String {
        self.resolve_detailed(template, InterpolationOptions::default())
            .resolved
    }

    /// Resolves `template`, reporting unresolved expressions.
    #[must_use]
    pub fn resolve_detailed(
        &self,
        template: &str,
        options: InterpolationOptions,
    ) -> ResolutionResult {
        if template.is_empty() || self.groups.is_empty() || !has_placeholders(template) {
            return ResolutionResult::unchanged(template);
        }

        let all: Vec<usize> = (0..self.groups.len()).collect();
        let mut pass = Pass::default();
        let resolved = self.replace(template, &all, &mut pass, options.escape_json_strings);

        ResolutionResult {
            resolved,
            unresolved: pass.unresolved,
        }
    }

    /// Index of the highest-precedence group in `subset` holding `expr`.
    fn owner(&self, subset: &[usize], expr: &str) -> Option<usize> {
        subset
            .iter()
            .rev()
            .copied()
            .find(|&g| self.groups[g].1.contains_key(expr))
    }

    fn replace(&self, text: &str, subset: &[usize], pass: &mut Pass, escape: bool) -> String {
        let placeholders = parse_placeholders(text);
        if placeholders.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut last = 0;

        for placeholder in placeholders {
            out.push_str(&text[last..placeholder.span.start]);
            last = placeholder.span.end;

            let Some(owner) = self.owner(subset, &placeholder.expr) else {
                if !pass.unresolved.contains(&placeholder.expr) {
                    pass.unresolved.push(placeholder.expr.clone());
                }
                out.push_str(&text[placeholder.span]);
                continue;
            };

            // Owner plus every lower group the caller could already see.
            let relevant: Vec<usize> = subset.iter().copied().filter(|&g| g <= owner).collect();
            let value = &self.groups[owner].1[&placeholder.expr];
            let token = placeholder.token();

            let substituted = if !has_placeholders(value) {
                value.clone()
            } else if let Some(memoized) = pass.memo.get(&token) {
                memoized.clone()
            } else if pass.visited.contains(&token) {
                value.clone()
            } else {
                pass.visited.insert(token.clone());
                let expanded = self.replace(value, &relevant, pass, false);
                pass.memo.insert(token, expanded.clone());
                expanded
            };

            if escape {
                out.push_str(&escape_json_fragment(&substituted));
            } else {
                out.push_str(&substituted);
            }
        }

        out.push_str(&text[last..]);
        out
    }
}

/// Escapes `value` for a JSON string literal unless it is a JSON container.
fn escape_json_fragment(value: &str) -> String {
    let trimmed = value.trim_start();
    let is_container = (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(value).is_ok();
    if is_container {
        return value.to_string();
    }
    let quoted = serde_json::Value::String(value.to_string()).to_string();
    quoted[1..quoted.len() - 1].to_string()
}

/// Resolves every placeholder in `template` against `scopes`.
///
/// Returns the input unchanged if it is empty, has no placeholders or no
/// group holds any variable. Never fails; unknown placeholders stay verbatim.
#[must_use]
pub fn interpolate(template: &str, scopes: &VariableScopes) -> String {
    interpolate_with(template, scopes, InterpolationOptions::default())
}

/// [`interpolate`] with explicit options.
#[must_use]
pub fn interpolate_with(
    template: &str,
    scopes: &VariableScopes,
    options: InterpolationOptions,
) -> String {
    if template.is_empty() || !has_placeholders(template) {
        return template.to_string();
    }
    VariableResolver::new(scopes)
        .resolve_detailed(template, options)
        .resolved
}

/// [`interpolate`] for optional input; `None` stays `None`.
#[must_use]
pub fn interpolate_opt(template: Option<&str>, scopes: &VariableScopes) -> Option<String> {
    template.map(|t| interpolate(t, scopes))
}

/// Expressions in `template` that would be left unresolved.
#[must_use]
pub fn find_unresolved(template: &str, scopes: &VariableScopes) -> Vec<String> {
    VariableResolver::new(scopes)
        .resolve_detailed(template, InterpolationOptions::default())
        .unresolved
}
