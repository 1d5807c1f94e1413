//! Concept identity resolution.
//!
//! Every place that turns an extracted name into a store key goes through an
//! [`IdentityResolver`], so a fuzzy or alias-aware strategy can replace
//! [`ExactNameResolver`] without touching validation or merge code.

/// Maps an extracted concept name to the key it is stored under.
pub trait IdentityResolver: Send + Sync {
    /// Resolve `name` to a concept key. `None` means the name has no identity
    /// (blank) and the concept must not be merged.
    fn resolve(&self, name: &str) -> Option<String>;
}

/// Exact, case-sensitive name identity. `"Cell"` and `"cell"` are distinct.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactNameResolver;

impl IdentityResolver for ExactNameResolver {
    fn resolve(&self, name: &str) -> Option<String> {
        concept_key(name).map(str::to_string)
    }
}

/// The exact-match concept key for `name`, or `None` for blank names.
#[must_use]
pub fn concept_key(name: &str) -> Option<&str> {
    if name.trim().is_empty() {
        None
    } else {
        Some(name)
    }
}
