//! Pluggable predicate construction.
//!
//! A [`PropertyFilterCriterionProvider`] turns already-resolved filter values
//! into one engine-native predicate for one property. This is the extension
//! point that lets a property use exact match, like/contains, ranges, set
//! membership or any custom multi-value logic.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::join_tree::JoinNode;

/// Failure raised by a provider while building a predicate.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("expected {expected} value(s), got {got}")]
    ValueCount { expected: usize, got: usize },

    #[error("value at position {position} is not a valid {expected}: {got}")]
    TypeMismatch {
        position: usize,
        expected: String,
        got: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Strategy producing a predicate of type `P` for a single property.
///
/// Providers are shared across conversions (and threads) and must not keep
/// per-call mutable state. They only ever see resolved values, never the raw
/// value paths or the transfer object itself.
pub trait PropertyFilterCriterionProvider<P>: Send + Sync {
    /// Build the predicate for `target_property_name` evaluated at `node`.
    ///
    /// Returning `Ok(None)` contributes no predicate (e.g. all-blank input).
    ///
    /// # Errors
    /// Returns `ProviderError` when the resolved values cannot be turned into
    /// a predicate. The error aborts the conversion.
    fn build_criterion(
        &self,
        node: &JoinNode,
        target_property_name: &str,
        values: &[Value],
    ) -> Result<Option<P>, ProviderError>;
}

impl<P, F> PropertyFilterCriterionProvider<P> for F
where
    F: Fn(&JoinNode, &str, &[Value]) -> Result<Option<P>, ProviderError> + Send + Sync,
{
    fn build_criterion(
        &self,
        node: &JoinNode,
        target_property_name: &str,
        values: &[Value],
    ) -> Result<Option<P>, ProviderError> {
        self(node, target_property_name, values)
    }
}

/// Shared provider handle as stored in filter criteria.
pub type SharedProvider<P> = Arc<dyn PropertyFilterCriterionProvider<P>>;

/// Name → provider lookup used when materializing wire transfer objects.
///
/// Clients only ever reference providers by name, so the set of predicates a
/// remote caller can request is exactly what the host registered here.
#[must_use]
pub struct ProviderRegistry<P> {
    providers: HashMap<String, SharedProvider<P>>,
}

impl<P> Default for ProviderRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for ProviderRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            providers: self.providers.clone(),
        }
    }
}

impl<P> fmt::Debug for ProviderRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("ProviderRegistry")
            .field("providers", &names)
            .finish()
    }
}

impl<P> ProviderRegistry<P> {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Builder-style registration. A later registration under the same name
    /// replaces the earlier one.
    pub fn with<T>(mut self, name: impl Into<String>, provider: T) -> Self
    where
        T: PropertyFilterCriterionProvider<P> + 'static,
    {
        self.insert(name, Arc::new(provider));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, provider: SharedProvider<P>) {
        self.providers.insert(name.into(), provider);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<SharedProvider<P>> {
        self.providers.get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::join_tree::JoinTree;

    fn eq_provider(node: &JoinNode, prop: &str, values: &[Value]) -> Result<Option<String>, ProviderError> {
        match values {
            [Value::Null] => Ok(None),
            [v] => Ok(Some(format!("{}.{prop} = {v}", node.alias().unwrap_or("root")))),
            _ => Err(ProviderError::ValueCount {
                expected: 1,
                got: values.len(),
            }),
        }
    }

    #[test]
    fn closures_are_providers() {
        let tree = JoinTree::new();
        let provider: SharedProvider<String> = Arc::new(eq_provider);

        let built = provider
            .build_criterion(tree.root(), "age", &[Value::from(18)])
            .unwrap();
        assert_eq!(built.as_deref(), Some("root.age = 18"));

        let skipped = provider.build_criterion(tree.root(), "age", &[Value::Null]).unwrap();
        assert!(skipped.is_none());

        let err = provider.build_criterion(tree.root(), "age", &[]).unwrap_err();
        assert_eq!(err, ProviderError::ValueCount { expected: 1, got: 0 });
    }

    #[test]
    fn registry_lookup_by_name() {
        let registry = ProviderRegistry::<String>::new().with("eq", eq_provider);
        assert!(registry.contains("eq"));
        assert!(registry.get("eq").is_some());
        assert!(registry.get("like").is_none());
        assert_eq!(registry.len(), 1);
        assert!(format!("{registry:?}").contains("eq"));
    }
}
