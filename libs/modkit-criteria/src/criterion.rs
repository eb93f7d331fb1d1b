//! Filter and sort criteria for properties of the queried entity.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::association::{AssociationPath, AssociationPathElement, JoinKind, validate_segment};
use crate::error::{CriteriaError, CriteriaResult};
use crate::provider::{PropertyFilterCriterionProvider, SharedProvider};

/// Normalized address of a target property: the association path leading to
/// the owning entity plus the property name on it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    association_path: AssociationPath,
    target_property_name: String,
}

impl PropertyPath {
    /// # Errors
    /// Returns `CriteriaError::InvalidPropertyPath` if the property name is not
    /// a valid single segment.
    pub fn new(
        association_path: AssociationPath,
        target_property_name: impl Into<String>,
    ) -> CriteriaResult<Self> {
        let target_property_name = target_property_name.into();
        validate_segment(&target_property_name).map_err(|reason| {
            CriteriaError::InvalidPropertyPath {
                path: target_property_name.clone(),
                reason,
            }
        })?;
        Ok(Self {
            association_path,
            target_property_name,
        })
    }

    /// A property of the root entity.
    ///
    /// # Errors
    /// Same as [`PropertyPath::new`].
    pub fn direct(target_property_name: impl Into<String>) -> CriteriaResult<Self> {
        Self::new(AssociationPath::root(), target_property_name)
    }

    /// Normalize the flattened `propertyPath` form (`"department.manager.name"`).
    ///
    /// Every segment before the last one becomes an association step joined
    /// with `join_kind`; the last segment is the target property.
    ///
    /// # Errors
    /// Returns `CriteriaError::InvalidPropertyPath` for empty input or empty
    /// segments.
    pub fn parse(property_path: &str, join_kind: JoinKind) -> CriteriaResult<Self> {
        let invalid = |reason| CriteriaError::InvalidPropertyPath {
            path: property_path.to_owned(),
            reason,
        };

        let (associations, target) = match property_path.rsplit_once('.') {
            Some((associations, target)) => (Some(associations), target),
            None => (None, property_path),
        };
        validate_segment(target).map_err(invalid)?;

        let association_path = match associations {
            None => AssociationPath::root(),
            Some(chain) => chain
                .split('.')
                .map(|name| {
                    validate_segment(name)
                        .map_err(invalid)
                        .and_then(|()| AssociationPathElement::new(name, join_kind))
                })
                .collect::<CriteriaResult<AssociationPath>>()?,
        };

        Ok(Self {
            association_path,
            target_property_name: target.to_owned(),
        })
    }

    #[must_use]
    pub fn association_path(&self) -> &AssociationPath {
        &self.association_path
    }

    #[must_use]
    pub fn target_property_name(&self) -> &str {
        &self.target_property_name
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.association_path.is_root() {
            write!(f, "{}", self.target_property_name)
        } else {
            write!(f, "{}.{}", self.association_path, self.target_property_name)
        }
    }
}

/// Filter on one property, fed from filter-object paths and/or direct values.
///
/// Resolved values reach the provider in a fixed order: every
/// filter-object-path value first (path order), then every direct value
/// (array order). Positional providers such as ranges rely on it.
pub struct FilterCriterion<P> {
    target: PropertyPath,
    filter_object_value_paths: Option<Vec<String>>,
    direct_values: Option<Vec<Value>>,
    provider: SharedProvider<P>,
}

impl<P> FilterCriterion<P> {
    #[must_use]
    pub fn new(
        target: PropertyPath,
        filter_object_value_paths: Option<Vec<String>>,
        direct_values: Option<Vec<Value>>,
        provider: SharedProvider<P>,
    ) -> Self {
        Self {
            target,
            filter_object_value_paths,
            direct_values,
            provider,
        }
    }

    /// Single literal value.
    #[must_use]
    pub fn with_direct_value(
        target: PropertyPath,
        value: impl Into<Value>,
        provider: SharedProvider<P>,
    ) -> Self {
        Self::new(target, None, Some(vec![value.into()]), provider)
    }

    /// Single value read from the filter object.
    #[must_use]
    pub fn with_filter_object_path(
        target: PropertyPath,
        path: impl Into<String>,
        provider: SharedProvider<P>,
    ) -> Self {
        Self::new(target, Some(vec![path.into()]), None, provider)
    }

    /// Single value that is either a filter-object path or a literal,
    /// depending on `use_filter_object_path_resolution`.
    ///
    /// # Errors
    /// Returns `CriteriaError::InvalidCriterion` when path resolution is
    /// requested but `value` is not a string.
    pub fn with_value(
        target: PropertyPath,
        value: Value,
        use_filter_object_path_resolution: bool,
        provider: SharedProvider<P>,
    ) -> CriteriaResult<Self> {
        if !use_filter_object_path_resolution {
            return Ok(Self::with_direct_value(target, value, provider));
        }
        let Some(path) = value.as_str() else {
            return Err(CriteriaError::InvalidCriterion {
                property_id: target.to_string(),
                reason: format!("filter object path must be a string, got {value}"),
            });
        };
        Ok(Self::with_filter_object_path(target, path, provider))
    }

    /// No value sources at all; the provider builds its predicate from the
    /// property alone (e.g. IS NOT NULL).
    #[must_use]
    pub fn without_values(target: PropertyPath, provider: SharedProvider<P>) -> Self {
        Self::new(target, None, None, provider)
    }

    /// Convenience for providers that are not yet behind an `Arc`.
    #[must_use]
    pub fn from_provider<T>(
        target: PropertyPath,
        filter_object_value_paths: Option<Vec<String>>,
        direct_values: Option<Vec<Value>>,
        provider: T,
    ) -> Self
    where
        T: PropertyFilterCriterionProvider<P> + 'static,
    {
        Self::new(target, filter_object_value_paths, direct_values, Arc::new(provider))
    }

    #[must_use]
    pub fn target(&self) -> &PropertyPath {
        &self.target
    }

    #[must_use]
    pub fn association_path(&self) -> &AssociationPath {
        self.target.association_path()
    }

    #[must_use]
    pub fn target_property_name(&self) -> &str {
        self.target.target_property_name()
    }

    #[must_use]
    pub fn filter_object_value_paths(&self) -> Option<&[String]> {
        self.filter_object_value_paths.as_deref()
    }

    #[must_use]
    pub fn direct_values(&self) -> Option<&[Value]> {
        self.direct_values.as_deref()
    }

    #[must_use]
    pub fn provider(&self) -> &dyn PropertyFilterCriterionProvider<P> {
        self.provider.as_ref()
    }
}

impl<P> Clone for FilterCriterion<P> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
            filter_object_value_paths: self.filter_object_value_paths.clone(),
            direct_values: self.direct_values.clone(),
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P> fmt::Debug for FilterCriterion<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterCriterion")
            .field("target", &self.target)
            .field("filter_object_value_paths", &self.filter_object_value_paths)
            .field("direct_values", &self.direct_values)
            .finish_non_exhaustive()
    }
}

/// Sort on one property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SortCriterion {
    target: PropertyPath,
    ascending: bool,
}

impl SortCriterion {
    #[must_use]
    pub fn new(target: PropertyPath, ascending: bool) -> Self {
        Self { target, ascending }
    }

    #[must_use]
    pub fn ascending(target: PropertyPath) -> Self {
        Self::new(target, true)
    }

    #[must_use]
    pub fn descending(target: PropertyPath) -> Self {
        Self::new(target, false)
    }

    #[must_use]
    pub fn target(&self) -> &PropertyPath {
        &self.target
    }

    #[must_use]
    pub fn is_ascending(&self) -> bool {
        self.ascending
    }
}

/// Any criterion that addresses an entity property.
pub enum PersistentEntityCriterion<'a, P> {
    Filter(&'a FilterCriterion<P>),
    Sort(&'a SortCriterion),
}

impl<'a, P> PersistentEntityCriterion<'a, P> {
    #[must_use]
    pub fn target(&self) -> &'a PropertyPath {
        match self {
            PersistentEntityCriterion::Filter(c) => c.target(),
            PersistentEntityCriterion::Sort(c) => c.target(),
        }
    }
}

impl<P> Clone for PersistentEntityCriterion<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for PersistentEntityCriterion<'_, P> {}

impl<P> fmt::Debug for PersistentEntityCriterion<'_, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistentEntityCriterion::Filter(c) => f.debug_tuple("Filter").field(c).finish(),
            PersistentEntityCriterion::Sort(c) => f.debug_tuple("Sort").field(c).finish(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::join_tree::JoinNode;
    use crate::provider::ProviderError;

    fn noop(_: &JoinNode, _: &str, _: &[Value]) -> Result<Option<()>, ProviderError> {
        Ok(None)
    }

    fn noop_provider() -> SharedProvider<()> {
        Arc::new(noop)
    }

    #[test]
    fn legacy_property_path_is_normalized() {
        let path = PropertyPath::parse("department.manager.name", JoinKind::LeftOuter).unwrap();
        assert_eq!(path.target_property_name(), "name");
        assert_eq!(path.association_path().to_string(), "department.manager");
        assert!(path
            .association_path()
            .elements()
            .iter()
            .all(|e| e.join_kind() == JoinKind::LeftOuter));

        let explicit = PropertyPath::new(
            AssociationPath::parse_with("department.manager", JoinKind::LeftOuter).unwrap(),
            "name",
        )
        .unwrap();
        assert_eq!(path, explicit);
        assert_eq!(path.to_string(), "department.manager.name");
    }

    #[test]
    fn direct_property_has_root_path() {
        let path = PropertyPath::parse("age", JoinKind::Inner).unwrap();
        assert!(path.association_path().is_root());
        assert_eq!(path, PropertyPath::direct("age").unwrap());
    }

    #[test]
    fn malformed_property_paths_are_rejected() {
        for bad in ["", "department.", ".name", "a..b"] {
            assert!(
                matches!(
                    PropertyPath::parse(bad, JoinKind::Inner),
                    Err(CriteriaError::InvalidPropertyPath { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn single_value_constructor_picks_the_source() {
        let target = PropertyPath::direct("name").unwrap();
        let by_path =
            FilterCriterion::with_value(target.clone(), Value::from("person.name"), true, noop_provider())
                .unwrap();
        assert_eq!(by_path.filter_object_value_paths(), Some(&["person.name".to_owned()][..]));
        assert!(by_path.direct_values().is_none());

        let literal = FilterCriterion::with_value(target.clone(), Value::from(5), false, noop_provider()).unwrap();
        assert!(literal.filter_object_value_paths().is_none());
        assert_eq!(literal.direct_values(), Some(&[Value::from(5)][..]));

        assert!(FilterCriterion::with_value(target, Value::from(5), true, noop_provider()).is_err());
    }

    #[test]
    fn criterion_variants_expose_their_target() {
        let filter = FilterCriterion::without_values(PropertyPath::direct("age").unwrap(), noop_provider());
        let sort = SortCriterion::descending(PropertyPath::parse("department.name", JoinKind::Inner).unwrap());

        let criteria = [
            PersistentEntityCriterion::Filter(&filter),
            PersistentEntityCriterion::Sort(&sort),
        ];
        let targets: Vec<String> = criteria.iter().map(|c| c.target().to_string()).collect();
        assert_eq!(targets, vec!["age", "department.name"]);
        assert!(!sort.is_ascending());
    }
}
