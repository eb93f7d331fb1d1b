//! Input validation and safety limits for criteria transfer objects
//!
//! Transfer objects may come straight from remote clients, so the converter
//! caps how much work a single one can request:
//! - Maximum number of `propertyId` entries
//! - Maximum number of filter criteria overall
//! - Maximum number of sort keys
//! - Maximum association depth of any criterion

use serde::{Deserialize, Serialize};

use crate::association::AssociationPath;
use crate::cto::CriteriaTransferObject;
use crate::error::{CriteriaError, CriteriaResult};

/// Default configuration for criteria limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CriteriaLimits {
    /// Maximum number of `propertyId` entries (default: 64)
    pub max_entries: usize,
    /// Maximum number of filter criteria across all entries (default: 128)
    pub max_filter_criteria: usize,
    /// Maximum number of sort criteria (default: 8)
    pub max_sort_keys: usize,
    /// Maximum number of association steps in one path (default: 8)
    pub max_association_depth: usize,
}

impl Default for CriteriaLimits {
    fn default() -> Self {
        Self {
            max_entries: 64,
            max_filter_criteria: 128,
            max_sort_keys: 8,
            max_association_depth: 8,
        }
    }
}

impl CriteriaLimits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// No caps at all. Intended for trusted, in-process callers.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            max_entries: usize::MAX,
            max_filter_criteria: usize::MAX,
            max_sort_keys: usize::MAX,
            max_association_depth: usize::MAX,
        }
    }

    #[must_use]
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    #[must_use]
    pub fn with_max_filter_criteria(mut self, max: usize) -> Self {
        self.max_filter_criteria = max;
        self
    }

    #[must_use]
    pub fn with_max_sort_keys(mut self, max: usize) -> Self {
        self.max_sort_keys = max;
        self
    }

    #[must_use]
    pub fn with_max_association_depth(mut self, max: usize) -> Self {
        self.max_association_depth = max;
        self
    }

    /// Validate the depth of one association path
    ///
    /// # Errors
    /// Returns `CriteriaError::LimitExceeded` if the path is too deep.
    pub fn validate_path(&self, path: &AssociationPath) -> CriteriaResult<()> {
        check("association depth", self.max_association_depth, path.len())
    }

    /// Validate the overall shape of a transfer object
    ///
    /// # Errors
    /// Returns `CriteriaError::LimitExceeded` naming the first limit hit.
    pub fn validate_transfer_object<P>(&self, cto: &CriteriaTransferObject<P>) -> CriteriaResult<()> {
        check("propertyId entries", self.max_entries, cto.len())?;

        let filters: usize = cto.iter().map(|e| e.filter_criteria().len()).sum();
        check("filter criteria", self.max_filter_criteria, filters)?;

        let sorts = cto.iter().filter(|e| e.is_sort_assigned()).count();
        check("sort keys", self.max_sort_keys, sorts)?;

        for entry in cto.iter() {
            for criterion in entry.criteria() {
                self.validate_path(criterion.target().association_path())?;
            }
        }
        Ok(())
    }
}

fn check(what: &'static str, max: usize, got: usize) -> CriteriaResult<()> {
    if got > max {
        return Err(CriteriaError::LimitExceeded { what, max, got });
    }
    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::criterion::{PropertyPath, SortCriterion};
    use crate::association::JoinKind;

    #[test]
    fn test_default_limits() {
        let limits = CriteriaLimits::default();
        assert_eq!(limits.max_entries, 64);
        assert_eq!(limits.max_filter_criteria, 128);
        assert_eq!(limits.max_sort_keys, 8);
        assert_eq!(limits.max_association_depth, 8);
    }

    #[test]
    fn test_validate_path_depth() {
        let limits = CriteriaLimits::new().with_max_association_depth(2);
        assert!(limits.validate_path(&AssociationPath::parse("a.b").unwrap()).is_ok());

        let err = limits
            .validate_path(&AssociationPath::parse("a.b.c").unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            CriteriaError::LimitExceeded { max: 2, got: 3, .. }
        ));
    }

    #[test]
    fn test_validate_sort_keys() {
        let mut cto = CriteriaTransferObject::<()>::new();
        for id in ["a", "b"] {
            cto.get_or_create(id)
                .set_sort_criterion(SortCriterion::ascending(PropertyPath::direct(id).unwrap()))
                .unwrap();
        }

        assert!(CriteriaLimits::default().validate_transfer_object(&cto).is_ok());
        let err = CriteriaLimits::new()
            .with_max_sort_keys(1)
            .validate_transfer_object(&cto)
            .unwrap_err();
        assert!(matches!(err, CriteriaError::LimitExceeded { what: "sort keys", .. }));
    }

    #[test]
    fn test_validate_entries_and_nested_sort_depth() {
        let mut cto = CriteriaTransferObject::<()>::new();
        cto.get_or_create("deep")
            .set_sort_criterion(SortCriterion::ascending(
                PropertyPath::parse("a.b.c.name", JoinKind::Inner).unwrap(),
            ))
            .unwrap();
        cto.get_or_create("other");

        let err = CriteriaLimits::new()
            .with_max_entries(1)
            .validate_transfer_object(&cto)
            .unwrap_err();
        assert!(matches!(err, CriteriaError::LimitExceeded { what: "propertyId entries", .. }));

        let err = CriteriaLimits::new()
            .with_max_association_depth(2)
            .validate_transfer_object(&cto)
            .unwrap_err();
        assert!(matches!(err, CriteriaError::LimitExceeded { what: "association depth", .. }));

        assert!(CriteriaLimits::unbounded().validate_transfer_object(&cto).is_ok());
    }

    #[test]
    fn test_limits_deserialize_with_defaults() {
        let limits: CriteriaLimits = serde_json::from_str(r#"{"max_sort_keys": 2}"#).unwrap();
        assert_eq!(limits.max_sort_keys, 2);
        assert_eq!(limits.max_entries, 64);

        let bad: Result<CriteriaLimits, _> = serde_json::from_str(r#"{"max_top": 2}"#);
        assert!(bad.is_err());
    }
}
