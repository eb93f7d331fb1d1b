//! Mapping from criteria errors to Problem (pure data)
//!
//! Transport layers add instance paths and trace IDs on top of the baseline
//! Problem built here.

use modkit_errors::{ErrDef, Problem, ValidationViolation};

use crate::error::CriteriaError;

/// Error catalog of the criteria library.
pub mod catalog {
    use modkit_errors::ErrDef;

    pub const INVALID_CRITERIA: ErrDef = ErrDef {
        status: 422,
        title: "Invalid Criteria",
        code: "gts.hx.core.errors.err.v1~hx.criteria.invalid_criteria.v1",
        type_url: "https://errors.example.com/gts.hx.core.errors.err.v1~hx.criteria.invalid_criteria.v1",
    };

    pub const INVALID_FILTER_VALUE: ErrDef = ErrDef {
        status: 422,
        title: "Invalid Filter Value",
        code: "gts.hx.core.errors.err.v1~hx.criteria.invalid_filter_value.v1",
        type_url: "https://errors.example.com/gts.hx.core.errors.err.v1~hx.criteria.invalid_filter_value.v1",
    };

    pub const INTERNAL: ErrDef = ErrDef {
        status: 500,
        title: "Internal Error",
        code: "gts.hx.core.errors.err.v1~hx.criteria.internal.v1",
        type_url: "https://errors.example.com/gts.hx.core.errors.err.v1~hx.criteria.internal.v1",
    };
}

impl CriteriaError {
    /// Catalog entry this error maps to.
    #[must_use]
    pub fn err_def(&self) -> ErrDef {
        match self {
            CriteriaError::Provider { .. } => catalog::INVALID_FILTER_VALUE,
            CriteriaError::Config(_) => catalog::INTERNAL,
            _ => catalog::INVALID_CRITERIA,
        }
    }
}

impl From<CriteriaError> for Problem {
    fn from(err: CriteriaError) -> Self {
        let def = err.err_def();
        match err {
            // Host misconfiguration must not leak into client responses
            CriteriaError::Config(_) => {
                def.as_problem("An internal error occurred while preparing the query criteria")
            }

            CriteriaError::Provider {
                ref property_id,
                ref source,
                ..
            } => {
                let violation = ValidationViolation::new(property_id.as_str(), source.to_string());
                def.as_problem(err.to_string()).with_violation(violation)
            }

            CriteriaError::DuplicatePropertyId(ref id)
            | CriteriaError::SortAlreadyAssigned(ref id) => {
                let violation = ValidationViolation::new(id.as_str(), err.to_string());
                def.as_problem(err.to_string()).with_violation(violation)
            }

            CriteriaError::InvalidCriterion {
                ref property_id,
                ref reason,
            } => {
                let violation = ValidationViolation::new(property_id.as_str(), reason.as_str());
                def.as_problem(err.to_string()).with_violation(violation)
            }

            _ => def.as_problem(err.to_string()),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use http::StatusCode;

    #[test]
    fn configuration_errors_map_to_invalid_criteria() {
        let problem: Problem = CriteriaError::UnknownProvider("regex".to_owned()).into();
        assert_eq!(problem.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(problem.title, "Invalid Criteria");
        assert!(problem.code.contains("invalid_criteria"));
        assert!(problem.detail.contains("regex"));
        assert!(problem.errors.is_none());
    }

    #[test]
    fn provider_errors_map_to_invalid_filter_value() {
        let err = CriteriaError::Provider {
            property_id: "age".to_owned(),
            property: "age".to_owned(),
            source: ProviderError::ValueCount { expected: 2, got: 1 },
        };
        let problem: Problem = err.into();
        assert_eq!(problem.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(problem.code.contains("invalid_filter_value"));

        let errors = problem.errors.unwrap();
        assert_eq!(errors[0].field, "age");
        assert_eq!(errors[0].message, "expected 2 value(s), got 1");
    }

    #[test]
    fn invalid_criterion_names_the_property_id() {
        let problem: Problem = CriteriaError::InvalidCriterion {
            property_id: "dept".to_owned(),
            reason: "missing target".to_owned(),
        }
        .into();
        assert_eq!(problem.errors.unwrap()[0].field, "dept");
    }

    #[test]
    fn config_errors_hide_details() {
        let problem: Problem = CriteriaError::Config("secret path /etc/x".to_owned()).into();
        assert_eq!(problem.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!problem.detail.contains("/etc/x"));
        assert!(problem.code.contains("internal"));
    }
}
