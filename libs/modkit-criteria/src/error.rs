//! Unified error type for criteria building and conversion.

use crate::association::JoinKind;
use crate::provider::ProviderError;

/// Unified error type for all criteria operations
///
/// Everything except [`CriteriaError::Provider`] is a configuration error: the
/// transfer object (or the code that assembled it) describes something that
/// cannot be compiled. Any error aborts the whole conversion; no partial plan
/// is ever handed out.
///
/// ## HTTP Mapping
///
/// These errors map to RFC 9457 Problem responses (see `problem_mapping`):
/// - configuration errors caused by client input → 422 `invalid_criteria`
/// - `Provider` → 422 `invalid_filter_value`
/// - `Config` → 500 `internal`
#[derive(thiserror::Error, Debug, Clone)]
pub enum CriteriaError {
    #[error("invalid association path: {0}")]
    InvalidAssociationPath(String),

    #[error("invalid property path `{path}`: {reason}")]
    InvalidPropertyPath { path: String, reason: &'static str },

    #[error("duplicate propertyId: {0}")]
    DuplicatePropertyId(String),

    #[error("sort criterion already assigned for propertyId: {0}")]
    SortAlreadyAssigned(String),

    #[error(
        "conflicting join kinds for association `{path}`: registered {registered}, requested {requested}"
    )]
    JoinKindConflict {
        path: String,
        registered: JoinKind,
        requested: JoinKind,
    },

    #[error("unknown filter object path: {0}")]
    UnknownFilterObjectPath(String),

    #[error("unknown filter criterion provider: {0}")]
    UnknownProvider(String),

    #[error("invalid criterion for propertyId {property_id}: {reason}")]
    InvalidCriterion { property_id: String, reason: String },

    #[error("criteria limit exceeded: {what} (max {max}, got {got})")]
    LimitExceeded {
        what: &'static str,
        max: usize,
        got: usize,
    },

    #[error("provider failed for `{property}` (propertyId {property_id}): {source}")]
    Provider {
        property_id: String,
        property: String,
        #[source]
        source: ProviderError,
    },

    // Host-side configuration (figment extraction etc.)
    #[error("invalid criteria configuration: {0}")]
    Config(String),
}

impl CriteriaError {
    /// `true` for every error caused by a malformed description rather than by
    /// a provider failing on resolved values.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, CriteriaError::Provider { .. })
    }
}

pub type CriteriaResult<T> = Result<T, CriteriaError>;
