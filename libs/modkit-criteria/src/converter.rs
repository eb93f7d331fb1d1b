//! Compiles a [`CriteriaTransferObject`] into a [`PersistentEntityCriteria`].

use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, trace};

use crate::criterion::{FilterCriterion, PersistentEntityCriterion};
use crate::cto::CriteriaTransferObject;
use crate::error::{CriteriaError, CriteriaResult};
use crate::join_tree::{JoinConflictPolicy, JoinNodeId, JoinTree};
use crate::limits::CriteriaLimits;
use crate::plan::{Ordering, PersistentEntityCriteria};
use crate::resolve::{FilterObject, resolve_values};

/// Converter configuration, typically loaded from the host's config tree.
///
/// ```yaml
/// criteria:
///   join_conflict_policy: reject
///   limits:
///     max_sort_keys: 4
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterOptions {
    pub join_conflict_policy: JoinConflictPolicy,
    pub limits: CriteriaLimits,
}

impl ConverterOptions {
    /// Extract options stored under `key`. A missing key yields the defaults.
    ///
    /// # Errors
    /// Returns `CriteriaError::Config` if the section is present but malformed.
    pub fn from_figment(figment: &Figment, key: &str) -> CriteriaResult<Self> {
        if !figment.contains(key) {
            return Ok(Self::default());
        }
        figment
            .extract_inner::<Self>(key)
            .map_err(|e| CriteriaError::Config(format!("`{key}`: {e}")))
    }

    #[must_use]
    pub fn with_join_conflict_policy(mut self, policy: JoinConflictPolicy) -> Self {
        self.join_conflict_policy = policy;
        self
    }

    #[must_use]
    pub fn with_limits(mut self, limits: CriteriaLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Stateless compiler from transfer objects to query plans.
///
/// Conversion never mutates its inputs and keeps no cache, so one converter
/// can be shared freely between threads.
#[derive(Debug, Clone, Default)]
pub struct CriteriaTransferObjectConverter {
    options: ConverterOptions,
}

impl CriteriaTransferObjectConverter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(options: ConverterOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Compile `cto` into a plan, resolving filter-object paths against
    /// `filter_object`.
    ///
    /// Joins are registered for every criterion (CTO insertion order, filters
    /// before the sort inside an entry) before any provider runs. Predicates
    /// and sort keys follow the same order. Paging bounds are copied as is.
    ///
    /// # Errors
    /// Any configuration or provider error aborts the conversion; no partial
    /// plan is returned.
    pub fn convert<P, F>(
        &self,
        cto: &CriteriaTransferObject<P>,
        filter_object: &F,
    ) -> CriteriaResult<PersistentEntityCriteria<P>>
    where
        F: FilterObject + ?Sized,
    {
        let span = debug_span!("criteria_convert", entries = cto.len());
        let _guard = span.enter();

        self.options.limits.validate_transfer_object(cto)?;

        let mut join_tree = JoinTree::new();
        let mut filters: Vec<(&str, &FilterCriterion<P>, JoinNodeId)> = Vec::new();
        let mut sorts: Vec<Ordering> = Vec::new();

        for entry in cto.iter() {
            for criterion in entry.criteria() {
                let node = join_tree.register(
                    criterion.target().association_path(),
                    self.options.join_conflict_policy,
                )?;
                match criterion {
                    PersistentEntityCriterion::Filter(filter) => {
                        filters.push((entry.property_id(), filter, node));
                    }
                    PersistentEntityCriterion::Sort(sort) => sorts.push(Ordering {
                        node,
                        property_name: sort.target().target_property_name().to_owned(),
                        ascending: sort.is_ascending(),
                    }),
                }
            }
        }

        let mut predicates = Vec::with_capacity(filters.len());
        for (property_id, filter, node) in filters {
            let values = resolve_values(filter, filter_object)?;
            let built = filter
                .provider()
                .build_criterion(&join_tree[node], filter.target_property_name(), &values)
                .map_err(|source| CriteriaError::Provider {
                    property_id: property_id.to_owned(),
                    property: filter.target().to_string(),
                    source,
                })?;

            if let Some(predicate) = built {
                predicates.push(predicate);
            } else {
                trace!(
                    property_id,
                    property = %filter.target(),
                    "provider contributed no predicate"
                );
            }
        }

        debug!(
            joins = join_tree.len() - 1,
            predicates = predicates.len(),
            orderings = sorts.len(),
            conflicts = join_tree.conflicts().len(),
            "criteria converted"
        );

        Ok(PersistentEntityCriteria::new(
            join_tree,
            predicates,
            sorts,
            cto.first_result(),
            cto.max_results(),
        ))
    }
}
