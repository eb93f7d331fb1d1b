//! Criteria resolution engine
//!
//! A client describes what to filter and sort on with a flat, map-based
//! [`CriteriaTransferObject`]: per logical `propertyId`, any number of
//! [`FilterCriterion`]s plus at most one [`SortCriterion`], each addressing a
//! property through an [`AssociationPath`]. The
//! [`CriteriaTransferObjectConverter`] compiles it into a
//! [`PersistentEntityCriteria`] plan: a deduplicated [`JoinTree`], a
//! conjunction of predicates, ordered sort keys and paging bounds.
//!
//! The library never executes queries. Predicates are built by pluggable
//! [`PropertyFilterCriterionProvider`]s, so the core is generic over the
//! predicate type `P` of whatever query engine consumes the plan.
//!
//! ```
//! use std::sync::Arc;
//! use modkit_criteria::{
//!     CriteriaTransferObject, CriteriaTransferObjectConverter, FilterCriterion, JoinKind,
//!     JoinNode, PropertyPath, ProviderError, SharedProvider,
//! };
//! use serde_json::{json, Value};
//!
//! fn at_least(node: &JoinNode, prop: &str, values: &[Value]) -> Result<Option<String>, ProviderError> {
//!     let table = node.alias().unwrap_or("root");
//!     Ok(values.first().map(|v| format!("{table}.{prop} >= {v}")))
//! }
//!
//! let provider: SharedProvider<String> = Arc::new(at_least);
//! let mut cto = CriteriaTransferObject::new();
//! cto.get_or_create("age").add_filter_criterion(FilterCriterion::with_filter_object_path(
//!     PropertyPath::parse("age", JoinKind::Inner)?,
//!     "search.minAge",
//!     provider,
//! ));
//!
//! let plan = CriteriaTransferObjectConverter::new()
//!     .convert(&cto, &json!({ "search": { "minAge": 18 } }))?;
//! assert_eq!(plan.predicates(), ["root.age >= 18".to_owned()]);
//! # Ok::<(), modkit_criteria::CriteriaError>(())
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod association;
pub mod converter;
pub mod criterion;
pub mod cto;
pub mod error;
pub mod join_tree;
pub mod limits;
pub mod plan;
pub mod problem_mapping;
pub mod provider;
pub mod resolve;
pub mod wire;

pub use association::{AssociationPath, AssociationPathElement, JoinKind};
pub use converter::{ConverterOptions, CriteriaTransferObjectConverter};
pub use criterion::{FilterCriterion, PersistentEntityCriterion, PropertyPath, SortCriterion};
pub use cto::{CriteriaTransferObject, FilterAndSortCriteria};
pub use error::{CriteriaError, CriteriaResult};
pub use join_tree::{JoinConflictPolicy, JoinKindConflict, JoinNode, JoinNodeId, JoinTree};
pub use limits::CriteriaLimits;
pub use plan::{Ordering, PersistentEntityCriteria, PlanParts};
pub use provider::{
    PropertyFilterCriterionProvider, ProviderError, ProviderRegistry, SharedProvider,
};
pub use resolve::{FilterObject, NoFilterObject, to_filter_object};
pub use wire::{
    CriteriaEntriesDto, CriteriaTransferObjectDto, FilterAndSortCriteriaDto, FilterCriterionDto,
    PropertyTargetDto, SortCriterionDto,
};
