//! `SeaORM` backend for `modkit-criteria`.
//!
//! Provides operator-based [`SimpleFilterProvider`]s that produce
//! `sea_orm::Condition` predicates, and [`CriteriaSelectExt`] to apply a
//! compiled [`modkit_criteria::PersistentEntityCriteria`] (joins, `WHERE`,
//! `ORDER BY`, `OFFSET`/`LIMIT`) to a select. Nothing here touches a
//! connection; executing the query stays with the caller.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod coerce;
pub mod kind;
pub mod provider;
pub mod select;

pub use coerce::{coerce, coerce_at};
pub use kind::FieldKind;
pub use provider::{FilterOperator, SimpleFilterProvider, default_registry};
pub use select::{
    CriteriaSelectExt, JoinResolver, RelationMap, ResolvedJoin, SelectBuildError,
    apply_criteria_to,
};
