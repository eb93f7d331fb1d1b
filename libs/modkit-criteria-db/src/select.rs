//! Applying a compiled criteria plan to `SeaORM` / `sea_query` selects.
//!
//! The plan only knows association names. A [`JoinResolver`] maps every join
//! node to a concrete table and ON condition; [`RelationMap`] is the
//! table-driven resolver most callers need.

use std::collections::HashMap;

use modkit_criteria::{JoinKind, JoinNode, PersistentEntityCriteria};
use sea_orm::sea_query::{Alias, Expr, JoinType, Order, SelectStatement};
use sea_orm::{Condition, EntityTrait, QueryTrait};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectBuildError {
    #[error("invalid paging: {field} must not be negative, got {value}")]
    InvalidPaging { field: &'static str, value: i32 },

    #[error("no relation registered for association '{0}'")]
    UnresolvedJoin(String),
}

/// Table and ON condition for one join step.
#[derive(Clone, Debug)]
pub struct ResolvedJoin {
    pub table: String,
    pub on: Condition,
}

/// Maps join-tree nodes onto the physical schema.
pub trait JoinResolver {
    /// Table the plan's root entity is selected from.
    fn root_table(&self) -> &str;

    /// Resolve the join for `node`.
    ///
    /// `parent_qualifier` is the alias of the parent node, or the root table
    /// for first-level joins. The ON condition must reference the node by its
    /// alias. Returning `None` fails the build with
    /// [`SelectBuildError::UnresolvedJoin`].
    fn resolve_join(&self, node: &JoinNode, parent_qualifier: &str) -> Option<ResolvedJoin>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct RelationStep {
    table: String,
    parent_column: String,
    column: String,
}

/// Equi-join relations keyed by dotted association path.
///
/// ```
/// use modkit_criteria_db::RelationMap;
///
/// let relations = RelationMap::new("person")
///     .with("department", "department", "department_id", "id")
///     .with("department.manager", "person", "manager_id", "id");
/// # let _ = relations;
/// ```
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct RelationMap {
    root_table: String,
    steps: HashMap<String, RelationStep>,
}

impl RelationMap {
    pub fn new(root_table: impl Into<String>) -> Self {
        Self {
            root_table: root_table.into(),
            steps: HashMap::new(),
        }
    }

    /// Register `parent.parent_column = table.column` for `path`.
    pub fn with(
        mut self,
        path: impl Into<String>,
        table: impl Into<String>,
        parent_column: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        self.steps.insert(
            path.into(),
            RelationStep {
                table: table.into(),
                parent_column: parent_column.into(),
                column: column.into(),
            },
        );
        self
    }
}

impl JoinResolver for RelationMap {
    fn root_table(&self) -> &str {
        &self.root_table
    }

    fn resolve_join(&self, node: &JoinNode, parent_qualifier: &str) -> Option<ResolvedJoin> {
        let alias = node.alias()?;
        let key = node.path().names().collect::<Vec<_>>().join(".");
        let step = self.steps.get(&key)?;
        let on = Condition::all().add(
            Expr::col((Alias::new(parent_qualifier), Alias::new(&step.parent_column)))
                .equals((Alias::new(alias), Alias::new(&step.column))),
        );
        Some(ResolvedJoin {
            table: step.table.clone(),
            on,
        })
    }
}

fn join_type(kind: JoinKind) -> JoinType {
    match kind {
        JoinKind::Inner => JoinType::InnerJoin,
        JoinKind::LeftOuter => JoinType::LeftJoin,
        JoinKind::RightOuter => JoinType::RightJoin,
        JoinKind::Full => JoinType::FullOuterJoin,
    }
}

fn paging(field: &'static str, value: Option<i32>) -> Result<Option<u64>, SelectBuildError> {
    value
        .map(|v| u64::try_from(v).map_err(|_| SelectBuildError::InvalidPaging { field, value: v }))
        .transpose()
}

/// Apply joins, predicates, orderings and paging of `plan` to `stmt`.
///
/// Paging is checked before `stmt` is touched. An unresolved join leaves
/// `stmt` partially modified.
///
/// # Errors
/// Returns `SelectBuildError::InvalidPaging` for negative paging bounds and
/// `SelectBuildError::UnresolvedJoin` when `resolver` does not know a join.
pub fn apply_criteria_to(
    stmt: &mut SelectStatement,
    plan: &PersistentEntityCriteria<Condition>,
    resolver: &dyn JoinResolver,
) -> Result<(), SelectBuildError> {
    let offset = paging("firstResult", plan.first_result())?;
    let limit = paging("maxResults", plan.max_results())?;

    let tree = plan.join_tree();
    let qualifier = |node: &JoinNode| -> String {
        node.alias()
            .unwrap_or_else(|| resolver.root_table())
            .to_owned()
    };

    for node in tree.joins() {
        let parent = node
            .parent()
            .map_or_else(|| resolver.root_table().to_owned(), |id| qualifier(&tree[id]));
        let resolved = resolver
            .resolve_join(node, &parent)
            .ok_or_else(|| SelectBuildError::UnresolvedJoin(node.path().to_string()))?;
        let kind = node.join_kind().unwrap_or_default();
        let alias = qualifier(node);

        tracing::trace!(table = %resolved.table, alias = %alias, %kind, "applying join");
        stmt.join_as(
            join_type(kind),
            Alias::new(resolved.table),
            Alias::new(alias),
            resolved.on,
        );
    }

    if !plan.predicates().is_empty() {
        let all = plan
            .predicates()
            .iter()
            .cloned()
            .fold(Condition::all(), Condition::add);
        stmt.cond_where(all);
    }

    for ordering in plan.orderings() {
        let table = qualifier(&tree[ordering.node]);
        let order = if ordering.ascending {
            Order::Asc
        } else {
            Order::Desc
        };
        stmt.order_by(
            (Alias::new(table), Alias::new(&ordering.property_name)),
            order,
        );
    }

    if let Some(offset) = offset {
        stmt.offset(offset);
    }
    if let Some(limit) = limit {
        stmt.limit(limit);
    }

    tracing::debug!(
        joins = tree.joins().count(),
        predicates = plan.predicates().len(),
        orderings = plan.orderings().len(),
        "criteria applied to select"
    );
    Ok(())
}

/// Apply a compiled criteria plan to a select.
pub trait CriteriaSelectExt: Sized {
    /// # Errors
    /// See [`apply_criteria_to`].
    fn apply_criteria(
        self,
        plan: &PersistentEntityCriteria<Condition>,
        resolver: &dyn JoinResolver,
    ) -> Result<Self, SelectBuildError>;
}

impl CriteriaSelectExt for SelectStatement {
    fn apply_criteria(
        mut self,
        plan: &PersistentEntityCriteria<Condition>,
        resolver: &dyn JoinResolver,
    ) -> Result<Self, SelectBuildError> {
        apply_criteria_to(&mut self, plan, resolver)?;
        Ok(self)
    }
}

impl<E> CriteriaSelectExt for sea_orm::Select<E>
where
    E: EntityTrait,
{
    fn apply_criteria(
        mut self,
        plan: &PersistentEntityCriteria<Condition>,
        resolver: &dyn JoinResolver,
    ) -> Result<Self, SelectBuildError> {
        apply_criteria_to(QueryTrait::query(&mut self), plan, resolver)?;
        Ok(self)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn negative_paging_is_rejected() {
        assert_eq!(paging("firstResult", Some(5)), Ok(Some(5)));
        assert_eq!(paging("firstResult", None), Ok(None));
        assert_eq!(
            paging("maxResults", Some(-1)),
            Err(SelectBuildError::InvalidPaging {
                field: "maxResults",
                value: -1
            })
        );
    }

    #[test]
    fn join_kinds_map_onto_sql_join_types() {
        assert_eq!(join_type(JoinKind::Inner), JoinType::InnerJoin);
        assert_eq!(join_type(JoinKind::LeftOuter), JoinType::LeftJoin);
        assert_eq!(join_type(JoinKind::RightOuter), JoinType::RightJoin);
        assert_eq!(join_type(JoinKind::Full), JoinType::FullOuterJoin);
    }
}
