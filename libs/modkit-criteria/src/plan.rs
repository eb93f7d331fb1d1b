//! Compiled query plan handed to the query-execution side.

use crate::join_tree::{JoinKindConflict, JoinNode, JoinNodeId, JoinTree};

/// One sort key of the plan, in order of precedence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ordering {
    pub node: JoinNodeId,
    pub property_name: String,
    pub ascending: bool,
}

/// Owned pieces of a [`PersistentEntityCriteria`], for consumers that move
/// predicates into their own query builder instead of cloning them.
#[derive(Clone, Debug)]
pub struct PlanParts<P> {
    pub join_tree: JoinTree,
    pub predicates: Vec<P>,
    pub orderings: Vec<Ordering>,
    pub first_result: Option<i32>,
    pub max_results: Option<i32>,
}

/// Output of a conversion: join tree, predicate conjunction, sort keys and
/// paging bounds.
///
/// Predicates are ANDed together in the order they appear. Paging bounds are
/// passed through unchanged; `None` means unbounded.
#[derive(Clone, Debug)]
pub struct PersistentEntityCriteria<P> {
    join_tree: JoinTree,
    predicates: Vec<P>,
    orderings: Vec<Ordering>,
    first_result: Option<i32>,
    max_results: Option<i32>,
}

impl<P> PersistentEntityCriteria<P> {
    pub(crate) fn new(
        join_tree: JoinTree,
        predicates: Vec<P>,
        orderings: Vec<Ordering>,
        first_result: Option<i32>,
        max_results: Option<i32>,
    ) -> Self {
        Self {
            join_tree,
            predicates,
            orderings,
            first_result,
            max_results,
        }
    }

    #[must_use]
    pub fn join_tree(&self) -> &JoinTree {
        &self.join_tree
    }

    #[must_use]
    pub fn node(&self, id: JoinNodeId) -> &JoinNode {
        &self.join_tree[id]
    }

    #[must_use]
    pub fn predicates(&self) -> &[P] {
        &self.predicates
    }

    #[must_use]
    pub fn orderings(&self) -> &[Ordering] {
        &self.orderings
    }

    #[must_use]
    pub fn first_result(&self) -> Option<i32> {
        self.first_result
    }

    #[must_use]
    pub fn max_results(&self) -> Option<i32> {
        self.max_results
    }

    /// Join-kind conflicts resolved by keeping the first-registered kind.
    #[must_use]
    pub fn join_conflicts(&self) -> &[JoinKindConflict] {
        self.join_tree.conflicts()
    }

    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.join_tree.has_no_joins()
            && self.predicates.is_empty()
            && self.orderings.is_empty()
            && self.first_result.is_none()
            && self.max_results.is_none()
    }

    #[must_use]
    pub fn into_parts(self) -> PlanParts<P> {
        PlanParts {
            join_tree: self.join_tree,
            predicates: self.predicates,
            orderings: self.orderings,
            first_result: self.first_result,
            max_results: self.max_results,
        }
    }
}
