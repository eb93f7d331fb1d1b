//! Deduplicated association join tree.
//!
//! Many criteria contribute association paths independently. The join tree
//! merges them so that each distinct chain of association *names* is joined
//! exactly once, no matter how many criteria go through it.

use std::collections::HashMap;
use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::association::{AssociationPath, AssociationPathElement, JoinKind};
use crate::error::{CriteriaError, CriteriaResult};

/// How the tree reacts when a path asks for a different join kind on an
/// association prefix that is already registered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinConflictPolicy {
    /// Keep the first-registered join kind and record a [`JoinKindConflict`].
    #[default]
    FirstWins,
    /// Abort with `CriteriaError::JoinKindConflict`.
    Reject,
}

/// Index of a node inside its [`JoinTree`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinNodeId(usize);

impl JoinNodeId {
    pub const ROOT: JoinNodeId = JoinNodeId(0);

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One join of the plan; the root node stands for the queried entity.
#[derive(Clone, Debug)]
pub struct JoinNode {
    id: JoinNodeId,
    parent: Option<JoinNodeId>,
    // Effective path: names of the prefix plus the join kinds that won.
    path: AssociationPath,
    alias: Option<String>,
    children: Vec<JoinNodeId>,
}

impl JoinNode {
    #[must_use]
    pub fn id(&self) -> JoinNodeId {
        self.id
    }

    #[must_use]
    pub fn parent(&self) -> Option<JoinNodeId> {
        self.parent
    }

    #[must_use]
    pub fn path(&self) -> &AssociationPath {
        &self.path
    }

    /// Name of the association this node joins, `None` for the root.
    #[must_use]
    pub fn association_name(&self) -> Option<&str> {
        self.path.last().map(AssociationPathElement::name)
    }

    /// Effective join kind of this node, `None` for the root.
    #[must_use]
    pub fn join_kind(&self) -> Option<JoinKind> {
        self.path.last().map(AssociationPathElement::join_kind)
    }

    /// Deterministic, SQL-safe alias (`<association>_<id>`); `None` for the root.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    #[must_use]
    pub fn children(&self) -> &[JoinNodeId] {
        &self.children
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

/// Diagnostic recorded when the first-wins policy overrode a requested join kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoinKindConflict {
    pub path: String,
    pub registered: JoinKind,
    pub requested: JoinKind,
}

impl fmt::Display for JoinKindConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "association `{}` requested {} join but is already joined as {}",
            self.path, self.requested, self.registered
        )
    }
}

/// Arena of join nodes in creation order; index 0 is always the root.
#[derive(Clone, Debug)]
pub struct JoinTree {
    nodes: Vec<JoinNode>,
    by_names: HashMap<Vec<String>, JoinNodeId>,
    conflicts: Vec<JoinKindConflict>,
}

impl Default for JoinTree {
    fn default() -> Self {
        Self::new()
    }
}

impl JoinTree {
    #[must_use]
    pub fn new() -> Self {
        let root = JoinNode {
            id: JoinNodeId::ROOT,
            parent: None,
            path: AssociationPath::root(),
            alias: None,
            children: Vec::new(),
        };
        let mut by_names = HashMap::new();
        by_names.insert(Vec::new(), JoinNodeId::ROOT);
        Self {
            nodes: vec![root],
            by_names,
            conflicts: Vec::new(),
        }
    }

    /// Register `path` and return the node its target property lives on.
    ///
    /// Every prefix of the path maps to exactly one node; existing nodes are
    /// reused. A differing join kind on an existing prefix is handled by
    /// `policy`.
    ///
    /// # Errors
    /// Returns `CriteriaError::JoinKindConflict` under [`JoinConflictPolicy::Reject`].
    pub fn register(
        &mut self,
        path: &AssociationPath,
        policy: JoinConflictPolicy,
    ) -> CriteriaResult<JoinNodeId> {
        let mut current = JoinNodeId::ROOT;
        let mut names: Vec<String> = Vec::with_capacity(path.len());

        for element in path.elements() {
            names.push(element.name().to_owned());

            if let Some(&existing) = self.by_names.get(&names) {
                let registered = self.nodes[existing.0]
                    .join_kind()
                    .unwrap_or_default();
                if registered != element.join_kind() {
                    self.on_conflict(&names, registered, element.join_kind(), policy)?;
                }
                current = existing;
                continue;
            }

            current = self.push_child(current, element.clone(), names.clone());
        }

        Ok(current)
    }

    fn on_conflict(
        &mut self,
        names: &[String],
        registered: JoinKind,
        requested: JoinKind,
        policy: JoinConflictPolicy,
    ) -> CriteriaResult<()> {
        let path = names.join(".");
        match policy {
            JoinConflictPolicy::Reject => Err(CriteriaError::JoinKindConflict {
                path,
                registered,
                requested,
            }),
            JoinConflictPolicy::FirstWins => {
                tracing::warn!(
                    association = %path,
                    %registered,
                    %requested,
                    "join kind conflict: keeping first-registered join kind"
                );
                self.conflicts.push(JoinKindConflict {
                    path,
                    registered,
                    requested,
                });
                Ok(())
            }
        }
    }

    fn push_child(
        &mut self,
        parent: JoinNodeId,
        element: AssociationPathElement,
        names: Vec<String>,
    ) -> JoinNodeId {
        let id = JoinNodeId(self.nodes.len());
        let alias = format!("{}_{}", element.name(), id.0);
        let path = self.nodes[parent.0].path.append(element);

        tracing::trace!(association = %path, alias = %alias, "registering join");

        self.nodes.push(JoinNode {
            id,
            parent: Some(parent),
            path,
            alias: Some(alias),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        self.by_names.insert(names, id);
        id
    }

    #[must_use]
    pub fn root(&self) -> &JoinNode {
        &self.nodes[0]
    }

    /// # Panics
    /// Panics if `id` was not issued by this tree.
    #[must_use]
    pub fn node(&self, id: JoinNodeId) -> &JoinNode {
        &self.nodes[id.0]
    }

    #[must_use]
    pub fn get(&self, id: JoinNodeId) -> Option<&JoinNode> {
        self.nodes.get(id.0)
    }

    /// Node lookup by association names, ignoring join kinds.
    #[must_use]
    pub fn find(&self, path: &AssociationPath) -> Option<&JoinNode> {
        let names: Vec<String> = path.names().map(str::to_owned).collect();
        self.by_names.get(&names).map(|id| &self.nodes[id.0])
    }

    /// All nodes in creation order, root first.
    pub fn iter(&self) -> impl Iterator<Item = &JoinNode> {
        self.nodes.iter()
    }

    /// All nodes except the root, in creation order. A parent always precedes
    /// its children.
    pub fn joins(&self) -> impl Iterator<Item = &JoinNode> {
        self.nodes.iter().skip(1)
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when nothing but the root has been registered.
    #[must_use]
    pub fn has_no_joins(&self) -> bool {
        self.nodes.len() == 1
    }

    #[must_use]
    pub fn conflicts(&self) -> &[JoinKindConflict] {
        &self.conflicts
    }
}

impl Index<JoinNodeId> for JoinTree {
    type Output = JoinNode;

    fn index(&self, id: JoinNodeId) -> &Self::Output {
        self.node(id)
    }
}
