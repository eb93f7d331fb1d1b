//! Association paths: the navigational address of a property relative to the
//! root entity of a query.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CriteriaError, CriteriaResult};

/// Join strategy used when traversing one association step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    /// Default join kind when none is specified.
    #[default]
    Inner,
    LeftOuter,
    RightOuter,
    Full,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Inner => write!(f, "inner"),
            JoinKind::LeftOuter => write!(f, "left_outer"),
            JoinKind::RightOuter => write!(f, "right_outer"),
            JoinKind::Full => write!(f, "full"),
        }
    }
}

/// Checks a single path segment (association step or target property name).
pub(crate) fn validate_segment(segment: &str) -> Result<(), &'static str> {
    if segment.is_empty() {
        return Err("empty segment");
    }
    if segment.contains('.') {
        return Err("segment contains '.'");
    }
    if segment.trim() != segment {
        return Err("segment has surrounding whitespace");
    }
    Ok(())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElement {
    name: String,
    #[serde(default)]
    join_kind: JoinKind,
}

/// One `(associationName, joinKind)` step of an [`AssociationPath`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawElement")]
pub struct AssociationPathElement {
    name: String,
    join_kind: JoinKind,
}

impl AssociationPathElement {
    /// Create a step with an explicit join kind.
    ///
    /// # Errors
    /// Returns `CriteriaError::InvalidAssociationPath` if the name is empty,
    /// contains a dot or carries surrounding whitespace.
    pub fn new(name: impl Into<String>, join_kind: JoinKind) -> CriteriaResult<Self> {
        let name = name.into();
        validate_segment(&name)
            .map_err(|reason| CriteriaError::InvalidAssociationPath(format!("`{name}`: {reason}")))?;
        Ok(Self { name, join_kind })
    }

    /// Create a step using the default join kind.
    ///
    /// # Errors
    /// Same as [`AssociationPathElement::new`].
    pub fn named(name: impl Into<String>) -> CriteriaResult<Self> {
        Self::new(name, JoinKind::default())
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn join_kind(&self) -> JoinKind {
        self.join_kind
    }
}

impl TryFrom<RawElement> for AssociationPathElement {
    type Error = CriteriaError;

    fn try_from(raw: RawElement) -> Result<Self, Self::Error> {
        Self::new(raw.name, raw.join_kind)
    }
}

/// Ordered sequence of association steps from the query root.
///
/// Equality is structural: two paths are equal only when both the step names
/// and the join kinds match position by position. The empty path addresses
/// the root entity itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssociationPath(Vec<AssociationPathElement>);

impl AssociationPath {
    /// The empty path (properties of the root entity).
    pub const ROOT: AssociationPath = AssociationPath(Vec::new());

    #[must_use]
    pub fn root() -> Self {
        Self::ROOT
    }

    #[must_use]
    pub fn new(elements: Vec<AssociationPathElement>) -> Self {
        Self(elements)
    }

    /// Parse a dot-separated association chain using the default join kind.
    ///
    /// An empty string yields the root path.
    ///
    /// # Errors
    /// Returns `CriteriaError::InvalidAssociationPath` if any segment is invalid.
    pub fn parse(dotted: &str) -> CriteriaResult<Self> {
        Self::parse_with(dotted, JoinKind::default())
    }

    /// Parse a dot-separated association chain, using `join_kind` for every step.
    ///
    /// # Errors
    /// Returns `CriteriaError::InvalidAssociationPath` if any segment is invalid.
    pub fn parse_with(dotted: &str, join_kind: JoinKind) -> CriteriaResult<Self> {
        if dotted.is_empty() {
            return Ok(Self::root());
        }
        dotted
            .split('.')
            .map(|name| AssociationPathElement::new(name, join_kind))
            .collect::<CriteriaResult<Vec<_>>>()
            .map(Self)
    }

    /// Return a new path extended by one step.
    #[must_use]
    pub fn append(&self, element: AssociationPathElement) -> Self {
        let mut elements = Vec::with_capacity(self.0.len() + 1);
        elements.extend_from_slice(&self.0);
        elements.push(element);
        Self(elements)
    }

    /// Return a new path made of `self` followed by all steps of `other`.
    #[must_use]
    pub fn concat(&self, other: &AssociationPath) -> Self {
        let mut elements = Vec::with_capacity(self.0.len() + other.0.len());
        elements.extend_from_slice(&self.0);
        elements.extend_from_slice(&other.0);
        Self(elements)
    }

    /// The first `len` steps of this path (saturating).
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }

    #[must_use]
    pub fn elements(&self) -> &[AssociationPathElement] {
        &self.0
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(AssociationPathElement::name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&AssociationPathElement> {
        self.0.last()
    }
}

impl fmt::Display for AssociationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        let names: Vec<&str> = self.names().collect();
        write!(f, "{}", names.join("."))
    }
}

impl FromIterator<AssociationPathElement> for AssociationPath {
    fn from_iter<I: IntoIterator<Item = AssociationPathElement>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn parse_uses_default_join_kind() {
        let path = AssociationPath::parse("department.manager").unwrap();
        assert_eq!(path.len(), 2);
        assert!(path.elements().iter().all(|e| e.join_kind() == JoinKind::Inner));
        assert_eq!(path.to_string(), "department.manager");
    }

    #[test]
    fn empty_string_is_root() {
        let path = AssociationPath::parse("").unwrap();
        assert!(path.is_root());
        assert_eq!(path, AssociationPath::ROOT);
        assert_eq!(path.to_string(), "<root>");
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(matches!(
            AssociationPath::parse("department..manager"),
            Err(CriteriaError::InvalidAssociationPath(_))
        ));
        assert!(AssociationPathElement::named(" department").is_err());
        assert!(AssociationPathElement::named("a.b").is_err());
    }

    #[test]
    fn equality_includes_join_kinds() {
        let inner = AssociationPath::parse_with("department", JoinKind::Inner).unwrap();
        let outer = AssociationPath::parse_with("department", JoinKind::LeftOuter).unwrap();
        assert_ne!(inner, outer);
        assert!(inner.names().eq(outer.names()));
    }

    #[test]
    fn append_and_prefix() {
        let base = AssociationPath::parse("department").unwrap();
        let longer = base.append(AssociationPathElement::new("manager", JoinKind::LeftOuter).unwrap());
        assert_eq!(longer.len(), 2);
        assert_eq!(base.len(), 1);
        assert_eq!(longer.prefix(1), base);
        assert_eq!(longer.prefix(10), longer);
        assert_eq!(longer.last().map(AssociationPathElement::join_kind), Some(JoinKind::LeftOuter));

        let joined = base.concat(&AssociationPath::parse("manager.office").unwrap());
        assert_eq!(joined.to_string(), "department.manager.office");
    }

    #[test]
    fn serde_shape_and_validation() {
        let path: AssociationPath = serde_json::from_str(
            r#"[{"name":"department"},{"name":"manager","joinKind":"left_outer"}]"#,
        )
        .unwrap();
        assert_eq!(path.elements()[0].join_kind(), JoinKind::Inner);
        assert_eq!(path.elements()[1].join_kind(), JoinKind::LeftOuter);

        let json = serde_json::to_value(&path).unwrap();
        assert_eq!(json[1]["joinKind"], "left_outer");

        let bad: Result<AssociationPath, _> = serde_json::from_str(r#"[{"name":""}]"#);
        assert!(bad.is_err());
    }
}
