//! Operator providers producing `sea_orm::Condition` predicates.

use std::fmt;

use modkit_criteria::{JoinNode, PropertyFilterCriterionProvider, ProviderError, ProviderRegistry};
use sea_orm::Condition;
use sea_orm::sea_query::{Alias, Expr, Func, LikeExpr, SimpleExpr};
use serde_json::Value;

use crate::coerce::coerce_at;
use crate::kind::FieldKind;

/// Comparison applied by a [`SimpleFilterProvider`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    /// Case-sensitive `contains`.
    Like,
    /// Case-insensitive `contains`, via `LOWER()` on both sides.
    ILike,
    StartsWith,
    EndsWith,
    /// Inclusive range over `[lower, upper]`.
    Between,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 15] = [
        FilterOperator::Eq,
        FilterOperator::Ne,
        FilterOperator::Gt,
        FilterOperator::Ge,
        FilterOperator::Lt,
        FilterOperator::Le,
        FilterOperator::Like,
        FilterOperator::ILike,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::Between,
        FilterOperator::In,
        FilterOperator::NotIn,
        FilterOperator::IsNull,
        FilterOperator::IsNotNull,
    ];

    /// Registry name of the operator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Eq => "eq",
            FilterOperator::Ne => "ne",
            FilterOperator::Gt => "gt",
            FilterOperator::Ge => "ge",
            FilterOperator::Lt => "lt",
            FilterOperator::Le => "le",
            FilterOperator::Like => "like",
            FilterOperator::ILike => "ilike",
            FilterOperator::StartsWith => "starts_with",
            FilterOperator::EndsWith => "ends_with",
            FilterOperator::Between => "between",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "not_in",
            FilterOperator::IsNull => "is_null",
            FilterOperator::IsNotNull => "is_not_null",
        }
    }

    /// Operators of the LIKE family only apply to textual columns.
    #[must_use]
    pub fn is_pattern(self) -> bool {
        matches!(
            self,
            FilterOperator::Like
                | FilterOperator::ILike
                | FilterOperator::StartsWith
                | FilterOperator::EndsWith
        )
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* ---------- LIKE helpers ---------- */

const LIKE_ESCAPE: char = '\\';

fn like_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '%' | '_' | '\\' => {
                out.push(LIKE_ESCAPE);
                out.push(ch);
            }
            c => out.push(c),
        }
    }
    out
}
fn like_contains(s: &str) -> String {
    format!("%{}%", like_escape(s))
}
fn like_starts(s: &str) -> String {
    format!("{}%", like_escape(s))
}
fn like_ends(s: &str) -> String {
    format!("%{}", like_escape(s))
}

/// Null and whitespace-only strings count as "not filled in".
fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn expect_count(values: &[Value], expected: usize) -> Result<(), ProviderError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(ProviderError::ValueCount {
            expected,
            got: values.len(),
        })
    }
}

/// Provider applying one [`FilterOperator`] to a column of a known
/// [`FieldKind`].
///
/// Blank input (null or whitespace-only strings) contributes no predicate, so
/// empty search-form fields simply drop out of the query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimpleFilterProvider {
    op: FilterOperator,
    kind: FieldKind,
    root_qualifier: Option<String>,
}

impl SimpleFilterProvider {
    #[must_use]
    pub fn new(op: FilterOperator, kind: FieldKind) -> Self {
        Self {
            op,
            kind,
            root_qualifier: None,
        }
    }

    /// Qualify root-entity columns with `table`.
    ///
    /// Root columns are unqualified by default, which is ambiguous once the
    /// plan joins a table sharing a column name.
    #[must_use]
    pub fn qualify_root(mut self, table: impl Into<String>) -> Self {
        self.root_qualifier = Some(table.into());
        self
    }

    #[must_use]
    pub fn op(&self) -> FilterOperator {
        self.op
    }

    #[must_use]
    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    fn column(&self, node: &JoinNode, property: &str) -> Expr {
        let col = Alias::new(property);
        match node.alias().or(self.root_qualifier.as_deref()) {
            Some(qualifier) => Expr::col((Alias::new(qualifier), col)),
            None => Expr::col(col),
        }
    }

    fn pattern(&self, col: Expr, values: &[Value]) -> Result<Option<SimpleExpr>, ProviderError> {
        if !self.kind.is_textual() {
            return Err(ProviderError::Other(format!(
                "operator {} requires a String column, not {}",
                self.op, self.kind
            )));
        }
        expect_count(values, 1)?;
        let raw = match &values[0] {
            v if is_blank(v) => return Ok(None),
            Value::String(s) => s.as_str(),
            other => {
                return Err(ProviderError::TypeMismatch {
                    position: 0,
                    expected: self.kind.to_string(),
                    got: other.to_string(),
                });
            }
        };

        let (target, pattern) = match self.op {
            FilterOperator::ILike => (
                Expr::expr(Func::lower(col)),
                like_contains(&raw.to_lowercase()),
            ),
            FilterOperator::StartsWith => (col, like_starts(raw)),
            FilterOperator::EndsWith => (col, like_ends(raw)),
            _ => (col, like_contains(raw)),
        };
        Ok(Some(target.like(LikeExpr::new(pattern).escape(LIKE_ESCAPE))))
    }

    fn single(&self, col: Expr, values: &[Value]) -> Result<Option<SimpleExpr>, ProviderError> {
        expect_count(values, 1)?;
        if is_blank(&values[0]) {
            return Ok(None);
        }
        let v = coerce_at(self.kind, 0, &values[0])?;
        Ok(Some(match self.op {
            FilterOperator::Ne => col.ne(v),
            FilterOperator::Gt => col.gt(v),
            FilterOperator::Ge => col.gte(v),
            FilterOperator::Lt => col.lt(v),
            FilterOperator::Le => col.lte(v),
            _ => col.eq(v),
        }))
    }

    fn between(&self, col: Expr, values: &[Value]) -> Result<Option<SimpleExpr>, ProviderError> {
        expect_count(values, 2)?;
        let bound = |position: usize| -> Result<Option<sea_orm::Value>, ProviderError> {
            let v = &values[position];
            if is_blank(v) {
                Ok(None)
            } else {
                coerce_at(self.kind, position, v).map(Some)
            }
        };
        // an open end degrades to a one-sided comparison
        Ok(match (bound(0)?, bound(1)?) {
            (Some(lo), Some(hi)) => Some(col.between(lo, hi)),
            (Some(lo), None) => Some(col.gte(lo)),
            (None, Some(hi)) => Some(col.lte(hi)),
            (None, None) => None,
        })
    }

    fn membership(&self, col: Expr, values: &[Value]) -> Result<Option<SimpleExpr>, ProviderError> {
        // a single array value is taken as the whole list
        let items: &[Value] = match values {
            [Value::Array(items)] => items,
            _ => values,
        };
        let coerced = items
            .iter()
            .enumerate()
            .filter(|(_, v)| !is_blank(v))
            .map(|(position, v)| coerce_at(self.kind, position, v))
            .collect::<Result<Vec<_>, _>>()?;
        if coerced.is_empty() {
            return Ok(None);
        }
        Ok(Some(if self.op == FilterOperator::NotIn {
            col.is_not_in(coerced)
        } else {
            col.is_in(coerced)
        }))
    }
}

impl PropertyFilterCriterionProvider<Condition> for SimpleFilterProvider {
    fn build_criterion(
        &self,
        node: &JoinNode,
        target_property_name: &str,
        values: &[Value],
    ) -> Result<Option<Condition>, ProviderError> {
        let col = self.column(node, target_property_name);
        let expr = match self.op {
            FilterOperator::Eq
            | FilterOperator::Ne
            | FilterOperator::Gt
            | FilterOperator::Ge
            | FilterOperator::Lt
            | FilterOperator::Le => self.single(col, values)?,
            FilterOperator::Like
            | FilterOperator::ILike
            | FilterOperator::StartsWith
            | FilterOperator::EndsWith => self.pattern(col, values)?,
            FilterOperator::Between => self.between(col, values)?,
            FilterOperator::In | FilterOperator::NotIn => self.membership(col, values)?,
            FilterOperator::IsNull => {
                expect_count(values, 0)?;
                Some(col.is_null())
            }
            FilterOperator::IsNotNull => {
                expect_count(values, 0)?;
                Some(col.is_not_null())
            }
        };

        if expr.is_none() {
            tracing::trace!(
                op = %self.op,
                property = target_property_name,
                "blank filter input, no predicate"
            );
        }
        Ok(expr.map(|e| Condition::all().add(e)))
    }
}

/// Registry with one [`SimpleFilterProvider`] per operator applicable to
/// `kind`, keyed by [`FilterOperator::as_str`].
///
/// The LIKE family is only registered for textual kinds.
pub fn default_registry(kind: FieldKind) -> ProviderRegistry<Condition> {
    FilterOperator::ALL
        .into_iter()
        .filter(|op| kind.is_textual() || !op.is_pattern())
        .fold(ProviderRegistry::new(), |registry, op| {
            registry.with(op.as_str(), SimpleFilterProvider::new(op, kind))
        })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use modkit_criteria::{AssociationPath, JoinConflictPolicy, JoinKind, JoinTree};
    use sea_orm::sea_query::{Query, QueryStatementWriter, SqliteQueryBuilder};
    use serde_json::json;

    fn render(cond: Condition) -> String {
        Query::select()
            .column(Alias::new("id"))
            .from(Alias::new("person"))
            .cond_where(cond)
            .to_string(SqliteQueryBuilder)
    }

    fn build(op: FilterOperator, kind: FieldKind, values: &[Value]) -> Option<String> {
        let tree = JoinTree::new();
        SimpleFilterProvider::new(op, kind)
            .build_criterion(tree.root(), "name", values)
            .unwrap()
            .map(render)
    }

    #[test]
    fn like_escape_protects_wildcards() {
        assert_eq!(like_escape("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(like_contains("a"), "%a%");
        assert_eq!(like_starts("a"), "a%");
        assert_eq!(like_ends("a"), "%a");
    }

    #[test]
    fn comparison_on_root_is_unqualified() {
        let sql = build(FilterOperator::Ge, FieldKind::I64, &[json!("18")]).unwrap();
        assert!(sql.ends_with(r#"WHERE "name" >= 18"#), "{sql}");
    }

    #[test]
    fn joined_node_columns_use_the_alias() {
        let mut tree = JoinTree::new();
        let id = tree
            .register(
                &AssociationPath::parse_with("department", JoinKind::Inner).unwrap(),
                JoinConflictPolicy::FirstWins,
            )
            .unwrap();
        let cond = SimpleFilterProvider::new(FilterOperator::Eq, FieldKind::String)
            .build_criterion(&tree[id], "name", &[json!("R&D")])
            .unwrap()
            .unwrap();
        let sql = render(cond);
        assert!(sql.contains(r#""department_1"."name" = 'R&D'"#), "{sql}");
    }

    #[test]
    fn root_qualifier_applies_only_to_root() {
        let tree = JoinTree::new();
        let cond = SimpleFilterProvider::new(FilterOperator::Eq, FieldKind::Bool)
            .qualify_root("person")
            .build_criterion(tree.root(), "active", &[json!(true)])
            .unwrap()
            .unwrap();
        let sql = render(cond);
        assert!(sql.contains(r#"WHERE "person"."active" = "#), "{sql}");
    }

    #[test]
    fn blank_input_skips_the_predicate() {
        assert_eq!(build(FilterOperator::Eq, FieldKind::String, &[json!("  ")]), None);
        assert_eq!(build(FilterOperator::Like, FieldKind::String, &[Value::Null]), None);
        assert_eq!(
            build(FilterOperator::Between, FieldKind::I64, &[Value::Null, json!("")]),
            None
        );
        assert_eq!(build(FilterOperator::In, FieldKind::I64, &[json!([null])]), None);
    }

    #[test]
    fn like_family_renders_escaped_patterns() {
        let sql = build(FilterOperator::Like, FieldKind::String, &[json!("5%")]).unwrap();
        assert!(sql.contains(r#""name" LIKE '%5"#), "{sql}");
        assert!(sql.contains("ESCAPE"), "{sql}");

        let sql = build(FilterOperator::ILike, FieldKind::String, &[json!("ADA")]).unwrap();
        assert!(sql.contains(r#"LOWER("name") LIKE '%ada%'"#), "{sql}");

        let sql = build(FilterOperator::StartsWith, FieldKind::String, &[json!("Ad")]).unwrap();
        assert!(sql.contains("LIKE 'Ad%'"), "{sql}");
    }

    #[test]
    fn like_on_non_textual_column_fails() {
        let tree = JoinTree::new();
        let err = SimpleFilterProvider::new(FilterOperator::Like, FieldKind::I64)
            .build_criterion(tree.root(), "age", &[json!("1")])
            .unwrap_err();
        assert!(matches!(err, ProviderError::Other(_)));
    }

    #[test]
    fn between_with_one_open_end_is_one_sided() {
        let both = build(FilterOperator::Between, FieldKind::I64, &[json!(1), json!(9)]).unwrap();
        assert!(both.contains(r#""name" BETWEEN 1 AND 9"#), "{both}");

        let lower = build(FilterOperator::Between, FieldKind::I64, &[json!(1), Value::Null]).unwrap();
        assert!(lower.contains(r#""name" >= 1"#), "{lower}");

        let upper = build(FilterOperator::Between, FieldKind::I64, &[json!(""), json!(9)]).unwrap();
        assert!(upper.contains(r#""name" <= 9"#), "{upper}");
    }

    #[test]
    fn membership_flattens_a_single_array() {
        let sql = build(FilterOperator::In, FieldKind::I64, &[json!([1, null, 3])]).unwrap();
        assert!(sql.contains(r#""name" IN (1, 3)"#), "{sql}");

        let sql = build(FilterOperator::NotIn, FieldKind::I64, &[json!(1), json!(2)]).unwrap();
        assert!(sql.contains(r#""name" NOT IN (1, 2)"#), "{sql}");
    }

    #[test]
    fn value_counts_are_enforced() {
        let tree = JoinTree::new();
        let err = SimpleFilterProvider::new(FilterOperator::Eq, FieldKind::I64)
            .build_criterion(tree.root(), "age", &[json!(1), json!(2)])
            .unwrap_err();
        assert_eq!(err, ProviderError::ValueCount { expected: 1, got: 2 });

        let err = SimpleFilterProvider::new(FilterOperator::IsNull, FieldKind::I64)
            .build_criterion(tree.root(), "age", &[json!(1)])
            .unwrap_err();
        assert_eq!(err, ProviderError::ValueCount { expected: 0, got: 1 });

        let sql = build(FilterOperator::IsNotNull, FieldKind::I64, &[]).unwrap();
        assert!(sql.contains(r#""name" IS NOT NULL"#));
    }

    #[test]
    fn coercion_errors_carry_the_position() {
        let tree = JoinTree::new();
        let err = SimpleFilterProvider::new(FilterOperator::Between, FieldKind::I64)
            .build_criterion(tree.root(), "age", &[json!(1), json!("many")])
            .unwrap_err();
        assert!(matches!(err, ProviderError::TypeMismatch { position: 1, .. }));
    }

    #[test]
    fn default_registry_respects_textual_kinds() {
        let text = default_registry(FieldKind::String);
        assert_eq!(text.len(), FilterOperator::ALL.len());
        assert!(text.contains("ilike"));

        let numeric = default_registry(FieldKind::I64);
        assert!(!numeric.contains("like"));
        assert!(numeric.contains("between"));
        assert_eq!(numeric.len(), FilterOperator::ALL.len() - 4);
    }
}
