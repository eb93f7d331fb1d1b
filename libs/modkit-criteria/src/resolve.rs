//! Filter-object value resolution.
//!
//! A filter criterion may read its values from a caller-supplied filter
//! object (e.g. a search form) through dotted paths such as
//! `"person.address.city"`.

use serde::Serialize;
use serde_json::Value;

use crate::criterion::FilterCriterion;
use crate::error::{CriteriaError, CriteriaResult};

/// Source of values addressed by filter-object value paths.
pub trait FilterObject {
    /// Resolve a dotted `path`.
    ///
    /// `Ok(None)` means "present in the schema but without a value" (a null
    /// or missing intermediate node). It is not an error.
    ///
    /// # Errors
    /// Returns `CriteriaError::UnknownFilterObjectPath` when the path cannot
    /// address anything in this filter object at all.
    fn resolve_path(&self, path: &str) -> CriteriaResult<Option<Value>>;
}

impl FilterObject for Value {
    fn resolve_path(&self, path: &str) -> CriteriaResult<Option<Value>> {
        let unknown = || CriteriaError::UnknownFilterObjectPath(path.to_owned());

        let mut segments = path.split('.');
        let root_key = segments.next().filter(|s| !s.is_empty()).ok_or_else(unknown)?;
        let mut current = self.as_object().and_then(|m| m.get(root_key)).ok_or_else(unknown)?;

        for segment in segments {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            let Some(value) = next else {
                return Ok(None);
            };
            current = value;
        }

        Ok(Some(current).filter(|v| !v.is_null()).cloned())
    }
}

impl<T: FilterObject + ?Sized> FilterObject for &T {
    fn resolve_path(&self, path: &str) -> CriteriaResult<Option<Value>> {
        (**self).resolve_path(path)
    }
}

/// Filter object for conversions that only use direct values.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFilterObject;

impl FilterObject for NoFilterObject {
    fn resolve_path(&self, path: &str) -> CriteriaResult<Option<Value>> {
        Err(CriteriaError::UnknownFilterObjectPath(path.to_owned()))
    }
}

/// Turn any serializable form into a JSON filter object.
///
/// # Errors
/// Returns `CriteriaError::Config` if `value` cannot be serialized.
pub fn to_filter_object<T: Serialize + ?Sized>(value: &T) -> CriteriaResult<Value> {
    serde_json::to_value(value).map_err(|e| CriteriaError::Config(format!("filter object: {e}")))
}

/// Resolve every value of `criterion`: filter-object-path values first (in
/// path order, unresolved ones as `Value::Null`), then direct values.
pub(crate) fn resolve_values<P, F>(
    criterion: &FilterCriterion<P>,
    filter_object: &F,
) -> CriteriaResult<Vec<Value>>
where
    F: FilterObject + ?Sized,
{
    let paths = criterion.filter_object_value_paths().unwrap_or_default();
    let direct = criterion.direct_values().unwrap_or_default();

    let mut values = Vec::with_capacity(paths.len() + direct.len());
    for path in paths {
        values.push(filter_object.resolve_path(path)?.unwrap_or(Value::Null));
    }
    values.extend_from_slice(direct);
    Ok(values)
}
