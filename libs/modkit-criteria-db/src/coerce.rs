//! JSON → typed `SeaORM` value coercion.
//!
//! Filter values arrive as JSON, mostly from HTML-style search forms, so
//! every non-string kind also accepts its canonical string spelling
//! (`"42"`, `"true"`, RFC 3339 timestamps, ...).

use chrono::{NaiveDate, NaiveTime, Utc};
use modkit_criteria::ProviderError;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::kind::FieldKind;

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn mismatch(kind: FieldKind, position: usize, got: impl Into<String>) -> ProviderError {
    ProviderError::TypeMismatch {
        position,
        expected: kind.to_string(),
        got: got.into(),
    }
}

fn number_to_decimal(n: &serde_json::Number) -> Option<Decimal> {
    let s = n.to_string();
    Decimal::from_str_exact(&s)
        .or_else(|_| Decimal::from_scientific(&s))
        .ok()
}

/// Coerce a single JSON value into a `SeaORM` value of `kind`.
///
/// # Errors
/// Returns `ProviderError::TypeMismatch` (position 0) if the value cannot
/// represent `kind`.
pub fn coerce(kind: FieldKind, value: &Value) -> Result<sea_orm::Value, ProviderError> {
    coerce_at(kind, 0, value)
}

/// Same as [`coerce`], reporting `position` in errors.
///
/// # Errors
/// Returns `ProviderError::TypeMismatch` if the value cannot represent `kind`.
pub fn coerce_at(
    kind: FieldKind,
    position: usize,
    value: &Value,
) -> Result<sea_orm::Value, ProviderError> {
    use sea_orm::Value as V;

    let bad_string = |s: &str| mismatch(kind, position, format!("string {s:?}"));

    Ok(match (kind, value) {
        (FieldKind::String, Value::String(s)) => V::String(Some(Box::new(s.clone()))),

        (FieldKind::I64, Value::Number(n)) => {
            V::BigInt(Some(n.as_i64().ok_or_else(|| mismatch(kind, position, n.to_string()))?))
        }
        (FieldKind::I64, Value::String(s)) => {
            V::BigInt(Some(s.trim().parse::<i64>().map_err(|_| bad_string(s))?))
        }

        (FieldKind::F64, Value::Number(n)) => {
            V::Double(Some(n.as_f64().ok_or_else(|| mismatch(kind, position, n.to_string()))?))
        }
        (FieldKind::F64, Value::String(s)) => {
            V::Double(Some(s.trim().parse::<f64>().map_err(|_| bad_string(s))?))
        }

        (FieldKind::Decimal, Value::Number(n)) => V::Decimal(Some(Box::new(
            number_to_decimal(n).ok_or_else(|| mismatch(kind, position, n.to_string()))?,
        ))),
        (FieldKind::Decimal, Value::String(s)) => V::Decimal(Some(Box::new(
            s.trim().parse::<Decimal>().map_err(|_| bad_string(s))?,
        ))),

        (FieldKind::Bool, Value::Bool(b)) => V::Bool(Some(*b)),
        (FieldKind::Bool, Value::String(s)) => {
            V::Bool(Some(s.trim().parse::<bool>().map_err(|_| bad_string(s))?))
        }

        (FieldKind::Uuid, Value::String(s)) => V::Uuid(Some(Box::new(
            s.trim().parse::<uuid::Uuid>().map_err(|_| bad_string(s))?,
        ))),

        (FieldKind::DateTimeUtc, Value::String(s)) => {
            let dt = chrono::DateTime::parse_from_rfc3339(s.trim())
                .map_err(|_| bad_string(s))?
                .with_timezone(&Utc);
            V::ChronoDateTimeUtc(Some(Box::new(dt)))
        }
        (FieldKind::Date, Value::String(s)) => V::ChronoDate(Some(Box::new(
            s.trim().parse::<NaiveDate>().map_err(|_| bad_string(s))?,
        ))),
        (FieldKind::Time, Value::String(s)) => V::ChronoTime(Some(Box::new(
            s.trim().parse::<NaiveTime>().map_err(|_| bad_string(s))?,
        ))),

        (expected, other) => return Err(mismatch(expected, position, json_type(other))),
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_and_numeric_strings() {
        assert_eq!(coerce(FieldKind::I64, &json!(18)).unwrap(), sea_orm::Value::BigInt(Some(18)));
        assert_eq!(coerce(FieldKind::I64, &json!(" 18 ")).unwrap(), sea_orm::Value::BigInt(Some(18)));
        assert!(coerce(FieldKind::I64, &json!(1.5)).is_err());
        assert!(matches!(
            coerce(FieldKind::F64, &json!("2.5")).unwrap(),
            sea_orm::Value::Double(Some(f)) if (f - 2.5).abs() < f64::EPSILON
        ));
    }

    #[test]
    fn decimals_keep_their_precision() {
        let v = coerce(FieldKind::Decimal, &json!("1234.5600")).unwrap();
        assert_eq!(
            v,
            sea_orm::Value::Decimal(Some(Box::new("1234.5600".parse::<Decimal>().unwrap())))
        );
        assert!(coerce(FieldKind::Decimal, &json!(0.1)).is_ok());
    }

    #[test]
    fn temporal_and_uuid_strings() {
        assert!(coerce(FieldKind::DateTimeUtc, &json!("2024-01-02T03:04:05Z")).is_ok());
        assert!(coerce(FieldKind::Date, &json!("2024-01-02")).is_ok());
        assert!(coerce(FieldKind::Time, &json!("12:30:00")).is_ok());
        assert!(coerce(FieldKind::Uuid, &json!("67e55044-10b1-426f-9247-bb680e5fe0c8")).is_ok());
        assert!(coerce(FieldKind::Date, &json!("yesterday")).is_err());
    }

    #[test]
    fn mismatches_report_position_and_json_type() {
        let err = coerce_at(FieldKind::Bool, 3, &json!({"a": 1})).unwrap_err();
        assert_eq!(
            err,
            ProviderError::TypeMismatch {
                position: 3,
                expected: "Bool".to_owned(),
                got: "object".to_owned(),
            }
        );
        assert!(coerce(FieldKind::String, &json!(5)).is_err());
        assert!(coerce(FieldKind::I64, &Value::Null).is_err());
    }
}
