//! RFC 9457 Problem Details (pure data model)

use http::StatusCode;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[allow(clippy::trivially_copy_pass_by_ref)] // serde requires &T signature
fn serialize_status_code<S>(status: &StatusCode, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u16(status.as_u16())
}

fn deserialize_status_code<'de, D>(deserializer: D) -> Result<StatusCode, D::Error>
where
    D: Deserializer<'de>,
{
    let code = u16::deserialize(deserializer)?;
    StatusCode::from_u16(code).map_err(serde::de::Error::custom)
}

/// RFC 9457 Problem Details.
///
/// `status` is kept as `http::StatusCode` and travels as a plain `u16`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Problem {
    /// URI reference identifying the problem type.
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    #[serde(
        serialize_with = "serialize_status_code",
        deserialize_with = "deserialize_status_code"
    )]
    pub status: StatusCode,
    /// Explanation specific to this occurrence.
    pub detail: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance: String,
    /// Machine-readable catalog code.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Per-field violations, for 4xx problems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ValidationViolation>>,
}

/// One offending field of a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationViolation {
    /// Field path, e.g. `"criteria.name"`
    pub field: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ValidationViolation {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
        }
    }
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_owned(),
            title: title.into(),
            status,
            detail: detail.into(),
            instance: String::new(),
            code: String::new(),
            trace_id: None,
            errors: None,
        }
    }

    pub fn with_type(mut self, type_url: impl Into<String>) -> Self {
        self.type_url = type_url.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Append one violation, creating the list on first use.
    pub fn with_violation(mut self, violation: ValidationViolation) -> Self {
        self.errors.get_or_insert_with(Vec::new).push(violation);
        self
    }

    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn violations_accumulate() {
        let p = Problem::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid Criteria",
            "two criteria were rejected",
        )
        .with_code("CRITERIA_INVALID")
        .with_violation(ValidationViolation::new("criteria.name", "unknown provider"))
        .with_violation(ValidationViolation::new("criteria.age", "bad path"));

        assert!(p.is_client_error());
        assert_eq!(p.code, "CRITERIA_INVALID");
        let errors = p.errors.as_deref().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[1].field, "criteria.age");
        assert_eq!(errors[1].code, None);
    }

    #[test]
    fn status_travels_as_u16_and_empty_fields_are_omitted() {
        let p = Problem::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal", "boom");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["status"], 500);
        assert_eq!(json["type"], "about:blank");
        assert!(json.get("code").is_none());
        assert!(json.get("instance").is_none());
        assert!(json.get("trace_id").is_none());
        assert!(json.get("errors").is_none());

        let back: Problem = serde_json::from_value(json).unwrap();
        assert_eq!(back.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!back.is_client_error());
    }

    #[test]
    fn invalid_status_is_rejected() {
        let bad = r#"{"type":"about:blank","title":"x","status":42,"detail":"y"}"#;
        assert!(serde_json::from_str::<Problem>(bad).is_err());
    }
}
