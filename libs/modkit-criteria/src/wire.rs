//! Serializable wire form of a criteria transfer object.
//!
//! Remote clients cannot ship provider implementations, so every filter
//! criterion names its provider. The names are resolved against a
//! [`ProviderRegistry`] when the DTO is turned into a
//! [`CriteriaTransferObject`].
//!
//! A criterion addresses its property either in the normalized form
//! (`associationPath` + `targetPropertyName`) or in the flattened legacy form
//! (`propertyPath` + optional `joinKind`), never both. Unknown fields are
//! rejected, and so are repeated `propertyId` keys.

use std::collections::HashSet;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::association::{AssociationPath, JoinKind};
use crate::criterion::{FilterCriterion, PropertyPath, SortCriterion};
use crate::cto::{CriteriaTransferObject, FilterAndSortCriteria};
use crate::error::{CriteriaError, CriteriaResult};
use crate::provider::ProviderRegistry;

/// Wire names of the [`PropertyTargetDto`] fields.
const TARGET_FIELDS: [&str; 4] = [
    "associationPath",
    "targetPropertyName",
    "propertyPath",
    "joinKind",
];

/// Property address shared by filter and sort criteria on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyTargetDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association_path: Option<AssociationPath>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_property_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_kind: Option<JoinKind>,
}

fn invalid_criterion(property_id: &str, reason: impl Into<String>) -> CriteriaError {
    CriteriaError::InvalidCriterion {
        property_id: property_id.to_owned(),
        reason: reason.into(),
    }
}

impl PropertyTargetDto {
    fn into_property_path(self, property_id: &str) -> CriteriaResult<PropertyPath> {
        let invalid = |reason: &str| invalid_criterion(property_id, reason);

        match (self.target_property_name, self.property_path) {
            (Some(name), None) => {
                if self.join_kind.is_some() {
                    return Err(invalid("`joinKind` only applies to `propertyPath`"));
                }
                PropertyPath::new(self.association_path.unwrap_or_default(), name)
            }
            (None, Some(path)) => {
                if self.association_path.is_some() {
                    return Err(invalid(
                        "`associationPath` cannot be combined with `propertyPath`",
                    ));
                }
                PropertyPath::parse(&path, self.join_kind.unwrap_or_default())
            }
            (Some(_), Some(_)) => Err(invalid(
                "both `targetPropertyName` and `propertyPath` are set",
            )),
            (None, None) => Err(invalid(
                "one of `targetPropertyName` or `propertyPath` is required",
            )),
        }
    }
}

impl From<&PropertyPath> for PropertyTargetDto {
    fn from(path: &PropertyPath) -> Self {
        Self {
            association_path: Some(path.association_path().clone()),
            target_property_name: Some(path.target_property_name().to_owned()),
            property_path: None,
            join_kind: None,
        }
    }
}

/// Leftover keys of a flattened criterion. Target fields may show up here
/// too, depending on how serde hands out flattened content.
fn reject_unknown_fields(property_id: &str, rest: &Map<String, Value>) -> CriteriaResult<()> {
    match rest
        .keys()
        .find(|key| !TARGET_FIELDS.contains(&key.as_str()))
    {
        Some(field) => Err(invalid_criterion(
            property_id,
            format!("unknown field `{field}`"),
        )),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriterionDto {
    #[serde(flatten)]
    pub target: PropertyTargetDto,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_object_value_paths: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_values: Option<Vec<Value>>,
    /// Name of a provider registered with the receiving side.
    pub provider: String,
    /// Fields no criterion knows about; non-empty fails the conversion.
    #[serde(flatten)]
    pub unknown_fields: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortCriterionDto {
    #[serde(flatten)]
    pub target: PropertyTargetDto,
    #[serde(default = "ascending_by_default")]
    pub ascending: bool,
    #[serde(flatten)]
    pub unknown_fields: Map<String, Value>,
}

fn ascending_by_default() -> bool {
    true
}

impl From<&SortCriterion> for SortCriterionDto {
    fn from(sort: &SortCriterion) -> Self {
        Self {
            target: sort.target().into(),
            ascending: sort.is_ascending(),
            unknown_fields: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FilterAndSortCriteriaDto {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_criteria: Vec<FilterCriterionDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_criterion: Option<SortCriterionDto>,
}

/// `propertyId`-keyed entries of a wire transfer object, in document order.
///
/// Unlike a map, repeated keys survive deserialization so the conversion can
/// reject them instead of silently keeping one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriteriaEntriesDto(Vec<(String, FilterAndSortCriteriaDto)>);

impl CriteriaEntriesDto {
    pub fn push(&mut self, property_id: impl Into<String>, entry: FilterAndSortCriteriaDto) {
        self.0.push((property_id.into(), entry));
    }

    /// First entry registered under `property_id`.
    #[must_use]
    pub fn get(&self, property_id: &str) -> Option<&FilterAndSortCriteriaDto> {
        self.0
            .iter()
            .find(|(id, _)| id == property_id)
            .map(|(_, entry)| entry)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(id, _)| id.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn first_duplicate(&self) -> Option<&str> {
        let mut seen = HashSet::with_capacity(self.0.len());
        self.keys().find(|id| !seen.insert(*id))
    }
}

impl FromIterator<(String, FilterAndSortCriteriaDto)> for CriteriaEntriesDto {
    fn from_iter<I: IntoIterator<Item = (String, FilterAndSortCriteriaDto)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for CriteriaEntriesDto {
    type Item = (String, FilterAndSortCriteriaDto);
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Serialize for CriteriaEntriesDto {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(id, entry)| (id, entry)))
    }
}

struct EntriesVisitor;

impl<'de> Visitor<'de> for EntriesVisitor {
    type Value = CriteriaEntriesDto;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of propertyId to filter and sort criteria")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(entry) = map.next_entry::<String, FilterAndSortCriteriaDto>()? {
            entries.push(entry);
        }
        Ok(CriteriaEntriesDto(entries))
    }
}

impl<'de> Deserialize<'de> for CriteriaEntriesDto {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// Wire form of [`CriteriaTransferObject`]. The `criteria` entries keep
/// document order, which becomes the conversion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CriteriaTransferObjectDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_result: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<i32>,
    #[serde(default)]
    pub criteria: CriteriaEntriesDto,
}

impl CriteriaTransferObjectDto {
    /// Materialize the transfer object, resolving provider names via
    /// `registry`.
    ///
    /// # Errors
    /// - `CriteriaError::DuplicatePropertyId` when a `propertyId` key repeats
    /// - `CriteriaError::UnknownProvider` for a provider name the registry
    ///   does not know
    /// - `CriteriaError::InvalidCriterion` for unknown criterion fields
    /// - `CriteriaError::InvalidCriterion` / `InvalidPropertyPath` /
    ///   `InvalidAssociationPath` for malformed property addresses
    pub fn into_transfer_object<P>(
        self,
        registry: &ProviderRegistry<P>,
    ) -> CriteriaResult<CriteriaTransferObject<P>> {
        if let Some(id) = self.criteria.first_duplicate() {
            return Err(CriteriaError::DuplicatePropertyId(id.to_owned()));
        }

        let mut cto = CriteriaTransferObject::new().with_paging(self.first_result, self.max_results);

        for (property_id, entry) in self.criteria {
            let mut criteria = FilterAndSortCriteria::new(property_id.as_str());

            for filter in entry.filter_criteria {
                reject_unknown_fields(&property_id, &filter.unknown_fields)?;
                let provider = registry
                    .get(&filter.provider)
                    .ok_or_else(|| CriteriaError::UnknownProvider(filter.provider.clone()))?;
                let target = filter.target.into_property_path(&property_id)?;
                criteria.add_filter_criterion(FilterCriterion::new(
                    target,
                    filter.filter_object_value_paths,
                    filter.direct_values,
                    provider,
                ));
            }

            if let Some(sort) = entry.sort_criterion {
                reject_unknown_fields(&property_id, &sort.unknown_fields)?;
                let target = sort.target.into_property_path(&property_id)?;
                criteria.set_sort_criterion(SortCriterion::new(target, sort.ascending))?;
            }

            cto.add(criteria)?;
        }

        Ok(cto)
    }
}
