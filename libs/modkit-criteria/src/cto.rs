//! Criteria transfer object: the map-based container a client fills in.

use indexmap::IndexMap;

use crate::criterion::{FilterCriterion, PersistentEntityCriterion, SortCriterion};
use crate::error::{CriteriaError, CriteriaResult};

/// All filter criteria plus the optional sort criterion for one logical
/// `propertyId`.
#[derive(Debug)]
pub struct FilterAndSortCriteria<P> {
    property_id: String,
    filter_criteria: Vec<FilterCriterion<P>>,
    sort_criterion: Option<SortCriterion>,
}

impl<P> Clone for FilterAndSortCriteria<P> {
    fn clone(&self) -> Self {
        Self {
            property_id: self.property_id.clone(),
            filter_criteria: self.filter_criteria.clone(),
            sort_criterion: self.sort_criterion.clone(),
        }
    }
}

impl<P> FilterAndSortCriteria<P> {
    #[must_use]
    pub fn new(property_id: impl Into<String>) -> Self {
        Self {
            property_id: property_id.into(),
            filter_criteria: Vec::new(),
            sort_criterion: None,
        }
    }

    #[must_use]
    pub fn with_filter(property_id: impl Into<String>, criterion: FilterCriterion<P>) -> Self {
        let mut criteria = Self::new(property_id);
        criteria.filter_criteria.push(criterion);
        criteria
    }

    #[must_use]
    pub fn with_sort(property_id: impl Into<String>, sort: SortCriterion) -> Self {
        let mut criteria = Self::new(property_id);
        criteria.sort_criterion = Some(sort);
        criteria
    }

    #[must_use]
    pub fn property_id(&self) -> &str {
        &self.property_id
    }

    pub fn add_filter_criterion(&mut self, criterion: FilterCriterion<P>) -> &mut Self {
        self.filter_criteria.push(criterion);
        self
    }

    /// Assign the sort criterion. At most one sort criterion per `propertyId`.
    ///
    /// # Errors
    /// Returns `CriteriaError::SortAlreadyAssigned` on a second assignment.
    pub fn set_sort_criterion(&mut self, sort: SortCriterion) -> CriteriaResult<&mut Self> {
        if self.sort_criterion.is_some() {
            return Err(CriteriaError::SortAlreadyAssigned(self.property_id.clone()));
        }
        self.sort_criterion = Some(sort);
        Ok(self)
    }

    #[must_use]
    pub fn filter_criteria(&self) -> &[FilterCriterion<P>] {
        &self.filter_criteria
    }

    #[must_use]
    pub fn sort_criterion(&self) -> Option<&SortCriterion> {
        self.sort_criterion.as_ref()
    }

    #[must_use]
    pub fn is_sort_assigned(&self) -> bool {
        self.sort_criterion.is_some()
    }

    /// Filters in declaration order, then the sort criterion (if any).
    pub fn criteria(&self) -> impl Iterator<Item = PersistentEntityCriterion<'_, P>> {
        self.filter_criteria
            .iter()
            .map(PersistentEntityCriterion::Filter)
            .chain(self.sort_criterion.iter().map(PersistentEntityCriterion::Sort))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filter_criteria.is_empty() && self.sort_criterion.is_none()
    }
}

/// [`FilterAndSortCriteria`] keyed by `propertyId`, plus paging bounds.
///
/// The wire form is [`crate::wire::CriteriaTransferObjectDto`].
///
/// Iteration follows insertion order, which is also the order in which the
/// converter emits joins, predicates and sort keys. `None` paging bounds mean
/// "no bound".
#[derive(Debug)]
pub struct CriteriaTransferObject<P> {
    first_result: Option<i32>,
    max_results: Option<i32>,
    criteria: IndexMap<String, FilterAndSortCriteria<P>>,
}

impl<P> Default for CriteriaTransferObject<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> Clone for CriteriaTransferObject<P> {
    fn clone(&self) -> Self {
        Self {
            first_result: self.first_result,
            max_results: self.max_results,
            criteria: self.criteria.clone(),
        }
    }
}

impl<P> CriteriaTransferObject<P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            first_result: None,
            max_results: None,
            criteria: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_paging(mut self, first_result: Option<i32>, max_results: Option<i32>) -> Self {
        self.first_result = first_result;
        self.max_results = max_results;
        self
    }

    #[must_use]
    pub fn first_result(&self) -> Option<i32> {
        self.first_result
    }

    pub fn set_first_result(&mut self, first_result: Option<i32>) {
        self.first_result = first_result;
    }

    #[must_use]
    pub fn max_results(&self) -> Option<i32> {
        self.max_results
    }

    pub fn set_max_results(&mut self, max_results: Option<i32>) {
        self.max_results = max_results;
    }

    /// Add a fully built entry.
    ///
    /// # Errors
    /// Returns `CriteriaError::DuplicatePropertyId` if an entry with the same
    /// `propertyId` is already present; the existing entry is left untouched.
    pub fn add(&mut self, criteria: FilterAndSortCriteria<P>) -> CriteriaResult<()> {
        if self.criteria.contains_key(criteria.property_id()) {
            return Err(CriteriaError::DuplicatePropertyId(
                criteria.property_id().to_owned(),
            ));
        }
        self.criteria
            .insert(criteria.property_id().to_owned(), criteria);
        Ok(())
    }

    /// Upsert: return the entry for `property_id`, creating and storing an
    /// empty one first when it does not exist yet.
    pub fn get_or_create(&mut self, property_id: &str) -> &mut FilterAndSortCriteria<P> {
        self.criteria
            .entry(property_id.to_owned())
            .or_insert_with(|| FilterAndSortCriteria::new(property_id))
    }

    /// Plain lookup, without the upsert side effect.
    #[must_use]
    pub fn get(&self, property_id: &str) -> Option<&FilterAndSortCriteria<P>> {
        self.criteria.get(property_id)
    }

    pub fn property_ids(&self) -> impl Iterator<Item = &str> {
        self.criteria.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterAndSortCriteria<P>> {
        self.criteria.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}
