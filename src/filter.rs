//! Filter predicates over facility records.
//!
//! Each set field of [`FilterCriteria`] becomes one predicate; the predicates
//! are ANDed. All comparisons are case-insensitive substring tests. A record
//! that lacks the tested field fails that predicate.

use std::sync::Arc;

use crate::{FacilityRecord, FilterCriteria};

/// Lowercased needle for a criterion, `None` when the field is unset or empty.
fn needle(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

#[inline]
fn field_contains(field: &Option<String>, needle: &str) -> bool {
    field
        .as_deref()
        .is_some_and(|value| value.to_lowercase().contains(needle))
}

/// Free-text predicate: name OR address OR sports.
pub(crate) fn text_matches(record: &FacilityRecord, needle: &str) -> bool {
    field_contains(&record.name, needle)
        || field_contains(&record.address, needle)
        || field_contains(&record.sports, needle)
}

/// Lowered criteria, built once per filter pass.
struct Predicates {
    district: Option<String>,
    sport_type: Option<String>,
    query: Option<String>,
}

impl Predicates {
    fn new(criteria: &FilterCriteria) -> Self {
        Self {
            district: needle(&criteria.district),
            sport_type: needle(&criteria.sport_type),
            query: needle(&criteria.query),
        }
    }

    fn test(&self, record: &FacilityRecord) -> bool {
        let district_ok = self
            .district
            .as_deref()
            .map_or(true, |n| field_contains(&record.district, n));
        let sport_ok = self
            .sport_type
            .as_deref()
            .map_or(true, |n| field_contains(&record.sports, n));
        let query_ok = self.query.as_deref().map_or(true, |n| text_matches(record, n));

        district_ok && sport_ok && query_ok
    }
}

/// Test a single record against the criteria.
///
/// # Example
/// ```
/// use facility_map::{FacilityRecord, FilterCriteria, matches};
///
/// let rink = FacilityRecord {
///     id: 7,
///     name: Some("Каток «Северный»".into()),
///     district: Some("Выборгский".into()),
///     ..Default::default()
/// };
///
/// assert!(matches(&rink, &FilterCriteria::default().with_district("выборг")));
/// assert!(!matches(&rink, &FilterCriteria::default().with_sport_type("хоккей")));
/// ```
pub fn matches(record: &FacilityRecord, criteria: &FilterCriteria) -> bool {
    Predicates::new(criteria).test(record)
}

/// Filter records, preserving their order.
pub fn apply_filter(
    records: &[Arc<FacilityRecord>],
    criteria: &FilterCriteria,
) -> Vec<Arc<FacilityRecord>> {
    if criteria.is_unconstrained() {
        return records.to_vec();
    }

    let predicates = Predicates::new(criteria);
    records
        .iter()
        .filter(|r| predicates.test(r))
        .cloned()
        .collect()
}
