//! Authoritative record store and listing payload parsing.
//!
//! The store is a point-in-time snapshot: [`RecordStore::load`] replaces the
//! whole set and there are no partial updates. Records are shared out as
//! `Arc<FacilityRecord>` so derived sets (filtered list, clusters, suggestions)
//! can be rebuilt freely without copying record data.

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};
use serde::de::{Deserializer, Error as _};
use serde::Deserialize;
use serde_json::Value;

use crate::{FacilityRecord, GeoPoint, MapError, Result};

/// Label used in statistics for records without a district.
pub const UNKNOWN_DISTRICT: &str = "Не указан";

/// Holds the full facility list for a session.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    records: Vec<Arc<FacilityRecord>>,
    index: HashMap<u64, usize>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire record set.
    ///
    /// Insertion order is preserved. Ids must be unique: the first record with
    /// a given id wins and later duplicates are dropped. Returns the number of
    /// records held afterwards.
    pub fn load(&mut self, records: Vec<FacilityRecord>) -> usize {
        let mut next = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());

        for record in records {
            if index.contains_key(&record.id) {
                warn!("[RecordStore] Dropping duplicate facility id {}", record.id);
                continue;
            }
            index.insert(record.id, next.len());
            next.push(Arc::new(record));
        }

        // Build fully before swapping so readers never see a partial store
        self.records = next;
        self.index = index;

        info!(
            "[RecordStore] Loaded {} facilities ({} plottable)",
            self.records.len(),
            self.plottable_count()
        );
        self.records.len()
    }

    /// Drop every record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }

    /// All records in insertion order.
    pub fn all(&self) -> &[Arc<FacilityRecord>] {
        &self.records
    }

    pub fn by_id(&self, id: u64) -> Result<&Arc<FacilityRecord>> {
        self.index
            .get(&id)
            .map(|&i| &self.records[i])
            .ok_or(MapError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records with a usable location.
    pub fn plottable_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_plottable()).count()
    }

    /// Records per district, largest first, limited to `limit` entries.
    ///
    /// Records without a district are counted under [`UNKNOWN_DISTRICT`].
    /// Equal counts keep the order in which the districts were first seen.
    pub fn district_counts(&self, limit: usize) -> Vec<(String, usize)> {
        let mut counts = count_in_order(
            self.records
                .iter()
                .map(|r| r.district.as_deref().unwrap_or(UNKNOWN_DISTRICT)),
        );
        counts.truncate(limit);
        counts
    }

    /// Records per facility type, largest first. Untyped records are skipped.
    pub fn type_counts(&self) -> Vec<(String, usize)> {
        count_in_order(self.records.iter().filter_map(|r| r.kind.as_deref()))
    }
}

fn count_in_order<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for key in keys {
        match positions.get(key) {
            Some(&i) => counts[i].1 += 1,
            None => {
                positions.insert(key, counts.len());
                counts.push((key.to_string(), 1));
            }
        }
    }

    // sort_by is stable, so ties stay in first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

// ============================================================================
// Listing Payloads
// ============================================================================

/// Distinct values offered by the district and sport-type filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub districts: Vec<String>,
    pub sport_types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    #[serde(default)]
    sports: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawFacility {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_text")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    address: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    district: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "lenient_text")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    sports: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    website: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    status: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    cost: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    facilities: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    longitude: Option<f64>,
}

impl RawFacility {
    fn into_record(self, id: u64) -> FacilityRecord {
        FacilityRecord {
            id,
            location: normalize_location(self.latitude, self.longitude),
            name: self.name,
            address: self.address,
            district: self.district,
            kind: self.kind,
            sports: self.sports,
            phone: self.phone,
            email: self.email,
            website: self.website,
            status: self.status,
            cost: self.cost,
            facilities: self.facilities,
        }
    }
}

/// The listing writes 0 for unknown coordinates, so zero counts as missing.
fn normalize_location(latitude: Option<f64>, longitude: Option<f64>) -> Option<GeoPoint> {
    match (latitude, longitude) {
        (Some(lat), Some(lng)) if lat != 0.0 && lng != 0.0 => {
            Some(GeoPoint::new(lat, lng)).filter(GeoPoint::is_valid)
        }
        _ => None,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(D::Error::custom(format!("expected text, got {}", other))),
    }
}

fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid coordinate {:?}", s))),
        other => Err(D::Error::custom(format!("expected number, got {}", other))),
    }
}

/// Parse the bulk facility listing (`{"sports": {"<id>": {...}}}`).
///
/// Records come back sorted by ascending id. An `{"error": ...}` payload or a
/// payload without the listing is a [`MapError::LoadFailure`]; individual
/// malformed entries are skipped with a warning.
///
/// # Example
/// ```
/// use facility_map::parse_facility_listing;
///
/// let json = r#"{"sports": {
///     "2": {"id": 2, "name": "Каток", "latitude": 0, "longitude": 0},
///     "1": {"id": 1, "name": "Стадион", "latitude": 59.93, "longitude": 30.31}
/// }}"#;
///
/// let records = parse_facility_listing(json).unwrap();
/// assert_eq!(records[0].id, 1);
/// assert!(records[0].location.is_some());
/// assert!(records[1].location.is_none());
/// ```
pub fn parse_facility_listing(json: &str) -> Result<Vec<FacilityRecord>> {
    const SOURCE: &str = "facilities";

    let response: ListingResponse =
        serde_json::from_str(json).map_err(|e| MapError::load(SOURCE, format!("JSON parse error: {}", e)))?;

    if let Some(error) = response.error {
        return Err(MapError::load(SOURCE, error));
    }
    let entries = response
        .sports
        .ok_or_else(|| MapError::load(SOURCE, "payload has no facility listing"))?;

    let mut records = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let raw: RawFacility = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("[RecordStore] Skipping malformed facility {}: {}", key, e);
                continue;
            }
        };
        let Some(id) = raw.id.or_else(|| key.parse().ok()) else {
            warn!("[RecordStore] Skipping facility without id (key {:?})", key);
            continue;
        };
        records.push(raw.into_record(id));
    }

    records.sort_by_key(|r| r.id);
    Ok(records)
}

fn parse_string_list(json: &str, key: &str, source_name: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| MapError::load(source_name, format!("JSON parse error: {}", e)))?;

    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(MapError::load(source_name, error));
    }

    let items = value
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| MapError::load(source_name, format!("payload has no {:?} list", key)))?;

    Ok(items
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

/// Parse the district (`{"districts": [...]}`) and sport-type
/// (`{"sport_types": [...]}`) metadata listings.
pub fn parse_filter_options(districts_json: &str, sport_types_json: &str) -> Result<FilterOptions> {
    Ok(FilterOptions {
        districts: parse_string_list(districts_json, "districts", "districts")?,
        sport_types: parse_string_list(sport_types_json, "sport_types", "sport types")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: u64, district: Option<&str>) -> FacilityRecord {
        FacilityRecord {
            id,
            district: district.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_load_preserves_order_and_indexes() {
        let mut store = RecordStore::new();
        let count = store.load(vec![record(5, None), record(2, None), record(9, None)]);
        assert_eq!(count, 3);

        let ids: Vec<u64> = store.all().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![5, 2, 9]);
        assert_eq!(store.by_id(2).unwrap().id, 2);
        assert_eq!(store.by_id(3).unwrap_err(), MapError::NotFound(3));
    }

    #[test]
    fn test_reload_replaces_everything() {
        let mut store = RecordStore::new();
        store.load(vec![record(1, None), record(2, None)]);
        store.load(vec![record(3, None)]);

        assert_eq!(store.len(), 1);
        assert!(store.by_id(1).is_err());
        assert!(store.by_id(3).is_ok());
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let mut store = RecordStore::new();
        store.load(vec![record(1, Some("А")), record(1, Some("Б"))]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.by_id(1).unwrap().district.as_deref(), Some("А"));
    }

    #[test]
    fn test_district_counts() {
        let mut store = RecordStore::new();
        store.load(vec![
            record(1, Some("Невский")),
            record(2, Some("Приморский")),
            record(3, Some("Приморский")),
            record(4, None),
            record(5, Some("Невский")),
            record(6, Some("Кировский")),
        ]);

        let counts = store.district_counts(5);
        assert_eq!(
            counts,
            vec![
                ("Невский".to_string(), 2),
                ("Приморский".to_string(), 2),
                (UNKNOWN_DISTRICT.to_string(), 1),
                ("Кировский".to_string(), 1),
            ]
        );
        assert_eq!(store.district_counts(1).len(), 1);
    }

    #[test]
    fn test_type_counts_skip_untyped() {
        let mut store = RecordStore::new();
        store.load(vec![
            FacilityRecord { id: 1, kind: Some("Каток".into()), ..Default::default() },
            FacilityRecord { id: 2, ..Default::default() },
            FacilityRecord { id: 3, kind: Some("Каток".into()), ..Default::default() },
        ]);
        assert_eq!(store.type_counts(), vec![("Каток".to_string(), 2)]);
    }

    #[test]
    fn test_parse_listing_fields() {
        let payload = json!({
            "sports": {
                "10": {
                    "id": 10,
                    "name": "Спорткомплекс",
                    "address": "пр. Энгельса, 1",
                    "district": "Выборгский",
                    "type": "Спортивный комплекс",
                    "latitude": 60.01,
                    "longitude": 30.33,
                    "sports": "Плавание",
                    "phone": null,
                    "cost": 300,
                    "status": "Работающий"
                },
                "2": {"id": 2, "latitude": null, "longitude": null}
            }
        });

        let records = parse_facility_listing(&payload.to_string()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 2);
        assert!(records[0].location.is_none());

        let complex = &records[1];
        assert_eq!(complex.kind.as_deref(), Some("Спортивный комплекс"));
        assert_eq!(complex.cost.as_deref(), Some("300"));
        assert!(complex.phone.is_none());
        assert_eq!(complex.location, Some(GeoPoint::new(60.01, 30.33)));
    }

    #[test]
    fn test_parse_listing_zero_coordinates_are_missing() {
        let payload = json!({"sports": {"1": {"id": 1, "latitude": 59.9, "longitude": 0}}});
        let records = parse_facility_listing(&payload.to_string()).unwrap();
        assert!(records[0].location.is_none());
    }

    #[test]
    fn test_parse_listing_skips_malformed_entry() {
        let payload = json!({
            "sports": {
                "1": {"id": 1, "name": "Ок"},
                "2": "not an object",
                "3": {"id": 3, "latitude": "abc"}
            }
        });
        let records = parse_facility_listing(&payload.to_string()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);
    }

    #[test]
    fn test_parse_listing_id_from_key() {
        let payload = json!({"sports": {"42": {"name": "Без id"}}});
        let records = parse_facility_listing(&payload.to_string()).unwrap();
        assert_eq!(records[0].id, 42);
    }

    #[test]
    fn test_parse_listing_errors() {
        let err = parse_facility_listing(r#"{"error": "Access denied"}"#).unwrap_err();
        assert!(err.is_load_failure());
        assert!(err.to_string().contains("Access denied"));

        assert!(parse_facility_listing("<html>").unwrap_err().is_load_failure());
        assert!(parse_facility_listing("{}").unwrap_err().is_load_failure());
    }

    #[test]
    fn test_parse_filter_options() {
        let districts = json!({"districts": ["Адмиралтейский", "", "Невский"]}).to_string();
        let sports = json!({"sport_types": ["Бокс", "Футбол"]}).to_string();

        let options = parse_filter_options(&districts, &sports).unwrap();
        assert_eq!(options.districts, vec!["Адмиралтейский", "Невский"]);
        assert_eq!(options.sport_types, vec!["Бокс", "Футбол"]);

        let broken = parse_filter_options(&districts, r#"{"error": "db down"}"#);
        assert!(broken.unwrap_err().is_load_failure());
    }
}
