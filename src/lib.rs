//! # Facility Map
//!
//! Spatial clustering, filtering and live search for maps of geotagged facilities.
//!
//! This library provides:
//! - An authoritative in-memory record store loaded from a JSON listing
//! - Composable filter predicates (district, sport type, free text)
//! - Greedy pixel-distance clustering with bounded rendering hints
//! - Capped live-search suggestions with highlighted match spans
//! - Pure selection resolvers that turn picks into view intents
//!
//! ## Features
//!
//! - **`http`** - Enable the HTTP client for fetching listings
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use facility_map::{FacilityRecord, FilterCriteria, GeoPoint, MapSession};
//!
//! let records = vec![
//!     FacilityRecord {
//!         id: 1,
//!         district: Some("Центральный".into()),
//!         sports: Some("Футбол".into()),
//!         location: Some(GeoPoint::new(59.93, 30.31)),
//!         ..Default::default()
//!     },
//!     FacilityRecord {
//!         id: 2,
//!         district: Some("Московский".into()),
//!         sports: Some("Баскетбол".into()),
//!         ..Default::default()
//!     },
//! ];
//!
//! let mut session = MapSession::default();
//! session.load(records);
//! session.set_criteria(FilterCriteria::default().with_district("центр"));
//!
//! assert_eq!(session.visible_count(), 1);
//! assert_eq!(session.clusters().len(), 1);
//! ```

use serde::Serialize;

pub mod error;
pub use error::{MapError, Result};

pub mod geo_utils;
pub use geo_utils::Projector;

pub mod store;
pub use store::{parse_facility_listing, parse_filter_options, FilterOptions, RecordStore};

pub mod filter;
pub use filter::{apply_filter, matches};

pub mod cluster;
pub use cluster::{
    cluster_records, group_points, Cluster, ClusterConfig, ClusterIndex, ClusterStyle, PointGroup,
};

pub mod suggest;
pub use suggest::{suggest, HighlightedText, SuggestConfig, SuggestionMatch};

pub mod viewport;
pub use viewport::{resolve_search_pick, resolve_selection, Intent, ViewConfig};

pub mod session;
pub use session::{MapSession, SessionObserver};

// HTTP module for listing fetches
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{FacilitySource, SourceConfig};

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 location.
///
/// # Example
/// ```
/// use facility_map::GeoPoint;
/// let point = GeoPoint::new(59.9386, 30.3141); // Saint Petersburg
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new location.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A position in projected world-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in pixels.
    pub fn distance(&self, other: &PixelPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from locations. `None` when there are none.
    pub fn from_points(points: &[GeoPoint]) -> Option<Self> {
        geo_utils::compute_bounds(points)
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude >= self.min_lat
            && point.latitude <= self.max_lat
            && point.longitude >= self.min_lng
            && point.longitude <= self.max_lng
    }
}

/// Placeholder shown for a facility without a name.
pub const UNNAMED: &str = "Без названия";

/// A sports facility as delivered by the data source.
///
/// Records are immutable once loaded. Every descriptive field is optional;
/// a record without `location` is kept in the store and found by search but
/// never drawn on the map.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FacilityRecord {
    pub id: u64,
    pub name: Option<String>,
    pub address: Option<String>,
    pub district: Option<String>,
    /// Facility type, e.g. "Каток" or "Спортивная площадка"
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Free-text list of sports offered
    pub sports: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub status: Option<String>,
    pub cost: Option<String>,
    /// Equipment description
    pub facilities: Option<String>,
    pub location: Option<GeoPoint>,
}

impl FacilityRecord {
    /// Name, or the "untitled" placeholder.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => UNNAMED,
        }
    }

    /// Website as an absolute URL. Bare hosts get an `https://` prefix.
    pub fn website_url(&self) -> Option<String> {
        let site = self.website.as_deref()?.trim();
        if site.is_empty() {
            return None;
        }
        if site.starts_with("http://") || site.starts_with("https://") {
            Some(site.to_string())
        } else {
            Some(format!("https://{}", site))
        }
    }

    /// True when the status marks the facility as open.
    pub fn is_operating(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.contains("Работающий"))
    }

    /// True when the record can be placed on the map.
    pub fn is_plottable(&self) -> bool {
        self.location.is_some_and(|p| p.is_valid())
    }
}

/// The user's filter selection.
///
/// `None` and the empty string both mean "no constraint".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterCriteria {
    pub district: Option<String>,
    pub sport_type: Option<String>,
    pub query: Option<String>,
}

impl FilterCriteria {
    pub fn with_district(mut self, district: impl Into<String>) -> Self {
        self.district = Some(district.into());
        self
    }

    pub fn with_sport_type(mut self, sport_type: impl Into<String>) -> Self {
        self.sport_type = Some(sport_type.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// True when no field constrains the result.
    pub fn is_unconstrained(&self) -> bool {
        [&self.district, &self.sport_type, &self.query]
            .iter()
            .all(|f| f.as_deref().map_or(true, str::is_empty))
    }
}

// ============================================================================
// Tests
// ============================================================================
